//! XML response decoding.
//!
//! The body is read into a generic [`XmlNode`] tree. The payload callers care about is then
//! picked out of the envelope with a fixed precedence:
//!
//! 1. the first child whose name ends in `Result` (`ListOrdersResult`)
//! 2. otherwise the `Message` child
//! 3. otherwise, for a root named `...Reports`, the child named after the root without its
//!    trailing `s`
//! 4. otherwise the root itself
//!
//! The heuristic is deliberately narrow. It does not attempt a general XML-to-object mapping.

use indexmap::IndexMap;
use quick_xml::{Reader, events::Event};
use tracing::instrument;

use super::headers::MwsHeaders;
use crate::{
    error::{MwsError, Result},
    transport::ResponseEnvelope,
};

/// An element with its attributes, text and child elements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlNode {
    /// Local element name (namespace prefix dropped).
    pub name: String,
    /// Attributes in document order.
    pub attributes: Vec<(String, String)>,
    /// Concatenated text content, trimmed.
    pub text: Option<String>,
    /// Child elements in document order.
    pub children: Vec<XmlNode>,
}

/// Plain-data view of an [`XmlNode`].
///
/// Leaves become text, repeated child names collapse into a list, everything else becomes a
/// map keyed by child (or attribute) name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlValue {
    /// Text of a leaf element.
    Text(String),
    /// Element with attributes or children.
    Map(IndexMap<String, XmlValue>),
    /// Repeated sibling elements sharing one name.
    List(Vec<XmlValue>),
}

impl XmlValue {
    /// Returns the text of a leaf.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Looks up a field of a map.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&XmlValue> {
        match self {
            Self::Map(map) => map.get(key),
            _ => None,
        }
    }
}

impl XmlNode {
    fn named(name: String) -> Self {
        Self { name, ..Self::default() }
    }

    /// First child with the given name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All children with the given name.
    pub fn children_named<'n>(&'n self, name: &'n str) -> impl Iterator<Item = &'n XmlNode> + 'n {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Text of the first child with the given name.
    #[must_use]
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).and_then(|c| c.text.as_deref())
    }

    /// Value of an attribute.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    /// Follows a path of child names.
    #[must_use]
    pub fn dig(&self, path: &[&str]) -> Option<&XmlNode> {
        path.iter().try_fold(self, |node, name| node.child(name))
    }

    /// Depth-first search for a descendant (or this node) with the given name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&XmlNode> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    /// Converts the subtree into plain data.
    #[must_use]
    pub fn to_value(&self) -> XmlValue {
        if self.children.is_empty() && self.attributes.is_empty() {
            return XmlValue::Text(self.text.clone().unwrap_or_default());
        }

        let mut map: IndexMap<String, XmlValue> = self
            .attributes
            .iter()
            .map(|(k, v)| (k.clone(), XmlValue::Text(v.clone())))
            .collect();

        for child in &self.children {
            let value = child.to_value();
            match map.get_mut(&child.name) {
                Some(XmlValue::List(items)) => items.push(value),
                Some(existing) => {
                    let first = std::mem::replace(existing, XmlValue::List(Vec::new()));
                    *existing = XmlValue::List(vec![first, value]);
                }
                None => {
                    map.insert(child.name.clone(), value);
                }
            }
        }

        if self.children.is_empty()
            && let Some(text) = &self.text
        {
            map.insert("__content__".to_owned(), XmlValue::Text(text.clone()));
        }

        XmlValue::Map(map)
    }
}

fn attach(stack: &mut [XmlNode], root: &mut Option<XmlNode>, node: XmlNode) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => {
            if root.is_none() {
                *root = Some(node);
            }
        }
    }
}

fn push_text(stack: &mut [XmlNode], text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(top) = stack.last_mut() {
        top.text.get_or_insert_with(String::new).push_str(text);
    }
}

fn element(start: &quick_xml::events::BytesStart<'_>) -> Result<XmlNode> {
    let mut node = XmlNode::named(String::from_utf8_lossy(start.local_name().as_ref()).into_owned());
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| MwsError::XmlError(e.to_string()))?;
        let key = String::from_utf8_lossy(attribute.key.local_name().as_ref()).into_owned();
        let value = attribute.unescape_value()?.into_owned();
        node.attributes.push((key, value));
    }
    Ok(node)
}

/// Parses a document into its root element.
///
/// # Errors
///
/// Returns [`MwsError::XmlError`] for malformed documents, documents without a root element
/// and documents that end inside an element.
pub fn parse_document(bytes: &[u8]) -> Result<XmlNode> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(start) => stack.push(element(&start)?),
            Event::Empty(start) => {
                let node = element(&start)?;
                attach(&mut stack, &mut root, node);
            }
            Event::Text(text) => push_text(&mut stack, &text.unescape()?),
            Event::CData(data) => push_text(&mut stack, &String::from_utf8_lossy(&data)),
            Event::End(_) => {
                if let Some(node) = stack.pop() {
                    attach(&mut stack, &mut root, node);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(MwsError::XmlError("unexpected end of document".to_owned()));
    }
    root.ok_or_else(|| MwsError::XmlError("document has no root element".to_owned()))
}

fn find_data(root: &XmlNode) -> &XmlNode {
    if let Some(result) = root.children.iter().find(|c| c.name.ends_with("Result")) {
        return result;
    }
    if let Some(message) = root.child("Message") {
        return message;
    }
    if root.name.ends_with("Reports")
        && let Some(report) = root.name.strip_suffix('s').and_then(|singular| root.child(singular))
    {
        return report;
    }
    root
}

/// A decoded XML response.
///
/// # Examples
///
/// ```
/// use mws_client::{response::XmlResponse, transport::ResponseEnvelope};
///
/// let body = br#"<ListOrdersResponse>
///   <ListOrdersResult>
///     <NextToken>abc</NextToken>
///     <Orders><Order><AmazonOrderId>1</AmazonOrderId></Order></Orders>
///   </ListOrdersResult>
///   <ResponseMetadata><RequestId>r</RequestId></ResponseMetadata>
/// </ListOrdersResponse>"#;
/// let envelope = ResponseEnvelope {
///     status: 200,
///     headers: vec![("Content-Type".into(), "text/xml".into())],
///     body: Some(body.to_vec()),
/// };
///
/// let response = XmlResponse::new(envelope)?;
/// assert_eq!(response.parse().name, "ListOrdersResult");
/// assert_eq!(response.next_token(), Some("abc"));
/// assert_eq!(
///     response.dig(&["Orders", "Order", "AmazonOrderId"]).and_then(|n| n.text.as_deref()),
///     Some("1")
/// );
/// # Ok::<(), mws_client::MwsError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlResponse {
    envelope: ResponseEnvelope,
    document: XmlNode,
}

impl XmlResponse {
    /// Parses the envelope's body.
    ///
    /// # Errors
    ///
    /// Returns [`MwsError::XmlError`] if the body is not a well-formed document.
    #[instrument(skip_all, fields(status = envelope.status, bytes = envelope.body_bytes().len()))]
    pub fn new(envelope: ResponseEnvelope) -> Result<Self> {
        let document = parse_document(envelope.body_bytes())?;
        Ok(Self { envelope, document })
    }

    /// The whole document, starting at the root element.
    #[must_use]
    pub fn document(&self) -> &XmlNode {
        &self.document
    }

    /// The meaningful payload, chosen by the precedence described in the module docs.
    #[must_use]
    pub fn parse(&self) -> &XmlNode {
        find_data(&self.document)
    }

    /// The payload as plain data.
    #[must_use]
    pub fn to_value(&self) -> XmlValue {
        self.parse().to_value()
    }

    /// Follows a path of child names from the payload.
    #[must_use]
    pub fn dig(&self, path: &[&str]) -> Option<&XmlNode> {
        self.parse().dig(path)
    }

    /// Pagination cursor, wherever a `NextToken` element appears in the payload.
    #[must_use]
    pub fn next_token(&self) -> Option<&str> {
        self.parse().find("NextToken").and_then(|n| n.text.as_deref())
    }

    /// Returns true when the declared `Content-Length` matches the body length.
    ///
    /// A missing or unparseable header yields false.
    #[must_use]
    pub fn valid(&self) -> bool {
        self.envelope
            .header("Content-Length")
            .and_then(|len| len.trim().parse::<usize>().ok())
            .is_some_and(|len| len == self.envelope.body_bytes().len())
    }

    /// The response this view was decoded from.
    #[must_use]
    pub fn envelope(&self) -> &ResponseEnvelope {
        &self.envelope
    }

    /// Returns the underlying response.
    #[must_use]
    pub fn into_envelope(self) -> ResponseEnvelope {
        self.envelope
    }
}

impl MwsHeaders for XmlResponse {
    fn header(&self, name: &str) -> Option<&str> {
        self.envelope.header(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(body: &str, headers: &[(&str, &str)]) -> ResponseEnvelope {
        ResponseEnvelope {
            status: 200,
            headers: headers.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect(),
            body: Some(body.as_bytes().to_vec()),
        }
    }

    #[test]
    fn test_result_preferred_over_message() {
        let body = "<Envelope><Message><Id>m</Id></Message><FooResult><Id>r</Id></FooResult></Envelope>";
        let response = XmlResponse::new(envelope(body, &[])).unwrap();

        assert_eq!(response.parse().name, "FooResult");
        assert_eq!(response.parse().child_text("Id"), Some("r"));
    }

    #[test]
    fn test_exact_result_name() {
        let body = "<Envelope><Result><Id>r</Id></Result><Message/></Envelope>";
        let response = XmlResponse::new(envelope(body, &[])).unwrap();
        assert_eq!(response.parse().name, "Result");
    }

    #[test]
    fn test_message_when_no_result() {
        let body = "<AmazonEnvelope><Header/><Message><MessageID>1</MessageID></Message></AmazonEnvelope>";
        let response = XmlResponse::new(envelope(body, &[])).unwrap();
        assert_eq!(response.parse().name, "Message");
        assert_eq!(response.parse().child_text("MessageID"), Some("1"));
    }

    #[test]
    fn test_reports_root_selects_singular_child() {
        let body = "<SettlementReports><Other/><SettlementReport><Id>7</Id></SettlementReport></SettlementReports>";
        let response = XmlResponse::new(envelope(body, &[])).unwrap();
        assert_eq!(response.parse().name, "SettlementReport");
    }

    #[test]
    fn test_root_fallback() {
        let body = "<Inventory><Item>a</Item></Inventory>";
        let response = XmlResponse::new(envelope(body, &[])).unwrap();
        assert_eq!(response.parse().name, "Inventory");
    }

    #[test]
    fn test_next_token_found_at_depth() {
        let body = "<R><ListResult><Page><NextToken>tok</NextToken></Page></ListResult></R>";
        let response = XmlResponse::new(envelope(body, &[])).unwrap();
        assert_eq!(response.next_token(), Some("tok"));

        let body = "<R><ListResult><HasNext>false</HasNext></ListResult></R>";
        let response = XmlResponse::new(envelope(body, &[])).unwrap();
        assert_eq!(response.next_token(), None);
    }

    #[test]
    fn test_namespaces_attributes_and_entities() {
        let body = r#"<?xml version="1.0"?>
            <GetMatchingProductResponse xmlns="http://mws.amazonservices.com/schema/Products/2011-10-01">
              <GetMatchingProductResult ASIN="B00EXAMPLE" status="Success">
                <Title>Fish &amp; Chips</Title>
                <Note><![CDATA[<raw>]]></Note>
              </GetMatchingProductResult>
            </GetMatchingProductResponse>"#;
        let response = XmlResponse::new(envelope(body, &[])).unwrap();
        let result = response.parse();

        assert_eq!(result.attribute("ASIN"), Some("B00EXAMPLE"));
        assert_eq!(result.child_text("Title"), Some("Fish & Chips"));
        assert_eq!(result.child_text("Note"), Some("<raw>"));
    }

    #[test]
    fn test_to_value_collapses_repeated_children() {
        let body = "<R><XResult><Item>a</Item><Item>b</Item><Item>c</Item><Count>3</Count></XResult></R>";
        let value = XmlResponse::new(envelope(body, &[])).unwrap().to_value();

        assert_eq!(
            value.get("Item"),
            Some(&XmlValue::List(vec![
                XmlValue::Text("a".to_owned()),
                XmlValue::Text("b".to_owned()),
                XmlValue::Text("c".to_owned()),
            ]))
        );
        assert_eq!(value.get("Count").and_then(XmlValue::as_text), Some("3"));
    }

    #[test]
    fn test_valid_compares_content_length() {
        let body = "<R/>";
        let ok = XmlResponse::new(envelope(body, &[("Content-Length", "4")])).unwrap();
        assert!(ok.valid());

        let mismatch = XmlResponse::new(envelope(body, &[("content-length", "5")])).unwrap();
        assert!(!mismatch.valid());

        let missing = XmlResponse::new(envelope(body, &[])).unwrap();
        assert!(!missing.valid());
    }

    #[test]
    fn test_malformed_documents_rejected() {
        assert!(matches!(parse_document(b"not xml at all"), Err(MwsError::XmlError(_))));
        assert!(parse_document(b"<a><b></a>").is_err());
        assert!(parse_document(b"<a><b>").is_err());
        assert!(parse_document(b"").is_err());
    }

    #[test]
    fn test_dig_and_find() {
        let root = parse_document(b"<A><B><C>x</C></B><D/></A>").unwrap();
        assert_eq!(root.dig(&["B", "C"]).and_then(|n| n.text.as_deref()), Some("x"));
        assert!(root.dig(&["B", "Z"]).is_none());
        assert_eq!(root.find("D").map(|n| n.name.as_str()), Some("D"));
        assert_eq!(root.dig(&[]).map(|n| n.name.as_str()), Some("A"));
    }
}
