//! Response routing and decoding.
//!
//! [`route`] turns a [`ResponseEnvelope`] into a [`ParsedResponse`]:
//!
//! | Envelope | Result |
//! |----------|--------|
//! | no body | [`ParsedResponse::Raw`] |
//! | `Content-Type` starting with `text/xml` or `application/xml` | [`ParsedResponse::Xml`] |
//! | anything else, including no `Content-Type` | [`ParsedResponse::FlatFile`] |
//!
//! The service labels flat files inconsistently, so anything that is not XML is treated as
//! one.

pub mod flat_file;
pub mod headers;
pub mod xml;

pub use flat_file::{FlatFileResponse, FlatFileRow};
pub use headers::{MwsHeaders, Quota};
pub use xml::{XmlNode, XmlResponse, XmlValue};

use tracing::debug;

use crate::{error::Result, marketplace::TextEncoding, transport::ResponseEnvelope};

/// Which decoder a response needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// XML document.
    Xml,
    /// Tab-separated flat file.
    FlatFile,
    /// No body to decode.
    Raw,
}

/// Picks the decoder for an envelope.
#[must_use]
pub fn response_kind(envelope: &ResponseEnvelope) -> ResponseKind {
    if envelope.body.is_none() {
        return ResponseKind::Raw;
    }
    match envelope.content_type() {
        Some(content_type) if is_xml(content_type) => ResponseKind::Xml,
        _ => ResponseKind::FlatFile,
    }
}

fn is_xml(content_type: &str) -> bool {
    let media_type = content_type.trim_start().to_ascii_lowercase();
    media_type.starts_with("text/xml") || media_type.starts_with("application/xml")
}

/// Decodes an envelope with the decoder [`response_kind`] selects.
///
/// `encoding` is the marketplace encoding used for flat files.
///
/// # Errors
///
/// Returns [`MwsError::XmlError`](crate::MwsError::XmlError) when an XML body is malformed.
/// Flat-file decoding never fails at this stage.
///
/// # Examples
///
/// ```
/// use mws_client::{marketplace::TextEncoding, response::{ParsedResponse, route}, transport::ResponseEnvelope};
///
/// let envelope = ResponseEnvelope {
///     status: 200,
///     headers: vec![("Content-Type".into(), "application/octet-stream".into())],
///     body: Some(b"sku\tqty\nA1\t3\n".to_vec()),
/// };
/// let parsed = route(envelope, TextEncoding::Windows1252)?;
/// assert!(matches!(parsed, ParsedResponse::FlatFile(_)));
/// # Ok::<(), mws_client::MwsError>(())
/// ```
pub fn route(envelope: ResponseEnvelope, encoding: TextEncoding) -> Result<ParsedResponse> {
    let kind = response_kind(&envelope);
    debug!(?kind, content_type = envelope.content_type(), "routing response");

    Ok(match kind {
        ResponseKind::Xml => ParsedResponse::Xml(XmlResponse::new(envelope)?),
        ResponseKind::FlatFile => ParsedResponse::FlatFile(FlatFileResponse::new(envelope, encoding)),
        ResponseKind::Raw => ParsedResponse::Raw(envelope),
    })
}

/// A decoded response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedResponse {
    /// XML payload.
    Xml(XmlResponse),
    /// Flat-file payload.
    FlatFile(FlatFileResponse),
    /// Undecoded response without a body.
    Raw(ResponseEnvelope),
}

impl ParsedResponse {
    /// Which decoder produced this response.
    #[must_use]
    pub fn kind(&self) -> ResponseKind {
        match self {
            Self::Xml(_) => ResponseKind::Xml,
            Self::FlatFile(_) => ResponseKind::FlatFile,
            Self::Raw(_) => ResponseKind::Raw,
        }
    }

    /// The underlying response.
    #[must_use]
    pub fn envelope(&self) -> &ResponseEnvelope {
        match self {
            Self::Xml(xml) => xml.envelope(),
            Self::FlatFile(flat) => flat.envelope(),
            Self::Raw(envelope) => envelope,
        }
    }

    /// HTTP status.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.envelope().status
    }

    /// The XML view, if this is an XML response.
    #[must_use]
    pub fn as_xml(&self) -> Option<&XmlResponse> {
        match self {
            Self::Xml(xml) => Some(xml),
            _ => None,
        }
    }

    /// The flat-file view, if this is a flat-file response.
    #[must_use]
    pub fn as_flat_file(&self) -> Option<&FlatFileResponse> {
        match self {
            Self::FlatFile(flat) => Some(flat),
            _ => None,
        }
    }

    /// Pagination cursor of an XML response.
    #[must_use]
    pub fn next_token(&self) -> Option<&str> {
        self.as_xml().and_then(XmlResponse::next_token)
    }

    /// Integrity check of the decoded view. Raw responses have nothing to check and are
    /// never valid.
    #[must_use]
    pub fn valid(&self) -> bool {
        match self {
            Self::Xml(xml) => xml.valid(),
            Self::FlatFile(flat) => flat.valid(),
            Self::Raw(_) => false,
        }
    }

    /// Returns the underlying response.
    #[must_use]
    pub fn into_envelope(self) -> ResponseEnvelope {
        match self {
            Self::Xml(xml) => xml.into_envelope(),
            Self::FlatFile(flat) => flat.into_envelope(),
            Self::Raw(envelope) => envelope,
        }
    }
}

impl MwsHeaders for ParsedResponse {
    fn header(&self, name: &str) -> Option<&str> {
        self.envelope().header(name)
    }
}
