//! Request dispatcher.
//!
//! [`MwsClient`] is the single client type for every API section. It is composed from a
//! [`ClientConfig`], an [`ApiSection`] and a [`Transport`], and dispatches operations by name:
//!
//! 1. the operation's parameters run through the parameter pipeline
//! 2. class-level defaults, seller credentials and the version are merged underneath them
//! 3. a staged upload body, if any, is encoded for the marketplace
//! 4. the request is signed (when a signer is installed) and POSTed to `scheme://host/path`
//! 5. the response is routed to the XML or flat-file decoder, or classified on failure
//!
//! # Examples
//!
//! ```rust,no_run
//! use chrono::{TimeZone, Utc};
//! use mws_client::{
//!     MwsClient,
//!     catalog::ApiSection,
//!     config::ClientConfig,
//!     params::{ParamKey, ParamValue, Parameters},
//! };
//!
//! # async fn example() -> mws_client::Result<()> {
//! let config = ClientConfig::new("US").merchant_id("SELLER123");
//! let mut client = MwsClient::new(config, ApiSection::orders())?;
//!
//! let params = Parameters::new()
//!     .with(ParamKey::symbol("created_after"), Utc.with_ymd_and_hms(2015, 1, 1, 0, 0, 0).unwrap())
//!     .with(ParamKey::symbol("order_status"), ParamValue::from(vec!["Pending", "Unshipped"]));
//!
//! let response = client.call("list_orders", params).await?;
//! if let Some(token) = response.next_token() {
//!     let _more = client.call_by_next_token("list_orders", token).await?;
//! }
//! # Ok(())
//! # }
//! ```

use std::{fmt, sync::Arc};

use tracing::{debug, info, instrument, warn};

use crate::{
    catalog::{ApiSection, key_spellings},
    classify::{DomainError, ErrorHandler, classify, resolve_handler},
    config::ClientConfig,
    error::{MwsError, Result},
    marketplace::{Marketplace, TextEncoding},
    params::{FlatParams, ParamKey, Parameters},
    response::{MwsHeaders, ParsedResponse, route},
    transport::{
        ChunkCallback, HttpTransport, PreparedRequest, RequestSigner, ResponseEnvelope, Transport,
    },
};

/// Prefix that marks an upload body as XML.
const XML_DECLARATION: &str = "<?xml";

/// Defaults shared by every client of a section.
///
/// Build one value at composition time and hand the same `Arc` to each client. Client-level
/// values always take precedence.
#[derive(Clone, Default)]
pub struct ClientDefaults {
    /// Parameters sent with every request.
    pub params: FlatParams,
    /// Handler for classified errors when a client has none of its own.
    pub error_handler: Option<ErrorHandler>,
}

impl ClientDefaults {
    /// Creates empty defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a default parameter.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Installs the shared error handler.
    #[must_use]
    pub fn on_error<F>(mut self, handler: F) -> Self
    where
        F: Fn(DomainError) -> Result<ParsedResponse> + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }
}

impl fmt::Debug for ClientDefaults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientDefaults")
            .field("params", &self.params)
            .field("error_handler", &self.error_handler.is_some())
            .finish()
    }
}

/// Client for one MWS API section.
pub struct MwsClient<T: Transport = HttpTransport> {
    config: ClientConfig,
    section: Arc<ApiSection>,
    defaults: Arc<ClientDefaults>,
    transport: T,
    signer: Option<Arc<dyn RequestSigner>>,
    error_handler: Option<ErrorHandler>,
    body: Option<String>,
    marketplace: &'static Marketplace,
}

impl MwsClient<HttpTransport> {
    /// Creates a client over the `reqwest` transport configured by `config.http`.
    ///
    /// # Errors
    ///
    /// Returns error if the configuration, the section or the transport settings are invalid.
    pub fn new(config: ClientConfig, section: impl Into<Arc<ApiSection>>) -> Result<Self> {
        let transport = HttpTransport::with_config(&config.http)?;
        Self::with_transport(config, section, transport)
    }
}

impl<T: Transport> MwsClient<T> {
    /// Creates a client over a custom transport.
    ///
    /// # Errors
    ///
    /// Returns [`MwsError::InvalidMarketplace`] if the primary marketplace does not resolve
    /// and [`MwsError::ConfigError`] if the configuration or section is invalid.
    pub fn with_transport(
        config: ClientConfig,
        section: impl Into<Arc<ApiSection>>,
        transport: T,
    ) -> Result<Self> {
        config.validate()?;
        let section = section.into();
        section.validate()?;
        let marketplace = config.marketplace()?;

        Ok(Self {
            config,
            section,
            defaults: Arc::new(ClientDefaults::default()),
            transport,
            signer: None,
            error_handler: None,
            body: None,
            marketplace,
        })
    }

    /// Uses shared defaults.
    #[must_use]
    pub fn with_defaults(mut self, defaults: Arc<ClientDefaults>) -> Self {
        self.defaults = defaults;
        self
    }

    /// Installs a request signer.
    #[must_use]
    pub fn with_signer(mut self, signer: Arc<dyn RequestSigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Installs this client's error handler, which wins over the shared one.
    #[must_use]
    pub fn on_error<F>(mut self, handler: F) -> Self
    where
        F: Fn(DomainError) -> Result<ParsedResponse> + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    /// Stages an upload body for the next request.
    ///
    /// The body is cleared after a successful round-trip and kept after a failure so the
    /// request can be retried.
    pub fn set_body(&mut self, body: impl Into<String>) -> &mut Self {
        self.body = Some(body.into());
        self
    }

    /// Drops the staged body.
    pub fn clear_body(&mut self) -> &mut Self {
        self.body = None;
        self
    }

    /// The staged body.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The API section.
    #[must_use]
    pub fn section(&self) -> &ApiSection {
        &self.section
    }

    /// The transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The primary marketplace.
    #[must_use]
    pub fn marketplace(&self) -> &'static Marketplace {
        self.marketplace
    }

    /// Encoding of flat files exchanged with the primary marketplace.
    #[must_use]
    pub fn encoding(&self) -> TextEncoding {
        self.marketplace.encoding()
    }

    /// Endpoint of the section on the primary marketplace's host.
    #[must_use]
    pub fn endpoint(&self) -> String {
        let path = self.config.path.as_deref().unwrap_or(&self.section.path);
        self.marketplace.endpoint(&self.config.scheme, path)
    }

    /// Calls a catalog operation.
    ///
    /// The primary marketplace is injected under the operation's marketplace parameter unless
    /// the caller already set it, then the parameters are finalized with the operation's
    /// structured-list registry and skip list.
    ///
    /// # Errors
    ///
    /// Returns [`MwsError::UnknownOperation`] for names outside the catalog, pipeline errors,
    /// transport errors, and failures as described on [`run`](Self::run).
    pub async fn call(&mut self, name: &str, params: Parameters) -> Result<ParsedResponse> {
        let (action, flat, expects) = self.prepare(name, params)?;
        self.run(&action, flat, expects, None::<fn(&[u8])>).await
    }

    /// Like [`call`](Self::call), passing each response chunk to `on_chunk` as it arrives.
    ///
    /// # Errors
    ///
    /// Same as [`call`](Self::call).
    pub async fn call_streaming<F>(
        &mut self,
        name: &str,
        params: Parameters,
        on_chunk: F,
    ) -> Result<ParsedResponse>
    where
        F: FnMut(&[u8]) + Send,
    {
        let (action, flat, expects) = self.prepare(name, params)?;
        self.run(&action, flat, expects, Some(on_chunk)).await
    }

    /// Fetches the next page of a paginated operation.
    ///
    /// Dispatches `{name}_by_next_token` with the `NextToken` parameter.
    ///
    /// # Errors
    ///
    /// Same as [`call`](Self::call).
    pub async fn call_by_next_token(&mut self, name: &str, next_token: &str) -> Result<ParsedResponse> {
        let params = Parameters::new().with(ParamKey::name("NextToken"), next_token);
        self.call(&format!("{name}_by_next_token"), params).await
    }

    fn prepare(&self, name: &str, mut params: Parameters) -> Result<(String, FlatParams, u16)> {
        let spec = self.section.operation(name)?;

        if let Some(key) = self.section.marketplace_key(spec)
            && !key_spellings(&key).iter().any(|k| params.contains_text_key(k))
        {
            params.insert(key, self.marketplace.id);
        }

        let registry = self.section.registry_for(spec);
        let skip: Vec<&str> = spec.skip_structured.iter().map(String::as_str).collect();
        let flat = params.finalize(&registry, &skip)?;

        Ok((spec.action.clone(), flat, spec.expects))
    }

    /// Sends an action with finalized parameters and decodes the response.
    ///
    /// Parameters are layered in this order, later layers winning: shared defaults, the
    /// configuration's defaults, `SellerId`/`MWSAuthToken`/`Version`, `params`, `Action`.
    ///
    /// A response with status `expects` clears the staged body and is routed to its decoder.
    /// Any other status keeps the body and is classified: a service error document is handed
    /// to the client's handler, then the shared handler, then re-raised as
    /// [`MwsError::Domain`]. An unclassifiable failure is returned as
    /// [`MwsError::UnexpectedStatus`] with the full response.
    ///
    /// # Errors
    ///
    /// Returns transport errors unchanged, classification results as above, and
    /// [`MwsError::XmlError`] for malformed XML bodies.
    #[instrument(
        skip_all,
        fields(
            action = %action,
            marketplace = %self.marketplace.id,
            params = params.len(),
            has_body = self.body.is_some(),
        )
    )]
    pub async fn run<F>(
        &mut self,
        action: &str,
        params: FlatParams,
        expects: u16,
        on_chunk: Option<F>,
    ) -> Result<ParsedResponse>
    where
        F: FnMut(&[u8]) + Send,
    {
        let mut request = self.build_request(action, params);

        if let Some(ref signer) = self.signer {
            signer.sign(&mut request)?;
        }

        let mut on_chunk = on_chunk;
        let callback = on_chunk.as_mut().map(|f| f as &mut ChunkCallback<'_>);
        let response = self.transport.post(&request, callback).await?;
        let status = response.status;

        if status != expects {
            return self.fail(response);
        }

        self.body = None;
        info!(status, request_id = response.request_id(), "request completed");
        route(response, self.encoding())
    }

    fn build_request(&self, action: &str, params: FlatParams) -> PreparedRequest {
        let mut request = PreparedRequest::new(self.endpoint());

        let query = &mut request.query;
        query.extend(self.defaults.params.iter().map(|(k, v)| (k.clone(), v.clone())));
        query.extend(self.config.default_params.iter().map(|(k, v)| (k.clone(), v.clone())));
        if let Some(ref merchant_id) = self.config.merchant_id {
            query.insert("SellerId".to_owned(), merchant_id.clone());
        }
        if let Some(ref auth_token) = self.config.auth_token {
            query.insert("MWSAuthToken".to_owned(), auth_token.clone());
        }
        if let Some(version) = self.config.version.as_ref().or(self.section.version.as_ref()) {
            query.insert("Version".to_owned(), version.clone());
        }
        query.extend(params);
        query.insert("Action".to_owned(), action.to_owned());

        if let Some(ref body) = self.body {
            let (content_type, bytes) = if body.starts_with(XML_DECLARATION) {
                ("text/xml".to_owned(), body.as_bytes().to_vec())
            } else {
                let encoding = self.encoding();
                (
                    format!("text/tab-separated-values; charset={}", encoding.label()),
                    encoding.encode(body).into_owned(),
                )
            };
            request.headers.push(("Content-Type".to_owned(), content_type));
            request.body = Some(bytes);
        }

        request
    }

    fn fail(&self, response: ResponseEnvelope) -> Result<ParsedResponse> {
        let status = response.status;

        match classify(&response) {
            Some(error) => {
                debug!(status, code = %error.code, "service reported an error");
                let handler =
                    resolve_handler(self.error_handler.as_ref(), self.defaults.error_handler.as_ref());
                handler(error)
            }
            None => {
                warn!(status, request_id = response.request_id(), "unclassified failure response");
                Err(MwsError::UnexpectedStatus { status, response: Box::new(response) })
            }
        }
    }
}

impl<T: Transport + fmt::Debug> fmt::Debug for MwsClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MwsClient")
            .field("config", &self.config)
            .field("section", &self.section.name)
            .field("marketplace", &self.marketplace.id)
            .field("transport", &self.transport)
            .field("defaults", &self.defaults)
            .field("signer", &self.signer.is_some())
            .field("error_handler", &self.error_handler.is_some())
            .field("body", &self.body.as_ref().map(String::len))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Debug, Default)]
    struct Recorder {
        requests: Mutex<Vec<PreparedRequest>>,
        status: u16,
    }

    impl Recorder {
        fn answering(status: u16) -> Self {
            Self { requests: Mutex::default(), status }
        }

        fn last(&self) -> PreparedRequest {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl Transport for Recorder {
        async fn post<'a>(
            &'a self,
            request: &'a PreparedRequest,
            _on_chunk: Option<&'a mut ChunkCallback<'a>>,
        ) -> Result<ResponseEnvelope> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(ResponseEnvelope { status: self.status, ..ResponseEnvelope::default() })
        }
    }

    fn client(config: ClientConfig, section: ApiSection, status: u16) -> MwsClient<Recorder> {
        MwsClient::with_transport(config, section, Recorder::answering(status)).unwrap()
    }

    #[test]
    fn test_rejects_invalid_marketplace() {
        let result = MwsClient::with_transport(ClientConfig::new("ZZ"), ApiSection::orders(), Recorder::default());
        assert!(matches!(result, Err(MwsError::InvalidMarketplace(_))));
    }

    #[test]
    fn test_endpoint_uses_marketplace_host_and_path_override() {
        let jp = client(ClientConfig::new("JP"), ApiSection::orders(), 200);
        assert_eq!(jp.endpoint(), "https://mws.amazonservices.jp/Orders/2013-09-01");
        assert_eq!(jp.encoding(), TextEncoding::Windows31J);

        let mut config = ClientConfig::new("US");
        config.path = Some("/Orders/2011-01-01".to_owned());
        config.scheme = "http".to_owned();
        let us = client(config, ApiSection::orders(), 200);
        assert_eq!(us.endpoint(), "http://mws.amazonservices.com/Orders/2011-01-01");
    }

    #[test]
    fn test_parameter_layering() {
        let defaults = Arc::new(ClientDefaults::new().param("Shared", "1").param("SellerId", "shadowed"));
        let config = ClientConfig::new("US")
            .merchant_id("SELLER")
            .auth_token("token")
            .default_param("Shared", "2");
        let client = client(config, ApiSection::sellers(), 200).with_defaults(defaults);

        let mut params = FlatParams::new();
        params.insert("Version".to_owned(), "2099-01-01".to_owned());
        params.insert("Action".to_owned(), "Ignored".to_owned());
        let request = client.build_request("GetServiceStatus", params);

        assert_eq!(request.query["Shared"], "2");
        assert_eq!(request.query["SellerId"], "SELLER");
        assert_eq!(request.query["MWSAuthToken"], "token");
        assert_eq!(request.query["Version"], "2099-01-01");
        assert_eq!(request.query["Action"], "GetServiceStatus");
    }

    #[test]
    fn test_version_override_from_config() {
        let mut config = ClientConfig::new("US");
        config.version = Some("2011-01-01".to_owned());
        let client = client(config, ApiSection::orders(), 200);

        let request = client.build_request("ListOrders", FlatParams::new());
        assert_eq!(request.query["Version"], "2011-01-01");
        assert!(!request.query.contains_key("SellerId"));
        assert!(!request.query.contains_key("MWSAuthToken"));
    }

    #[test]
    fn test_xml_body_is_sent_as_is() {
        let mut client = client(ClientConfig::new("DE"), ApiSection::feeds(), 200);
        client.set_body("<?xml version=\"1.0\"?><AmazonEnvelope/>");

        let request = client.build_request("SubmitFeed", FlatParams::new());
        assert_eq!(request.header("Content-Type"), Some("text/xml"));
        assert_eq!(request.body.as_deref(), Some(&b"<?xml version=\"1.0\"?><AmazonEnvelope/>"[..]));
    }

    #[test]
    fn test_flat_file_body_is_encoded_for_marketplace() {
        let mut client = client(ClientConfig::new("FR"), ApiSection::feeds(), 200);
        client.set_body("sku\tprice\ncafé\t1\n");

        let request = client.build_request("SubmitFeed", FlatParams::new());
        assert_eq!(
            request.header("Content-Type"),
            Some("text/tab-separated-values; charset=CP1252")
        );
        let body = request.body.unwrap();
        assert!(body.contains(&0xE9));
        assert!(!body.windows(2).any(|w| w == [0xC3, 0xA9]));
    }

    #[test]
    fn test_prepare_injects_marketplace_once() {
        let client = client(ClientConfig::new("US"), ApiSection::orders(), 200);

        let (action, flat, expects) = client.prepare("list_orders", Parameters::new()).unwrap();
        assert_eq!(action, "ListOrders");
        assert_eq!(expects, 200);
        assert_eq!(flat["MarketplaceId.Id.1"], "ATVPDKIKX0DER");

        let params = Parameters::new().with(ParamKey::symbol("marketplace_id"), vec!["A1", "A2"]);
        let (_, flat, _) = client.prepare("list_orders", params).unwrap();
        assert_eq!(flat["MarketplaceId.Id.1"], "A1");
        assert_eq!(flat["MarketplaceId.Id.2"], "A2");
        assert_eq!(flat.len(), 2);
    }

    #[test]
    fn test_prepare_products_honours_snake_case_marketplace() {
        let client = client(ClientConfig::new("GB"), ApiSection::products(), 200);

        let (_, flat, _) = client.prepare("get_my_price_for_sku", Parameters::new()).unwrap();
        assert_eq!(flat["MarketplaceId"], "A1F83G8C2ARO7P");

        let params = Parameters::new().with(ParamKey::symbol("marketplace_id"), "A13V1IB3VIYZZH");
        let (_, flat, _) = client.prepare("get_my_price_for_sku", params).unwrap();
        assert_eq!(flat["MarketplaceId.Id.1"], "A13V1IB3VIYZZH");
        assert!(!flat.contains_key("MarketplaceId"));
        assert_eq!(flat.len(), 1);
    }

    #[test]
    fn test_prepare_respects_skip_list() {
        let client = client(ClientConfig::new("US"), ApiSection::orders(), 200);

        let params = Parameters::new().with(ParamKey::symbol("amazon_order_id"), "123-456");
        let (_, flat, _) = client.prepare("list_order_items", params).unwrap();
        assert_eq!(flat["AmazonOrderId"], "123-456");
        assert!(!flat.contains_key("MarketplaceId"));
    }

    #[test]
    fn test_prepare_unknown_operation() {
        let client = client(ClientConfig::new("US"), ApiSection::orders(), 200);
        assert!(matches!(
            client.prepare("list_widgets", Parameters::new()),
            Err(MwsError::UnknownOperation(_))
        ));
    }

    #[tokio::test]
    async fn test_body_cleared_on_success_kept_on_failure() {
        let mut ok = client(ClientConfig::new("US"), ApiSection::feeds(), 200);
        ok.set_body("a\tb\n");
        let parsed = ok.call("submit_feed", Parameters::new()).await.unwrap();
        assert!(ok.body().is_none());
        assert!(!parsed.valid());
        assert_eq!(ok.transport().last().query["Action"], "SubmitFeed");

        let mut failing = client(ClientConfig::new("US"), ApiSection::feeds(), 500);
        failing.set_body("a\tb\n");
        let err = failing.call("submit_feed", Parameters::new()).await.unwrap_err();
        assert!(matches!(err, MwsError::UnexpectedStatus { status: 500, .. }));
        assert_eq!(failing.body(), Some("a\tb\n"));
    }

    #[test]
    fn test_debug_hides_secrets() {
        let client = client(ClientConfig::new("US").auth_token("secret"), ApiSection::orders(), 200);
        let debug = format!("{client:?}");
        assert!(debug.contains("Orders"));
        assert!(!debug.contains("secret"));
    }
}
