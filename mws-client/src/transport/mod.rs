//! Transport abstraction layer.
//!
//! The dispatcher hands a fully [`PreparedRequest`] to a [`Transport`] and receives a
//! [`ResponseEnvelope`] back for any HTTP status. Non-success statuses are not errors at this
//! layer; the dispatcher decides what counts as a failure.
//!
//! # Architecture
//!
//! - **Transport**: moves bytes (POST only). [`HttpTransport`] is the `reqwest` implementation.
//! - **`RequestSigner`**: optional hook that adds authentication parameters to a prepared
//!   request before it is sent.
//!
//! # Examples
//!
//! ```rust,no_run
//! use mws_client::transport::{HttpTransport, PreparedRequest, Transport};
//!
//! # async fn example() -> mws_client::Result<()> {
//! let transport = HttpTransport::new()?;
//!
//! let mut request = PreparedRequest::new("https://mws.amazonservices.com/Sellers/2011-07-01");
//! request.query.insert("Action".to_owned(), "GetServiceStatus".to_owned());
//!
//! let response = transport.post(&request, None).await?;
//! println!("Status: {}", response.status);
//! # Ok(())
//! # }
//! ```

#[allow(
    redundant_imports,
    reason = "Future needed for RPITIT despite being in Edition 2024 prelude"
)]
use std::future::Future;

use url::Url;

use crate::{
    error::{MwsError, Result},
    params::FlatParams,
};

pub mod config;
pub mod http;

pub use config::{HttpConfig, HttpVersion};
pub use http::HttpTransport;

/// Callback invoked with each response chunk as it arrives.
pub type ChunkCallback<'c> = dyn FnMut(&[u8]) + Send + 'c;

/// A request ready for transmission.
///
/// Operation parameters always travel in the query string; the body, when present, is the
/// upload payload (a feed) already encoded for the marketplace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreparedRequest {
    /// Endpoint URL without query string (`scheme://host/path`).
    pub url: String,
    /// Finalized operation parameters.
    pub query: FlatParams,
    /// Extra request headers, such as `Content-Type`.
    pub headers: Vec<(String, String)>,
    /// Encoded request body.
    pub body: Option<Vec<u8>>,
}

impl PreparedRequest {
    /// Creates a request for an endpoint with no parameters, headers or body.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), ..Self::default() }
    }

    /// Returns the value of a request header, matched case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Builds the URL with the parameters form-encoded into the query string.
    ///
    /// # Errors
    ///
    /// Returns [`MwsError::TransportError`] if the endpoint is not an absolute
    /// `http`/`https` URL.
    pub fn full_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.url)
            .map_err(|e| MwsError::TransportError(format!("invalid endpoint '{}': {e}", self.url)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(MwsError::TransportError(format!(
                "unsupported scheme '{}' in endpoint",
                url.scheme()
            )));
        }

        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(self.query.iter());
        }

        Ok(url)
    }
}

/// A response as received: status, headers and raw body bytes.
///
/// Header names keep the casing the transport delivered them in; use
/// [`header`](Self::header) for lookups. An empty body is recorded as `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseEnvelope {
    /// HTTP status code.
    pub status: u16,
    /// Response headers in arrival order.
    pub headers: Vec<(String, String)>,
    /// Raw body bytes.
    pub body: Option<Vec<u8>>,
}

impl ResponseEnvelope {
    /// Returns the value of a response header, matched case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Returns the declared `Content-Type`.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header("Content-Type")
    }

    /// Returns the body bytes, or an empty slice when there is no body.
    #[must_use]
    pub fn body_bytes(&self) -> &[u8] {
        self.body.as_deref().unwrap_or_default()
    }
}

fn find_header<'h>(headers: &'h [(String, String)], name: &str) -> Option<&'h str> {
    headers.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
}

/// Moves prepared requests over the network.
///
/// Implementations return an envelope for every HTTP status and only fail when no response
/// was obtained (connection failure, timeout, cancelled body read).
///
/// # Examples
///
/// An in-memory transport, as used in tests:
///
/// ```
/// use mws_client::transport::{ChunkCallback, PreparedRequest, ResponseEnvelope, Transport};
///
/// #[derive(Debug)]
/// struct Canned(ResponseEnvelope);
///
/// impl Transport for Canned {
///     async fn post<'a>(
///         &'a self,
///         _request: &'a PreparedRequest,
///         _on_chunk: Option<&'a mut ChunkCallback<'a>>,
///     ) -> mws_client::Result<ResponseEnvelope> {
///         Ok(self.0.clone())
///     }
/// }
/// ```
pub trait Transport: Send + Sync {
    /// Executes a POST request.
    ///
    /// When `on_chunk` is given it is called with each body chunk, in arrival order, before
    /// the full body is returned in the envelope.
    ///
    /// # Errors
    ///
    /// Returns error if the request cannot be built or no response was received.
    fn post<'a>(
        &'a self,
        request: &'a PreparedRequest,
        on_chunk: Option<&'a mut ChunkCallback<'a>>,
    ) -> impl Future<Output = Result<ResponseEnvelope>> + Send + 'a;
}

/// Adds authentication parameters to a request before it is sent.
///
/// No signing algorithm ships with this crate; install one with
/// [`MwsClient::with_signer`](crate::client::MwsClient::with_signer).
pub trait RequestSigner: Send + Sync {
    /// Signs the request in place.
    ///
    /// # Errors
    ///
    /// Returns error if the request cannot be signed.
    fn sign(&self, request: &mut PreparedRequest) -> Result<()>;
}
