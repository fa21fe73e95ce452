//! HTTP transport implementation.
//!
//! POSTs prepared requests with `reqwest` and reads the body chunk by chunk so callers can
//! stream large reports while the full body is still collected for decoding.

use reqwest::{Client, header::USER_AGENT};
use tracing::{debug, instrument};

use super::config::{HttpConfig, HttpVersion};
use crate::{
    error::{MwsError, Result},
    transport::{ChunkCallback, PreparedRequest, ResponseEnvelope, Transport},
};

/// Rejects header names or values that could split the request line.
fn validate_header(name: &str, value: &str) -> Result<()> {
    let tainted = |text: &str| text.bytes().any(|b| matches!(b, b'\r' | b'\n' | 0));
    let part = if tainted(name) {
        "name"
    } else if tainted(value) {
        "value"
    } else {
        return Ok(());
    };
    Err(MwsError::TransportError(format!("header {part} for {:?} contains CR, LF or NUL", name.trim())))
}

fn collect_headers(map: &reqwest::header::HeaderMap) -> Vec<(String, String)> {
    map.iter()
        .filter_map(|(name, value)| Some((name.as_str().to_owned(), value.to_str().ok()?.to_owned())))
        .collect()
}

/// Sends MWS requests over a pooled `reqwest::Client`.
///
/// Cloning shares the pool, so one transport can back many clients.
///
/// # Examples
///
/// ```
/// use mws_client::transport::{HttpConfig, HttpTransport, HttpVersion};
///
/// let config = HttpConfig { timeout_secs: 120, http_version: HttpVersion::Http1, ..HttpConfig::default() };
/// let transport = HttpTransport::with_config(&config).unwrap();
/// assert_eq!(transport.protocol_name(), "http/1.1");
/// ```
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    user_agent: String,
    http_version: HttpVersion,
}

impl HttpTransport {
    /// Transport with [`HttpConfig::default`].
    ///
    /// # Errors
    ///
    /// Fails when the TLS backend cannot initialize.
    pub fn new() -> Result<Self> {
        Self::with_config(&HttpConfig::default())
    }

    /// Transport built from an `[http]` configuration table.
    ///
    /// # Errors
    ///
    /// Returns [`MwsError::TransportError`] for out-of-range settings and
    /// [`MwsError::HttpError`] if the client cannot be built.
    pub fn with_config(config: &HttpConfig) -> Result<Self> {
        config.validate()?;

        let base = Client::builder()
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .connect_timeout(config.connect_timeout())
            .timeout(config.timeout());
        let client = match config.http_version {
            HttpVersion::Http1 => base.http1_only(),
            HttpVersion::Http2 => base.http2_prior_knowledge(),
            HttpVersion::Auto => base,
        }
        .build()?;

        Ok(Self {
            client,
            user_agent: config.user_agent.clone(),
            http_version: config.http_version,
        })
    }

    /// Label recorded on the request span.
    #[must_use]
    pub fn protocol_name(&self) -> &'static str {
        match self.http_version {
            HttpVersion::Http1 => "http/1.1",
            HttpVersion::Http2 => "http/2",
            HttpVersion::Auto => "http",
        }
    }

    #[instrument(
        skip(self, request, on_chunk),
        fields(
            url = %request.url,
            params = request.query.len(),
            body_len = request.body.as_ref().map_or(0, Vec::len),
            protocol = self.protocol_name(),
        )
    )]
    async fn execute(
        &self,
        request: &PreparedRequest,
        mut on_chunk: Option<&mut ChunkCallback<'_>>,
    ) -> Result<ResponseEnvelope> {
        let url = request.full_url()?;

        let mut builder = self.client.post(url).header(USER_AGENT, &self.user_agent);
        for (name, value) in &request.headers {
            validate_header(name, value)?;
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let mut response = builder.send().await?;
        let status = response.status().as_u16();

        let headers = collect_headers(response.headers());

        let mut body = Vec::new();
        let mut chunks = 0_usize;
        while let Some(chunk) = response.chunk().await? {
            if let Some(callback) = on_chunk.as_deref_mut() {
                callback(&chunk);
            }
            body.extend_from_slice(&chunk);
            chunks += 1;
        }

        debug!(status, bytes = body.len(), chunks, "response received");

        Ok(ResponseEnvelope { status, headers, body: (!body.is_empty()).then_some(body) })
    }
}

impl Transport for HttpTransport {
    async fn post<'a>(
        &'a self,
        request: &'a PreparedRequest,
        on_chunk: Option<&'a mut ChunkCallback<'a>>,
    ) -> Result<ResponseEnvelope> {
        self.execute(request, on_chunk).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_transport_identifies_itself() {
        let transport = HttpTransport::new().unwrap();
        assert_eq!(transport.protocol_name(), "http");
        assert!(transport.user_agent.starts_with("mws-client/"));
    }

    #[test]
    fn test_pinned_protocols() {
        for (version, label) in [(HttpVersion::Http1, "http/1.1"), (HttpVersion::Http2, "http/2")] {
            let config = HttpConfig { http_version: version, ..HttpConfig::default() };
            assert_eq!(HttpTransport::with_config(&config).unwrap().protocol_name(), label);
        }
    }

    #[test]
    fn test_config_checked_before_build() {
        let config = HttpConfig { connect_timeout_secs: 61, ..HttpConfig::default() };
        assert!(matches!(HttpTransport::with_config(&config), Err(MwsError::TransportError(_))));

        let config = HttpConfig { user_agent: "seller-sync/3.4 (Language=Rust)".to_owned(), ..HttpConfig::default() };
        assert_eq!(HttpTransport::with_config(&config).unwrap().user_agent, "seller-sync/3.4 (Language=Rust)");
    }

    #[test]
    fn test_header_splitting_rejected() {
        assert!(validate_header("Content-MD5", "1B2M2Y8AsgTpgAmY7PhCfg==").is_ok());

        let err = validate_header("Content-Type\n", "text/xml").unwrap_err();
        assert!(err.to_string().contains("header name"));

        let err = validate_header("Content-Type", "text/xml\r\nX-Amz: 1").unwrap_err();
        assert!(err.to_string().contains("header value"));

        assert!(validate_header("x-amz-request-id", "abc\0").is_err());
    }

    #[tokio::test]
    async fn test_relative_url_never_sent() {
        let transport = HttpTransport::new().unwrap();
        let request = PreparedRequest::new("/Orders/2013-09-01");

        let result = transport.post(&request, None).await;
        assert!(matches!(result, Err(MwsError::TransportError(_))));
    }

    #[tokio::test]
    async fn test_tainted_feed_header_never_sent() {
        let transport = HttpTransport::new().unwrap();
        let mut request = PreparedRequest::new("https://mws.amazonservices.com/");
        request.headers.push(("Content-MD5".to_owned(), "abc\r\nHost: evil".to_owned()));

        let result = transport.post(&request, None).await;
        assert!(matches!(result, Err(MwsError::TransportError(_))));
    }
}
