//! HTTP transport settings.
//!
//! Read from the `[http]` table of a client configuration. Every key is optional.

use std::{ops::RangeInclusive, time::Duration};

use serde::Deserialize;

use crate::error::{MwsError, Result};

const TIMEOUT_RANGE: RangeInclusive<u64> = 1..=300;
const CONNECT_TIMEOUT_RANGE: RangeInclusive<u64> = 1..=60;

/// Settings for [`HttpTransport`](super::HttpTransport).
///
/// ```toml
/// [http]
/// timeout_secs = 120
/// connect_timeout_secs = 5
/// http_version = "http1"
/// user_agent = "acme-seller-tools/2.1 (Language=Rust)"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Idle keep-alive connections per MWS host.
    pub pool_max_idle_per_host: usize,
    /// Whole-request timeout in seconds, body download included.
    pub timeout_secs: u64,
    /// TCP and TLS connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Protocol negotiation.
    pub http_version: HttpVersion,
    /// `User-Agent` header. MWS asks for `Application/Version (Language=...)`.
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            pool_max_idle_per_host: 100,
            timeout_secs: 30,
            connect_timeout_secs: 10,
            http_version: HttpVersion::Auto,
            user_agent: concat!("mws-client/", env!("CARGO_PKG_VERSION"), " (Language=Rust)")
                .to_owned(),
        }
    }
}

impl HttpConfig {
    /// Rejects out-of-range timeouts and a blank user agent.
    ///
    /// # Errors
    ///
    /// Returns [`MwsError::TransportError`] naming the offending key.
    pub fn validate(&self) -> Result<()> {
        check_range("timeout_secs", self.timeout_secs, &TIMEOUT_RANGE)?;
        check_range("connect_timeout_secs", self.connect_timeout_secs, &CONNECT_TIMEOUT_RANGE)?;

        if self.user_agent.trim().is_empty() {
            return Err(MwsError::TransportError("user_agent must not be blank".to_owned()));
        }
        Ok(())
    }

    /// Whole-request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Connect timeout.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn check_range(key: &str, value: u64, range: &RangeInclusive<u64>) -> Result<()> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(MwsError::TransportError(format!(
            "{key} must be between {} and {}, got {value}",
            range.start(),
            range.end()
        )))
    }
}

/// Which HTTP protocol to speak.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpVersion {
    /// HTTP/1.1 only.
    Http1,
    /// HTTP/2 with prior knowledge.
    Http2,
    /// Negotiated through ALPN.
    #[default]
    Auto,
}
