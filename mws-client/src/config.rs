//! Client configuration.
//!
//! [`ClientConfig`] holds the values a client is composed with: the primary marketplace,
//! seller credentials, optional path and version overrides, class-level default parameters and
//! the HTTP transport settings. It is read once at composition time and never mutated while
//! requests run.
//!
//! # Examples
//!
//! ```
//! use mws_client::config::ClientConfig;
//!
//! let config = ClientConfig::from_toml(r#"
//!     primary_marketplace_id = "UK"
//!     merchant_id = "SELLER123"
//!
//!     [http]
//!     timeout_secs = 60
//! "#)?;
//!
//! assert_eq!(config.marketplace()?.country_code, "GB");
//! assert_eq!(config.scheme, "https");
//! # Ok::<(), mws_client::MwsError>(())
//! ```

use std::{fmt, path::Path};

use indexmap::IndexMap;
use serde::Deserialize;

use crate::{
    catalog::validate_api_path,
    error::{MwsError, Result},
    marketplace::Marketplace,
    transport::HttpConfig,
};

/// Configuration of one client.
#[derive(Clone, Deserialize)]
pub struct ClientConfig {
    /// Marketplace identifier or country code.
    pub primary_marketplace_id: String,

    /// Seller identifier sent as `SellerId`.
    #[serde(default)]
    pub merchant_id: Option<String>,

    /// Delegated access token sent as `MWSAuthToken`.
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Overrides the section path.
    #[serde(default)]
    pub path: Option<String>,

    /// Overrides the section version.
    #[serde(default)]
    pub version: Option<String>,

    /// URL scheme (`https` or `http`).
    #[serde(default = "default_scheme")]
    pub scheme: String,

    /// Parameters sent with every request unless the client or operation sets them.
    #[serde(default)]
    pub default_params: IndexMap<String, String>,

    /// Transport settings.
    #[serde(default)]
    pub http: HttpConfig,
}

impl ClientConfig {
    /// Creates a configuration for a marketplace with everything else defaulted.
    #[must_use]
    pub fn new(primary_marketplace_id: impl Into<String>) -> Self {
        Self {
            primary_marketplace_id: primary_marketplace_id.into(),
            merchant_id: None,
            auth_token: None,
            path: None,
            version: None,
            scheme: default_scheme(),
            default_params: IndexMap::new(),
            http: HttpConfig::default(),
        }
    }

    /// Sets the seller identifier.
    #[must_use]
    pub fn merchant_id(mut self, merchant_id: impl Into<String>) -> Self {
        self.merchant_id = Some(merchant_id.into());
        self
    }

    /// Sets the delegated access token.
    #[must_use]
    pub fn auth_token(mut self, auth_token: impl Into<String>) -> Self {
        self.auth_token = Some(auth_token.into());
        self
    }

    /// Adds a class-level default parameter.
    #[must_use]
    pub fn default_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_params.insert(key.into(), value.into());
        self
    }

    /// Parses and validates a TOML configuration.
    ///
    /// # Errors
    ///
    /// Returns [`MwsError::ConfigError`] on malformed TOML, or the error
    /// [`validate`](Self::validate) reports.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str)
            .map_err(|e| MwsError::ConfigError(format!("invalid client TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`MwsError::ConfigError`] if the file cannot be read, plus any error of
    /// [`from_toml`](Self::from_toml).
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            MwsError::ConfigError(format!("cannot read {}: {e}", path.as_ref().display()))
        })?;
        Self::from_toml(&content)
    }

    /// Validates the configuration.
    ///
    /// Checks that:
    /// - the marketplace resolves
    /// - the path override, if any, starts with `/` and has no `..` or `//`
    /// - the scheme is `http` or `https`
    /// - the HTTP settings are in range
    ///
    /// # Errors
    ///
    /// Returns [`MwsError::InvalidMarketplace`] for an unknown marketplace,
    /// [`MwsError::ConfigError`] for a bad path or scheme, and [`MwsError::TransportError`]
    /// for out-of-range HTTP settings.
    pub fn validate(&self) -> Result<()> {
        self.marketplace()?;

        if let Some(ref path) = self.path {
            validate_api_path("path", path)?;
        }

        if !matches!(self.scheme.as_str(), "https" | "http") {
            return Err(MwsError::ConfigError(format!(
                "scheme must be http or https, got: {}",
                self.scheme
            )));
        }

        self.http.validate()
    }

    /// Resolves the primary marketplace.
    ///
    /// # Errors
    ///
    /// Returns [`MwsError::InvalidMarketplace`] if it does not resolve.
    pub fn marketplace(&self) -> Result<&'static Marketplace> {
        Marketplace::resolve(Some(&self.primary_marketplace_id))
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("primary_marketplace_id", &self.primary_marketplace_id)
            .field("merchant_id", &self.merchant_id)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("path", &self.path)
            .field("version", &self.version)
            .field("scheme", &self.scheme)
            .field("default_params", &self.default_params)
            .field("http", &self.http)
            .finish()
    }
}

fn default_scheme() -> String {
    "https".to_owned()
}
