//! Error types for the MWS client.
//!
//! Every fallible operation in this crate returns [`Result<T>`], whose error
//! type is [`MwsError`]. All variants implement [`std::error::Error`] via
//! [`thiserror::Error`].
//!
//! # Error Categories
//!
//! - **Input errors** ([`MwsError::InvalidMarketplace`], [`MwsError::ParameterConversion`],
//!   [`MwsError::InvalidParameter`], [`MwsError::UnknownOperation`]): fatal, never retried
//! - **Transport errors** ([`MwsError::HttpError`], [`MwsError::UnexpectedStatus`]): the
//!   request reached (or failed to reach) the remote service
//! - **Service errors** ([`MwsError::Domain`]): a failed response the service explained with
//!   an `ErrorResponse` document
//! - **Decoding errors** ([`MwsError::XmlError`], [`MwsError::FlatFileError`]): the body
//!   could not be read
//!
//! Integrity problems (checksum or content length mismatches) are not errors. They are
//! reported through the `valid()` methods of the decoders so callers opt in to enforcing them.
//!
//! # Examples
//!
//! ```
//! use mws_client::{MwsError, marketplace::Marketplace};
//!
//! let err = Marketplace::resolve(Some("ZZ")).unwrap_err();
//! assert!(matches!(err, MwsError::InvalidMarketplace(_)));
//! assert_eq!(err.to_string(), r#""ZZ" is not a valid marketplace"#);
//! ```

use thiserror::Error;

use crate::{classify::DomainError, transport::ResponseEnvelope};

/// Result type alias for MWS client operations.
pub type Result<T> = std::result::Result<T, MwsError>;

/// Errors that can occur while marshaling, dispatching, or decoding an MWS call.
///
/// # Error Recovery
///
/// - **Transient errors** ([`HttpError`](Self::HttpError), 5xx
///   [`UnexpectedStatus`](Self::UnexpectedStatus), throttled [`Domain`](Self::Domain)):
///   retry with [`crate::reliability::retry_with_backoff`]
/// - **Input errors**: fix the marketplace, parameters, or catalog and retry
/// - **Decoding errors**: usually a service-side issue; inspect the raw body
#[must_use = "errors should be handled, propagated, or explicitly panicked"]
#[derive(Debug, Error)]
pub enum MwsError {
    /// The marketplace identifier or country code is missing or unknown.
    ///
    /// The display form is the bare message: `missing marketplace` or
    /// `"<input>" is not a valid marketplace`.
    #[error("{0}")]
    InvalidMarketplace(String),

    /// A value claiming to be a point in time could not be converted.
    #[error("cannot convert parameter '{key}' to a timestamp: {message}")]
    ParameterConversion {
        /// Parameter key as supplied by the caller.
        key: String,
        /// Underlying conversion failure.
        message: String,
    },

    /// A parameter value cannot be rendered into the flat wire format.
    ///
    /// Raised for list values under keys that have no structured-list registration.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The HTTP request failed before a response was received.
    ///
    /// Wraps [`reqwest::Error`]: timeouts, connection failures, TLS errors and
    /// body read failures surface here unchanged.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The service answered with a status other than the expected one and the body
    /// could not be classified into a service error.
    ///
    /// The full response is kept so no information is lost.
    #[error("unexpected HTTP status {status}")]
    UnexpectedStatus {
        /// HTTP status code.
        status: u16,
        /// The failed response.
        response: Box<ResponseEnvelope>,
    },

    /// The service reported an error document (`ErrorResponse/Error`).
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The XML body could not be parsed.
    #[error("XML parsing error: {0}")]
    XmlError(String),

    /// The tab-separated body could not be read.
    #[error("flat file parsing error: {0}")]
    FlatFileError(#[from] csv::Error),

    /// Client configuration or operation catalog is invalid.
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// The transport could not be built or the request URL could not be assembled.
    #[error("Transport error: {0}")]
    TransportError(String),

    /// The operation is not part of the API section's catalog.
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),
}

impl MwsError {
    /// Returns the HTTP status attached to this error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::UnexpectedStatus { status, .. } => Some(*status),
            Self::Domain(domain) => Some(domain.status),
            Self::HttpError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<quick_xml::Error> for MwsError {
    fn from(err: quick_xml::Error) -> Self {
        Self::XmlError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_marketplace_display_is_bare_message() {
        let error = MwsError::InvalidMarketplace("missing marketplace".to_owned());
        assert_eq!(error.to_string(), "missing marketplace");
    }

    #[test]
    fn test_parameter_conversion_display() {
        let error = MwsError::ParameterConversion {
            key: "created_after".to_owned(),
            message: "premature end of input".to_owned(),
        };
        assert_eq!(
            error.to_string(),
            "cannot convert parameter 'created_after' to a timestamp: premature end of input"
        );
    }

    #[test]
    fn test_unexpected_status_keeps_response() {
        let response = ResponseEnvelope {
            status: 500,
            headers: vec![],
            body: Some(b"oops".to_vec()),
        };
        let error = MwsError::UnexpectedStatus { status: 500, response: Box::new(response) };

        assert_eq!(error.to_string(), "unexpected HTTP status 500");
        assert_eq!(error.status(), Some(500));
        if let MwsError::UnexpectedStatus { response, .. } = error {
            assert_eq!(response.body.as_deref(), Some(&b"oops"[..]));
        }
    }

    #[test]
    fn test_status_absent_for_input_errors() {
        let error = MwsError::InvalidParameter("OrderStatus".to_owned());
        assert_eq!(error.status(), None);
        assert!(error.to_string().starts_with("Invalid parameter"));
    }

    #[test]
    fn test_config_error_display() {
        let error = MwsError::ConfigError("path must start with '/'".to_owned());
        assert_eq!(error.to_string(), "Invalid configuration: path must start with '/'");
    }
}
