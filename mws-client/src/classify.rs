//! Error classification.
//!
//! A failed response whose body is an `ErrorResponse/Error` document becomes a
//! [`DomainError`] carrying the service's code, type and message. Anything else is left
//! unclassified so the caller can surface the original failure unchanged.
//!
//! Classified errors are passed to an [`ErrorHandler`]. The dispatcher resolves the handler
//! from the client first, then from the shared defaults, and finally falls back to
//! [`raise`], which turns the error into [`MwsError::Domain`].

use std::sync::Arc;

use thiserror::Error;

use crate::{
    error::{MwsError, Result},
    response::{ParsedResponse, xml::parse_document},
    transport::ResponseEnvelope,
};

/// An error reported by the service in an `ErrorResponse` document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct DomainError {
    /// Machine-readable error code, e.g. `RequestThrottled`.
    pub code: String,
    /// Fault side reported by the service (`Sender` or `Receiver`).
    pub error_type: Option<String>,
    /// Human-readable message. Empty when the service sent none.
    pub message: String,
    /// HTTP status of the failed response.
    pub status: u16,
    /// The failed response.
    pub response: Box<ResponseEnvelope>,
}

/// Handles classified errors on behalf of the dispatcher.
///
/// A handler may recover by returning a response (for instance an empty result for
/// `InvalidParameterValue` on optional lookups) or propagate an error.
pub type ErrorHandler = Arc<dyn Fn(DomainError) -> Result<ParsedResponse> + Send + Sync>;

/// Classifies a failed response.
///
/// Returns `None` when the body is absent, is not XML, or lacks an
/// `ErrorResponse/Error/Code` element.
///
/// # Examples
///
/// ```
/// use mws_client::{classify::classify, transport::ResponseEnvelope};
///
/// let envelope = ResponseEnvelope {
///     status: 400,
///     headers: vec![],
///     body: Some(b"<ErrorResponse><Error><Code>X</Code><Message>Y</Message></Error></ErrorResponse>".to_vec()),
/// };
/// let error = classify(&envelope).unwrap();
/// assert_eq!(error.code, "X");
/// assert_eq!(error.message, "Y");
/// ```
#[must_use]
pub fn classify(envelope: &ResponseEnvelope) -> Option<DomainError> {
    let body = envelope.body.as_deref()?;
    let root = parse_document(body).ok()?;
    if root.name != "ErrorResponse" {
        return None;
    }

    let error = root.child("Error")?;
    let code = error.child_text("Code")?.to_owned();

    Some(DomainError {
        code,
        error_type: error.child_text("Type").map(str::to_owned),
        message: error.child_text("Message").unwrap_or_default().to_owned(),
        status: envelope.status,
        response: Box::new(envelope.clone()),
    })
}

/// The library-wide fallback handler: propagates the error.
///
/// # Errors
///
/// Always returns [`MwsError::Domain`].
pub fn raise(error: DomainError) -> Result<ParsedResponse> {
    Err(MwsError::Domain(error))
}

/// Returns the first registered handler, or [`raise`].
pub(crate) fn resolve_handler<'h>(
    instance: Option<&'h ErrorHandler>,
    shared: Option<&'h ErrorHandler>,
) -> &'h (dyn Fn(DomainError) -> Result<ParsedResponse> + Send + Sync) {
    match instance.or(shared) {
        Some(handler) => handler.as_ref(),
        None => &raise,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::ResponseKind;

    fn failed(status: u16, body: Option<&str>) -> ResponseEnvelope {
        ResponseEnvelope {
            status,
            headers: vec![("Content-Type".to_owned(), "text/xml".to_owned())],
            body: body.map(|b| b.as_bytes().to_vec()),
        }
    }

    #[test]
    fn test_classifies_error_response() {
        let body = "<ErrorResponse><Error><Code>X</Code><Message>Y</Message></Error></ErrorResponse>";
        let error = classify(&failed(400, Some(body))).unwrap();

        assert_eq!(error.code, "X");
        assert_eq!(error.message, "Y");
        assert_eq!(error.error_type, None);
        assert_eq!(error.status, 400);
        assert_eq!(error.to_string(), "X: Y");
    }

    #[test]
    fn test_type_and_namespace() {
        let body = r#"<?xml version="1.0"?>
            <ErrorResponse xmlns="https://mws.amazonservices.com/Orders/2013-09-01">
              <Error>
                <Type>Sender</Type>
                <Code>RequestThrottled</Code>
                <Message>Request is throttled</Message>
              </Error>
              <RequestID>abc</RequestID>
            </ErrorResponse>"#;
        let error = classify(&failed(503, Some(body))).unwrap();

        assert_eq!(error.code, "RequestThrottled");
        assert_eq!(error.error_type.as_deref(), Some("Sender"));
        assert_eq!(error.response.status, 503);
    }

    #[test]
    fn test_unclassifiable_bodies() {
        assert!(classify(&failed(500, Some("Internal Server Error"))).is_none());
        assert!(classify(&failed(500, Some("<html><body>oops</body></html>"))).is_none());
        assert!(classify(&failed(400, Some("<ErrorResponse><Error><Message>m</Message></Error></ErrorResponse>"))).is_none());
        assert!(classify(&failed(400, Some("<ErrorResponse/>"))).is_none());
        assert!(classify(&failed(502, None)).is_none());
    }

    #[test]
    fn test_raise_propagates() {
        let error = classify(&failed(401, Some(
            "<ErrorResponse><Error><Code>AccessDenied</Code></Error></ErrorResponse>",
        )))
        .unwrap();

        assert_eq!(error.message, "");
        match raise(error) {
            Err(MwsError::Domain(domain)) => assert_eq!(domain.code, "AccessDenied"),
            other => panic!("expected Domain error, got {other:?}"),
        }
    }

    #[test]
    fn test_handler_resolution_order() {
        let body = "<ErrorResponse><Error><Code>C</Code></Error></ErrorResponse>";
        let domain = || classify(&failed(400, Some(body))).unwrap();

        let instance: ErrorHandler = Arc::new(|e| Ok(ParsedResponse::Raw(*e.response)));
        let shared: ErrorHandler = Arc::new(|e| Err(MwsError::InvalidParameter(e.code)));

        let handler = resolve_handler(Some(&instance), Some(&shared));
        assert_eq!(handler(domain()).unwrap().kind(), ResponseKind::Raw);

        let handler = resolve_handler(None, Some(&shared));
        assert!(matches!(handler(domain()), Err(MwsError::InvalidParameter(_))));

        let handler = resolve_handler(None, None);
        assert!(matches!(handler(domain()), Err(MwsError::Domain(_))));
    }
}
