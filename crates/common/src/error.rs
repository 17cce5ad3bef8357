//! Common error types shared across crates.

use thiserror::Error;

/// Top-level service error type.
///
/// Variants map to HTTP status codes returned to callers:
/// - [`ServiceError::BadRequest`] → 400
/// - [`ServiceError::EncryptionFailure`] → 500
/// - [`ServiceError::Internal`] → 500
///
/// Messages must never contain field values or key material.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request was malformed: missing table header, or a row that is not a JSON object.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Encrypting a row failed; the caller must not persist anything.
    #[error("encryption failure: {0}")]
    EncryptionFailure(String),

    /// An unexpected internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::BadRequest(_) => 400,
            ServiceError::EncryptionFailure(_) => 500,
            ServiceError::Internal(_) => 500,
        }
    }

    /// Short machine-readable code for the error response body.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::BadRequest(_) => "bad_request",
            ServiceError::EncryptionFailure(_) => "encryption_failed",
            ServiceError::Internal(_) => "internal_error",
        }
    }

    /// Message safe to return to callers.
    ///
    /// Server-side failures collapse to a generic sentence; the detail is only logged.
    pub fn public_message(&self) -> String {
        match self {
            ServiceError::BadRequest(msg) => msg.clone(),
            ServiceError::EncryptionFailure(_) => "encryption failed".into(),
            ServiceError::Internal(_) => "internal error".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_codes() {
        assert_eq!(ServiceError::BadRequest("x".into()).http_status(), 400);
        assert_eq!(
            ServiceError::EncryptionFailure("x".into()).http_status(),
            500
        );
        assert_eq!(ServiceError::Internal("x".into()).http_status(), 500);
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(ServiceError::BadRequest("x".into()).code(), "bad_request");
        assert_eq!(
            ServiceError::EncryptionFailure("x".into()).code(),
            "encryption_failed"
        );
        assert_eq!(ServiceError::Internal("x".into()).code(), "internal_error");
    }

    #[test]
    fn display_includes_message() {
        let e = ServiceError::BadRequest("missing X-Table-Name header".into());
        assert!(e.to_string().contains("missing X-Table-Name header"));
    }

    #[test]
    fn public_message_hides_server_detail() {
        let e = ServiceError::EncryptionFailure("failed to encrypt transactions.amount".into());
        assert_eq!(e.public_message(), "encryption failed");
        let e = ServiceError::BadRequest("row must be a JSON object".into());
        assert_eq!(e.public_message(), "row must be a JSON object");
    }
}
