//! Error types for the EventRelay server.
//!
//! [`ServerError`] is the failure type of every authenticated route. It
//! converts into an HTTP response with the uniform failure body:
//!
//! ```json
//! { "success": false, "error": "invalid session credentials" }
//! ```
//!
//! # Error Types
//!
//! - [`ServerError::InvalidSessionCredentials`] - unknown session, wrong key,
//!   or an unreadable `Authorization` header. Always the same 401 response.
//! - [`ServerError::Store`] - the backing store failed. Reported as a generic
//!   500; the cause is logged, not returned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;

/// Canonical message for every credential failure.
pub const INVALID_SESSION_CREDENTIALS: &str = "invalid session credentials";

/// Message returned for store and other internal failures.
pub const INTERNAL_SERVER_ERROR: &str = "internal server error";

/// Top-level error type for request handling.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The presented session credentials do not match a stored session.
    ///
    /// Deliberately carries no detail about which part was wrong.
    #[error("invalid session credentials")]
    InvalidSessionCredentials,

    /// The backing store could not complete a load or save.
    #[error("store failure: {0}")]
    Store(#[from] StoreError),
}

impl ServerError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidSessionCredentials => StatusCode::UNAUTHORIZED,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the message exposed to clients.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::InvalidSessionCredentials => INVALID_SESSION_CREDENTIALS,
            Self::Store(_) => INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns `true` if this error indicates a client-side problem.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidSessionCredentials)
    }

    /// Returns `true` if this error indicates a server-side problem.
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}

/// JSON body of a failed request.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        if let Self::Store(ref err) = self {
            error!(error = %err, "Store operation failed");
        }

        (
            self.status_code(),
            Json(ErrorResponse::new(self.public_message())),
        )
            .into_response()
    }
}

/// A specialized Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn invalid_credentials_maps_to_401() {
        let err = ServerError::InvalidSessionCredentials;
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.public_message(), "invalid session credentials");
        assert!(err.is_client_error());
        assert!(!err.is_server_error());
    }

    #[test]
    fn store_error_maps_to_500_with_generic_message() {
        let err = ServerError::from(StoreError::unavailable("disk on fire"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "internal server error");
        assert!(err.is_server_error());
        assert!(!err.is_client_error());
    }

    #[test]
    fn store_error_display_keeps_cause() {
        let err = ServerError::from(StoreError::unavailable("disk on fire"));
        assert_eq!(
            err.to_string(),
            "store failure: store unavailable: disk on fire"
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn from_store_error_works_with_question_mark() {
        fn inner() -> Result<()> {
            let _: () = Err(StoreError::unavailable("x"))?;
            Ok(())
        }

        assert!(matches!(inner().unwrap_err(), ServerError::Store(_)));
    }

    #[tokio::test]
    async fn into_response_hides_store_details() {
        let response = ServerError::from(StoreError::unavailable("disk on fire")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(!text.contains("disk on fire"));

        let parsed: ErrorResponse = serde_json::from_str(&text).unwrap();
        assert!(!parsed.success);
        assert_eq!(parsed.error, INTERNAL_SERVER_ERROR);
    }
}
