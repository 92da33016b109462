//! HTTP error mapping for the API surface.
//!
//! Internally distinguished failures collapse to uniform responses here:
//! every authentication failure is the same 401, every authorization
//! failure the same 403. The internal cause is recorded via `tracing`
//! before it is erased.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use hours_access::{AuthenticationError, AuthorizationError, StoreError, ValidationError};
use serde_json::json;
use std::fmt;

/// An API-level error, already reduced to what the client may see.
#[derive(Debug)]
pub enum ApiError {
    /// Credential or session did not authenticate. Always the same 401.
    Unauthenticated,
    /// Authenticated but not permitted. Always the same 403.
    Forbidden,
    /// The requested resource does not exist.
    NotFound,
    /// A request field failed validation; the field is named.
    Validation { field: &'static str, reason: String },
    /// A backing store or the key provider is unreachable; retryable.
    Transient,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "not authenticated"),
            Self::Forbidden => write!(f, "forbidden"),
            Self::NotFound => write!(f, "not found"),
            Self::Validation { field, reason } => {
                write!(f, "invalid field '{field}': {reason}")
            }
            Self::Transient => write!(f, "service temporarily unavailable"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "not authenticated" }),
            ),
            Self::Forbidden => (StatusCode::FORBIDDEN, json!({ "error": "forbidden" })),
            Self::NotFound => (StatusCode::NOT_FOUND, json!({ "error": "not found" })),
            Self::Validation { field, reason } => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "invalid request", "field": field, "reason": reason }),
            ),
            Self::Transient => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({ "error": "service temporarily unavailable" }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

impl From<AuthenticationError> for ApiError {
    fn from(err: AuthenticationError) -> Self {
        if err.is_transient() {
            tracing::warn!(error = %err, "transient authentication failure");
            Self::Transient
        } else {
            // The specific fault was already traced where it occurred.
            Self::Unauthenticated
        }
    }
}

impl From<AuthorizationError> for ApiError {
    fn from(err: AuthorizationError) -> Self {
        tracing::debug!(error = %err, "authorization denied");
        Self::Forbidden
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::Validation {
            field: err.field,
            reason: err.reason,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        tracing::warn!(error = %err, "store failure");
        Self::Transient
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hours_access::CredentialFault;

    #[test]
    fn credential_and_session_faults_map_to_unauthenticated() {
        let err: ApiError = AuthenticationError::InvalidCredential {
            fault: CredentialFault::BadSignature,
        }
        .into();
        assert!(matches!(err, ApiError::Unauthenticated));
    }

    #[test]
    fn transient_failures_map_to_transient() {
        let err: ApiError = AuthenticationError::Transient {
            details: "connection refused".to_string(),
        }
        .into();
        assert!(matches!(err, ApiError::Transient));
    }

    #[test]
    fn validation_error_keeps_the_field_name() {
        let err: ApiError = ValidationError {
            field: "meetingLink",
            reason: "must be an http(s) URL".to_string(),
        }
        .into();
        match err {
            ApiError::Validation { field, .. } => assert_eq!(field, "meetingLink"),
            other => panic!("unexpected mapping: {other:?}"),
        }
    }
}
