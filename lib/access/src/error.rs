//! Error types for the access crate.
//!
//! The taxonomy keeps failure kinds distinguishable internally while the
//! transport layer presents them uniformly:
//! - `AuthenticationError`: credential and session failures
//! - `AuthorizationError`: permission check failures
//! - `ValidationError`: malformed profile input
//! - `StoreError`: transient store or key-provider failures

use hours_core::UserId;
use std::fmt;

/// The specific check a federated credential failed.
///
/// Recorded for observability only; callers are shown a generic
/// "sign-in failed" so the rejection never works as an oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialFault {
    /// Token is not a well-formed JWT.
    Malformed,
    /// No trusted key matches the token's key id.
    UnknownKey,
    /// Signature does not verify against the trusted key.
    BadSignature,
    /// Issuer claim does not match the configured issuer.
    WrongIssuer,
    /// Audience claim does not match this deployment's client id.
    WrongAudience,
    /// Token has expired.
    Expired,
    /// Token's `iat` is in the future.
    IssuedInFuture,
    /// No email claim present.
    MissingEmail,
    /// Email domain does not match the configured restriction.
    WrongDomain,
}

impl fmt::Display for CredentialFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed token"),
            Self::UnknownKey => write!(f, "no trusted key for token"),
            Self::BadSignature => write!(f, "signature verification failed"),
            Self::WrongIssuer => write!(f, "issuer mismatch"),
            Self::WrongAudience => write!(f, "audience mismatch"),
            Self::Expired => write!(f, "token expired"),
            Self::IssuedInFuture => write!(f, "token issued in the future"),
            Self::MissingEmail => write!(f, "no email claim"),
            Self::WrongDomain => write!(f, "email domain not permitted"),
        }
    }
}

/// Why a session failed to resolve.
///
/// Like [`CredentialFault`], these are distinguished for tracing only;
/// every variant surfaces to the caller as the same `401`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionFault {
    /// No session cookie on the request.
    Missing,
    /// Session id is not a plausible opaque token.
    Malformed,
    /// No session record with this id.
    NotFound,
    /// Session exists but has passed its expiry.
    Expired,
    /// Session was revoked by sign-out.
    Revoked,
    /// Session's user no longer exists.
    UserGone,
}

impl fmt::Display for SessionFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "no session"),
            Self::Malformed => write!(f, "malformed session id"),
            Self::NotFound => write!(f, "session not found"),
            Self::Expired => write!(f, "session expired"),
            Self::Revoked => write!(f, "session revoked"),
            Self::UserGone => write!(f, "session user no longer exists"),
        }
    }
}

/// Errors from authentication operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticationError {
    /// Federated credential failed verification. Definitive; never retried.
    InvalidCredential { fault: CredentialFault },
    /// Session cookie did not resolve to a live session. Definitive.
    Unauthenticated { fault: SessionFault },
    /// A store or key provider was unreachable. The only class eligible
    /// for caller-driven retry.
    Transient { details: String },
}

impl AuthenticationError {
    /// Returns true for failures the caller may retry with backoff.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

impl fmt::Display for AuthenticationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCredential { fault } => {
                write!(f, "invalid credential: {fault}")
            }
            Self::Unauthenticated { fault } => {
                write!(f, "unauthenticated: {fault}")
            }
            Self::Transient { details } => {
                write!(f, "transient failure: {details}")
            }
        }
    }
}

impl std::error::Error for AuthenticationError {}

impl From<StoreError> for AuthenticationError {
    fn from(err: StoreError) -> Self {
        Self::Transient {
            details: err.details,
        }
    }
}

/// Errors from authorization operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    /// User is authenticated but lacks the required permission.
    PermissionDenied { user_id: UserId, course: String },
    /// Global admin access is required.
    AdminRequired { user_id: UserId },
}

impl fmt::Display for AuthorizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PermissionDenied { user_id, course } => {
                write!(f, "user {user_id} lacks permission on course '{course}'")
            }
            Self::AdminRequired { user_id } => {
                write!(f, "user {user_id} is not a global admin")
            }
        }
    }
}

impl std::error::Error for AuthorizationError {}

/// A malformed profile field in a self-update request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The offending field, in the wire-format (camelCase) spelling.
    pub field: &'static str,
    /// What was wrong with it.
    pub reason: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid field '{}': {}", self.field, self.reason)
    }
}

impl std::error::Error for ValidationError {}

/// A store operation failed for infrastructure reasons.
///
/// Store errors are transient from the protocol's point of view; the
/// core never retries them itself to avoid duplicate session creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    pub details: String,
}

impl StoreError {
    #[must_use]
    pub fn new(details: impl Into<String>) -> Self {
        Self {
            details: details.into(),
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "store error: {}", self.details)
    }
}

impl std::error::Error for StoreError {}
