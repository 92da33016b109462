//! Session management for authenticated users.
//!
//! A session binds an opaque client-held identifier to a user. The
//! identifier is the only value ever sent to the client; everything else
//! is resolved server-side through the session store.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use hours_core::UserId;
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Number of random bytes in a generated session ID. 32 bytes gives 256
/// bits of entropy, comfortably above the 128-bit floor for
/// unguessability.
const SESSION_ID_BYTES: usize = 32;

/// Unique identifier for a session.
///
/// Session IDs are opaque: no embedded structure, no claims. The store is
/// addressed by the full id, never by decoding anything out of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Creates a session ID from a string.
    #[must_use]
    pub fn new(id: String) -> Self {
        Self(id)
    }

    /// Generates a fresh session ID from the OS random source.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; SESSION_ID_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Returns the session ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the id has the shape of a generated token.
    ///
    /// Ids that fail this check can be rejected without a store lookup.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        !self.0.is_empty()
            && self.0.len() <= 64
            && self
                .0
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Represents a server-side session record.
///
/// Valid only while `now` is within `[issued_at, expires_at)` and the
/// session has not been revoked. Revocation is permanent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Unique identifier for this session.
    id: SessionId,
    /// The authenticated user's ID.
    user_id: UserId,
    /// When the session was created.
    issued_at: DateTime<Utc>,
    /// When the session expires.
    expires_at: DateTime<Utc>,
    /// Set on explicit sign-out; once true the session is permanently
    /// unusable regardless of expiry.
    revoked: bool,
}

impl Session {
    /// Creates a new session for the given user, valid for `ttl`.
    #[must_use]
    pub fn new(id: SessionId, user_id: UserId, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id,
            issued_at: now,
            expires_at: now + ttl,
            revoked: false,
        }
    }

    /// Reconstitutes a session from storage.
    #[must_use]
    pub fn from_parts(
        id: SessionId,
        user_id: UserId,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        revoked: bool,
    ) -> Self {
        Self {
            id,
            user_id,
            issued_at,
            expires_at,
            revoked,
        }
    }

    /// Returns the session ID.
    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Returns the authenticated user's ID.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns when the session was created.
    #[must_use]
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// Returns when the session expires.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Returns true if the session was revoked by sign-out.
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.revoked
    }

    /// Returns true if the session has passed its expiry.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Returns true if the session is live: not revoked and not expired.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.revoked && !self.is_expired()
    }

    /// Marks the session revoked. Idempotent.
    pub fn revoke(&mut self) {
        self.revoked = true;
    }
}
