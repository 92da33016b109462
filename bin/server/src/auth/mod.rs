//! Authentication module for the hours server.
//!
//! This module provides:
//! - The sign-in exchange: federated ID token in, session cookie out
//! - Database-backed session and user storage
//! - Authentication middleware/extractors for Axum routes
//!
//! # Authorization Model
//!
//! Sign-in is restricted by the verifier configuration (trusted issuer,
//! audience, and optionally an email domain). Authorization is per
//! course: `ADMIN` subsumes `STAFF`, and the global admin flag passes
//! every check. Permission checks read the user record fresh on every
//! request, so grants and revocations take effect on the next request
//! without touching existing sessions.

pub mod db;
pub mod keys;
pub mod middleware;
pub mod routes;

use hours_access::{AuthService, SessionStore, UserStore};
use std::sync::Arc;

use crate::config::SessionConfig;

pub use keys::RemoteKeyStore;
pub use middleware::RequireAuth;

/// Shared application state.
pub struct AppState {
    /// The authentication service: verification, issuance, resolution.
    pub auth: AuthService,
    /// User storage, shared with the service.
    pub users: Arc<dyn UserStore>,
    /// Session storage, shared with the service.
    pub sessions: Arc<dyn SessionStore>,
    /// Session configuration.
    pub session_config: SessionConfig,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(
        auth: AuthService,
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        session_config: SessionConfig,
    ) -> Self {
        Self {
            auth,
            users,
            sessions,
            session_config,
        }
    }
}
