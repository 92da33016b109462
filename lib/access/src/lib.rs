//! Authentication, sessions, and course permissions for hours.
//!
//! This crate provides:
//! - Federated credential verification (`IdTokenVerifier`)
//! - Cookie-session issuance and resolution (`AuthService`, `Session`)
//! - Per-course permissions with subsumption (`CoursePermission`)
//! - Storage traits with in-memory implementations for tests
//!
//! # Access Control Model
//!
//! Identity comes from a federated sign-in provider; the provider's ID
//! token is exchanged exactly once for an opaque server-side session.
//! Authorization is per course: a user holds at most one permission per
//! course, `ADMIN` subsumes `STAFF`, and the global admin flag passes
//! every check. Permission changes take effect on the next request
//! without invalidating live sessions.
//!
//! # Example
//!
//! ```
//! use hours_access::{CoursePermission, Session, SessionId, User};
//! use hours_core::CourseId;
//! use chrono::Duration;
//!
//! // Provision a user after their first verified sign-in.
//! let mut user = User::new("provider-subject-1".to_string(), "alice@brown.edu".to_string());
//! user.grant_course_permission(CourseId::new("cs0320"), CoursePermission::Staff);
//!
//! // Issue a session.
//! let session = Session::new(SessionId::generate(), user.id(), Duration::days(14));
//!
//! assert!(session.is_active());
//! assert!(user.has_course_role(&CourseId::new("cs0320"), CoursePermission::Staff));
//! assert!(!user.has_course_role(&CourseId::new("cs0320"), CoursePermission::Admin));
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod role;
pub mod session;
pub mod store;
pub mod token;
pub mod user;

// Re-export main types at crate root
pub use auth::{AuthService, AuthenticatedUser, SignIn};
pub use config::VerifierConfig;
pub use error::{
    AuthenticationError, AuthorizationError, CredentialFault, SessionFault, StoreError,
    ValidationError,
};
pub use role::CoursePermission;
pub use session::{Session, SessionId};
pub use store::{MemorySessionStore, MemoryUserStore, SessionStore, UserStore};
pub use token::{IdTokenVerifier, KeyStore, StaticKeys, VerifiedIdentity, VerificationKey};
pub use user::{Profile, ProfileUpdate, User};
