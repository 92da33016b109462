//! The identity-exchange and session-authorization protocol.
//!
//! [`AuthService`] ties the pieces together: it trades a verified
//! federated credential for a server-side session (`sign_in`), resolves
//! a session cookie back into an [`AuthenticatedUser`] on every request
//! (`resolve`), and revokes sessions on sign-out (`sign_out`).
//!
//! There is no process-wide "current user": each request gets a fresh
//! context from `resolve`, which also means permission changes take
//! effect on the next request without invalidating live sessions.

use chrono::Duration;
use hours_core::{CourseId, UserId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AuthenticationError, AuthorizationError, SessionFault};
use crate::role::CoursePermission;
use crate::session::{Session, SessionId};
use crate::store::{SessionStore, UserStore};
use crate::token::IdTokenVerifier;
use crate::user::User;

/// Request-scoped context for an authenticated user.
///
/// Produced fresh by [`AuthService::resolve`] per request. Carries the
/// user record and a read-only view of their course permissions.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    session: Session,
    user: User,
}

impl AuthenticatedUser {
    /// Creates a new authenticated context.
    #[must_use]
    pub fn new(session: Session, user: User) -> Self {
        Self { session, user }
    }

    /// Returns the authenticated user's ID.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user.id()
    }

    /// Returns the current session.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Returns the user record.
    #[must_use]
    pub fn user(&self) -> &User {
        &self.user
    }

    /// Returns the user's course permission grants.
    #[must_use]
    pub fn course_permissions(&self) -> &HashMap<CourseId, CoursePermission> {
        self.user.course_permissions()
    }

    /// Returns true if the user holds the global admin flag.
    #[must_use]
    pub fn is_global_admin(&self) -> bool {
        self.user.is_admin()
    }

    /// Returns true if the user satisfies `required` on `course`.
    ///
    /// Global admins pass every check; `Admin` on the course satisfies
    /// `Staff`; no entry means no role.
    #[must_use]
    pub fn has_course_role(&self, course: &CourseId, required: CoursePermission) -> bool {
        self.user.has_course_role(course, required)
    }

    /// Requires `required` on `course`.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` when the check fails.
    pub fn require_course_role(
        &self,
        course: &CourseId,
        required: CoursePermission,
    ) -> Result<(), AuthorizationError> {
        if self.has_course_role(course, required) {
            Ok(())
        } else {
            Err(AuthorizationError::PermissionDenied {
                user_id: self.user_id(),
                course: course.to_string(),
            })
        }
    }

    /// Requires the global admin flag.
    ///
    /// # Errors
    ///
    /// Returns `AdminRequired` when the user is not a global admin.
    pub fn require_global_admin(&self) -> Result<(), AuthorizationError> {
        if self.is_global_admin() {
            Ok(())
        } else {
            Err(AuthorizationError::AdminRequired {
                user_id: self.user_id(),
            })
        }
    }
}

/// Result of a successful sign-in.
#[derive(Debug, Clone)]
pub struct SignIn {
    /// The signed-in user (created on first sign-in).
    pub user: User,
    /// The freshly issued session.
    pub session: Session,
    /// Whether this sign-in provisioned a new user.
    pub is_new_user: bool,
}

/// The authentication service: credential exchange, session resolution,
/// and sign-out.
pub struct AuthService {
    verifier: IdTokenVerifier,
    sessions: Arc<dyn SessionStore>,
    users: Arc<dyn UserStore>,
    session_ttl: Duration,
}

impl AuthService {
    /// Creates the service.
    #[must_use]
    pub fn new(
        verifier: IdTokenVerifier,
        sessions: Arc<dyn SessionStore>,
        users: Arc<dyn UserStore>,
        session_ttl: Duration,
    ) -> Self {
        Self {
            verifier,
            sessions,
            users,
            session_ttl,
        }
    }

    /// Returns the configured session TTL.
    #[must_use]
    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    /// Exchanges a federated ID token for a new session.
    ///
    /// Verifies the token, finds or provisions the user by subject, and
    /// persists a fresh session. The raw token is never stored or
    /// logged.
    ///
    /// # Errors
    ///
    /// `InvalidCredential` when verification fails (nothing is created),
    /// `Transient` when a store is unreachable.
    pub async fn sign_in(&self, raw_token: &str) -> Result<SignIn, AuthenticationError> {
        let identity = self.verifier.verify(raw_token)?;

        let (user, is_new_user) = match self.users.find_by_subject(&identity.subject).await? {
            Some(mut user) => {
                // Refresh provider-sourced fields on every sign-in.
                if user.email() != identity.email {
                    user.set_email(identity.email.clone());
                }
                user.set_photo_url(identity.photo_url.clone());
                self.users.update(&user).await?;
                (user, false)
            }
            None => {
                let mut user = User::new(identity.subject.clone(), identity.email.clone());
                user.set_photo_url(identity.photo_url.clone());
                self.users.create(&user).await?;
                tracing::info!(user_id = %user.id(), "provisioned new user");
                (user, true)
            }
        };

        let session = Session::new(SessionId::generate(), user.id(), self.session_ttl);
        self.sessions.put(session.clone()).await?;

        Ok(SignIn {
            user,
            session,
            is_new_user,
        })
    }

    /// Resolves a session id to an authenticated context.
    ///
    /// Missing, malformed, unknown, expired, and revoked sessions all
    /// fail identically as `Unauthenticated`; the internal fault is
    /// distinguished only for tracing. The user record (and with it the
    /// permission view) is loaded fresh from the store on every call.
    ///
    /// # Errors
    ///
    /// `Unauthenticated` for any dead session, `Transient` when a store
    /// is unreachable.
    pub async fn resolve(
        &self,
        session_id: &SessionId,
    ) -> Result<AuthenticatedUser, AuthenticationError> {
        if !session_id.is_well_formed() {
            return Err(unauthenticated(SessionFault::Malformed));
        }

        let session = self
            .sessions
            .get(session_id)
            .await?
            .ok_or_else(|| unauthenticated(SessionFault::NotFound))?;

        if session.is_revoked() {
            return Err(unauthenticated(SessionFault::Revoked));
        }
        if session.is_expired() {
            // Dead weight; drop it now rather than waiting for the sweeper.
            self.sessions.delete(session_id).await?;
            return Err(unauthenticated(SessionFault::Expired));
        }

        let user = self
            .users
            .find_by_id(session.user_id())
            .await?
            .ok_or_else(|| unauthenticated(SessionFault::UserGone))?;

        Ok(AuthenticatedUser::new(session, user))
    }

    /// Revokes a session. Idempotent: revoking an already-revoked or
    /// unknown session is not an error.
    ///
    /// # Errors
    ///
    /// `Transient` when the store is unreachable.
    pub async fn sign_out(&self, session_id: &SessionId) -> Result<(), AuthenticationError> {
        self.sessions.revoke(session_id).await?;
        Ok(())
    }
}

fn unauthenticated(fault: SessionFault) -> AuthenticationError {
    tracing::debug!(%fault, "session rejected");
    AuthenticationError::Unauthenticated { fault }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CredentialFault;
    use crate::store::{MemorySessionStore, MemoryUserStore};
    use crate::token::testing::{TestClaims, sign, verifier};

    struct Fixture {
        service: AuthService,
        sessions: Arc<MemorySessionStore>,
        users: Arc<MemoryUserStore>,
    }

    fn fixture() -> Fixture {
        fixture_with_ttl(Duration::minutes(60))
    }

    fn fixture_with_ttl(ttl: Duration) -> Fixture {
        let sessions = Arc::new(MemorySessionStore::new());
        let users = Arc::new(MemoryUserStore::new());
        let service = AuthService::new(
            verifier(Some("brown.edu")),
            sessions.clone(),
            users.clone(),
            ttl,
        );
        Fixture {
            service,
            sessions,
            users,
        }
    }

    #[tokio::test]
    async fn invalid_token_creates_nothing() {
        let fx = fixture();

        let mut claims = TestClaims::valid();
        claims.aud = "wrong".to_string();
        let err = fx
            .service
            .sign_in(&sign(&claims, "k1"))
            .await
            .expect_err("reject");

        assert!(matches!(
            err,
            AuthenticationError::InvalidCredential {
                fault: CredentialFault::WrongAudience
            }
        ));
        assert!(
            fx.users
                .find_by_subject("u1")
                .await
                .expect("find")
                .is_none()
        );
    }

    #[tokio::test]
    async fn first_sign_in_provisions_exactly_one_user() {
        let fx = fixture();
        let token = sign(&TestClaims::valid(), "k1");

        let first = fx.service.sign_in(&token).await.expect("sign in");
        assert!(first.is_new_user);
        assert!(first.user.course_permissions().is_empty());
        assert!(!first.user.is_admin());

        let second = fx.service.sign_in(&token).await.expect("sign in again");
        assert!(!second.is_new_user);
        assert_eq!(second.user.id(), first.user.id());
        assert_ne!(second.session.id(), first.session.id());
    }

    #[tokio::test]
    async fn issue_then_resolve_round_trips() {
        let fx = fixture();
        let signed_in = fx
            .service
            .sign_in(&sign(&TestClaims::valid(), "k1"))
            .await
            .expect("sign in");

        let ctx = fx
            .service
            .resolve(signed_in.session.id())
            .await
            .expect("resolve");

        assert_eq!(ctx.user_id(), signed_in.user.id());
        assert_eq!(ctx.user().email(), "a@brown.edu");
    }

    #[tokio::test]
    async fn full_scenario_sign_in_resolve_revoke() {
        let fx = fixture();
        let token = sign(&TestClaims::for_subject("u1", "a@brown.edu"), "k1");

        let signed_in = fx.service.sign_in(&token).await.expect("sign in");
        let ctx = fx
            .service
            .resolve(signed_in.session.id())
            .await
            .expect("resolve");
        assert_eq!(ctx.user().subject(), "u1");

        fx.service
            .sign_out(signed_in.session.id())
            .await
            .expect("sign out");
        let err = fx
            .service
            .resolve(signed_in.session.id())
            .await
            .expect_err("revoked");
        assert!(matches!(err, AuthenticationError::Unauthenticated { .. }));
    }

    #[tokio::test]
    async fn sign_out_is_idempotent() {
        let fx = fixture();
        let signed_in = fx
            .service
            .sign_in(&sign(&TestClaims::valid(), "k1"))
            .await
            .expect("sign in");

        fx.service
            .sign_out(signed_in.session.id())
            .await
            .expect("first sign out");
        fx.service
            .sign_out(signed_in.session.id())
            .await
            .expect("second sign out");

        let err = fx
            .service
            .resolve(signed_in.session.id())
            .await
            .expect_err("still revoked");
        assert!(matches!(err, AuthenticationError::Unauthenticated { .. }));
    }

    #[tokio::test]
    async fn expired_session_fails_even_when_not_revoked() {
        let fx = fixture_with_ttl(Duration::seconds(-1));
        let signed_in = fx
            .service
            .sign_in(&sign(&TestClaims::valid(), "k1"))
            .await
            .expect("sign in");
        assert!(!signed_in.session.is_revoked());

        let err = fx
            .service
            .resolve(signed_in.session.id())
            .await
            .expect_err("expired");
        assert!(matches!(err, AuthenticationError::Unauthenticated { .. }));

        // The expired record was dropped on resolve.
        assert!(
            fx.sessions
                .get(signed_in.session.id())
                .await
                .expect("get")
                .is_none()
        );
    }

    #[tokio::test]
    async fn resolve_failure_is_idempotent() {
        let fx = fixture();
        let id = SessionId::generate();

        for _ in 0..3 {
            let err = fx.service.resolve(&id).await.expect_err("unknown session");
            assert!(matches!(err, AuthenticationError::Unauthenticated { .. }));
        }
    }

    #[tokio::test]
    async fn malformed_session_id_rejected_without_lookup() {
        let fx = fixture();

        let err = fx
            .service
            .resolve(&SessionId::new("not a session id!".to_string()))
            .await
            .expect_err("malformed");
        assert!(matches!(
            err,
            AuthenticationError::Unauthenticated {
                fault: SessionFault::Malformed
            }
        ));
    }

    #[tokio::test]
    async fn permission_changes_visible_on_next_resolve() {
        let fx = fixture();
        let signed_in = fx
            .service
            .sign_in(&sign(&TestClaims::valid(), "k1"))
            .await
            .expect("sign in");

        let before = fx
            .service
            .resolve(signed_in.session.id())
            .await
            .expect("resolve");
        assert!(!before.has_course_role(&CourseId::new("cs101"), CoursePermission::Staff));

        // Grant a role out-of-band; the same session picks it up because
        // resolve loads the user fresh each time.
        let mut user = signed_in.user.clone();
        user.grant_course_permission(CourseId::new("cs101"), CoursePermission::Staff);
        fx.users.update(&user).await.expect("update");

        let after = fx
            .service
            .resolve(signed_in.session.id())
            .await
            .expect("resolve");
        assert!(after.has_course_role(&CourseId::new("cs101"), CoursePermission::Staff));
        assert!(!after.has_course_role(&CourseId::new("cs201"), CoursePermission::Staff));
        assert!(!after.has_course_role(&CourseId::new("cs101"), CoursePermission::Admin));
    }

    #[tokio::test]
    async fn user_deletion_invalidates_all_their_sessions() {
        let fx = fixture();
        let signed_in = fx
            .service
            .sign_in(&sign(&TestClaims::valid(), "k1"))
            .await
            .expect("sign in");

        // Deleting a user clears every session they hold.
        fx.sessions
            .delete_all_for_user(signed_in.user.id())
            .await
            .expect("delete sessions");

        let err = fx
            .service
            .resolve(signed_in.session.id())
            .await
            .expect_err("gone");
        assert!(matches!(err, AuthenticationError::Unauthenticated { .. }));
    }

    #[tokio::test]
    async fn require_helpers_enforce_authorization() {
        let fx = fixture();
        let signed_in = fx
            .service
            .sign_in(&sign(&TestClaims::valid(), "k1"))
            .await
            .expect("sign in");
        let ctx = fx
            .service
            .resolve(signed_in.session.id())
            .await
            .expect("resolve");

        assert!(ctx.require_global_admin().is_err());
        assert!(
            ctx.require_course_role(&CourseId::new("cs101"), CoursePermission::Staff)
                .is_err()
        );

        let mut user = signed_in.user.clone();
        user.grant_course_permission(CourseId::new("cs101"), CoursePermission::Admin);
        fx.users.update(&user).await.expect("update");

        let ctx = fx
            .service
            .resolve(signed_in.session.id())
            .await
            .expect("resolve");
        assert!(
            ctx.require_course_role(&CourseId::new("cs101"), CoursePermission::Staff)
                .is_ok()
        );
        assert!(ctx.require_global_admin().is_err());
    }

    #[tokio::test]
    async fn global_admin_short_circuits_course_checks() {
        let fx = fixture();
        let signed_in = fx
            .service
            .sign_in(&sign(&TestClaims::valid(), "k1"))
            .await
            .expect("sign in");

        let mut user = signed_in.user.clone();
        user.set_admin(true);
        fx.users.update(&user).await.expect("update");

        let ctx = fx
            .service
            .resolve(signed_in.session.id())
            .await
            .expect("resolve");
        assert!(ctx.is_global_admin());
        assert!(ctx.has_course_role(&CourseId::new("never-granted"), CoursePermission::Admin));
    }
}
