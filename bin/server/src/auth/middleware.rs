//! Authentication extractors for Axum.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::CookieJar;
use hours_access::{AuthenticatedUser, SessionId};
use std::sync::Arc;

use super::AppState;
use crate::error::ApiError;

/// Session cookie name.
pub const SESSION_COOKIE: &str = "session";

/// Extractor for requiring an authenticated user.
///
/// Fails with the uniform 401 when there is no live session.
pub struct RequireAuth(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for RequireAuth
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = Arc::<AppState>::from_ref(state);
        let jar = CookieJar::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::Unauthenticated)?;

        let session_cookie = jar.get(SESSION_COOKIE).ok_or_else(|| {
            tracing::debug!("request without session cookie");
            ApiError::Unauthenticated
        })?;

        let session_id = SessionId::new(session_cookie.value().to_string());
        let user = app_state.auth.resolve(&session_id).await?;

        Ok(RequireAuth(user))
    }
}

