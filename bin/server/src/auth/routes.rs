//! HTTP handlers for sign-in, session management, profiles, and
//! permission administration.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use hours_access::{CoursePermission, ProfileUpdate, SessionId, User, UserStore};
use hours_core::{CourseId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use time::Duration as TimeDuration;

use super::{AppState, RequireAuth, middleware::SESSION_COOKIE};
use crate::error::ApiError;

/// Request body for the sign-in exchange.
#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    /// The provider-issued ID token. Never stored, logged, or echoed.
    token: String,
}

/// Full user view, returned only to the user themselves.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    id: String,
    email: String,
    display_name: Option<String>,
    pronouns: Option<String>,
    meeting_link: Option<String>,
    phone_number: Option<String>,
    phone_country_code: Option<String>,
    photo_url: Option<String>,
    is_admin: bool,
    course_permissions: HashMap<CourseId, CoursePermission>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        let profile = user.profile();
        Self {
            id: user.id().to_string(),
            email: user.email().to_string(),
            display_name: profile.display_name.clone(),
            pronouns: profile.pronouns.clone(),
            meeting_link: profile.meeting_link.clone(),
            phone_number: profile.phone_number.clone(),
            phone_country_code: profile.phone_country_code.clone(),
            photo_url: profile.photo_url.clone(),
            is_admin: user.is_admin(),
            course_permissions: user.course_permissions().clone(),
        }
    }
}

/// Public user view, returned for lookups of other users.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUserResponse {
    id: String,
    display_name: Option<String>,
    pronouns: Option<String>,
    photo_url: Option<String>,
}

impl From<&User> for PublicUserResponse {
    fn from(user: &User) -> Self {
        let profile = user.profile();
        Self {
            id: user.id().to_string(),
            display_name: profile.display_name.clone(),
            pronouns: profile.pronouns.clone(),
            photo_url: profile.photo_url.clone(),
        }
    }
}

/// Request body for a profile self-update.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    display_name: String,
    #[serde(default)]
    pronouns: Option<String>,
    #[serde(default)]
    meeting_link: Option<String>,
    #[serde(default)]
    phone_number: Option<String>,
    #[serde(default)]
    phone_country_code: Option<String>,
}

/// Request body for a permission grant.
#[derive(Debug, Deserialize)]
pub struct GrantPermissionRequest {
    permission: CoursePermission,
}

/// `POST /users/session` — exchanges a federated ID token for a session
/// cookie. Any verification failure is the same generic 401.
pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<SignInRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let signed_in = state.auth.sign_in(&body.token).await?;

    let cookie = Cookie::build((SESSION_COOKIE, signed_in.session.id().as_str().to_string()))
        .path("/")
        .http_only(true)
        .secure(state.session_config.secure_cookies)
        .same_site(SameSite::Strict)
        .max_age(TimeDuration::minutes(state.session_config.duration_minutes));

    Ok((jar.add(cookie), StatusCode::NO_CONTENT))
}

/// `POST /users/signout` — revokes the session and clears the cookie.
/// Idempotent: signing out without a live session still succeeds.
pub async fn sign_out(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(session_cookie) = jar.get(SESSION_COOKIE) {
        let session_id = SessionId::new(session_cookie.value().to_string());
        state.auth.sign_out(&session_id).await?;
    }

    let remove_session = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .max_age(TimeDuration::ZERO);

    Ok((jar.add(remove_session), StatusCode::NO_CONTENT))
}

/// `GET /users/me` — the authenticated user's own record.
pub async fn me(RequireAuth(ctx): RequireAuth) -> Json<UserResponse> {
    Json(UserResponse::from(ctx.user()))
}

/// `GET /users/{id}` — public profile of any user.
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    RequireAuth(_ctx): RequireAuth,
    Path(id): Path<String>,
) -> Result<Json<PublicUserResponse>, ApiError> {
    let user_id = UserId::from_str(&id).map_err(|_| ApiError::NotFound)?;
    let user = state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(PublicUserResponse::from(&user)))
}

/// `PUT /users/me` — profile self-update. Returns the updated record,
/// or a 400 naming the first malformed field.
pub async fn update_me(
    State(state): State<Arc<AppState>>,
    RequireAuth(ctx): RequireAuth,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let update = ProfileUpdate::new(
        body.display_name,
        body.pronouns,
        body.meeting_link,
        body.phone_number,
        body.phone_country_code,
    )?;

    let mut user = ctx.user().clone();
    user.apply_profile_update(update);
    state.users.update(&user).await?;

    Ok(Json(UserResponse::from(&user)))
}

/// `PUT /users/{id}/permissions/{course}` — grants (or replaces) a
/// course permission. Requires global admin or `ADMIN` on the course.
pub async fn grant_permission(
    State(state): State<Arc<AppState>>,
    RequireAuth(caller): RequireAuth,
    Path((id, course)): Path<(String, String)>,
    Json(body): Json<GrantPermissionRequest>,
) -> Result<StatusCode, ApiError> {
    let course = CourseId::new(course);
    caller.require_course_role(&course, CoursePermission::Admin)?;

    let user_id = UserId::from_str(&id).map_err(|_| ApiError::NotFound)?;
    let mut user = state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    user.grant_course_permission(course.clone(), body.permission);
    state.users.update(&user).await?;
    tracing::info!(
        target_user = %user_id,
        course = %course,
        permission = %body.permission,
        granted_by = %caller.user_id(),
        "course permission granted"
    );

    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /users/{id}/permissions/{course}` — removes any permission
/// on the course. Requires the same authority as granting; idempotent.
pub async fn revoke_permission(
    State(state): State<Arc<AppState>>,
    RequireAuth(caller): RequireAuth,
    Path((id, course)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let course = CourseId::new(course);
    caller.require_course_role(&course, CoursePermission::Admin)?;

    let user_id = UserId::from_str(&id).map_err(|_| ApiError::NotFound)?;
    let mut user = state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    user.revoke_course_permission(&course);
    state.users.update(&user).await?;
    tracing::info!(
        target_user = %user_id,
        course = %course,
        revoked_by = %caller.user_id(),
        "course permission revoked"
    );

    Ok(StatusCode::NO_CONTENT)
}
