//! Postgres-backed stores for users and sessions.
//!
//! These implement the storage traits the protocol is written against.
//! Profile and course permissions are stored as JSONB; the session
//! table mirrors the session record one to one. All errors surface as
//! `StoreError`, which the protocol treats as transient.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hours_access::{
    CoursePermission, Profile, Session, SessionId, SessionStore, StoreError, User, UserStore,
};
use hours_core::{CourseId, UserId};
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use std::str::FromStr;

fn store_err(err: sqlx::Error) -> StoreError {
    StoreError::new(err.to_string())
}

/// Row type for user queries.
#[derive(FromRow)]
struct UserRow {
    id: String,
    subject: String,
    email: String,
    is_admin: bool,
    profile: serde_json::Value,
    course_permissions: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn try_into_user(self) -> Result<User, StoreError> {
        let id = UserId::from_str(&self.id)
            .map_err(|e| StoreError::new(format!("invalid user id '{}': {}", self.id, e)))?;
        let profile: Profile = serde_json::from_value(self.profile)
            .map_err(|e| StoreError::new(format!("invalid profile for user {id}: {e}")))?;
        let course_permissions: HashMap<CourseId, CoursePermission> =
            serde_json::from_value(self.course_permissions)
                .map_err(|e| StoreError::new(format!("invalid permissions for user {id}: {e}")))?;
        Ok(User::from_parts(
            id,
            self.subject,
            self.email,
            self.is_admin,
            profile,
            course_permissions,
            self.created_at,
            self.updated_at,
        ))
    }
}

/// Row type for session queries.
#[derive(FromRow)]
struct SessionRow {
    id: String,
    user_id: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    revoked: bool,
}

impl SessionRow {
    fn try_into_session(self) -> Result<Session, StoreError> {
        let user_id = UserId::from_str(&self.user_id)
            .map_err(|e| StoreError::new(format!("invalid user id '{}': {}", self.user_id, e)))?;
        Ok(Session::from_parts(
            SessionId::new(self.id),
            user_id,
            self.issued_at,
            self.expires_at,
            self.revoked,
        ))
    }
}

/// Postgres-backed user store.
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    /// Creates a user store on the given pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT id, subject, email, is_admin, profile, course_permissions, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        row.map(UserRow::try_into_user).transpose()
    }

    async fn find_by_subject(&self, subject: &str) -> Result<Option<User>, StoreError> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT id, subject, email, is_admin, profile, course_permissions, created_at, updated_at
            FROM users
            WHERE subject = $1
            "#,
        )
        .bind(subject)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        row.map(UserRow::try_into_user).transpose()
    }

    async fn create(&self, user: &User) -> Result<(), StoreError> {
        let profile = serde_json::to_value(user.profile())
            .map_err(|e| StoreError::new(format!("serialize profile: {e}")))?;
        let permissions = serde_json::to_value(user.course_permissions())
            .map_err(|e| StoreError::new(format!("serialize permissions: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO users (id, subject, email, is_admin, profile, course_permissions, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(user.id().to_string())
        .bind(user.subject())
        .bind(user.email())
        .bind(user.is_admin())
        .bind(profile)
        .bind(permissions)
        .bind(user.created_at())
        .bind(user.updated_at())
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(())
    }

    async fn update(&self, user: &User) -> Result<(), StoreError> {
        let profile = serde_json::to_value(user.profile())
            .map_err(|e| StoreError::new(format!("serialize profile: {e}")))?;
        let permissions = serde_json::to_value(user.course_permissions())
            .map_err(|e| StoreError::new(format!("serialize permissions: {e}")))?;

        sqlx::query(
            r#"
            UPDATE users
            SET email = $2, is_admin = $3, profile = $4, course_permissions = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(user.id().to_string())
        .bind(user.email())
        .bind(user.is_admin())
        .bind(profile)
        .bind(permissions)
        .bind(user.updated_at())
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(())
    }
}

/// Postgres-backed session store.
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    /// Creates a session store on the given pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn put(&self, session: Session) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO sessions (id, user_id, issued_at, expires_at, revoked)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
            SET expires_at = EXCLUDED.expires_at, revoked = EXCLUDED.revoked
            "#,
        )
        .bind(session.id().as_str())
        .bind(session.user_id().to_string())
        .bind(session.issued_at())
        .bind(session.expires_at())
        .bind(session.is_revoked())
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(())
    }

    async fn get(&self, id: &SessionId) -> Result<Option<Session>, StoreError> {
        let row: Option<SessionRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, issued_at, expires_at, revoked
            FROM sessions
            WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        row.map(SessionRow::try_into_session).transpose()
    }

    async fn revoke(&self, id: &SessionId) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE sessions
            SET revoked = TRUE
            WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(())
    }

    async fn delete(&self, id: &SessionId) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            DELETE FROM sessions
            WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(())
    }

    async fn delete_all_for_user(&self, user_id: UserId) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            DELETE FROM sessions
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(())
    }

    async fn delete_expired(&self) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM sessions
            WHERE expires_at < NOW()
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(result.rows_affected())
    }
}
