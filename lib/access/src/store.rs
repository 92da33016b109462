//! Storage traits for sessions and users, with in-process implementations.
//!
//! The protocol is written against these traits; the server swaps in
//! Postgres-backed implementations without touching the session
//! lifecycle. The in-memory stores guarantee atomic visibility through a
//! single `RwLock` per store: a `put` is fully visible to any `get` that
//! observes it, and `revoke` racing a read settles one way or the other,
//! never torn. No lock is held across an await point.

use async_trait::async_trait;
use hours_core::UserId;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::session::{Session, SessionId};
use crate::user::User;

/// Durable keyed storage for session records.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persists a session. Overwrites any record with the same id.
    async fn put(&self, session: Session) -> Result<(), StoreError>;

    /// Looks up a session by its opaque id.
    ///
    /// Expired records may still be returned; the caller decides their
    /// fate. Implementations may also filter them out.
    async fn get(&self, id: &SessionId) -> Result<Option<Session>, StoreError>;

    /// Marks a session revoked. Idempotent; a missing session is not an
    /// error.
    async fn revoke(&self, id: &SessionId) -> Result<(), StoreError>;

    /// Removes a session record entirely.
    async fn delete(&self, id: &SessionId) -> Result<(), StoreError>;

    /// Invalidates every session belonging to a user.
    async fn delete_all_for_user(&self, user_id: UserId) -> Result<(), StoreError>;

    /// Sweeps expired records; returns how many were removed.
    async fn delete_expired(&self) -> Result<u64, StoreError>;
}

/// Durable storage for user records.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Finds a user by internal id.
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError>;

    /// Finds a user by the provider's subject claim.
    async fn find_by_subject(&self, subject: &str) -> Result<Option<User>, StoreError>;

    /// Creates a new user record.
    async fn create(&self, user: &User) -> Result<(), StoreError>;

    /// Replaces an existing user record. Last writer wins.
    async fn update(&self, user: &User) -> Result<(), StoreError>;
}

/// In-process session store backed by a `HashMap`.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn put(&self, session: Session) -> Result<(), StoreError> {
        self.sessions
            .write()
            .await
            .insert(session.id().clone(), session);
        Ok(())
    }

    async fn get(&self, id: &SessionId) -> Result<Option<Session>, StoreError> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn revoke(&self, id: &SessionId) -> Result<(), StoreError> {
        if let Some(session) = self.sessions.write().await.get_mut(id) {
            session.revoke();
        }
        Ok(())
    }

    async fn delete(&self, id: &SessionId) -> Result<(), StoreError> {
        self.sessions.write().await.remove(id);
        Ok(())
    }

    async fn delete_all_for_user(&self, user_id: UserId) -> Result<(), StoreError> {
        self.sessions
            .write()
            .await
            .retain(|_, session| session.user_id() != user_id);
        Ok(())
    }

    async fn delete_expired(&self) -> Result<u64, StoreError> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired());
        Ok((before - sessions.len()) as u64)
    }
}

/// In-process user store backed by a `HashMap`.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<UserId, User>>,
}

impl MemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_subject(&self, subject: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| user.subject() == subject)
            .cloned())
    }

    async fn create(&self, user: &User) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.id()) {
            return Err(StoreError::new(format!(
                "user {} already exists",
                user.id()
            )));
        }
        users.insert(user.id(), user.clone());
        Ok(())
    }

    async fn update(&self, user: &User) -> Result<(), StoreError> {
        self.users.write().await.insert(user.id(), user.clone());
        Ok(())
    }
}
