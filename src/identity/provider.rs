use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Activation state of an account. The code is only ever present while the
/// account is pending; activation consumes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ActivationState {
    Pending { code: String },
    Active,
}

impl ActivationState {
    pub fn is_active(&self) -> bool {
        matches!(self, ActivationState::Active)
    }
}

/// Durable identity record. Accounts are never hard-deleted here;
/// deactivation re-enters `Pending` with a fresh code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Argon2 PHC string; never the password itself.
    pub password_hash: String,
    pub activation: ActivationState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Contract over the durable identity store. Lookups miss with `NotFound`,
/// creation collides with `Conflict`, and any operation may fail with
/// `Persistence` when the store is unreachable.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn get_user_by_id(&self, id: &str) -> AppResult<User>;
    async fn get_user_by_email(&self, email: &str) -> AppResult<User>;
    /// Insert a new user. Fails with `Conflict` if the email is taken.
    async fn create_user(&self, user: User) -> AppResult<()>;
    /// Replace the stored row for `user.id`. Fails with `NotFound` if the
    /// user does not exist. `updated_at` is stamped by the store.
    async fn update_user(&self, user: User) -> AppResult<()>;
}

/// In-memory [`IdentityStore`] keyed by user id with an email index, for
/// development and tests.
#[derive(Default)]
pub struct MemoryIdentityStore {
    users: RwLock<HashMap<String, User>>,
    email_index: RwLock<HashMap<String, String>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn get_user_by_id(&self, id: &str) -> AppResult<User> {
        self.users
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("user not found".into()))
    }

    async fn get_user_by_email(&self, email: &str) -> AppResult<User> {
        let id = self
            .email_index
            .read()
            .get(email)
            .cloned()
            .ok_or_else(|| AppError::NotFound("user not found".into()))?;
        self.get_user_by_id(&id).await
    }

    async fn create_user(&self, user: User) -> AppResult<()> {
        let mut idx = self.email_index.write();
        if idx.contains_key(&user.email) {
            return Err(AppError::Conflict("email already registered".into()));
        }
        idx.insert(user.email.clone(), user.id.clone());
        self.users.write().insert(user.id.clone(), user);
        Ok(())
    }

    async fn update_user(&self, mut user: User) -> AppResult<()> {
        // lock order is always email_index before users
        let existing_email = self
            .users
            .read()
            .get(&user.id)
            .map(|u| u.email.clone())
            .ok_or_else(|| AppError::NotFound("user not found".into()))?;
        // keep the email index consistent if the address changed
        if existing_email != user.email {
            let mut idx = self.email_index.write();
            if idx.contains_key(&user.email) {
                return Err(AppError::Conflict("email already registered".into()));
            }
            idx.remove(&existing_email);
            idx.insert(user.email.clone(), user.id.clone());
        }
        user.updated_at = Utc::now();
        self.users.write().insert(user.id.clone(), user);
        Ok(())
    }
}
