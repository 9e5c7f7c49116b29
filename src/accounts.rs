use crate::StoreError;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

/// A user to be registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    /// Unique, lowercase username.
    pub username: String,
    /// bcrypt hash of the password.
    pub password_hash: String,
    /// IANA timezone name.
    pub timezone: String,
}

/// A row of the user leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRating {
    pub username: String,
    pub rating: i64,
}

/// Whether a user could be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateUserResult {
    Created,
    UsernameTaken,
}

/// Access to the `users` table.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// The stored password hash of `username`, `None` for unknown users.
    async fn password_hash(&self, username: &str) -> Result<Option<String>, StoreError>;

    /// Register a user with rating zero.
    async fn create_user(&self, user: &NewUser) -> Result<CreateUserResult, StoreError>;

    /// The IANA timezone name of `username`, `None` for unknown users.
    async fn timezone(&self, username: &str) -> Result<Option<String>, StoreError>;

    /// The `limit` users with the highest rating, best first.
    async fn leaderboard(&self, limit: u32) -> Result<Vec<UserRating>, StoreError>;
}

#[async_trait]
impl<T: AccountStore + ?Sized> AccountStore for Arc<T> {
    async fn password_hash(&self, username: &str) -> Result<Option<String>, StoreError> {
        (**self).password_hash(username).await
    }

    async fn create_user(&self, user: &NewUser) -> Result<CreateUserResult, StoreError> {
        (**self).create_user(user).await
    }

    async fn timezone(&self, username: &str) -> Result<Option<String>, StoreError> {
        (**self).timezone(username).await
    }

    async fn leaderboard(&self, limit: u32) -> Result<Vec<UserRating>, StoreError> {
        (**self).leaderboard(limit).await
    }
}
