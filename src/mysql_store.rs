use crate::accounts::{AccountStore, CreateUserResult, NewUser, UserRating};
use crate::catalog::{FileCatalog, FileRecord, Listing, NewFile};
use crate::session_store::{SessionStoreConnector, WriteSessionResult};
use crate::{SessionExpiry, SessionId, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::mysql::{MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::Row;

const CREATE_USERS: &str = "CREATE TABLE IF NOT EXISTS users (
    username      VARCHAR(20) NOT NULL PRIMARY KEY,
    password_hash VARCHAR(60) NOT NULL,
    timezone      VARCHAR(64) NOT NULL,
    rating        BIGINT      NOT NULL DEFAULT 0
)";

const CREATE_SESSIONS: &str = "CREATE TABLE IF NOT EXISTS sessions (
    session_id CHAR(64)    NOT NULL PRIMARY KEY,
    username   VARCHAR(20) NOT NULL,
    created_at DATETIME    NOT NULL,
    expires_at DATETIME    NULL,
    FOREIGN KEY (username) REFERENCES users (username) ON DELETE CASCADE
)";

const CREATE_FILES: &str = "CREATE TABLE IF NOT EXISTS files (
    id          BIGINT UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY,
    label       VARCHAR(50)     NOT NULL,
    size_bytes  BIGINT UNSIGNED NOT NULL,
    description VARCHAR(500)    NOT NULL,
    owner       VARCHAR(20)     NOT NULL,
    category    VARCHAR(20)     NOT NULL,
    uploaded_at DATETIME        NOT NULL,
    rating      BIGINT          NOT NULL DEFAULT 0,
    INDEX files_rating (rating),
    INDEX files_uploaded_at (uploaded_at),
    INDEX files_category (category, uploaded_at)
)";

const SELECT_PASSWORD_HASH: &str = "SELECT password_hash FROM users WHERE username = ?";
const INSERT_USER: &str =
    "INSERT INTO users (username, password_hash, timezone, rating) VALUES (?, ?, ?, 0)";
const SELECT_TIMEZONE: &str = "SELECT timezone FROM users WHERE username = ?";
const SELECT_LEADERBOARD: &str =
    "SELECT username, rating FROM users ORDER BY rating DESC, username LIMIT ?";

const INSERT_SESSION: &str =
    "INSERT INTO sessions (username, session_id, created_at, expires_at) VALUES (?, ?, ?, ?)";
const SELECT_SESSION: &str = "SELECT username FROM sessions WHERE session_id = ? \
    AND (expires_at IS NULL OR expires_at > ?)";
const DELETE_SESSION: &str = "DELETE FROM sessions WHERE session_id = ?";

const SELECT_FILE: &str = "SELECT id, label, size_bytes, description, owner, category, \
    uploaded_at, rating FROM files WHERE id = ?";
const SELECT_POPULAR: &str = "SELECT id, label, size_bytes, description, owner, category, \
    uploaded_at, rating FROM files WHERE rating > 0 ORDER BY rating DESC LIMIT ?";
const SELECT_RECENT: &str = "SELECT id, label, size_bytes, description, owner, category, \
    uploaded_at, rating FROM files ORDER BY uploaded_at DESC, id DESC LIMIT ?";
const SELECT_CATEGORY: &str = "SELECT id, label, size_bytes, description, owner, category, \
    uploaded_at, rating FROM files WHERE category = ? ORDER BY uploaded_at DESC, id DESC LIMIT ?";
const INSERT_FILE: &str = "INSERT INTO files \
    (label, size_bytes, description, owner, category, uploaded_at) VALUES (?, ?, ?, ?, ?, ?)";
const DELETE_FILE: &str = "DELETE FROM files WHERE id = ?";

/// Persistent store on MySQL, shared by all requests through its connection pool.
#[derive(Debug, Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    /// Wrap an existing pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Open a pool of at most `max_connections` connections to `url`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Create the tables if they do not exist yet.
    pub async fn create_schema(&self) -> Result<(), StoreError> {
        for statement in [CREATE_USERS, CREATE_SESSIONS, CREATE_FILES] {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

fn file_from_row(row: &MySqlRow) -> Result<FileRecord, sqlx::Error> {
    Ok(FileRecord {
        id: row.try_get("id")?,
        label: row.try_get("label")?,
        size_bytes: row.try_get("size_bytes")?,
        description: row.try_get("description")?,
        owner: row.try_get("owner")?,
        category: row.try_get("category")?,
        uploaded_at: row.try_get::<NaiveDateTime, _>("uploaded_at")?.and_utc(),
        rating: row.try_get("rating")?,
    })
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(error) if error.is_unique_violation())
}

#[async_trait]
impl SessionStoreConnector for MySqlStore {
    async fn create_session(
        &self,
        id: &SessionId,
        username: &str,
        created_at: DateTime<Utc>,
        expiry: &SessionExpiry,
    ) -> Result<WriteSessionResult, StoreError> {
        let result = sqlx::query(INSERT_SESSION)
            .bind(username)
            .bind(id.to_hex())
            .bind(created_at.naive_utc())
            .bind(expiry.date_time().map(|expiry| expiry.naive_utc()))
            .execute(&self.pool)
            .await;
        match result {
            Ok(_) => Ok(WriteSessionResult::Ok(())),
            Err(error) if is_unique_violation(&error) => Ok(WriteSessionResult::SessionIdExists),
            Err(error) => Err(error.into()),
        }
    }

    async fn read_session(
        &self,
        id: &SessionId,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, StoreError> {
        Ok(sqlx::query_scalar::<_, String>(SELECT_SESSION)
            .bind(id.to_hex())
            .bind(now.naive_utc())
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_session(&self, id: &SessionId) -> Result<(), StoreError> {
        sqlx::query(DELETE_SESSION)
            .bind(id.to_hex())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl AccountStore for MySqlStore {
    async fn password_hash(&self, username: &str) -> Result<Option<String>, StoreError> {
        Ok(sqlx::query_scalar::<_, String>(SELECT_PASSWORD_HASH)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_user(&self, user: &NewUser) -> Result<CreateUserResult, StoreError> {
        let result = sqlx::query(INSERT_USER)
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(&user.timezone)
            .execute(&self.pool)
            .await;
        match result {
            Ok(_) => Ok(CreateUserResult::Created),
            Err(error) if is_unique_violation(&error) => Ok(CreateUserResult::UsernameTaken),
            Err(error) => Err(error.into()),
        }
    }

    async fn timezone(&self, username: &str) -> Result<Option<String>, StoreError> {
        Ok(sqlx::query_scalar::<_, String>(SELECT_TIMEZONE)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn leaderboard(&self, limit: u32) -> Result<Vec<UserRating>, StoreError> {
        let rows = sqlx::query(SELECT_LEADERBOARD)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| -> Result<UserRating, StoreError> {
                Ok(UserRating {
                    username: row.try_get("username")?,
                    rating: row.try_get("rating")?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl FileCatalog for MySqlStore {
    async fn insert_file(&self, file: &NewFile) -> Result<u64, StoreError> {
        let result = sqlx::query(INSERT_FILE)
            .bind(&file.label)
            .bind(file.size_bytes)
            .bind(&file.description)
            .bind(&file.owner)
            .bind(file.category.as_str())
            .bind(file.uploaded_at.naive_utc())
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_id())
    }

    async fn delete_file(&self, id: u64) -> Result<(), StoreError> {
        sqlx::query(DELETE_FILE).bind(id).execute(&self.pool).await?;
        Ok(())
    }

    async fn file(&self, id: u64) -> Result<Option<FileRecord>, StoreError> {
        let row = sqlx::query(SELECT_FILE)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(file_from_row).transpose()?)
    }

    async fn list_files(
        &self,
        listing: Listing,
        limit: u32,
    ) -> Result<Vec<FileRecord>, StoreError> {
        let rows = match listing {
            Listing::Popular => sqlx::query(SELECT_POPULAR).bind(limit),
            Listing::Recent => sqlx::query(SELECT_RECENT).bind(limit),
            Listing::Category(category) => sqlx::query(SELECT_CATEGORY)
                .bind(category.as_str())
                .bind(limit),
        }
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(file_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }
}
