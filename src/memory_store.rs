use crate::accounts::{AccountStore, CreateUserResult, NewUser, UserRating};
use crate::catalog::{FileCatalog, FileRecord, Listing, NewFile};
use crate::session_store::{SessionStoreConnector, WriteSessionResult};
use crate::{SessionExpiry, SessionId, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Sessions, users and file records held in process memory.
///
/// This is the backend of the test suites and of local demos. It implements every store trait
/// of this crate, so a whole router can be driven by it without a database.
///
/// [`MemoryStore::new_with_logger`] records each operation it receives, which lets tests count
/// store calls. [`MemoryStore::fail_on`] makes chosen operations return
/// [`StoreError::Unavailable`] until [`MemoryStore::recover`] is called.
/// Nothing survives a restart, and expired sessions stay until [`MemoryStore::cleanup`] runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    users: HashMap<String, UserBody>,
    sessions: HashMap<SessionId, SessionBody>,
    files: BTreeMap<u64, FileRecord>,
    last_file_id: u64,
    log: Option<Vec<Operation>>,
    failing: HashSet<OperationKind>,
}

#[derive(Debug, Clone)]
struct UserBody {
    password_hash: String,
    timezone: String,
    rating: i64,
}

#[derive(Debug, Clone)]
struct SessionBody {
    username: String,
    expiry: SessionExpiry,
}

/// An operation received by a [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    CreateSession {
        id: SessionId,
        username: String,
        expiry: SessionExpiry,
    },
    ReadSession {
        id: SessionId,
    },
    DeleteSession {
        id: SessionId,
    },
    PasswordHash {
        username: String,
    },
    CreateUser {
        username: String,
    },
    Timezone {
        username: String,
    },
    Leaderboard {
        limit: u32,
    },
    InsertFile {
        label: String,
    },
    DeleteFile {
        id: u64,
    },
    File {
        id: u64,
    },
    ListFiles {
        listing: Listing,
        limit: u32,
    },
}

/// The kind of an [`Operation`], used to inject failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    CreateSession,
    ReadSession,
    DeleteSession,
    PasswordHash,
    CreateUser,
    Timezone,
    Leaderboard,
    InsertFile,
    DeleteFile,
    File,
    ListFiles,
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::CreateSession { .. } => OperationKind::CreateSession,
            Self::ReadSession { .. } => OperationKind::ReadSession,
            Self::DeleteSession { .. } => OperationKind::DeleteSession,
            Self::PasswordHash { .. } => OperationKind::PasswordHash,
            Self::CreateUser { .. } => OperationKind::CreateUser,
            Self::Timezone { .. } => OperationKind::Timezone,
            Self::Leaderboard { .. } => OperationKind::Leaderboard,
            Self::InsertFile { .. } => OperationKind::InsertFile,
            Self::DeleteFile { .. } => OperationKind::DeleteFile,
            Self::File { .. } => OperationKind::File,
            Self::ListFiles { .. } => OperationKind::ListFiles,
        }
    }
}

impl State {
    fn receive(&mut self, operation: Operation) -> Result<(), StoreError> {
        let kind = operation.kind();
        if let Some(log) = self.log.as_mut() {
            log.push(operation);
        }
        if self.failing.contains(&kind) {
            Err(StoreError::Unavailable(format!("injected failure on {kind:?}")))
        } else {
            Ok(())
        }
    }
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Default::default()
    }

    /// Create a new empty memory store that records every operation it receives.
    pub fn new_with_logger() -> Self {
        let store = Self::new();
        store.lock().log = Some(Vec::new());
        store
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The operations received so far. Empty unless created with [MemoryStore::new_with_logger].
    pub fn operations(&self) -> Vec<Operation> {
        self.lock().log.clone().unwrap_or_default()
    }

    /// Forget the operations received so far.
    pub fn clear_operations(&self) {
        if let Some(log) = self.lock().log.as_mut() {
            log.clear();
        }
    }

    /// Make every following operation of `kind` fail with [StoreError::Unavailable].
    pub fn fail_on(&self, kind: OperationKind) {
        self.lock().failing.insert(kind);
    }

    /// Undo [MemoryStore::fail_on].
    pub fn recover(&self, kind: OperationKind) {
        self.lock().failing.remove(&kind);
    }

    /// Add a user directly, bypassing the log.
    pub fn add_user(&self, username: &str, password_hash: &str, timezone: &str, rating: i64) {
        self.lock().users.insert(
            username.to_owned(),
            UserBody {
                password_hash: password_hash.to_owned(),
                timezone: timezone.to_owned(),
                rating,
            },
        );
    }

    /// Add a file record directly, bypassing the log. The record keeps its id.
    pub fn add_file(&self, file: FileRecord) {
        let mut state = self.lock();
        state.last_file_id = state.last_file_id.max(file.id);
        state.files.insert(file.id, file);
    }

    /// The username of the session with the given id, ignoring expiry.
    pub fn session_owner(&self, id: &SessionId) -> Option<String> {
        self.lock()
            .sessions
            .get(id)
            .map(|body| body.username.clone())
    }

    /// Returns the number of sessions in the store.
    pub fn len(&self) -> usize {
        self.lock().sessions.len()
    }

    /// Returns true if the store holds no sessions.
    pub fn is_empty(&self) -> bool {
        self.lock().sessions.is_empty()
    }

    /// Performs session cleanup. This should be run on an
    /// intermittent basis if this store is run for long enough that
    /// memory accumulation is a concern.
    pub fn cleanup(&self, now: DateTime<Utc>) {
        log::trace!("Cleaning up memory store...");
        let mut state = self.lock();
        let initial_len = state.sessions.len();
        state
            .sessions
            .retain(|_, body| !body.expiry.is_expired(now));
        log::trace!(
            "Deleted {} expired sessions",
            initial_len - state.sessions.len()
        );
    }
}

#[async_trait]
impl SessionStoreConnector for MemoryStore {
    async fn create_session(
        &self,
        id: &SessionId,
        username: &str,
        _created_at: DateTime<Utc>,
        expiry: &SessionExpiry,
    ) -> Result<WriteSessionResult, StoreError> {
        let mut state = self.lock();
        state.receive(Operation::CreateSession {
            id: id.clone(),
            username: username.to_owned(),
            expiry: *expiry,
        })?;
        // replace with `try_insert` once stable #82766
        if state.sessions.contains_key(id) {
            Ok(WriteSessionResult::SessionIdExists)
        } else {
            state.sessions.insert(
                id.clone(),
                SessionBody {
                    username: username.to_owned(),
                    expiry: *expiry,
                },
            );
            Ok(WriteSessionResult::Ok(()))
        }
    }

    async fn read_session(
        &self,
        id: &SessionId,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, StoreError> {
        let mut state = self.lock();
        state.receive(Operation::ReadSession { id: id.clone() })?;
        Ok(state
            .sessions
            .get(id)
            .filter(|body| !body.expiry.is_expired(now))
            .map(|body| body.username.clone()))
    }

    async fn delete_session(&self, id: &SessionId) -> Result<(), StoreError> {
        let mut state = self.lock();
        state.receive(Operation::DeleteSession { id: id.clone() })?;
        state.sessions.remove(id);
        Ok(())
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn password_hash(&self, username: &str) -> Result<Option<String>, StoreError> {
        let mut state = self.lock();
        state.receive(Operation::PasswordHash {
            username: username.to_owned(),
        })?;
        Ok(state
            .users
            .get(username)
            .map(|user| user.password_hash.clone()))
    }

    async fn create_user(&self, user: &NewUser) -> Result<CreateUserResult, StoreError> {
        let mut state = self.lock();
        state.receive(Operation::CreateUser {
            username: user.username.clone(),
        })?;
        if state.users.contains_key(&user.username) {
            return Ok(CreateUserResult::UsernameTaken);
        }
        state.users.insert(
            user.username.clone(),
            UserBody {
                password_hash: user.password_hash.clone(),
                timezone: user.timezone.clone(),
                rating: 0,
            },
        );
        Ok(CreateUserResult::Created)
    }

    async fn timezone(&self, username: &str) -> Result<Option<String>, StoreError> {
        let mut state = self.lock();
        state.receive(Operation::Timezone {
            username: username.to_owned(),
        })?;
        Ok(state.users.get(username).map(|user| user.timezone.clone()))
    }

    async fn leaderboard(&self, limit: u32) -> Result<Vec<UserRating>, StoreError> {
        let mut state = self.lock();
        state.receive(Operation::Leaderboard { limit })?;
        let mut ratings: Vec<_> = state
            .users
            .iter()
            .map(|(username, user)| UserRating {
                username: username.clone(),
                rating: user.rating,
            })
            .collect();
        ratings.sort_by(|a, b| {
            b.rating
                .cmp(&a.rating)
                .then_with(|| a.username.cmp(&b.username))
        });
        ratings.truncate(limit as usize);
        Ok(ratings)
    }
}

#[async_trait]
impl FileCatalog for MemoryStore {
    async fn insert_file(&self, file: &NewFile) -> Result<u64, StoreError> {
        let mut state = self.lock();
        state.receive(Operation::InsertFile {
            label: file.label.clone(),
        })?;
        state.last_file_id += 1;
        let id = state.last_file_id;
        state.files.insert(
            id,
            FileRecord {
                id,
                label: file.label.clone(),
                size_bytes: file.size_bytes,
                description: file.description.clone(),
                owner: file.owner.clone(),
                category: file.category.as_str().to_owned(),
                uploaded_at: file.uploaded_at,
                rating: 0,
            },
        );
        Ok(id)
    }

    async fn delete_file(&self, id: u64) -> Result<(), StoreError> {
        let mut state = self.lock();
        state.receive(Operation::DeleteFile { id })?;
        state.files.remove(&id);
        Ok(())
    }

    async fn file(&self, id: u64) -> Result<Option<FileRecord>, StoreError> {
        let mut state = self.lock();
        state.receive(Operation::File { id })?;
        Ok(state.files.get(&id).cloned())
    }

    async fn list_files(
        &self,
        listing: Listing,
        limit: u32,
    ) -> Result<Vec<FileRecord>, StoreError> {
        let mut state = self.lock();
        state.receive(Operation::ListFiles { listing, limit })?;
        let mut files: Vec<FileRecord> = match listing {
            Listing::Popular => state
                .files
                .values()
                .filter(|file| file.rating > 0)
                .cloned()
                .collect(),
            Listing::Recent => state.files.values().cloned().collect(),
            Listing::Category(category) => state
                .files
                .values()
                .filter(|file| file.category == category.as_str())
                .cloned()
                .collect(),
        };
        match listing {
            Listing::Popular => files.sort_by(|a, b| b.rating.cmp(&a.rating)),
            Listing::Recent | Listing::Category(_) => files.sort_by(|a, b| {
                b.uploaded_at
                    .cmp(&a.uploaded_at)
                    .then_with(|| b.id.cmp(&a.id))
            }),
        }
        files.truncate(limit as usize);
        Ok(files)
    }
}
