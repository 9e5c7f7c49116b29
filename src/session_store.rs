use crate::session::{Identity, SessionExpiry, SessionId};
use crate::{Error, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cookie_generator::{DefaultSessionCookieGenerator, SessionCookieGenerator};
use log::{debug, info, warn};
use std::sync::Arc;

pub mod cookie_generator;

/// An async session store.
///
/// This is the user-facing interface of the session store.
/// It issues, resolves and revokes sessions, and tells the caller what to do with the client's cookie.
/// The storage itself is abstracted by a [`SessionStoreConnector`].
#[derive(Debug, Clone)]
pub struct SessionStore<Connector, Generator = DefaultSessionCookieGenerator> {
    connector: Connector,
    cookie_generator: Generator,
    ttl: Option<std::time::Duration>,
}

/// A session store over type-erased parts, as held by the web layer.
pub type DynSessionStore =
    SessionStore<Arc<dyn SessionStoreConnector>, Arc<dyn SessionCookieGenerator>>;

/// The outcome of resolving a session cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The cookie belongs to a live session of this user.
    Authenticated(Identity),
    /// There is no cookie, the cookie is malformed, or no live session matches it.
    Unauthenticated,
}

impl<Connector: SessionStoreConnector> SessionStore<Connector> {
    /// Create a new session store with the given connector and the default cookie generator.
    pub fn new(connector: Connector) -> Self {
        Self::new_with_cookie_generator(connector, DefaultSessionCookieGenerator)
    }
}

impl<Connector: SessionStoreConnector, Generator: SessionCookieGenerator>
    SessionStore<Connector, Generator>
{
    /// Create a new session store with the given connector and cookie generator.
    pub fn new_with_cookie_generator(connector: Connector, cookie_generator: Generator) -> Self {
        Self {
            connector,
            cookie_generator,
            ttl: None,
        }
    }

    /// Let issued sessions expire `ttl` after their creation.
    /// `None`, the default, keeps sessions alive until logout.
    pub fn with_ttl(mut self, ttl: Option<std::time::Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    /// Returns a reference to the connector.
    pub fn connector(&self) -> &Connector {
        &self.connector
    }

    /// Consumes the store and returns the connector.
    pub fn into_inner(self) -> Connector {
        self.connector
    }

    /// Start a new session for `username`, who has already proven their credentials.
    ///
    /// On success, the returned command is always [`SessionCookieCommand::Set`].
    /// Exactly one session is written. A store failure or an id collision is returned as an error
    /// and nothing is retried, so no cookie must be set in that case.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use filehost::{MemoryStore, Resolution, SessionCookieCommand, SessionStore};
    /// # fn main() -> Result<(), filehost::Error> { async_std::task::block_on(async {
    /// let store = SessionStore::new(MemoryStore::new());
    /// let SessionCookieCommand::Set { cookie_value, .. } = store.issue("example").await? else {
    ///     unreachable!("issuing always sets the cookie")
    /// };
    /// assert_eq!(cookie_value.len(), 60);
    /// let Resolution::Authenticated(identity) = store.resolve(Some(&cookie_value)).await? else {
    ///     unreachable!("the session was just issued")
    /// };
    /// assert_eq!(identity.username(), "example");
    /// # Ok(()) }) }
    /// ```
    pub async fn issue(&self, username: &str) -> Result<SessionCookieCommand, Error> {
        let now = Utc::now();
        let expiry = SessionExpiry::after(now, self.ttl);
        let cookie_value = self.cookie_generator.generate_cookie();
        let id = SessionId::from_cookie_value(&cookie_value);

        match self
            .connector
            .create_session(&id, username, now, &expiry)
            .await?
        {
            WriteSessionResult::Ok(()) => {
                info!("issued session for {username}");
                Ok(SessionCookieCommand::Set {
                    cookie_value,
                    expiry,
                })
            }
            WriteSessionResult::SessionIdExists => {
                warn!("session id collision for {username}");
                Err(Error::SessionIdExists)
            }
        }
    }

    /// Resolve the value of the client's session cookie to the identity of a live session.
    ///
    /// A missing cookie, or one that does not have the length of issued cookies, is
    /// [`Resolution::Unauthenticated`] without consulting the store.
    /// Otherwise exactly one lookup is made. Store errors are returned as errors and must not
    /// be treated as unauthenticated.
    pub async fn resolve(&self, cookie_value: Option<&str>) -> Result<Resolution, Error> {
        let Some(cookie_value) = cookie_value else {
            debug!("no session cookie");
            return Ok(Resolution::Unauthenticated);
        };
        let id = match SessionId::parse_cookie_value(cookie_value) {
            Ok(id) => id,
            Err(error) => {
                debug!("rejecting session cookie without lookup: {error}");
                return Ok(Resolution::Unauthenticated);
            }
        };

        Ok(match self.connector.read_session(&id, Utc::now()).await? {
            Some(username) => Resolution::Authenticated(Identity::new(username)),
            None => {
                debug!("no live session for {id:?}");
                Resolution::Unauthenticated
            }
        })
    }

    /// End the session identified by the client's cookie.
    ///
    /// Without a cookie there is nothing to do and the store is not contacted.
    /// Deleting a session that does not exist is not an error, so revoking is idempotent.
    /// If the store fails, the error is returned and the cookie must be left in place.
    pub async fn revoke(&self, cookie_value: Option<&str>) -> Result<SessionCookieCommand, Error> {
        let Some(cookie_value) = cookie_value else {
            return Ok(SessionCookieCommand::DoNothing);
        };
        match SessionId::parse_cookie_value(cookie_value) {
            Ok(id) => {
                self.connector.delete_session(&id).await?;
                info!("revoked {id:?}");
            }
            Err(error) => debug!("clearing malformed session cookie: {error}"),
        }
        Ok(SessionCookieCommand::Delete)
    }
}

/// This is the backend-facing interface of the session store.
/// It defines simple [CRUD]-methods on sessions.
///
/// The session id is expected to be the primary key, uniquely identifying a session.
/// Implementations must be safe for concurrent use through a shared reference.
///
/// [CRUD]: https://en.wikipedia.org/wiki/Create,_read,_update_and_delete
#[async_trait]
pub trait SessionStoreConnector: Send + Sync {
    /// Create a session with the given `id` for `username`.
    /// An existing session with the same `id` is left untouched and reported as [`WriteSessionResult::SessionIdExists`].
    async fn create_session(
        &self,
        id: &SessionId,
        username: &str,
        created_at: DateTime<Utc>,
        expiry: &SessionExpiry,
    ) -> Result<WriteSessionResult, StoreError>;

    /// Read the username of the session with the given `id`, if it exists and is not expired at `now`.
    async fn read_session(
        &self,
        id: &SessionId,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, StoreError>;

    /// Delete the session with the given `id`. Deleting a missing session succeeds.
    async fn delete_session(&self, id: &SessionId) -> Result<(), StoreError>;
}

#[async_trait]
impl<T: SessionStoreConnector + ?Sized> SessionStoreConnector for Arc<T> {
    async fn create_session(
        &self,
        id: &SessionId,
        username: &str,
        created_at: DateTime<Utc>,
        expiry: &SessionExpiry,
    ) -> Result<WriteSessionResult, StoreError> {
        (**self)
            .create_session(id, username, created_at, expiry)
            .await
    }

    async fn read_session(
        &self,
        id: &SessionId,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, StoreError> {
        (**self).read_session(id, now).await
    }

    async fn delete_session(&self, id: &SessionId) -> Result<(), StoreError> {
        (**self).delete_session(id).await
    }
}

/// The result of writing a session, indicating if the session could be written, or if the id collided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteSessionResult<OkData = ()> {
    /// The session could be written without id collision.
    Ok(OkData),
    /// The session could not be written, because the chosen id already exists.
    SessionIdExists,
}

/// Indicates how the client's session cookie should be updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCookieCommand {
    /// Set the session cookie.
    Set {
        /// The value of the session cookie.
        cookie_value: String,
        /// When the session ends on the server. The cookie itself is always browser-session scoped.
        expiry: SessionExpiry,
    },
    /// Delete the session cookie.
    Delete,
    /// Leave the cookie as it is.
    DoNothing,
}
