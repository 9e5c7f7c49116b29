use crate::session_store::cookie_generator::COOKIE_LENGTH;
use crate::Error;
use chrono::{DateTime, Duration, Utc};
use std::fmt::{Debug, Formatter};

/// The expiry of a session.
/// Either a given date and time, or never.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum SessionExpiry {
    /// The session expires at the given date and time.
    DateTime(DateTime<Utc>),
    /// The session never expires, unless it is explicitly deleted.
    Never,
}

impl SessionExpiry {
    /// The expiry of a session issued at `now` that lives for `ttl`.
    /// Without a `ttl` the session lives until logout.
    pub fn after(now: DateTime<Utc>, ttl: Option<std::time::Duration>) -> Self {
        match ttl.and_then(|ttl| Duration::from_std(ttl).ok()) {
            Some(ttl) => Self::DateTime(now + ttl),
            None => Self::Never,
        }
    }

    /// Return true if the expiry lies before `now`.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use filehost::SessionExpiry;
    /// use chrono::{Duration, Utc};
    /// let now = Utc::now();
    /// assert!(!SessionExpiry::Never.is_expired(now));
    /// assert!(SessionExpiry::DateTime(now - Duration::seconds(1)).is_expired(now));
    /// assert!(!SessionExpiry::DateTime(now + Duration::seconds(1)).is_expired(now));
    /// ```
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self {
            Self::DateTime(expiry) => *expiry <= now,
            Self::Never => false,
        }
    }

    /// The expiry as an optional timestamp, `None` meaning never.
    pub fn date_time(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::DateTime(expiry) => Some(*expiry),
            Self::Never => None,
        }
    }
}

/// The type of a session id.
pub type SessionIdType = [u8; blake3::OUT_LEN];

/// A session id.
///
/// The store only ever sees the session id, never the cookie value it was derived from.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SessionId(Box<SessionIdType>);

impl SessionId {
    /// Applies a cryptographic hash function on a cookie value to obtain the session id for that cookie.
    ///
    /// This is automatically done by the [`SessionStore`](crate::SessionStore), and this function is only public for test purposes.
    pub fn from_cookie_value(cookie_value: &str) -> Self {
        let hash = blake3::hash(cookie_value.as_bytes());
        Self(Box::new(hash.into()))
    }

    /// Like [`SessionId::from_cookie_value`], but refuses cookie values this system cannot have issued.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use filehost::{Error, SessionId};
    /// assert!(SessionId::parse_cookie_value(&"a".repeat(60)).is_ok());
    /// assert!(matches!(
    ///     SessionId::parse_cookie_value("short"),
    ///     Err(Error::WrongCookieLength { expected: 60, actual: 5 })
    /// ));
    /// ```
    pub fn parse_cookie_value(cookie_value: &str) -> Result<Self, Error> {
        if cookie_value.len() == COOKIE_LENGTH {
            Ok(Self::from_cookie_value(cookie_value))
        } else {
            Err(Error::WrongCookieLength {
                expected: COOKIE_LENGTH,
                actual: cookie_value.len(),
            })
        }
    }

    /// Lowercase hex encoding, the form stored in the `sessions.session_id` column.
    pub fn to_hex(&self) -> String {
        blake3::Hash::from(*self.0).to_hex().to_string()
    }
}

impl From<SessionId> for SessionIdType {
    fn from(id: SessionId) -> Self {
        *id.0
    }
}

impl Debug for SessionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionId({})", &self.to_hex()[..8])
    }
}

/// The resolved user of an authenticated request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    username: String,
}

impl Identity {
    /// Wrap a username that was resolved from a live session.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }

    /// The username this identity belongs to.
    pub fn username(&self) -> &str {
        &self.username
    }
}
