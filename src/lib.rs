//! Multi-page file hosting with cookie sessions.
//!
//! Users register, log in, upload files into categories and browse the
//! popular, recent and per-category listings. Every page except login,
//! registration and logout sits behind a session gate.
//!
//! # Sessions
//!
//! A session is a 60-character random cookie value. The store never sees the
//! value itself, only its blake3 digest ([`SessionId`]), so a leaked sessions
//! table does not yield usable cookies. [`SessionStore`] issues, resolves and
//! revokes sessions and answers with a [`SessionCookieCommand`] telling the
//! web layer what to do with the client's cookie.
//!
//! A cookie of the wrong length is rejected before the store is contacted.
//!
//! # Example
//!
//! ```
//! use filehost::{Identity, MemoryStore, Resolution, SessionCookieCommand, SessionStore};
//!
//! # fn main() -> Result<(), filehost::Error> {
//! # async_std::task::block_on(async {
//! #
//! let store = SessionStore::new(MemoryStore::new());
//!
//! // Log a user in.
//! let SessionCookieCommand::Set { cookie_value, .. } = store.issue("example").await? else {
//!     unreachable!("issuing always sets a cookie")
//! };
//! assert_eq!(cookie_value.len(), 60);
//!
//! // Resolve the cookie on a later request.
//! let resolution = store.resolve(Some(&cookie_value)).await?;
//! assert_eq!(resolution, Resolution::Authenticated(Identity::new("example")));
//!
//! // Log out.
//! assert_eq!(store.revoke(Some(&cookie_value)).await?, SessionCookieCommand::Delete);
//! assert_eq!(store.resolve(Some(&cookie_value)).await?, Resolution::Unauthenticated);
//! #
//! # Ok(()) }) }
//! ```

#![forbid(unsafe_code)]
#![deny(future_incompatible, nonstandard_style)]
#![warn(missing_debug_implementations)]

pub mod accounts;
pub mod catalog;
pub mod config;
pub mod dbformat;
mod error;
mod memory_store;
mod mysql_store;
pub mod password;
mod session;
mod session_store;
pub mod templates;
pub mod validate;
pub mod web;

pub use error::{Error, StoreError};
pub use memory_store::{MemoryStore, Operation, OperationKind};
pub use mysql_store::MySqlStore;
pub use session::{Identity, SessionExpiry, SessionId, SessionIdType};
pub use session_store::cookie_generator::{
    DebugSessionCookieGenerator, DefaultSessionCookieGenerator, SessionCookieGenerator,
    COOKIE_LENGTH,
};
pub use session_store::{
    DynSessionStore, Resolution, SessionCookieCommand, SessionStore, SessionStoreConnector,
    WriteSessionResult,
};
