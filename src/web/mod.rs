//! HTTP surface: the router, its shared state and the page handlers.

use crate::accounts::AccountStore;
use crate::catalog::FileCatalog;
use crate::config::{AppConfig, DEFAULT_MAX_FILE_SIZE};
use crate::templates::Templates;
use crate::{
    DefaultSessionCookieGenerator, DynSessionStore, SessionCookieGenerator, SessionStore,
    SessionStoreConnector,
};
use axum::extract::DefaultBodyLimit;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::fmt::{Debug, Formatter};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

mod download;
mod error;
mod gate;
mod listings;
mod login;
mod logout;
mod registration;
mod upload;

pub use error::{PageError, INTERNAL_ERROR};
pub use gate::{GateRejection, SESSION_COOKIE};

/// Settings of the web layer that are not owned by a collaborator.
#[derive(Debug, Clone)]
pub struct WebSettings {
    pub cookie_secure: bool,
    pub session_ttl: Option<Duration>,
    pub files_dir: PathBuf,
    pub max_file_size: u64,
}

impl Default for WebSettings {
    fn default() -> Self {
        Self {
            cookie_secure: false,
            session_ttl: None,
            files_dir: PathBuf::from("files"),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl From<&AppConfig> for WebSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            cookie_secure: config.session.cookie_secure,
            session_ttl: config.session.ttl(),
            files_dir: config.storage.files_dir.clone(),
            max_file_size: config.storage.max_file_size,
        }
    }
}

/// Everything a handler needs, injected once at start-up.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<DynSessionStore>,
    pub accounts: Arc<dyn AccountStore>,
    pub catalog: Arc<dyn FileCatalog>,
    pub templates: Arc<Templates>,
    pub settings: Arc<WebSettings>,
}

impl Debug for AppState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("templates", &self.templates)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// State backed by one store for sessions, accounts and files.
    pub fn new<S>(store: Arc<S>, templates: Templates, settings: WebSettings) -> Self
    where
        S: SessionStoreConnector + AccountStore + FileCatalog + 'static,
    {
        Self::new_with_cookie_generator(
            store,
            Arc::new(DefaultSessionCookieGenerator),
            templates,
            settings,
        )
    }

    pub fn new_with_cookie_generator<S>(
        store: Arc<S>,
        cookie_generator: Arc<dyn SessionCookieGenerator>,
        templates: Templates,
        settings: WebSettings,
    ) -> Self
    where
        S: SessionStoreConnector + AccountStore + FileCatalog + 'static,
    {
        let connector: Arc<dyn SessionStoreConnector> = store.clone();
        let sessions = SessionStore::new_with_cookie_generator(connector, cookie_generator)
            .with_ttl(settings.session_ttl);
        Self {
            sessions: Arc::new(sessions),
            accounts: store.clone(),
            catalog: store,
            templates: Arc::new(templates),
            settings: Arc::new(settings),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/login", get(login::form).post(login::submit))
        .route("/logout", get(logout::logout))
        .route(
            "/registration",
            get(registration::form).post(registration::submit),
        )
        .route("/", get(listings::popular))
        .route("/recent", get(listings::recent))
        .route("/categories", get(listings::categories))
        .route("/categories/{category}", get(listings::category))
        .route("/users", get(listings::users))
        // every upload part is capped while streaming
        .route(
            "/upload",
            get(upload::form)
                .post(upload::submit)
                .layer(DefaultBodyLimit::disable()),
        )
        .route("/download", get(download::details))
        .route("/files/{id}", get(download::file))
        .with_state(state)
}

/// `302 Found` to `location`.
pub(crate) fn found(location: &'static str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}
