//! The dispatch gate: protected handlers take an [`Identity`] argument and
//! never run without a live session.

use super::{found, AppState, PageError};
use crate::{Identity, Resolution, SessionCookieCommand};
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

pub const SESSION_COOKIE: &str = "session_id";

/// Why a request did not pass the gate.
#[derive(Debug)]
pub enum GateRejection {
    /// Redirects to `/login`.
    Unauthenticated,
    /// The session lookup failed. This is not treated as logged out.
    Internal(crate::Error),
}

impl IntoResponse for GateRejection {
    fn into_response(self) -> Response {
        match self {
            GateRejection::Unauthenticated => found("/login"),
            GateRejection::Internal(error) => PageError::from(error).into_response(),
        }
    }
}

impl FromRequestParts<AppState> for Identity {
    type Rejection = GateRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let cookie_value = jar.get(SESSION_COOKIE).map(Cookie::value);
        match state.sessions.resolve(cookie_value).await {
            Ok(Resolution::Authenticated(identity)) => {
                log::debug!("{} passed the gate to {}", identity.username(), parts.uri.path());
                Ok(identity)
            }
            Ok(Resolution::Unauthenticated) => Err(GateRejection::Unauthenticated),
            Err(error) => Err(GateRejection::Internal(error)),
        }
    }
}

/// Apply `command` to the client's session cookie.
pub(crate) fn apply_cookie_command(
    jar: CookieJar,
    command: SessionCookieCommand,
    secure: bool,
) -> CookieJar {
    match command {
        SessionCookieCommand::Set { cookie_value, .. } => jar.add(
            Cookie::build((SESSION_COOKIE, cookie_value))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax)
                .secure(secure),
        ),
        SessionCookieCommand::Delete => jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        SessionCookieCommand::DoNothing => jar,
    }
}
