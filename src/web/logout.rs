use super::gate::{apply_cookie_command, SESSION_COOKIE};
use super::{found, AppState, PageError};
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar};

/// Ends the session and clears the cookie. On a store failure the cookie stays.
pub(crate) async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Response, PageError> {
    let cookie_value = jar.get(SESSION_COOKIE).map(Cookie::value);
    let command = state.sessions.revoke(cookie_value).await?;
    let jar = apply_cookie_command(jar, command, state.settings.cookie_secure);
    Ok((jar, found("/login")).into_response())
}
