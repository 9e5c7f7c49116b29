use super::gate::apply_cookie_command;
use super::{found, AppState, PageError};
use crate::password;
use crate::templates::Page;
use crate::validate;
use axum::extract::State;
use axum::response::{Html, IntoResponse, Response};
use axum::Form;
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

const WRONG_CREDENTIALS: &str = "Wrong username or password";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct LoginForm {
    username: String,
    password: String,
}

#[derive(Serialize)]
struct LoginPage<'a> {
    username: &'a str,
    warning: Option<&'a str>,
}

fn render(state: &AppState, username: &str, warning: Option<&str>) -> Result<Response, PageError> {
    let page = state
        .templates
        .render(Page::Login, &LoginPage { username, warning })?;
    Ok(Html(page).into_response())
}

pub(crate) async fn form(State(state): State<AppState>) -> Result<Response, PageError> {
    render(&state, "", None)
}

pub(crate) async fn submit(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, PageError> {
    if let Err(error) = validate::credentials(&form.username, &form.password) {
        return render(&state, &form.username, Some(&error.to_string()));
    }

    let Some(hashword) = state.accounts.password_hash(&form.username).await? else {
        log::warn!("login attempt for unknown user {}", form.username);
        return render(&state, &form.username, Some(WRONG_CREDENTIALS));
    };
    let password = form.password.clone();
    let verification =
        tokio::task::spawn_blocking(move || password::verify(&hashword, &password)).await?;
    if !verification.is_success() {
        log::warn!("rejected password of {} ({verification:?})", form.username);
        return render(&state, &form.username, Some(WRONG_CREDENTIALS));
    }

    let command = state.sessions.issue(&form.username).await?;
    log::info!("{} logged in", form.username);
    let jar = apply_cookie_command(jar, command, state.settings.cookie_secure);
    Ok((jar, found("/")).into_response())
}
