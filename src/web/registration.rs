use super::{found, AppState, PageError};
use crate::accounts::{CreateUserResult, NewUser};
use crate::password;
use crate::templates::Page;
use crate::validate;
use axum::extract::State;
use axum::response::{Html, IntoResponse, Response};
use axum::Form;
use serde::{Deserialize, Serialize};

const USERNAME_TAKEN: &str = "Username already used";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RegistrationForm {
    username: String,
    password: String,
    password_confirm: String,
    timezone: String,
}

#[derive(Serialize)]
struct RegistrationPage<'a> {
    username: &'a str,
    timezone: &'a str,
    warning: Option<&'a str>,
}

fn render(
    state: &AppState,
    form: &RegistrationForm,
    warning: Option<&str>,
) -> Result<Response, PageError> {
    let page = state.templates.render(
        Page::Registration,
        &RegistrationPage {
            username: &form.username,
            timezone: &form.timezone,
            warning,
        },
    )?;
    Ok(Html(page).into_response())
}

pub(crate) async fn form(State(state): State<AppState>) -> Result<Response, PageError> {
    render(&state, &RegistrationForm::default(), None)
}

pub(crate) async fn submit(
    State(state): State<AppState>,
    Form(form): Form<RegistrationForm>,
) -> Result<Response, PageError> {
    let timezone = match validate::registration(
        &form.username,
        &form.password,
        &form.password_confirm,
        &form.timezone,
    ) {
        Ok(timezone) => timezone,
        Err(error) => return render(&state, &form, Some(&error.to_string())),
    };

    let password = form.password.clone();
    let password_hash = tokio::task::spawn_blocking(move || password::hash(&password)).await??;
    let user = NewUser {
        username: form.username.clone(),
        password_hash,
        timezone: timezone.name().to_owned(),
    };
    match state.accounts.create_user(&user).await? {
        CreateUserResult::Created => {
            log::info!("registered {}", user.username);
            Ok(found("/login"))
        }
        CreateUserResult::UsernameTaken => render(&state, &form, Some(USERNAME_TAKEN)),
    }
}
