use super::{AppState, PageError};
use crate::accounts::UserRating;
use crate::catalog::{Category, Listing, LISTING_LIMIT};
use crate::dbformat::{self, FileInfo};
use crate::templates::Page;
use crate::Identity;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use serde::Serialize;

#[derive(Serialize)]
struct FilesPage<'a> {
    username: &'a str,
    title: String,
    files: Vec<FileInfo>,
}

#[derive(Serialize)]
struct CategoriesPage<'a> {
    username: &'a str,
    categories: [Category; 5],
}

#[derive(Serialize)]
struct UsersPage<'a> {
    username: &'a str,
    users: Vec<UserRating>,
}

async fn render_listing(
    state: &AppState,
    identity: &Identity,
    title: String,
    listing: Listing,
) -> Result<Html<String>, PageError> {
    let timezone = dbformat::user_timezone(state.accounts.as_ref(), identity.username()).await?;
    let files = state.catalog.list_files(listing, LISTING_LIMIT).await?;
    let page = FilesPage {
        username: identity.username(),
        title,
        files: dbformat::format_files(&files, timezone),
    };
    Ok(Html(state.templates.render(Page::Files, &page)?))
}

pub(crate) async fn popular(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Html<String>, PageError> {
    render_listing(&state, &identity, "Popular files".to_owned(), Listing::Popular).await
}

pub(crate) async fn recent(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Html<String>, PageError> {
    render_listing(&state, &identity, "Recent files".to_owned(), Listing::Recent).await
}

pub(crate) async fn categories(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Html<String>, PageError> {
    let page = CategoriesPage {
        username: identity.username(),
        categories: Category::ALL,
    };
    Ok(Html(state.templates.render(Page::Categories, &page)?))
}

pub(crate) async fn category(
    State(state): State<AppState>,
    identity: Identity,
    Path(category): Path<String>,
) -> Result<Response, PageError> {
    let Ok(category) = category.parse::<Category>() else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };
    let title = format!("Category: {category}");
    let page = render_listing(&state, &identity, title, Listing::Category(category)).await?;
    Ok(page.into_response())
}

pub(crate) async fn users(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Html<String>, PageError> {
    let page = UsersPage {
        username: identity.username(),
        users: state.accounts.leaderboard(LISTING_LIMIT).await?,
    };
    Ok(Html(state.templates.render(Page::Users, &page)?))
}
