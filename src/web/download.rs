use super::{AppState, PageError};
use crate::dbformat::{self, DownloadFileInfo};
use crate::templates::Page;
use crate::Identity;
use axum::extract::{Path, Query, Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tower::ServiceExt;
use tower_http::services::ServeFile;

#[derive(Debug, Deserialize)]
pub(crate) struct DownloadQuery {
    id: u64,
}

#[derive(Serialize)]
struct DownloadPage<'a> {
    username: &'a str,
    file: DownloadFileInfo,
}

pub(crate) async fn details(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, PageError> {
    let Some(file) = state.catalog.file(query.id).await? else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };
    let timezone = dbformat::user_timezone(state.accounts.as_ref(), identity.username()).await?;
    let page = DownloadPage {
        username: identity.username(),
        file: dbformat::format_download(&file, timezone),
    };
    Ok(Html(state.templates.render(Page::Download, &page)?).into_response())
}

/// Streams the stored body of a file as an attachment named after its label.
pub(crate) async fn file(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<u64>,
    request: Request,
) -> Result<Response, PageError> {
    let Some(file) = state.catalog.file(id).await? else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };
    log::info!("{} downloads file {id}", identity.username());
    let path = state.settings.files_dir.join(id.to_string());
    let mut response = ServeFile::new(path)
        .oneshot(request)
        .await
        .unwrap_or_else(|never| match never {})
        .into_response();
    if response.status().is_success() {
        response
            .headers_mut()
            .insert(header::CONTENT_DISPOSITION, attachment(&file.label));
    }
    Ok(response)
}

fn attachment(label: &str) -> HeaderValue {
    let filename: String = label
        .chars()
        .map(|c| match c {
            ' '..='~' if c != '"' && c != '\\' => c,
            _ => '_',
        })
        .collect();
    HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}
