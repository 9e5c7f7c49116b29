use crate::dbformat::FormatError;
use crate::templates::TemplateError;
use crate::StoreError;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// The message shown for every failure the user cannot fix.
pub const INTERNAL_ERROR: &str = "INTERNAL ERROR. Please try later";

/// A failure that ends the current request.
///
/// Everything except a malformed upload is answered with a bare 500 page; the cause is only logged.
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error(transparent)]
    Session(#[from] crate::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("file storage failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed upload: {0}")]
    Multipart(#[from] MultipartError),
    #[error("upload without a file")]
    MissingFile,
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        match self {
            PageError::Multipart(error) => {
                log::warn!("malformed upload: {error}");
                (error.status(), error.body_text()).into_response()
            }
            error => {
                log::error!("{error}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("{INTERNAL_ERROR}\n"),
                )
                    .into_response()
            }
        }
    }
}
