use super::{AppState, PageError, INTERNAL_ERROR};
use crate::catalog::{Category, NewFile};
use crate::templates::Page;
use crate::validate::{self, ValidationError};
use crate::Identity;
use axum::extract::multipart::Field;
use axum::extract::{Multipart, State};
use axum::response::Html;
use chrono::Utc;
use rand::distributions::{Alphanumeric, DistString};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

const UPLOAD_TOO_LARGE: &str = "Filesize more than 1GB";
const UPLOAD_SUCCEEDED: &str = "FILE SUCCEEDED UPLOADED";

#[derive(Serialize)]
struct UploadPage<'a> {
    username: &'a str,
    categories: [Category; 5],
    warning: Option<&'a str>,
    notice: Option<&'a str>,
}

fn render(
    state: &AppState,
    identity: &Identity,
    warning: Option<&str>,
    notice: Option<&str>,
) -> Result<Html<String>, PageError> {
    let page = UploadPage {
        username: identity.username(),
        categories: Category::ALL,
        warning,
        notice,
    };
    Ok(Html(state.templates.render(Page::Upload, &page)?))
}

pub(crate) async fn form(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Html<String>, PageError> {
    render(&state, &identity, None, None)
}

/// A file body written to a temporary path. It must end in [`Spooled::persist`] or [`Spooled::discard`].
#[derive(Debug)]
struct Spooled {
    path: PathBuf,
    original_name: String,
    size_bytes: u64,
}

impl Spooled {
    async fn persist(self, to: &Path) -> std::io::Result<()> {
        tokio::fs::rename(&self.path, to).await
    }

    async fn discard(self) {
        remove_temporary(&self.path).await;
    }
}

async fn remove_temporary(path: &Path) {
    if let Err(error) = tokio::fs::remove_file(path).await {
        log::warn!("failed to remove {}: {error}", path.display());
    }
}

/// Bytes accepted for each text part. Anything longer fails validation anyway.
const FILENAME_LIMIT: usize = validate::MAX_FILENAME_LEN * 4;
const DESCRIPTION_LIMIT: usize = validate::MAX_DESCRIPTION_LEN * 4;
const CATEGORY_LIMIT: usize = 64;

/// Read a text part chunk by chunk. `None` once it grows past `limit` bytes.
async fn read_text(field: &mut Field<'_>, limit: usize) -> Result<Option<String>, PageError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.chunk().await? {
        if bytes.len() + chunk.len() > limit {
            return Ok(None);
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
}

enum Received {
    File(Spooled),
    TooLarge,
}

/// Write the body of `field` below `dir`, giving up once it exceeds `max_size` bytes.
async fn spool(field: &mut Field<'_>, dir: &Path, max_size: u64) -> Result<Received, PageError> {
    tokio::fs::create_dir_all(dir).await?;
    let name = Alphanumeric.sample_string(&mut rand::thread_rng(), 16);
    let mut spooled = Spooled {
        path: dir.join(format!(".upload-{name}")),
        original_name: field.file_name().unwrap_or_default().to_owned(),
        size_bytes: 0,
    };
    let mut file = tokio::fs::File::create(&spooled.path).await?;
    let result = async {
        while let Some(chunk) = field.chunk().await? {
            spooled.size_bytes += chunk.len() as u64;
            if spooled.size_bytes > max_size {
                return Ok(false);
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok::<_, PageError>(true)
    }
    .await;
    drop(file);
    match result {
        Ok(true) => Ok(Received::File(spooled)),
        Ok(false) => {
            spooled.discard().await;
            Ok(Received::TooLarge)
        }
        Err(error) => {
            spooled.discard().await;
            Err(error)
        }
    }
}

pub(crate) async fn submit(
    State(state): State<AppState>,
    identity: Identity,
    multipart: Multipart,
) -> Result<Html<String>, PageError> {
    let mut upload = None;
    let result = receive(&state, &identity, multipart, &mut upload).await;
    if let Some(spooled) = upload {
        spooled.discard().await;
    }
    result
}

/// Read the form and store the file. A file still left in `upload` afterwards was not persisted.
async fn receive(
    state: &AppState,
    identity: &Identity,
    mut multipart: Multipart,
    upload: &mut Option<Spooled>,
) -> Result<Html<String>, PageError> {
    let mut filename = String::new();
    let mut description = String::new();
    let mut category = String::new();

    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        let (target, limit, too_long) = match name.as_deref() {
            Some("filename") => (
                &mut filename,
                FILENAME_LIMIT,
                ValidationError::FilenameTooLong,
            ),
            Some("description") => (
                &mut description,
                DESCRIPTION_LIMIT,
                ValidationError::DescriptionTooLong,
            ),
            Some("category") => (
                &mut category,
                CATEGORY_LIMIT,
                ValidationError::UnknownCategory,
            ),
            Some("uploaded_file") => {
                if let Some(previous) = upload.take() {
                    previous.discard().await;
                }
                match spool(&mut field, &state.settings.files_dir, state.settings.max_file_size)
                    .await?
                {
                    Received::File(spooled) => *upload = Some(spooled),
                    Received::TooLarge => {
                        log::info!("rejected oversized upload of {}", identity.username());
                        return render(state, identity, Some(UPLOAD_TOO_LARGE), None);
                    }
                }
                continue;
            }
            _ => continue,
        };
        match read_text(&mut field, limit).await? {
            Some(text) => *target = text,
            None => {
                log::info!("rejected oversized upload field of {}", identity.username());
                return render(state, identity, Some(&too_long.to_string()), None);
            }
        }
    }

    let spooled = upload.take().ok_or(PageError::MissingFile)?;
    if filename.is_empty() {
        filename = spooled.original_name.clone();
    }
    let category = match validate::upload(
        spooled.size_bytes,
        state.settings.max_file_size,
        &filename,
        &description,
        &category,
    ) {
        Ok(category) => category,
        Err(error) => {
            spooled.discard().await;
            return render(state, identity, Some(&error.to_string()), None);
        }
    };

    let new_file = NewFile {
        label: filename,
        size_bytes: spooled.size_bytes,
        description,
        owner: identity.username().to_owned(),
        category,
        uploaded_at: Utc::now(),
    };
    let id = match state.catalog.insert_file(&new_file).await {
        Ok(id) => id,
        Err(error) => {
            log::error!("failed to record upload of {}: {error}", identity.username());
            spooled.discard().await;
            return render(state, identity, Some(INTERNAL_ERROR), None);
        }
    };
    let temporary = spooled.path.clone();
    if let Err(error) = spooled
        .persist(&state.settings.files_dir.join(id.to_string()))
        .await
    {
        remove_temporary(&temporary).await;
        state.catalog.delete_file(id).await?;
        return Err(error.into());
    }

    log::info!("{} uploaded file {id}", identity.username());
    render(state, identity, None, Some(UPLOAD_SUCCEEDED))
}
