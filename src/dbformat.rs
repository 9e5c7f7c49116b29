//! Turns stored rows into what the pages display.
//!
//! Every listing page looks up the viewer's timezone once with [user_timezone]
//! and formats all its rows with that zone.
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use filehost::dbformat::{local_time, megabytes};
//!
//! assert_eq!(megabytes(1024, 4), "0.0010 MB");
//! let uploaded = Utc.with_ymd_and_hms(2009, 11, 17, 20, 34, 58).unwrap();
//! assert_eq!(local_time(uploaded, chrono_tz::Europe::Moscow), "2009-11-17 23:34:58");
//! ```

use crate::accounts::AccountStore;
use crate::catalog::FileRecord;
use crate::StoreError;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

pub const LABEL_WIDTH: usize = 20;
pub const DESCRIPTION_WIDTH: usize = 35;
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const BYTES_PER_MEGABYTE: f64 = 1024.0 * 1024.0;

#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("user {0:?} does not exist")]
    UnknownUser(String),
    #[error("user {username:?} has an unknown timezone {timezone:?}")]
    UnknownTimezone { username: String, timezone: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A row of a file listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileInfo {
    pub id: u64,
    pub link: String,
    pub label: String,
    pub short_label: String,
    pub description: String,
    pub short_description: String,
    pub size: String,
    pub size_bytes: String,
    pub owner: String,
    pub category: String,
    pub uploaded_at: String,
    pub rating: i64,
}

/// The detail page of a single file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadFileInfo {
    pub id: u64,
    pub link: String,
    pub label: String,
    pub description: String,
    pub size: String,
    pub size_bytes: String,
    pub owner: String,
    pub category: String,
    pub uploaded_at: String,
    pub rating: i64,
}

/// Cut `text` to `width` characters and mark the cut with `...`.
/// Text that fits is returned unchanged.
pub fn truncate(text: &str, width: usize) -> String {
    match text.char_indices().nth(width) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_owned(),
    }
}

/// `bytes` in mebibytes with `precision` decimals, e.g. `0.0010 MB`.
pub fn megabytes(bytes: u64, precision: usize) -> String {
    format!("{:.*} MB", precision, bytes as f64 / BYTES_PER_MEGABYTE)
}

pub fn local_time(time: DateTime<Utc>, timezone: Tz) -> String {
    time.with_timezone(&timezone).format(TIME_FORMAT).to_string()
}

/// Look up and parse the timezone of `username`.
pub async fn user_timezone(
    accounts: &dyn AccountStore,
    username: &str,
) -> Result<Tz, FormatError> {
    let timezone = accounts
        .timezone(username)
        .await?
        .ok_or_else(|| FormatError::UnknownUser(username.to_owned()))?;
    timezone
        .parse()
        .map_err(|_| FormatError::UnknownTimezone {
            username: username.to_owned(),
            timezone,
        })
}

pub fn format_file(file: &FileRecord, timezone: Tz) -> FileInfo {
    FileInfo {
        id: file.id,
        link: format!("/download?id={}", file.id),
        label: file.label.clone(),
        short_label: truncate(&file.label, LABEL_WIDTH),
        description: file.description.clone(),
        short_description: truncate(&file.description, DESCRIPTION_WIDTH),
        size: megabytes(file.size_bytes, 4),
        size_bytes: format!("{} Bytes", file.size_bytes),
        owner: file.owner.clone(),
        category: file.category.clone(),
        uploaded_at: local_time(file.uploaded_at, timezone),
        rating: file.rating,
    }
}

pub fn format_files(files: &[FileRecord], timezone: Tz) -> Vec<FileInfo> {
    files.iter().map(|file| format_file(file, timezone)).collect()
}

pub fn format_download(file: &FileRecord, timezone: Tz) -> DownloadFileInfo {
    DownloadFileInfo {
        id: file.id,
        link: format!("/files/{}", file.id),
        label: file.label.clone(),
        description: file.description.clone(),
        size: megabytes(file.size_bytes, 6),
        size_bytes: format!("{} Bytes", file.size_bytes),
        owner: file.owner.clone(),
        category: file.category.clone(),
        uploaded_at: local_time(file.uploaded_at, timezone),
        rating: file.rating,
    }
}
