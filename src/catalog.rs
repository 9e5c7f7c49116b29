use crate::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

/// Number of rows shown by every listing page.
pub const LISTING_LIMIT: u32 = 15;

/// The fixed set of file categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Other,
    Games,
    Documents,
    Projects,
    Music,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Other,
        Category::Games,
        Category::Documents,
        Category::Projects,
        Category::Music,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Other => "other",
            Category::Games => "games",
            Category::Documents => "documents",
            Category::Projects => "projects",
            Category::Music => "music",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The string is not one of the known categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown category")]
pub struct UnknownCategory;

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or(UnknownCategory)
    }
}

/// A file as stored in the `files` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub id: u64,
    pub label: String,
    pub size_bytes: u64,
    pub description: String,
    pub owner: String,
    pub category: String,
    pub uploaded_at: DateTime<Utc>,
    pub rating: i64,
}

/// A file about to be recorded. It starts with rating zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFile {
    pub label: String,
    pub size_bytes: u64,
    pub description: String,
    pub owner: String,
    pub category: Category,
    pub uploaded_at: DateTime<Utc>,
}

/// Which files a listing page shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing {
    /// Files with a positive rating, best first.
    Popular,
    /// Newest files first.
    Recent,
    /// Newest files of one category first.
    Category(Category),
}

/// Access to the `files` table.
#[async_trait]
pub trait FileCatalog: Send + Sync {
    /// Record a file and return its id.
    async fn insert_file(&self, file: &NewFile) -> Result<u64, StoreError>;

    /// Remove the record of a file. Removing a missing record succeeds.
    async fn delete_file(&self, id: u64) -> Result<(), StoreError>;

    async fn file(&self, id: u64) -> Result<Option<FileRecord>, StoreError>;

    /// At most `limit` files of the given listing.
    async fn list_files(&self, listing: Listing, limit: u32)
        -> Result<Vec<FileRecord>, StoreError>;
}

#[async_trait]
impl<T: FileCatalog + ?Sized> FileCatalog for Arc<T> {
    async fn insert_file(&self, file: &NewFile) -> Result<u64, StoreError> {
        (**self).insert_file(file).await
    }

    async fn delete_file(&self, id: u64) -> Result<(), StoreError> {
        (**self).delete_file(id).await
    }

    async fn file(&self, id: u64) -> Result<Option<FileRecord>, StoreError> {
        (**self).file(id).await
    }

    async fn list_files(
        &self,
        listing: Listing,
        limit: u32,
    ) -> Result<Vec<FileRecord>, StoreError> {
        (**self).list_files(listing, limit).await
    }
}
