use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::models::StoredFile;

/// Query parameters of `POST /files`.
#[derive(Debug, Serialize, Deserialize, IntoParams)]
pub struct UploadQueryDto {
    /// Original file name. Used for the download name and to guess the content type.
    pub filename: String,
}

/// Metadata of a stored file.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FileDto {
    pub id: uuid::Uuid,
    pub filename: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub created_at: chrono::DateTime<Utc>,
}

impl From<StoredFile> for FileDto {
    fn from(f: StoredFile) -> Self {
        Self {
            id: f.id,
            filename: f.filename,
            content_type: f.content_type,
            size_bytes: f.size_bytes,
            created_at: f.created_at,
        }
    }
}
