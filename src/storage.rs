//! Object storage for uploaded files.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::AppError;

/// Key of a file's object: `<owner_id>/<file_id>`.
pub fn object_key(owner_id: Uuid, file_id: Uuid) -> String {
    format!("{}/{}", owner_id, file_id)
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, data: &[u8]) -> Result<(), AppError>;

    /// `Ok(None)` when no object exists under `key`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AppError>;

    /// Deleting a missing object is not an error.
    async fn delete(&self, key: &str) -> Result<(), AppError>;

    /// Fails when the store cannot currently accept objects.
    async fn check(&self) -> Result<(), AppError>;
}

/// Objects as plain files below a root directory.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve `key` below the root. Only plain relative segments are accepted.
    fn path_for(&self, key: &str) -> Result<PathBuf, AppError> {
        let rel = Path::new(key);
        let valid = !key.is_empty()
            && !key.contains('\\')
            && rel
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !valid {
            return Err(AppError::Storage(format!("Invalid object key: {:?}", key)));
        }
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, key: &str, data: &[u8]) -> Result<(), AppError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Storage(format!("Creating {}: {}", parent.display(), e)))?;
        }

        // Write next to the target, then rename, so readers never see a partial object.
        let tmp = path.with_extension("part");
        let mut file = tokio::fs::File::create(&tmp)
            .await
            .map_err(|e| AppError::Storage(format!("Creating {}: {}", tmp.display(), e)))?;
        file.write_all(data)
            .await
            .map_err(|e| AppError::Storage(format!("Writing {}: {}", tmp.display(), e)))?;
        file.sync_all()
            .await
            .map_err(|e| AppError::Storage(format!("Syncing {}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| AppError::Storage(format!("Renaming {}: {}", tmp.display(), e)))?;
        log::debug!("Stored object {} ({} bytes)", key, data.len());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AppError> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Storage(format!("Reading {}: {}", path.display(), e))),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Storage(format!("Deleting {}: {}", path.display(), e))),
        }
    }

    async fn check(&self) -> Result<(), AppError> {
        let meta = tokio::fs::metadata(&self.root)
            .await
            .map_err(|e| AppError::Storage(format!("{}: {}", self.root.display(), e)))?;
        if !meta.is_dir() {
            return Err(AppError::Storage(format!(
                "{} is not a directory",
                self.root.display()
            )));
        }
        if meta.permissions().readonly() {
            return Err(AppError::Storage(format!("{} is read-only", self.root.display())));
        }
        Ok(())
    }
}
