//! Filesystem-backed blob store.
//!
//! Objects live under `{root}/{bucket}/{path}` and are served by the
//! HTTP layer at `{public_base_url}/{bucket}/{path}`. Writes go to a
//! temporary sibling first and are renamed into place, so a reader
//! never observes a half-written image.

use std::path::{Component, Path, PathBuf};

use mipropina_core::error::MiPropinaResult;
use mipropina_core::gateway::BlobStore;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbError;

/// Storage settings shared by the blob store and the upload mediator.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory that holds every bucket.
    pub root: PathBuf,
    /// URL prefix under which `root` is served.
    pub public_base_url: String,
    /// Bucket for brand assets (logos and employee photos).
    pub bucket: String,
    /// Leading path segment inside the bucket.
    pub prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./data/assets"),
            public_base_url: "http://localhost:3000/assets".into(),
            bucket: "brand-assets".into(),
            prefix: "mipropina".into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.root.clone(), config.public_base_url.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `bucket/path` below the root, refusing anything that could
    /// escape it.
    fn resolve(&self, bucket: &str, path: &str) -> Result<PathBuf, DbError> {
        let relative = Path::new(bucket).join(path);
        let mut resolved = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                _ => return Err(DbError::InvalidPath(format!("{bucket}/{path}"))),
            }
        }
        if resolved == self.root {
            return Err(DbError::InvalidPath(format!("{bucket}/{path}")));
        }
        Ok(resolved)
    }

    async fn write_atomic(target: &Path, bytes: &[u8]) -> Result<(), DbError> {
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let file_name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let tmp_path = target.with_file_name(format!(".{file_name}.{}.tmp", Uuid::new_v4()));

        if let Err(e) = tokio::fs::write(&tmp_path, bytes).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        if let Err(e) = tokio::fs::rename(&tmp_path, target).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        Ok(())
    }
}

impl BlobStore for FsBlobStore {
    async fn put_object(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> MiPropinaResult<()> {
        let target = self.resolve(bucket, path)?;
        Self::write_atomic(&target, &bytes).await?;

        debug!(
            bucket,
            path,
            content_type,
            size = bytes.len(),
            "object stored"
        );
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.public_base_url,
            bucket,
            path.trim_start_matches('/')
        )
    }
}
