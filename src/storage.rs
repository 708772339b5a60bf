//! Object storage backends for uploaded files and store snapshots.
//!
//! - `LocalStorage` writes under a directory served by `actix-files`
//! - `RemoteStorage` talks to a bucket-style REST object API

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{StorageConfig, StorageDriver};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("invalid object path: {0}")]
    InvalidPath(String),
    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("storage responded with status {status}: {body}")]
    Status { status: u16, body: String },
}

#[async_trait]
pub trait ObjectStorage {
    async fn upload_file(&self, path: &str, data: &[u8], content_type: Option<&str>) -> Result<(), StorageError>;

    async fn download_file(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    async fn delete_file(&self, path: &str) -> Result<(), StorageError>;

    fn get_asset_url(&self, path: &str) -> String;
}

/// Rejects absolute paths and parent-directory segments.
pub fn validate_object_path(path: &str) -> Result<(), StorageError> {
    let candidate = Path::new(path);
    let clean = !path.is_empty()
        && candidate
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if clean {
        Ok(())
    } else {
        Err(StorageError::InvalidPath(path.to_string()))
    }
}

pub struct LocalStorage {
    base_dir: PathBuf,
    public_url: String,
}

impl LocalStorage {
    pub fn new(base_dir: impl Into<PathBuf>, public_url: impl Into<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        validate_object_path(path)?;
        Ok(self.base_dir.join(path))
    }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    async fn upload_file(&self, path: &str, data: &[u8], _content_type: Option<&str>) -> Result<(), StorageError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, data).await?;
        log::debug!("Stored {} ({} bytes)", target.display(), data.len());
        Ok(())
    }

    async fn download_file(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let target = self.resolve(path)?;
        match tokio::fs::read(&target).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound(path.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_file(&self, path: &str) -> Result<(), StorageError> {
        let target = self.resolve(path)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound(path.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    fn get_asset_url(&self, path: &str) -> String {
        format!("{}/{}", self.public_url, path)
    }
}

pub struct RemoteStorage {
    base_url: String,
    bucket: String,
    api_key: String,
    client: reqwest::Client,
}

impl RemoteStorage {
    pub fn new(base_url: &str, bucket: &str, api_key: &str, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
            api_key: api_key.to_string(),
            client,
        }
    }

    fn object_url(&self, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, path)
    }

    async fn check(response: reqwest::Response, path: &str) -> Result<reqwest::Response, StorageError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(path.to_string()));
        }
        let body = response.text().await.unwrap_or_default();
        Err(StorageError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl ObjectStorage for RemoteStorage {
    async fn upload_file(&self, path: &str, data: &[u8], content_type: Option<&str>) -> Result<(), StorageError> {
        validate_object_path(path)?;
        let content_type = content_type
            .map(str::to_string)
            .unwrap_or_else(|| mime_guess::from_path(path).first_or_octet_stream().to_string());

        let response = self
            .client
            .post(self.object_url(path))
            .bearer_auth(&self.api_key)
            .header("Content-Type", content_type)
            .header("x-upsert", "true")
            .body(data.to_vec())
            .send()
            .await?;
        Self::check(response, path).await?;
        Ok(())
    }

    async fn download_file(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        validate_object_path(path)?;
        let response = self
            .client
            .get(self.object_url(path))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let response = Self::check(response, path).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn delete_file(&self, path: &str) -> Result<(), StorageError> {
        validate_object_path(path)?;
        let response = self
            .client
            .delete(self.object_url(path))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        Self::check(response, path).await?;
        Ok(())
    }

    fn get_asset_url(&self, path: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", self.base_url, self.bucket, path)
    }
}

pub fn build_storage(config: &StorageConfig, client: reqwest::Client) -> Arc<dyn ObjectStorage + Send + Sync> {
    match &config.driver {
        StorageDriver::Local { dir } => Arc::new(LocalStorage::new(dir.clone(), config.public_url.clone())),
        StorageDriver::Remote { url, bucket, key } => Arc::new(RemoteStorage::new(url, bucket, key, client)),
    }
}
