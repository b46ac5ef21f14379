//! Object storage for uploaded images.

use std::{
    path::{Component, Path, PathBuf},
    sync::atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use bytes::Bytes;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use ts_rs::TS;
use uuid::Uuid;

pub const PRACTICE_BUCKET: &str = "practices";
pub const BANNER_BUCKET: &str = "banners";
pub const POST_BUCKET: &str = "posts";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid object key: {0}")]
    InvalidKey(String),
    #[error("invalid upload payload: {0}")]
    InvalidPayload(String),
    #[error("storage backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(&self, key: &str, bytes: Bytes, content_type: &str)
    -> Result<(), StorageError>;

    /// Removing a key that does not exist succeeds.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;

    fn public_url(&self, key: &str) -> String;
}

/// An image attached to an admin form, sent as base64 in the JSON body.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ImageUpload {
    pub file_name: String,
    /// Base64 payload, optionally as a `data:` URL.
    pub data: String,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            file_name: file_name.into(),
            data: STANDARD.encode(bytes),
        }
    }

    pub fn decode(&self) -> Result<Bytes, StorageError> {
        let payload = match self.data.split_once(";base64,") {
            Some((prefix, rest)) if prefix.starts_with("data:") => rest,
            _ => self.data.as_str(),
        };
        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| StorageError::InvalidPayload(e.to_string()))?;
        if bytes.is_empty() {
            return Err(StorageError::InvalidPayload(format!(
                "{} is empty",
                self.file_name
            )));
        }
        Ok(Bytes::from(bytes))
    }

    pub fn content_type(&self) -> String {
        content_type_for(&self.file_name)
    }
}

/// `{bucket}/{uuid}.{ext}`, with the extension taken from `file_name`.
pub fn object_key(bucket: &str, file_name: &str) -> String {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "bin".to_string());
    format!("{bucket}/{}.{ext}", Uuid::new_v4())
}

pub fn content_type_for(file_name: &str) -> String {
    mime_guess::from_path(file_name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Rejects keys that could escape the storage root.
fn check_key(key: &str) -> Result<(), StorageError> {
    let path = Path::new(key);
    let relative_only = path
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    if key.is_empty() || key.contains('\\') || !relative_only {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Files under `root`, served by the HTTP layer at `base_url`.
#[derive(Debug, Clone)]
pub struct LocalObjectStorage {
    root: PathBuf,
    base_url: String,
}

impl LocalObjectStorage {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        check_key(key)?;
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl ObjectStorage for LocalObjectStorage {
    async fn upload(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &bytes).await?;
        info!(key, content_type, size = bytes.len(), "Stored object");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!(key, "Removed object");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(key, "Object already absent");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{key}", self.base_url)
    }
}

/// In-process store with switchable failures, for exercising compensations.
#[derive(Debug, Default)]
pub struct MemoryObjectStorage {
    objects: DashMap<String, (Bytes, String)>,
    fail_uploads: AtomicBool,
    fail_removes: AtomicBool,
}

impl MemoryObjectStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_removes(&self, fail: bool) {
        self.fail_removes.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn content_type_of(&self, key: &str) -> Option<String> {
        self.objects.get(key).map(|e| e.value().1.clone())
    }
}

#[async_trait]
impl ObjectStorage for MemoryObjectStorage {
    async fn upload(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError> {
        check_key(key)?;
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(StorageError::Backend(format!("upload of {key} refused")));
        }
        self.objects
            .insert(key.to_string(), (bytes, content_type.to_string()));
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        if self.fail_removes.load(Ordering::SeqCst) {
            return Err(StorageError::Backend(format!("remove of {key} refused")));
        }
        self.objects.remove(key);
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("memory://{key}")
    }
}
