//! File-backed stores
//!
//! Every write replaces the whole target file: the payload goes to a uniquely
//! named sibling temp file which is then renamed over the target. Each store
//! serializes its own read-modify-write cycles behind one async mutex, so
//! there is a single writer per document within the process.

pub mod contacts;
pub mod keys;
pub mod locations;

pub use contacts::ContactStore;
pub use keys::{AssetName, StorageKey};
pub use locations::LocationStore;

use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure (permissions, disk full, ...)
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A record with this identifier already exists
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Identifier rejected by the storage-key whitelist
    #[error("Invalid key: {0:?}")]
    InvalidKey(String),

    /// Record fails presence checks
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

impl StoreError {
    pub(crate) fn io(path: &Path) -> impl FnOnce(io::Error) -> StoreError + '_ {
        move |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Pretty-print `value` and atomically replace `path` with it
pub(crate) async fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let payload = serde_json::to_vec_pretty(value)?;
    write_bytes_atomic(path, &payload).await
}

/// Atomically replace `path` with `bytes` (temp file + rename)
pub(crate) async fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(StoreError::io(parent))?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = path.with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()));

    tokio::fs::write(&temp_path, bytes)
        .await
        .map_err(StoreError::io(&temp_path))?;

    if let Err(e) = tokio::fs::rename(&temp_path, path).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(StoreError::Io {
            path: path.to_path_buf(),
            source: e,
        });
    }

    Ok(())
}

/// Remove a file, treating "already gone" as success
pub(crate) async fn remove_if_exists(path: &Path) -> Result<bool, StoreError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StoreError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}
