//! JSON file persistence for the seen set.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};

use super::SeenSet;

/// Errors that can occur reading or writing the seen-set file.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The file could not be read or written.
    #[error("seen-set file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file exists but is not a JSON array of strings.
    #[error("seen-set file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The set could not be serialized.
    #[error("failed to serialize seen set: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Flat-file store holding the seen set as a JSON array of ids.
///
/// Single writer, no locking. Writes are not atomic: a crash mid-write can
/// leave a truncated file, which `load` treats as empty.
#[derive(Debug, Clone)]
pub struct SeenStore {
    path: PathBuf,
}

impl SeenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored set, reporting why it could not be read.
    ///
    /// A missing file is not an error and yields an empty set.
    pub async fn try_load(&self) -> Result<SeenSet, StoreError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No seen-set file yet");
                return Ok(SeenSet::new());
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let ids: Vec<String> =
            serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
                path: self.path.clone(),
                source,
            })?;

        Ok(ids.into_iter().collect())
    }

    /// Read the stored set; unreadable or malformed content yields an empty set.
    pub async fn load(&self) -> SeenSet {
        match self.try_load().await {
            Ok(set) => set,
            Err(e) => {
                warn!("{}; starting with an empty seen set", e);
                SeenSet::new()
            }
        }
    }

    /// Overwrite the file with the current set.
    pub async fn save(&self, set: &SeenSet) -> Result<(), StoreError> {
        let ids: Vec<&str> = set.iter().collect();
        let json = serde_json::to_vec(&ids)?;
        fs::write(&self.path, json)
            .await
            .map_err(|source| StoreError::Io {
                path: self.path.clone(),
                source,
            })
    }
}
