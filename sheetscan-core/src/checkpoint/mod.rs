mod state;

pub use state::CheckpointState;

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{Result, ScanError};
use state::PersistedCheckpoint;

/// Get the checkpoint file path for a crawl
///
/// `key` identifies the crawl, usually the root id (qualified by the source
/// when ids are only unique within it). The file name is a CRC32 of the key,
/// stable across builds and platforms, so each root gets its own state.
pub fn checkpoint_path_for(key: &str, state_dir: &Path) -> PathBuf {
    let hash = crc32fast::hash(key.as_bytes());
    state_dir.join(format!("{:08x}.json", hash))
}

/// JSON-file backed checkpoint persistence
///
/// File format:
/// `{"processed_folders": [id...], "processed_files": [id...], "found_excel_count": n}`
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted state, distinguishing "no checkpoint" from failures
    pub fn try_load(&self) -> Result<Option<CheckpointState>> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let persisted: PersistedCheckpoint = serde_json::from_slice(&data).map_err(|e| {
            ScanError::Checkpoint(format!("{} is corrupted: {}", self.path.display(), e))
        })?;

        Ok(Some(persisted.into()))
    }

    /// Load the persisted state, falling back to an empty one.
    ///
    /// An unreadable checkpoint is reported and replaced by a fresh state;
    /// the file itself is left in place until the next save overwrites it.
    pub fn load(&self) -> CheckpointState {
        match self.try_load() {
            Ok(Some(state)) => {
                debug!(
                    path = %self.path.display(),
                    folders = state.folder_count(),
                    files = state.file_count(),
                    "Loaded checkpoint"
                );
                state
            }
            Ok(None) => CheckpointState::new(),
            Err(e) => {
                warn!(error = %e, "Checkpoint unusable, starting fresh");
                CheckpointState::new()
            }
        }
    }

    /// Persist the complete state, replacing any previous checkpoint
    pub fn save(&self, state: &CheckpointState) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let data = serde_json::to_vec(&PersistedCheckpoint::from(state))
            .map_err(|e| ScanError::Checkpoint(format!("Failed to serialize checkpoint: {}", e)))?;

        // Write atomically by writing to temp file then renaming
        let temp_path = self.path.with_extension("tmp");
        let mut file = File::create(&temp_path)?;
        file.write_all(&data)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, &self.path)?;

        Ok(())
    }
}
