// src/state/store.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::errors::StoreError;
use crate::fs::FileSystem;

use super::model::StateFile;

/// The JSON state file on disk.
///
/// Written once per apply; the filesystem's `write` replaces the file
/// atomically so a crash leaves either the old or the new snapshot.
#[derive(Debug, Clone)]
pub struct StateStore {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
}

impl StateStore {
    pub fn new(fs: Arc<dyn FileSystem>, path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted state. A missing file is an empty store.
    pub fn load(&self) -> Result<StateFile, StoreError> {
        if !self.fs.exists(&self.path) {
            debug!(path = ?self.path, "no state file, starting empty");
            return Ok(StateFile::default());
        }

        let contents = self.fs.read_to_string(&self.path).map_err(|cause| StoreError::Read {
            path: self.path.clone(),
            cause,
        })?;

        let state: StateFile = serde_json::from_str(&contents).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })?;

        debug!(path = ?self.path, workflows = state.workflows.len(), "loaded state");
        Ok(state)
    }

    /// Replace the persisted state with `state`, pretty-printed.
    pub fn save(&self, state: &StateFile) -> Result<(), StoreError> {
        let mut json = serde_json::to_string_pretty(state).map_err(StoreError::Serialize)?;
        json.push('\n');

        self.fs
            .write(&self.path, json.as_bytes())
            .map_err(|cause| StoreError::Write {
                path: self.path.clone(),
                cause,
            })?;

        info!(path = ?self.path, workflows = state.workflows.len(), "saved state");
        Ok(())
    }
}
