// SPDX-License-Identifier: MIT

//! JSON-file checkpoint store, one file per run

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::{sort_oldest_first, Checkpoint, CheckpointStore};
use crate::adk::error::WorkflowError;

/// Stores `<dir>/<run_id>.json`. Writes go to a temp file first and are
/// renamed into place, so readers never see a half-written checkpoint.
pub struct FileCheckpointStore {
    dir: PathBuf,
}

impl FileCheckpointStore {
    /// Open (and create if needed) a checkpoint directory
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, WorkflowError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| storage_error(&dir, e))?;
        Ok(Self { dir })
    }

    /// Run ids become file names, so only a safe alphabet is accepted
    fn is_valid_run_id(run_id: &str) -> bool {
        !run_id.is_empty()
            && run_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }

    fn path_for(&self, run_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", run_id))
    }

    async fn read_checkpoint(path: &Path) -> Result<Option<Checkpoint>, WorkflowError> {
        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(storage_error(path, e)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| WorkflowError::checkpoint(format!("{}: {}", path.display(), e)))
    }
}

fn storage_error(path: &Path, e: std::io::Error) -> WorkflowError {
    WorkflowError::checkpoint(format!("{}: {}", path.display(), e))
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn put(&self, checkpoint: &Checkpoint) -> Result<(), WorkflowError> {
        if !Self::is_valid_run_id(&checkpoint.run_id) {
            return Err(WorkflowError::checkpoint(format!(
                "run id '{}' is not usable as a file name",
                checkpoint.run_id
            )));
        }

        let path = self.path_for(&checkpoint.run_id);
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(checkpoint)
            .map_err(|e| WorkflowError::checkpoint(e.to_string()))?;

        fs::write(&tmp, body)
            .await
            .map_err(|e| storage_error(&tmp, e))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| storage_error(&path, e))?;

        log::debug!("Checkpoint written: {}", path.display());
        Ok(())
    }

    async fn get(&self, run_id: &str) -> Result<Option<Checkpoint>, WorkflowError> {
        if !Self::is_valid_run_id(run_id) {
            return Ok(None);
        }
        Self::read_checkpoint(&self.path_for(run_id)).await
    }

    async fn delete(&self, run_id: &str) -> Result<bool, WorkflowError> {
        if !Self::is_valid_run_id(run_id) {
            return Ok(false);
        }
        let path = self.path_for(run_id);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(storage_error(&path, e)),
        }
    }

    async fn list(&self) -> Result<Vec<Checkpoint>, WorkflowError> {
        let mut entries = fs::read_dir(&self.dir)
            .await
            .map_err(|e| storage_error(&self.dir, e))?;

        let mut all = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| storage_error(&self.dir, e))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match Self::read_checkpoint(&path).await {
                Ok(Some(checkpoint)) => all.push(checkpoint),
                Ok(None) => {}
                Err(e) => log::warn!("Skipping unreadable checkpoint: {}", e),
            }
        }

        sort_oldest_first(&mut all);
        Ok(all)
    }
}
