// SPDX-License-Identifier: MIT

//! In-process checkpoint store

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{sort_oldest_first, Checkpoint, CheckpointStore};
use crate::adk::error::WorkflowError;

/// Checkpoints kept in memory; lost on restart. Suited to tests and the
/// single-process server.
#[derive(Clone, Default)]
pub struct MemoryCheckpointStore {
    checkpoints: Arc<RwLock<HashMap<String, Checkpoint>>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn put(&self, checkpoint: &Checkpoint) -> Result<(), WorkflowError> {
        let mut checkpoints = self.checkpoints.write().await;
        checkpoints.insert(checkpoint.run_id.clone(), checkpoint.clone());
        Ok(())
    }

    async fn get(&self, run_id: &str) -> Result<Option<Checkpoint>, WorkflowError> {
        let checkpoints = self.checkpoints.read().await;
        Ok(checkpoints.get(run_id).cloned())
    }

    async fn delete(&self, run_id: &str) -> Result<bool, WorkflowError> {
        let mut checkpoints = self.checkpoints.write().await;
        Ok(checkpoints.remove(run_id).is_some())
    }

    async fn list(&self) -> Result<Vec<Checkpoint>, WorkflowError> {
        let checkpoints = self.checkpoints.read().await;
        let mut all: Vec<Checkpoint> = checkpoints.values().cloned().collect();
        sort_oldest_first(&mut all);
        Ok(all)
    }
}
