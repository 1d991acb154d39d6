// SPDX-License-Identifier: MIT

//! Durable checkpoints for suspended runs
//!
//! A checkpoint records where a run paused and the state it paused with.
//! Stores only persist records; the one-writer-per-run discipline lives in
//! [`RunLocks`], which the engine takes around every resume and cancel.

mod file;
mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::adk::error::WorkflowError;
use crate::gradeflow::workflow::nodes::NodeId;
use crate::gradeflow::workflow::state::WorkflowState;

pub use file::FileCheckpointStore;
pub use memory::MemoryCheckpointStore;

/// Persisted record of a suspended run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub run_id: String,
    /// Node to re-enter on resume
    pub paused_at_node: NodeId,
    pub state: WorkflowState,
    /// Nodes executed before the pause
    pub step: u32,
    pub created_at: DateTime<Utc>,
}

impl Checkpoint {
    pub fn new(run_id: &str, paused_at_node: NodeId, state: WorkflowState, step: u32) -> Self {
        Self {
            run_id: run_id.to_string(),
            paused_at_node,
            state,
            step,
            created_at: Utc::now(),
        }
    }
}

/// Checkpoint persistence keyed by run id
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Insert or replace the checkpoint for `checkpoint.run_id`
    async fn put(&self, checkpoint: &Checkpoint) -> Result<(), WorkflowError>;

    async fn get(&self, run_id: &str) -> Result<Option<Checkpoint>, WorkflowError>;

    /// Remove a checkpoint; returns whether one existed
    async fn delete(&self, run_id: &str) -> Result<bool, WorkflowError>;

    /// All stored checkpoints, oldest first
    async fn list(&self) -> Result<Vec<Checkpoint>, WorkflowError>;
}

/// Per-run async locks
#[derive(Default)]
pub struct RunLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

/// Held while a run's checkpoint is being read and replaced
pub struct RunGuard {
    _guard: OwnedMutexGuard<()>,
}

impl RunLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `run_id`
    pub async fn acquire(&self, run_id: &str) -> RunGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            // Entries only the map still references have no holder or waiter
            locks.retain(|_, l| Arc::strong_count(l) > 1);
            locks
                .entry(run_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        RunGuard {
            _guard: lock.lock_owned().await,
        }
    }

    /// Number of runs currently locked or awaited
    pub fn active(&self) -> usize {
        let locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.values().filter(|l| Arc::strong_count(l) > 1).count()
    }
}

fn sort_oldest_first(checkpoints: &mut [Checkpoint]) {
    checkpoints.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.run_id.cmp(&b.run_id))
    });
}
