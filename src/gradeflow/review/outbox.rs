// SPDX-License-Identifier: MIT

//! File-queue review delivery

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;

use super::{ReviewCapability, ReviewOutcome};
use crate::adk::error::WorkflowError;
use crate::gradeflow::workflow::state::SuspendRequest;

/// Writes `<outbox>/<folder_path>/<run_id>.json` for each request; reviewers
/// (or a sync job) pick the files up and answer via `resume`.
pub struct OutboxReview {
    root: PathBuf,
}

impl OutboxReview {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Where a request for `run_id` lands
    pub fn request_path(&self, folder_path: &str, run_id: &str) -> PathBuf {
        self.root.join(folder_path).join(format!("{}.json", run_id))
    }
}

#[async_trait]
impl ReviewCapability for OutboxReview {
    async fn request_review(
        &self,
        request: &SuspendRequest,
    ) -> Result<ReviewOutcome, WorkflowError> {
        let path = self.request_path(&request.folder_path, &request.run_id);
        let body = serde_json::to_vec_pretty(request)
            .map_err(|e| WorkflowError::delivery(e.to_string()))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| WorkflowError::delivery(format!("{}: {}", parent.display(), e)))?;
        }
        fs::write(&path, body)
            .await
            .map_err(|e| WorkflowError::delivery(format!("{}: {}", path.display(), e)))?;

        log::info!(
            "Review request for run {} queued at {}",
            request.run_id,
            path.display()
        );
        Ok(ReviewOutcome::Pending)
    }
}
