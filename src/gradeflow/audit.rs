// SPDX-License-Identifier: MIT

//! Append-only JSON-lines record of finalized runs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::adk::error::GradeflowError;
use crate::gradeflow::workflow::state::WorkflowState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub run_id: String,
    pub finished_at: DateTime<Utc>,
    pub state: WorkflowState,
}

pub struct AuditLog {
    path: PathBuf,
    // Keeps concurrent runs from interleaving partial lines
    write_lock: Mutex<()>,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub async fn record(&self, run_id: &str, state: &WorkflowState) -> Result<(), GradeflowError> {
        let entry = AuditEntry {
            run_id: run_id.to_string(),
            finished_at: Utc::now(),
            state: state.clone(),
        };
        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_entries_are_appended() {
        let dir = std::env::temp_dir().join(format!("gradeflow-audit-{}", uuid::Uuid::new_v4()));
        let log = AuditLog::new(dir.join("audit.jsonl"));

        let state = WorkflowState::new("q", "4").with_evaluation(10, "Correct", None);
        log.record("run-1", &state).await.unwrap();
        log.record("run-2", &state).await.unwrap();

        let text = tokio::fs::read_to_string(dir.join("audit.jsonl")).await.unwrap();
        let entries: Vec<AuditEntry> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].run_id, "run-1");
        assert_eq!(entries[1].state.score, Some(10));

        let _ = tokio::fs::remove_dir_all(dir).await;
    }
}
