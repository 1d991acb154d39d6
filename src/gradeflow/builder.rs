// SPDX-License-Identifier: MIT

//! Builds a ready-to-run workflow from configuration
//!
//! Capabilities are constructed once here and injected into the engine;
//! nothing downstream reaches for global clients.

use std::sync::Arc;

use crate::adk::error::GradeflowError;
use crate::adk::model::{create_model, resolve_provider, Model};
use crate::gradeflow::audit::AuditLog;
use crate::gradeflow::config::{CheckpointBackend, GradeflowConfig, ReviewMode};
use crate::gradeflow::grading::{Grader, LlmGrader};
use crate::gradeflow::review::{OutboxReview, ReviewCapability, WebhookReview};
use crate::gradeflow::workflow::checkpoint::{
    CheckpointStore, FileCheckpointStore, MemoryCheckpointStore,
};
use crate::gradeflow::workflow::graph::GradingWorkflow;

pub struct Builder {
    config: GradeflowConfig,
}

impl Builder {
    pub fn new(config: GradeflowConfig) -> Self {
        Self { config }
    }

    /// Grader backed by the configured chat model
    pub fn build_grader(&self) -> Result<Arc<dyn Grader>, GradeflowError> {
        let grader = &self.config.grader;
        let provider = resolve_provider(grader.provider.as_deref(), &grader.model);
        let model: Arc<dyn Model> = create_model(&provider, &grader.model)?;
        Ok(Arc::new(LlmGrader::new(model, grader.temperature)))
    }

    pub fn build_reviewer(&self) -> Result<Arc<dyn ReviewCapability>, GradeflowError> {
        let review = &self.config.review;
        match review.mode {
            ReviewMode::Outbox => {
                log::info!("Review requests go to outbox {}", review.outbox_dir.display());
                Ok(Arc::new(OutboxReview::new(review.outbox_dir.clone())))
            }
            ReviewMode::Webhook => {
                let url = review.webhook_url.as_deref().ok_or_else(|| {
                    GradeflowError::config("review.webhook_url is required for webhook mode")
                })?;
                Ok(Arc::new(WebhookReview::new(url)?))
            }
        }
    }

    pub async fn build_store(&self) -> Result<Arc<dyn CheckpointStore>, GradeflowError> {
        let checkpoints = &self.config.checkpoints;
        match checkpoints.backend {
            CheckpointBackend::Memory => {
                log::warn!("Using in-memory checkpoints; suspended runs are lost on restart");
                Ok(Arc::new(MemoryCheckpointStore::new()))
            }
            CheckpointBackend::File => {
                log::info!("Checkpoints stored in {}", checkpoints.dir.display());
                Ok(Arc::new(FileCheckpointStore::open(checkpoints.dir.clone()).await?))
            }
        }
    }

    /// Assemble the workflow around an explicit grader. Used directly by
    /// callers that bring their own grading capability.
    pub async fn build_with_grader(
        &self,
        grader: Arc<dyn Grader>,
    ) -> Result<GradingWorkflow, GradeflowError> {
        let reviewer = self.build_reviewer()?;
        let store = self.build_store().await?;
        let workflow = GradingWorkflow::new(grader, reviewer, store)
            .with_review_template(self.config.review.template.clone());

        Ok(match &self.config.audit.path {
            Some(path) => workflow.with_audit_log(Arc::new(AuditLog::new(path.clone()))),
            None => workflow,
        })
    }

    pub async fn build(&self) -> Result<GradingWorkflow, GradeflowError> {
        self.build_with_grader(self.build_grader()?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::error::WorkflowError;
    use crate::gradeflow::config::ConfigLoader;
    use crate::gradeflow::grading::Grade;
    use crate::gradeflow::workflow::graph::RunResult;
    use async_trait::async_trait;

    struct PerfectGrader;

    #[async_trait]
    impl Grader for PerfectGrader {
        async fn grade(&self, _question: &str, _answer: &str) -> Result<Grade, WorkflowError> {
            Ok(Grade {
                score: 10,
                evaluation_result: "Correct".into(),
                anomaly_reason: None,
            })
        }
    }

    #[test]
    fn test_unknown_provider_fails() {
        let config =
            ConfigLoader::parse_yaml("grader:\n  provider: palm\n  model: bison\n").unwrap();
        let err = Builder::new(config).build_grader().err().unwrap();
        assert!(matches!(err, GradeflowError::Model(_)));
    }

    #[tokio::test]
    async fn test_memory_backend_with_custom_grader() {
        let dir = std::env::temp_dir().join(format!("gradeflow-builder-{}", uuid::Uuid::new_v4()));
        let yaml = format!(
            "checkpoints:\n  backend: memory\naudit:\n  path: {}\n",
            dir.join("audit.jsonl").display()
        );
        let config = ConfigLoader::parse_yaml(&yaml).unwrap();

        let workflow = Builder::new(config)
            .build_with_grader(Arc::new(PerfectGrader))
            .await
            .unwrap();
        let result = workflow.start("What is 2+2?", "4").await.unwrap();
        assert!(matches!(result, RunResult::Completed(s) if s.score == Some(10)));
        assert!(dir.join("audit.jsonl").exists());

        let _ = tokio::fs::remove_dir_all(dir).await;
    }
}
