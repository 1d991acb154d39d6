// SPDX-License-Identifier: MIT

//! Graph workflow executor with suspend/resume

use std::sync::Arc;
use uuid::Uuid;

use super::router::{self, ENTRY};
use crate::adk::error::WorkflowError;
use crate::gradeflow::audit::AuditLog;
use crate::gradeflow::grading::Grader;
use crate::gradeflow::review::ReviewCapability;
use crate::gradeflow::workflow::checkpoint::{Checkpoint, CheckpointStore, RunLocks};
use crate::gradeflow::workflow::nodes::{
    CheckAnomalyNode, EvaluateNode, FinalizeNode, HumanReviewNode, NodeId, NodeOutcome,
    RunContext, WorkflowNode,
};
use crate::gradeflow::workflow::state::{
    ResumeData, ReviewDecision, ReviewTemplate, WorkflowState,
};

/// Upper bound on node executions per `start`/`resume` call
const MAX_STEPS: u32 = 16;

/// Outcome of `start` or `resume`
#[derive(Debug, Clone, PartialEq)]
pub enum RunResult {
    /// Paused for human review; resume with this run id
    Suspended(String),
    Completed(WorkflowState),
}

/// Runs the grading graph and owns the suspend/resume protocol
pub struct GradingWorkflow {
    evaluate: WorkflowNode,
    check_anomaly: WorkflowNode,
    human_review: WorkflowNode,
    finalize: WorkflowNode,
    reviewer: Arc<dyn ReviewCapability>,
    store: Arc<dyn CheckpointStore>,
    locks: RunLocks,
}

impl GradingWorkflow {
    /// Wire the capabilities into a workflow with the default review template
    /// and no audit log
    pub fn new(
        grader: Arc<dyn Grader>,
        reviewer: Arc<dyn ReviewCapability>,
        store: Arc<dyn CheckpointStore>,
    ) -> Self {
        Self {
            evaluate: WorkflowNode::Evaluate(EvaluateNode::new(grader)),
            check_anomaly: WorkflowNode::CheckAnomaly(CheckAnomalyNode),
            human_review: WorkflowNode::HumanReview(HumanReviewNode::new(
                reviewer.clone(),
                ReviewTemplate::default(),
            )),
            finalize: WorkflowNode::Finalize(FinalizeNode::new(None)),
            reviewer,
            store,
            locks: RunLocks::new(),
        }
    }

    pub fn with_review_template(mut self, template: ReviewTemplate) -> Self {
        self.human_review =
            WorkflowNode::HumanReview(HumanReviewNode::new(self.reviewer.clone(), template));
        self
    }

    pub fn with_audit_log(mut self, audit: Arc<AuditLog>) -> Self {
        self.finalize = WorkflowNode::Finalize(FinalizeNode::new(Some(audit)));
        self
    }

    fn node(&self, id: NodeId) -> &WorkflowNode {
        match id {
            NodeId::Evaluate => &self.evaluate,
            NodeId::CheckAnomaly => &self.check_anomaly,
            NodeId::HumanReview => &self.human_review,
            NodeId::Finalize => &self.finalize,
        }
    }

    /// Start a fresh run
    pub async fn start(
        &self,
        question: &str,
        student_answer: &str,
    ) -> Result<RunResult, WorkflowError> {
        let run_id = Uuid::new_v4().to_string();
        log::info!("Starting run {}", run_id);

        // Held until the checkpoint exists, so an early resume waits for it
        let _guard = self.locks.acquire(&run_id).await;
        let state = WorkflowState::new(question, student_answer);
        self.run_from(&run_id, ENTRY, state, None, 0)
            .await
            .inspect_err(|e| log::error!("Run {} failed: {}", run_id, e))
    }

    /// Continue a suspended run with the reviewer's data.
    ///
    /// The checkpoint is consumed as soon as the paused node has merged the
    /// decision, before any later node runs. A failure up to that point
    /// leaves it in place so the call can be retried.
    pub async fn resume(
        &self,
        run_id: &str,
        data: ResumeData,
    ) -> Result<RunResult, WorkflowError> {
        let _guard = self.locks.acquire(run_id).await;

        let checkpoint = self
            .store
            .get(run_id)
            .await?
            .ok_or_else(|| WorkflowError::CheckpointNotFound(run_id.to_string()))?;
        let decision = data.decision()?;

        log::info!(
            "Resuming run {} at node {}",
            run_id,
            checkpoint.paused_at_node
        );

        self.run_from(
            run_id,
            checkpoint.paused_at_node,
            checkpoint.state,
            Some(&decision),
            checkpoint.step,
        )
        .await
        .inspect_err(|e| log::error!("Resume of run {} failed: {}", run_id, e))
    }

    /// Discard a suspended run
    pub async fn cancel(&self, run_id: &str) -> Result<Checkpoint, WorkflowError> {
        let _guard = self.locks.acquire(run_id).await;

        let checkpoint = self
            .store
            .get(run_id)
            .await?
            .ok_or_else(|| WorkflowError::CheckpointNotFound(run_id.to_string()))?;
        self.store.delete(run_id).await?;

        log::info!("Cancelled run {}", run_id);
        Ok(checkpoint)
    }

    /// Last persisted checkpoint of a suspended run
    pub async fn inspect(&self, run_id: &str) -> Result<Checkpoint, WorkflowError> {
        self.store
            .get(run_id)
            .await?
            .ok_or_else(|| WorkflowError::CheckpointNotFound(run_id.to_string()))
    }

    /// All suspended runs, oldest first
    pub async fn pending(&self) -> Result<Vec<Checkpoint>, WorkflowError> {
        self.store.list().await
    }

    /// Number of runs currently being started, resumed or cancelled
    pub fn active_runs(&self) -> usize {
        self.locks.active()
    }

    async fn run_from(
        &self,
        run_id: &str,
        entry: NodeId,
        mut state: WorkflowState,
        mut resume: Option<&ReviewDecision>,
        mut step: u32,
    ) -> Result<RunResult, WorkflowError> {
        let mut current = Some(entry);
        let mut executed = 0;
        let mut holds_checkpoint = resume.is_some();

        while let Some(id) = current {
            executed += 1;
            if executed > MAX_STEPS {
                return Err(WorkflowError::StepLimit { limit: MAX_STEPS });
            }

            log::info!("Run {} executing node: {}", run_id, id);
            // Resume data belongs to the re-entered node only
            let ctx = RunContext {
                run_id,
                resume: resume.take(),
            };

            match self.node(id).execute(&state, &ctx).await? {
                NodeOutcome::Continue(next) => {
                    if holds_checkpoint {
                        // Decision merged: retire the checkpoint before Finalize sees it
                        self.store.delete(run_id).await?;
                        holds_checkpoint = false;
                    }
                    log::debug!("Run {} state after {}: {:?}", run_id, id, next);
                    state = next;
                    step += 1;
                    current = router::next_node(id, &state);
                }
                NodeOutcome::Suspend(request) => {
                    let checkpoint = Checkpoint::new(run_id, id, state, step);
                    self.store.put(&checkpoint).await?;
                    log::info!(
                        "Run {} suspended at {} ({})",
                        run_id,
                        id,
                        request.title
                    );
                    return Ok(RunResult::Suspended(run_id.to_string()));
                }
            }
        }

        Ok(RunResult::Completed(state))
    }
}
