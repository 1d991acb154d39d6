// SPDX-License-Identifier: MIT

//! Node executors for the grading graph
//!
//! Every node takes the current state and returns either the next state or a
//! request to suspend. The set of nodes is closed: [`WorkflowNode`] dispatches
//! on its variant.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::adk::error::WorkflowError;
use crate::gradeflow::audit::AuditLog;
use crate::gradeflow::grading::Grader;
use crate::gradeflow::review::{ReviewCapability, ReviewOutcome};
use crate::gradeflow::workflow::state::{
    ReviewDecision, ReviewTemplate, SuspendRequest, WorkflowState,
};

/// Identifier of a node in the graph; also the checkpoint's pause position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeId {
    Evaluate,
    CheckAnomaly,
    HumanReview,
    Finalize,
}

impl NodeId {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeId::Evaluate => "evaluate",
            NodeId::CheckAnomaly => "check_anomaly",
            NodeId::HumanReview => "human_review",
            NodeId::Finalize => "finalize",
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a node sees besides the state
#[derive(Debug, Clone, Copy)]
pub struct RunContext<'a> {
    pub run_id: &'a str,
    /// Reviewer corrections, only set when re-entering a paused node
    pub resume: Option<&'a ReviewDecision>,
}

/// Result of executing one node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeOutcome {
    Continue(WorkflowState),
    /// Stop the graph here until `resume` supplies data
    Suspend(SuspendRequest),
}

/// Calls the grading capability
pub struct EvaluateNode {
    grader: Arc<dyn Grader>,
}

impl EvaluateNode {
    pub fn new(grader: Arc<dyn Grader>) -> Self {
        Self { grader }
    }

    async fn execute(&self, state: &WorkflowState) -> Result<WorkflowState, WorkflowError> {
        let question = state.question.as_deref().unwrap_or_default();
        let answer = state.student_answer.as_deref().unwrap_or_default();

        let grade = self.grader.grade(question, answer).await?;
        log::info!(
            "Graded answer: score={}, anomaly={:?}",
            grade.score,
            grade.anomaly_reason
        );

        Ok(state.with_evaluation(grade.score, grade.evaluation_result, grade.anomaly_reason))
    }
}

/// Derives `hitl_required` from the anomaly flag
pub struct CheckAnomalyNode;

impl CheckAnomalyNode {
    fn execute(&self, state: &WorkflowState) -> WorkflowState {
        state.with_hitl_required(state.anomaly_reason.is_some())
    }
}

/// Where a run stands with respect to human review
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewPhase {
    /// No request delivered yet
    NotStarted,
    /// A reviewer decision is at hand and still has to be merged
    AwaitingHuman(ReviewDecision),
    Resolved(WorkflowState),
}

impl ReviewPhase {
    /// Entry phase: a resumed run re-enters with its reviewer decision
    pub fn initial(ctx: &RunContext<'_>) -> Self {
        match ctx.resume {
            Some(decision) => ReviewPhase::AwaitingHuman(decision.clone()),
            None => ReviewPhase::NotStarted,
        }
    }
}

/// Escalates to a human reviewer and merges their decision
pub struct HumanReviewNode {
    reviewer: Arc<dyn ReviewCapability>,
    template: ReviewTemplate,
}

impl HumanReviewNode {
    pub fn new(reviewer: Arc<dyn ReviewCapability>, template: ReviewTemplate) -> Self {
        Self { reviewer, template }
    }

    async fn execute(
        &self,
        state: &WorkflowState,
        ctx: &RunContext<'_>,
    ) -> Result<NodeOutcome, WorkflowError> {
        let mut phase = ReviewPhase::initial(ctx);
        loop {
            log::debug!("Run {} human review phase: {:?}", ctx.run_id, phase);
            phase = match phase {
                ReviewPhase::NotStarted => {
                    let request = SuspendRequest::build(ctx.run_id, state, &self.template);
                    match self.reviewer.request_review(&request).await {
                        Ok(ReviewOutcome::Pending) => {
                            log::info!("Run {} awaiting human review", ctx.run_id);
                            return Ok(NodeOutcome::Suspend(request));
                        }
                        Ok(ReviewOutcome::Immediate(data)) => {
                            log::info!("Run {} received an immediate review decision", ctx.run_id);
                            // No checkpoint exists yet, so this is not a retryable resume
                            let decision = data.decision().map_err(|e| {
                                WorkflowError::delivery(format!(
                                    "reviewer returned an unusable decision: {}",
                                    e
                                ))
                            })?;
                            ReviewPhase::AwaitingHuman(decision)
                        }
                        Err(e @ WorkflowError::ReviewDelivery(_)) => return Err(e),
                        Err(other) => return Err(WorkflowError::delivery(other.to_string())),
                    }
                }
                ReviewPhase::AwaitingHuman(decision) => {
                    ReviewPhase::Resolved(state.with_review(&decision))
                }
                ReviewPhase::Resolved(merged) => return Ok(NodeOutcome::Continue(merged)),
            };
        }
    }
}

/// Records the final result
pub struct FinalizeNode {
    audit: Option<Arc<AuditLog>>,
}

impl FinalizeNode {
    pub fn new(audit: Option<Arc<AuditLog>>) -> Self {
        Self { audit }
    }

    async fn execute(&self, state: &WorkflowState, ctx: &RunContext<'_>) -> WorkflowState {
        log::info!(
            "Final evaluation for run {}: score={:?}, feedback={:?}",
            ctx.run_id,
            state.score,
            state.evaluation_result
        );

        if let Some(audit) = &self.audit {
            if let Err(e) = audit.record(ctx.run_id, state).await {
                log::warn!("Failed to write audit entry for run {}: {}", ctx.run_id, e);
            }
        }

        state.clone()
    }
}

/// The closed set of nodes in the grading graph
pub enum WorkflowNode {
    Evaluate(EvaluateNode),
    CheckAnomaly(CheckAnomalyNode),
    HumanReview(HumanReviewNode),
    Finalize(FinalizeNode),
}

impl WorkflowNode {
    pub fn id(&self) -> NodeId {
        match self {
            WorkflowNode::Evaluate(_) => NodeId::Evaluate,
            WorkflowNode::CheckAnomaly(_) => NodeId::CheckAnomaly,
            WorkflowNode::HumanReview(_) => NodeId::HumanReview,
            WorkflowNode::Finalize(_) => NodeId::Finalize,
        }
    }

    pub async fn execute(
        &self,
        state: &WorkflowState,
        ctx: &RunContext<'_>,
    ) -> Result<NodeOutcome, WorkflowError> {
        match self {
            WorkflowNode::Evaluate(node) => node.execute(state).await.map(NodeOutcome::Continue),
            WorkflowNode::CheckAnomaly(node) => Ok(NodeOutcome::Continue(node.execute(state))),
            WorkflowNode::HumanReview(node) => node.execute(state, ctx).await,
            WorkflowNode::Finalize(node) => {
                Ok(NodeOutcome::Continue(node.execute(state, ctx).await))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gradeflow::grading::Grade;
    use crate::gradeflow::workflow::state::{ResumeData, FACULTY_SCORE};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FixedGrader(Grade);

    #[async_trait]
    impl Grader for FixedGrader {
        async fn grade(&self, _question: &str, _answer: &str) -> Result<Grade, WorkflowError> {
            Ok(self.0.clone())
        }
    }

    struct ScriptedReview {
        outcome: Result<ReviewOutcome, String>,
        requests: Mutex<Vec<SuspendRequest>>,
    }

    impl ScriptedReview {
        fn new(outcome: Result<ReviewOutcome, String>) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                requests: Mutex::new(vec![]),
            })
        }
    }

    #[async_trait]
    impl ReviewCapability for ScriptedReview {
        async fn request_review(
            &self,
            request: &SuspendRequest,
        ) -> Result<ReviewOutcome, WorkflowError> {
            self.requests.lock().unwrap().push(request.clone());
            self.outcome.clone().map_err(WorkflowError::delivery)
        }
    }

    fn ctx(run_id: &str) -> RunContext<'_> {
        RunContext {
            run_id,
            resume: None,
        }
    }

    fn flagged_state() -> WorkflowState {
        WorkflowState::new("What is 2+2?", "asdf")
            .with_evaluation(2, "Not an answer", Some("nonsense answer".into()))
            .with_hitl_required(true)
    }

    #[test]
    fn test_node_id_names() {
        assert_eq!(NodeId::CheckAnomaly.to_string(), "check_anomaly");
        assert_eq!(
            serde_json::to_value(NodeId::HumanReview).unwrap(),
            serde_json::json!("human_review")
        );
    }

    #[tokio::test]
    async fn test_evaluate_sets_grade_fields() {
        let node = WorkflowNode::Evaluate(EvaluateNode::new(Arc::new(FixedGrader(Grade {
            score: 10,
            evaluation_result: "Correct".into(),
            anomaly_reason: None,
        }))));

        let input = WorkflowState::new("What is 2+2?", "4");
        let outcome = node.execute(&input, &ctx("r")).await.unwrap();

        assert_eq!(
            outcome,
            NodeOutcome::Continue(input.with_evaluation(10, "Correct", None))
        );
    }

    #[tokio::test]
    async fn test_evaluate_is_repeatable() {
        let node = EvaluateNode::new(Arc::new(FixedGrader(Grade {
            score: 3,
            evaluation_result: "Weak".into(),
            anomaly_reason: Some("short".into()),
        })));
        let input = WorkflowState::new("q", "a");

        let once = node.execute(&input).await.unwrap();
        let twice = node.execute(&once).await.unwrap();
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn test_check_anomaly_tracks_reason() {
        let node = WorkflowNode::CheckAnomaly(CheckAnomalyNode);

        let clean = WorkflowState::new("q", "a").with_evaluation(9, "good", None);
        match node.execute(&clean, &ctx("r")).await.unwrap() {
            NodeOutcome::Continue(s) => assert!(!s.hitl_required),
            NodeOutcome::Suspend(_) => panic!("CheckAnomaly never suspends"),
        }

        let odd = clean.with_evaluation(1, "?", Some("irrelevant".into()));
        match node.execute(&odd, &ctx("r")).await.unwrap() {
            NodeOutcome::Continue(s) => assert!(s.hitl_required),
            NodeOutcome::Suspend(_) => panic!("CheckAnomaly never suspends"),
        }
    }

    #[tokio::test]
    async fn test_human_review_pending_suspends_with_request() {
        let review = ScriptedReview::new(Ok(ReviewOutcome::Pending));
        let node = WorkflowNode::HumanReview(HumanReviewNode::new(
            review.clone(),
            ReviewTemplate::default(),
        ));

        let outcome = node.execute(&flagged_state(), &ctx("run-7")).await.unwrap();
        match outcome {
            NodeOutcome::Suspend(request) => {
                assert_eq!(request.run_id, "run-7");
                assert_eq!(request.data.anomaly_reason, "nonsense answer");
                assert_eq!(request.data.agent_score, 2);
            }
            NodeOutcome::Continue(_) => panic!("Expected suspension"),
        }
        assert_eq!(review.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_human_review_immediate_decision_merges() {
        let review = ScriptedReview::new(Ok(ReviewOutcome::Immediate(
            ResumeData::new().with(FACULTY_SCORE, 4),
        )));
        let node = HumanReviewNode::new(review, ReviewTemplate::default());

        let outcome = node.execute(&flagged_state(), &ctx("run-7")).await.unwrap();
        match outcome {
            NodeOutcome::Continue(s) => {
                assert_eq!(s.score, Some(4));
                assert_eq!(s.evaluation_result.as_deref(), Some("Not an answer"));
                assert!(s.anomaly_reason.is_none());
            }
            NodeOutcome::Suspend(_) => panic!("Expected immediate resolution"),
        }
    }

    #[test]
    fn test_review_phase_starts_from_context() {
        assert_eq!(ReviewPhase::initial(&ctx("r")), ReviewPhase::NotStarted);

        let decision = ReviewDecision {
            evaluation: None,
            score: Some(6),
        };
        let resumed = RunContext {
            run_id: "r",
            resume: Some(&decision),
        };
        assert_eq!(
            ReviewPhase::initial(&resumed),
            ReviewPhase::AwaitingHuman(decision.clone())
        );
    }

    #[tokio::test]
    async fn test_human_review_unusable_immediate_decision_is_delivery_error() {
        let review = ScriptedReview::new(Ok(ReviewOutcome::Immediate(
            ResumeData::new().with(FACULTY_SCORE, 42),
        )));
        let node = HumanReviewNode::new(review, ReviewTemplate::default());

        let err = node
            .execute(&flagged_state(), &ctx("run-7"))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::ReviewDelivery(m) if m.contains("FacultyScore")));
    }

    #[tokio::test]
    async fn test_human_review_resume_skips_delivery() {
        let review = ScriptedReview::new(Ok(ReviewOutcome::Pending));
        let node = HumanReviewNode::new(review.clone(), ReviewTemplate::default());
        let decision = ReviewDecision {
            evaluation: Some("partial credit".into()),
            score: Some(5),
        };

        let outcome = node
            .execute(
                &flagged_state(),
                &RunContext {
                    run_id: "run-7",
                    resume: Some(&decision),
                },
            )
            .await
            .unwrap();

        match outcome {
            NodeOutcome::Continue(s) => {
                assert_eq!(s.score, Some(5));
                assert_eq!(s.evaluation_result.as_deref(), Some("partial credit"));
                assert!(s.anomaly_reason.is_none());
            }
            NodeOutcome::Suspend(_) => panic!("Resume must not suspend again"),
        }
        assert!(review.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_human_review_delivery_failure() {
        let review = ScriptedReview::new(Err("queue offline".into()));
        let node = HumanReviewNode::new(review, ReviewTemplate::default());

        let err = node.execute(&flagged_state(), &ctx("run-7")).await.unwrap_err();
        assert!(matches!(err, WorkflowError::ReviewDelivery(m) if m.contains("queue offline")));
    }

    #[tokio::test]
    async fn test_finalize_returns_state_even_if_audit_fails() {
        // A directory path cannot be opened for appending
        let audit = Arc::new(AuditLog::new(std::env::temp_dir()));
        let node = WorkflowNode::Finalize(FinalizeNode::new(Some(audit)));
        let state = WorkflowState::new("q", "4").with_evaluation(10, "Correct", None);

        let outcome = node.execute(&state, &ctx("run-1")).await.unwrap();
        assert_eq!(outcome, NodeOutcome::Continue(state));
    }
}
