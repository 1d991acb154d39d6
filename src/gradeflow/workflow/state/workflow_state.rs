// SPDX-License-Identifier: MIT

//! The record threaded through every node of a grading run

use serde::{Deserialize, Serialize};

use super::review::ReviewDecision;

/// Workflow memory for one run.
///
/// Nodes never edit a published value; each `with_*` builder returns a new
/// state, so every intermediate version stays inspectable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowState {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub student_answer: Option<String>,
    /// Human-readable feedback, automated or human-sourced
    #[serde(default)]
    pub evaluation_result: Option<String>,
    /// 0..=10 when present
    #[serde(default)]
    pub score: Option<u8>,
    /// Present iff the grader flagged low confidence
    #[serde(default)]
    pub anomaly_reason: Option<String>,
    #[serde(default)]
    pub hitl_required: bool,
}

impl WorkflowState {
    /// Fresh state for a run: only the inputs are set
    pub fn new(question: impl Into<String>, student_answer: impl Into<String>) -> Self {
        Self {
            question: Some(question.into()),
            student_answer: Some(student_answer.into()),
            ..Self::default()
        }
    }

    pub fn with_evaluation(
        &self,
        score: u8,
        evaluation_result: impl Into<String>,
        anomaly_reason: Option<String>,
    ) -> Self {
        Self {
            score: Some(score),
            evaluation_result: Some(evaluation_result.into()),
            anomaly_reason,
            ..self.clone()
        }
    }

    pub fn with_hitl_required(&self, hitl_required: bool) -> Self {
        Self {
            hitl_required,
            ..self.clone()
        }
    }

    /// Merge a reviewer decision. Fields the reviewer left out keep their
    /// automated values; the anomaly is always resolved.
    pub fn with_review(&self, decision: &ReviewDecision) -> Self {
        Self {
            evaluation_result: decision
                .evaluation
                .clone()
                .or_else(|| self.evaluation_result.clone()),
            score: decision.score.or(self.score),
            anomaly_reason: None,
            ..self.clone()
        }
    }
}
