// SPDX-License-Identifier: MIT

//! Review request and reviewer reply payloads

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::workflow_state::WorkflowState;
use crate::adk::error::WorkflowError;

/// Reviewer key carrying corrected feedback
pub const FACULTY_EVALUATION: &str = "FacultyEvaluation";
/// Reviewer key carrying a corrected score
pub const FACULTY_SCORE: &str = "FacultyScore";

/// Delivery metadata stamped on every review request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewTemplate {
    #[serde(default = "default_app_name")]
    pub app_name: String,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_folder_path")]
    pub folder_path: String,
}

fn default_app_name() -> String {
    "AssignmentEvaluationApp".to_string()
}

fn default_title() -> String {
    "Faculty Review Required: Assignment Evaluation".to_string()
}

fn default_folder_path() -> String {
    "Shared".to_string()
}

impl Default for ReviewTemplate {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            title: default_title(),
            folder_path: default_folder_path(),
        }
    }
}

/// What a reviewer sees for one suspended run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuspendRequest {
    pub run_id: String,
    pub app_name: String,
    pub title: String,
    pub folder_path: String,
    pub data: ReviewTaskData,
}

/// Task body in the layout the reviewers' app expects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReviewTaskData {
    pub question: String,
    pub student_answer: String,
    pub agent_evaluation: String,
    pub agent_score: u8,
    pub anomaly_reason: String,
}

impl SuspendRequest {
    pub fn build(run_id: &str, state: &WorkflowState, template: &ReviewTemplate) -> Self {
        Self {
            run_id: run_id.to_string(),
            app_name: template.app_name.clone(),
            title: template.title.clone(),
            folder_path: template.folder_path.clone(),
            data: ReviewTaskData {
                question: state.question.clone().unwrap_or_default(),
                student_answer: state.student_answer.clone().unwrap_or_default(),
                agent_evaluation: state.evaluation_result.clone().unwrap_or_default(),
                agent_score: state.score.unwrap_or(0),
                anomaly_reason: state.anomaly_reason.clone().unwrap_or_default(),
            },
        }
    }
}

/// Named fields returned by a reviewer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResumeData(Map<String, Value>);

/// Validated reviewer corrections; `None` means "keep the automated value"
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewDecision {
    pub evaluation: Option<String>,
    pub score: Option<u8>,
}

impl ResumeData {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Accept any JSON value; only objects are valid resume payloads
    pub fn from_value(value: Value) -> Result<Self, WorkflowError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(WorkflowError::invalid_resume(format!(
                "expected a JSON object, got {}",
                other
            ))),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Check the recognized keys and extract the reviewer's corrections.
    /// A key set to `null` counts as absent; unknown keys are ignored.
    pub fn decision(&self) -> Result<ReviewDecision, WorkflowError> {
        let evaluation = match self.0.get(FACULTY_EVALUATION) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => {
                return Err(WorkflowError::invalid_resume(format!(
                    "{} must be a string, got {}",
                    FACULTY_EVALUATION, other
                )))
            }
        };

        let score = match self.0.get(FACULTY_SCORE) {
            None | Some(Value::Null) => None,
            Some(value) => match value.as_u64() {
                Some(n) if n <= 10 => Some(n as u8),
                _ => {
                    return Err(WorkflowError::invalid_resume(format!(
                        "{} must be an integer between 0 and 10, got {}",
                        FACULTY_SCORE, value
                    )))
                }
            },
        };

        Ok(ReviewDecision { evaluation, score })
    }
}
