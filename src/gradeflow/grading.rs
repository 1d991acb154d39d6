// SPDX-License-Identifier: MIT

//! Grading capability
//!
//! The workflow only sees the [`Grader`] trait. [`LlmGrader`] is the
//! production adapter: it asks a chat model for a JSON verdict and validates
//! it before anything reaches the workflow state.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::adk::error::WorkflowError;
use crate::adk::model::{Content, GenerationConfig, Model};

/// Highest score a grade may carry
pub const MAX_SCORE: u8 = 10;

const SYSTEM_PROMPT: &str = r#"You are an academic evaluator.

Evaluate the student's answer to the question and reply with JSON only:
- score: integer from 0 to 10
- evaluation_result: short feedback for the student
- anomaly_reason: null when the evaluation is clear, otherwise a short reason

Set anomaly_reason when:
- the answer is irrelevant to the question
- the answer is too short to evaluate
- the answer is nonsense
- the question itself is unclear
- you are not confident in the evaluation

Reply format:
{"score": 0, "evaluation_result": "feedback", "anomaly_reason": null}

Do not write anything outside the JSON object."#;

/// A validated verdict from the grading capability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grade {
    pub score: u8,
    pub evaluation_result: String,
    pub anomaly_reason: Option<String>,
}

/// Wire shape of the model reply, before range checks
#[derive(Debug, Deserialize, JsonSchema)]
struct GradeReply {
    /// Integer score from 0 to 10
    score: i64,
    /// Short feedback for the student
    evaluation_result: String,
    /// Null when the evaluation is clear
    #[serde(default)]
    anomaly_reason: Option<String>,
}

static GRADE_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::to_value(schemars::schema_for!(GradeReply)).unwrap_or(Value::Null)
});

/// Maps a question/answer pair to a grade
#[async_trait]
pub trait Grader: Send + Sync {
    async fn grade(&self, question: &str, answer: &str) -> Result<Grade, WorkflowError>;
}

/// Grader backed by a chat model
pub struct LlmGrader {
    model: Arc<dyn Model>,
    config: GenerationConfig,
}

impl LlmGrader {
    pub fn new(model: Arc<dyn Model>, temperature: Option<f32>) -> Self {
        let response_schema = match &*GRADE_SCHEMA {
            Value::Null => None,
            schema => Some(schema.clone()),
        };
        Self {
            model,
            config: GenerationConfig {
                temperature,
                max_output_tokens: Some(512),
                response_schema,
            },
        }
    }

    fn user_message(question: &str, answer: &str) -> String {
        format!("Question:\n{}\n\nStudent Answer:\n{}", question, answer)
    }
}

#[async_trait]
impl Grader for LlmGrader {
    async fn grade(&self, question: &str, answer: &str) -> Result<Grade, WorkflowError> {
        let history = [
            Content::system(SYSTEM_PROMPT),
            Content::user(Self::user_message(question, answer)),
        ];

        let reply = self
            .model
            .generate_content(&history, Some(&self.config))
            .await
            .map_err(|e| {
                WorkflowError::grading(format!("{} request failed: {}", self.model.provider(), e))
            })?;

        parse_grade(&reply.text())
    }
}

/// Parse and validate a grading reply.
///
/// Accepts a bare JSON object or one inside a Markdown code fence. An empty
/// `anomaly_reason` counts as no anomaly.
pub fn parse_grade(text: &str) -> Result<Grade, WorkflowError> {
    let payload = strip_code_fence(text);
    let reply: GradeReply = serde_json::from_str(payload)
        .map_err(|e| WorkflowError::grading(format!("{} in reply {:?}", e, text)))?;

    let score = u8::try_from(reply.score)
        .ok()
        .filter(|s| *s <= MAX_SCORE)
        .ok_or_else(|| {
            WorkflowError::grading(format!(
                "score {} is outside 0..={}",
                reply.score, MAX_SCORE
            ))
        })?;

    let anomaly_reason = reply
        .anomaly_reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty());

    Ok(Grade {
        score,
        evaluation_result: reply.evaluation_result,
        anomaly_reason,
    })
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line
    let body = rest.split_once('\n').map(|(_, b)| b).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::error::ModelError;
    use crate::adk::model::Part;
    use std::sync::Mutex;

    struct MockModel {
        reply: Result<String, String>,
        seen: Mutex<Vec<Content>>,
    }

    impl MockModel {
        fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                seen: Mutex::new(vec![]),
            }
        }
    }

    #[async_trait]
    impl Model for MockModel {
        fn provider(&self) -> &str {
            "Mock"
        }

        async fn generate_content(
            &self,
            history: &[Content],
            _config: Option<&GenerationConfig>,
        ) -> Result<Content, ModelError> {
            self.seen.lock().unwrap().extend(history.iter().cloned());
            match &self.reply {
                Ok(text) => Ok(Content {
                    role: "model".to_string(),
                    parts: vec![Part::Text(text.clone())],
                }),
                Err(message) => Err(ModelError::api("Mock", message.clone())),
            }
        }
    }

    #[test]
    fn test_parse_grade_clean_json() {
        let grade = parse_grade(
            r#"{"score": 10, "evaluation_result": "Correct.", "anomaly_reason": null}"#,
        )
        .unwrap();
        assert_eq!(grade.score, 10);
        assert_eq!(grade.evaluation_result, "Correct.");
        assert!(grade.anomaly_reason.is_none());
    }

    #[test]
    fn test_parse_grade_fenced_json() {
        let text = concat!(
            "```json\n",
            r#"{"score": 2, "evaluation_result": "?", "anomaly_reason": "nonsense answer"}"#,
            "\n```"
        );
        let grade = parse_grade(text).unwrap();
        assert_eq!(grade.score, 2);
        assert_eq!(grade.anomaly_reason.as_deref(), Some("nonsense answer"));
    }

    #[test]
    fn test_parse_grade_blank_anomaly_is_none() {
        let grade =
            parse_grade(r#"{"score": 6, "evaluation_result": "ok", "anomaly_reason": "  "}"#)
                .unwrap();
        assert!(grade.anomaly_reason.is_none());
    }

    #[test]
    fn test_parse_grade_missing_anomaly_key_is_none() {
        let grade = parse_grade(r#"{"score": 6, "evaluation_result": "ok"}"#).unwrap();
        assert!(grade.anomaly_reason.is_none());
    }

    #[test]
    fn test_parse_grade_rejects_bad_shapes() {
        for text in [
            "not json at all",
            r#"{"evaluation_result": "no score"}"#,
            r#"{"score": "7", "evaluation_result": "string score"}"#,
            r#"{"score": 7}"#,
            r#"{"score": 11, "evaluation_result": "too high"}"#,
            r#"{"score": -1, "evaluation_result": "too low"}"#,
        ] {
            assert!(
                matches!(parse_grade(text), Err(WorkflowError::GradingFormat(_))),
                "expected GradingFormat for {}",
                text
            );
        }
    }

    #[test]
    fn test_grade_schema_lists_reply_fields() {
        let props = &GRADE_SCHEMA["properties"];
        assert!(props.get("score").is_some());
        assert!(props.get("evaluation_result").is_some());
        assert!(props.get("anomaly_reason").is_some());
    }

    #[tokio::test]
    async fn test_llm_grader_sends_question_and_answer() {
        let model = Arc::new(MockModel::replying(
            r#"{"score": 10, "evaluation_result": "Correct", "anomaly_reason": null}"#,
        ));
        let grader = LlmGrader::new(model.clone(), Some(0.0));

        let grade = grader.grade("What is 2+2?", "4").await.unwrap();
        assert_eq!(grade.score, 10);

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen[0].role, "system");
        assert_eq!(seen[1].text(), "Question:\nWhat is 2+2?\n\nStudent Answer:\n4");
    }

    #[tokio::test]
    async fn test_llm_grader_transport_failure_is_grading_error() {
        let model = Arc::new(MockModel {
            reply: Err("503".to_string()),
            seen: Mutex::new(vec![]),
        });
        let grader = LlmGrader::new(model, None);

        let err = grader.grade("q", "a").await.unwrap_err();
        assert!(matches!(err, WorkflowError::GradingFormat(m) if m.contains("Mock")));
    }
}
