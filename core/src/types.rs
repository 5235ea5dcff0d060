//! Domain DTOs for the task service.
//!
//! # Design
//! These types mirror the mock-server's schema but are defined independently;
//! integration tests catch any drift between the two crates. Every value is
//! an immutable snapshot of remote state: the client never mutates a task,
//! it only fetches a fresh copy.
//!
//! `payload` and `output` are opaque `serde_json::Value`s. A
//! [`TaskPayloadSchema`] documents a payload's shape but is never checked
//! against it on the client side.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Lifecycle state of a task, driven entirely by the server.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    /// `Completed` and `Failed` are the only states a task never leaves.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// Outcome as reported by the server.
///
/// The wire shape allows `output` and `error` together or neither; use
/// [`TaskResult::outcome`] for a single answer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TaskResult {
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

/// A task result folded into one of its two meaningful shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success { output: Option<Value> },
    Failure { error: String },
}

impl TaskResult {
    /// `error` takes precedence: a result carrying an error is a failure
    /// even if the server also attached output.
    pub fn outcome(&self) -> Outcome {
        match &self.error {
            Some(error) => Outcome::Failure {
                error: error.clone(),
            },
            None => Outcome::Success {
                output: self.output.clone(),
            },
        }
    }
}

/// A unit of work as observed by the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: Uuid,
    pub task_type: String,
    #[serde(default)]
    pub payload: Value,
    pub status: TaskStatus,
    #[serde(default)]
    pub result: Option<TaskResult>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// `None` while the task has no result yet. A `Failed` task may still
    /// carry output, so check the variant rather than the presence of a result.
    pub fn outcome(&self) -> Option<Outcome> {
        self.result.as_ref().map(TaskResult::outcome)
    }
}

/// Request payload for creating a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    pub task_type: String,
    pub payload: Value,
}

/// Request payload a worker posts to report a task's outcome.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitResultRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SubmitResultRequest {
    pub fn success(output: Value) -> Self {
        Self {
            output: Some(output),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            output: None,
            error: Some(error.into()),
        }
    }
}

/// Status of a task after a result submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmitResultResponse {
    pub status: TaskStatus,
}

/// Type tag of a documented payload field.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Array,
    Number,
    Object,
    Boolean,
}

/// One documented field of a task payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PayloadField {
    pub field_type: FieldType,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
}

/// Documented payload shape for one task type. Informational only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskPayloadSchema {
    pub task_type: String,
    pub description: String,
    #[serde(default)]
    pub fields: BTreeMap<String, PayloadField>,
}

impl TaskPayloadSchema {
    /// Names of the fields marked required, in name order.
    pub fn required_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|(_, field)| field.required)
            .map(|(name, _)| name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_uses_variant_names_on_the_wire() {
        assert_eq!(serde_json::to_value(TaskStatus::Running).unwrap(), json!("Running"));
        let status: TaskStatus = serde_json::from_value(json!("Failed")).unwrap();
        assert_eq!(status, TaskStatus::Failed);
    }

    #[test]
    fn only_completed_and_failed_are_terminal() {
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
    }

    #[test]
    fn pending_task_parses_without_timestamps_or_result() {
        let task: Task = serde_json::from_value(json!({
            "id": "00000000-0000-0000-0000-000000000001",
            "task_type": "echo",
            "payload": {"message": "hi"},
            "status": "Pending",
            "result": null
        }))
        .unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.result.is_none());
        assert!(task.outcome().is_none());
        assert!(task.created_at.is_none());
    }

    #[test]
    fn error_wins_over_output() {
        let result = TaskResult {
            output: Some(json!({"partial": true})),
            error: Some("boom".to_string()),
        };
        assert_eq!(
            result.outcome(),
            Outcome::Failure {
                error: "boom".to_string()
            }
        );
    }

    #[test]
    fn failed_task_surfaces_failure_outcome() {
        let task: Task = serde_json::from_value(json!({
            "id": "00000000-0000-0000-0000-000000000002",
            "task_type": "validate_image",
            "payload": {},
            "status": "Failed",
            "result": {"output": null, "error": "Missing image field"},
            "created_at": "2024-01-01T00:00:00Z",
            "completed_at": "2024-01-01T00:00:01Z"
        }))
        .unwrap();
        assert!(task.is_terminal());
        assert_eq!(
            task.outcome(),
            Some(Outcome::Failure {
                error: "Missing image field".to_string()
            })
        );
        assert!(task.completed_at.is_some());
    }

    #[test]
    fn field_types_are_lowercase() {
        let field: PayloadField = serde_json::from_value(json!({
            "field_type": "boolean",
            "required": false
        }))
        .unwrap();
        assert_eq!(field.field_type, FieldType::Boolean);
        assert!(field.description.is_none());
    }

    #[test]
    fn required_fields_lists_only_required() {
        let schema: TaskPayloadSchema = serde_json::from_value(json!({
            "task_type": "echo",
            "description": "Echo a message",
            "fields": {
                "message": {"field_type": "string", "required": true},
                "repeat": {"field_type": "number", "required": false}
            }
        }))
        .unwrap();
        assert_eq!(schema.required_fields().collect::<Vec<_>>(), vec!["message"]);
    }

    #[test]
    fn submit_result_omits_absent_fields() {
        let body = serde_json::to_value(SubmitResultRequest::failure("nope")).unwrap();
        assert_eq!(body, json!({"error": "nope"}));
    }
}
