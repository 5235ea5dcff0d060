use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    sync::Arc,
};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskResult {
    pub output: Option<Value>,
    pub error: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub task_type: String,
    pub payload: Value,
    pub status: TaskStatus,
    pub result: Option<TaskResult>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    fn new(task_type: String, payload: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_type,
            payload,
            status: TaskStatus::Pending,
            result: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    fn mark_running(&mut self) {
        self.status = TaskStatus::Running;
        self.started_at = Some(Utc::now());
    }

    fn finish(&mut self, result: SubmitResult) {
        self.status = if result.error.is_some() {
            TaskStatus::Failed
        } else {
            TaskStatus::Completed
        };
        self.result = Some(TaskResult {
            output: result.output,
            error: result.error,
        });
        self.completed_at = Some(Utc::now());
    }
}

#[derive(Deserialize)]
pub struct CreateTask {
    pub task_type: String,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Deserialize)]
pub struct SubmitResult {
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PayloadField {
    pub field_type: String,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskPayloadSchema {
    pub task_type: String,
    pub description: String,
    #[serde(default)]
    pub fields: BTreeMap<String, PayloadField>,
}

/// In-memory broker state. `schemas` keeps registration order, which is the
/// order `/task/types` reports.
#[derive(Default)]
pub struct Broker {
    tasks: HashMap<Uuid, Task>,
    queue: VecDeque<Uuid>,
    schemas: Vec<TaskPayloadSchema>,
}

impl Broker {
    pub fn seeded() -> Self {
        let mut broker = Self::default();
        for schema in builtin_schemas() {
            broker.register(schema);
        }
        broker
    }

    fn register(&mut self, schema: TaskPayloadSchema) {
        match self.schemas.iter_mut().find(|s| s.task_type == schema.task_type) {
            Some(existing) => *existing = schema,
            None => self.schemas.push(schema),
        }
    }
}

fn field(field_type: &str, required: bool, description: &str, example: Value) -> PayloadField {
    PayloadField {
        field_type: field_type.to_string(),
        required,
        description: Some(description.to_string()),
        example: Some(example),
    }
}

fn builtin_schemas() -> Vec<TaskPayloadSchema> {
    vec![
        TaskPayloadSchema {
            task_type: "echo".to_string(),
            description: "Returns the payload unchanged under `echoed`".to_string(),
            fields: BTreeMap::from([(
                "message".to_string(),
                field("string", true, "Text to echo back", json!("hello")),
            )]),
        },
        TaskPayloadSchema {
            task_type: "validate_image".to_string(),
            description: "Checks that a base64 image decodes and is at least 100x100".to_string(),
            fields: BTreeMap::from([(
                "image".to_string(),
                field("string", true, "Base64-encoded image bytes", json!("iVBORw0KGgo...")),
            )]),
        },
    ]
}

pub type Db = Arc<RwLock<Broker>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Broker::seeded()));
    Router::new()
        .route("/task", post(create_task))
        .route("/task/next", get(next_task))
        .route("/task/types", get(list_task_types))
        .route("/task/set_schema", post(set_payload_schema))
        .route("/task/types/{task_type}/schema", get(get_payload_schema))
        .route("/task/{id}", get(get_task))
        .route("/task/{id}/result", post(submit_result))
        // Older deployments served schemas here.
        .route("/task/{id}/schema", get(get_payload_schema))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn create_task(
    State(db): State<Db>,
    Json(input): Json<CreateTask>,
) -> (StatusCode, Json<Task>) {
    let task = Task::new(input.task_type, input.payload);
    let mut broker = db.write().await;
    broker.tasks.insert(task.id, task.clone());
    broker.queue.push_back(task.id);
    tracing::info!(task_id = %task.id, task_type = %task.task_type, "task created");
    (StatusCode::CREATED, Json(task))
}

async fn get_task(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
) -> Result<Json<Task>, StatusCode> {
    let broker = db.read().await;
    broker.tasks.get(&id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

/// Hand the oldest pending task to a worker and mark it running.
async fn next_task(State(db): State<Db>) -> Result<Json<Task>, StatusCode> {
    let mut broker = db.write().await;
    while let Some(id) = broker.queue.pop_front() {
        if let Some(task) = broker.tasks.get_mut(&id) {
            if task.status == TaskStatus::Pending {
                task.mark_running();
                tracing::info!(task_id = %id, "task dispatched");
                return Ok(Json(task.clone()));
            }
        }
    }
    Err(StatusCode::NO_CONTENT)
}

async fn submit_result(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    Json(input): Json<SubmitResult>,
) -> Result<Json<Value>, StatusCode> {
    let mut broker = db.write().await;
    let task = broker.tasks.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    task.finish(input);
    let status = task.status;
    broker.queue.retain(|queued| *queued != id);
    tracing::info!(task_id = %id, ?status, "result submitted");
    Ok(Json(json!({ "status": status })))
}

async fn list_task_types(State(db): State<Db>) -> Json<Vec<String>> {
    let broker = db.read().await;
    Json(broker.schemas.iter().map(|s| s.task_type.clone()).collect())
}

async fn get_payload_schema(
    State(db): State<Db>,
    Path(task_type): Path<String>,
) -> Result<Json<TaskPayloadSchema>, (StatusCode, String)> {
    let broker = db.read().await;
    broker
        .schemas
        .iter()
        .find(|s| s.task_type == task_type)
        .cloned()
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("unknown task type: {task_type}")))
}

async fn set_payload_schema(
    State(db): State<Db>,
    Json(schema): Json<TaskPayloadSchema>,
) -> (StatusCode, Json<TaskPayloadSchema>) {
    db.write().await.register(schema.clone());
    (StatusCode::CREATED, Json(schema))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_task_is_pending_without_result() {
        let task = Task::new("echo".to_string(), json!({"message": "hi"}));
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.result.is_none());
        assert!(task.started_at.is_none());
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn finishing_with_error_marks_failed() {
        let mut task = Task::new("echo".to_string(), Value::Null);
        task.mark_running();
        task.finish(SubmitResult {
            output: None,
            error: Some("boom".to_string()),
        });
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.result.unwrap().error.as_deref(), Some("boom"));
    }

    #[test]
    fn finishing_without_error_marks_completed() {
        let mut task = Task::new("echo".to_string(), Value::Null);
        task.finish(SubmitResult {
            output: Some(json!({"echoed": null})),
            error: None,
        });
        assert_eq!(task.status, TaskStatus::Completed);
        assert!(task.completed_at.is_some());
    }

    #[test]
    fn task_serializes_status_by_name() {
        let task = Task::new("echo".to_string(), Value::Null);
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["status"], "Pending");
        assert_eq!(json["result"], Value::Null);
    }

    #[test]
    fn create_task_defaults_payload_to_null() {
        let input: CreateTask = serde_json::from_str(r#"{"task_type":"echo"}"#).unwrap();
        assert_eq!(input.payload, Value::Null);
    }

    #[test]
    fn create_task_rejects_missing_type() {
        let result: Result<CreateTask, _> = serde_json::from_str(r#"{"payload":{}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn registering_twice_replaces_in_place() {
        let mut broker = Broker::seeded();
        let mut schema = builtin_schemas().remove(0);
        schema.description = "changed".to_string();
        broker.register(schema);
        assert_eq!(broker.schemas.len(), 2);
        assert_eq!(broker.schemas[0].description, "changed");
    }
}
