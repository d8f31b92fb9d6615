use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub mentee_id: Uuid,
    #[serde(flatten)]
    pub fields: TaskInput,
}

/// Raw task fields; validated by the service.
#[derive(Debug, Default, Deserialize)]
pub struct TaskInput {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
}
