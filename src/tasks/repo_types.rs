use serde::Serialize;
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

time::serde::format_description!(date_format, Date, "[year]-[month]-[day]");

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Task {
    pub id: Uuid,
    pub mentor_id: Uuid,
    pub mentee_id: Uuid,
    pub title: String,
    pub description: String,
    pub is_done: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "date_format::option")]
    pub due_date: Option<Date>,
}

/// Task row joined with the mentee's username, for mentor listings.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MentorTask {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub task: Task,
    pub mentee_username: String,
}

#[derive(Debug)]
pub struct TaskFields {
    pub title: String,
    pub description: String,
    pub due_date: Option<Date>,
}
