use sqlx::PgPool;
use time::{macros::format_description, Date, OffsetDateTime};
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::TaskInput,
    repo,
    repo_types::{Task, TaskFields},
};
use crate::auth::repo_types::User;
use crate::error::{AppError, AppResult};

const TASK_NOT_FOUND: &str = "Task not found.";

fn parse_due_date(raw: Option<&str>, today: Date) -> AppResult<Option<Date>> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    let date = Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .map_err(|_| AppError::validation("Invalid date format for due date."))?;
    if date < today {
        return Err(AppError::validation("Due date cannot be in the past."));
    }
    Ok(Some(date))
}

/// Trims and checks title/description, parses the due date against `today`.
pub fn validate_fields(input: &TaskInput, today: Date) -> AppResult<TaskFields> {
    let title = input.title.as_deref().map(str::trim).unwrap_or_default();
    let description = input.description.as_deref().map(str::trim).unwrap_or_default();
    if title.is_empty() || description.is_empty() {
        return Err(AppError::validation("Title and description are required."));
    }
    Ok(TaskFields {
        title: title.to_string(),
        description: description.to_string(),
        due_date: parse_due_date(input.due_date.as_deref(), today)?,
    })
}

pub async fn create_task(
    db: &PgPool,
    mentor_id: Uuid,
    mentee_id: Uuid,
    input: &TaskInput,
    now: OffsetDateTime,
) -> AppResult<Task> {
    let fields = validate_fields(input, now.date())?;
    if User::find_assigned_mentee(db, mentee_id, mentor_id).await?.is_none() {
        warn!(%mentor_id, %mentee_id, "task for a mentee of another mentor");
        return Err(AppError::not_found(
            "Selected mentee is not associated with your profile.",
        ));
    }
    let task = repo::insert(db, mentor_id, mentee_id, &fields).await?;
    info!(%mentor_id, %mentee_id, task_id = %task.id, "task created");
    Ok(task)
}

pub async fn edit_task(
    db: &PgPool,
    mentor_id: Uuid,
    task_id: Uuid,
    input: &TaskInput,
    now: OffsetDateTime,
) -> AppResult<Task> {
    let fields = validate_fields(input, now.date())?;
    let task = repo::update(db, task_id, mentor_id, &fields)
        .await?
        .ok_or_else(|| AppError::not_found(TASK_NOT_FOUND))?;
    info!(%mentor_id, %task_id, "task updated");
    Ok(task)
}

pub async fn delete_task(db: &PgPool, mentor_id: Uuid, task_id: Uuid) -> AppResult<()> {
    if !repo::delete(db, task_id, mentor_id).await? {
        return Err(AppError::not_found(TASK_NOT_FOUND));
    }
    info!(%mentor_id, %task_id, "task deleted");
    Ok(())
}

pub async fn toggle_task_status(db: &PgPool, mentor_id: Uuid, task_id: Uuid) -> AppResult<Task> {
    let task = repo::toggle(db, task_id, mentor_id)
        .await?
        .ok_or_else(|| AppError::not_found(TASK_NOT_FOUND))?;
    info!(%mentor_id, %task_id, is_done = task.is_done, "task status toggled");
    Ok(task)
}

pub async fn complete_task(db: &PgPool, mentee_id: Uuid, task_id: Uuid) -> AppResult<Task> {
    let task = repo::complete(db, task_id, mentee_id)
        .await?
        .ok_or_else(|| AppError::not_found("Task not found or already completed."))?;
    info!(%mentee_id, %task_id, "task completed");
    Ok(task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn input(title: &str, description: &str, due: Option<&str>) -> TaskInput {
        TaskInput {
            title: Some(title.into()),
            description: Some(description.into()),
            due_date: due.map(str::to_string),
        }
    }

    #[test]
    fn title_and_description_are_required() {
        let today = date!(2030 - 01 - 10);
        assert!(validate_fields(&input("", "read", None), today).is_err());
        assert!(validate_fields(&input("CV", "   ", None), today).is_err());
        assert!(validate_fields(&TaskInput::default(), today).is_err());

        let ok = validate_fields(&input(" CV ", " polish it ", None), today).unwrap();
        assert_eq!(ok.title, "CV");
        assert_eq!(ok.description, "polish it");
        assert_eq!(ok.due_date, None);
    }

    #[test]
    fn due_date_rules() {
        let today = date!(2030 - 01 - 10);
        let same_day = validate_fields(&input("a", "b", Some("2030-01-10")), today).unwrap();
        assert_eq!(same_day.due_date, Some(today));

        let past = validate_fields(&input("a", "b", Some("2030-01-09")), today).unwrap_err();
        assert!(past.to_string().contains("past"));

        let garbled = validate_fields(&input("a", "b", Some("10/01/2030")), today).unwrap_err();
        assert!(garbled.to_string().contains("Invalid date"));

        let blank = validate_fields(&input("a", "b", Some("")), today).unwrap();
        assert_eq!(blank.due_date, None);
    }

    #[test]
    fn task_serializes_plain_dates() {
        let task = Task {
            id: Uuid::nil(),
            mentor_id: Uuid::nil(),
            mentee_id: Uuid::nil(),
            title: "t".into(),
            description: "d".into(),
            is_done: false,
            created_at: time::macros::datetime!(2030-01-01 00:00 UTC),
            due_date: Some(date!(2030 - 02 - 03)),
        };
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["due_date"], "2030-02-03");
        assert_eq!(json["created_at"], "2030-01-01T00:00:00Z");
    }
}
