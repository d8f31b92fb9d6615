use anyhow::Context;
use sqlx::PgExecutor;
use uuid::Uuid;

use super::repo_types::{MentorTask, Task, TaskFields};

const TASK_COLUMNS: &str =
    "id, mentor_id, mentee_id, title, description, is_done, created_at, due_date";

pub async fn insert(
    db: impl PgExecutor<'_>,
    mentor_id: Uuid,
    mentee_id: Uuid,
    fields: &TaskFields,
) -> anyhow::Result<Task> {
    let task = sqlx::query_as::<_, Task>(&format!(
        r#"
        INSERT INTO tasks (id, mentor_id, mentee_id, title, description, due_date)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {TASK_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(mentor_id)
    .bind(mentee_id)
    .bind(&fields.title)
    .bind(&fields.description)
    .bind(fields.due_date)
    .fetch_one(db)
    .await
    .context("insert task")?;
    Ok(task)
}

pub async fn update(
    db: impl PgExecutor<'_>,
    task_id: Uuid,
    mentor_id: Uuid,
    fields: &TaskFields,
) -> anyhow::Result<Option<Task>> {
    let task = sqlx::query_as::<_, Task>(&format!(
        r#"
        UPDATE tasks
           SET title = $3, description = $4, due_date = $5
         WHERE id = $1 AND mentor_id = $2
        RETURNING {TASK_COLUMNS}
        "#
    ))
    .bind(task_id)
    .bind(mentor_id)
    .bind(&fields.title)
    .bind(&fields.description)
    .bind(fields.due_date)
    .fetch_optional(db)
    .await
    .context("update task")?;
    Ok(task)
}

pub async fn delete(db: impl PgExecutor<'_>, task_id: Uuid, mentor_id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM tasks WHERE id = $1 AND mentor_id = $2")
        .bind(task_id)
        .bind(mentor_id)
        .execute(db)
        .await
        .context("delete task")?;
    Ok(res.rows_affected() > 0)
}

pub async fn toggle(
    db: impl PgExecutor<'_>,
    task_id: Uuid,
    mentor_id: Uuid,
) -> anyhow::Result<Option<Task>> {
    let task = sqlx::query_as::<_, Task>(&format!(
        r#"
        UPDATE tasks SET is_done = NOT is_done
         WHERE id = $1 AND mentor_id = $2
        RETURNING {TASK_COLUMNS}
        "#
    ))
    .bind(task_id)
    .bind(mentor_id)
    .fetch_optional(db)
    .await
    .context("toggle task")?;
    Ok(task)
}

/// One-way pending -> done for the mentee's own task.
pub async fn complete(
    db: impl PgExecutor<'_>,
    task_id: Uuid,
    mentee_id: Uuid,
) -> anyhow::Result<Option<Task>> {
    let task = sqlx::query_as::<_, Task>(&format!(
        r#"
        UPDATE tasks SET is_done = TRUE
         WHERE id = $1 AND mentee_id = $2 AND is_done = FALSE
        RETURNING {TASK_COLUMNS}
        "#
    ))
    .bind(task_id)
    .bind(mentee_id)
    .fetch_optional(db)
    .await
    .context("complete task")?;
    Ok(task)
}

pub async fn list_for_mentor(db: impl PgExecutor<'_>, mentor_id: Uuid) -> anyhow::Result<Vec<MentorTask>> {
    let rows = sqlx::query_as::<_, MentorTask>(
        r#"
        SELECT t.id, t.mentor_id, t.mentee_id, t.title, t.description, t.is_done,
               t.created_at, t.due_date, u.username AS mentee_username
          FROM tasks t
          JOIN users u ON u.id = t.mentee_id
         WHERE t.mentor_id = $1
         ORDER BY t.due_date ASC NULLS LAST, t.created_at DESC
        "#,
    )
    .bind(mentor_id)
    .fetch_all(db)
    .await
    .context("list mentor tasks")?;
    Ok(rows)
}

/// A mentee's tasks by due date, undated last.
pub async fn list_for_mentee(db: impl PgExecutor<'_>, mentee_id: Uuid) -> anyhow::Result<Vec<Task>> {
    let rows = sqlx::query_as::<_, Task>(&format!(
        r#"
        SELECT {TASK_COLUMNS} FROM tasks
         WHERE mentee_id = $1
         ORDER BY due_date ASC NULLS LAST, created_at DESC
        "#
    ))
    .bind(mentee_id)
    .fetch_all(db)
    .await
    .context("list mentee tasks")?;
    Ok(rows)
}

/// Pending first, then due date, then newest.
pub async fn list_for_review(
    db: impl PgExecutor<'_>,
    mentor_id: Uuid,
    mentee_id: Uuid,
) -> anyhow::Result<Vec<Task>> {
    let rows = sqlx::query_as::<_, Task>(&format!(
        r#"
        SELECT {TASK_COLUMNS} FROM tasks
         WHERE mentor_id = $1 AND mentee_id = $2
         ORDER BY is_done ASC, due_date ASC NULLS LAST, created_at DESC
        "#
    ))
    .bind(mentor_id)
    .bind(mentee_id)
    .fetch_all(db)
    .await
    .context("list tasks for review")?;
    Ok(rows)
}
