use anyhow::Context;
use sqlx::PgExecutor;
use uuid::Uuid;

use super::repo_types::MeetingRecording;

const SELECT_RECORDING: &str = r#"
    SELECT r.id, r.mentor_id, r.mentee_id, u.username AS mentee_username,
           r.title, r.video_key, r.uploaded_at
      FROM meeting_recordings r
      LEFT JOIN users u ON u.id = r.mentee_id
"#;

pub async fn insert(
    db: impl PgExecutor<'_>,
    mentor_id: Uuid,
    mentee_id: Uuid,
    title: &str,
    video_key: &str,
) -> anyhow::Result<Uuid> {
    let id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO meeting_recordings (id, mentor_id, mentee_id, title, video_key)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(mentor_id)
    .bind(mentee_id)
    .bind(title)
    .bind(video_key)
    .fetch_one(db)
    .await
    .context("insert recording")?;
    Ok(id)
}

pub async fn find(db: impl PgExecutor<'_>, id: Uuid) -> anyhow::Result<Option<MeetingRecording>> {
    let row = sqlx::query_as::<_, MeetingRecording>(&format!("{SELECT_RECORDING} WHERE r.id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find recording")?;
    Ok(row)
}

/// Grouped by mentee, newest first within each.
pub async fn list_for_mentor(
    db: impl PgExecutor<'_>,
    mentor_id: Uuid,
) -> anyhow::Result<Vec<MeetingRecording>> {
    let rows = sqlx::query_as::<_, MeetingRecording>(&format!(
        "{SELECT_RECORDING} WHERE r.mentor_id = $1
         ORDER BY u.username ASC NULLS LAST, r.mentee_id, r.uploaded_at DESC"
    ))
    .bind(mentor_id)
    .fetch_all(db)
    .await
    .context("list mentor recordings")?;
    Ok(rows)
}

pub async fn list_for_mentee(
    db: impl PgExecutor<'_>,
    mentee_id: Uuid,
) -> anyhow::Result<Vec<MeetingRecording>> {
    let rows = sqlx::query_as::<_, MeetingRecording>(&format!(
        "{SELECT_RECORDING} WHERE r.mentee_id = $1 ORDER BY r.uploaded_at DESC"
    ))
    .bind(mentee_id)
    .fetch_all(db)
    .await
    .context("list mentee recordings")?;
    Ok(rows)
}

/// Recordings a mentor made with one mentee, newest first.
pub async fn list_for_pair(
    db: impl PgExecutor<'_>,
    mentor_id: Uuid,
    mentee_id: Uuid,
) -> anyhow::Result<Vec<MeetingRecording>> {
    let rows = sqlx::query_as::<_, MeetingRecording>(&format!(
        "{SELECT_RECORDING} WHERE r.mentor_id = $1 AND r.mentee_id = $2
         ORDER BY r.uploaded_at DESC"
    ))
    .bind(mentor_id)
    .bind(mentee_id)
    .fetch_all(db)
    .await
    .context("list recordings for mentee")?;
    Ok(rows)
}
