use anyhow::Context;
use sqlx::PgExecutor;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::Slot;

const SLOT_COLUMNS: &str = "id, mentor_id, mentee_id, start_time, end_time, is_booked, created_at";

pub async fn insert(
    db: impl PgExecutor<'_>,
    mentor_id: Uuid,
    start: OffsetDateTime,
    end: OffsetDateTime,
) -> anyhow::Result<Slot> {
    let slot = sqlx::query_as::<_, Slot>(&format!(
        r#"
        INSERT INTO mentor_availability (id, mentor_id, start_time, end_time)
        VALUES ($1, $2, $3, $4)
        RETURNING {SLOT_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(mentor_id)
    .bind(start)
    .bind(end)
    .fetch_one(db)
    .await
    .context("insert slot")?;
    Ok(slot)
}

/// Any slot of the mentor intersecting `[start, end)`, optionally ignoring one slot.
pub async fn has_conflict(
    db: impl PgExecutor<'_>,
    mentor_id: Uuid,
    start: OffsetDateTime,
    end: OffsetDateTime,
    exclude: Option<Uuid>,
) -> anyhow::Result<bool> {
    let conflict: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM mentor_availability
             WHERE mentor_id = $1
               AND start_time < $3
               AND end_time > $2
               AND ($4::uuid IS NULL OR id <> $4)
        )
        "#,
    )
    .bind(mentor_id)
    .bind(start)
    .bind(end)
    .bind(exclude)
    .fetch_one(db)
    .await
    .context("check slot conflict")?;
    Ok(conflict)
}

pub async fn find_owned(
    db: impl PgExecutor<'_>,
    slot_id: Uuid,
    mentor_id: Uuid,
) -> anyhow::Result<Option<Slot>> {
    let slot = sqlx::query_as::<_, Slot>(&format!(
        "SELECT {SLOT_COLUMNS} FROM mentor_availability WHERE id = $1 AND mentor_id = $2"
    ))
    .bind(slot_id)
    .bind(mentor_id)
    .fetch_optional(db)
    .await
    .context("find slot")?;
    Ok(slot)
}

/// Moves an unbooked slot; `None` when the slot is gone or got booked.
pub async fn update_window(
    db: impl PgExecutor<'_>,
    slot_id: Uuid,
    mentor_id: Uuid,
    start: OffsetDateTime,
    end: OffsetDateTime,
) -> anyhow::Result<Option<Slot>> {
    let slot = sqlx::query_as::<_, Slot>(&format!(
        r#"
        UPDATE mentor_availability
           SET start_time = $3, end_time = $4
         WHERE id = $1 AND mentor_id = $2 AND is_booked = FALSE
        RETURNING {SLOT_COLUMNS}
        "#
    ))
    .bind(slot_id)
    .bind(mentor_id)
    .bind(start)
    .bind(end)
    .fetch_optional(db)
    .await
    .context("update slot window")?;
    Ok(slot)
}

pub async fn delete_unbooked(
    db: impl PgExecutor<'_>,
    slot_id: Uuid,
    mentor_id: Uuid,
) -> anyhow::Result<bool> {
    let res = sqlx::query(
        "DELETE FROM mentor_availability WHERE id = $1 AND mentor_id = $2 AND is_booked = FALSE",
    )
    .bind(slot_id)
    .bind(mentor_id)
    .execute(db)
    .await
    .context("delete slot")?;
    Ok(res.rows_affected() > 0)
}

/// Compare-and-set booking: only an unbooked, future slot of `mentor_id` flips.
pub async fn book(
    db: impl PgExecutor<'_>,
    slot_id: Uuid,
    mentor_id: Uuid,
    mentee_id: Uuid,
    now: OffsetDateTime,
) -> anyhow::Result<Option<Slot>> {
    let slot = sqlx::query_as::<_, Slot>(&format!(
        r#"
        UPDATE mentor_availability
           SET is_booked = TRUE, mentee_id = $3
         WHERE id = $1
           AND mentor_id = $2
           AND is_booked = FALSE
           AND start_time > $4
        RETURNING {SLOT_COLUMNS}
        "#
    ))
    .bind(slot_id)
    .bind(mentor_id)
    .bind(mentee_id)
    .bind(now)
    .fetch_optional(db)
    .await
    .context("book slot")?;
    Ok(slot)
}

/// Releases the mentee's own future booking.
pub async fn cancel(
    db: impl PgExecutor<'_>,
    slot_id: Uuid,
    mentee_id: Uuid,
    now: OffsetDateTime,
) -> anyhow::Result<Option<Slot>> {
    let slot = sqlx::query_as::<_, Slot>(&format!(
        r#"
        UPDATE mentor_availability
           SET is_booked = FALSE, mentee_id = NULL
         WHERE id = $1
           AND mentee_id = $2
           AND is_booked = TRUE
           AND start_time > $3
        RETURNING {SLOT_COLUMNS}
        "#
    ))
    .bind(slot_id)
    .bind(mentee_id)
    .bind(now)
    .fetch_optional(db)
    .await
    .context("cancel booking")?;
    Ok(slot)
}

/// Frees every slot the mentee holds; returns how many were released.
pub async fn release_for_mentee(db: impl PgExecutor<'_>, mentee_id: Uuid) -> anyhow::Result<u64> {
    let res = sqlx::query(
        r#"
        UPDATE mentor_availability
           SET is_booked = FALSE, mentee_id = NULL
         WHERE mentee_id = $1 AND is_booked = TRUE
        "#,
    )
    .bind(mentee_id)
    .execute(db)
    .await
    .context("release mentee slots")?;
    Ok(res.rows_affected())
}

pub async fn list_for_mentor(db: impl PgExecutor<'_>, mentor_id: Uuid) -> anyhow::Result<Vec<Slot>> {
    let rows = sqlx::query_as::<_, Slot>(&format!(
        "SELECT {SLOT_COLUMNS} FROM mentor_availability WHERE mentor_id = $1 ORDER BY start_time"
    ))
    .bind(mentor_id)
    .fetch_all(db)
    .await
    .context("list slots")?;
    Ok(rows)
}

/// Unbooked slots of the mentor starting after `now`.
pub async fn list_open(
    db: impl PgExecutor<'_>,
    mentor_id: Uuid,
    now: OffsetDateTime,
) -> anyhow::Result<Vec<Slot>> {
    let rows = sqlx::query_as::<_, Slot>(&format!(
        r#"
        SELECT {SLOT_COLUMNS} FROM mentor_availability
         WHERE mentor_id = $1 AND is_booked = FALSE AND start_time > $2
         ORDER BY start_time
        "#
    ))
    .bind(mentor_id)
    .bind(now)
    .fetch_all(db)
    .await
    .context("list open slots")?;
    Ok(rows)
}

/// Upcoming booked slots of the mentor, optionally only those of one mentee.
pub async fn list_reserved(
    db: impl PgExecutor<'_>,
    mentor_id: Uuid,
    mentee_id: Option<Uuid>,
    now: OffsetDateTime,
) -> anyhow::Result<Vec<Slot>> {
    let rows = sqlx::query_as::<_, Slot>(&format!(
        r#"
        SELECT {SLOT_COLUMNS} FROM mentor_availability
         WHERE mentor_id = $1
           AND is_booked = TRUE
           AND start_time > $3
           AND ($2::uuid IS NULL OR mentee_id = $2)
         ORDER BY start_time
        "#
    ))
    .bind(mentor_id)
    .bind(mentee_id)
    .bind(now)
    .fetch_all(db)
    .await
    .context("list reserved slots")?;
    Ok(rows)
}
