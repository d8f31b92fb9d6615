use sqlx::PgPool;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use super::{repo, repo_types::Slot};
use crate::auth::repo_types::User;
use crate::error::{violated_constraint, AppError, AppResult};

const OVERLAP: &str = "This time slot conflicts with an existing availability.";
const SLOT_NOT_FOUND: &str = "Slot not found.";

pub fn check_window(start: OffsetDateTime, end: OffsetDateTime, now: OffsetDateTime) -> AppResult<()> {
    if end <= start {
        return Err(AppError::validation("End time must be after start time."));
    }
    if start < now {
        return Err(AppError::validation("Start time cannot be in the past."));
    }
    Ok(())
}

fn slot_write_error(err: anyhow::Error) -> AppError {
    match violated_constraint(&err).as_deref() {
        Some("mentor_availability_no_overlap") => AppError::validation(OVERLAP),
        _ => AppError::Internal(err),
    }
}

pub async fn set_availability(
    db: &PgPool,
    mentor_id: Uuid,
    start: OffsetDateTime,
    end: OffsetDateTime,
    now: OffsetDateTime,
) -> AppResult<Slot> {
    check_window(start, end, now)?;

    let mut tx = db.begin().await?;
    if repo::has_conflict(&mut *tx, mentor_id, start, end, None).await? {
        warn!(%mentor_id, "availability overlaps an existing slot");
        return Err(AppError::validation(OVERLAP));
    }
    let slot = repo::insert(&mut *tx, mentor_id, start, end)
        .await
        .map_err(slot_write_error)?;
    tx.commit().await?;

    info!(%mentor_id, slot_id = %slot.id, "availability slot added");
    Ok(slot)
}

pub async fn edit_availability(
    db: &PgPool,
    mentor_id: Uuid,
    slot_id: Uuid,
    start: OffsetDateTime,
    end: OffsetDateTime,
    now: OffsetDateTime,
) -> AppResult<Slot> {
    let mut tx = db.begin().await?;
    let slot = repo::find_owned(&mut *tx, slot_id, mentor_id)
        .await?
        .ok_or_else(|| AppError::not_found(SLOT_NOT_FOUND))?;
    if slot.is_booked {
        return Err(AppError::forbidden("Cannot edit a booked slot."));
    }
    check_window(start, end, now)?;
    if repo::has_conflict(&mut *tx, mentor_id, start, end, Some(slot_id)).await? {
        return Err(AppError::validation(OVERLAP));
    }
    let updated = repo::update_window(&mut *tx, slot_id, mentor_id, start, end)
        .await
        .map_err(slot_write_error)?
        .ok_or_else(|| AppError::forbidden("Cannot edit a booked slot."))?;
    tx.commit().await?;

    info!(%mentor_id, %slot_id, "availability slot updated");
    Ok(updated)
}

pub async fn delete_availability(db: &PgPool, mentor_id: Uuid, slot_id: Uuid) -> AppResult<()> {
    if repo::delete_unbooked(db, slot_id, mentor_id).await? {
        info!(%mentor_id, %slot_id, "availability slot deleted");
        return Ok(());
    }
    // Nothing deleted: tell a missing slot apart from a booked one.
    match repo::find_owned(db, slot_id, mentor_id).await? {
        Some(_) => Err(AppError::forbidden("Cannot delete a booked slot.")),
        None => Err(AppError::not_found(SLOT_NOT_FOUND)),
    }
}

/// Books a slot of the mentee's own mentor in one conditional write.
pub async fn book_slot(
    db: &PgPool,
    mentee_id: Uuid,
    slot_id: Uuid,
    now: OffsetDateTime,
) -> AppResult<Slot> {
    let mentee = User::find_by_id(db, mentee_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;
    let mentor_id = mentee
        .mentor_id
        .ok_or_else(|| AppError::not_found("Coach profile not found. Contact your coach."))?;

    let slot = repo::book(db, slot_id, mentor_id, mentee_id, now)
        .await?
        .ok_or_else(|| {
            warn!(%mentee_id, %slot_id, "slot not bookable");
            AppError::not_found("Slot not found or no longer available.")
        })?;

    info!(%mentee_id, %slot_id, %mentor_id, "time slot booked");
    Ok(slot)
}

pub async fn cancel_booking(
    db: &PgPool,
    mentee_id: Uuid,
    slot_id: Uuid,
    now: OffsetDateTime,
) -> AppResult<Slot> {
    let slot = repo::cancel(db, slot_id, mentee_id, now)
        .await?
        .ok_or_else(|| AppError::not_found("Booking not found."))?;
    info!(%mentee_id, %slot_id, "booking cancelled");
    Ok(slot)
}
