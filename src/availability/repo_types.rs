use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// A mentor's bookable time interval, `[start_time, end_time)`.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Slot {
    pub id: Uuid,
    pub mentor_id: Uuid,
    pub mentee_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_time: OffsetDateTime,
    pub is_booked: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
