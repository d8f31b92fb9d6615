use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Single-use registration token bound to one mentee email.
#[derive(Debug, Clone, FromRow)]
pub struct InvitationToken {
    pub id: Uuid,
    pub token: String,
    pub mentee_email: String,
    pub mentor_id: Uuid,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
    pub is_used: bool,
}

impl InvitationToken {
    /// Unused and not yet expired.
    pub fn is_active(&self, now: OffsetDateTime) -> bool {
        !self.is_used && self.expires_at > now
    }
}
