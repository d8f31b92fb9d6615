use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct MeetingRecording {
    pub id: Uuid,
    pub mentor_id: Option<Uuid>,
    pub mentee_id: Option<Uuid>,
    pub mentee_username: Option<String>,
    pub title: String,
    pub video_key: String,
    pub uploaded_at: OffsetDateTime,
}

/// Recording as returned to clients, with a presigned link instead of the key.
#[derive(Debug, Clone, Serialize)]
pub struct RecordingView {
    pub id: Uuid,
    pub mentor_id: Option<Uuid>,
    pub mentee_id: Option<Uuid>,
    pub mentee_username: Option<String>,
    pub title: String,
    pub video_url: String,
    #[serde(with = "time::serde::rfc3339")]
    pub uploaded_at: OffsetDateTime,
}

impl MeetingRecording {
    pub fn into_view(self, video_url: String) -> RecordingView {
        RecordingView {
            id: self.id,
            mentor_id: self.mentor_id,
            mentee_id: self.mentee_id,
            mentee_username: self.mentee_username,
            title: self.title,
            video_url,
            uploaded_at: self.uploaded_at,
        }
    }
}
