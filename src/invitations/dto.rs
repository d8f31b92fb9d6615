use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    pub mentee_email: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    #[serde(default)]
    pub token: Option<String>,
}

/// Public facts about a pending invitation; never the token itself.
#[derive(Debug, Serialize)]
pub struct InvitationSummary {
    pub mentee_email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}
