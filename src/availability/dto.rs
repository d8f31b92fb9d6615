use serde::Deserialize;
use time::OffsetDateTime;

/// Start and end of a slot, RFC 3339.
#[derive(Debug, Deserialize)]
pub struct SlotWindow {
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_time: OffsetDateTime,
}
