use anyhow::Context;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    repo,
    repo_types::{MeetingRecording, RecordingView},
};
use crate::{
    auth::repo_types::User,
    error::{AppError, AppResult},
    state::AppState,
    uploads::{self, FormData},
};

/// Stores the video, then records it; the object is removed if the insert fails.
pub async fn upload_meeting_recording(
    st: &AppState,
    mentor_id: Uuid,
    mut form: FormData,
) -> AppResult<RecordingView> {
    let mentee_id = form.non_empty("mentee_id");
    let title = form.non_empty("title");
    let video = form.take_file("video");
    let (Some(mentee_id), Some(title), Some(video)) = (mentee_id, title, video) else {
        return Err(AppError::validation("Mentee, title and video are required."));
    };
    let mentee_id: Uuid = mentee_id
        .parse()
        .map_err(|_| AppError::validation("Invalid mentee id."))?;

    if User::find_assigned_mentee(&st.db, mentee_id, mentor_id).await?.is_none() {
        warn!(%mentor_id, %mentee_id, "recording for a mentee of another mentor");
        return Err(AppError::not_found(
            "Selected mentee is not associated with your profile.",
        ));
    }

    let key = uploads::store(st, "video", mentor_id, video).await?;
    let id = match repo::insert(&st.db, mentor_id, mentee_id, &title, &key).await {
        Ok(id) => id,
        Err(e) => {
            uploads::discard(st, &[key]).await;
            return Err(e.into());
        }
    };
    info!(%mentor_id, %mentee_id, recording_id = %id, "meeting recording uploaded");

    let recording = repo::find(&st.db, id)
        .await?
        .context("recording vanished after insert")?;
    Ok(present(st, recording).await?)
}

async fn present(st: &AppState, rec: MeetingRecording) -> anyhow::Result<RecordingView> {
    let url = uploads::presign(st, &rec.video_key).await?;
    Ok(rec.into_view(url))
}

pub async fn present_all(
    st: &AppState,
    recordings: Vec<MeetingRecording>,
) -> anyhow::Result<Vec<RecordingView>> {
    let mut out = Vec::with_capacity(recordings.len());
    for rec in recordings {
        out.push(present(st, rec).await?);
    }
    Ok(out)
}
