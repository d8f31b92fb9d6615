use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::{repo, repo_types::RecordingView, services};
use crate::{
    auth::{
        claims::Role,
        extractors::{AuthUser, MentorUser},
    },
    error::AppResult,
    state::AppState,
    uploads::FormData,
};

pub fn read_routes() -> Router<AppState> {
    Router::new().route("/list_meeting_recordings", get(list_meeting_recordings))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/upload_meeting_recording", post(upload_meeting_recording))
        .layer(DefaultBodyLimit::max(512 * 1024 * 1024)) // 512MB
}

#[instrument(skip(state, form))]
pub async fn upload_meeting_recording(
    State(state): State<AppState>,
    MentorUser(mentor_id): MentorUser,
    form: FormData,
) -> AppResult<(StatusCode, Json<RecordingView>)> {
    let view = services::upload_meeting_recording(&state, mentor_id, form).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

#[instrument(skip(state))]
pub async fn list_meeting_recordings(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<Vec<RecordingView>>> {
    let rows = match user.role {
        Role::Mentor => repo::list_for_mentor(&state.db, user.id).await?,
        Role::Mentee => repo::list_for_mentee(&state.db, user.id).await?,
    };
    Ok(Json(services::present_all(&state, rows).await?))
}
