use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{MenteeDetail, MenteeProfileView, MentorProfileView},
    services,
};
use crate::{
    auth::{
        dto::PasswordConfirmation,
        extractors::{AuthUser, MenteeUser, MentorUser},
    },
    error::AppResult,
    extract::{AppJson, AppPath},
    state::AppState,
    uploads::FormData,
};

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/update_mentorprofile",
            get(get_mentorprofile).post(update_mentorprofile),
        )
        .route(
            "/update_menteeprofile",
            get(get_menteeprofile).post(update_menteeprofile),
        )
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB
}

pub fn view_routes() -> Router<AppState> {
    Router::new()
        .route("/mentor_profile", get(mentor_profile))
        .route("/mentee_profile/:id", get(mentee_profile))
}

pub fn delete_routes() -> Router<AppState> {
    Router::new()
        .route("/delete_mentee/:id", post(delete_mentee))
        .route("/delete_mentor/:id", post(delete_mentor))
}

#[instrument(skip(state))]
pub async fn get_mentorprofile(
    State(state): State<AppState>,
    MentorUser(mentor_id): MentorUser,
) -> AppResult<Json<MentorProfileView>> {
    Ok(Json(services::get_mentor_profile(&state, mentor_id).await?))
}

#[instrument(skip(state, form))]
pub async fn update_mentorprofile(
    State(state): State<AppState>,
    MentorUser(mentor_id): MentorUser,
    form: FormData,
) -> AppResult<Json<MentorProfileView>> {
    Ok(Json(services::update_mentor_profile(&state, mentor_id, form).await?))
}

#[instrument(skip(state))]
pub async fn get_menteeprofile(
    State(state): State<AppState>,
    MenteeUser(mentee_id): MenteeUser,
) -> AppResult<Json<MenteeProfileView>> {
    Ok(Json(services::get_mentee_profile(&state, mentee_id).await?))
}

#[instrument(skip(state, form))]
pub async fn update_menteeprofile(
    State(state): State<AppState>,
    MenteeUser(mentee_id): MenteeUser,
    form: FormData,
) -> AppResult<Json<MenteeProfileView>> {
    Ok(Json(services::update_mentee_profile(&state, mentee_id, form).await?))
}

#[instrument(skip(state))]
pub async fn mentor_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<MentorProfileView>> {
    Ok(Json(services::assigned_mentor_profile(&state, user.id).await?))
}

#[instrument(skip(state))]
pub async fn mentee_profile(
    State(state): State<AppState>,
    MentorUser(mentor_id): MentorUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<MenteeDetail>> {
    let detail = services::mentee_detail(&state, mentor_id, id, OffsetDateTime::now_utc()).await?;
    Ok(Json(detail))
}

#[instrument(skip(state, body))]
pub async fn delete_mentee(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(body): AppJson<PasswordConfirmation>,
) -> AppResult<StatusCode> {
    services::delete_mentee(&state, user.id, id, Some(&body.password)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, body))]
pub async fn delete_mentor(
    State(state): State<AppState>,
    MentorUser(mentor_id): MentorUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(body): AppJson<PasswordConfirmation>,
) -> AppResult<StatusCode> {
    services::delete_mentor(&state, mentor_id, id, Some(&body.password)).await?;
    Ok(StatusCode::NO_CONTENT)
}
