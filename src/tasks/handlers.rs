use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{CreateTaskRequest, TaskInput},
    repo,
    repo_types::{MentorTask, Task},
    services,
};
use crate::{
    auth::extractors::{MenteeUser, MentorUser},
    error::AppResult,
    extract::{AppJson, AppPath},
    state::AppState,
};

pub fn mentor_routes() -> Router<AppState> {
    Router::new()
        .route("/create_task", post(create_task))
        .route("/edit_task/:id", post(edit_task))
        .route("/delete_task/:id", post(delete_task))
        .route("/toggle_task_status/:id", post(toggle_task_status))
        .route("/list_task", get(list_task))
}

pub fn mentee_routes() -> Router<AppState> {
    Router::new().route("/complete_task/:id", post(complete_task))
}

#[instrument(skip(state, body))]
pub async fn create_task(
    State(state): State<AppState>,
    MentorUser(mentor_id): MentorUser,
    AppJson(body): AppJson<CreateTaskRequest>,
) -> AppResult<(StatusCode, Json<Task>)> {
    let task = services::create_task(
        &state.db,
        mentor_id,
        body.mentee_id,
        &body.fields,
        OffsetDateTime::now_utc(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(task)))
}

#[instrument(skip(state, body))]
pub async fn edit_task(
    State(state): State<AppState>,
    MentorUser(mentor_id): MentorUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(body): AppJson<TaskInput>,
) -> AppResult<Json<Task>> {
    let task =
        services::edit_task(&state.db, mentor_id, id, &body, OffsetDateTime::now_utc()).await?;
    Ok(Json(task))
}

#[instrument(skip(state))]
pub async fn delete_task(
    State(state): State<AppState>,
    MentorUser(mentor_id): MentorUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<StatusCode> {
    services::delete_task(&state.db, mentor_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn toggle_task_status(
    State(state): State<AppState>,
    MentorUser(mentor_id): MentorUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<Task>> {
    Ok(Json(services::toggle_task_status(&state.db, mentor_id, id).await?))
}

#[instrument(skip(state))]
pub async fn list_task(
    State(state): State<AppState>,
    MentorUser(mentor_id): MentorUser,
) -> AppResult<Json<Vec<MentorTask>>> {
    Ok(Json(repo::list_for_mentor(&state.db, mentor_id).await?))
}

#[instrument(skip(state))]
pub async fn complete_task(
    State(state): State<AppState>,
    MenteeUser(mentee_id): MenteeUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<Task>> {
    Ok(Json(services::complete_task(&state.db, mentee_id, id).await?))
}
