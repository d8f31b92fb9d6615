use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use time::OffsetDateTime;
use tracing::instrument;

use super::{
    dto::{MentorDashboard, MentorDashboardQuery, MenteeDashboard},
    services,
};
use crate::{
    auth::extractors::{MenteeUser, MentorUser},
    error::AppResult,
    extract::AppQuery,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard_mentor", get(dashboard_mentor))
        .route("/dashboard_mentee", get(dashboard_mentee))
}

#[instrument(skip(state, query))]
pub async fn dashboard_mentor(
    State(state): State<AppState>,
    MentorUser(mentor_id): MentorUser,
    AppQuery(query): AppQuery<MentorDashboardQuery>,
) -> AppResult<Json<MentorDashboard>> {
    let dashboard =
        services::mentor_dashboard(&state, mentor_id, query, OffsetDateTime::now_utc()).await?;
    Ok(Json(dashboard))
}

#[instrument(skip(state))]
pub async fn dashboard_mentee(
    State(state): State<AppState>,
    MenteeUser(mentee_id): MenteeUser,
) -> AppResult<Json<MenteeDashboard>> {
    Ok(Json(
        services::mentee_dashboard(&state, mentee_id, OffsetDateTime::now_utc()).await?,
    ))
}
