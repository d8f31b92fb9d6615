use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::instrument;

use super::{
    dto::{InvitationSummary, InviteRequest, TokenQuery},
    services,
};
use crate::{
    auth::{dto::PublicUser, extractors::MentorUser},
    error::AppResult,
    extract::{AppJson, AppQuery},
    state::AppState,
    uploads::FormData,
};

pub fn mentor_routes() -> Router<AppState> {
    Router::new().route("/invite_mentee", post(invite_mentee))
}

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/register_mentee", get(lookup_invitation).post(register_mentee))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB
}

#[instrument(skip(state, body))]
pub async fn invite_mentee(
    State(state): State<AppState>,
    MentorUser(mentor_id): MentorUser,
    AppJson(body): AppJson<InviteRequest>,
) -> AppResult<(StatusCode, Json<InvitationSummary>)> {
    let invitation =
        services::invite(&state, mentor_id, &body.mentee_email, OffsetDateTime::now_utc()).await?;
    Ok((
        StatusCode::CREATED,
        Json(InvitationSummary {
            mentee_email: invitation.mentee_email,
            expires_at: invitation.expires_at,
        }),
    ))
}

#[instrument(skip(state, q))]
pub async fn lookup_invitation(
    State(state): State<AppState>,
    AppQuery(q): AppQuery<TokenQuery>,
) -> AppResult<Json<InvitationSummary>> {
    let invitation =
        services::lookup(&state, q.token.as_deref(), OffsetDateTime::now_utc()).await?;
    Ok(Json(InvitationSummary {
        mentee_email: invitation.mentee_email,
        expires_at: invitation.expires_at,
    }))
}

/// Token comes from the query string or, failing that, a `token` form field.
#[instrument(skip(state, q, form))]
pub async fn register_mentee(
    State(state): State<AppState>,
    AppQuery(q): AppQuery<TokenQuery>,
    form: FormData,
) -> AppResult<impl IntoResponse> {
    let token = q.token.or_else(|| form.non_empty("token"));
    let user =
        services::redeem(&state, token.as_deref(), form, OffsetDateTime::now_utc()).await?;
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, "/login")],
        Json(PublicUser::from(&user)),
    ))
}
