use axum::{
    extract::{FromRef, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, RefreshRequest, RegisterRequest},
        extractors::AuthUser,
        jwt::JwtKeys,
        repo_types::User,
        services::{authenticate, issue_tokens, register_mentor},
    },
    error::{AppError, AppResult},
    extract::AppJson,
    languages::{self, LanguageChoice},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", get(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me))
        .route("/languages", get(list_languages))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    let user = register_mentor(&state.db, payload).await?;
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, "/login")],
        Json(PublicUser::from(&user)),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let user = authenticate(&state.db, &payload.email, &payload.password).await?;
    let response = issue_tokens(&JwtKeys::from_ref(&state), &user)?;
    info!(user_id = %user.id, role = ?user.role(), "user logged in");
    Ok(Json(response))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| AppError::Unauthorized(e.to_string()))?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;

    Ok(Json(issue_tokens(&keys, &user)?))
}

/// Tokens are stateless; the client drops them.
#[instrument]
pub async fn logout(user: AuthUser) -> StatusCode {
    info!(user_id = %user.id, "user logged out");
    StatusCode::NO_CONTENT
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<PublicUser>> {
    let user = User::find_by_id(&state.db, user.id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;
    Ok(Json(PublicUser::from(&user)))
}

pub async fn list_languages() -> Json<Vec<LanguageChoice>> {
    Json(languages::choices())
}
