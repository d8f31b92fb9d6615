use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::instrument;
use uuid::Uuid;

use super::{dto::SlotWindow, repo, repo_types::Slot, services};
use crate::{
    auth::extractors::{MenteeUser, MentorUser},
    error::AppResult,
    extract::{AppJson, AppPath},
    state::AppState,
};

pub fn mentor_routes() -> Router<AppState> {
    Router::new()
        .route("/set_availability", post(set_availability))
        .route("/edit_availability/:id", post(edit_availability))
        .route("/delete_availability/:id", post(delete_availability))
        .route("/availability_list", get(availability_list))
}

pub fn mentee_routes() -> Router<AppState> {
    Router::new()
        .route("/book_slot/:id", post(book_slot))
        .route("/cancel_booking/:id", post(cancel_booking))
}

#[instrument(skip(state, body))]
pub async fn set_availability(
    State(state): State<AppState>,
    MentorUser(mentor_id): MentorUser,
    AppJson(body): AppJson<SlotWindow>,
) -> AppResult<(StatusCode, Json<Slot>)> {
    let slot = services::set_availability(
        &state.db,
        mentor_id,
        body.start_time,
        body.end_time,
        OffsetDateTime::now_utc(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(slot)))
}

#[instrument(skip(state, body))]
pub async fn edit_availability(
    State(state): State<AppState>,
    MentorUser(mentor_id): MentorUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(body): AppJson<SlotWindow>,
) -> AppResult<Json<Slot>> {
    let slot = services::edit_availability(
        &state.db,
        mentor_id,
        id,
        body.start_time,
        body.end_time,
        OffsetDateTime::now_utc(),
    )
    .await?;
    Ok(Json(slot))
}

#[instrument(skip(state))]
pub async fn delete_availability(
    State(state): State<AppState>,
    MentorUser(mentor_id): MentorUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<StatusCode> {
    services::delete_availability(&state.db, mentor_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn availability_list(
    State(state): State<AppState>,
    MentorUser(mentor_id): MentorUser,
) -> AppResult<Json<Vec<Slot>>> {
    Ok(Json(repo::list_for_mentor(&state.db, mentor_id).await?))
}

#[instrument(skip(state))]
pub async fn book_slot(
    State(state): State<AppState>,
    MenteeUser(mentee_id): MenteeUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<Slot>> {
    let slot = services::book_slot(&state.db, mentee_id, id, OffsetDateTime::now_utc()).await?;
    Ok(Json(slot))
}

#[instrument(skip(state))]
pub async fn cancel_booking(
    State(state): State<AppState>,
    MenteeUser(mentee_id): MenteeUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<Slot>> {
    let slot = services::cancel_booking(&state.db, mentee_id, id, OffsetDateTime::now_utc()).await?;
    Ok(Json(slot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{claims::Role, jwt::JwtKeys};
    use axum::{
        body::Body,
        extract::FromRef,
        http::{header, Request},
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn error_body(res: axum::response::Response) -> serde_json::Value {
        assert_eq!(
            res.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn bearer(state: &AppState, role: Role) -> String {
        let token = JwtKeys::from_ref(state)
            .sign_access(Uuid::new_v4(), role)
            .unwrap();
        format!("Bearer {token}")
    }

    #[tokio::test]
    async fn mentee_cannot_set_availability() {
        let state = AppState::fake();
        let auth = bearer(&state, Role::Mentee);
        let app = mentor_routes().with_state(state);
        let res = app
            .oneshot(
                Request::post("/set_availability")
                    .header(header::AUTHORIZATION, auth)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"{"start_time":"2030-01-01T10:00:00Z","end_time":"2030-01-01T11:00:00Z"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn reversed_window_is_rejected_before_any_query() {
        let state = AppState::fake();
        let auth = bearer(&state, Role::Mentor);
        let app = mentor_routes().with_state(state);
        let res = app
            .oneshot(
                Request::post("/set_availability")
                    .header(header::AUTHORIZATION, auth)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"{"start_time":"2030-01-01T11:00:00Z","end_time":"2030-01-01T10:00:00Z"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn mentor_cannot_book() {
        let state = AppState::fake();
        let auth = bearer(&state, Role::Mentor);
        let app = mentee_routes().with_state(state);
        let res = app
            .oneshot(
                Request::post(format!("/book_slot/{}", Uuid::new_v4()))
                    .header(header::AUTHORIZATION, auth)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn unparseable_start_time_is_a_validation_error() {
        let state = AppState::fake();
        let auth = bearer(&state, Role::Mentor);
        let app = mentor_routes().with_state(state);
        let res = app
            .oneshot(
                Request::post("/set_availability")
                    .header(header::AUTHORIZATION, auth)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"{"start_time":"tomorrow 10am","end_time":"2030-01-01T11:00:00Z"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body = error_body(res).await;
        assert_eq!(body["error"], "validation_error");
        assert!(body["message"].as_str().unwrap().contains("start_time"));
    }

    #[tokio::test]
    async fn malformed_slot_id_is_a_validation_error() {
        let state = AppState::fake();
        let auth = bearer(&state, Role::Mentee);
        let app = mentee_routes().with_state(state);
        let res = app
            .oneshot(
                Request::post("/book_slot/not-a-uuid")
                    .header(header::AUTHORIZATION, auth)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_body(res).await["error"], "validation_error");
    }
}
