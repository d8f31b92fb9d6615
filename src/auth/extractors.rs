use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;
use uuid::Uuid;

use super::claims::{Role, TokenKind};
use super::jwt::JwtKeys;
use crate::error::AppError;

/// Authenticated caller taken from `Authorization: Bearer <access token>`.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .ok_or_else(|| AppError::Unauthorized("Invalid Authorization header".into()))?;

        let claims = keys.verify(token).map_err(|_| {
            warn!("invalid or expired token");
            AppError::Unauthorized("Invalid or expired token".into())
        })?;

        if claims.kind != TokenKind::Access {
            return Err(AppError::Unauthorized("Access token required".into()));
        }

        Ok(AuthUser {
            id: claims.sub,
            role: claims.role,
        })
    }
}

/// Caller that must be a mentor.
#[derive(Debug, Clone, Copy)]
pub struct MentorUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for MentorUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        match user.role {
            Role::Mentor => Ok(MentorUser(user.id)),
            Role::Mentee => {
                warn!(user_id = %user.id, path = %parts.uri.path(), "mentee hit mentor-only endpoint");
                Err(AppError::forbidden("Access denied. Only mentors can do this."))
            }
        }
    }
}

/// Caller that must be a mentee.
#[derive(Debug, Clone, Copy)]
pub struct MenteeUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for MenteeUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        match user.role {
            Role::Mentee => Ok(MenteeUser(user.id)),
            Role::Mentor => {
                warn!(user_id = %user.id, path = %parts.uri.path(), "mentor hit mentee-only endpoint");
                Err(AppError::forbidden("Access denied. Only mentees can do this."))
            }
        }
    }
}
