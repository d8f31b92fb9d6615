use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{claims::Role, repo_types::User};
use crate::languages::LanguageSet;

/// Request body for mentor self-registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    #[serde(default)]
    pub professional_career: Option<String>,
    #[serde(default)]
    pub languages: LanguageSet,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for token refresh.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Response returned after login or refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: PublicUser,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub mentor_id: Option<Uuid>,
}

impl From<&User> for PublicUser {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            username: u.username.clone(),
            email: u.email.clone(),
            role: u.role(),
            mentor_id: u.mentor_id,
        }
    }
}

/// Body for account deletion endpoints.
#[derive(Debug, Deserialize)]
pub struct PasswordConfirmation {
    #[serde(default)]
    pub password: String,
}
