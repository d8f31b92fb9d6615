use lazy_static::lazy_static;
use regex::Regex;
use sqlx::PgPool;
use tracing::{info, warn};

use super::{
    dto::{AuthResponse, PublicUser, RegisterRequest},
    jwt::JwtKeys,
    password::{hash_password_blocking, verify_password_blocking},
    repo_types::{NewUser, User},
};
use crate::accounts::repo_types::MentorProfile;
use crate::error::{violated_constraint, AppError, AppResult};

pub const MIN_PASSWORD_LEN: usize = 6;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Lowercases and checks the shape of an email.
pub fn clean_email(email: &str) -> AppResult<String> {
    let email = normalize_email(email);
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::validation("Invalid email"));
    }
    Ok(email)
}

pub fn clean_username(username: &str) -> AppResult<String> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AppError::validation("Username is required."));
    }
    Ok(username.to_string())
}

/// Confirmation must match, then the length rule applies.
pub fn check_new_password(password: &str, confirm: &str) -> AppResult<()> {
    if password != confirm {
        return Err(AppError::validation(
            "Your passwords do not match. Please, try again.",
        ));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "Your password needs to be {MIN_PASSWORD_LEN} characters or more."
        )));
    }
    Ok(())
}

/// Maps a unique-constraint failure on `users` to a conflict; anything else stays internal.
pub fn user_write_error(err: anyhow::Error) -> AppError {
    match violated_constraint(&err).as_deref() {
        Some("users_username_key") => {
            AppError::conflict("Username already exists. Please choose a different one.")
        }
        Some("users_email_key") => AppError::conflict("This email is already used."),
        _ => AppError::Internal(err),
    }
}

pub fn issue_tokens(keys: &JwtKeys, user: &User) -> AppResult<AuthResponse> {
    let access_token = keys.sign_access(user.id, user.role())?;
    let refresh_token = keys.sign_refresh(user.id, user.role())?;
    Ok(AuthResponse {
        access_token,
        refresh_token,
        user: PublicUser::from(user),
    })
}

/// Mentor self-registration: account and mentor profile in one transaction.
pub async fn register_mentor(db: &PgPool, req: RegisterRequest) -> AppResult<User> {
    let username = clean_username(&req.username)?;
    let email = clean_email(&req.email)?;
    check_new_password(&req.password, &req.confirm_password)?;

    if User::username_taken(db, &username, None).await? {
        return Err(AppError::conflict(
            "Username already exists. Please choose a different one.",
        ));
    }
    if User::email_taken(db, &email, None).await? {
        return Err(AppError::conflict("Email already exists. Please chose a different one."));
    }

    let hash = hash_password_blocking(req.password).await?;

    let mut tx = db.begin().await?;
    let user = User::create(
        &mut *tx,
        &NewUser {
            username: &username,
            email: &email,
            password_hash: &hash,
            is_mentor: true,
            mentor_id: None,
        },
    )
    .await
    .map_err(user_write_error)?;
    MentorProfile::create(
        &mut *tx,
        user.id,
        req.professional_career.as_deref(),
        &req.languages,
    )
    .await?;
    tx.commit().await?;

    info!(user_id = %user.id, email = %user.email, "mentor registered");
    Ok(user)
}

/// Email + password check; unknown email and wrong password look the same.
pub async fn authenticate(db: &PgPool, email: &str, password: &str) -> AppResult<User> {
    let invalid = || AppError::Unauthorized("Email or password invalid.".into());
    let email = normalize_email(email);

    let Some(user) = User::find_by_email(db, &email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(invalid());
    };
    if !verify_password_blocking(password.to_string(), user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(invalid());
    }
    Ok(user)
}

/// Re-entry of the caller's current password before a sensitive change.
pub async fn confirm_password(user: &User, password: Option<&str>, missing: &str) -> AppResult<()> {
    let password = password.unwrap_or_default();
    if password.is_empty() {
        return Err(AppError::validation(missing));
    }
    if !verify_password_blocking(password.to_string(), user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "password re-entry failed");
        return Err(AppError::forbidden("The password you entered is incorrect."));
    }
    Ok(())
}
