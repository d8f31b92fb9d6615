use rand::{distributions::Alphanumeric, thread_rng, Rng};
use time::{Duration, OffsetDateTime};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{repo, repo_types::InvitationToken};
use crate::{
    accounts::{
        repo_types::{MenteeProfile, NewMenteeProfile},
        services::CV_FILES,
    },
    auth::{
        password::hash_password_blocking,
        repo_types::{NewUser, User},
        services::{check_new_password, clean_email, clean_username, user_write_error},
    },
    error::{AppError, AppResult},
    languages::LanguageSet,
    state::AppState,
    uploads::{self, check_pdf, FormData},
};

const TOKEN_LEN: usize = 48;
const INVALID_OR_EXPIRED: &str = "This invitation link is invalid or has expired.";

pub fn generate_token() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

pub fn invite_link(public_base_url: &str, token: &str) -> String {
    format!(
        "{}/register_mentee?token={}",
        public_base_url.trim_end_matches('/'),
        token
    )
}

/// Subject and body of the invitation email.
pub fn invitation_email(inviter_email: &str, link: &str, ttl_hours: i64) -> (String, String) {
    let subject = "Invite to join MatkaMestre".to_string();
    let body = format!(
        "Hello!\n\nYou have been invited by {inviter_email} to join MatkaMestre as a Mentee. \
         Use this link to register: {link}\n\n\
         Important: this invite link is valid for {ttl_hours} hours.\n\n\
         Kind regards,\nMatkaMestre Team."
    );
    (subject, body)
}

/// Creates a token for `raw_email` and mails the link; both succeed or neither does.
pub async fn invite(
    st: &AppState,
    mentor_id: Uuid,
    raw_email: &str,
    now: OffsetDateTime,
) -> AppResult<InvitationToken> {
    let email = clean_email(raw_email)?;
    let mentor = User::find_by_id(&st.db, mentor_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;

    let mut tx = st.db.begin().await?;
    repo::lock_email(&mut *tx, &email).await?;

    if User::email_taken(&mut *tx, &email, None).await? {
        warn!(%mentor_id, email = %email, "invitation for a registered email");
        return Err(AppError::conflict("This mentee email is already used."));
    }
    if repo::has_active_for_email(&mut *tx, &email, now).await? {
        return Err(AppError::conflict(format!(
            "There is already an active invitation for this email: {email}."
        )));
    }

    let ttl_hours = st.config.invitation_ttl_hours;
    let token = generate_token();
    let invitation = repo::create(&mut *tx, &token, &email, mentor_id, now + Duration::hours(ttl_hours)).await?;

    let link = invite_link(&st.config.public_base_url, &token);
    let (subject, body) = invitation_email(&mentor.email, &link, ttl_hours);
    if let Err(e) = st.mailer.send(&subject, &body, &email).await {
        // Dropping `tx` rolls the token back.
        error!(error = %e, %mentor_id, email = %email, "failed to send invitation");
        return Err(AppError::Internal(e.context("send invitation email")));
    }
    tx.commit().await?;

    info!(%mentor_id, email = %email, invitation_id = %invitation.id, "invitation sent");
    Ok(invitation)
}

/// The invitation behind `token`, if it can still be redeemed.
pub async fn lookup(
    st: &AppState,
    token: Option<&str>,
    now: OffsetDateTime,
) -> AppResult<InvitationToken> {
    let token = token
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::validation("Invitation token is invalid or missing."))?;
    let invitation = repo::find_by_token(&st.db, token)
        .await?
        .ok_or_else(|| AppError::not_found("This invitation token was not found."))?;
    if !invitation.is_active(now) {
        warn!(invitation_id = %invitation.id, is_used = invitation.is_used, "stale invitation used");
        return Err(AppError::validation(INVALID_OR_EXPIRED));
    }
    Ok(invitation)
}

/// Registers the invited mentee and consumes the token in one transaction.
pub async fn redeem(
    st: &AppState,
    token: Option<&str>,
    mut form: FormData,
    now: OffsetDateTime,
) -> AppResult<User> {
    let invitation = lookup(st, token, now).await?;

    let password = form.text("password").unwrap_or_default().to_string();
    let confirm = form.text("confirm_password").unwrap_or_default();
    check_new_password(&password, confirm)?;

    let email = clean_email(form.text("email").unwrap_or_default())?;
    if email != invitation.mentee_email {
        return Err(AppError::validation(
            "The email provided does not match the invitation email.",
        ));
    }
    let username = clean_username(form.text("username").unwrap_or_default())?;
    if User::username_taken(&st.db, &username, None).await? {
        return Err(AppError::conflict(
            "Username already exists. Please choose a different one.",
        ));
    }
    if User::email_taken(&st.db, &email, None).await? {
        return Err(AppError::conflict("This email is already used."));
    }

    let languages = LanguageSet::parse(&form.list("languages"))?;
    let location = form.non_empty("location");
    let career = form.non_empty("professional_career");
    let goal = form.non_empty("professional_goal");
    let cv = form.take_file("cv_file");
    if let Some(item) = &cv {
        check_pdf(item, "CV")?;
    }

    let hash = hash_password_blocking(password).await?;

    let mut tx = st.db.begin().await?;
    if !repo::consume(&mut *tx, &invitation.token, now).await? {
        warn!(invitation_id = %invitation.id, "invitation consumed concurrently");
        return Err(AppError::validation(INVALID_OR_EXPIRED));
    }
    let user = User::create(
        &mut *tx,
        &NewUser {
            username: &username,
            email: &email,
            password_hash: &hash,
            is_mentor: false,
            mentor_id: Some(invitation.mentor_id),
        },
    )
    .await
    .map_err(user_write_error)?;

    let cv_key = match cv {
        Some(item) => Some(uploads::store(st, CV_FILES, user.id, item).await?),
        None => None,
    };
    let profile = NewMenteeProfile {
        location: location.as_deref(),
        professional_career: career.as_deref(),
        professional_goal: goal.as_deref(),
        languages,
        cv_key: cv_key.as_deref(),
    };
    let saved = async {
        MenteeProfile::create(&mut *tx, user.id, &profile).await?;
        tx.commit().await?;
        Ok::<_, AppError>(())
    }
    .await;
    if let Err(e) = saved {
        uploads::discard(st, &cv_key.into_iter().collect::<Vec<_>>()).await;
        return Err(e);
    }

    info!(
        user_id = %user.id,
        mentor_id = %invitation.mentor_id,
        invitation_id = %invitation.id,
        "mentee registered from invitation"
    );
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn tokens_are_long_and_alphanumeric() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), TOKEN_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn link_and_email() {
        let link = invite_link("http://localhost:8080/", "abc");
        assert_eq!(link, "http://localhost:8080/register_mentee?token=abc");

        let (subject, body) = invitation_email("coach@x.com", &link, 24);
        assert_eq!(subject, "Invite to join MatkaMestre");
        assert!(body.contains("coach@x.com"));
        assert!(body.contains(&link));
        assert!(body.contains("24 hours"));
    }

    #[test]
    fn activity_depends_on_use_and_expiry() {
        let now = datetime!(2030-01-01 12:00 UTC);
        let token = InvitationToken {
            id: Uuid::new_v4(),
            token: "t".into(),
            mentee_email: "a@x.com".into(),
            mentor_id: Uuid::new_v4(),
            created_at: now - Duration::hours(1),
            expires_at: now + Duration::hours(23),
            is_used: false,
        };
        assert!(token.is_active(now));
        assert!(!token.is_active(now + Duration::hours(23)));

        let used = InvitationToken {
            is_used: true,
            ..token.clone()
        };
        assert!(!used.is_active(now));

        // expired wins regardless of the used flag
        let expired = InvitationToken {
            expires_at: now - Duration::seconds(1),
            ..token
        };
        assert!(!expired.is_active(now));
    }

    #[tokio::test]
    async fn missing_token_is_a_validation_error() {
        let st = AppState::fake();
        let now = OffsetDateTime::now_utc();
        assert!(matches!(lookup(&st, None, now).await, Err(AppError::Validation(_))));
        assert!(matches!(lookup(&st, Some("  "), now).await, Err(AppError::Validation(_))));
    }
}
