use anyhow::Context;
use sqlx::PgExecutor;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::InvitationToken;

const TOKEN_COLUMNS: &str = "id, token, mentee_email, mentor_id, created_at, expires_at, is_used";

/// Serializes invitation work on one email until the transaction ends.
pub async fn lock_email(db: impl PgExecutor<'_>, email: &str) -> anyhow::Result<()> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(email)
        .execute(db)
        .await
        .context("lock invitation email")?;
    Ok(())
}

pub async fn has_active_for_email(
    db: impl PgExecutor<'_>,
    email: &str,
    now: OffsetDateTime,
) -> anyhow::Result<bool> {
    let active: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM invitation_tokens
             WHERE mentee_email = $1 AND is_used = FALSE AND expires_at > $2
        )
        "#,
    )
    .bind(email)
    .bind(now)
    .fetch_one(db)
    .await
    .context("check active invitation")?;
    Ok(active)
}

pub async fn create(
    db: impl PgExecutor<'_>,
    token: &str,
    mentee_email: &str,
    mentor_id: Uuid,
    expires_at: OffsetDateTime,
) -> anyhow::Result<InvitationToken> {
    let row = sqlx::query_as::<_, InvitationToken>(&format!(
        r#"
        INSERT INTO invitation_tokens (id, token, mentee_email, mentor_id, expires_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {TOKEN_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(token)
    .bind(mentee_email)
    .bind(mentor_id)
    .bind(expires_at)
    .fetch_one(db)
    .await
    .context("insert invitation token")?;
    Ok(row)
}

pub async fn find_by_token(db: impl PgExecutor<'_>, token: &str) -> anyhow::Result<Option<InvitationToken>> {
    let row = sqlx::query_as::<_, InvitationToken>(&format!(
        "SELECT {TOKEN_COLUMNS} FROM invitation_tokens WHERE token = $1"
    ))
    .bind(token)
    .fetch_optional(db)
    .await
    .context("find invitation token")?;
    Ok(row)
}

/// Marks the token used if it is still active; `false` when another redemption won.
pub async fn consume(db: impl PgExecutor<'_>, token: &str, now: OffsetDateTime) -> anyhow::Result<bool> {
    let res = sqlx::query(
        r#"
        UPDATE invitation_tokens SET is_used = TRUE
         WHERE token = $1 AND is_used = FALSE AND expires_at > $2
        "#,
    )
    .bind(token)
    .bind(now)
    .execute(db)
    .await
    .context("consume invitation token")?;
    Ok(res.rows_affected() == 1)
}
