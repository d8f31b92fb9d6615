use anyhow::Context;
use sqlx::PgExecutor;
use uuid::Uuid;

use super::repo_types::{NewUser, User};

const USER_COLUMNS: &str =
    "id, username, email, password_hash, is_mentor, mentor_id, created_at, updated_at";

impl User {
    /// Find a user by (lowercased) email.
    pub async fn find_by_email(db: impl PgExecutor<'_>, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    pub async fn find_by_id(db: impl PgExecutor<'_>, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    /// A mentee currently assigned to `mentor_id`.
    pub async fn find_assigned_mentee(
        db: impl PgExecutor<'_>,
        mentee_id: Uuid,
        mentor_id: Uuid,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users
              WHERE id = $1 AND mentor_id = $2 AND is_mentor = FALSE"
        ))
        .bind(mentee_id)
        .bind(mentor_id)
        .fetch_optional(db)
        .await
        .context("find assigned mentee")?;
        Ok(user)
    }

    /// Whether another account (other than `except`) uses this username.
    pub async fn username_taken(
        db: impl PgExecutor<'_>,
        username: &str,
        except: Option<Uuid>,
    ) -> anyhow::Result<bool> {
        let taken: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM users
                 WHERE username = $1 AND ($2::uuid IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(username)
        .bind(except)
        .fetch_one(db)
        .await
        .context("check username")?;
        Ok(taken)
    }

    pub async fn email_taken(
        db: impl PgExecutor<'_>,
        email: &str,
        except: Option<Uuid>,
    ) -> anyhow::Result<bool> {
        let taken: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM users
                 WHERE email = $1 AND ($2::uuid IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(email)
        .bind(except)
        .fetch_one(db)
        .await
        .context("check email")?;
        Ok(taken)
    }

    /// Create a new user with hashed password.
    pub async fn create(db: impl PgExecutor<'_>, new: &NewUser<'_>) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, username, email, password_hash, is_mentor, mentor_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(new.username)
        .bind(new.email)
        .bind(new.password_hash)
        .bind(new.is_mentor)
        .bind(new.mentor_id)
        .fetch_one(db)
        .await
        .context("insert user")?;
        Ok(user)
    }

    /// Overwrite account fields; `password_hash` of `None` keeps the current hash.
    pub async fn update_account(
        db: impl PgExecutor<'_>,
        id: Uuid,
        username: &str,
        email: &str,
        password_hash: Option<&str>,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET username = $2,
                   email = $3,
                   password_hash = COALESCE($4, password_hash),
                   updated_at = now()
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(db)
        .await
        .context("update user")?;
        Ok(user)
    }

    pub async fn delete(db: impl PgExecutor<'_>, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .context("delete user")?;
        Ok(res.rows_affected() > 0)
    }
}
