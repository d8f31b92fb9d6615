use anyhow::Context;
use sqlx::PgExecutor;
use uuid::Uuid;

use super::repo_types::{MenteeProfile, MentorProfile, NewMenteeProfile};
use crate::languages::LanguageSet;

const MENTOR_COLUMNS: &str =
    "user_id, bio, professional_career, languages, profile_picture_key, created_at, updated_at";

const MENTEE_COLUMNS: &str = "user_id, bio, location, languages, professional_career, \
     professional_goal, cv_key, cv_feedback_key, profile_picture_key, created_at, updated_at";

impl MentorProfile {
    pub async fn create(
        db: impl PgExecutor<'_>,
        user_id: Uuid,
        professional_career: Option<&str>,
        languages: &LanguageSet,
    ) -> anyhow::Result<MentorProfile> {
        let profile = sqlx::query_as::<_, MentorProfile>(&format!(
            r#"
            INSERT INTO mentor_profiles (user_id, professional_career, languages)
            VALUES ($1, $2, $3)
            RETURNING {MENTOR_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(professional_career)
        .bind(languages.to_codes())
        .fetch_one(db)
        .await
        .context("insert mentor profile")?;
        Ok(profile)
    }

    /// Returns the profile, creating an empty one on first access.
    pub async fn get_or_create(db: impl PgExecutor<'_>, user_id: Uuid) -> anyhow::Result<MentorProfile> {
        let profile = sqlx::query_as::<_, MentorProfile>(&format!(
            r#"
            INSERT INTO mentor_profiles (user_id) VALUES ($1)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING {MENTOR_COLUMNS}
            "#
        ))
        .bind(user_id)
        .fetch_one(db)
        .await
        .context("get or create mentor profile")?;
        Ok(profile)
    }

    pub async fn save(&self, db: impl PgExecutor<'_>) -> anyhow::Result<MentorProfile> {
        let profile = sqlx::query_as::<_, MentorProfile>(&format!(
            r#"
            UPDATE mentor_profiles
               SET bio = $2,
                   professional_career = $3,
                   languages = $4,
                   profile_picture_key = $5,
                   updated_at = now()
             WHERE user_id = $1
            RETURNING {MENTOR_COLUMNS}
            "#
        ))
        .bind(self.user_id)
        .bind(&self.bio)
        .bind(&self.professional_career)
        .bind(&self.languages)
        .bind(&self.profile_picture_key)
        .fetch_one(db)
        .await
        .context("update mentor profile")?;
        Ok(profile)
    }
}

impl MenteeProfile {
    pub async fn create(
        db: impl PgExecutor<'_>,
        user_id: Uuid,
        new: &NewMenteeProfile<'_>,
    ) -> anyhow::Result<MenteeProfile> {
        let profile = sqlx::query_as::<_, MenteeProfile>(&format!(
            r#"
            INSERT INTO mentee_profiles
                (user_id, location, professional_career, professional_goal, languages, cv_key)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {MENTEE_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(new.location)
        .bind(new.professional_career)
        .bind(new.professional_goal)
        .bind(new.languages.to_codes())
        .bind(new.cv_key)
        .fetch_one(db)
        .await
        .context("insert mentee profile")?;
        Ok(profile)
    }

    pub async fn find(db: impl PgExecutor<'_>, user_id: Uuid) -> anyhow::Result<Option<MenteeProfile>> {
        let profile = sqlx::query_as::<_, MenteeProfile>(&format!(
            "SELECT {MENTEE_COLUMNS} FROM mentee_profiles WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(db)
        .await
        .context("find mentee profile")?;
        Ok(profile)
    }

    pub async fn get_or_create(db: impl PgExecutor<'_>, user_id: Uuid) -> anyhow::Result<MenteeProfile> {
        let profile = sqlx::query_as::<_, MenteeProfile>(&format!(
            r#"
            INSERT INTO mentee_profiles (user_id) VALUES ($1)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING {MENTEE_COLUMNS}
            "#
        ))
        .bind(user_id)
        .fetch_one(db)
        .await
        .context("get or create mentee profile")?;
        Ok(profile)
    }

    pub async fn save(&self, db: impl PgExecutor<'_>) -> anyhow::Result<MenteeProfile> {
        let profile = sqlx::query_as::<_, MenteeProfile>(&format!(
            r#"
            UPDATE mentee_profiles
               SET bio = $2,
                   location = $3,
                   languages = $4,
                   professional_career = $5,
                   professional_goal = $6,
                   cv_key = $7,
                   profile_picture_key = $8,
                   updated_at = now()
             WHERE user_id = $1
            RETURNING {MENTEE_COLUMNS}
            "#
        ))
        .bind(self.user_id)
        .bind(&self.bio)
        .bind(&self.location)
        .bind(&self.languages)
        .bind(&self.professional_career)
        .bind(&self.professional_goal)
        .bind(&self.cv_key)
        .bind(&self.profile_picture_key)
        .fetch_one(db)
        .await
        .context("update mentee profile")?;
        Ok(profile)
    }
}
