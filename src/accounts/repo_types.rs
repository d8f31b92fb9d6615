use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::languages::LanguageSet;

#[derive(Debug, Clone, FromRow)]
pub struct MentorProfile {
    pub user_id: Uuid,
    pub bio: Option<String>,
    pub professional_career: Option<String>,
    pub languages: Vec<String>,
    pub profile_picture_key: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub struct MenteeProfile {
    pub user_id: Uuid,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub languages: Vec<String>,
    pub professional_career: Option<String>,
    pub professional_goal: Option<String>,
    pub cv_key: Option<String>,
    /// Reviewed CV; written out of band by an administrator, never by the API.
    pub cv_feedback_key: Option<String>,
    pub profile_picture_key: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl MentorProfile {
    pub fn language_set(&self) -> LanguageSet {
        LanguageSet::from_stored(&self.languages)
    }
}

impl MenteeProfile {
    pub fn language_set(&self) -> LanguageSet {
        LanguageSet::from_stored(&self.languages)
    }

    /// Every stored object the profile points at.
    pub fn object_keys(&self) -> Vec<String> {
        [&self.profile_picture_key, &self.cv_key, &self.cv_feedback_key]
            .into_iter()
            .flatten()
            .cloned()
            .collect()
    }
}

/// Fields captured when a mentee registers through an invitation.
#[derive(Debug, Default)]
pub struct NewMenteeProfile<'a> {
    pub location: Option<&'a str>,
    pub professional_career: Option<&'a str>,
    pub professional_goal: Option<&'a str>,
    pub languages: LanguageSet,
    pub cv_key: Option<&'a str>,
}
