use serde::Serialize;

use crate::{
    auth::dto::PublicUser, availability::repo_types::Slot, languages::LanguageSet,
    recordings::repo_types::RecordingView, tasks::repo_types::Task,
};

#[derive(Debug, Serialize)]
pub struct MentorProfileView {
    pub user: PublicUser,
    pub bio: Option<String>,
    pub professional_career: Option<String>,
    pub languages: LanguageSet,
    pub formatted_languages: String,
    pub profile_picture_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MenteeProfileView {
    pub user: PublicUser,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub languages: LanguageSet,
    pub formatted_languages: String,
    pub professional_career: Option<String>,
    pub professional_goal: Option<String>,
    pub cv_url: Option<String>,
    pub cv_feedback_url: Option<String>,
    pub profile_picture_url: Option<String>,
}

/// What a mentor sees when opening one of their mentees.
#[derive(Debug, Serialize)]
pub struct MenteeDetail {
    pub profile: MenteeProfileView,
    pub tasks: Vec<Task>,
    pub recordings: Vec<RecordingView>,
    pub reserved_slots: Vec<Slot>,
}
