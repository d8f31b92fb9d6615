use serde::{Deserialize, Serialize};

use super::repo::MenteeSummary;
use crate::{
    accounts::dto::{MenteeProfileView, MentorProfileView},
    availability::repo_types::Slot,
    recordings::repo_types::RecordingView,
    tasks::repo_types::Task,
};

#[derive(Debug, Default, Deserialize)]
pub struct MentorDashboardQuery {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub task_status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AppliedFilters {
    pub q: String,
    pub location: String,
    pub task_status: String,
}

#[derive(Debug, Serialize)]
pub struct MentorDashboard {
    pub mentees: Vec<MenteeSummary>,
    pub total_mentees: usize,
    pub reserved_slots: Vec<Slot>,
    pub mentor_profile: MentorProfileView,
    pub filters: AppliedFilters,
}

#[derive(Debug, Serialize)]
pub struct MenteeDashboard {
    pub tasks: Vec<Task>,
    pub completed_tasks_count: usize,
    pub pending_tasks_count: usize,
    pub available_slots: Vec<Slot>,
    pub reserved_slots: Vec<Slot>,
    pub recordings: Vec<RecordingView>,
    pub mentor_profile: Option<MentorProfileView>,
    pub mentee_profile: MenteeProfileView,
    pub formatted_languages: String,
}
