use time::OffsetDateTime;
use uuid::Uuid;

use super::{
    dto::{AppliedFilters, MentorDashboard, MentorDashboardQuery, MenteeDashboard},
    repo::{self, PendingFilter},
};
use crate::{
    accounts::{
        repo_types::{MenteeProfile, MentorProfile},
        services::{load_user, mentee_view, mentor_view},
    },
    auth::repo_types::User,
    availability, recordings,
    error::AppResult,
    state::AppState,
    tasks,
};

fn filter_value(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

pub async fn mentor_dashboard(
    st: &AppState,
    mentor_id: Uuid,
    query: MentorDashboardQuery,
    now: OffsetDateTime,
) -> AppResult<MentorDashboard> {
    let user = load_user(st, mentor_id).await?;
    let search = filter_value(&query.q);
    let location = filter_value(&query.location);
    let pending = PendingFilter::from_query(query.task_status.as_deref());

    let mentees = repo::list_mentees(&st.db, mentor_id, search, location, pending).await?;
    let reserved_slots = availability::repo::list_reserved(&st.db, mentor_id, None, now).await?;
    let profile = MentorProfile::get_or_create(&st.db, mentor_id).await?;

    Ok(MentorDashboard {
        total_mentees: mentees.len(),
        mentees,
        reserved_slots,
        mentor_profile: mentor_view(st, &user, profile).await?,
        filters: AppliedFilters {
            q: search.unwrap_or_default().to_string(),
            location: location.unwrap_or_default().to_string(),
            task_status: query.task_status.unwrap_or_default(),
        },
    })
}

pub async fn mentee_dashboard(
    st: &AppState,
    mentee_id: Uuid,
    now: OffsetDateTime,
) -> AppResult<MenteeDashboard> {
    let user = load_user(st, mentee_id).await?;
    let profile = MenteeProfile::get_or_create(&st.db, mentee_id).await?;

    let tasks = tasks::repo::list_for_mentee(&st.db, mentee_id).await?;
    let completed_tasks_count = tasks.iter().filter(|t| t.is_done).count();
    let pending_tasks_count = tasks.len() - completed_tasks_count;

    let mentor = match user.mentor_id {
        Some(id) => User::find_by_id(&st.db, id).await?,
        None => None,
    };
    let (available_slots, reserved_slots, mentor_profile) = match mentor {
        Some(mentor) => {
            let open = availability::repo::list_open(&st.db, mentor.id, now).await?;
            let reserved =
                availability::repo::list_reserved(&st.db, mentor.id, Some(mentee_id), now).await?;
            let profile = MentorProfile::get_or_create(&st.db, mentor.id).await?;
            (open, reserved, Some(mentor_view(st, &mentor, profile).await?))
        }
        None => (Vec::new(), Vec::new(), None),
    };

    let recordings = recordings::repo::list_for_mentee(&st.db, mentee_id).await?;
    let mentee_profile = mentee_view(st, &user, profile).await?;

    Ok(MenteeDashboard {
        tasks,
        completed_tasks_count,
        pending_tasks_count,
        available_slots,
        reserved_slots,
        recordings: recordings::services::present_all(st, recordings).await?,
        formatted_languages: mentee_profile.formatted_languages.clone(),
        mentor_profile,
        mentee_profile,
    })
}
