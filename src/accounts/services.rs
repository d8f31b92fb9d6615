use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{MenteeDetail, MenteeProfileView, MentorProfileView},
    repo_types::{MenteeProfile, MentorProfile},
};
use crate::{
    auth::{
        dto::PublicUser,
        password::hash_password_blocking,
        repo_types::User,
        services::{check_new_password, clean_email, clean_username, confirm_password, user_write_error},
    },
    availability, recordings,
    error::{AppError, AppResult},
    languages::LanguageSet,
    state::AppState,
    tasks,
    uploads::{self, check_pdf, check_picture, FormData, UploadItem},
};

const MENTOR_PICTURES: &str = "profiles/mentor";
const MENTEE_PICTURES: &str = "profiles/mentee";
pub const CV_FILES: &str = "mentee_files/cv";

/// Validated account part of a profile form.
#[derive(Debug)]
pub struct AccountChanges {
    pub username: String,
    pub email: String,
    pub password_hash: Option<String>,
}

pub async fn load_user(st: &AppState, id: Uuid) -> AppResult<User> {
    User::find_by_id(&st.db, id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))
}

/// Re-checks the current password, then validates username, email and an optional new password.
pub async fn prepare_account_update(
    st: &AppState,
    user: &User,
    form: &FormData,
    missing_password: &str,
) -> AppResult<AccountChanges> {
    confirm_password(user, form.text("current_password"), missing_password).await?;

    let username = match form.text("username") {
        Some(name) => clean_username(name)?,
        None => user.username.clone(),
    };
    let email = match form.text("email") {
        Some(email) => clean_email(email)?,
        None => user.email.clone(),
    };

    if User::username_taken(&st.db, &username, Some(user.id)).await? {
        return Err(AppError::conflict(
            "Username already exists. Please choose a different one.",
        ));
    }
    if User::email_taken(&st.db, &email, Some(user.id)).await? {
        return Err(AppError::conflict("This email is already used."));
    }

    let new_password = form.text("new_password").unwrap_or_default();
    let confirm = form.text("confirm_password").unwrap_or_default();
    let password_hash = if new_password.is_empty() && confirm.is_empty() {
        None
    } else {
        check_new_password(new_password, confirm)?;
        Some(hash_password_blocking(new_password.to_string()).await?)
    };

    Ok(AccountChanges {
        username,
        email,
        password_hash,
    })
}

/// Submitted value wins (blank clears); an omitted field keeps `current`.
fn merged(form: &FormData, name: &str, current: Option<String>) -> Option<String> {
    if form.has(name) {
        form.non_empty(name)
    } else {
        current
    }
}

fn merged_languages(form: &FormData, current: Vec<String>) -> AppResult<Vec<String>> {
    if form.has("languages") {
        Ok(LanguageSet::parse(&form.list("languages"))?.to_codes())
    } else {
        Ok(current)
    }
}

fn take_picture(form: &mut FormData) -> AppResult<Option<UploadItem>> {
    let picture = form.take_file("profile_picture");
    if let Some(item) = &picture {
        check_picture(item)?;
    }
    Ok(picture)
}

async fn store_opt(
    st: &AppState,
    prefix: &str,
    owner: Uuid,
    item: Option<UploadItem>,
    stored: &mut Vec<String>,
) -> AppResult<Option<String>> {
    let Some(item) = item else {
        return Ok(None);
    };
    match uploads::store(st, prefix, owner, item).await {
        Ok(key) => {
            stored.push(key.clone());
            Ok(Some(key))
        }
        Err(e) => {
            uploads::discard(st, stored).await;
            Err(e.into())
        }
    }
}

pub async fn mentor_view(st: &AppState, user: &User, profile: MentorProfile) -> AppResult<MentorProfileView> {
    let languages = profile.language_set();
    Ok(MentorProfileView {
        user: PublicUser::from(user),
        profile_picture_url: uploads::presign_opt(st, profile.profile_picture_key.as_deref()).await?,
        formatted_languages: languages.display(),
        languages,
        bio: profile.bio,
        professional_career: profile.professional_career,
    })
}

pub async fn mentee_view(st: &AppState, user: &User, profile: MenteeProfile) -> AppResult<MenteeProfileView> {
    let languages = profile.language_set();
    Ok(MenteeProfileView {
        user: PublicUser::from(user),
        profile_picture_url: uploads::presign_opt(st, profile.profile_picture_key.as_deref()).await?,
        cv_url: uploads::presign_opt(st, profile.cv_key.as_deref()).await?,
        cv_feedback_url: uploads::presign_opt(st, profile.cv_feedback_key.as_deref()).await?,
        formatted_languages: languages.display(),
        languages,
        bio: profile.bio,
        location: profile.location,
        professional_career: profile.professional_career,
        professional_goal: profile.professional_goal,
    })
}

pub async fn get_mentor_profile(st: &AppState, mentor_id: Uuid) -> AppResult<MentorProfileView> {
    let user = load_user(st, mentor_id).await?;
    let profile = MentorProfile::get_or_create(&st.db, mentor_id).await?;
    mentor_view(st, &user, profile).await
}

pub async fn get_mentee_profile(st: &AppState, mentee_id: Uuid) -> AppResult<MenteeProfileView> {
    let user = load_user(st, mentee_id).await?;
    let profile = MenteeProfile::get_or_create(&st.db, mentee_id).await?;
    mentee_view(st, &user, profile).await
}

pub async fn update_mentor_profile(
    st: &AppState,
    mentor_id: Uuid,
    mut form: FormData,
) -> AppResult<MentorProfileView> {
    let user = load_user(st, mentor_id).await?;
    let account = prepare_account_update(
        st,
        &user,
        &form,
        "Please enter your current password to update your profile.",
    )
    .await?;
    let picture = take_picture(&mut form)?;

    let current = MentorProfile::get_or_create(&st.db, mentor_id).await?;
    let mut next = current.clone();
    next.bio = merged(&form, "bio", current.bio.clone());
    next.professional_career = merged(&form, "professional_career", current.professional_career.clone());
    next.languages = merged_languages(&form, current.languages.clone())?;

    let mut stored = Vec::new();
    if let Some(key) = store_opt(st, MENTOR_PICTURES, mentor_id, picture, &mut stored).await? {
        next.profile_picture_key = Some(key);
    }

    let saved = async {
        let mut tx = st.db.begin().await?;
        let user = User::update_account(
            &mut *tx,
            mentor_id,
            &account.username,
            &account.email,
            account.password_hash.as_deref(),
        )
        .await
        .map_err(user_write_error)?;
        let profile = next.save(&mut *tx).await?;
        tx.commit().await?;
        Ok::<_, AppError>((user, profile))
    }
    .await;

    let (user, profile) = match saved {
        Ok(v) => v,
        Err(e) => {
            warn!(user_id = %mentor_id, error = %e, "mentor profile update failed");
            uploads::discard(st, &stored).await;
            return Err(e);
        }
    };
    if profile.profile_picture_key != current.profile_picture_key {
        uploads::discard(st, &current.profile_picture_key.into_iter().collect::<Vec<_>>()).await;
    }

    info!(user_id = %mentor_id, password_changed = account.password_hash.is_some(), "mentor profile updated");
    mentor_view(st, &user, profile).await
}

pub async fn update_mentee_profile(
    st: &AppState,
    mentee_id: Uuid,
    mut form: FormData,
) -> AppResult<MenteeProfileView> {
    let user = load_user(st, mentee_id).await?;
    let account = prepare_account_update(
        st,
        &user,
        &form,
        "Please, enter your current password to updated info.",
    )
    .await?;
    let picture = take_picture(&mut form)?;
    let cv = form.take_file("cv_file");
    if let Some(item) = &cv {
        check_pdf(item, "CV")?;
    }

    let current = MenteeProfile::get_or_create(&st.db, mentee_id).await?;
    let mut next = current.clone();
    next.bio = merged(&form, "bio", current.bio.clone());
    next.location = merged(&form, "location", current.location.clone());
    next.professional_career = merged(&form, "professional_career", current.professional_career.clone());
    next.professional_goal = merged(&form, "professional_goal", current.professional_goal.clone());
    next.languages = merged_languages(&form, current.languages.clone())?;

    let mut stored = Vec::new();
    if let Some(key) = store_opt(st, MENTEE_PICTURES, mentee_id, picture, &mut stored).await? {
        next.profile_picture_key = Some(key);
    }
    if let Some(key) = store_opt(st, CV_FILES, mentee_id, cv, &mut stored).await? {
        next.cv_key = Some(key);
    }

    let saved = async {
        let mut tx = st.db.begin().await?;
        let user = User::update_account(
            &mut *tx,
            mentee_id,
            &account.username,
            &account.email,
            account.password_hash.as_deref(),
        )
        .await
        .map_err(user_write_error)?;
        let profile = next.save(&mut *tx).await?;
        tx.commit().await?;
        Ok::<_, AppError>((user, profile))
    }
    .await;

    let (user, profile) = match saved {
        Ok(v) => v,
        Err(e) => {
            warn!(user_id = %mentee_id, error = %e, "mentee profile update failed");
            uploads::discard(st, &stored).await;
            return Err(e);
        }
    };
    let mut replaced = Vec::new();
    if profile.profile_picture_key != current.profile_picture_key {
        replaced.extend(current.profile_picture_key);
    }
    if profile.cv_key != current.cv_key {
        replaced.extend(current.cv_key);
    }
    uploads::discard(st, &replaced).await;

    info!(user_id = %mentee_id, password_changed = account.password_hash.is_some(), "mentee profile updated");
    mentee_view(st, &user, profile).await
}

/// Profile of the caller's mentor, or the caller's own when they are a mentor.
pub async fn assigned_mentor_profile(st: &AppState, user_id: Uuid) -> AppResult<MentorProfileView> {
    let user = load_user(st, user_id).await?;
    let mentor_id = if user.is_mentor {
        user.id
    } else {
        user.mentor_id
            .ok_or_else(|| AppError::not_found("Coach profile not found. Contact your coach."))?
    };
    let mentor = User::find_by_id(&st.db, mentor_id)
        .await?
        .ok_or_else(|| AppError::not_found("Coach profile not found. Contact your coach."))?;
    let profile = MentorProfile::get_or_create(&st.db, mentor_id).await?;
    mentor_view(st, &mentor, profile).await
}

/// Full view of one assigned mentee for their mentor.
pub async fn mentee_detail(
    st: &AppState,
    mentor_id: Uuid,
    mentee_id: Uuid,
    now: OffsetDateTime,
) -> AppResult<MenteeDetail> {
    let mentee = User::find_by_id(&st.db, mentee_id)
        .await?
        .filter(|u| !u.is_mentor)
        .ok_or_else(|| AppError::not_found("Mentee not found."))?;
    if mentee.mentor_id != Some(mentor_id) {
        warn!(%mentor_id, %mentee_id, "mentor opened a mentee of another mentor");
        return Err(AppError::forbidden(
            "Access denied. You can only view profiles of your assigned mentees.",
        ));
    }

    let profile = MenteeProfile::get_or_create(&st.db, mentee_id).await?;
    let tasks = tasks::repo::list_for_review(&st.db, mentor_id, mentee_id).await?;
    let recordings = recordings::repo::list_for_pair(&st.db, mentor_id, mentee_id).await?;
    let reserved_slots =
        availability::repo::list_reserved(&st.db, mentor_id, Some(mentee_id), now).await?;

    Ok(MenteeDetail {
        profile: mentee_view(st, &mentee, profile).await?,
        tasks,
        recordings: recordings::services::present_all(st, recordings).await?,
        reserved_slots,
    })
}

/// Deletes a mentee account: the mentee themself or their mentor, after password re-entry.
pub async fn delete_mentee(
    st: &AppState,
    requester_id: Uuid,
    target_id: Uuid,
    password: Option<&str>,
) -> AppResult<()> {
    let requester = load_user(st, requester_id).await?;
    let target = User::find_by_id(&st.db, target_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found."))?;

    let is_self = requester.id == target.id;
    let is_their_mentor = target.mentor_id == Some(requester.id);
    if !is_self && !is_their_mentor {
        warn!(%requester_id, %target_id, "mentee deletion not permitted");
        return Err(AppError::forbidden(
            "You do not have permission to delete this account.",
        ));
    }
    confirm_password(&requester, password, "Please enter your password.").await?;
    if target.is_mentor {
        return Err(AppError::validation(
            "This user is not a Mentee and can not be deleted.",
        ));
    }

    let mut tx = st.db.begin().await?;
    let profile = MenteeProfile::find(&mut *tx, target_id).await?;
    let released = availability::repo::release_for_mentee(&mut *tx, target_id).await?;
    User::delete(&mut *tx, target_id).await?;
    tx.commit().await?;

    if let Some(profile) = profile {
        uploads::discard(st, &profile.object_keys()).await;
    }
    info!(%requester_id, mentee_id = %target_id, released_slots = released, "mentee deleted");
    Ok(())
}

/// A mentor deletes their own account; their mentees stay, unassigned.
pub async fn delete_mentor(
    st: &AppState,
    requester_id: Uuid,
    target_id: Uuid,
    password: Option<&str>,
) -> AppResult<()> {
    if requester_id != target_id {
        warn!(%requester_id, %target_id, "mentor deletion not permitted");
        return Err(AppError::forbidden(
            "You do not have permission to delete this account.",
        ));
    }
    let user = load_user(st, requester_id).await?;
    confirm_password(&user, password, "Please enter your password.").await?;

    let mut tx = st.db.begin().await?;
    let profile = MentorProfile::get_or_create(&mut *tx, requester_id).await?;
    User::delete(&mut *tx, requester_id).await?;
    tx.commit().await?;

    uploads::discard(st, &profile.profile_picture_key.into_iter().collect::<Vec<_>>()).await;
    info!(mentor_id = %requester_id, "mentor account deleted");
    Ok(())
}
