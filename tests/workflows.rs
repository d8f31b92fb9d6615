//! Workflow tests against a real Postgres (`DATABASE_URL`); run with `cargo test -- --ignored`.

use std::sync::Arc;

use sqlx::PgPool;
use time::{Duration, OffsetDateTime};

use matkamestre::{
    accounts::{repo_types::MenteeProfile, services as accounts},
    auth::{dto::RegisterRequest, repo_types::User, services::register_mentor},
    availability::{repo as slots, services as availability},
    dashboard::{dto::MentorDashboardQuery, services as dashboard},
    error::AppError,
    invitations::{repo as invitation_repo, services as invitations},
    languages::LanguageSet,
    mailer::RecordingMailer,
    state::AppState,
    storage::MemoryStorage,
    tasks::{dto::TaskInput, services as tasks},
    uploads::FormData,
};

struct Harness {
    st: AppState,
    mailer: Arc<RecordingMailer>,
}

fn harness(pool: PgPool) -> Harness {
    let mailer = Arc::new(RecordingMailer::default());
    let st = AppState::from_parts(
        pool,
        Arc::new(AppState::test_config()),
        Arc::new(MemoryStorage::default()),
        mailer.clone(),
    );
    Harness { st, mailer }
}

async fn mentor(st: &AppState, name: &str) -> User {
    register_mentor(
        &st.db,
        RegisterRequest {
            username: name.into(),
            email: format!("{name}@coach.test"),
            password: "abcdef".into(),
            confirm_password: "abcdef".into(),
            professional_career: Some("Recruiter".into()),
            languages: LanguageSet::parse(&["en", "fi"]).unwrap(),
        },
    )
    .await
    .unwrap()
}

fn registration(username: &str, email: &str) -> FormData {
    let mut form = FormData::default();
    form.insert_text("username", username);
    form.insert_text("email", email);
    form.insert_text("password", "abcdef");
    form.insert_text("confirm_password", "abcdef");
    form.insert_text("languages", "fi");
    form.insert_text("location", "Helsinki");
    form
}

fn token_from(body: &str) -> String {
    let (_, rest) = body.split_once("token=").unwrap();
    rest.chars().take_while(|c| c.is_ascii_alphanumeric()).collect()
}

async fn mentee_of(h: &Harness, coach: &User, name: &str) -> User {
    let email = format!("{name}@mentee.test");
    let now = OffsetDateTime::now_utc();
    invitations::invite(&h.st, coach.id, &email, now).await.unwrap();
    let mail = h.mailer.sent().pop().unwrap();
    let token = token_from(&mail.body);
    invitations::redeem(&h.st, Some(&token), registration(name, &email), now)
        .await
        .unwrap()
}

/// `hour:minute` UTC two days from now.
fn at(hour: u8, minute: u8) -> OffsetDateTime {
    (OffsetDateTime::now_utc() + Duration::days(2))
        .date()
        .with_hms(hour, minute, 0)
        .unwrap()
        .assume_utc()
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires postgres"]
async fn invitation_is_redeemed_once(pool: PgPool) {
    let h = harness(pool);
    let coach = mentor(&h.st, "coach").await;
    let now = OffsetDateTime::now_utc();

    invitations::invite(&h.st, coach.id, "a@x.com", now).await.unwrap();
    let mail = h.mailer.sent().pop().unwrap();
    assert_eq!(mail.recipient, "a@x.com");
    assert!(mail.body.contains("http://localhost:8080/register_mentee?token="));
    let token = token_from(&mail.body);

    let user = invitations::redeem(&h.st, Some(&token), registration("ana", "a@x.com"), now)
        .await
        .unwrap();
    assert!(!user.is_mentor);
    assert_eq!(user.mentor_id, Some(coach.id));
    let profile = MenteeProfile::find(&h.st.db, user.id).await.unwrap().unwrap();
    assert_eq!(profile.location.as_deref(), Some("Helsinki"));
    assert_eq!(profile.languages, vec!["fi"]);

    let stored = invitation_repo::find_by_token(&h.st.db, &token).await.unwrap().unwrap();
    assert!(stored.is_used);

    let again = invitations::redeem(&h.st, Some(&token), registration("ana2", "a@x.com"), now)
        .await
        .unwrap_err();
    assert_eq!(again.to_string(), "This invitation link is invalid or has expired.");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires postgres"]
async fn expired_token_is_rejected(pool: PgPool) {
    let h = harness(pool);
    let coach = mentor(&h.st, "coach").await;
    let now = OffsetDateTime::now_utc();
    invitation_repo::create(&h.st.db, "expiredtoken", "b@x.com", coach.id, now - Duration::hours(1))
        .await
        .unwrap();

    let err = invitations::redeem(&h.st, Some("expiredtoken"), registration("bo", "b@x.com"), now)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let unknown = invitations::lookup(&h.st, Some("nope"), now).await.unwrap_err();
    assert!(matches!(unknown, AppError::NotFound(_)));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires postgres"]
async fn failed_delivery_rolls_back_the_token(pool: PgPool) {
    let h = harness(pool);
    let coach = mentor(&h.st, "coach").await;
    let now = OffsetDateTime::now_utc();

    h.mailer.set_failing(true);
    let err = invitations::invite(&h.st, coach.id, "c@x.com", now).await.unwrap_err();
    assert!(matches!(err, AppError::Internal(_)));
    assert!(!invitation_repo::has_active_for_email(&h.st.db, "c@x.com", now).await.unwrap());

    h.mailer.set_failing(false);
    invitations::invite(&h.st, coach.id, "c@x.com", now).await.unwrap();
    let dup = invitations::invite(&h.st, coach.id, "c@x.com", now).await.unwrap_err();
    assert!(matches!(dup, AppError::Conflict(_)));

    let registered = invitations::invite(&h.st, coach.id, "coach@coach.test", now)
        .await
        .unwrap_err();
    assert!(matches!(registered, AppError::Conflict(_)));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires postgres"]
async fn overlapping_slots_are_rejected(pool: PgPool) {
    let h = harness(pool);
    let coach = mentor(&h.st, "coach").await;
    let now = OffsetDateTime::now_utc();

    availability::set_availability(&h.st.db, coach.id, at(10, 0), at(11, 0), now)
        .await
        .unwrap();
    let clash = availability::set_availability(&h.st.db, coach.id, at(10, 30), at(11, 30), now)
        .await
        .unwrap_err();
    assert!(matches!(clash, AppError::Validation(_)));
    let adjacent = availability::set_availability(&h.st.db, coach.id, at(11, 0), at(12, 0), now)
        .await
        .unwrap();

    let moved_onto_first =
        availability::edit_availability(&h.st.db, coach.id, adjacent.id, at(10, 45), at(11, 45), now)
            .await
            .unwrap_err();
    assert!(matches!(moved_onto_first, AppError::Validation(_)));
    // Moving within its own window does not clash with itself.
    availability::edit_availability(&h.st.db, coach.id, adjacent.id, at(11, 15), at(12, 0), now)
        .await
        .unwrap();

    let other = mentor(&h.st, "other").await;
    availability::set_availability(&h.st.db, other.id, at(10, 0), at(11, 0), now)
        .await
        .unwrap();
    assert_eq!(slots::list_for_mentor(&h.st.db, coach.id).await.unwrap().len(), 2);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires postgres"]
async fn mentee_books_only_their_mentors_open_slots(pool: PgPool) {
    let h = harness(pool);
    let coach = mentor(&h.st, "coach").await;
    let other = mentor(&h.st, "other").await;
    let mentee = mentee_of(&h, &coach, "ana").await;
    let now = OffsetDateTime::now_utc();

    let own = availability::set_availability(&h.st.db, coach.id, at(9, 0), at(10, 0), now)
        .await
        .unwrap();
    let foreign = availability::set_availability(&h.st.db, other.id, at(9, 0), at(10, 0), now)
        .await
        .unwrap();

    let booked = availability::book_slot(&h.st.db, mentee.id, own.id, now).await.unwrap();
    assert!(booked.is_booked);
    assert_eq!(booked.mentee_id, Some(mentee.id));

    let twice = availability::book_slot(&h.st.db, mentee.id, own.id, now).await.unwrap_err();
    assert!(matches!(twice, AppError::NotFound(_)));
    let elsewhere = availability::book_slot(&h.st.db, mentee.id, foreign.id, now)
        .await
        .unwrap_err();
    assert!(matches!(elsewhere, AppError::NotFound(_)));

    let locked = availability::delete_availability(&h.st.db, coach.id, own.id)
        .await
        .unwrap_err();
    assert!(matches!(locked, AppError::Forbidden(_)));

    let released = availability::cancel_booking(&h.st.db, mentee.id, own.id, now).await.unwrap();
    assert!(!released.is_booked);
    availability::book_slot(&h.st.db, mentee.id, own.id, now).await.unwrap();
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires postgres"]
async fn profile_update_needs_current_password(pool: PgPool) {
    let h = harness(pool);
    let coach = mentor(&h.st, "coach").await;

    let mut form = FormData::default();
    form.insert_text("username", "renamed");
    form.insert_text("bio", "New bio");
    let err = accounts::update_mentor_profile(&h.st, coach.id, form).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let unchanged = accounts::get_mentor_profile(&h.st, coach.id).await.unwrap();
    assert_eq!(unchanged.user.username, "coach");
    assert_eq!(unchanged.bio, None);

    let mut form = FormData::default();
    form.insert_text("current_password", "abcdef");
    form.insert_text("bio", "New bio");
    let updated = accounts::update_mentor_profile(&h.st, coach.id, form).await.unwrap();
    assert_eq!(updated.bio.as_deref(), Some("New bio"));
    assert_eq!(updated.professional_career.as_deref(), Some("Recruiter"));
    assert_eq!(updated.formatted_languages, "English, Finnish");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires postgres"]
async fn deleting_a_mentee_releases_their_slots(pool: PgPool) {
    let h = harness(pool);
    let coach = mentor(&h.st, "coach").await;
    let mentee = mentee_of(&h, &coach, "ana").await;
    let stranger = mentor(&h.st, "stranger").await;
    let now = OffsetDateTime::now_utc();

    let slot = availability::set_availability(&h.st.db, coach.id, at(14, 0), at(15, 0), now)
        .await
        .unwrap();
    availability::book_slot(&h.st.db, mentee.id, slot.id, now).await.unwrap();

    let denied = accounts::delete_mentee(&h.st, stranger.id, mentee.id, Some("abcdef"))
        .await
        .unwrap_err();
    assert!(matches!(denied, AppError::Forbidden(_)));
    let wrong = accounts::delete_mentee(&h.st, coach.id, mentee.id, Some("wrong!"))
        .await
        .unwrap_err();
    assert!(matches!(wrong, AppError::Forbidden(_)));

    accounts::delete_mentee(&h.st, coach.id, mentee.id, Some("abcdef"))
        .await
        .unwrap();
    assert!(User::find_by_id(&h.st.db, mentee.id).await.unwrap().is_none());

    let after = slots::find_owned(&h.st.db, slot.id, coach.id).await.unwrap().unwrap();
    assert!(!after.is_booked);
    assert_eq!(after.mentee_id, None);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires postgres"]
async fn tasks_complete_once(pool: PgPool) {
    let h = harness(pool);
    let coach = mentor(&h.st, "coach").await;
    let mentee = mentee_of(&h, &coach, "ana").await;
    let now = OffsetDateTime::now_utc();

    let input = TaskInput {
        title: Some("Polish CV".into()),
        description: Some("Tailor it to data roles".into()),
        due_date: None,
    };
    let task = tasks::create_task(&h.st.db, coach.id, mentee.id, &input, now)
        .await
        .unwrap();

    let done = tasks::complete_task(&h.st.db, mentee.id, task.id).await.unwrap();
    assert!(done.is_done);
    let again = tasks::complete_task(&h.st.db, mentee.id, task.id).await.unwrap_err();
    assert!(matches!(again, AppError::NotFound(_)));

    let reopened = tasks::toggle_task_status(&h.st.db, coach.id, task.id).await.unwrap();
    assert!(!reopened.is_done);

    let other = mentor(&h.st, "other").await;
    let foreign = tasks::create_task(&h.st.db, other.id, mentee.id, &input, now)
        .await
        .unwrap_err();
    assert!(matches!(foreign, AppError::NotFound(_)));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires postgres"]
async fn concurrent_bookings_have_one_winner(pool: PgPool) {
    let h = harness(pool);
    let coach = mentor(&h.st, "coach").await;
    let ana = mentee_of(&h, &coach, "ana").await;
    let bo = mentee_of(&h, &coach, "bo").await;
    let now = OffsetDateTime::now_utc();

    for hour in 0..10 {
        let slot = availability::set_availability(&h.st.db, coach.id, at(hour, 0), at(hour, 30), now)
            .await
            .unwrap();
        let (first, second) = tokio::join!(
            availability::book_slot(&h.st.db, ana.id, slot.id, now),
            availability::book_slot(&h.st.db, bo.id, slot.id, now),
        );
        let winners = [&first, &second].iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1, "round {hour}");
        let loser = if first.is_ok() { second } else { first };
        assert!(matches!(loser, Err(AppError::NotFound(_))));
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires postgres"]
async fn concurrent_overlapping_slots_are_validation_errors(pool: PgPool) {
    let h = harness(pool);
    let coach = mentor(&h.st, "coach").await;
    let now = OffsetDateTime::now_utc();

    for hour in 0..10 {
        let (first, second) = tokio::join!(
            availability::set_availability(&h.st.db, coach.id, at(hour, 0), at(hour, 45), now),
            availability::set_availability(&h.st.db, coach.id, at(hour, 15), at(hour, 55), now),
        );
        let created = [&first, &second].iter().filter(|r| r.is_ok()).count();
        assert_eq!(created, 1, "round {hour}");
        let loser = if first.is_ok() { second } else { first };
        assert!(matches!(loser, Err(AppError::Validation(_))));
    }
    assert_eq!(slots::list_for_mentor(&h.st.db, coach.id).await.unwrap().len(), 10);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires postgres"]
async fn booked_slots_cannot_be_edited(pool: PgPool) {
    let h = harness(pool);
    let coach = mentor(&h.st, "coach").await;
    let mentee = mentee_of(&h, &coach, "ana").await;
    let now = OffsetDateTime::now_utc();

    let slot = availability::set_availability(&h.st.db, coach.id, at(13, 0), at(14, 0), now)
        .await
        .unwrap();
    availability::book_slot(&h.st.db, mentee.id, slot.id, now).await.unwrap();

    let err = availability::edit_availability(&h.st.db, coach.id, slot.id, at(15, 0), at(16, 0), now)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    let unchanged = slots::find_owned(&h.st.db, slot.id, coach.id).await.unwrap().unwrap();
    assert_eq!(unchanged.start_time, at(13, 0));
    assert_eq!(unchanged.mentee_id, Some(mentee.id));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires postgres"]
async fn slot_starting_now_is_not_bookable(pool: PgPool) {
    let h = harness(pool);
    let coach = mentor(&h.st, "coach").await;
    let mentee = mentee_of(&h, &coach, "ana").await;
    let now = OffsetDateTime::now_utc();

    let slot = availability::set_availability(&h.st.db, coach.id, at(16, 0), at(17, 0), now)
        .await
        .unwrap();
    let started = availability::book_slot(&h.st.db, mentee.id, slot.id, slot.start_time)
        .await
        .unwrap_err();
    assert!(matches!(started, AppError::NotFound(_)));

    let just_before = slot.start_time - Duration::seconds(1);
    availability::book_slot(&h.st.db, mentee.id, slot.id, just_before)
        .await
        .unwrap();
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires postgres"]
async fn rejected_registration_keeps_the_invitation(pool: PgPool) {
    let h = harness(pool);
    let coach = mentor(&h.st, "coach").await;
    let now = OffsetDateTime::now_utc();

    invitations::invite(&h.st, coach.id, "d@x.com", now).await.unwrap();
    let token = token_from(&h.mailer.sent().pop().unwrap().body);

    let wrong_email = invitations::redeem(&h.st, Some(&token), registration("dee", "other@x.com"), now)
        .await
        .unwrap_err();
    assert!(matches!(wrong_email, AppError::Validation(_)));

    let taken = invitations::redeem(&h.st, Some(&token), registration("coach", "d@x.com"), now)
        .await
        .unwrap_err();
    assert!(matches!(taken, AppError::Conflict(_)));

    let mut mismatch = FormData::default();
    mismatch.insert_text("username", "dee");
    mismatch.insert_text("email", "d@x.com");
    mismatch.insert_text("password", "abcdef");
    mismatch.insert_text("confirm_password", "fedcba");
    let password = invitations::redeem(&h.st, Some(&token), mismatch, now)
        .await
        .unwrap_err();
    assert!(matches!(password, AppError::Validation(_)));

    let stored = invitation_repo::find_by_token(&h.st.db, &token).await.unwrap().unwrap();
    assert!(stored.is_active(now));
    assert!(User::find_by_email(&h.st.db, "d@x.com").await.unwrap().is_none());

    let user = invitations::redeem(&h.st, Some(&token), registration("dee", "d@x.com"), now)
        .await
        .unwrap();
    assert_eq!(user.mentor_id, Some(coach.id));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires postgres"]
async fn mentees_complete_only_their_own_tasks(pool: PgPool) {
    let h = harness(pool);
    let coach = mentor(&h.st, "coach").await;
    let ana = mentee_of(&h, &coach, "ana").await;
    let bo = mentee_of(&h, &coach, "bo").await;
    let now = OffsetDateTime::now_utc();

    let input = TaskInput {
        title: Some("Mock interview".into()),
        description: Some("Prepare three stories".into()),
        due_date: None,
    };
    let task = tasks::create_task(&h.st.db, coach.id, ana.id, &input, now)
        .await
        .unwrap();

    let err = tasks::complete_task(&h.st.db, bo.id, task.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    let done = tasks::complete_task(&h.st.db, ana.id, task.id).await.unwrap();
    assert!(done.is_done);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires postgres"]
async fn mentee_profile_is_created_lazily(pool: PgPool) {
    let h = harness(pool);
    let coach = mentor(&h.st, "coach").await;
    let mentee = mentee_of(&h, &coach, "ana").await;

    sqlx::query("DELETE FROM mentee_profiles WHERE user_id = $1")
        .bind(mentee.id)
        .execute(&h.st.db)
        .await
        .unwrap();

    let view = accounts::get_mentee_profile(&h.st, mentee.id).await.unwrap();
    assert_eq!(view.user.username, "ana");
    assert!(MenteeProfile::find(&h.st.db, mentee.id).await.unwrap().is_some());

    let mentor_row: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM mentor_profiles WHERE user_id = $1)")
            .bind(mentee.id)
            .fetch_one(&h.st.db)
            .await
            .unwrap();
    assert!(!mentor_row);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires postgres"]
async fn dashboard_search_treats_wildcards_literally(pool: PgPool) {
    let h = harness(pool);
    let coach = mentor(&h.st, "coach").await;
    mentee_of(&h, &coach, "ana").await;
    mentee_of(&h, &coach, "bo").await;
    let now = OffsetDateTime::now_utc();

    let search = |q: &str| MentorDashboardQuery {
        q: Some(q.into()),
        ..Default::default()
    };
    let all = dashboard::mentor_dashboard(&h.st, coach.id, MentorDashboardQuery::default(), now)
        .await
        .unwrap();
    assert_eq!(all.total_mentees, 2);

    let underscore = dashboard::mentor_dashboard(&h.st, coach.id, search("_"), now)
        .await
        .unwrap();
    assert!(underscore.mentees.is_empty());
    let percent = dashboard::mentor_dashboard(&h.st, coach.id, search("%"), now)
        .await
        .unwrap();
    assert!(percent.mentees.is_empty());

    let ana = dashboard::mentor_dashboard(&h.st, coach.id, search("AN"), now)
        .await
        .unwrap();
    assert_eq!(ana.mentees.len(), 1);
    assert_eq!(ana.mentees[0].username, "ana");
}
