use anyhow::Context;
use serde::Serialize;
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

/// One mentee row on the mentor dashboard.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MenteeSummary {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub location: Option<String>,
    pub has_pending_tasks: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PendingFilter {
    #[default]
    Any,
    Pending,
    NoPending,
}

impl PendingFilter {
    pub fn from_query(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("pending") => Self::Pending,
            Some("no_pending") => Self::NoPending,
            _ => Self::Any,
        }
    }

    fn as_flag(self) -> Option<bool> {
        match self {
            Self::Any => None,
            Self::Pending => Some(true),
            Self::NoPending => Some(false),
        }
    }
}

/// Substring pattern for `ILIKE` with the wildcards of `raw` matched literally.
pub fn contains_pattern(raw: &str) -> String {
    let mut pattern = String::with_capacity(raw.len() + 2);
    pattern.push('%');
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// The mentor's mentees, filtered by name/email, location and pending work.
pub async fn list_mentees(
    db: impl PgExecutor<'_>,
    mentor_id: Uuid,
    search: Option<&str>,
    location: Option<&str>,
    pending: PendingFilter,
) -> anyhow::Result<Vec<MenteeSummary>> {
    let rows = sqlx::query_as::<_, MenteeSummary>(
        r#"
        SELECT * FROM (
            SELECT u.id, u.username, u.email, p.location,
                   EXISTS (
                       SELECT 1 FROM tasks t WHERE t.mentee_id = u.id AND t.is_done = FALSE
                   ) AS has_pending_tasks
              FROM users u
              LEFT JOIN mentee_profiles p ON p.user_id = u.id
             WHERE u.mentor_id = $1 AND u.is_mentor = FALSE
               AND ($2::text IS NULL
                    OR u.username ILIKE $2
                    OR u.email ILIKE $2)
               AND ($3::text IS NULL OR p.location ILIKE $3)
        ) m
         WHERE ($4::bool IS NULL OR m.has_pending_tasks = $4)
         ORDER BY m.username
        "#,
    )
    .bind(mentor_id)
    .bind(search.map(contains_pattern))
    .bind(location.map(contains_pattern))
    .bind(pending.as_flag())
    .fetch_all(db)
    .await
    .context("list dashboard mentees")?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_filter_from_query() {
        assert_eq!(PendingFilter::from_query(Some("pending")), PendingFilter::Pending);
        assert_eq!(PendingFilter::from_query(Some("no_pending")), PendingFilter::NoPending);
        assert_eq!(PendingFilter::from_query(Some("")), PendingFilter::Any);
        assert_eq!(PendingFilter::from_query(None), PendingFilter::Any);
        assert_eq!(PendingFilter::Pending.as_flag(), Some(true));
    }

    #[test]
    fn search_wildcards_match_literally() {
        assert_eq!(contains_pattern("ana"), "%ana%");
        assert_eq!(contains_pattern("_"), r"%\_%");
        assert_eq!(contains_pattern("50%"), r"%50\%%");
        assert_eq!(contains_pattern(r"a\b"), r"%a\\b%");
    }
}
