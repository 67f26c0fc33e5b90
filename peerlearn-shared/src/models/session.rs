/// Live tutoring sessions
///
/// A session is a scheduled meeting on one of the teacher's approved
/// subjects. Status moves forward only:
///
/// ```text
/// scheduled ──► live ──► completed
///     │           │
///     └───────────┴────► cancelled
/// ```
///
/// # Schema
///
/// ```sql
/// CREATE TYPE session_status AS ENUM ('scheduled', 'live', 'completed', 'cancelled');
///
/// CREATE TABLE sessions (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     subject_id UUID NOT NULL REFERENCES subjects(id) ON DELETE CASCADE,
///     teacher_id UUID NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
///     title VARCHAR(255) NOT NULL,
///     description TEXT,
///     scheduled_at TIMESTAMPTZ NOT NULL,
///     duration_minutes INTEGER NOT NULL CHECK (duration_minutes BETWEEN 15 AND 480),
///     max_students INTEGER NOT NULL CHECK (max_students BETWEEN 1 AND 500),
///     meeting_url VARCHAR(512),
///     status session_status NOT NULL DEFAULT 'scheduled',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

pub const MIN_DURATION_MINUTES: i32 = 15;
pub const MAX_DURATION_MINUTES: i32 = 480;
pub const MAX_STUDENTS_LIMIT: i32 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "session_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Scheduled,
    Live,
    Completed,
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Scheduled => "scheduled",
            SessionStatus::Live => "live",
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Cancelled)
    }

    pub fn can_transition_to(&self, target: SessionStatus) -> bool {
        matches!(
            (self, target),
            (SessionStatus::Scheduled, SessionStatus::Live)
                | (SessionStatus::Live, SessionStatus::Completed)
                | (SessionStatus::Scheduled, SessionStatus::Cancelled)
                | (SessionStatus::Live, SessionStatus::Cancelled)
        )
    }
}

/// Named `TutoringSession` to keep it apart from HTTP and database sessions
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TutoringSession {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub teacher_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub max_students: i32,
    pub meeting_url: Option<String>,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TutoringSession {
    pub fn ends_at(&self) -> DateTime<Utc> {
        self.scheduled_at + Duration::minutes(i64::from(self.duration_minutes))
    }
}

/// Session with its current enrollment count
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SessionListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub session: TutoringSession,
    pub enrolled_count: i64,
}

#[derive(Debug, Clone)]
pub struct CreateSession {
    pub subject_id: Uuid,
    pub teacher_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub max_students: i32,
    pub meeting_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSession {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i32>,
    pub max_students: Option<i32>,
    pub meeting_url: Option<Option<String>>,
}

/// Rejection reasons for session scheduling input
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("scheduled_at must be in the future")]
    NotInFuture,

    #[error("duration_minutes must be between 15 and 480")]
    InvalidDuration,

    #[error("max_students must be between 1 and 500")]
    InvalidCapacity,
}

/// Checks the scheduling fields of a new or edited session
pub fn validate_schedule(
    now: DateTime<Utc>,
    scheduled_at: Option<DateTime<Utc>>,
    duration_minutes: Option<i32>,
    max_students: Option<i32>,
) -> Result<(), ScheduleError> {
    if matches!(scheduled_at, Some(at) if at <= now) {
        return Err(ScheduleError::NotInFuture);
    }
    if matches!(duration_minutes, Some(d) if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&d))
    {
        return Err(ScheduleError::InvalidDuration);
    }
    if matches!(max_students, Some(m) if !(1..=MAX_STUDENTS_LIMIT).contains(&m)) {
        return Err(ScheduleError::InvalidCapacity);
    }
    Ok(())
}

const SESSION_COLUMNS: &str = "id, subject_id, teacher_id, title, description, scheduled_at, \
     duration_minutes, max_students, meeting_url, status, created_at, updated_at";

impl TutoringSession {
    pub async fn create(pool: &PgPool, data: CreateSession) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO sessions (subject_id, teacher_id, title, description, scheduled_at,
                                  duration_minutes, max_students, meeting_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            SESSION_COLUMNS
        );

        sqlx::query_as::<_, TutoringSession>(&sql)
            .bind(data.subject_id)
            .bind(data.teacher_id)
            .bind(data.title)
            .bind(data.description)
            .bind(data.scheduled_at)
            .bind(data.duration_minutes)
            .bind(data.max_students)
            .bind(data.meeting_url)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        executor: impl PgExecutor<'_>,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {} FROM sessions WHERE id = $1", SESSION_COLUMNS);

        sqlx::query_as::<_, TutoringSession>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Locks the session row; enrollment uses this to serialize capacity checks
    pub async fn find_for_update(
        executor: impl PgExecutor<'_>,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM sessions WHERE id = $1 FOR UPDATE",
            SESSION_COLUMNS
        );

        sqlx::query_as::<_, TutoringSession>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Scheduled or live sessions that have not ended yet, soonest first
    pub async fn list_upcoming(
        pool: &PgPool,
        subject_id: Option<Uuid>,
        teacher_id: Option<Uuid>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<SessionListing>, sqlx::Error> {
        sqlx::query_as::<_, SessionListing>(
            r#"
            SELECT s.id, s.subject_id, s.teacher_id, s.title, s.description, s.scheduled_at,
                   s.duration_minutes, s.max_students, s.meeting_url, s.status,
                   s.created_at, s.updated_at,
                   (SELECT COUNT(*) FROM enrollments e WHERE e.session_id = s.id) AS enrolled_count
            FROM sessions s
            WHERE s.status IN ('scheduled', 'live')
              AND s.scheduled_at + make_interval(mins => s.duration_minutes) >= NOW()
              AND ($1::uuid IS NULL OR s.subject_id = $1)
              AND ($2::uuid IS NULL OR s.teacher_id = $2)
            ORDER BY s.scheduled_at ASC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(subject_id)
        .bind(teacher_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    /// Edits a scheduled session owned by `teacher_id`
    pub async fn update(
        executor: impl PgExecutor<'_>,
        id: Uuid,
        teacher_id: Uuid,
        data: UpdateSession,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE sessions SET
                title = COALESCE($3, title),
                description = CASE WHEN $4 THEN $5 ELSE description END,
                scheduled_at = COALESCE($6, scheduled_at),
                duration_minutes = COALESCE($7, duration_minutes),
                max_students = COALESCE($8, max_students),
                meeting_url = CASE WHEN $9 THEN $10 ELSE meeting_url END,
                updated_at = NOW()
            WHERE id = $1 AND teacher_id = $2 AND status = 'scheduled'
            RETURNING {}
            "#,
            SESSION_COLUMNS
        );

        sqlx::query_as::<_, TutoringSession>(&sql)
            .bind(id)
            .bind(teacher_id)
            .bind(data.title)
            .bind(data.description.is_some())
            .bind(data.description.flatten())
            .bind(data.scheduled_at)
            .bind(data.duration_minutes)
            .bind(data.max_students)
            .bind(data.meeting_url.is_some())
            .bind(data.meeting_url.flatten())
            .fetch_optional(executor)
            .await
    }

    /// Moves the session to `target` if it is currently `from`
    ///
    /// Returns `None` when the status changed underneath the caller.
    pub async fn transition(
        pool: &PgPool,
        id: Uuid,
        from: SessionStatus,
        target: SessionStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "UPDATE sessions SET status = $3, updated_at = NOW() \
             WHERE id = $1 AND status = $2 RETURNING {}",
            SESSION_COLUMNS
        );

        sqlx::query_as::<_, TutoringSession>(&sql)
            .bind(id)
            .bind(from)
            .bind(target)
            .fetch_optional(pool)
            .await
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sessions")
            .fetch_one(pool)
            .await
    }

    pub async fn count_for_teacher(pool: &PgPool, teacher_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sessions WHERE teacher_id = $1")
            .bind(teacher_id)
            .fetch_one(pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        use SessionStatus::*;

        assert!(Scheduled.can_transition_to(Live));
        assert!(Live.can_transition_to(Completed));
        assert!(Scheduled.can_transition_to(Cancelled));
        assert!(Live.can_transition_to(Cancelled));

        assert!(!Scheduled.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Scheduled));
        assert!(!Live.can_transition_to(Scheduled));
    }

    #[test]
    fn test_validate_schedule() {
        let now = Utc::now();
        let future = Some(now + Duration::hours(2));

        assert!(validate_schedule(now, future, Some(60), Some(10)).is_ok());
        assert!(validate_schedule(now, None, None, None).is_ok());
        assert_eq!(
            validate_schedule(now, Some(now - Duration::minutes(1)), Some(60), Some(10)),
            Err(ScheduleError::NotInFuture)
        );
        assert_eq!(
            validate_schedule(now, future, Some(14), Some(10)),
            Err(ScheduleError::InvalidDuration)
        );
        assert_eq!(
            validate_schedule(now, future, Some(481), Some(10)),
            Err(ScheduleError::InvalidDuration)
        );
        assert_eq!(
            validate_schedule(now, future, Some(480), Some(0)),
            Err(ScheduleError::InvalidCapacity)
        );
        assert_eq!(
            validate_schedule(now, future, Some(15), Some(501)),
            Err(ScheduleError::InvalidCapacity)
        );
    }
}
