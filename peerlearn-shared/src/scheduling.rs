/// Enrollment in sessions and edits that affect enrolled students
///
/// Enrolling locks the session row so the capacity check and the insert
/// happen atomically; the unique constraint on `(session_id, student_id)`
/// still catches a double enrollment that slips past the pre-check.
/// Editing a session takes the same lock, so a capacity cut and an
/// enrollment cannot interleave, and moves pending reminders with the
/// session's start time.

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::db::violates_constraint;
use crate::models::enrollment::Enrollment;
use crate::models::reminder::{CreateReminder, Reminder};
use crate::models::session::{SessionStatus, TutoringSession, UpdateSession};
use crate::models::setting::{PlatformSetting, SettingKey};

/// Error type for enrollment
#[derive(Debug, thiserror::Error)]
pub enum EnrollmentError {
    #[error("Session not found")]
    SessionNotFound,

    #[error("Session is not open for enrollment")]
    NotScheduled,

    #[error("You cannot enroll in your own session")]
    OwnSession,

    #[error("Session is full")]
    SessionFull,

    #[error("Already enrolled in this session")]
    AlreadyEnrolled,

    #[error("Not enrolled in this session")]
    NotEnrolled,

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Error type for session edits
#[derive(Debug, thiserror::Error)]
pub enum SessionEditError {
    #[error("Session not found")]
    SessionNotFound,

    #[error("Only the session's teacher can edit it")]
    NotOwner,

    #[error("Only scheduled sessions can be edited")]
    NotEditable,

    #[error("{enrolled} students are already enrolled")]
    BelowEnrolled { enrolled: i64 },

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// When a reminder for a session starting at `scheduled_at` fires
///
/// `lead_minutes` before the start, or `now` if that moment has passed.
pub fn reminder_time(
    scheduled_at: DateTime<Utc>,
    lead_minutes: i64,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    (scheduled_at - Duration::minutes(lead_minutes)).max(now)
}

fn reminder_title(session: &TutoringSession) -> String {
    format!("Upcoming session: {}", session.title)
}

fn reminder_body(session: &TutoringSession) -> String {
    format!(
        "Starts at {}",
        session.scheduled_at.format("%Y-%m-%d %H:%M UTC")
    )
}

/// Enrollment together with the session it is for
#[derive(Debug, Clone)]
pub struct EnrollmentOutcome {
    pub enrollment: Enrollment,
    pub session: TutoringSession,
    pub reminder: Reminder,
}

/// Enrolls a student and schedules their reminder
///
/// The reminder fires `reminder_lead_minutes` before the session starts, or
/// immediately when the session is closer than that.
pub async fn enroll(
    pool: &PgPool,
    session_id: Uuid,
    student_id: Uuid,
) -> Result<EnrollmentOutcome, EnrollmentError> {
    let mut tx = pool.begin().await?;

    let session = TutoringSession::find_for_update(&mut *tx, session_id)
        .await?
        .ok_or(EnrollmentError::SessionNotFound)?;

    if session.teacher_id == student_id {
        return Err(EnrollmentError::OwnSession);
    }
    if session.status != SessionStatus::Scheduled {
        return Err(EnrollmentError::NotScheduled);
    }

    let enrolled = Enrollment::count_for_session(&mut *tx, session_id).await?;
    if enrolled >= i64::from(session.max_students) {
        return Err(EnrollmentError::SessionFull);
    }

    let enrollment = Enrollment::insert(&mut *tx, session_id, student_id)
        .await
        .map_err(|e| {
            if violates_constraint(&e, "enrollments_session_student_key") {
                EnrollmentError::AlreadyEnrolled
            } else {
                EnrollmentError::DatabaseError(e)
            }
        })?;

    let lead = PlatformSetting::get_i64(&mut *tx, SettingKey::ReminderLeadMinutes).await?;
    let remind_at = reminder_time(session.scheduled_at, lead, Utc::now());

    let reminder = Reminder::create(
        &mut *tx,
        CreateReminder {
            user_id: student_id,
            session_id: Some(session_id),
            title: reminder_title(&session),
            body: Some(reminder_body(&session)),
            remind_at,
        },
    )
    .await?;

    tx.commit().await?;

    info!(
        session_id = %session_id,
        student_id = %student_id,
        remind_at = %remind_at,
        "Student enrolled"
    );

    Ok(EnrollmentOutcome {
        enrollment,
        session,
        reminder,
    })
}

/// Edits a scheduled session owned by `teacher_id`
///
/// Under the session row lock: refuses to drop `max_students` below the
/// current enrollment, applies the edit and, when the start time or title
/// changed, re-times the pending reminders of every enrolled student.
pub async fn update_session(
    pool: &PgPool,
    session_id: Uuid,
    teacher_id: Uuid,
    data: UpdateSession,
) -> Result<TutoringSession, SessionEditError> {
    let mut tx = pool.begin().await?;

    let current = TutoringSession::find_for_update(&mut *tx, session_id)
        .await?
        .ok_or(SessionEditError::SessionNotFound)?;

    if current.teacher_id != teacher_id {
        return Err(SessionEditError::NotOwner);
    }
    if current.status != SessionStatus::Scheduled {
        return Err(SessionEditError::NotEditable);
    }

    if let Some(max_students) = data.max_students {
        let enrolled = Enrollment::count_for_session(&mut *tx, session_id).await?;
        if i64::from(max_students) < enrolled {
            return Err(SessionEditError::BelowEnrolled { enrolled });
        }
    }

    let updated = TutoringSession::update(&mut *tx, session_id, teacher_id, data)
        .await?
        .ok_or(SessionEditError::NotEditable)?;

    let mut rescheduled = 0;
    if updated.scheduled_at != current.scheduled_at || updated.title != current.title {
        let lead = PlatformSetting::get_i64(&mut *tx, SettingKey::ReminderLeadMinutes).await?;
        rescheduled = Reminder::reschedule_unsent_for_session(
            &mut *tx,
            session_id,
            &reminder_title(&updated),
            Some(&reminder_body(&updated)),
            reminder_time(updated.scheduled_at, lead, Utc::now()),
        )
        .await?;
    }

    tx.commit().await?;

    info!(
        session_id = %session_id,
        scheduled_at = %updated.scheduled_at,
        reminders_rescheduled = rescheduled,
        "Session updated"
    );

    Ok(updated)
}

/// Removes an enrollment and the student's pending reminders for it
pub async fn unenroll(
    pool: &PgPool,
    session_id: Uuid,
    student_id: Uuid,
) -> Result<(), EnrollmentError> {
    let mut tx = pool.begin().await?;

    if !Enrollment::delete(&mut *tx, session_id, student_id).await? {
        return Err(EnrollmentError::NotEnrolled);
    }
    let dropped = Reminder::delete_unsent_for_session(&mut *tx, student_id, session_id).await?;

    tx.commit().await?;

    info!(
        session_id = %session_id,
        student_id = %student_id,
        reminders_dropped = dropped,
        "Student unenrolled"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_reminder_time_leads_the_session() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let start = now + Duration::days(2);

        assert_eq!(reminder_time(start, 30, now), start - Duration::minutes(30));
    }

    #[test]
    fn test_reminder_time_clamps_to_now() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let start = now + Duration::minutes(10);

        assert_eq!(reminder_time(start, 30, now), now);
    }
}
