/// Turns due reminders into notifications
///
/// One call is one pass: claim a batch of due reminders with
/// `FOR UPDATE SKIP LOCKED`, write a notification for each, mark the batch
/// sent and commit. Notifications are published to the realtime hub only
/// after the commit, so a rolled-back pass never reaches a client. A failed
/// pass leaves its reminders unsent and the next pass picks them up.

use sqlx::PgPool;
use tracing::{debug, info};

use crate::models::notification::{CreateNotification, Notification, NotificationKind};
use crate::models::reminder::Reminder;
use crate::notify;
use crate::realtime::RealtimeHub;

/// Default number of reminders claimed per pass
pub const DEFAULT_BATCH_SIZE: i64 = 100;

/// Dispatches up to `batch_size` due reminders; returns how many were sent
pub async fn dispatch_due_reminders(
    pool: &PgPool,
    hub: &RealtimeHub,
    batch_size: i64,
) -> Result<usize, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let due = Reminder::claim_due(&mut *tx, batch_size).await?;
    if due.is_empty() {
        debug!("No due reminders");
        return Ok(0);
    }

    let mut notifications = Vec::with_capacity(due.len());
    for reminder in &due {
        let mut data = CreateNotification::new(
            reminder.user_id,
            NotificationKind::SessionReminder,
            reminder.title.clone(),
        );
        data.body = reminder.body.clone();
        if let Some(session_id) = reminder.session_id {
            data = data.with_link(format!("/sessions/{}", session_id));
        }
        notifications.push(Notification::insert(&mut *tx, data).await?);
    }

    let ids: Vec<_> = due.iter().map(|r| r.id).collect();
    Reminder::mark_sent(&mut *tx, &ids).await?;

    tx.commit().await?;

    for notification in &notifications {
        notify::publish(hub, notification);
    }

    info!(count = notifications.len(), "Dispatched reminders");
    Ok(notifications.len())
}
