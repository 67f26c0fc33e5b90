/// Creates notifications and pushes them to the realtime hub
///
/// Notification delivery is best effort from the caller's point of view:
/// the fan-out helpers log failures instead of failing the request that
/// triggered them, since the primary write has already happened.

use sqlx::PgPool;
use tracing::{error, info};

use crate::models::notification::{CreateNotification, Notification};
use crate::realtime::{RealtimeHub, RealtimePayload};

/// Inserts a notification and publishes it to its recipient
pub async fn notify(
    pool: &PgPool,
    hub: &RealtimeHub,
    data: CreateNotification,
) -> Result<Notification, sqlx::Error> {
    let notification = Notification::insert(pool, data).await?;
    publish(hub, &notification);
    Ok(notification)
}

/// Publishes an already-stored notification
pub fn publish(hub: &RealtimeHub, notification: &Notification) {
    hub.publish(
        notification.user_id,
        RealtimePayload::Notification(notification.clone()),
    );
}

/// Like [`notify`], but logs instead of returning the error
pub async fn notify_logged(pool: &PgPool, hub: &RealtimeHub, data: CreateNotification) {
    let user_id = data.user_id;
    let kind = data.kind.as_str();
    if let Err(e) = notify(pool, hub, data).await {
        error!(error = %e, user_id = %user_id, kind, "Failed to create notification");
    }
}

/// Sends the same notification to many users
///
/// Returns how many were stored.
pub async fn notify_many<I>(
    pool: &PgPool,
    hub: &RealtimeHub,
    recipients: I,
    template: CreateNotification,
) -> usize
where
    I: IntoIterator<Item = uuid::Uuid>,
{
    let mut sent = 0;
    for user_id in recipients {
        let data = CreateNotification {
            user_id,
            ..template.clone()
        };
        match notify(pool, hub, data).await {
            Ok(_) => sent += 1,
            Err(e) => error!(error = %e, user_id = %user_id, "Failed to create notification"),
        }
    }

    info!(kind = template.kind.as_str(), sent, "Fanned out notifications");
    sent
}
