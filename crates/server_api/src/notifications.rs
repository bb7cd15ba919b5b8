use shared::{
    domain::{NotificationId, UserId},
    error::ApiError,
    protocol::NotificationPayload,
};

use crate::{internal, not_found, ApiContext};

pub const NOTIFICATIONS_LIMIT: u32 = 20;

pub async fn list_notifications(
    ctx: &ApiContext,
    user_id: UserId,
) -> Result<Vec<NotificationPayload>, ApiError> {
    let notifications = ctx
        .storage
        .list_notifications(user_id, NOTIFICATIONS_LIMIT)
        .await
        .map_err(internal)?;
    Ok(notifications
        .into_iter()
        .map(|n| NotificationPayload {
            id: n.id,
            content: n.content,
            user_id: n.user_id,
            read: n.read,
            created_at: n.created_at,
        })
        .collect())
}

pub async fn mark_notification_read(
    ctx: &ApiContext,
    user_id: UserId,
    notification_id: NotificationId,
) -> Result<(), ApiError> {
    let updated = ctx
        .storage
        .mark_notification_read(notification_id, user_id)
        .await
        .map_err(internal)?;
    if !updated {
        return Err(not_found("Notification does not exist"));
    }
    Ok(())
}
