use mailer::MailQueue;
use shared::error::{ApiError, ErrorCode};
use storage::Storage;
use tracing::error;

mod deliverymen;
mod notifications;
mod problems;
pub mod validation;

pub use deliverymen::{create_deliveryman, delete_deliveryman, list_deliverymen, update_deliveryman};
pub use notifications::{list_notifications, mark_notification_read, NOTIFICATIONS_LIMIT};
pub use problems::{cancel_delivery, create_problem, list_delivery_problems, list_problems};

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
    pub mail_queue: MailQueue,
}

fn internal(err: anyhow::Error) -> ApiError {
    error!(error = %err, "storage operation failed");
    ApiError::new(ErrorCode::Internal, err.to_string())
}

fn not_found(message: &str) -> ApiError {
    ApiError::new(ErrorCode::NotFound, message)
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod support;
