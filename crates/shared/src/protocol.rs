use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    DeliveryId, DeliverymanId, FileId, NotificationId, ProblemId, RecipientId, UserId,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientSummary {
    pub id: RecipientId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverymanContact {
    pub id: DeliverymanId,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliverymanSummary {
    pub id: DeliverymanId,
    pub name: String,
    pub email: String,
    pub avatar_id: Option<FileId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedDeliveryman {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateDeliverymanRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_id: Option<FileId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDeliverymanRequest {
    #[serde(default)]
    pub id: Option<DeliverymanId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_id: Option<FileId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateProblemRequest {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub deliveryman_id: Option<DeliverymanId>,
}

/// Delivery as embedded in a problem listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemDelivery {
    pub product: String,
    pub recipient: Option<RecipientSummary>,
    pub deliveryman: Option<DeliverymanContact>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryProblemListing {
    pub id: ProblemId,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub delivery: ProblemDelivery,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryProblemRecord {
    pub id: ProblemId,
    pub delivery_id: DeliveryId,
    pub deliveryman_id: Option<DeliverymanId>,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelledDelivery {
    pub id: DeliveryId,
    pub product: String,
    pub canceled_at: Option<DateTime<Utc>>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub signature_id: Option<FileId>,
    pub recipient: Option<RecipientSummary>,
    pub deliveryman: Option<DeliverymanContact>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub id: NotificationId,
    pub content: String,
    pub user_id: UserId,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}
