use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::pagination::PageQuery;

/// In-app notification row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateNotificationRequest {
    pub user_id: Uuid,
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationListQuery {
    pub unread_only: Option<bool>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl NotificationListQuery {
    pub fn page_query(&self) -> PageQuery {
        PageQuery { page: self.page, page_size: self.page_size }
    }
}

/// What happened to an outbound SMS or email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Sent { reference: Option<String> },
    Skipped(String),
}

impl Delivery {
    pub fn is_sent(&self) -> bool {
        matches!(self, Delivery::Sent { .. })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProfilePhone {
    pub phone_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TwilioMessage {
    pub sid: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Notification not found")]
    NotFound,

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("SMS provider error: {0}")]
    SmsProvider(String),

    #[error("Email transport error: {0}")]
    EmailTransport(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
