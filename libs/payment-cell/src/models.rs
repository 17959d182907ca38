use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;
use uuid::Uuid;

use shared_models::pagination::PageQuery;

// ==============================================================================
// PAYMENTS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: f64,
    pub currency: String,
    pub method_id: Option<i64>,
    pub payment_status: String,
    pub subscription_id: Option<Uuid>,
    pub reservation_id: Option<Uuid>,
    pub payment_intent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn target(&self) -> Result<PaymentTarget, PaymentError> {
        PaymentTarget::from_ids(self.subscription_id, self.reservation_id)
    }
}

/// What a payment pays for. Exactly one of the two, never both or neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentTarget {
    Subscription(Uuid),
    Reservation(Uuid),
}

impl PaymentTarget {
    pub fn from_ids(subscription_id: Option<Uuid>, reservation_id: Option<Uuid>) -> Result<Self, PaymentError> {
        match (subscription_id, reservation_id) {
            (Some(id), None) => Ok(PaymentTarget::Subscription(id)),
            (None, Some(id)) => Ok(PaymentTarget::Reservation(id)),
            _ => Err(PaymentError::ValidationError(
                "Payment must be associated with either a subscription or a reservation, but not both."
                    .to_string(),
            )),
        }
    }

    pub fn subscription_id(&self) -> Option<Uuid> {
        match self {
            PaymentTarget::Subscription(id) => Some(*id),
            PaymentTarget::Reservation(_) => None,
        }
    }

    pub fn reservation_id(&self) -> Option<Uuid> {
        match self {
            PaymentTarget::Reservation(id) => Some(*id),
            PaymentTarget::Subscription(_) => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePaymentRequest {
    pub amount: f64,
    pub currency: Option<String>,
    pub method_id: Option<i64>,
    pub subscription_id: Option<Uuid>,
    pub reservation_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentIntentCreated {
    pub payment: Payment,
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentListQuery {
    pub user_id: Option<Uuid>,
    pub payment_status: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl PaymentListQuery {
    pub fn page_query(&self) -> PageQuery {
        PageQuery { page: self.page, page_size: self.page_size }
    }
}

/// Payment intent as returned by the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct StripePaymentIntent {
    pub id: String,
    pub status: String,
    pub client_secret: Option<String>,
}

/// Result of applying a webhook status to the store.
#[derive(Debug, Clone)]
pub enum IntentUpdateOutcome {
    /// No payment carries this intent id; nothing was written.
    Unmatched,
    /// The payment already had this status; nothing was written.
    Unchanged(Payment),
    Updated(Payment),
}

// ==============================================================================
// CATALOG & SUBSCRIPTIONS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: i64,
    pub method_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePaymentMethodRequest {
    pub method_name: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Pending,
    Active,
    Cancelled,
    Expired,
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionStatus::Pending => write!(f, "pending"),
            SubscriptionStatus::Active => write!(f, "active"),
            SubscriptionStatus::Cancelled => write!(f, "cancelled"),
            SubscriptionStatus::Expired => write!(f, "expired"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category_id: i64,
    pub status: SubscriptionStatus,
    pub payment_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSubscriptionRequest {
    pub category_id: i64,
}

// ==============================================================================
// WEBHOOK EVENTS
// ==============================================================================

pub const PAYMENT_INTENT_SUCCEEDED: &str = "payment_intent.succeeded";
pub const PAYMENT_INTENT_FAILED: &str = "payment_intent.payment_failed";

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    pub object: Value,
}

impl StripeEvent {
    pub fn is_payment_intent_update(&self) -> bool {
        matches!(self.event_type.as_str(), PAYMENT_INTENT_SUCCEEDED | PAYMENT_INTENT_FAILED)
    }
}

/// What the webhook endpoint did with a verified event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookDisposition {
    Queued { payment_intent_id: String, status: String },
    Ignored { event_type: String },
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Payment not found")]
    NotFound,

    #[error("Subscription not found")]
    SubscriptionNotFound,

    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Already exists: {0}")]
    Conflict(String),

    #[error("Payments are not configured")]
    NotConfigured,

    #[error("Payment gateway error: {0}")]
    Gateway(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Webhook failures answer in the gateway's `{"status": ...}` shape.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid payload")]
    InvalidPayload,

    #[error("queue unavailable: {0}")]
    QueueUnavailable(String),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match &self {
            WebhookError::InvalidSignature | WebhookError::InvalidPayload => StatusCode::BAD_REQUEST,
            WebhookError::QueueUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        warn!("Webhook rejected: {}", self);

        let message = match &self {
            WebhookError::QueueUnavailable(_) => "error".to_string(),
            other => other.to_string(),
        };
        (status, Json(json!({ "status": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn payment_target_requires_exactly_one_side() {
        let id = Uuid::new_v4();
        assert_eq!(PaymentTarget::from_ids(Some(id), None).unwrap(), PaymentTarget::Subscription(id));
        assert_eq!(PaymentTarget::from_ids(None, Some(id)).unwrap(), PaymentTarget::Reservation(id));
        assert_matches!(PaymentTarget::from_ids(None, None), Err(PaymentError::ValidationError(_)));
        assert_matches!(PaymentTarget::from_ids(Some(id), Some(id)), Err(PaymentError::ValidationError(_)));
    }

    #[test]
    fn only_intent_success_and_failure_events_are_processed() {
        let event = |t: &str| StripeEvent {
            id: None,
            event_type: t.to_string(),
            data: StripeEventData { object: json!({}) },
        };
        assert!(event("payment_intent.succeeded").is_payment_intent_update());
        assert!(event("payment_intent.payment_failed").is_payment_intent_update());
        assert!(!event("charge.refunded").is_payment_intent_update());
    }
}
