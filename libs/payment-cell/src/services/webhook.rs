use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info};

use shared_config::AppConfig;
use task_queue_cell::{Task, TaskDispatcher};

use crate::models::{StripeEvent, WebhookDisposition, WebhookError, PAYMENT_INTENT_SUCCEEDED};
use crate::services::signature::{verify_signature, DEFAULT_TOLERANCE_SECS};

/// Verifies gateway deliveries and hands intent updates to the worker.
pub struct WebhookService {
    secret: String,
    tolerance_secs: i64,
    tasks: Arc<dyn TaskDispatcher>,
}

impl WebhookService {
    pub fn new(config: &AppConfig, tasks: Arc<dyn TaskDispatcher>) -> Self {
        Self {
            secret: config.stripe_webhook_secret.clone(),
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
            tasks,
        }
    }

    pub fn with_tolerance(mut self, tolerance_secs: i64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }

    /// Signature first, then the body. Nothing is trusted before both pass.
    pub fn verify_event(&self, payload: &[u8], signature_header: Option<&str>) -> Result<StripeEvent, WebhookError> {
        let header = signature_header.ok_or(WebhookError::InvalidSignature)?;

        verify_signature(payload, header, &self.secret, Utc::now().timestamp(), self.tolerance_secs)
            .map_err(|e| {
                debug!("Webhook signature rejected: {}", e);
                WebhookError::InvalidSignature
            })?;

        serde_json::from_slice::<StripeEvent>(payload).map_err(|e| {
            debug!("Webhook payload rejected: {}", e);
            WebhookError::InvalidPayload
        })
    }

    pub async fn handle(&self, payload: &[u8], signature_header: Option<&str>) -> Result<WebhookDisposition, WebhookError> {
        let event = self.verify_event(payload, signature_header)?;

        if !event.is_payment_intent_update() {
            debug!("Ignoring webhook event {}", event.event_type);
            return Ok(WebhookDisposition::Ignored { event_type: event.event_type });
        }

        let object = &event.data.object;
        let payment_intent_id = object.get("id")
            .and_then(|v| v.as_str())
            .filter(|id| !id.is_empty())
            .ok_or(WebhookError::InvalidPayload)?
            .to_string();

        let status = object.get("status")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| default_status(&event.event_type).to_string());

        self.tasks
            .dispatch(Task::process_payment_webhook(payment_intent_id.clone(), status.clone()))
            .await
            .map_err(|e| {
                error!("Could not queue webhook event for intent {}: {}", payment_intent_id, e);
                WebhookError::QueueUnavailable(e.to_string())
            })?;

        info!("Queued {} for intent {}", event.event_type, payment_intent_id);
        Ok(WebhookDisposition::Queued { payment_intent_id, status })
    }
}

fn default_status(event_type: &str) -> &'static str {
    if event_type == PAYMENT_INTENT_SUCCEEDED {
        "succeeded"
    } else {
        "requires_payment_method"
    }
}
