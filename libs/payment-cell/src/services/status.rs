use chrono::Utc;
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{IntentUpdateOutcome, Payment, PaymentError};

/// Applies payment intent status changes reported by the gateway.
/// Runs in the worker with the service key; no end-user token is involved.
pub struct PaymentStatusService {
    supabase: SupabaseClient,
    service_token: String,
}

impl PaymentStatusService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            service_token: config.service_token().to_string(),
        }
    }

    pub async fn apply_intent_update(
        &self,
        payment_intent_id: &str,
        status: &str,
    ) -> Result<IntentUpdateOutcome, PaymentError> {
        if payment_intent_id.trim().is_empty() {
            warn!("Webhook event without a payment intent id; ignoring");
            return Ok(IntentUpdateOutcome::Unmatched);
        }

        let path = format!(
            "/rest/v1/payments?payment_intent_id=eq.{}&limit=1",
            urlencoding::encode(payment_intent_id)
        );
        let rows: Vec<Payment> = self.supabase.select(&path, &self.service_token).await
            .map_err(|e| PaymentError::DatabaseError(e.to_string()))?;

        let Some(payment) = rows.into_iter().next() else {
            warn!("No payment matches intent {}; event dropped", payment_intent_id);
            return Ok(IntentUpdateOutcome::Unmatched);
        };

        if payment.payment_status == status {
            debug!("Payment {} already {}; nothing to do", payment.id, status);
            return Ok(IntentUpdateOutcome::Unchanged(payment));
        }

        let path = format!("/rest/v1/payments?id=eq.{}", payment.id);
        let body = json!({
            "payment_status": status,
            "updated_at": Utc::now().to_rfc3339(),
        });

        let updated: Vec<Payment> = self.supabase
            .write_returning(Method::PATCH, &path, &self.service_token, body)
            .await
            .map_err(|e| PaymentError::DatabaseError(e.to_string()))?;

        let updated = updated.into_iter().next().ok_or(PaymentError::NotFound)?;
        info!(
            "Payment {} moved from {} to {} (intent {})",
            updated.id, payment.payment_status, updated.payment_status, payment_intent_id
        );

        Ok(IntentUpdateOutcome::Updated(updated))
    }
}
