use reqwest::Client;
use tracing::{debug, error, info};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::models::{PaymentError, PaymentTarget, StripePaymentIntent};

/// Minimal Stripe REST client: payment intent creation only.
#[derive(Clone)]
pub struct StripeClient {
    http: Client,
    base_url: String,
    secret_key: String,
}

impl StripeClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            http: Client::new(),
            base_url: config.stripe_api_base_url.trim_end_matches('/').to_string(),
            secret_key: config.stripe_secret_key.clone(),
        }
    }

    pub async fn create_payment_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        user_id: Uuid,
        target: PaymentTarget,
    ) -> Result<StripePaymentIntent, PaymentError> {
        if self.secret_key.is_empty() {
            return Err(PaymentError::NotConfigured);
        }

        let url = format!("{}/v1/payment_intents", self.base_url);
        debug!("Creating payment intent for {} {} via {}", amount_minor, currency, url);

        let mut params = vec![
            ("amount".to_string(), amount_minor.to_string()),
            ("currency".to_string(), currency.to_lowercase()),
            ("automatic_payment_methods[enabled]".to_string(), "true".to_string()),
            ("metadata[user_id]".to_string(), user_id.to_string()),
        ];
        match target {
            PaymentTarget::Subscription(id) => params.push(("metadata[subscription_id]".to_string(), id.to_string())),
            PaymentTarget::Reservation(id) => params.push(("metadata[reservation_id]".to_string(), id.to_string())),
        }

        let response = self.http.post(&url)
            .bearer_auth(&self.secret_key)
            .form(&params)
            .send()
            .await
            .map_err(|e| PaymentError::Gateway(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!("Stripe error ({}): {}", status, text);
            return Err(PaymentError::Gateway(format!("Stripe returned {}", status)));
        }

        let intent: StripePaymentIntent = response.json().await
            .map_err(|e| PaymentError::Gateway(e.to_string()))?;

        info!("Payment intent {} created with status {}", intent.id, intent.status);
        Ok(intent)
    }
}

/// Largest amount Stripe accepts, in minor units.
pub const MAX_AMOUNT_MINOR: i64 = 99_999_999;

/// Major currency units to the integer minor units Stripe expects.
/// The rounded value is what gets checked, so sub-cent amounts are rejected.
pub fn to_minor_units(amount: f64) -> Result<i64, PaymentError> {
    let minor = (amount * 100.0).round();
    if !minor.is_finite() || minor < 1.0 {
        return Err(PaymentError::ValidationError("Amount must be at least 0.01".to_string()));
    }
    if minor > MAX_AMOUNT_MINOR as f64 {
        return Err(PaymentError::ValidationError("Amount exceeds the maximum allowed".to_string()));
    }
    Ok(minor as i64)
}

/// Two-decimal major amount for storage, derived from what was charged.
pub fn from_minor_units(amount_minor: i64) -> f64 {
    amount_minor as f64 / 100.0
}
