use chrono::Utc;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::User;

use crate::models::{
    CreatePaymentRequest, Payment, PaymentError, PaymentIntentCreated, PaymentListQuery, PaymentTarget,
};
use crate::services::stripe::{from_minor_units, to_minor_units, StripeClient};

#[derive(Debug, Deserialize)]
struct OwnedRow {
    #[serde(alias = "patient_id")]
    user_id: Uuid,
}

pub struct PaymentService {
    supabase: SupabaseClient,
    stripe: StripeClient,
    default_currency: String,
}

impl PaymentService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            stripe: StripeClient::new(config),
            default_currency: config.stripe_currency.clone(),
        }
    }

    /// Opens a gateway payment intent and records the pending payment.
    pub async fn create_payment_intent(
        &self,
        request: CreatePaymentRequest,
        actor: &User,
        auth_token: &str,
    ) -> Result<PaymentIntentCreated, PaymentError> {
        let user_id = actor_uuid(actor)?;
        let target = PaymentTarget::from_ids(request.subscription_id, request.reservation_id)?;
        let amount_minor = to_minor_units(request.amount)?;
        let currency = request.currency
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| self.default_currency.clone())
            .to_lowercase();

        self.ensure_target_belongs_to(target, user_id, actor, auth_token).await?;

        let intent = self.stripe.create_payment_intent(amount_minor, &currency, user_id, target).await?;

        let now = Utc::now().to_rfc3339();
        let body = json!({
            "user_id": user_id,
            "amount": from_minor_units(amount_minor),
            "currency": currency,
            "method_id": request.method_id,
            "payment_status": intent.status,
            "subscription_id": target.subscription_id(),
            "reservation_id": target.reservation_id(),
            "payment_intent_id": intent.id,
            "created_at": now,
            "updated_at": now,
        });

        let rows: Vec<Payment> = self.supabase
            .write_returning(Method::POST, "/rest/v1/payments", auth_token, body)
            .await
            .map_err(|e| PaymentError::DatabaseError(e.to_string()))?;

        let payment = rows.into_iter().next()
            .ok_or_else(|| PaymentError::DatabaseError("Failed to record payment".to_string()))?;

        info!("Payment {} recorded for intent {}", payment.id, intent.id);
        Ok(PaymentIntentCreated { payment, client_secret: intent.client_secret })
    }

    pub async fn get_payment(&self, payment_id: Uuid, actor: &User, auth_token: &str) -> Result<Payment, PaymentError> {
        let path = format!("/rest/v1/payments?id=eq.{}", payment_id);
        let rows: Vec<Payment> = self.supabase.select(&path, auth_token).await
            .map_err(|e| PaymentError::DatabaseError(e.to_string()))?;

        let payment = rows.into_iter().next().ok_or(PaymentError::NotFound)?;

        if !actor.is_admin() && payment.user_id != actor_uuid(actor)? {
            return Err(PaymentError::Unauthorized("You can only view your own payments".to_string()));
        }

        Ok(payment)
    }

    /// Own payments for everyone; admins see all and may filter by user.
    pub async fn list_payments(
        &self,
        query: &PaymentListQuery,
        actor: &User,
        auth_token: &str,
    ) -> Result<Vec<Payment>, PaymentError> {
        let mut filters = Vec::new();

        if actor.is_admin() {
            if let Some(user_id) = query.user_id {
                filters.push(format!("user_id=eq.{}", user_id));
            }
        } else {
            filters.push(format!("user_id=eq.{}", actor_uuid(actor)?));
        }

        if let Some(status) = query.payment_status.as_deref().filter(|s| !s.is_empty()) {
            filters.push(format!("payment_status=eq.{}", urlencoding::encode(status)));
        }

        filters.push("order=created_at.desc".to_string());
        filters.push(query.page_query().to_query());

        let path = format!("/rest/v1/payments?{}", filters.join("&"));
        debug!("Listing payments: {}", path);

        self.supabase.select(&path, auth_token).await
            .map_err(|e| PaymentError::DatabaseError(e.to_string()))
    }

    async fn ensure_target_belongs_to(
        &self,
        target: PaymentTarget,
        user_id: Uuid,
        actor: &User,
        auth_token: &str,
    ) -> Result<(), PaymentError> {
        let (path, missing) = match target {
            PaymentTarget::Subscription(id) => (
                format!("/rest/v1/subscriptions?id=eq.{}&select=user_id", id),
                PaymentError::SubscriptionNotFound,
            ),
            PaymentTarget::Reservation(id) => (
                format!("/rest/v1/reservations?id=eq.{}&select=patient_id", id),
                PaymentError::ValidationError("Reservation not found".to_string()),
            ),
        };

        let rows: Vec<OwnedRow> = self.supabase.select(&path, auth_token).await
            .map_err(|e| PaymentError::DatabaseError(e.to_string()))?;
        let row = rows.into_iter().next().ok_or(missing)?;

        if row.user_id != user_id && !actor.is_admin() {
            return Err(PaymentError::Unauthorized("You can only pay for your own bookings".to_string()));
        }
        Ok(())
    }
}

pub(crate) fn actor_uuid(actor: &User) -> Result<Uuid, PaymentError> {
    Uuid::parse_str(&actor.id)
        .map_err(|_| PaymentError::ValidationError("Invalid user ID format".to_string()))
}
