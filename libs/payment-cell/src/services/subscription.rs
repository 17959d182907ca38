use chrono::Utc;
use reqwest::Method;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::User;

use crate::models::{CreateSubscriptionRequest, PaymentError, Subscription, SubscriptionStatus};
use crate::services::payment::actor_uuid;

pub struct SubscriptionService {
    supabase: SupabaseClient,
}

impl SubscriptionService {
    pub fn new(config: &AppConfig) -> Self {
        Self { supabase: SupabaseClient::new(config) }
    }

    /// New subscriptions start pending until a payment activates them.
    pub async fn create_subscription(
        &self,
        request: CreateSubscriptionRequest,
        actor: &User,
        auth_token: &str,
    ) -> Result<Subscription, PaymentError> {
        let user_id = actor_uuid(actor)?;

        let path = format!("/rest/v1/categories?id=eq.{}&select=id", request.category_id);
        let categories: Vec<serde_json::Value> = self.supabase.select(&path, auth_token).await
            .map_err(|e| PaymentError::DatabaseError(e.to_string()))?;
        if categories.is_empty() {
            return Err(PaymentError::ValidationError(format!("Unknown category {}", request.category_id)));
        }

        let now = Utc::now().to_rfc3339();
        let body = json!({
            "user_id": user_id,
            "category_id": request.category_id,
            "status": SubscriptionStatus::Pending,
            "payment_id": null,
            "created_at": now,
            "updated_at": now,
        });

        let rows: Vec<Subscription> = self.supabase
            .write_returning(Method::POST, "/rest/v1/subscriptions", auth_token, body)
            .await
            .map_err(|e| PaymentError::DatabaseError(e.to_string()))?;

        let subscription = rows.into_iter().next()
            .ok_or_else(|| PaymentError::DatabaseError("Failed to create subscription".to_string()))?;
        info!("Subscription {} created for user {}", subscription.id, user_id);
        Ok(subscription)
    }

    pub async fn list_subscriptions(&self, actor: &User, auth_token: &str) -> Result<Vec<Subscription>, PaymentError> {
        let path = if actor.is_admin() {
            "/rest/v1/subscriptions?order=created_at.desc".to_string()
        } else {
            format!("/rest/v1/subscriptions?user_id=eq.{}&order=created_at.desc", actor_uuid(actor)?)
        };

        self.supabase.select(&path, auth_token).await
            .map_err(|e| PaymentError::DatabaseError(e.to_string()))
    }

    pub async fn cancel_subscription(
        &self,
        subscription_id: Uuid,
        actor: &User,
        auth_token: &str,
    ) -> Result<Subscription, PaymentError> {
        let path = format!("/rest/v1/subscriptions?id=eq.{}", subscription_id);
        let rows: Vec<Subscription> = self.supabase.select(&path, auth_token).await
            .map_err(|e| PaymentError::DatabaseError(e.to_string()))?;
        let subscription = rows.into_iter().next().ok_or(PaymentError::SubscriptionNotFound)?;

        if subscription.user_id != actor_uuid(actor)? && !actor.is_admin() {
            return Err(PaymentError::Unauthorized("You can only cancel your own subscriptions".to_string()));
        }

        match subscription.status {
            SubscriptionStatus::Cancelled => return Ok(subscription),
            SubscriptionStatus::Expired => {
                return Err(PaymentError::Conflict("Subscription has already expired".to_string()))
            }
            SubscriptionStatus::Pending | SubscriptionStatus::Active => {}
        }

        let body = json!({
            "status": SubscriptionStatus::Cancelled,
            "updated_at": Utc::now().to_rfc3339(),
        });
        let rows: Vec<Subscription> = self.supabase
            .write_returning(Method::PATCH, &path, auth_token, body)
            .await
            .map_err(|e| PaymentError::DatabaseError(e.to_string()))?;

        rows.into_iter().next().ok_or(PaymentError::SubscriptionNotFound)
    }
}
