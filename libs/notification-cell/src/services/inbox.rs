use chrono::Utc;
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::pagination::PageQuery;

use crate::models::{CreateNotificationRequest, Notification, NotificationError};

pub struct NotificationService {
    supabase: SupabaseClient,
}

impl NotificationService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        unread_only: bool,
        page: &PageQuery,
        auth_token: &str,
    ) -> Result<Vec<Notification>, NotificationError> {
        let mut path = format!("/rest/v1/notifications?user_id=eq.{}", user_id);
        if unread_only {
            path.push_str("&is_read=eq.false");
        }
        path.push_str("&order=created_at.desc&");
        path.push_str(&page.to_query());

        debug!("Listing notifications for user {}", user_id);
        self.supabase.select(&path, auth_token).await
            .map_err(|e| NotificationError::DatabaseError(e.to_string()))
    }

    pub async fn create(
        &self,
        request: CreateNotificationRequest,
        auth_token: &str,
    ) -> Result<Notification, NotificationError> {
        let body = json!({
            "user_id": request.user_id,
            "message": request.message,
            "is_read": false,
            "created_at": Utc::now().to_rfc3339(),
        });

        let rows: Vec<Notification> = self.supabase
            .write_returning(Method::POST, "/rest/v1/notifications", auth_token, body)
            .await
            .map_err(|e| NotificationError::DatabaseError(e.to_string()))?;

        let notification = rows.into_iter().next()
            .ok_or_else(|| NotificationError::DatabaseError("Insert returned no rows".to_string()))?;

        info!("Notification {} created for user {}", notification.id, notification.user_id);
        Ok(notification)
    }

    /// Mark one of the user's notifications read. Other users' rows are never touched.
    pub async fn mark_read(
        &self,
        notification_id: Uuid,
        user_id: Uuid,
        auth_token: &str,
    ) -> Result<Notification, NotificationError> {
        let path = format!(
            "/rest/v1/notifications?id=eq.{}&user_id=eq.{}",
            notification_id, user_id
        );

        let rows: Vec<Notification> = self.supabase
            .write_returning(Method::PATCH, &path, auth_token, json!({ "is_read": true }))
            .await
            .map_err(|e| NotificationError::DatabaseError(e.to_string()))?;

        rows.into_iter().next().ok_or(NotificationError::NotFound)
    }
}
