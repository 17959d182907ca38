use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use reqwest::Method;
use serde_json::{json, Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{is_conflict, SupabaseClient};

use crate::models::{AuthError, CreateProfileRequest, CurrentUser, UpdateProfileRequest, UserAccount, UserProfile};

static PHONE_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^\+?1?\d{9,15}$").ok());

/// `+999999999` style numbers, 9 to 15 digits.
pub fn validate_phone_number(phone: &str) -> Result<(), AuthError> {
    match PHONE_PATTERN.as_ref() {
        Some(pattern) if pattern.is_match(phone) => Ok(()),
        _ => Err(AuthError::InvalidPhoneNumber),
    }
}

pub struct ProfileService {
    supabase: SupabaseClient,
}

impl ProfileService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn get_user(&self, user_id: Uuid, auth_token: &str) -> Result<UserAccount, AuthError> {
        let path = format!("/rest/v1/users?id=eq.{}", user_id);
        let rows: Vec<UserAccount> = self.supabase.select(&path, auth_token).await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;
        rows.into_iter().next().ok_or(AuthError::UserNotFound)
    }

    pub async fn get_profile(&self, user_id: Uuid, auth_token: &str) -> Result<Option<UserProfile>, AuthError> {
        let path = format!("/rest/v1/user_profiles?user_id=eq.{}", user_id);
        let rows: Vec<UserProfile> = self.supabase.select(&path, auth_token).await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;
        Ok(rows.into_iter().next())
    }

    pub async fn current_user(&self, user_id: Uuid, auth_token: &str) -> Result<CurrentUser, AuthError> {
        let user = self.get_user(user_id, auth_token).await?;
        let profile = self.get_profile(user_id, auth_token).await?;
        Ok(CurrentUser { user, profile })
    }

    /// One profile per user; a second attempt is a conflict.
    pub async fn create_profile(
        &self,
        user_id: Uuid,
        request: CreateProfileRequest,
        auth_token: &str,
    ) -> Result<UserProfile, AuthError> {
        if let Some(phone) = request.phone_number.as_deref() {
            validate_phone_number(phone)?;
        }

        if self.get_profile(user_id, auth_token).await?.is_some() {
            return Err(AuthError::ProfileExists);
        }

        let now = Utc::now().to_rfc3339();
        let body = json!({
            "user_id": user_id,
            "address": request.address,
            "phone_number": request.phone_number,
            "html_content": request.html_content,
            "json_content": request.json_content,
            "avatar_url": request.avatar_url,
            "geolocation": request.geolocation,
            "created_at": now,
            "updated_at": now,
        });

        let rows: Vec<UserProfile> = self.supabase
            .write_returning(Method::POST, "/rest/v1/user_profiles", auth_token, body)
            .await
            .map_err(|e| {
                if is_conflict(&e) {
                    AuthError::ProfileExists
                } else {
                    AuthError::DatabaseError(e.to_string())
                }
            })?;

        let profile = rows.into_iter().next()
            .ok_or_else(|| AuthError::DatabaseError("Insert returned no rows".to_string()))?;
        info!("Profile created for user {}", user_id);
        Ok(profile)
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        request: UpdateProfileRequest,
        auth_token: &str,
    ) -> Result<UserProfile, AuthError> {
        let mut changes = Map::new();

        if let Some(phone) = request.phone_number {
            validate_phone_number(&phone)?;
            changes.insert("phone_number".to_string(), json!(phone));
        }
        if let Some(address) = request.address {
            changes.insert("address".to_string(), json!(address));
        }
        if let Some(html) = request.html_content {
            changes.insert("html_content".to_string(), json!(html));
        }
        if let Some(content) = request.json_content {
            changes.insert("json_content".to_string(), content);
        }
        if let Some(avatar) = request.avatar_url {
            changes.insert("avatar_url".to_string(), json!(avatar));
        }
        if let Some(geolocation) = request.geolocation {
            changes.insert("geolocation".to_string(), json!(geolocation));
        }

        if changes.is_empty() {
            return self.get_profile(user_id, auth_token).await?.ok_or(AuthError::ProfileNotFound);
        }
        changes.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/user_profiles?user_id=eq.{}", user_id);
        debug!("Updating profile of user {}", user_id);
        let rows: Vec<UserProfile> = self.supabase
            .write_returning(Method::PATCH, &path, auth_token, Value::Object(changes))
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        rows.into_iter().next().ok_or(AuthError::ProfileNotFound)
    }
}
