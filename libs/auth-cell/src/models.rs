use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use shared_models::pagination::PageQuery;

/// Account row as stored in `users`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub address: Option<String>,
    pub phone_number: Option<String>,
    pub html_content: Option<String>,
    pub json_content: Option<Value>,
    pub avatar_url: Option<String>,
    pub geolocation: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateProfileRequest {
    pub address: Option<String>,
    pub phone_number: Option<String>,
    pub html_content: Option<String>,
    pub json_content: Option<Value>,
    pub avatar_url: Option<String>,
    pub geolocation: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub address: Option<String>,
    pub phone_number: Option<String>,
    pub html_content: Option<String>,
    pub json_content: Option<Value>,
    pub avatar_url: Option<String>,
    pub geolocation: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    pub user: UserAccount,
    pub profile: Option<UserProfile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsersAudit {
    pub id: i64,
    pub user_id: Uuid,
    pub changed_data: Value,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditQuery {
    pub user_id: Option<Uuid>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl AuditQuery {
    pub fn page_query(&self) -> PageQuery {
        PageQuery { page: self.page, page_size: self.page_size }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("User not found")]
    UserNotFound,

    #[error("Profile not found")]
    ProfileNotFound,

    #[error("Profile already exists for this user")]
    ProfileExists,

    #[error("Phone number must be entered in the format: '+999999999'. Up to 15 digits allowed.")]
    InvalidPhoneNumber,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
