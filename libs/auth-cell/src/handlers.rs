use std::sync::Arc;

use axum::{
    extract::{Extension, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_models::auth::{TokenResponse, User, UserRole};
use shared_models::error::AppError;
use shared_models::pagination::Page;
use shared_utils::extractor::require_role;
use shared_utils::jwt::validate_token as decode_token;

use crate::models::{AuditQuery, AuthError, CreateProfileRequest, UpdateProfileRequest};
use crate::services::{AuditService, ProfileService};

fn map_auth_error(e: AuthError) -> AppError {
    match e {
        AuthError::UserNotFound | AuthError::ProfileNotFound => AppError::NotFound(e.to_string()),
        AuthError::ProfileExists => AppError::Conflict(e.to_string()),
        AuthError::InvalidPhoneNumber => AppError::ValidationError(e.to_string()),
        AuthError::ValidationError(msg) => AppError::ValidationError(msg),
        AuthError::DatabaseError(msg) => AppError::Database(msg),
    }
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<String, AppError> {
    let auth_value = headers
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    auth_value
        .strip_prefix("Bearer ")
        .map(str::to_string)
        .ok_or_else(|| AppError::Auth("Invalid authorization header format".to_string()))
}

// ==============================================================================
// TOKENS
// ==============================================================================

pub async fn validate_token(
    State(config): State<Arc<AppConfig>>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, AppError> {
    debug!("Validating token");
    let token = extract_bearer_token(&headers)?;

    let user = decode_token(&token, &config.supabase_jwt_secret)
        .map_err(|e| AppError::Auth(e.to_string()))?;

    Ok(Json(TokenResponse {
        valid: true,
        user_id: user.id,
        email: user.email,
        role: user.role,
    }))
}

/// Never fails on a bad token; answers `{"valid": false}` instead.
pub async fn verify_token(
    State(config): State<Arc<AppConfig>>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let token = extract_bearer_token(&headers)?;
    let valid = decode_token(&token, &config.supabase_jwt_secret).is_ok();

    Ok(Json(json!({ "valid": valid })))
}

// ==============================================================================
// CURRENT USER & PROFILE
// ==============================================================================

#[axum::debug_handler]
pub async fn get_me(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let user_id = user.uuid()?;
    let me = ProfileService::new(&config).current_user(user_id, auth.token()).await
        .map_err(map_auth_error)?;

    Ok(Json(json!(me)))
}

#[axum::debug_handler]
pub async fn create_profile(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateProfileRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let user_id = user.uuid()?;
    let profile = ProfileService::new(&config).create_profile(user_id, request, auth.token()).await
        .map_err(map_auth_error)?;

    Ok((StatusCode::CREATED, Json(json!(profile))))
}

#[axum::debug_handler]
pub async fn update_profile(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<Value>, AppError> {
    let user_id = user.uuid()?;
    let profile = ProfileService::new(&config).update_profile(user_id, request, auth.token()).await
        .map_err(map_auth_error)?;

    Ok(Json(json!(profile)))
}

#[axum::debug_handler]
pub async fn list_audit_entries(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &[UserRole::Admin])?;

    let entries = AuditService::new(&config).list_entries(&query, auth.token()).await
        .map_err(map_auth_error)?;

    Ok(Json(json!(Page::new(&query.page_query(), entries))))
}
