use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{User, UserRole};
use shared_models::error::AppError;
use shared_models::pagination::Page;
use shared_utils::extractor::require_role;

use crate::models::{CreateNotificationRequest, NotificationError, NotificationListQuery};
use crate::services::NotificationService;

fn map_error(e: NotificationError) -> AppError {
    match e {
        NotificationError::NotFound => AppError::NotFound("Notification not found".to_string()),
        NotificationError::InvalidAddress(msg) => AppError::BadRequest(msg),
        NotificationError::DatabaseError(msg) => AppError::Database(msg),
        other => AppError::ExternalService(other.to_string()),
    }
}

#[axum::debug_handler]
pub async fn list_notifications(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<NotificationListQuery>,
) -> Result<Json<Value>, AppError> {
    let user_id = user.uuid()?;
    let page = query.page_query();

    let service = NotificationService::new(&state);
    let notifications = service
        .list_for_user(user_id, query.unread_only.unwrap_or(false), &page, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!(Page::new(&page, notifications))))
}

/// Admin only: in-app notifications are otherwise created by the platform.
#[axum::debug_handler]
pub async fn create_notification(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateNotificationRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &[UserRole::Admin])?;

    if request.message.trim().is_empty() {
        return Err(AppError::ValidationError("Message must not be empty".to_string()));
    }

    let service = NotificationService::new(&state);
    let notification = service.create(request, auth.token()).await.map_err(map_error)?;

    Ok(Json(json!(notification)))
}

#[axum::debug_handler]
pub async fn mark_notification_read(
    State(state): State<Arc<AppConfig>>,
    Path(notification_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let user_id = user.uuid()?;

    let service = NotificationService::new(&state);
    let notification = service
        .mark_read(notification_id, user_id, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!(notification)))
}
