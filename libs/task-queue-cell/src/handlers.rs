use std::sync::Arc;

use axum::{extract::State, response::Json, Extension};
use serde_json::{json, Value};
use tracing::error;

use shared_models::{
    auth::{User, UserRole},
    error::AppError,
};
use shared_utils::extractor::require_role;

use crate::RedisTaskQueue;

/// Queue depth for operators.
pub async fn get_queue_stats(
    State(queue): State<Arc<RedisTaskQueue>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &[UserRole::Admin])?;

    let stats = queue.stats().await.map_err(|e| {
        error!("Failed to read queue stats: {}", e);
        AppError::ExternalService("Task queue unavailable".to_string())
    })?;

    Ok(Json(json!({
        "pending_tasks": stats.pending_tasks,
        "enqueued_since_start": stats.enqueued_since_start
    })))
}
