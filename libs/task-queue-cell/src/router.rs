use std::sync::Arc;
use axum::{
    Router,
    routing::get,
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::get_queue_stats;
use crate::RedisTaskQueue;

pub fn task_queue_routes(config: Arc<AppConfig>, queue: Arc<RedisTaskQueue>) -> Router {
    Router::new()
        .route("/stats", get(get_queue_stats))
        .layer(middleware::from_fn_with_state(config, auth_middleware))
        .with_state(queue)
}
