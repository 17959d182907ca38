use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;
use task_queue_cell::TaskDispatcher;

use crate::handlers;

/// Handler state: configuration plus the queue patient notifications go to.
#[derive(Clone)]
pub struct ReservationState {
    pub config: Arc<AppConfig>,
    pub tasks: Arc<dyn TaskDispatcher>,
}

pub fn reservation_routes(config: Arc<AppConfig>, tasks: Arc<dyn TaskDispatcher>) -> Router {
    let state = ReservationState { config: config.clone(), tasks };

    Router::new()
        .route("/", post(handlers::create_reservation).get(handlers::search_reservations))
        .route("/{reservation_id}", get(handlers::get_reservation))
        .route("/{reservation_id}/approve", post(handlers::approve_reservation))
        .route("/{reservation_id}/reject", post(handlers::reject_reservation))
        .layer(middleware::from_fn_with_state(config, auth_middleware))
        .with_state(state)
}
