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

#[derive(Clone)]
pub struct PaymentState {
    pub config: Arc<AppConfig>,
    pub tasks: Arc<dyn TaskDispatcher>,
}

pub fn payment_routes(config: Arc<AppConfig>, tasks: Arc<dyn TaskDispatcher>) -> Router {
    let state = PaymentState { config: config.clone(), tasks };

    // The gateway signs its callbacks instead of sending a bearer token.
    let public_routes = Router::new()
        .route("/webhook", post(handlers::stripe_webhook));

    let protected_routes = Router::new()
        .route("/", post(handlers::create_payment_intent).get(handlers::list_payments))
        .route("/{payment_id}", get(handlers::get_payment))
        .route("/categories", get(handlers::list_categories).post(handlers::create_category))
        .route("/methods", get(handlers::list_payment_methods).post(handlers::create_payment_method))
        .route("/subscriptions", get(handlers::list_subscriptions).post(handlers::create_subscription))
        .route("/subscriptions/{subscription_id}/cancel", post(handlers::cancel_subscription))
        .layer(middleware::from_fn_with_state(config, auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
