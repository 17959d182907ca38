use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn clinic_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", post(handlers::create_clinic).get(handlers::list_clinics))
        .route("/{clinic_id}", get(handlers::get_clinic).put(handlers::update_clinic))

        // Roster
        .route("/{clinic_id}/doctors", post(handlers::add_roster_doctor))
        .route("/{clinic_id}/doctors/available", get(handlers::list_available_doctors))
        .route("/{clinic_id}/doctors/{doctor_id}", delete(handlers::remove_roster_doctor))

        .route("/{clinic_id}/reviews", post(handlers::create_review).get(handlers::list_reviews))
        .route("/{clinic_id}/events", post(handlers::create_event).get(handlers::list_events))
        .route("/{clinic_id}/campaigns", post(handlers::create_campaign).get(handlers::list_campaigns))

        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
