use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use auth_cell::router::auth_routes;
use clinic_cell::router::clinic_routes;
use doctor_cell::router::doctor_routes;
use feed_cell::router::feed_routes;
use notification_cell::router::notification_routes;
use patient_cell::router::patient_routes;
use payment_cell::router::payment_routes;
use reservation_cell::router::reservation_routes;
use shared_config::AppConfig;
use task_queue_cell::{task_queue_routes, RedisTaskQueue, TaskDispatcher};

pub fn create_router(state: Arc<AppConfig>, queue: Arc<RedisTaskQueue>) -> Router {
    let tasks: Arc<dyn TaskDispatcher> = queue.clone();

    Router::new()
        .route("/", get(|| async { "Clinic Booking API is running!" }))
        .nest("/auth", auth_routes(state.clone()))
        .nest("/patients", patient_routes(state.clone()))
        .nest("/doctors", doctor_routes(state.clone()))
        .nest("/clinics", clinic_routes(state.clone()))
        .nest("/reservations", reservation_routes(state.clone(), tasks.clone()))
        .nest("/feed", feed_routes(state.clone()))
        .nest("/payments", payment_routes(state.clone(), tasks))
        .nest("/notifications", notification_routes(state.clone()))
        .nest("/tasks", task_queue_routes(state, queue))
}
