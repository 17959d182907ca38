use axum::{
    body::Bytes,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::pagination::Page;

use crate::models::{
    CreateReservationRequest, RejectReservationRequest, ReservationError, ReservationSearchQuery,
};
use crate::router::ReservationState;
use crate::services::ReservationService;

fn map_reservation_error(e: ReservationError) -> AppError {
    match e {
        ReservationError::NotFound => AppError::NotFound("Reservation not found".to_string()),
        ReservationError::ClinicNotFound => AppError::NotFound("Clinic not found".to_string()),
        ReservationError::AlreadyApproved | ReservationError::NoDoctorAvailable => {
            AppError::BadRequest(e.to_string())
        }
        ReservationError::InvalidStatusTransition { .. } => AppError::Conflict(e.to_string()),
        ReservationError::NotClinicOwner => AppError::Forbidden(e.to_string()),
        ReservationError::Unauthorized(msg) => AppError::Forbidden(msg),
        ReservationError::ValidationError(msg) => AppError::ValidationError(msg),
        ReservationError::DatabaseError(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler(state = ReservationState)]
pub async fn create_reservation(
    State(state): State<ReservationState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateReservationRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = ReservationService::new(&state.config, state.tasks.clone());
    let reservation = service.create_reservation(request, &user, auth.token()).await
        .map_err(map_reservation_error)?;

    Ok((StatusCode::CREATED, Json(json!(reservation))))
}

#[axum::debug_handler(state = ReservationState)]
pub async fn get_reservation(
    State(state): State<ReservationState>,
    Path(reservation_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = ReservationService::new(&state.config, state.tasks.clone());

    let reservation = service.get_visible_reservation(reservation_id, &user, token).await
        .map_err(map_reservation_error)?;
    let assigned = service.assigned_doctor(reservation_id, token).await
        .map_err(map_reservation_error)?;

    Ok(Json(json!({
        "reservation": reservation,
        "assigned_doctor_id": assigned.map(|a| a.doctor_id),
    })))
}

#[axum::debug_handler(state = ReservationState)]
pub async fn search_reservations(
    State(state): State<ReservationState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<ReservationSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let service = ReservationService::new(&state.config, state.tasks.clone());
    let reservations = service.search_reservations(&query, &user, auth.token()).await
        .map_err(map_reservation_error)?;

    Ok(Json(json!(Page::new(&query.page_query(), reservations))))
}

/// Clinic owner approves a pending reservation of their clinic.
#[axum::debug_handler(state = ReservationState)]
pub async fn approve_reservation(
    State(state): State<ReservationState>,
    Path(reservation_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = ReservationService::new(&state.config, state.tasks.clone());
    let outcome = service.approve(reservation_id, &user, auth.token()).await
        .map_err(map_reservation_error)?;

    Ok(Json(json!({
        "status": "Reservation approved",
        "reservation": outcome.reservation,
        "assigned_doctor_id": outcome.assigned_doctor_id,
    })))
}

#[axum::debug_handler(state = ReservationState)]
pub async fn reject_reservation(
    State(state): State<ReservationState>,
    Path(reservation_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    // The body is optional; an empty one means no reason was given.
    let request: RejectReservationRequest = if body.iter().all(u8::is_ascii_whitespace) {
        RejectReservationRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e)))?
    };
    let reason = request.reason;

    let service = ReservationService::new(&state.config, state.tasks.clone());
    let reservation = service.reject(reservation_id, &user, reason, auth.token()).await
        .map_err(map_reservation_error)?;

    Ok(Json(json!({
        "status": "Reservation rejected",
        "reservation": reservation,
    })))
}
