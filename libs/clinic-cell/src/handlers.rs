use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{User, UserRole};
use shared_models::error::AppError;
use shared_models::pagination::{Page, PageQuery};
use shared_utils::extractor::require_role;

use crate::models::{
    ClinicError, ClinicSearchQuery, CreateCampaignRequest, CreateClinicRequest, CreateEventRequest,
    CreateReviewRequest, RosterChangeRequest, UpdateClinicRequest,
};
use crate::services::{CampaignService, ClinicService, EventScheduleService, ReviewService, RosterService};

pub fn map_clinic_error(e: ClinicError) -> AppError {
    match e {
        ClinicError::NotFound => AppError::NotFound("Clinic not found".to_string()),
        ClinicError::NotAuthorized(msg) => AppError::Forbidden(msg),
        ClinicError::DoctorAlreadyOnRoster(_) => AppError::Conflict(e.to_string()),
        ClinicError::DoctorNotOnRoster(_) => AppError::NotFound(e.to_string()),
        ClinicError::UnknownDoctor(_) | ClinicError::NoApprovedReservation => {
            AppError::ValidationError(e.to_string())
        }
        ClinicError::ValidationError(msg) => AppError::ValidationError(msg),
        ClinicError::DatabaseError(msg) => AppError::Database(msg),
    }
}

// ==============================================================================
// CLINIC DIRECTORY
// ==============================================================================

#[axum::debug_handler]
pub async fn create_clinic(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateClinicRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_role(&user, &[UserRole::ClinicOwner, UserRole::Admin])?;

    let service = ClinicService::new(&state);
    let clinic = service.create_clinic(request, &user, auth.token()).await
        .map_err(map_clinic_error)?;

    Ok((StatusCode::CREATED, Json(json!(clinic))))
}

#[axum::debug_handler]
pub async fn list_clinics(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<ClinicSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let service = ClinicService::new(&state);
    let clinics = service.list_clinics(&query, auth.token()).await
        .map_err(map_clinic_error)?;

    Ok(Json(json!(Page::new(&query.page_query(), clinics))))
}

#[axum::debug_handler]
pub async fn get_clinic(
    State(state): State<Arc<AppConfig>>,
    Path(clinic_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = ClinicService::new(&state);
    let clinic = service.get_details(clinic_id, auth.token()).await
        .map_err(map_clinic_error)?;

    Ok(Json(json!(clinic)))
}

#[axum::debug_handler]
pub async fn update_clinic(
    State(state): State<Arc<AppConfig>>,
    Path(clinic_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateClinicRequest>,
) -> Result<Json<Value>, AppError> {
    let service = ClinicService::new(&state);
    let clinic = service.update_clinic(clinic_id, request, &user, auth.token()).await
        .map_err(map_clinic_error)?;

    Ok(Json(json!(clinic)))
}

// ==============================================================================
// ROSTER
// ==============================================================================

#[axum::debug_handler]
pub async fn add_roster_doctor(
    State(state): State<Arc<AppConfig>>,
    Path(clinic_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<RosterChangeRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let token = auth.token();
    ClinicService::new(&state).get_managed_clinic(clinic_id, &user, token).await
        .map_err(map_clinic_error)?;

    let entry = RosterService::new(&state).add(clinic_id, request.doctor_id, token).await
        .map_err(map_clinic_error)?;

    Ok((StatusCode::CREATED, Json(json!(entry))))
}

#[axum::debug_handler]
pub async fn remove_roster_doctor(
    State(state): State<Arc<AppConfig>>,
    Path((clinic_id, doctor_id)): Path<(Uuid, Uuid)>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<StatusCode, AppError> {
    let token = auth.token();
    ClinicService::new(&state).get_managed_clinic(clinic_id, &user, token).await
        .map_err(map_clinic_error)?;

    RosterService::new(&state).remove(clinic_id, doctor_id, token).await
        .map_err(map_clinic_error)?;

    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn list_available_doctors(
    State(state): State<Arc<AppConfig>>,
    Path(clinic_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let doctors = RosterService::new(&state).available_doctors(clinic_id, auth.token()).await
        .map_err(map_clinic_error)?;

    Ok(Json(json!({ "clinic_id": clinic_id, "doctor_ids": doctors })))
}

// ==============================================================================
// REVIEWS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_review(
    State(state): State<Arc<AppConfig>>,
    Path(clinic_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_role(&user, &[UserRole::Patient])?;
    let patient_id = user.uuid()?;

    let review = ReviewService::new(&state)
        .create_review(clinic_id, patient_id, request, auth.token())
        .await
        .map_err(map_clinic_error)?;

    Ok((StatusCode::CREATED, Json(json!(review))))
}

#[axum::debug_handler]
pub async fn list_reviews(
    State(state): State<Arc<AppConfig>>,
    Path(clinic_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Value>, AppError> {
    let reviews = ReviewService::new(&state).list_reviews(clinic_id, &page, auth.token()).await
        .map_err(map_clinic_error)?;

    Ok(Json(json!(Page::new(&page, reviews))))
}

// ==============================================================================
// EVENTS & CAMPAIGNS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_event(
    State(state): State<Arc<AppConfig>>,
    Path(clinic_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let token = auth.token();
    EventScheduleService::validate(&request).map_err(map_clinic_error)?;
    ClinicService::new(&state).get_managed_clinic(clinic_id, &user, token).await
        .map_err(map_clinic_error)?;

    let event = EventScheduleService::new(&state).create_event(clinic_id, request, token).await
        .map_err(map_clinic_error)?;

    Ok((StatusCode::CREATED, Json(json!(event))))
}

#[axum::debug_handler]
pub async fn list_events(
    State(state): State<Arc<AppConfig>>,
    Path(clinic_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Value>, AppError> {
    let events = EventScheduleService::new(&state).list_events(clinic_id, &page, auth.token()).await
        .map_err(map_clinic_error)?;

    Ok(Json(json!(Page::new(&page, events))))
}

#[axum::debug_handler]
pub async fn create_campaign(
    State(state): State<Arc<AppConfig>>,
    Path(clinic_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateCampaignRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let token = auth.token();
    CampaignService::validate(&request).map_err(map_clinic_error)?;
    ClinicService::new(&state).get_managed_clinic(clinic_id, &user, token).await
        .map_err(map_clinic_error)?;

    let campaign = CampaignService::new(&state).create_campaign(clinic_id, request, token).await
        .map_err(map_clinic_error)?;

    Ok((StatusCode::CREATED, Json(json!(campaign))))
}

#[axum::debug_handler]
pub async fn list_campaigns(
    State(state): State<Arc<AppConfig>>,
    Path(clinic_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Value>, AppError> {
    let campaigns = CampaignService::new(&state).list_campaigns(clinic_id, &page, auth.token()).await
        .map_err(map_clinic_error)?;

    Ok(Json(json!(Page::new(&page, campaigns))))
}
