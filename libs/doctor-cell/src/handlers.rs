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
use shared_models::pagination::Page;
use shared_utils::extractor::require_role;

use crate::models::{
    CreateDoctorRequest, CreateSpecializationRequest, DoctorError, DoctorSearchQuery, UpdateDoctorRequest,
};
use crate::services::{DoctorService, SpecializationService};

fn map_doctor_error(e: DoctorError) -> AppError {
    match e {
        DoctorError::NotFound | DoctorError::SpecializationNotFound => AppError::NotFound(e.to_string()),
        DoctorError::AlreadyExists(_) | DoctorError::SpecializationExists(_) => AppError::Conflict(e.to_string()),
        DoctorError::NotADoctor | DoctorError::Unauthorized => AppError::Forbidden(e.to_string()),
        DoctorError::ValidationError(msg) => AppError::ValidationError(msg),
        DoctorError::DatabaseError(msg) => AppError::Database(msg),
    }
}

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn search_doctors(
    State(config): State<Arc<AppConfig>>,
    Query(query): Query<DoctorSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let doctors = DoctorService::new(&config).search_doctors(&query, None)
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!(Page::new(&query.page_query(), doctors))))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(config): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let doctor = DoctorService::new(&config).get_doctor(doctor_id, None)
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn list_specializations(
    State(config): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let specializations = SpecializationService::new(&config).list_specializations(None)
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!(specializations)))
}

// ==============================================================================
// PROTECTED HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_doctor(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateDoctorRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let doctor = DoctorService::new(&config).create_doctor(request, &user, auth.token())
        .await
        .map_err(map_doctor_error)?;

    Ok((StatusCode::CREATED, Json(json!(doctor))))
}

#[axum::debug_handler]
pub async fn update_doctor(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<UpdateDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    let doctor = DoctorService::new(&config).update_doctor(doctor_id, request, &user, auth.token())
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn create_specialization(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateSpecializationRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_role(&user, &[UserRole::Admin])?;

    let specialization = SpecializationService::new(&config).create_specialization(request, auth.token())
        .await
        .map_err(map_doctor_error)?;

    Ok((StatusCode::CREATED, Json(json!(specialization))))
}
