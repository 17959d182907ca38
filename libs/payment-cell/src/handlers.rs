use axum::{
    body::Bytes,
    extract::{Extension, Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_models::auth::{User, UserRole};
use shared_models::error::AppError;
use shared_models::pagination::Page;
use shared_utils::extractor::require_role;

use crate::models::{
    CreateCategoryRequest, CreatePaymentMethodRequest, CreatePaymentRequest, CreateSubscriptionRequest,
    PaymentError, PaymentListQuery, WebhookDisposition, WebhookError,
};
use crate::router::PaymentState;
use crate::services::{CatalogService, PaymentService, SubscriptionService, WebhookService};

const SIGNATURE_HEADER: &str = "stripe-signature";

fn map_payment_error(e: PaymentError) -> AppError {
    match e {
        PaymentError::NotFound | PaymentError::SubscriptionNotFound => AppError::NotFound(e.to_string()),
        PaymentError::Unauthorized(msg) => AppError::Forbidden(msg),
        PaymentError::ValidationError(msg) => AppError::ValidationError(msg),
        PaymentError::Conflict(msg) => AppError::Conflict(msg),
        PaymentError::NotConfigured => AppError::Internal(e.to_string()),
        PaymentError::Gateway(msg) => AppError::ExternalService(msg),
        PaymentError::DatabaseError(msg) => AppError::Database(msg),
    }
}

// ==============================================================================
// PAYMENTS
// ==============================================================================

#[axum::debug_handler(state = PaymentState)]
pub async fn create_payment_intent(
    State(state): State<PaymentState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = PaymentService::new(&state.config);
    let created = service.create_payment_intent(request, &user, auth.token()).await
        .map_err(map_payment_error)?;

    Ok((StatusCode::CREATED, Json(json!(created))))
}

#[axum::debug_handler(state = PaymentState)]
pub async fn list_payments(
    State(state): State<PaymentState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<PaymentListQuery>,
) -> Result<Json<Value>, AppError> {
    let service = PaymentService::new(&state.config);
    let payments = service.list_payments(&query, &user, auth.token()).await
        .map_err(map_payment_error)?;

    Ok(Json(json!(Page::new(&query.page_query(), payments))))
}

#[axum::debug_handler(state = PaymentState)]
pub async fn get_payment(
    State(state): State<PaymentState>,
    Path(payment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = PaymentService::new(&state.config);
    let payment = service.get_payment(payment_id, &user, auth.token()).await
        .map_err(map_payment_error)?;

    Ok(Json(json!(payment)))
}

/// Gateway callback. Unauthenticated; the signature is the credential.
#[axum::debug_handler(state = PaymentState)]
pub async fn stripe_webhook(
    State(state): State<PaymentState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, WebhookError> {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());

    let service = WebhookService::new(&state.config, state.tasks.clone());
    if let WebhookDisposition::Ignored { event_type } = service.handle(&body, signature).await? {
        debug!("Webhook event {} acknowledged without processing", event_type);
    }

    Ok(Json(json!({ "status": "success" })))
}

// ==============================================================================
// CATALOG
// ==============================================================================

#[axum::debug_handler(state = PaymentState)]
pub async fn list_categories(
    State(state): State<PaymentState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let categories = CatalogService::new(&state.config).list_categories(auth.token()).await
        .map_err(map_payment_error)?;
    Ok(Json(json!(categories)))
}

#[axum::debug_handler(state = PaymentState)]
pub async fn create_category(
    State(state): State<PaymentState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_role(&user, &[UserRole::Admin])?;

    let category = CatalogService::new(&state.config).create_category(request, auth.token()).await
        .map_err(map_payment_error)?;
    Ok((StatusCode::CREATED, Json(json!(category))))
}

#[axum::debug_handler(state = PaymentState)]
pub async fn list_payment_methods(
    State(state): State<PaymentState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let methods = CatalogService::new(&state.config).list_payment_methods(auth.token()).await
        .map_err(map_payment_error)?;
    Ok(Json(json!(methods)))
}

#[axum::debug_handler(state = PaymentState)]
pub async fn create_payment_method(
    State(state): State<PaymentState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreatePaymentMethodRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_role(&user, &[UserRole::Admin])?;

    let method = CatalogService::new(&state.config).create_payment_method(request, auth.token()).await
        .map_err(map_payment_error)?;
    Ok((StatusCode::CREATED, Json(json!(method))))
}

// ==============================================================================
// SUBSCRIPTIONS
// ==============================================================================

#[axum::debug_handler(state = PaymentState)]
pub async fn create_subscription(
    State(state): State<PaymentState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateSubscriptionRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let subscription = SubscriptionService::new(&state.config)
        .create_subscription(request, &user, auth.token())
        .await
        .map_err(map_payment_error)?;
    Ok((StatusCode::CREATED, Json(json!(subscription))))
}

#[axum::debug_handler(state = PaymentState)]
pub async fn list_subscriptions(
    State(state): State<PaymentState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let subscriptions = SubscriptionService::new(&state.config)
        .list_subscriptions(&user, auth.token())
        .await
        .map_err(map_payment_error)?;
    Ok(Json(json!(subscriptions)))
}

#[axum::debug_handler(state = PaymentState)]
pub async fn cancel_subscription(
    State(state): State<PaymentState>,
    Path(subscription_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let subscription = SubscriptionService::new(&state.config)
        .cancel_subscription(subscription_id, &user, auth.token())
        .await
        .map_err(map_payment_error)?;
    Ok(Json(json!(subscription)))
}
