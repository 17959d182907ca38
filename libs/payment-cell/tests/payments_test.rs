use std::sync::Arc;

use assert_matches::assert_matches;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::Json;
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use payment_cell::handlers::{create_category, create_payment_intent, get_payment};
use payment_cell::models::{CreateCategoryRequest, CreatePaymentRequest};
use payment_cell::PaymentState;
use shared_models::error::AppError;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};
use task_queue_cell::InMemoryTaskQueue;

fn state(server: &MockServer) -> State<PaymentState> {
    State(PaymentState {
        config: Arc::new(TestConfig::default().with_mock_server(&server.uri())),
        tasks: Arc::new(InMemoryTaskQueue::new()),
    })
}

fn bearer(user: &TestUser) -> TypedHeader<Authorization<Bearer>> {
    let token = JwtTestUtils::create_test_token(user, &TestConfig::default().jwt_secret, None);
    TypedHeader(Authorization::bearer(&token).unwrap())
}

fn payment_request(subscription_id: Option<Uuid>, reservation_id: Option<Uuid>) -> CreatePaymentRequest {
    CreatePaymentRequest {
        amount: 45.0,
        currency: Some("EUR".to_string()),
        method_id: None,
        subscription_id,
        reservation_id,
    }
}

#[tokio::test]
async fn payment_for_a_reservation_opens_an_intent_and_records_it() {
    let server = MockServer::start().await;
    let patient = TestUser::patient("patient@example.com");
    let reservation_id = Uuid::new_v4();
    let payment_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/reservations"))
        .and(query_param("id", format!("eq.{}", reservation_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "patient_id": patient.id }])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/payment_intents"))
        .and(header("authorization", "Bearer sk_test_123"))
        .and(body_string_contains("amount=4500"))
        .and(body_string_contains("currency=eur"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "pi_123",
            "status": "requires_payment_method",
            "client_secret": "pi_123_secret_abc"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/payments"))
        .and(body_partial_json(json!({
            "payment_intent_id": "pi_123",
            "payment_status": "requires_payment_method",
            "reservation_id": reservation_id,
            "subscription_id": null
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::payment_response(&payment_id, &patient.id, "pi_123", "requires_payment_method")
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let (status, body) = create_payment_intent(
        state(&server),
        bearer(&patient),
        Extension(patient.to_user()),
        Json(payment_request(None, Some(reservation_id))),
    )
    .await
    .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["client_secret"], "pi_123_secret_abc");
    assert_eq!(body["payment"]["payment_intent_id"], "pi_123");
}

#[tokio::test]
async fn payment_needs_exactly_one_target() {
    let server = MockServer::start().await;
    let patient = TestUser::patient("patient@example.com");

    Mock::given(method("POST"))
        .and(path("/v1/payment_intents"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let neither = create_payment_intent(
        state(&server),
        bearer(&patient),
        Extension(patient.to_user()),
        Json(payment_request(None, None)),
    )
    .await;
    assert_matches!(neither, Err(AppError::ValidationError(msg)) if msg.contains("but not both"));

    let both = create_payment_intent(
        state(&server),
        bearer(&patient),
        Extension(patient.to_user()),
        Json(payment_request(Some(Uuid::new_v4()), Some(Uuid::new_v4()))),
    )
    .await;
    assert_matches!(both, Err(AppError::ValidationError(_)));
}

#[tokio::test]
async fn paying_for_someone_elses_reservation_is_forbidden() {
    let server = MockServer::start().await;
    let patient = TestUser::patient("patient@example.com");
    let reservation_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/reservations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "patient_id": Uuid::new_v4() }])))
        .mount(&server)
        .await;

    let result = create_payment_intent(
        state(&server),
        bearer(&patient),
        Extension(patient.to_user()),
        Json(payment_request(None, Some(reservation_id))),
    )
    .await;

    assert_matches!(result, Err(AppError::Forbidden(_)));
}

#[tokio::test]
async fn gateway_failure_surfaces_as_external_error() {
    let server = MockServer::start().await;
    let patient = TestUser::patient("patient@example.com");

    Mock::given(method("GET"))
        .and(path("/rest/v1/subscriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "user_id": patient.id }])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/payment_intents"))
        .respond_with(ResponseTemplate::new(402).set_body_json(json!({ "error": { "message": "card declined" } })))
        .mount(&server)
        .await;

    let result = create_payment_intent(
        state(&server),
        bearer(&patient),
        Extension(patient.to_user()),
        Json(payment_request(Some(Uuid::new_v4()), None)),
    )
    .await;

    assert_matches!(result, Err(AppError::ExternalService(_)));
}

#[tokio::test]
async fn patients_cannot_read_other_patients_payments() {
    let server = MockServer::start().await;
    let patient = TestUser::patient("patient@example.com");
    let payment_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/payments"))
        .and(query_param("id", format!("eq.{}", payment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::payment_response(&payment_id.to_string(), &Uuid::new_v4().to_string(), "pi_1", "succeeded")
        ])))
        .mount(&server)
        .await;

    let result = get_payment(
        state(&server),
        axum::extract::Path(payment_id),
        bearer(&patient),
        Extension(patient.to_user()),
    )
    .await;

    assert_matches!(result, Err(AppError::Forbidden(_)));
}

#[tokio::test]
async fn only_admins_create_categories_and_duplicates_conflict() {
    let server = MockServer::start().await;
    let admin = TestUser::admin("admin@example.com");
    let patient = TestUser::patient("patient@example.com");

    let forbidden = create_category(
        state(&server),
        bearer(&patient),
        Extension(patient.to_user()),
        Json(CreateCategoryRequest { name: "Premium".to_string(), description: None }),
    )
    .await;
    assert_matches!(forbidden, Err(AppError::Forbidden(_)));

    Mock::given(method("POST"))
        .and(path("/rest/v1/categories"))
        .respond_with(ResponseTemplate::new(409).set_body_json(
            MockSupabaseResponses::error_response("duplicate key value violates unique constraint", "23505"),
        ))
        .mount(&server)
        .await;

    let duplicate = create_category(
        state(&server),
        bearer(&admin),
        Extension(admin.to_user()),
        Json(CreateCategoryRequest { name: "Premium".to_string(), description: None }),
    )
    .await;
    assert_matches!(duplicate, Err(AppError::Conflict(_)));
}

#[tokio::test]
async fn sub_cent_amount_never_reaches_the_gateway() {
    let server = MockServer::start().await;
    let patient = TestUser::patient("patient@example.com");

    Mock::given(method("POST"))
        .and(path("/v1/payment_intents"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let request = CreatePaymentRequest { amount: 0.004, ..payment_request(None, Some(Uuid::new_v4())) };
    let result = create_payment_intent(state(&server), bearer(&patient), Extension(patient.to_user()), Json(request)).await;

    assert_matches!(result, Err(AppError::ValidationError(_)));
}
