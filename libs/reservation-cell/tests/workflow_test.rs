use std::sync::Arc;

use assert_matches::assert_matches;
use axum::body::Bytes;
use axum::extract::{Extension, Path, Query, State};
use axum::Json;
use axum_extra::TypedHeader;
use chrono::{Duration, NaiveTime, Utc};
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use reservation_cell::handlers::*;
use reservation_cell::models::{CreateReservationRequest, ReservationSearchQuery};
use reservation_cell::ReservationState;
use shared_models::error::AppError;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};
use task_queue_cell::{InMemoryTaskQueue, Task};

struct Scenario {
    server: MockServer,
    queue: Arc<InMemoryTaskQueue>,
    owner: TestUser,
    patient: TestUser,
    clinic_id: Uuid,
    reservation_id: Uuid,
}

impl Scenario {
    async fn new() -> Self {
        Self {
            server: MockServer::start().await,
            queue: Arc::new(InMemoryTaskQueue::new()),
            owner: TestUser::clinic_owner("owner@example.com"),
            patient: TestUser::patient("patient@example.com"),
            clinic_id: Uuid::new_v4(),
            reservation_id: Uuid::new_v4(),
        }
    }

    fn state(&self) -> State<ReservationState> {
        State(ReservationState {
            config: Arc::new(TestConfig::default().with_mock_server(&self.server.uri())),
            tasks: self.queue.clone(),
        })
    }

    fn reservation_row(&self, status: &str) -> Value {
        MockSupabaseResponses::reservation_response(
            &self.reservation_id.to_string(),
            &self.patient.id,
            &self.clinic_id.to_string(),
            status,
        )
    }

    async fn mount_reservation(&self, status: &str) {
        Mock::given(method("GET"))
            .and(path("/rest/v1/reservations"))
            .and(query_param("id", format!("eq.{}", self.reservation_id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([self.reservation_row(status)])))
            .mount(&self.server)
            .await;
    }

    async fn mount_clinic(&self) {
        Mock::given(method("GET"))
            .and(path("/rest/v1/clinics"))
            .and(query_param("id", format!("eq.{}", self.clinic_id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                MockSupabaseResponses::clinic_response(&self.clinic_id.to_string(), &self.owner.id)
            ])))
            .mount(&self.server)
            .await;
    }

    async fn mount_roster(&self, doctors: &[Uuid]) {
        let roster: Vec<Value> = doctors.iter()
            .enumerate()
            .map(|(i, id)| MockSupabaseResponses::clinic_doctor_response(
                &self.clinic_id.to_string(),
                &id.to_string(),
                &format!("2024-01-0{}T00:00:00Z", i + 1),
            ))
            .collect();
        let rows: Vec<Value> = doctors.iter()
            .map(|id| MockSupabaseResponses::doctor_response(&id.to_string(), true))
            .collect();

        Mock::given(method("GET"))
            .and(path("/rest/v1/clinic_doctors"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(roster)))
            .mount(&self.server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/doctors"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(rows)))
            .mount(&self.server)
            .await;
    }

    async fn mount_patient_email(&self) {
        Mock::given(method("GET"))
            .and(path("/rest/v1/users"))
            .and(query_param("id", format!("eq.{}", self.patient.id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                MockSupabaseResponses::user_response(&self.patient.id, &self.patient.email, "patient")
            ])))
            .mount(&self.server)
            .await;
    }

    async fn expect_status_patch(&self, from: &str, result_status: Option<&str>, times: u64) {
        let body = match result_status {
            Some(status) => json!([self.reservation_row(status)]),
            None => json!([]),
        };
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/reservations"))
            .and(query_param("status", format!("eq.{}", from)))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(times)
            .mount(&self.server)
            .await;
    }

    async fn expect_assignment(&self, status: u16, times: u64) {
        let response = if status < 300 {
            ResponseTemplate::new(status).set_body_json(json!([{
                "id": Uuid::new_v4(),
                "reservation_id": self.reservation_id,
                "doctor_id": Uuid::new_v4(),
                "created_at": "2024-01-01T00:00:00Z"
            }]))
        } else {
            ResponseTemplate::new(status).set_body_json(
                MockSupabaseResponses::error_response("insert failed", "XX000"),
            )
        };
        Mock::given(method("POST"))
            .and(path("/rest/v1/reservation_doctors"))
            .respond_with(response)
            .expect(times)
            .mount(&self.server)
            .await;
    }

    async fn approve_as(&self, actor: &TestUser) -> Result<Json<Value>, AppError> {
        approve_reservation(
            self.state(),
            Path(self.reservation_id),
            bearer(actor),
            Extension(actor.to_user()),
        )
        .await
    }

    async fn reject_as(&self, actor: &TestUser, body: &str) -> Result<Json<Value>, AppError> {
        reject_reservation(
            self.state(),
            Path(self.reservation_id),
            bearer(actor),
            Extension(actor.to_user()),
            Bytes::from(body.to_string()),
        )
        .await
    }
}

fn bearer(user: &TestUser) -> TypedHeader<Authorization<Bearer>> {
    let token = JwtTestUtils::create_test_token(user, &TestConfig::default().jwt_secret, None);
    TypedHeader(Authorization::bearer(&token).unwrap())
}

// ==============================================================================
// APPROVE
// ==============================================================================

#[tokio::test]
async fn test_approve_assigns_first_roster_doctor_and_queues_two_notifications() {
    let s = Scenario::new().await;
    let (d1, d2) = (Uuid::new_v4(), Uuid::new_v4());

    s.mount_reservation("pending").await;
    s.mount_clinic().await;
    s.mount_roster(&[d1, d2]).await;
    s.mount_patient_email().await;
    s.expect_status_patch("pending", Some("approved"), 1).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/reservation_doctors"))
        .and(body_partial_json(json!({
            "reservation_id": s.reservation_id,
            "doctor_id": d1
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "id": Uuid::new_v4(),
            "reservation_id": s.reservation_id,
            "doctor_id": d1,
            "created_at": "2024-01-01T00:00:00Z"
        }])))
        .expect(1)
        .mount(&s.server)
        .await;

    let Json(body) = s.approve_as(&s.owner).await.unwrap();

    assert_eq!(body["reservation"]["status"], "approved");
    assert_eq!(body["assigned_doctor_id"], d1.to_string());

    let tasks = s.queue.dispatched();
    assert_eq!(tasks.len(), 2);
    assert!(tasks.contains(&Task::send_sms(s.patient.uuid(), "Your reservation has been approved.")));
    assert!(tasks.contains(&Task::send_email(
        "patient@example.com",
        "Reservation Approved",
        "Your reservation has been approved."
    )));
}

#[tokio::test]
async fn test_approving_approved_reservation_fails_without_notifying() {
    let s = Scenario::new().await;

    s.mount_reservation("approved").await;
    s.mount_clinic().await;
    s.mount_roster(&[Uuid::new_v4()]).await;
    s.expect_status_patch("pending", Some("approved"), 0).await;
    s.expect_assignment(201, 0).await;

    let result = s.approve_as(&s.owner).await;

    assert_matches!(result, Err(AppError::BadRequest(msg)) if msg == "Reservation already approved");
    assert!(s.queue.dispatched().is_empty());
}

#[tokio::test]
async fn test_approve_without_available_doctor_leaves_reservation_pending() {
    let s = Scenario::new().await;

    s.mount_reservation("pending").await;
    s.mount_clinic().await;
    s.mount_roster(&[]).await;
    s.expect_status_patch("pending", Some("approved"), 0).await;
    s.expect_assignment(201, 0).await;

    let result = s.approve_as(&s.owner).await;

    assert_matches!(result, Err(AppError::BadRequest(msg)) if msg == "No doctors available");
    assert!(s.queue.dispatched().is_empty());
}

#[tokio::test]
async fn test_owner_of_another_clinic_cannot_approve_or_reject() {
    let s = Scenario::new().await;
    let other_owner = TestUser::clinic_owner("other-owner@example.com");

    s.mount_reservation("pending").await;
    s.mount_clinic().await;
    s.expect_status_patch("pending", Some("approved"), 0).await;

    assert_matches!(s.approve_as(&other_owner).await, Err(AppError::Forbidden(_)));
    assert_matches!(s.reject_as(&other_owner, "").await, Err(AppError::Forbidden(_)));
    assert!(s.queue.dispatched().is_empty());
}

#[tokio::test]
async fn test_admin_does_not_bypass_clinic_ownership() {
    let s = Scenario::new().await;
    let admin = TestUser::admin("admin@example.com");

    s.mount_reservation("pending").await;
    s.mount_clinic().await;
    s.expect_status_patch("pending", Some("approved"), 0).await;

    assert_matches!(s.approve_as(&admin).await, Err(AppError::Forbidden(_)));
}

#[tokio::test]
async fn test_failed_doctor_assignment_reverts_status() {
    let s = Scenario::new().await;

    s.mount_reservation("pending").await;
    s.mount_clinic().await;
    s.mount_roster(&[Uuid::new_v4()]).await;
    s.expect_status_patch("pending", Some("approved"), 1).await;
    s.expect_status_patch("approved", Some("pending"), 1).await;
    s.expect_assignment(500, 1).await;

    let result = s.approve_as(&s.owner).await;

    assert_matches!(result, Err(AppError::Database(_)));
    assert!(s.queue.dispatched().is_empty());
}

#[tokio::test]
async fn test_concurrent_approval_loses_race_cleanly() {
    let s = Scenario::new().await;

    // First read sees pending, the re-read after the guarded update sees approved.
    Mock::given(method("GET"))
        .and(path("/rest/v1/reservations"))
        .and(query_param("id", format!("eq.{}", s.reservation_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([s.reservation_row("pending")])))
        .up_to_n_times(1)
        .mount(&s.server)
        .await;
    s.mount_reservation("approved").await;
    s.mount_clinic().await;
    s.mount_roster(&[Uuid::new_v4()]).await;
    s.expect_status_patch("pending", None, 1).await;
    s.expect_assignment(201, 0).await;

    let result = s.approve_as(&s.owner).await;

    assert_matches!(result, Err(AppError::BadRequest(msg)) if msg == "Reservation already approved");
    assert!(s.queue.dispatched().is_empty());
}

#[tokio::test]
async fn test_approve_succeeds_when_queue_is_down() {
    let s = Scenario::new().await;
    s.queue.set_unavailable(true);

    s.mount_reservation("pending").await;
    s.mount_clinic().await;
    s.mount_roster(&[Uuid::new_v4()]).await;
    s.mount_patient_email().await;
    s.expect_status_patch("pending", Some("approved"), 1).await;
    s.expect_assignment(201, 1).await;

    let Json(body) = s.approve_as(&s.owner).await.unwrap();

    assert_eq!(body["reservation"]["status"], "approved");
    assert!(s.queue.dispatched().is_empty());
}

// ==============================================================================
// REJECT
// ==============================================================================

#[tokio::test]
async fn test_reject_records_reason_and_never_assigns_doctor() {
    let s = Scenario::new().await;

    s.mount_reservation("pending").await;
    s.mount_clinic().await;
    s.mount_patient_email().await;
    s.expect_assignment(201, 0).await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/reservations"))
        .and(query_param("status", "eq.pending"))
        .and(body_partial_json(json!({
            "status": "rejected",
            "reason_for_cancellation": "Fully booked"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([s.reservation_row("rejected")])))
        .expect(1)
        .mount(&s.server)
        .await;

    let Json(body) = s.reject_as(&s.owner, r#"{"reason": "Fully booked"}"#).await.unwrap();

    assert_eq!(body["status"], "Reservation rejected");
    let tasks = s.queue.dispatched();
    assert_eq!(tasks.len(), 2);
    assert!(tasks.contains(&Task::send_sms(s.patient.uuid(), "Your reservation has been rejected.")));
    assert!(tasks.contains(&Task::send_email(
        "patient@example.com",
        "Reservation Rejected",
        "Your reservation has been rejected. Reason: Fully booked"
    )));
}

#[tokio::test]
async fn test_reject_without_body_records_empty_reason() {
    let s = Scenario::new().await;

    s.mount_reservation("pending").await;
    s.mount_clinic().await;
    s.mount_patient_email().await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/reservations"))
        .and(body_partial_json(json!({ "reason_for_cancellation": "" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([s.reservation_row("rejected")])))
        .expect(1)
        .mount(&s.server)
        .await;

    s.reject_as(&s.owner, "").await.unwrap();

    assert!(s.queue.dispatched().contains(&Task::send_email(
        "patient@example.com",
        "Reservation Rejected",
        "Your reservation has been rejected. Reason: "
    )));
}

#[tokio::test]
async fn test_reject_of_non_pending_reservation_is_a_conflict() {
    let s = Scenario::new().await;

    s.mount_reservation("approved").await;
    s.mount_clinic().await;
    s.expect_status_patch("pending", Some("rejected"), 0).await;

    assert_matches!(s.reject_as(&s.owner, "").await, Err(AppError::Conflict(_)));
    assert!(s.queue.dispatched().is_empty());
}

// ==============================================================================
// BOOKING & SEARCH
// ==============================================================================

#[tokio::test]
async fn test_patient_books_pending_reservation() {
    let s = Scenario::new().await;
    s.mount_clinic().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/reservations"))
        .and(body_partial_json(json!({
            "patient_id": s.patient.id,
            "status": "pending"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([s.reservation_row("pending")])))
        .expect(1)
        .mount(&s.server)
        .await;

    let request = CreateReservationRequest {
        patient_id: None,
        clinic_id: s.clinic_id,
        reservation_date: (Utc::now() + Duration::days(7)).date_naive(),
        reservation_time: NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
    };

    let (status, Json(body)) = create_reservation(
        s.state(),
        bearer(&s.patient),
        Extension(s.patient.to_user()),
        Json(request),
    )
    .await
    .unwrap();

    assert_eq!(status, axum::http::StatusCode::CREATED);
    assert_eq!(body["status"], "pending");
}

#[tokio::test]
async fn test_patient_cannot_book_for_someone_else() {
    let s = Scenario::new().await;

    let request = CreateReservationRequest {
        patient_id: Some(Uuid::new_v4()),
        clinic_id: s.clinic_id,
        reservation_date: (Utc::now() + Duration::days(7)).date_naive(),
        reservation_time: NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
    };

    let result = create_reservation(s.state(), bearer(&s.patient), Extension(s.patient.to_user()), Json(request)).await;
    assert_matches!(result, Err(AppError::Forbidden(_)));
}

#[tokio::test]
async fn test_booking_in_the_past_is_rejected() {
    let s = Scenario::new().await;

    let request = CreateReservationRequest {
        patient_id: None,
        clinic_id: s.clinic_id,
        reservation_date: (Utc::now() - Duration::days(2)).date_naive(),
        reservation_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
    };

    let result = create_reservation(s.state(), bearer(&s.patient), Extension(s.patient.to_user()), Json(request)).await;
    assert_matches!(result, Err(AppError::ValidationError(_)));
}

#[tokio::test]
async fn test_patient_search_is_scoped_to_own_reservations() {
    let s = Scenario::new().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/reservations"))
        .and(query_param("patient_id", format!("eq.{}", s.patient.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([s.reservation_row("pending")])))
        .expect(1)
        .mount(&s.server)
        .await;

    let query = ReservationSearchQuery { patient_id: Some(Uuid::new_v4()), ..Default::default() };
    let Json(body) = search_reservations(
        s.state(),
        bearer(&s.patient),
        Extension(s.patient.to_user()),
        Query(query),
    )
    .await
    .unwrap();

    assert_eq!(body["results"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_owner_cannot_search_another_clinic() {
    let s = Scenario::new().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/clinics"))
        .and(query_param("owner_id", format!("eq.{}", s.owner.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": s.clinic_id }])))
        .mount(&s.server)
        .await;

    let query = ReservationSearchQuery { clinic_id: Some(Uuid::new_v4()), ..Default::default() };
    let result = search_reservations(s.state(), bearer(&s.owner), Extension(s.owner.to_user()), Query(query)).await;

    assert_matches!(result, Err(AppError::Forbidden(_)));
}
