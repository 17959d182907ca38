use std::sync::Arc;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use base64::{Engine as _, engine::general_purpose};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub stripe_webhook_secret: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            stripe_webhook_secret: "whsec_test_secret".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_service_role_key: "test-service-role-key".to_string(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            redis_url: None,
            stripe_secret_key: "sk_test_123".to_string(),
            stripe_webhook_secret: self.stripe_webhook_secret.clone(),
            stripe_api_base_url: "http://localhost:12111".to_string(),
            stripe_currency: "eur".to_string(),
            twilio_account_sid: "AC_test".to_string(),
            twilio_auth_token: "twilio-test-token".to_string(),
            twilio_from_number: "+15005550006".to_string(),
            twilio_api_base_url: "http://localhost:12112".to_string(),
            smtp_host: String::new(),
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            smtp_from: "Clinic Booking <no-reply@example.com>".to_string(),
            server_port: 3000,
            worker_concurrency: 1,
        }
    }

    /// Config whose Supabase, Stripe and Twilio endpoints all point at `mock_uri`.
    pub fn with_mock_server(&self, mock_uri: &str) -> AppConfig {
        let mut config = self.to_app_config();
        config.supabase_url = mock_uri.to_string();
        config.stripe_api_base_url = mock_uri.to_string();
        config.twilio_api_base_url = mock_uri.to_string();
        config
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "patient".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id.to_string();
        self
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, "doctor")
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "patient")
    }

    pub fn clinic_owner(email: &str) -> Self {
        Self::new(email, "clinic_owner")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn uuid(&self) -> Uuid {
        Uuid::parse_str(&self.id).expect("test user ids are uuids")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    fn sign(payload: Value, secret: &str) -> String {
        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        Self::sign(json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        }), secret)
    }

    /// Token shaped like Supabase issues it: platform role plus app role in metadata.
    pub fn create_supabase_token(user: &TestUser, secret: &str) -> String {
        let now = Utc::now();
        Self::sign(json!({
            "sub": user.id,
            "email": user.email,
            "role": "authenticated",
            "app_metadata": { "role": user.role },
            "iat": now.timestamp(),
            "exp": (now + Duration::hours(1)).timestamp()
        }), secret)
    }

    /// Supabase token whose only role claim sits in the user-editable metadata.
    pub fn create_user_metadata_role_token(user: &TestUser, claimed_role: &str, secret: &str) -> String {
        let now = Utc::now();
        Self::sign(json!({
            "sub": user.id,
            "email": user.email,
            "role": "authenticated",
            "app_metadata": { "provider": "email" },
            "user_metadata": { "role": claimed_role },
            "iat": now.timestamp(),
            "exp": (now + Duration::hours(1)).timestamp()
        }), secret)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Rows as PostgREST returns them for the clinic-booking tables.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn user_response(user_id: &str, email: &str, role: &str) -> Value {
        json!({
            "id": user_id,
            "email": email,
            "first_name": "Test",
            "last_name": "User",
            "role": role,
            "is_active": true,
            "date_joined": "2024-01-01T00:00:00Z"
        })
    }

    pub fn profile_response(user_id: &str, phone_number: Option<&str>) -> Value {
        json!({
            "id": Uuid::new_v4(),
            "user_id": user_id,
            "address": "1 Main Street",
            "phone_number": phone_number,
            "html_content": null,
            "json_content": null,
            "avatar_url": null,
            "geolocation": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn clinic_response(clinic_id: &str, owner_id: &str) -> Value {
        json!({
            "id": clinic_id,
            "name": "Harbour Clinic",
            "address": "12 Quay Road",
            "owner_id": owner_id,
            "geolocation": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn clinic_doctor_response(clinic_id: &str, doctor_id: &str, created_at: &str) -> Value {
        json!({
            "id": Uuid::new_v4(),
            "clinic_id": clinic_id,
            "doctor_id": doctor_id,
            "created_at": created_at
        })
    }

    pub fn doctor_response(doctor_id: &str, reservation_open: bool) -> Value {
        json!({
            "user_id": doctor_id,
            "specialization_id": null,
            "reservation_open": reservation_open,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn reservation_response(reservation_id: &str, patient_id: &str, clinic_id: &str, status: &str) -> Value {
        json!({
            "id": reservation_id,
            "patient_id": patient_id,
            "clinic_id": clinic_id,
            "status": status,
            "reason_for_cancellation": null,
            "reservation_date": "2030-05-14",
            "reservation_time": "10:30:00",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn payment_response(payment_id: &str, user_id: &str, intent_id: &str, status: &str) -> Value {
        json!({
            "id": payment_id,
            "user_id": user_id,
            "amount": 45.0,
            "currency": "eur",
            "method_id": null,
            "payment_status": status,
            "subscription_id": null,
            "reservation_id": Uuid::new_v4(),
            "payment_intent_id": intent_id,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn post_response(post_id: &str, doctor_id: &str, post_type: &str) -> Value {
        json!({
            "id": post_id,
            "doctor_id": doctor_id,
            "title": "Staying hydrated",
            "html_content": null,
            "json_content": null,
            "content": "Drink water.",
            "post_type": post_type,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn error_response(message: &str, code: &str) -> Value {
        json!({
            "message": message,
            "code": code
        })
    }
}
