use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::pagination::PageQuery;

use crate::models::{ClinicError, CreateReviewRequest, Review};

const MIN_RATING: i32 = 1;
const MAX_RATING: i32 = 5;

pub struct ReviewService {
    supabase: SupabaseClient,
}

impl ReviewService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub fn validate(request: &CreateReviewRequest) -> Result<(), ClinicError> {
        if !(MIN_RATING..=MAX_RATING).contains(&request.rating) {
            return Err(ClinicError::ValidationError(format!(
                "Rating must be between {} and {}",
                MIN_RATING, MAX_RATING
            )));
        }
        Ok(())
    }

    /// Patients may review only clinics where they hold an approved reservation.
    pub async fn create_review(
        &self,
        clinic_id: Uuid,
        patient_id: Uuid,
        request: CreateReviewRequest,
        auth_token: &str,
    ) -> Result<Review, ClinicError> {
        Self::validate(&request)?;

        if !self.has_approved_reservation(clinic_id, patient_id, auth_token).await? {
            warn!("Patient {} tried to review clinic {} without an approved reservation", patient_id, clinic_id);
            return Err(ClinicError::NoApprovedReservation);
        }

        let body = json!({
            "clinic_id": clinic_id,
            "patient_id": patient_id,
            "rating": request.rating,
            "review_text": request.review_text,
            "created_at": Utc::now().to_rfc3339(),
        });

        let rows: Vec<Review> = self.supabase
            .write_returning(Method::POST, "/rest/v1/reviews", auth_token, body)
            .await
            .map_err(|e| ClinicError::DatabaseError(e.to_string()))?;

        let review = rows.into_iter().next()
            .ok_or_else(|| ClinicError::DatabaseError("Insert returned no rows".to_string()))?;

        info!("Review {} added to clinic {}", review.id, clinic_id);
        Ok(review)
    }

    pub async fn list_reviews(&self, clinic_id: Uuid, page: &PageQuery, auth_token: &str) -> Result<Vec<Review>, ClinicError> {
        let path = format!(
            "/rest/v1/reviews?clinic_id=eq.{}&order=created_at.desc&{}",
            clinic_id,
            page.to_query()
        );
        self.supabase.select(&path, auth_token).await
            .map_err(|e| ClinicError::DatabaseError(e.to_string()))
    }

    async fn has_approved_reservation(&self, clinic_id: Uuid, patient_id: Uuid, auth_token: &str) -> Result<bool, ClinicError> {
        let path = format!(
            "/rest/v1/reservations?clinic_id=eq.{}&patient_id=eq.{}&status=eq.approved&select=id&limit=1",
            clinic_id, patient_id
        );
        let rows: Vec<Value> = self.supabase.select(&path, auth_token).await
            .map_err(|e| ClinicError::DatabaseError(e.to_string()))?;
        Ok(!rows.is_empty())
    }
}
