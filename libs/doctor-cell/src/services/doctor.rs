use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{is_conflict, SupabaseClient};
use shared_models::auth::{User, UserRole};

use crate::models::{CreateDoctorRequest, Doctor, DoctorError, DoctorSearchQuery, UpdateDoctorRequest};

pub struct DoctorService {
    supabase: SupabaseClient,
}

impl DoctorService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Doctors register their own profile; the row is keyed by their user id.
    pub async fn create_doctor(
        &self,
        request: CreateDoctorRequest,
        actor: &User,
        auth_token: &str,
    ) -> Result<Doctor, DoctorError> {
        if actor.user_role() != Some(UserRole::Doctor) {
            return Err(DoctorError::NotADoctor);
        }
        let user_id = actor_uuid(actor)?;

        if let Some(specialization_id) = request.specialization_id {
            self.ensure_specialization(specialization_id, auth_token).await?;
        }

        debug!("Creating doctor profile for user {}", user_id);
        let now = Utc::now().to_rfc3339();
        let body = json!({
            "user_id": user_id,
            "specialization_id": request.specialization_id,
            "reservation_open": request.reservation_open.unwrap_or(true),
            "created_at": now,
            "updated_at": now,
        });

        let rows: Vec<Doctor> = self.supabase
            .write_returning(Method::POST, "/rest/v1/doctors", auth_token, body)
            .await
            .map_err(|e| {
                if is_conflict(&e) {
                    DoctorError::AlreadyExists(user_id)
                } else {
                    DoctorError::DatabaseError(e.to_string())
                }
            })?;

        let doctor = rows.into_iter().next()
            .ok_or_else(|| DoctorError::DatabaseError("Failed to create doctor profile".to_string()))?;
        info!("Doctor profile created for user {}", doctor.user_id);
        Ok(doctor)
    }

    pub async fn get_doctor(&self, user_id: Uuid, auth_token: Option<&str>) -> Result<Doctor, DoctorError> {
        let path = format!("/rest/v1/doctors?user_id=eq.{}", user_id);
        let rows: Vec<Doctor> = self.supabase.request(Method::GET, &path, auth_token, None).await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        rows.into_iter().next().ok_or(DoctorError::NotFound)
    }

    pub async fn update_doctor(
        &self,
        user_id: Uuid,
        request: UpdateDoctorRequest,
        actor: &User,
        auth_token: &str,
    ) -> Result<Doctor, DoctorError> {
        if user_id != actor_uuid(actor)? && !actor.is_admin() {
            return Err(DoctorError::Unauthorized);
        }

        if request.is_empty() {
            return self.get_doctor(user_id, Some(auth_token)).await;
        }

        let mut changes = Map::new();
        if let Some(specialization_id) = request.specialization_id {
            self.ensure_specialization(specialization_id, auth_token).await?;
            changes.insert("specialization_id".to_string(), json!(specialization_id));
        }
        if let Some(open) = request.reservation_open {
            changes.insert("reservation_open".to_string(), json!(open));
        }
        changes.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/doctors?user_id=eq.{}", user_id);
        let rows: Vec<Doctor> = self.supabase
            .write_returning(Method::PATCH, &path, auth_token, Value::Object(changes))
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        let doctor = rows.into_iter().next().ok_or(DoctorError::NotFound)?;
        debug!("Doctor {} updated, reservation_open={}", doctor.user_id, doctor.reservation_open);
        Ok(doctor)
    }

    pub async fn search_doctors(&self, query: &DoctorSearchQuery, auth_token: Option<&str>) -> Result<Vec<Doctor>, DoctorError> {
        let mut filters = vec!["reservation_open=eq.true".to_string()];
        if let Some(specialization_id) = query.specialization_id {
            filters.push(format!("specialization_id=eq.{}", specialization_id));
        }
        filters.push("order=created_at.asc".to_string());
        filters.push(query.page_query().to_query());

        let path = format!("/rest/v1/doctors?{}", filters.join("&"));
        self.supabase.request(Method::GET, &path, auth_token, None).await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))
    }

    async fn ensure_specialization(&self, specialization_id: i64, auth_token: &str) -> Result<(), DoctorError> {
        let path = format!("/rest/v1/specializations?id=eq.{}&select=id", specialization_id);
        let rows: Vec<Value> = self.supabase.select(&path, auth_token).await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        if rows.is_empty() {
            return Err(DoctorError::SpecializationNotFound);
        }
        Ok(())
    }
}

fn actor_uuid(actor: &User) -> Result<Uuid, DoctorError> {
    Uuid::parse_str(&actor.id)
        .map_err(|_| DoctorError::ValidationError("Invalid user ID format".to_string()))
}
