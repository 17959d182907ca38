use chrono::Utc;
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{is_conflict, SupabaseClient};
use shared_models::auth::{User, UserRole};
use shared_models::pagination::PageQuery;

use crate::models::{CreatePatientRequest, Patient, PatientError, UpdatePatientRequest};

pub struct PatientService {
    supabase: SupabaseClient,
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_patient(
        &self,
        request: CreatePatientRequest,
        actor: &User,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        let actor_id = actor_uuid(actor)?;
        let user_id = request.user_id.unwrap_or(actor_id);

        if user_id != actor_id && !actor.is_admin() {
            return Err(PatientError::Unauthorized);
        }

        debug!("Creating patient record for user {}", user_id);
        if self.find_patient(user_id, auth_token).await?.is_some() {
            return Err(PatientError::AlreadyExists(user_id));
        }

        let now = Utc::now().to_rfc3339();
        let body = json!({
            "user_id": user_id,
            "medical_history": request.medical_history,
            "created_at": now,
            "updated_at": now,
        });

        let rows: Vec<Patient> = self.supabase
            .write_returning(Method::POST, "/rest/v1/patients", auth_token, body)
            .await
            .map_err(|e| {
                if is_conflict(&e) {
                    PatientError::AlreadyExists(user_id)
                } else {
                    PatientError::DatabaseError(e.to_string())
                }
            })?;

        let patient = rows.into_iter().next()
            .ok_or_else(|| PatientError::DatabaseError("Failed to create patient record".to_string()))?;
        info!("Patient record created for user {}", patient.user_id);
        Ok(patient)
    }

    /// Patients see themselves; clinical staff and admins see anyone.
    pub async fn get_patient(&self, user_id: Uuid, actor: &User, auth_token: &str) -> Result<Patient, PatientError> {
        if !can_read(actor, user_id)? {
            return Err(PatientError::Unauthorized);
        }

        self.find_patient(user_id, auth_token).await?
            .ok_or(PatientError::NotFound)
    }

    pub async fn update_patient(
        &self,
        user_id: Uuid,
        request: UpdatePatientRequest,
        actor: &User,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        if user_id != actor_uuid(actor)? && !actor.is_admin() {
            return Err(PatientError::Unauthorized);
        }

        let Some(medical_history) = request.medical_history else {
            return self.find_patient(user_id, auth_token).await?.ok_or(PatientError::NotFound);
        };

        let path = format!("/rest/v1/patients?user_id=eq.{}", user_id);
        let body = json!({
            "medical_history": medical_history,
            "updated_at": Utc::now().to_rfc3339(),
        });

        let rows: Vec<Patient> = self.supabase
            .write_returning(Method::PATCH, &path, auth_token, body)
            .await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        rows.into_iter().next().ok_or(PatientError::NotFound)
    }

    pub async fn list_patients(&self, page: &PageQuery, actor: &User, auth_token: &str) -> Result<Vec<Patient>, PatientError> {
        if !matches!(
            actor.user_role(),
            Some(UserRole::Admin | UserRole::Doctor | UserRole::ClinicOwner)
        ) {
            return Err(PatientError::Unauthorized);
        }

        let path = format!("/rest/v1/patients?order=created_at.desc&{}", page.to_query());
        self.supabase.select(&path, auth_token).await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))
    }

    async fn find_patient(&self, user_id: Uuid, auth_token: &str) -> Result<Option<Patient>, PatientError> {
        let path = format!("/rest/v1/patients?user_id=eq.{}", user_id);
        let rows: Vec<Patient> = self.supabase.select(&path, auth_token).await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?;
        Ok(rows.into_iter().next())
    }
}

fn can_read(actor: &User, user_id: Uuid) -> Result<bool, PatientError> {
    Ok(match actor.user_role() {
        Some(UserRole::Admin | UserRole::Doctor | UserRole::ClinicOwner) => true,
        _ => actor_uuid(actor)? == user_id,
    })
}

fn actor_uuid(actor: &User) -> Result<Uuid, PatientError> {
    Uuid::parse_str(&actor.id)
        .map_err(|_| PatientError::ValidationError("Invalid user ID format".to_string()))
}
