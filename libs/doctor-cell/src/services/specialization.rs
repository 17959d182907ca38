use reqwest::Method;
use serde_json::json;
use tracing::info;

use shared_config::AppConfig;
use shared_database::supabase::{is_conflict, SupabaseClient};

use crate::models::{CreateSpecializationRequest, DoctorError, Specialization};

pub struct SpecializationService {
    supabase: SupabaseClient,
}

impl SpecializationService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn list_specializations(&self, auth_token: Option<&str>) -> Result<Vec<Specialization>, DoctorError> {
        self.supabase
            .request(Method::GET, "/rest/v1/specializations?order=name.asc", auth_token, None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))
    }

    pub async fn create_specialization(
        &self,
        request: CreateSpecializationRequest,
        auth_token: &str,
    ) -> Result<Specialization, DoctorError> {
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(DoctorError::ValidationError("Specialization name is required".to_string()));
        }

        let rows: Vec<Specialization> = self.supabase
            .write_returning(Method::POST, "/rest/v1/specializations", auth_token, json!({ "name": name }))
            .await
            .map_err(|e| {
                if is_conflict(&e) {
                    DoctorError::SpecializationExists(name.clone())
                } else {
                    DoctorError::DatabaseError(e.to_string())
                }
            })?;

        let specialization = rows.into_iter().next()
            .ok_or_else(|| DoctorError::DatabaseError("Failed to create specialization".to_string()))?;
        info!("Specialization {} created", specialization.name);
        Ok(specialization)
    }
}
