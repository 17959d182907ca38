use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::{User, UserRole};

use crate::models::{
    Clinic, ClinicDetails, ClinicError, ClinicSearchQuery, CreateClinicRequest, UpdateClinicRequest,
};
use crate::services::roster::RosterService;

pub struct ClinicService {
    supabase: SupabaseClient,
    roster: RosterService,
}

impl ClinicService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            roster: RosterService::new(config),
        }
    }

    pub async fn get_clinic(&self, clinic_id: Uuid, auth_token: &str) -> Result<Clinic, ClinicError> {
        let path = format!("/rest/v1/clinics?id=eq.{}", clinic_id);
        let rows: Vec<Clinic> = self.supabase.select(&path, auth_token).await
            .map_err(|e| ClinicError::DatabaseError(e.to_string()))?;

        rows.into_iter().next().ok_or(ClinicError::NotFound)
    }

    pub async fn get_details(&self, clinic_id: Uuid, auth_token: &str) -> Result<ClinicDetails, ClinicError> {
        let clinic = self.get_clinic(clinic_id, auth_token).await?;
        let doctors = self.roster.roster(clinic_id, auth_token).await?;
        Ok(ClinicDetails { clinic, doctors })
    }

    pub async fn list_clinics(&self, query: &ClinicSearchQuery, auth_token: &str) -> Result<Vec<Clinic>, ClinicError> {
        let mut filters = Vec::new();

        if let Some(name) = query.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            filters.push(format!("name=ilike.*{}*", urlencoding::encode(name)));
        }
        if let Some(owner_id) = query.owner_id {
            filters.push(format!("owner_id=eq.{}", owner_id));
        }
        filters.push("order=name.asc".to_string());
        filters.push(query.page_query().to_query());

        let path = format!("/rest/v1/clinics?{}", filters.join("&"));
        debug!("Listing clinics: {}", path);

        self.supabase.select(&path, auth_token).await
            .map_err(|e| ClinicError::DatabaseError(e.to_string()))
    }

    pub async fn create_clinic(
        &self,
        request: CreateClinicRequest,
        actor: &User,
        auth_token: &str,
    ) -> Result<ClinicDetails, ClinicError> {
        let actor_id = Uuid::parse_str(&actor.id)
            .map_err(|_| ClinicError::ValidationError("Invalid user ID format".to_string()))?;

        let owner_id = match actor.user_role() {
            Some(UserRole::ClinicOwner) => actor_id,
            Some(UserRole::Admin) => request.owner_id.ok_or_else(|| {
                ClinicError::ValidationError("owner_id is required when an admin creates a clinic".to_string())
            })?,
            _ => return Err(ClinicError::NotAuthorized("Only clinic owners can create clinics".to_string())),
        };

        if request.name.trim().is_empty() {
            return Err(ClinicError::ValidationError("Clinic name must not be empty".to_string()));
        }

        let now = Utc::now().to_rfc3339();
        let body = json!({
            "name": request.name.trim(),
            "address": request.address,
            "geolocation": request.geolocation,
            "owner_id": owner_id,
            "created_at": now,
            "updated_at": now,
        });

        let rows: Vec<Clinic> = self.supabase
            .write_returning(Method::POST, "/rest/v1/clinics", auth_token, body)
            .await
            .map_err(|e| ClinicError::DatabaseError(e.to_string()))?;

        let clinic = rows.into_iter().next()
            .ok_or_else(|| ClinicError::DatabaseError("Insert returned no rows".to_string()))?;

        let doctors = if request.doctor_ids.is_empty() {
            Vec::new()
        } else {
            self.roster.replace(clinic.id, &request.doctor_ids, auth_token).await?
        };

        info!("Clinic {} created for owner {}", clinic.id, owner_id);
        Ok(ClinicDetails { clinic, doctors })
    }

    pub async fn update_clinic(
        &self,
        clinic_id: Uuid,
        request: UpdateClinicRequest,
        actor: &User,
        auth_token: &str,
    ) -> Result<ClinicDetails, ClinicError> {
        let existing = self.get_clinic(clinic_id, auth_token).await?;
        if !existing.can_be_managed_by(actor) {
            return Err(ClinicError::NotAuthorized("Only the clinic owner can update this clinic".to_string()));
        }

        let mut changes = Map::new();
        if let Some(name) = request.name {
            if name.trim().is_empty() {
                return Err(ClinicError::ValidationError("Clinic name must not be empty".to_string()));
            }
            changes.insert("name".to_string(), json!(name.trim()));
        }
        if let Some(address) = request.address {
            changes.insert("address".to_string(), json!(address));
        }
        if let Some(geolocation) = request.geolocation {
            changes.insert("geolocation".to_string(), json!(geolocation));
        }

        let clinic = if changes.is_empty() {
            existing
        } else {
            changes.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));
            let path = format!("/rest/v1/clinics?id=eq.{}", clinic_id);
            let rows: Vec<Clinic> = self.supabase
                .write_returning(Method::PATCH, &path, auth_token, Value::Object(changes))
                .await
                .map_err(|e| ClinicError::DatabaseError(e.to_string()))?;
            rows.into_iter().next().ok_or(ClinicError::NotFound)?
        };

        let doctors = match request.doctor_ids {
            Some(ids) => self.roster.replace(clinic_id, &ids, auth_token).await?,
            None => self.roster.roster(clinic_id, auth_token).await?,
        };

        info!("Clinic {} updated", clinic_id);
        Ok(ClinicDetails { clinic, doctors })
    }

    /// Load a clinic and check the actor may manage it.
    pub async fn get_managed_clinic(&self, clinic_id: Uuid, actor: &User, auth_token: &str) -> Result<Clinic, ClinicError> {
        let clinic = self.get_clinic(clinic_id, auth_token).await?;
        if !clinic.can_be_managed_by(actor) {
            return Err(ClinicError::NotAuthorized("Only the clinic owner can manage this clinic".to_string()));
        }
        Ok(clinic)
    }

    /// Ids of every clinic the user owns.
    pub async fn owned_clinic_ids(&self, owner_id: Uuid, auth_token: &str) -> Result<Vec<Uuid>, ClinicError> {
        #[derive(serde::Deserialize)]
        struct IdRow {
            id: Uuid,
        }

        let path = format!("/rest/v1/clinics?owner_id=eq.{}&select=id", owner_id);
        let rows: Vec<IdRow> = self.supabase.select(&path, auth_token).await
            .map_err(|e| ClinicError::DatabaseError(e.to_string()))?;
        Ok(rows.into_iter().map(|r| r.id).collect())
    }
}
