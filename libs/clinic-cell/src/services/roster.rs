use std::collections::HashSet;

use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{is_conflict, SupabaseClient};

use crate::models::{ClinicDoctor, ClinicError, RosterDoctor};

/// Clinic ↔ doctor associations.
pub struct RosterService {
    supabase: SupabaseClient,
}

impl RosterService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Roster entries in the order the doctors joined the clinic.
    pub async fn roster(&self, clinic_id: Uuid, auth_token: &str) -> Result<Vec<ClinicDoctor>, ClinicError> {
        let path = format!(
            "/rest/v1/clinic_doctors?clinic_id=eq.{}&order=created_at.asc,id.asc",
            clinic_id
        );
        self.supabase.select(&path, auth_token).await
            .map_err(|e| ClinicError::DatabaseError(e.to_string()))
    }

    /// Roster doctors currently accepting reservations, roster order preserved.
    pub async fn available_doctors(&self, clinic_id: Uuid, auth_token: &str) -> Result<Vec<Uuid>, ClinicError> {
        let roster = self.roster(clinic_id, auth_token).await?;
        if roster.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = roster.iter().map(|entry| entry.doctor_id).collect();
        let open: HashSet<Uuid> = self.fetch_doctors(&ids, auth_token).await?
            .into_iter()
            .filter(|d| d.reservation_open)
            .map(|d| d.user_id)
            .collect();

        Ok(ids.into_iter().filter(|id| open.contains(id)).collect())
    }

    pub async fn first_available_doctor(&self, clinic_id: Uuid, auth_token: &str) -> Result<Option<Uuid>, ClinicError> {
        let available = self.available_doctors(clinic_id, auth_token).await?;
        debug!("Clinic {} has {} available doctors", clinic_id, available.len());
        Ok(available.into_iter().next())
    }

    pub async fn add(&self, clinic_id: Uuid, doctor_id: Uuid, auth_token: &str) -> Result<ClinicDoctor, ClinicError> {
        self.ensure_doctors_exist(&[doctor_id], auth_token).await?;

        let body = json!({
            "clinic_id": clinic_id,
            "doctor_id": doctor_id,
            "created_at": Utc::now().to_rfc3339(),
        });

        let rows: Vec<ClinicDoctor> = self.supabase
            .write_returning(Method::POST, "/rest/v1/clinic_doctors", auth_token, body)
            .await
            .map_err(|e| {
                if is_conflict(&e) {
                    ClinicError::DoctorAlreadyOnRoster(doctor_id)
                } else {
                    ClinicError::DatabaseError(e.to_string())
                }
            })?;

        info!("Doctor {} added to clinic {}", doctor_id, clinic_id);
        rows.into_iter().next()
            .ok_or_else(|| ClinicError::DatabaseError("Insert returned no rows".to_string()))
    }

    pub async fn remove(&self, clinic_id: Uuid, doctor_id: Uuid, auth_token: &str) -> Result<(), ClinicError> {
        let roster = self.roster(clinic_id, auth_token).await?;
        if !roster.iter().any(|entry| entry.doctor_id == doctor_id) {
            return Err(ClinicError::DoctorNotOnRoster(doctor_id));
        }

        let path = format!(
            "/rest/v1/clinic_doctors?clinic_id=eq.{}&doctor_id=eq.{}",
            clinic_id, doctor_id
        );
        self.supabase.delete(&path, auth_token).await
            .map_err(|e| ClinicError::DatabaseError(e.to_string()))?;

        info!("Doctor {} removed from clinic {}", doctor_id, clinic_id);
        Ok(())
    }

    /// Replace the whole roster. Order of `doctor_ids` becomes roster order.
    pub async fn replace(&self, clinic_id: Uuid, doctor_ids: &[Uuid], auth_token: &str) -> Result<Vec<ClinicDoctor>, ClinicError> {
        let mut seen = HashSet::new();
        let unique: Vec<Uuid> = doctor_ids.iter().copied().filter(|id| seen.insert(*id)).collect();

        self.ensure_doctors_exist(&unique, auth_token).await?;

        let path = format!("/rest/v1/clinic_doctors?clinic_id=eq.{}", clinic_id);
        self.supabase.delete(&path, auth_token).await
            .map_err(|e| ClinicError::DatabaseError(e.to_string()))?;

        if unique.is_empty() {
            return Ok(Vec::new());
        }

        let now = Utc::now();
        let rows: Vec<Value> = unique.iter()
            .enumerate()
            .map(|(position, doctor_id)| json!({
                "clinic_id": clinic_id,
                "doctor_id": doctor_id,
                "created_at": (now + chrono::Duration::milliseconds(position as i64)).to_rfc3339(),
            }))
            .collect();

        let inserted: Vec<ClinicDoctor> = self.supabase
            .write_returning(Method::POST, "/rest/v1/clinic_doctors", auth_token, Value::Array(rows))
            .await
            .map_err(|e| ClinicError::DatabaseError(e.to_string()))?;

        info!("Clinic {} roster replaced with {} doctors", clinic_id, inserted.len());
        Ok(inserted)
    }

    async fn fetch_doctors(&self, ids: &[Uuid], auth_token: &str) -> Result<Vec<RosterDoctor>, ClinicError> {
        let list = ids.iter().map(Uuid::to_string).collect::<Vec<_>>().join(",");
        let path = format!(
            "/rest/v1/doctors?user_id=in.({})&select=user_id,specialization_id,reservation_open",
            list
        );
        self.supabase.select(&path, auth_token).await
            .map_err(|e| ClinicError::DatabaseError(e.to_string()))
    }

    async fn ensure_doctors_exist(&self, ids: &[Uuid], auth_token: &str) -> Result<(), ClinicError> {
        if ids.is_empty() {
            return Ok(());
        }

        let found: HashSet<Uuid> = self.fetch_doctors(ids, auth_token).await?
            .into_iter()
            .map(|d| d.user_id)
            .collect();

        match ids.iter().find(|id| !found.contains(id)) {
            Some(missing) => Err(ClinicError::UnknownDoctor(*missing)),
            None => Ok(()),
        }
    }
}
