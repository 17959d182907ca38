use reqwest::Method;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::pagination::PageQuery;

use crate::models::{
    AdvertisingCampaign, ClinicError, CreateCampaignRequest, CreateEventRequest, EventSchedule,
    DEFAULT_CAMPAIGN_STATUS,
};
use crate::services::roster::RosterService;

pub struct EventScheduleService {
    supabase: SupabaseClient,
    roster: RosterService,
}

impl EventScheduleService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            roster: RosterService::new(config),
        }
    }

    pub fn validate(request: &CreateEventRequest) -> Result<(), ClinicError> {
        if request.event_name.trim().is_empty() {
            return Err(ClinicError::ValidationError("Event name must not be empty".to_string()));
        }
        if request.start_time >= request.end_time {
            return Err(ClinicError::ValidationError("start_time must be before end_time".to_string()));
        }
        Ok(())
    }

    pub async fn create_event(
        &self,
        clinic_id: Uuid,
        request: CreateEventRequest,
        auth_token: &str,
    ) -> Result<EventSchedule, ClinicError> {
        Self::validate(&request)?;

        if let Some(doctor_id) = request.doctor_id {
            let roster = self.roster.roster(clinic_id, auth_token).await?;
            if !roster.iter().any(|entry| entry.doctor_id == doctor_id) {
                return Err(ClinicError::DoctorNotOnRoster(doctor_id));
            }
        }

        let body = json!({
            "clinic_id": clinic_id,
            "doctor_id": request.doctor_id,
            "event_name": request.event_name.trim(),
            "start_time": request.start_time.to_rfc3339(),
            "end_time": request.end_time.to_rfc3339(),
            "description": request.description,
        });

        let rows: Vec<EventSchedule> = self.supabase
            .write_returning(Method::POST, "/rest/v1/event_schedules", auth_token, body)
            .await
            .map_err(|e| ClinicError::DatabaseError(e.to_string()))?;

        let event = rows.into_iter().next()
            .ok_or_else(|| ClinicError::DatabaseError("Insert returned no rows".to_string()))?;

        info!("Event {} scheduled at clinic {}", event.id, clinic_id);
        Ok(event)
    }

    pub async fn list_events(&self, clinic_id: Uuid, page: &PageQuery, auth_token: &str) -> Result<Vec<EventSchedule>, ClinicError> {
        let path = format!(
            "/rest/v1/event_schedules?clinic_id=eq.{}&order=start_time.asc&{}",
            clinic_id,
            page.to_query()
        );
        self.supabase.select(&path, auth_token).await
            .map_err(|e| ClinicError::DatabaseError(e.to_string()))
    }
}

pub struct CampaignService {
    supabase: SupabaseClient,
}

impl CampaignService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub fn validate(request: &CreateCampaignRequest) -> Result<(), ClinicError> {
        if request.campaign_name.trim().is_empty() {
            return Err(ClinicError::ValidationError("Campaign name must not be empty".to_string()));
        }
        if request.start_date > request.end_date {
            return Err(ClinicError::ValidationError("start_date must be before or equal to end_date".to_string()));
        }
        if !request.budget.is_finite() || request.budget < 0.0 {
            return Err(ClinicError::ValidationError("Budget must be a non-negative amount".to_string()));
        }
        Ok(())
    }

    pub async fn create_campaign(
        &self,
        clinic_id: Uuid,
        request: CreateCampaignRequest,
        auth_token: &str,
    ) -> Result<AdvertisingCampaign, ClinicError> {
        Self::validate(&request)?;

        let body = json!({
            "clinic_id": clinic_id,
            "campaign_name": request.campaign_name.trim(),
            "start_date": request.start_date,
            "end_date": request.end_date,
            "budget": request.budget,
            "status": request.status.as_deref().unwrap_or(DEFAULT_CAMPAIGN_STATUS),
        });

        let rows: Vec<AdvertisingCampaign> = self.supabase
            .write_returning(Method::POST, "/rest/v1/advertising_campaigns", auth_token, body)
            .await
            .map_err(|e| ClinicError::DatabaseError(e.to_string()))?;

        let campaign = rows.into_iter().next()
            .ok_or_else(|| ClinicError::DatabaseError("Insert returned no rows".to_string()))?;

        info!("Campaign {} created for clinic {}", campaign.id, clinic_id);
        Ok(campaign)
    }

    pub async fn list_campaigns(&self, clinic_id: Uuid, page: &PageQuery, auth_token: &str) -> Result<Vec<AdvertisingCampaign>, ClinicError> {
        let path = format!(
            "/rest/v1/advertising_campaigns?clinic_id=eq.{}&order=start_date.desc&{}",
            clinic_id,
            page.to_query()
        );
        self.supabase.select(&path, auth_token).await
            .map_err(|e| ClinicError::DatabaseError(e.to_string()))
    }
}
