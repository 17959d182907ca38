use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::auth::{User, UserRole};
use shared_models::pagination::PageQuery;

// ==============================================================================
// CLINICS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clinic {
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub owner_id: Uuid,
    pub geolocation: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Clinic {
    /// Owner in the strict sense: a clinic_owner account whose id matches.
    /// Admins are not owners.
    pub fn is_owned_by(&self, user: &User) -> bool {
        user.has_role(UserRole::ClinicOwner) && user.id == self.owner_id.to_string()
    }

    /// Owner or admin; used for directory edits.
    pub fn can_be_managed_by(&self, user: &User) -> bool {
        self.is_owned_by(user) || user.is_admin()
    }
}

/// Roster entry linking a doctor to a clinic. Roster order is `created_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicDoctor {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub doctor_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// The doctor columns the roster needs to decide availability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterDoctor {
    pub user_id: Uuid,
    pub specialization_id: Option<i64>,
    pub reservation_open: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClinicDetails {
    #[serde(flatten)]
    pub clinic: Clinic,
    pub doctors: Vec<ClinicDoctor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateClinicRequest {
    pub name: String,
    pub address: Option<String>,
    pub geolocation: Option<String>,
    /// Only honoured for admins; clinic owners always own what they create.
    pub owner_id: Option<Uuid>,
    #[serde(default)]
    pub doctor_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateClinicRequest {
    pub name: Option<String>,
    pub address: Option<String>,
    pub geolocation: Option<String>,
    /// When present the roster is replaced wholesale.
    pub doctor_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RosterChangeRequest {
    pub doctor_id: Uuid,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClinicSearchQuery {
    pub name: Option<String>,
    pub owner_id: Option<Uuid>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl ClinicSearchQuery {
    pub fn page_query(&self) -> PageQuery {
        PageQuery { page: self.page, page_size: self.page_size }
    }
}

// ==============================================================================
// REVIEWS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub patient_id: Uuid,
    pub rating: i32,
    pub review_text: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateReviewRequest {
    pub rating: i32,
    pub review_text: Option<String>,
}

// ==============================================================================
// EVENT SCHEDULES & CAMPAIGNS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSchedule {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub doctor_id: Option<Uuid>,
    pub event_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEventRequest {
    pub doctor_id: Option<Uuid>,
    pub event_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvertisingCampaign {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub campaign_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub budget: f64,
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCampaignRequest {
    pub campaign_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub budget: f64,
    pub status: Option<String>,
}

pub const DEFAULT_CAMPAIGN_STATUS: &str = "active";

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ClinicError {
    #[error("Clinic not found")]
    NotFound,

    #[error("Doctor {0} is not on this clinic's roster")]
    DoctorNotOnRoster(Uuid),

    #[error("Doctor {0} already belongs to this clinic")]
    DoctorAlreadyOnRoster(Uuid),

    #[error("Unknown doctor: {0}")]
    UnknownDoctor(Uuid),

    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    #[error("Patient must have an approved reservation at the clinic to leave a review")]
    NoApprovedReservation,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
