use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::pagination::PageQuery;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub user_id: Uuid,
    pub specialization_id: Option<i64>,
    pub reservation_open: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Specialization {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateDoctorRequest {
    pub specialization_id: Option<i64>,
    /// New profiles accept reservations unless told otherwise.
    pub reservation_open: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDoctorRequest {
    pub specialization_id: Option<i64>,
    pub reservation_open: Option<bool>,
}

impl UpdateDoctorRequest {
    pub fn is_empty(&self) -> bool {
        self.specialization_id.is_none() && self.reservation_open.is_none()
    }
}

/// Search only ever returns doctors that are open for reservations.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DoctorSearchQuery {
    pub specialization_id: Option<i64>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl DoctorSearchQuery {
    pub fn page_query(&self) -> PageQuery {
        PageQuery { page: self.page, page_size: self.page_size }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSpecializationRequest {
    pub name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Doctor profile already exists for user {0}")]
    AlreadyExists(Uuid),

    #[error("Only users with the doctor role can hold a doctor profile")]
    NotADoctor,

    #[error("Not allowed to modify this doctor profile")]
    Unauthorized,

    #[error("Specialization not found")]
    SpecializationNotFound,

    #[error("Specialization '{0}' already exists")]
    SpecializationExists(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_request_without_fields_is_empty() {
        assert!(UpdateDoctorRequest::default().is_empty());
        assert!(!UpdateDoctorRequest { reservation_open: Some(false), ..Default::default() }.is_empty());
    }
}
