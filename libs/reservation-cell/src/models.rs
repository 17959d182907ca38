use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::pagination::PageQuery;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReservationStatus::Pending => write!(f, "pending"),
            ReservationStatus::Approved => write!(f, "approved"),
            ReservationStatus::Rejected => write!(f, "rejected"),
            ReservationStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub clinic_id: Uuid,
    pub status: ReservationStatus,
    pub reason_for_cancellation: Option<String>,
    pub reservation_date: NaiveDate,
    pub reservation_time: NaiveTime,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Doctor assigned to an approved reservation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationDoctor {
    pub id: Uuid,
    pub reservation_id: Uuid,
    pub doctor_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApprovalOutcome {
    pub reservation: Reservation,
    pub assigned_doctor_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateReservationRequest {
    /// Defaults to the caller; only admins may book for someone else.
    pub patient_id: Option<Uuid>,
    pub clinic_id: Uuid,
    pub reservation_date: NaiveDate,
    pub reservation_time: NaiveTime,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RejectReservationRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReservationSearchQuery {
    pub clinic_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub status: Option<ReservationStatus>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl ReservationSearchQuery {
    pub fn page_query(&self) -> PageQuery {
        PageQuery { page: self.page, page_size: self.page_size }
    }
}

/// Patient contact details needed for notifications.
#[derive(Debug, Clone, Deserialize)]
pub struct PatientContact {
    pub id: Uuid,
    pub email: Option<String>,
}

pub const APPROVED_MESSAGE: &str = "Your reservation has been approved.";
pub const APPROVED_SUBJECT: &str = "Reservation Approved";
pub const REJECTED_MESSAGE: &str = "Your reservation has been rejected.";
pub const REJECTED_SUBJECT: &str = "Reservation Rejected";

pub fn rejection_email_body(reason: &str) -> String {
    format!("Your reservation has been rejected. Reason: {}", reason)
}

#[derive(Debug, thiserror::Error)]
pub enum ReservationError {
    #[error("Reservation not found")]
    NotFound,

    #[error("Reservation already approved")]
    AlreadyApproved,

    #[error("No doctors available")]
    NoDoctorAvailable,

    #[error("Reservation cannot change from {from} to {to}")]
    InvalidStatusTransition {
        from: ReservationStatus,
        to: ReservationStatus,
    },

    #[error("Only the clinic owner can manage this reservation")]
    NotClinicOwner,

    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Clinic not found")]
    ClinicNotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
