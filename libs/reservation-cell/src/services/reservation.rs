use std::sync::Arc;

use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::{User, UserRole};
use clinic_cell::models::{Clinic, ClinicError};
use clinic_cell::services::{ClinicService, RosterService};
use task_queue_cell::{dispatch_best_effort, Task, TaskDispatcher};

use crate::models::{
    rejection_email_body, ApprovalOutcome, CreateReservationRequest, PatientContact, Reservation,
    ReservationDoctor, ReservationError, ReservationSearchQuery, ReservationStatus,
    APPROVED_MESSAGE, APPROVED_SUBJECT, REJECTED_MESSAGE, REJECTED_SUBJECT,
};
use crate::services::lifecycle::ReservationLifecycle;

pub struct ReservationService {
    supabase: SupabaseClient,
    clinics: ClinicService,
    roster: RosterService,
    lifecycle: ReservationLifecycle,
    tasks: Arc<dyn TaskDispatcher>,
    service_token: String,
}

impl ReservationService {
    pub fn new(config: &AppConfig, tasks: Arc<dyn TaskDispatcher>) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            clinics: ClinicService::new(config),
            roster: RosterService::new(config),
            lifecycle: ReservationLifecycle::new(),
            tasks,
            service_token: config.service_token().to_string(),
        }
    }

    // ==========================================================================
    // BOOKING & LOOKUP
    // ==========================================================================

    pub async fn create_reservation(
        &self,
        request: CreateReservationRequest,
        actor: &User,
        auth_token: &str,
    ) -> Result<Reservation, ReservationError> {
        let actor_id = actor_uuid(actor)?;
        let patient_id = request.patient_id.unwrap_or(actor_id);

        match actor.user_role() {
            Some(UserRole::Admin) => {}
            Some(UserRole::Patient) if patient_id == actor_id => {}
            _ => {
                return Err(ReservationError::Unauthorized(
                    "Patients can only book reservations for themselves".to_string(),
                ))
            }
        }

        self.lifecycle.validate_booking_time(request.reservation_date, request.reservation_time, Utc::now())?;
        self.load_clinic(request.clinic_id, auth_token).await?;

        let now = Utc::now().to_rfc3339();
        let body = json!({
            "patient_id": patient_id,
            "clinic_id": request.clinic_id,
            "status": ReservationStatus::Pending,
            "reason_for_cancellation": null,
            "reservation_date": request.reservation_date,
            "reservation_time": request.reservation_time,
            "created_at": now,
            "updated_at": now,
        });

        let rows: Vec<Reservation> = self.supabase
            .write_returning(Method::POST, "/rest/v1/reservations", auth_token, body)
            .await
            .map_err(|e| ReservationError::DatabaseError(e.to_string()))?;

        let reservation = rows.into_iter().next()
            .ok_or_else(|| ReservationError::DatabaseError("Insert returned no rows".to_string()))?;

        info!("Reservation {} booked at clinic {} for patient {}", reservation.id, reservation.clinic_id, patient_id);
        Ok(reservation)
    }

    pub async fn get_reservation(&self, reservation_id: Uuid, auth_token: &str) -> Result<Reservation, ReservationError> {
        let path = format!("/rest/v1/reservations?id=eq.{}", reservation_id);
        let rows: Vec<Reservation> = self.supabase.select(&path, auth_token).await
            .map_err(|e| ReservationError::DatabaseError(e.to_string()))?;

        rows.into_iter().next().ok_or(ReservationError::NotFound)
    }

    /// Fetch a reservation the actor is allowed to see: their own, their clinic's, or any for admins.
    pub async fn get_visible_reservation(
        &self,
        reservation_id: Uuid,
        actor: &User,
        auth_token: &str,
    ) -> Result<Reservation, ReservationError> {
        let reservation = self.get_reservation(reservation_id, auth_token).await?;

        if actor.is_admin() || reservation.patient_id.to_string() == actor.id {
            return Ok(reservation);
        }

        if actor.has_role(UserRole::ClinicOwner) {
            let clinic = self.load_clinic(reservation.clinic_id, auth_token).await?;
            if clinic.is_owned_by(actor) {
                return Ok(reservation);
            }
        }

        Err(ReservationError::Unauthorized("Not authorized to view this reservation".to_string()))
    }

    pub async fn assigned_doctor(&self, reservation_id: Uuid, auth_token: &str) -> Result<Option<ReservationDoctor>, ReservationError> {
        let path = format!(
            "/rest/v1/reservation_doctors?reservation_id=eq.{}&order=created_at.asc&limit=1",
            reservation_id
        );
        let rows: Vec<ReservationDoctor> = self.supabase.select(&path, auth_token).await
            .map_err(|e| ReservationError::DatabaseError(e.to_string()))?;
        Ok(rows.into_iter().next())
    }

    pub async fn search_reservations(
        &self,
        query: &ReservationSearchQuery,
        actor: &User,
        auth_token: &str,
    ) -> Result<Vec<Reservation>, ReservationError> {
        let mut filters = Vec::new();

        match actor.user_role() {
            Some(UserRole::Admin) => {
                if let Some(patient_id) = query.patient_id {
                    filters.push(format!("patient_id=eq.{}", patient_id));
                }
                if let Some(clinic_id) = query.clinic_id {
                    filters.push(format!("clinic_id=eq.{}", clinic_id));
                }
            }
            Some(UserRole::Patient) => {
                filters.push(format!("patient_id=eq.{}", actor.id));
                if let Some(clinic_id) = query.clinic_id {
                    filters.push(format!("clinic_id=eq.{}", clinic_id));
                }
            }
            Some(UserRole::ClinicOwner) => {
                let owned = self.clinics.owned_clinic_ids(actor_uuid(actor)?, auth_token).await
                    .map_err(map_clinic_error)?;

                match query.clinic_id {
                    Some(clinic_id) if owned.contains(&clinic_id) => {
                        filters.push(format!("clinic_id=eq.{}", clinic_id));
                    }
                    Some(_) => return Err(ReservationError::NotClinicOwner),
                    None if owned.is_empty() => return Ok(Vec::new()),
                    None => {
                        let ids = owned.iter().map(Uuid::to_string).collect::<Vec<_>>().join(",");
                        filters.push(format!("clinic_id=in.({})", ids));
                    }
                }
                if let Some(patient_id) = query.patient_id {
                    filters.push(format!("patient_id=eq.{}", patient_id));
                }
            }
            _ => {
                return Err(ReservationError::Unauthorized(
                    "Reservations are visible to patients, clinic owners and admins".to_string(),
                ))
            }
        }

        if let Some(status) = query.status {
            filters.push(format!("status=eq.{}", status));
        }
        if let Some(from) = query.from_date {
            filters.push(format!("reservation_date=gte.{}", from));
        }
        if let Some(to) = query.to_date {
            filters.push(format!("reservation_date=lte.{}", to));
        }

        filters.push("order=reservation_date.asc,reservation_time.asc".to_string());
        filters.push(query.page_query().to_query());

        let path = format!("/rest/v1/reservations?{}", filters.join("&"));
        debug!("Searching reservations: {}", path);

        self.supabase.select(&path, auth_token).await
            .map_err(|e| ReservationError::DatabaseError(e.to_string()))
    }

    // ==========================================================================
    // APPROVE / REJECT WORKFLOW
    // ==========================================================================

    /// Approve a pending reservation, assign the clinic's first available doctor
    /// and queue the patient's SMS and email.
    pub async fn approve(
        &self,
        reservation_id: Uuid,
        actor: &User,
        auth_token: &str,
    ) -> Result<ApprovalOutcome, ReservationError> {
        let reservation = self.get_reservation(reservation_id, auth_token).await?;
        self.authorize_clinic_owner(&reservation, actor, auth_token).await?;
        self.lifecycle.validate_transition(reservation.status, ReservationStatus::Approved)?;

        let doctor_id = self.roster.first_available_doctor(reservation.clinic_id, auth_token).await
            .map_err(map_clinic_error)?
            .ok_or_else(|| {
                warn!("Reservation {} left pending: clinic {} has no available doctor", reservation_id, reservation.clinic_id);
                ReservationError::NoDoctorAvailable
            })?;

        let approved = self.transition(
            reservation_id,
            ReservationStatus::Pending,
            ReservationStatus::Approved,
            json!({}),
            auth_token,
        ).await?;

        if let Err(e) = self.assign_doctor(reservation_id, doctor_id, auth_token).await {
            error!("Doctor assignment for reservation {} failed, reverting to pending: {}", reservation_id, e);
            self.revert_to_pending(reservation_id, auth_token).await;
            return Err(e);
        }

        info!("Reservation {} approved; doctor {} assigned", reservation_id, doctor_id);

        self.notify_patient(approved.patient_id, APPROVED_MESSAGE, APPROVED_SUBJECT, APPROVED_MESSAGE).await;

        Ok(ApprovalOutcome {
            reservation: approved,
            assigned_doctor_id: doctor_id,
        })
    }

    /// Reject a pending reservation, recording the reason (empty when none was given).
    pub async fn reject(
        &self,
        reservation_id: Uuid,
        actor: &User,
        reason: Option<String>,
        auth_token: &str,
    ) -> Result<Reservation, ReservationError> {
        let reservation = self.get_reservation(reservation_id, auth_token).await?;
        self.authorize_clinic_owner(&reservation, actor, auth_token).await?;
        self.lifecycle.validate_transition(reservation.status, ReservationStatus::Rejected)?;

        let reason = reason.unwrap_or_default();
        let rejected = self.transition(
            reservation_id,
            ReservationStatus::Pending,
            ReservationStatus::Rejected,
            json!({ "reason_for_cancellation": reason }),
            auth_token,
        ).await?;

        info!("Reservation {} rejected", reservation_id);

        self.notify_patient(
            rejected.patient_id,
            REJECTED_MESSAGE,
            REJECTED_SUBJECT,
            &rejection_email_body(&reason),
        ).await;

        Ok(rejected)
    }

    async fn authorize_clinic_owner(
        &self,
        reservation: &Reservation,
        actor: &User,
        auth_token: &str,
    ) -> Result<Clinic, ReservationError> {
        let clinic = self.load_clinic(reservation.clinic_id, auth_token).await?;
        if !clinic.is_owned_by(actor) {
            warn!("User {} tried to manage reservation {} of clinic {}", actor.id, reservation.id, clinic.id);
            return Err(ReservationError::NotClinicOwner);
        }
        Ok(clinic)
    }

    /// Status-guarded update: only succeeds while the row still has status `from`.
    async fn transition(
        &self,
        reservation_id: Uuid,
        from: ReservationStatus,
        to: ReservationStatus,
        extra: Value,
        auth_token: &str,
    ) -> Result<Reservation, ReservationError> {
        let mut body = json!({
            "status": to,
            "updated_at": Utc::now().to_rfc3339(),
        });
        if let (Some(fields), Value::Object(extra)) = (body.as_object_mut(), extra) {
            fields.extend(extra);
        }

        let path = format!("/rest/v1/reservations?id=eq.{}&status=eq.{}", reservation_id, from);
        let rows: Vec<Reservation> = self.supabase
            .write_returning(Method::PATCH, &path, auth_token, body)
            .await
            .map_err(|e| ReservationError::DatabaseError(e.to_string()))?;

        match rows.into_iter().next() {
            Some(updated) => Ok(updated),
            None => {
                // Lost a race with another transition; report what the row is now.
                let current = self.get_reservation(reservation_id, auth_token).await?;
                warn!("Reservation {} changed concurrently to {}", reservation_id, current.status);
                self.lifecycle.validate_transition(current.status, to)?;
                Err(ReservationError::InvalidStatusTransition { from: current.status, to })
            }
        }
    }

    async fn assign_doctor(
        &self,
        reservation_id: Uuid,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<ReservationDoctor, ReservationError> {
        let body = json!({
            "reservation_id": reservation_id,
            "doctor_id": doctor_id,
            "created_at": Utc::now().to_rfc3339(),
        });

        let rows: Vec<ReservationDoctor> = self.supabase
            .write_returning(Method::POST, "/rest/v1/reservation_doctors", auth_token, body)
            .await
            .map_err(|e| ReservationError::DatabaseError(e.to_string()))?;

        rows.into_iter().next()
            .ok_or_else(|| ReservationError::DatabaseError("Doctor assignment returned no rows".to_string()))
    }

    async fn revert_to_pending(&self, reservation_id: Uuid, auth_token: &str) {
        let path = format!(
            "/rest/v1/reservations?id=eq.{}&status=eq.{}",
            reservation_id,
            ReservationStatus::Approved
        );
        let body = json!({
            "status": ReservationStatus::Pending,
            "updated_at": Utc::now().to_rfc3339(),
        });

        let result: anyhow::Result<Vec<Reservation>> = self.supabase
            .write_returning(Method::PATCH, &path, auth_token, body)
            .await;

        if let Err(e) = result {
            error!("Failed to revert reservation {} to pending: {}", reservation_id, e);
        }
    }

    /// Queue SMS and email for the patient. Never fails the caller.
    async fn notify_patient(&self, patient_id: Uuid, sms: &str, subject: &str, body: &str) {
        dispatch_best_effort(self.tasks.as_ref(), Task::send_sms(patient_id, sms)).await;

        match self.patient_email(patient_id).await {
            Some(address) => {
                dispatch_best_effort(self.tasks.as_ref(), Task::send_email(address, subject, body)).await;
            }
            None => warn!("No email address for patient {}; email notification skipped", patient_id),
        }
    }

    async fn patient_email(&self, patient_id: Uuid) -> Option<String> {
        let path = format!("/rest/v1/users?id=eq.{}&select=id,email", patient_id);
        match self.supabase.select::<PatientContact>(&path, &self.service_token).await {
            Ok(rows) => rows.into_iter().next().and_then(|c| c.email).filter(|e| !e.is_empty()),
            Err(e) => {
                warn!("Could not load contact details for patient {}: {}", patient_id, e);
                None
            }
        }
    }

    async fn load_clinic(&self, clinic_id: Uuid, auth_token: &str) -> Result<Clinic, ReservationError> {
        self.clinics.get_clinic(clinic_id, auth_token).await.map_err(map_clinic_error)
    }
}

fn actor_uuid(actor: &User) -> Result<Uuid, ReservationError> {
    Uuid::parse_str(&actor.id)
        .map_err(|_| ReservationError::ValidationError("Invalid user ID format".to_string()))
}

fn map_clinic_error(e: ClinicError) -> ReservationError {
    match e {
        ClinicError::NotFound => ReservationError::ClinicNotFound,
        other => ReservationError::DatabaseError(other.to_string()),
    }
}
