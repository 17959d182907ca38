use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use tracing::{debug, warn};

use crate::models::{ReservationError, ReservationStatus};

/// Reservation state machine. Only a pending reservation moves, and only once.
pub struct ReservationLifecycle;

impl ReservationLifecycle {
    pub fn new() -> Self {
        Self
    }

    pub fn valid_transitions(&self, current: ReservationStatus) -> &'static [ReservationStatus] {
        match current {
            ReservationStatus::Pending => &[ReservationStatus::Approved, ReservationStatus::Rejected],
            ReservationStatus::Approved
            | ReservationStatus::Rejected
            | ReservationStatus::Cancelled => &[],
        }
    }

    pub fn validate_transition(
        &self,
        current: ReservationStatus,
        next: ReservationStatus,
    ) -> Result<(), ReservationError> {
        debug!("Validating reservation transition {} -> {}", current, next);

        if current == ReservationStatus::Approved && next == ReservationStatus::Approved {
            return Err(ReservationError::AlreadyApproved);
        }

        if !self.valid_transitions(current).contains(&next) {
            warn!("Invalid reservation transition attempted: {} -> {}", current, next);
            return Err(ReservationError::InvalidStatusTransition { from: current, to: next });
        }

        Ok(())
    }

    /// New reservations may not be booked in the past.
    pub fn validate_booking_time(
        &self,
        date: NaiveDate,
        time: NaiveTime,
        now: DateTime<Utc>,
    ) -> Result<(), ReservationError> {
        if date.and_time(time).and_utc() < now {
            return Err(ReservationError::ValidationError(
                "Reservation date and time cannot be in the past".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ReservationLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
