pub mod lifecycle;
pub mod reservation;

pub use lifecycle::ReservationLifecycle;
pub use reservation::ReservationService;
