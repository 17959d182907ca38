pub mod doctor;
pub mod specialization;

pub use doctor::DoctorService;
pub use specialization::SpecializationService;
