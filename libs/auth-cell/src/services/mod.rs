pub mod audit;
pub mod profile;

pub use audit::AuditService;
pub use profile::{validate_phone_number, ProfileService};
