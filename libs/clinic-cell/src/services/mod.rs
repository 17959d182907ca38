pub mod clinic;
pub mod review;
pub mod roster;
pub mod schedule;

pub use clinic::ClinicService;
pub use review::ReviewService;
pub use roster::RosterService;
pub use schedule::{CampaignService, EventScheduleService};
