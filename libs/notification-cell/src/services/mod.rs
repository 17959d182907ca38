pub mod email;
pub mod inbox;
pub mod sms;

pub use email::EmailService;
pub use inbox::NotificationService;
pub use sms::SmsService;
