pub mod catalog;
pub mod payment;
pub mod signature;
pub mod status;
pub mod stripe;
pub mod subscription;
pub mod webhook;

pub use catalog::CatalogService;
pub use payment::PaymentService;
pub use status::PaymentStatusService;
pub use stripe::StripeClient;
pub use subscription::SubscriptionService;
pub use webhook::WebhookService;
