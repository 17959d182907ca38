use async_trait::async_trait;
use tracing::{debug, info};

use notification_cell::models::Delivery;
use notification_cell::services::{EmailService, SmsService};
use payment_cell::models::IntentUpdateOutcome;
use payment_cell::services::PaymentStatusService;
use shared_config::AppConfig;
use task_queue_cell::{Task, TaskHandler};

/// Routes each queued task to the service that performs it.
pub struct ClinicTaskHandler {
    sms: SmsService,
    email: EmailService,
    payments: PaymentStatusService,
}

impl ClinicTaskHandler {
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        Ok(Self {
            sms: SmsService::new(config),
            email: EmailService::new(config)?,
            payments: PaymentStatusService::new(config),
        })
    }
}

#[async_trait]
impl TaskHandler for ClinicTaskHandler {
    async fn handle(&self, task: &Task) -> anyhow::Result<()> {
        match task {
            Task::SendSms { user_id, message } => {
                let delivery = self.sms.send_to_user(*user_id, message).await?;
                log_delivery("sms", &delivery);
            }
            Task::SendEmail { address, subject, body } => {
                let delivery = self.email.send(address, subject, body).await?;
                log_delivery("email", &delivery);
            }
            Task::ProcessPaymentWebhook { event } => {
                let outcome = self.payments
                    .apply_intent_update(&event.payment_intent_id, &event.status)
                    .await?;
                match outcome {
                    IntentUpdateOutcome::Updated(payment) => {
                        info!("Payment {} is now {}", payment.id, payment.payment_status);
                    }
                    IntentUpdateOutcome::Unchanged(payment) => {
                        debug!("Payment {} unchanged", payment.id);
                    }
                    IntentUpdateOutcome::Unmatched => {}
                }
            }
        }
        Ok(())
    }
}

fn log_delivery(channel: &str, delivery: &Delivery) {
    match delivery {
        Delivery::Sent { reference } => debug!(channel, ?reference, "Notification delivered"),
        Delivery::Skipped(reason) => info!(channel, reason = reason.as_str(), "Notification skipped"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

    #[tokio::test]
    async fn payment_task_updates_matching_payment() {
        let server = MockServer::start().await;
        let config = TestConfig::default().with_mock_server(&server.uri());
        let payment_id = Uuid::new_v4().to_string();
        let user_id = Uuid::new_v4().to_string();

        Mock::given(method("GET"))
            .and(path("/rest/v1/payments"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                MockSupabaseResponses::payment_response(&payment_id, &user_id, "pi_123", "requires_payment_method")
            ])))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/payments"))
            .and(body_partial_json(json!({ "payment_status": "succeeded" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                MockSupabaseResponses::payment_response(&payment_id, &user_id, "pi_123", "succeeded")
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let handler = ClinicTaskHandler::new(&config).unwrap();
        handler.handle(&Task::process_payment_webhook("pi_123", "succeeded")).await.unwrap();
    }

    #[tokio::test]
    async fn sms_to_user_without_phone_is_skipped() {
        let server = MockServer::start().await;
        let config = TestConfig::default().with_mock_server(&server.uri());

        Mock::given(method("GET"))
            .and(path("/rest/v1/user_profiles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let handler = ClinicTaskHandler::new(&config).unwrap();
        handler
            .handle(&Task::send_sms(Uuid::new_v4(), "Your reservation has been approved."))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn email_without_smtp_host_succeeds() {
        let handler = ClinicTaskHandler::new(&TestConfig::default().to_app_config()).unwrap();

        let task = Task::send_email("patient@example.com", "Reservation Approved", "Your reservation has been approved.");
        handler.handle(&task).await.unwrap();
    }

    #[tokio::test]
    async fn provider_failure_surfaces_as_error() {
        let server = MockServer::start().await;
        let config = TestConfig::default().with_mock_server(&server.uri());

        Mock::given(method("GET"))
            .and(path("/rest/v1/user_profiles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                MockSupabaseResponses::profile_response(&Uuid::new_v4().to_string(), Some("+15551234567"))
            ])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let handler = ClinicTaskHandler::new(&config).unwrap();
        let result = handler.handle(&Task::send_sms(Uuid::new_v4(), "hello")).await;

        assert!(result.is_err());
    }
}
