use std::sync::Arc;

use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use tracing::{info, warn};

use shared_config::AppConfig;

use crate::models::{Delivery, NotificationError};

/// SMTP mailer. With no SMTP host configured it only logs what it would send.
#[derive(Clone, Debug)]
pub struct EmailService {
    transport: Option<Arc<AsyncSmtpTransport<Tokio1Executor>>>,
    from: Mailbox,
}

impl EmailService {
    pub fn new(config: &AppConfig) -> Result<Self, NotificationError> {
        let from = config.smtp_from.parse::<Mailbox>()
            .map_err(|e| NotificationError::InvalidAddress(format!("SMTP_FROM: {}", e)))?;

        let transport = if !config.is_email_configured() {
            warn!("SMTP host not configured; email will be logged instead of sent");
            None
        } else {
            let builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
                .map_err(|e| NotificationError::EmailTransport(e.to_string()))?
                .port(config.smtp_port);

            let builder = match (&config.smtp_username, &config.smtp_password) {
                (Some(username), Some(password)) => {
                    builder.credentials(Credentials::new(username.clone(), password.clone()))
                }
                _ => builder,
            };

            Some(Arc::new(builder.build()))
        };

        Ok(Self { transport, from })
    }

    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    pub async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<Delivery, NotificationError> {
        let to = recipient.parse::<Mailbox>()
            .map_err(|e| NotificationError::InvalidAddress(format!("{}: {}", recipient, e)))?;

        let Some(transport) = &self.transport else {
            info!(subject, recipient, "Email disabled; skipping send");
            return Ok(Delivery::Skipped("email not configured".to_string()));
        };

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(header::ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| NotificationError::EmailTransport(e.to_string()))?;

        let response = transport.send(email).await
            .map_err(|e| NotificationError::EmailTransport(e.to_string()))?;

        info!(subject, "Email sent");
        let reference = response.message().next().map(str::to_string);
        Ok(Delivery::Sent { reference })
    }
}
