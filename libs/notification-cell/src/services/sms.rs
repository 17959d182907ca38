use reqwest::Client;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Delivery, NotificationError, ProfilePhone, TwilioMessage};

/// Sends text messages through Twilio's Messages API.
#[derive(Clone)]
pub struct SmsService {
    http: Client,
    supabase: SupabaseClient,
    service_token: String,
    api_base_url: String,
    account_sid: String,
    auth_token: String,
    from_number: String,
    enabled: bool,
}

impl SmsService {
    pub fn new(config: &AppConfig) -> Self {
        if !config.is_sms_configured() {
            warn!("Twilio credentials not configured; SMS will be skipped");
        }

        Self {
            http: Client::new(),
            supabase: SupabaseClient::new(config),
            service_token: config.service_token().to_string(),
            api_base_url: config.twilio_api_base_url.trim_end_matches('/').to_string(),
            account_sid: config.twilio_account_sid.clone(),
            auth_token: config.twilio_auth_token.clone(),
            from_number: config.twilio_from_number.clone(),
            enabled: config.is_sms_configured(),
        }
    }

    /// Text a user at the phone number on their profile.
    /// A user without a profile or phone number is skipped, not an error.
    pub async fn send_to_user(&self, user_id: Uuid, message: &str) -> Result<Delivery, NotificationError> {
        if !self.enabled {
            return Ok(Delivery::Skipped("sms not configured".to_string()));
        }

        let phone = match self.phone_number_for(user_id).await? {
            Some(phone) => phone,
            None => {
                info!("User {} has no phone number on file; skipping SMS", user_id);
                return Ok(Delivery::Skipped(format!("no phone number for user {}", user_id)));
            }
        };

        self.send(&phone, message).await
    }

    pub async fn send(&self, to: &str, body: &str) -> Result<Delivery, NotificationError> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base_url, self.account_sid
        );
        debug!("Posting SMS to {}", url);

        let params = [("To", to), ("From", self.from_number.as_str()), ("Body", body)];
        let response = self.http.post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&params)
            .send()
            .await
            .map_err(|e| NotificationError::SmsProvider(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(NotificationError::SmsProvider(format!("Twilio returned {}: {}", status, text)));
        }

        let message: TwilioMessage = response.json().await
            .map_err(|e| NotificationError::SmsProvider(e.to_string()))?;

        info!("SMS sent (sid {:?})", message.sid);
        Ok(Delivery::Sent { reference: message.sid })
    }

    async fn phone_number_for(&self, user_id: Uuid) -> Result<Option<String>, NotificationError> {
        let path = format!("/rest/v1/user_profiles?user_id=eq.{}&select=phone_number", user_id);
        let rows: Vec<ProfilePhone> = self.supabase.select(&path, &self.service_token).await
            .map_err(|e| NotificationError::DatabaseError(e.to_string()))?;

        Ok(rows.into_iter()
            .next()
            .and_then(|p| p.phone_number)
            .filter(|p| !p.trim().is_empty()))
    }
}
