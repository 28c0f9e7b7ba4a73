use crate::config::Config;
use crate::errors::AppError;
use std::time::Duration;

/// Client for the telephony provider's REST API: starting call recordings and
/// sending SMS. Base URL injected for tests.
#[derive(Clone)]
pub struct TwilioClient {
    client: reqwest::Client,
    base_url: String,
    account_sid: String,
    auth_token: String,
    sms_from: String,
}

impl TwilioClient {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create Twilio client: {}", e))
            })?;
        Ok(Self {
            client,
            base_url: config.twilio_base_url.trim_end_matches('/').to_string(),
            account_sid: config.twilio_account_sid.clone(),
            auth_token: config.twilio_auth_token.clone(),
            sms_from: config.twilio_sms_from.clone(),
        })
    }

    /// Start dual-channel recording on an in-progress call leg.
    pub async fn start_recording(&self, call_sid: &str) -> Result<(), AppError> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Calls/{}/Recordings.json",
            self.base_url, self.account_sid, call_sid
        );
        tracing::info!("Starting recording for call {}", call_sid);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("RecordingChannels", "dual")])
            .send()
            .await
            .map_err(|e| {
                AppError::ExternalApiError(format!("Twilio recording request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "Twilio recording returned {}: {}",
                status, error_text
            )));
        }

        tracing::info!("Recording started for call {}", call_sid);
        Ok(())
    }

    /// Send a confirmation SMS.
    pub async fn send_sms(&self, to: &str, body: &str) -> Result<(), AppError> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.account_sid
        );
        tracing::info!("Sending SMS to {}", to);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to), ("From", self.sms_from.as_str()), ("Body", body)])
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Twilio SMS request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "Twilio SMS returned {}: {}",
                status, error_text
            )));
        }

        tracing::info!("SMS sent to {}", to);
        Ok(())
    }
}
