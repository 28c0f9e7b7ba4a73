use crate::config::Config;
use crate::errors::AppError;
use serde_json::json;
use std::time::Duration;

/// Transactional email client. Optional: when no API key is configured the
/// send is skipped with a warning rather than failing the booking sequence.
#[derive(Clone)]
pub struct EmailClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    from: String,
}

impl EmailClient {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create email client: {}", e))
            })?;
        Ok(Self {
            client,
            base_url: config.email_base_url.trim_end_matches('/').to_string(),
            api_key: config.email_api_key.clone(),
            from: config.email_from.clone(),
        })
    }

    pub async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), AppError> {
        let Some(ref api_key) = self.api_key else {
            tracing::warn!("Email API key not configured; skipping email to {}", to);
            return Ok(());
        };

        let url = format!("{}/emails", self.base_url);
        tracing::info!("Sending email to {}", to);

        let payload = json!({
            "from": self.from,
            "to": [to],
            "subject": subject,
            "text": body,
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Email request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "Email API returned {}: {}",
                status, error_text
            )));
        }

        tracing::info!("Email sent to {}", to);
        Ok(())
    }
}
