use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Public base URL Twilio calls back into, e.g. "https://voice.example.com".
    pub public_base_url: String,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub twilio_base_url: String,
    /// Number confirmation SMS are sent from.
    pub twilio_sms_from: String,
    pub email_api_key: Option<String>,
    pub email_base_url: String,
    pub email_from: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: std::env::var("DB_URL")
                .or_else(|_| std::env::var("DATABASE_URL"))
                .map_err(|_| {
                    anyhow::anyhow!("DB_URL or DATABASE_URL environment variable required")
                })
                .and_then(|url| {
                    if url.trim().is_empty() {
                        anyhow::bail!("DB_URL cannot be empty");
                    }
                    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                        anyhow::bail!("DB_URL must start with postgresql:// or postgres://");
                    }
                    Ok(url)
                })?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .map_err(|_| anyhow::anyhow!("PUBLIC_BASE_URL environment variable required"))
                .and_then(|url| {
                    if url.trim().is_empty() {
                        anyhow::bail!("PUBLIC_BASE_URL cannot be empty");
                    }
                    if !url.starts_with("http://") && !url.starts_with("https://") {
                        anyhow::bail!("PUBLIC_BASE_URL must start with http:// or https://");
                    }
                    Ok(url.trim_end_matches('/').to_string())
                })?,
            openai_api_key: std::env::var("OPENAI_API_KEY")
                .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable required"))
                .and_then(|key| {
                    if key.trim().is_empty() {
                        anyhow::bail!("OPENAI_API_KEY cannot be empty");
                    }
                    Ok(key)
                })?,
            openai_base_url: std::env::var("OPENAI_BASE_URL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "https://api.openai.com".to_string()),
            openai_model: std::env::var("OPENAI_MODEL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "gpt-4o-mini".to_string()),
            twilio_account_sid: std::env::var("TWILIO_ACCOUNT_SID")
                .map_err(|_| anyhow::anyhow!("TWILIO_ACCOUNT_SID environment variable required"))
                .and_then(|sid| {
                    if sid.trim().is_empty() {
                        anyhow::bail!("TWILIO_ACCOUNT_SID cannot be empty");
                    }
                    Ok(sid)
                })?,
            twilio_auth_token: std::env::var("TWILIO_AUTH_TOKEN")
                .map_err(|_| anyhow::anyhow!("TWILIO_AUTH_TOKEN environment variable required"))
                .and_then(|token| {
                    if token.trim().is_empty() {
                        anyhow::bail!("TWILIO_AUTH_TOKEN cannot be empty");
                    }
                    Ok(token)
                })?,
            twilio_base_url: std::env::var("TWILIO_BASE_URL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "https://api.twilio.com".to_string()),
            twilio_sms_from: std::env::var("TWILIO_SMS_FROM")
                .map_err(|_| anyhow::anyhow!("TWILIO_SMS_FROM environment variable required"))
                .and_then(|from| {
                    if from.trim().is_empty() {
                        anyhow::bail!("TWILIO_SMS_FROM cannot be empty");
                    }
                    Ok(from)
                })?,
            email_api_key: std::env::var("EMAIL_API_KEY")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            email_base_url: std::env::var("EMAIL_BASE_URL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "https://api.resend.com".to_string()),
            email_from: std::env::var("EMAIL_FROM")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "bookings@example.com".to_string()),
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!(
            "Database URL: {}...",
            &config.database_url[..20.min(config.database_url.len())]
        );
        tracing::debug!("Public base URL: {}", config.public_base_url);
        tracing::debug!("OpenAI base URL: {}", config.openai_base_url);
        tracing::debug!("Twilio base URL: {}", config.twilio_base_url);
        if config.email_api_key.is_none() {
            tracing::warn!("EMAIL_API_KEY not set; confirmation emails disabled");
        }
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}
