use crate::config::Config;
use crate::errors::AppError;
use crate::models::{TranscriptTurn, TurnRole};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Client for the generative text completion endpoint.
///
/// The base URL is injected so tests can point it at a mock server.
#[derive(Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl From<&TranscriptTurn> for ChatMessage {
    fn from(turn: &TranscriptTurn) -> Self {
        let role = match turn.role {
            TurnRole::Assistant => "assistant",
            TurnRole::User => "user",
        };
        ChatMessage {
            role: role.to_string(),
            content: turn.content.clone(),
        }
    }
}

#[derive(Serialize)]
struct ChatPayload {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

impl OpenAiClient {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create OpenAI client: {}", e))
            })?;
        Ok(Self {
            client,
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
            api_key: config.openai_api_key.clone(),
            model: config.openai_model.clone(),
        })
    }

    /// One chat completion: system instructions plus the conversation so far.
    /// Returns the assistant text, trimmed.
    pub async fn complete(
        &self,
        system_prompt: &str,
        history: &[TranscriptTurn],
        max_tokens: u32,
    ) -> Result<String, AppError> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatMessage {
            role: "system".to_string(),
            content: system_prompt.to_string(),
        });
        messages.extend(history.iter().map(ChatMessage::from));

        let payload = ChatPayload {
            model: self.model.clone(),
            messages,
            max_tokens: Some(max_tokens),
            temperature: Some(0.7),
        };

        let url = format!("{}/v1/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("OpenAI request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!("OpenAI returned error {}: {}", status, error_text);
            return Err(AppError::ExternalApiError(format!(
                "OpenAI returned status {}: {}",
                status, error_text
            )));
        }

        let result: ChatResponse = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse OpenAI response: {}", e))
        })?;

        let content = result
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| {
                AppError::ExternalApiError("OpenAI response contained no content".to_string())
            })?;

        Ok(content)
    }
}
