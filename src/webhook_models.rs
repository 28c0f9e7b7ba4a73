use serde::{Deserialize, Serialize};

/// Query parameters threaded through every webhook round-trip. All optional:
/// a missing or malformed query string degrades to defaults, never a 4xx,
/// because the telephony layer cannot handle a non-TwiML response.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct VoiceQuery {
    #[serde(default)]
    pub call_log_id: Option<String>,
    #[serde(default)]
    pub lead_id: Option<String>,
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub respondent_name: Option<String>,
    #[serde(default)]
    pub quiz_score: Option<String>,
    #[serde(default)]
    pub quiz_result: Option<String>,
}

impl VoiceQuery {
    pub fn quiz_score_value(&self) -> i32 {
        self.quiz_score
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0)
    }

    /// Query string for the next gather turn, keeping conversation state
    /// threaded through the stateless webhook.
    pub fn continuation(&self, call_log_id: &str) -> String {
        let mut pairs: Vec<(&str, String)> =
            vec![("event", "gather".into()), ("call_log_id", call_log_id.into())];
        if let Some(ref lead_id) = self.lead_id {
            pairs.push(("lead_id", lead_id.clone()));
        }
        if let Some(ref name) = self.respondent_name {
            pairs.push(("respondent_name", name.clone()));
        }
        if let Some(ref score) = self.quiz_score {
            pairs.push(("quiz_score", score.clone()));
        }
        if let Some(ref result) = self.quiz_result {
            pairs.push(("quiz_result", result.clone()));
        }
        serde_urlencoded::to_string(pairs).unwrap_or_else(|_| {
            format!("event=gather&call_log_id={call_log_id}")
        })
    }
}

/// Urlencoded form body Twilio posts on voice webhooks. Field names follow the
/// provider's PascalCase convention.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TwilioForm {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub call_sid: Option<String>,
    #[serde(default)]
    pub speech_result: Option<String>,
    #[serde(default)]
    pub call_status: Option<String>,
    #[serde(default)]
    pub call_duration: Option<String>,
    #[serde(default)]
    pub recording_url: Option<String>,
    #[serde(default)]
    pub direction: Option<String>,
}

impl TwilioForm {
    /// Best-effort parse; a malformed body yields an empty form.
    pub fn parse(body: &str) -> Self {
        serde_urlencoded::from_str(body).unwrap_or_else(|e| {
            tracing::warn!("Malformed webhook form body, using defaults: {}", e);
            Self::default()
        })
    }

    pub fn duration_secs(&self) -> i32 {
        self.call_duration
            .as_deref()
            .and_then(|d| d.parse().ok())
            .unwrap_or(0)
    }

    pub fn is_inbound(&self) -> bool {
        self.direction
            .as_deref()
            .map(|d| d.eq_ignore_ascii_case("inbound"))
            .unwrap_or(false)
    }
}

/// Which handler a webhook invocation dispatches to. Exactly one per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookEvent {
    Recording,
    Status,
    Gather,
    /// Inbound call with no threaded context: resolve the caller.
    InboundBootstrap,
    /// Outbound call just answered: speak the opening line.
    InitialAnswer,
}

impl WebhookEvent {
    pub fn classify(query: &VoiceQuery, form: &TwilioForm) -> Self {
        match query.event.as_deref() {
            Some("recording") => WebhookEvent::Recording,
            Some("status") => WebhookEvent::Status,
            Some("gather") => WebhookEvent::Gather,
            _ => {
                let has_context = query
                    .call_log_id
                    .as_deref()
                    .map(|s| !s.is_empty())
                    .unwrap_or(false)
                    || query
                        .lead_id
                        .as_deref()
                        .map(|s| !s.is_empty())
                        .unwrap_or(false);
                if !has_context && form.is_inbound() {
                    WebhookEvent::InboundBootstrap
                } else {
                    WebhookEvent::InitialAnswer
                }
            }
        }
    }
}
