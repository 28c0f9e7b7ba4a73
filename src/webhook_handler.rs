//! Voice Webhook Event Router
//!
//! Single entry point for every telephony callback: status, recording,
//! gather (speech turn), inbound bootstrap, and the outbound initial answer.
//! The provider expects a well-formed TwiML document on every request, so
//! nothing here is allowed to propagate an error upward; the one fatal path
//! degrades to a spoken apology.

use crate::config::Config;
use crate::conversation;
use crate::email_client::EmailClient;
use crate::errors::{AppError, ResultExt};
use crate::models::{CallStatus, TranscriptTurn};
use crate::openai_client::OpenAiClient;
use crate::resolver::{self, ResolvedContext};
use crate::store::Store;
use crate::summary::{self, MIN_SUMMARY_DURATION_SECS};
use crate::twilio_client::TwilioClient;
use crate::twiml;
use crate::webhook_models::{TwilioForm, VoiceQuery, WebhookEvent};
use axum::{
    extract::{RawQuery, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use moka::future::Cache;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub const WEBHOOK_PATH: &str = "/api/v1/voice/webhook";

pub const APOLOGY: &str =
    "We're sorry, something went wrong on our end. We'll follow up with you shortly. Goodbye.";

pub const NO_SUBMISSION: &str = "Hi! We couldn't find a submission for this number. \
Please complete the assessment on our website first, and we'll be happy to talk. Goodbye.";

/// Delay before starting the recording so the call leg can establish.
const RECORDING_START_DELAY_SECS: u64 = 3;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Persistence seam; everything state round-trips through.
    pub store: Arc<dyn Store>,
    /// Generative text service client.
    pub openai: OpenAiClient,
    /// Telephony REST client (recording, SMS).
    pub twilio: TwilioClient,
    /// Transactional email client.
    pub email: EmailClient,
    /// In-flight guard so retried status callbacks don't generate the
    /// summary twice concurrently; the store check handles sequential
    /// retries.
    pub summary_inflight: Cache<String, i64>,
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "voice-call-api",
            "version": "0.1.0"
        })),
    )
}

/// The voice webhook. Always 200, always `application/xml`, no matter what
/// went wrong inside.
pub async fn voice_webhook(
    State(state): State<Arc<AppState>>,
    RawQuery(raw_query): RawQuery,
    body: String,
) -> impl IntoResponse {
    let query: VoiceQuery = raw_query
        .as_deref()
        .and_then(|q| serde_urlencoded::from_str(q).ok())
        .unwrap_or_default();
    let form = TwilioForm::parse(&body);
    let event = WebhookEvent::classify(&query, &form);
    tracing::info!(?event, call_sid = ?form.call_sid, "Voice webhook received");

    let twiml = match dispatch(&state, event, &query, &form).await {
        Ok(twiml) => twiml,
        Err(e) => {
            tracing::error!("Webhook handling failed, speaking apology: {}", e);
            twiml::speak_and_hangup(APOLOGY)
        }
    };

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/xml")],
        twiml,
    )
}

async fn dispatch(
    state: &AppState,
    event: WebhookEvent,
    query: &VoiceQuery,
    form: &TwilioForm,
) -> Result<String, AppError> {
    match event {
        WebhookEvent::Recording => handle_recording(state, form).await,
        WebhookEvent::Status => handle_status(state, query, form).await,
        WebhookEvent::Gather => handle_gather(state, query, form).await,
        WebhookEvent::InboundBootstrap => handle_inbound(state, query, form).await,
        WebhookEvent::InitialAnswer => handle_initial_answer(state, query).await,
    }
}

/// Attach the recording URL to the most recent in-progress/completed record.
/// Not keyed by call SID (the provider's recording callback for this flow
/// doesn't let us thread one through), so under concurrent calls the URL can
/// land on the wrong record.
async fn handle_recording(state: &AppState, form: &TwilioForm) -> Result<String, AppError> {
    if let Some(ref url) = form.recording_url {
        match state.store.latest_active_call().await? {
            Some(record) => {
                state.store.set_recording_url(record.id, url).await?;
                tracing::info!("Attached recording to call {}", record.id);
            }
            None => tracing::warn!("Recording callback with no active call record"),
        }
    }
    Ok(twiml::empty_response())
}

/// Terminal status update plus the one-shot summary pass.
async fn handle_status(
    state: &AppState,
    query: &VoiceQuery,
    form: &TwilioForm,
) -> Result<String, AppError> {
    let Some(call_id) = parse_call_id(query) else {
        tracing::warn!("Status callback without a usable call_log_id");
        return Ok(twiml::empty_response());
    };

    let status: CallStatus = form
        .call_status
        .as_deref()
        .and_then(|s| s.parse().ok())
        .unwrap_or(CallStatus::Completed);
    let duration = form.duration_secs();

    state
        .store
        .update_status(call_id, status, Some(duration))
        .await?;

    if status.is_terminal() && duration > MIN_SUMMARY_DURATION_SECS {
        maybe_generate_summary(state, call_id).await;
    }

    Ok(twiml::empty_response())
}

/// Summary generation is idempotent: skipped when one is already stored, and
/// the in-flight cache suppresses concurrent duplicates from retried
/// deliveries. Failure leaves the summary null.
async fn maybe_generate_summary(state: &AppState, call_id: Uuid) {
    let key = call_id.to_string();
    if state.summary_inflight.get(&key).await.is_some() {
        tracing::debug!("Summary already in flight for call {}", call_id);
        return;
    }
    state.summary_inflight.insert(key, 1).await;

    let record = match state.store.get_call(call_id).await {
        Ok(Some(r)) => r,
        Ok(None) => {
            tracing::warn!("Status callback for unknown call {}", call_id);
            return;
        }
        Err(e) => {
            tracing::error!("Failed to reload call {} for summary: {}", call_id, e);
            return;
        }
    };
    if record.summary.is_some() {
        tracing::debug!("Call {} already summarized", call_id);
        return;
    }
    if record.transcript.is_empty() {
        return;
    }

    match summary::generate_summary(state, &record).await {
        Ok(text) => {
            if let Err(e) = state.store.set_summary(call_id, &text).await {
                tracing::error!("Failed to persist summary for call {}: {}", call_id, e);
            }
        }
        Err(e) => tracing::error!("Summary generation failed for call {}: {}", call_id, e),
    }
}

/// One speech turn.
async fn handle_gather(
    state: &AppState,
    query: &VoiceQuery,
    form: &TwilioForm,
) -> Result<String, AppError> {
    let Some(call_id) = parse_call_id(query) else {
        // No threaded record; nothing to continue against.
        return Ok(twiml::speak_and_hangup(APOLOGY));
    };
    let Some(record) = state
        .store
        .get_call(call_id)
        .await
        .context("loading call record for gather turn")?
    else {
        return Ok(twiml::speak_and_hangup(APOLOGY));
    };

    let speech = form.speech_result.clone().unwrap_or_default();
    let reply = conversation::run_turn(state, record, &speech, Utc::now()).await;

    if reply.terminal {
        Ok(twiml::speak_and_hangup(&reply.text))
    } else {
        Ok(twiml::speak_and_gather(
            &reply.text,
            &gather_action_url(state, query, &call_id.to_string()),
        ))
    }
}

/// Inbound call with no threaded context.
async fn handle_inbound(
    state: &AppState,
    _query: &VoiceQuery,
    form: &TwilioForm,
) -> Result<String, AppError> {
    let phone = form.from.clone().unwrap_or_default();
    let call_sid = form.call_sid.as_deref();
    let now = Utc::now();

    let resolved = resolver::resolve_inbound(state.store.as_ref(), &phone, call_sid, now).await?;
    let (record, created) = match resolved {
        ResolvedContext::Found { record, created } => (record, created),
        ResolvedContext::Unknown => {
            return Ok(twiml::speak_and_hangup(NO_SUBMISSION));
        }
    };

    if !created {
        // Reused a pending callback record; it goes live now, correlated
        // with the incoming leg.
        state
            .store
            .update_status(record.id, CallStatus::InProgress, None)
            .await
            .context("activating pending callback record")?;
        if let Some(sid) = call_sid {
            state
                .store
                .set_call_sid(record.id, sid)
                .await
                .context("correlating pending record with live call")?;
        }
    }

    if let Some(sid) = call_sid {
        spawn_recording(state, sid.to_string());
    }

    let opener = conversation::generate_opener(state, &record).await;
    let mut transcript = record.transcript.clone();
    transcript.push(TranscriptTurn::assistant(opener.clone()));
    state
        .store
        .update_transcript(record.id, &transcript)
        .await?;

    let continuation = VoiceQuery {
        lead_id: record.lead_id.map(|id| id.to_string()),
        respondent_name: record.respondent_name.clone(),
        quiz_score: record.quiz_score.map(|s| s.to_string()),
        quiz_result: record.quiz_result.clone(),
        ..Default::default()
    };
    Ok(twiml::speak_and_gather(
        &opener,
        &gather_action_url(state, &continuation, &record.id.to_string()),
    ))
}

/// Outbound call just answered.
async fn handle_initial_answer(
    state: &AppState,
    query: &VoiceQuery,
) -> Result<String, AppError> {
    if let Some(call_id) = parse_call_id(query) {
        if let Some(record) = state.store.get_call(call_id).await? {
            state
                .store
                .update_status(record.id, CallStatus::InProgress, None)
                .await?;

            let opener = conversation::generate_opener(state, &record).await;
            let mut transcript = record.transcript.clone();
            transcript.push(TranscriptTurn::assistant(opener.clone()));
            state
                .store
                .update_transcript(record.id, &transcript)
                .await?;

            return Ok(twiml::speak_and_gather(
                &opener,
                &gather_action_url(state, query, &call_id.to_string()),
            ));
        }
    }

    // No record to thread; greet generically and keep whatever params we got.
    let fallback_id = query.call_log_id.clone().unwrap_or_default();
    Ok(twiml::speak_and_gather(
        "Hi! Thanks for picking up. Do you have a quick minute to chat?",
        &gather_action_url(state, query, &fallback_id),
    ))
}

/// Fire-and-forget recording start, delayed so the call leg can establish.
fn spawn_recording(state: &AppState, call_sid: String) {
    let twilio = state.twilio.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(RECORDING_START_DELAY_SECS)).await;
        if let Err(e) = twilio.start_recording(&call_sid).await {
            tracing::warn!("Could not start recording for {}: {}", call_sid, e);
        }
    });
}

fn gather_action_url(state: &AppState, query: &VoiceQuery, call_log_id: &str) -> String {
    format!(
        "{}{}?{}",
        state.config.public_base_url,
        WEBHOOK_PATH,
        query.continuation(call_log_id)
    )
}

fn parse_call_id(query: &VoiceQuery) -> Option<Uuid> {
    query
        .call_log_id
        .as_deref()
        .and_then(|s| Uuid::parse_str(s).ok())
}
