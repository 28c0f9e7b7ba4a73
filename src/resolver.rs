//! Inbound call context resolution.
//!
//! An inbound caller has no threaded state, so the record is recovered from
//! storage by an ordered chain of strategies, first hit wins:
//!
//! 1. pending `awaiting_callback` record for the number, most recent first;
//! 2. most recent record for the number with a nonzero quiz score, whose quiz
//!    context is cloned into a fresh record (quiz data survives across
//!    separate calls from the same number);
//! 3. known lead by phone, yielding a bare inbound record;
//! 4. nothing — entirely unknown numbers get no record at all.

use crate::errors::{AppError, ResultExt};
use crate::models::{CallRecord, CallStatus, CallType};
use crate::store::Store;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Outcome of the strategy chain.
#[derive(Debug, Clone)]
pub enum ResolvedContext {
    /// A record to continue the conversation on. `created` is true when the
    /// strategy inserted a new row rather than reusing a pending one.
    Found { record: CallRecord, created: bool },
    /// No pending call, no quiz history, no lead: greet with the fixed
    /// "no submission found" message and create nothing.
    Unknown,
}

async fn pending_callback(
    store: &dyn Store,
    phone: &str,
) -> Result<Option<CallRecord>, AppError> {
    store
        .latest_call_by_phone_and_status(phone, CallStatus::AwaitingCallback)
        .await
}

async fn quiz_history_clone(
    store: &dyn Store,
    phone: &str,
    call_sid: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Option<CallRecord>, AppError> {
    let Some(previous) = store.latest_quiz_call_by_phone(phone).await? else {
        return Ok(None);
    };
    let record = CallRecord {
        id: Uuid::new_v4(),
        user_id: previous.user_id,
        lead_id: previous.lead_id,
        phone: phone.to_string(),
        call_type: CallType::Inbound,
        status: CallStatus::InProgress,
        respondent_name: previous.respondent_name.clone(),
        quiz_score: previous.quiz_score,
        quiz_result: previous.quiz_result.clone(),
        quiz_answers: previous.quiz_answers.clone(),
        transcript: Vec::new(),
        summary: None,
        recording_url: None,
        duration_secs: None,
        appointment_id: None,
        call_sid: call_sid.map(str::to_string),
        created_at: now,
    };
    store
        .insert_call(&record)
        .await
        .context("inserting cloned quiz-context record")?;
    tracing::info!(
        "Cloned quiz context from call {} into new record {}",
        previous.id,
        record.id
    );
    Ok(Some(record))
}

async fn known_lead(
    store: &dyn Store,
    phone: &str,
    call_sid: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Option<CallRecord>, AppError> {
    let Some(lead) = store.find_lead_by_phone(phone).await? else {
        return Ok(None);
    };
    let record = CallRecord {
        id: Uuid::new_v4(),
        user_id: lead.user_id,
        lead_id: Some(lead.id),
        phone: phone.to_string(),
        call_type: CallType::Inbound,
        status: CallStatus::InProgress,
        respondent_name: Some(lead.name.clone()),
        quiz_score: None,
        quiz_result: None,
        quiz_answers: None,
        transcript: Vec::new(),
        summary: None,
        recording_url: None,
        duration_secs: None,
        appointment_id: None,
        call_sid: call_sid.map(str::to_string),
        created_at: now,
    };
    store
        .insert_call(&record)
        .await
        .context("inserting lead-matched inbound record")?;
    tracing::info!("Created inbound call record {} for lead {}", record.id, lead.id);
    Ok(Some(record))
}

/// Run the chain for an inbound caller.
pub async fn resolve_inbound(
    store: &dyn Store,
    phone: &str,
    call_sid: Option<&str>,
    now: DateTime<Utc>,
) -> Result<ResolvedContext, AppError> {
    if let Some(record) = pending_callback(store, phone).await? {
        tracing::info!("Matched pending callback record {} for {}", record.id, phone);
        return Ok(ResolvedContext::Found {
            record,
            created: false,
        });
    }
    if let Some(record) = quiz_history_clone(store, phone, call_sid, now).await? {
        return Ok(ResolvedContext::Found {
            record,
            created: true,
        });
    }
    if let Some(record) = known_lead(store, phone, call_sid, now).await? {
        return Ok(ResolvedContext::Found {
            record,
            created: true,
        });
    }
    tracing::info!("No context found for inbound caller {}", phone);
    Ok(ResolvedContext::Unknown)
}
