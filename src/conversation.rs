//! The conversation turn engine.
//!
//! Each gather webhook is one turn: reload the transcript, append the
//! caller's speech, ask the model for the next line, act on any embedded
//! directive, persist, and hand back either a prompt-and-listen or a terminal
//! statement. State never lives in the process; the read-modify-write through
//! the store is the only synchronization.

use crate::directive::{self, ModelDirective};
use crate::models::{CallRecord, TranscriptTurn};
use crate::scheduling::{self, availability_listing, HORIZON_DAYS};
use crate::webhook_handler::AppState;
use chrono::{DateTime, Duration, Utc};

/// Safety valve against runaway conversations.
pub const MAX_TRANSCRIPT_TURNS: usize = 40;

pub const GENERATIVE_FALLBACK: &str =
    "Thanks for sharing that. We'll follow up with you shortly.";

pub const FORCED_WRAPUP: &str =
    "Thanks so much for your time today. We'll be in touch with next steps. Goodbye!";

const OPENER_FALLBACK: &str =
    "Hi! Thanks for taking our assessment. Do you have a quick minute to go over your results?";

/// What the engine hands back to the webhook layer.
#[derive(Debug, Clone)]
pub struct SpokenReply {
    pub text: String,
    pub terminal: bool,
}

impl SpokenReply {
    fn speak(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            terminal: false,
        }
    }

    fn hangup(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            terminal: true,
        }
    }
}

/// System prompt for a conversation turn. Quiz answers are embedded verbatim
/// so the agent can reference specifics, and the availability listing is
/// computed live against existing appointments.
fn system_prompt(call: &CallRecord, availability: &str) -> String {
    let quiz = call
        .quiz_answers
        .as_deref()
        .unwrap_or("No quiz answers on file.");
    let result = call.quiz_result.as_deref().unwrap_or("n/a");
    format!(
        "You are a friendly appointment-setting assistant on a live phone call with {name}. \
Keep replies short and conversational, one or two sentences, suitable for being read aloud.\n\
\n\
Their assessment result: {result} (score {score}).\n\
Their exact answers:\n{quiz}\n\
\n\
Open times you may offer:\n{availability}\n\
\n\
When the caller agrees on a time, emit the token [BOOK:<their stated preference>] in your reply. \
When the conversation is finished, say a brief farewell and emit [END_CALL].",
        name = call.first_name(),
        result = result,
        score = call.quiz_score.unwrap_or(0),
        quiz = quiz,
        availability = availability,
    )
}

/// One-shot personalized opening line for an answered call. Falls back to a
/// fixed greeting when generation fails.
pub async fn generate_opener(state: &AppState, call: &CallRecord) -> String {
    let prompt = format!(
        "You are a friendly assistant opening a phone call with {name}, who completed an \
assessment (result: {result}, score {score}). Their answers:\n{quiz}\n\
Write one short spoken opening line: greet them by first name, mention you're calling about \
their results, and ask if now is a good time. Output only the line.",
        name = call.first_name(),
        result = call.quiz_result.as_deref().unwrap_or("n/a"),
        score = call.quiz_score.unwrap_or(0),
        quiz = call.quiz_answers.as_deref().unwrap_or("none"),
    );
    match state.openai.complete(&prompt, &[], 80).await {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!("Opener generation failed, using fallback: {}", e);
            if call.respondent_name.is_some() {
                format!(
                    "Hi {}! Thanks for taking our assessment. Do you have a quick minute to go over your results?",
                    call.first_name()
                )
            } else {
                OPENER_FALLBACK.to_string()
            }
        }
    }
}

/// Run one speech turn against a loaded call record.
pub async fn run_turn(
    state: &AppState,
    mut call: CallRecord,
    speech: &str,
    now: DateTime<Utc>,
) -> SpokenReply {
    call.transcript.push(TranscriptTurn::user(speech));

    // Hard cap: force-terminate regardless of what the model would say.
    if call.transcript.len() >= MAX_TRANSCRIPT_TURNS {
        tracing::warn!(
            "Call {} hit the {}-turn cap, forcing wrap-up",
            call.id,
            MAX_TRANSCRIPT_TURNS
        );
        call.transcript.push(TranscriptTurn::assistant(FORCED_WRAPUP));
        persist_transcript(state, &call).await;
        return SpokenReply::hangup(FORCED_WRAPUP);
    }

    let availability = load_availability(state, &call, now).await;
    let prompt = system_prompt(&call, &availability);

    let raw = match state.openai.complete(&prompt, &call.transcript, 160).await {
        Ok(text) => text,
        Err(e) => {
            tracing::error!("Generative turn failed for call {}: {}", call.id, e);
            call.transcript
                .push(TranscriptTurn::assistant(GENERATIVE_FALLBACK));
            persist_transcript(state, &call).await;
            return SpokenReply::speak(GENERATIVE_FALLBACK);
        }
    };

    let reply = match directive::parse(&raw) {
        ModelDirective::Continue(text) => SpokenReply::speak(text),
        ModelDirective::EndCall(text) => SpokenReply::hangup(text),
        ModelDirective::BookingRequested {
            text,
            preference,
            terminal,
        } => {
            let spoken = handle_booking(state, &call, &text, &preference, now).await;
            let terminal = terminal || directive::signals_end(&spoken);
            SpokenReply {
                text: spoken,
                terminal,
            }
        }
    };

    call.transcript
        .push(TranscriptTurn::assistant(reply.text.clone()));
    persist_transcript(state, &call).await;
    reply
}

/// Resolve the preference and run the best-effort booking sequence. A failure
/// anywhere leaves the conversation intact; the caller just isn't confirmed.
async fn handle_booking(
    state: &AppState,
    call: &CallRecord,
    spoken_text: &str,
    preference: &str,
    now: DateTime<Utc>,
) -> String {
    let slot = match scheduling::resolve_for_owner(
        state.store.as_ref(),
        call.user_id,
        preference,
        now,
    )
    .await
    {
        Ok(slot) => slot,
        Err(e) => {
            tracing::error!("Slot resolution failed for call {}: {}", call.id, e);
            scheduling::resolve_preference(&[], &[], preference, now)
        }
    };

    let lead = match call.lead_id {
        Some(id) => state.store.get_lead(id).await.ok().flatten(),
        None => None,
    };

    let outcome = scheduling::execute_booking(
        state.store.as_ref(),
        &state.twilio,
        &state.email,
        call,
        lead.as_ref(),
        preference,
        slot,
        now,
    )
    .await;

    if !outcome.confirmed {
        tracing::warn!(
            "Booking not confirmed for call {} (failed: {:?})",
            call.id,
            outcome.failed_steps
        );
        return spoken_text.to_string();
    }

    // Splice in a confirmation sentence unless the model already produced one.
    let lowered = spoken_text.to_lowercase();
    if lowered.contains("booked") || lowered.contains("confirmed") {
        spoken_text.to_string()
    } else if spoken_text.is_empty() {
        outcome.confirmation_sentence()
    } else {
        format!("{} {}", outcome.confirmation_sentence(), spoken_text)
    }
}

async fn load_availability(state: &AppState, call: &CallRecord, now: DateTime<Utc>) -> String {
    let slots = match state.store.weekly_slots(call.user_id).await {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to load availability for {}: {}", call.user_id, e);
            return "No preset availability; offer to find a time that works.".to_string();
        }
    };
    let appointments = match state
        .store
        .blocking_appointments(call.user_id, now, now + Duration::days(HORIZON_DAYS))
        .await
    {
        Ok(a) => a,
        Err(e) => {
            tracing::error!("Failed to load appointments for {}: {}", call.user_id, e);
            Vec::new()
        }
    };
    availability_listing(&slots, &appointments, now)
}

async fn persist_transcript(state: &AppState, call: &CallRecord) {
    if let Err(e) = state
        .store
        .update_transcript(call.id, &call.transcript)
        .await
    {
        // A lost append is preferable to a crashed call; the next turn
        // reloads whatever last persisted.
        tracing::error!("Failed to persist transcript for call {}: {}", call.id, e);
    }
}
