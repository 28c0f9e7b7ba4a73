//! Post-call sales-intelligence brief.
//!
//! One-shot enrichment after the terminal status callback: re-read the
//! transcript and distill it. Best-effort; a failure leaves the summary null
//! without touching the recorded call status.

use crate::errors::AppError;
use crate::models::{CallRecord, TurnRole};
use crate::webhook_handler::AppState;

/// Calls shorter than this carry no usable conversation.
pub const MIN_SUMMARY_DURATION_SECS: i32 = 10;

fn transcript_text(call: &CallRecord) -> String {
    call.transcript
        .iter()
        .map(|turn| {
            let who = match turn.role {
                TurnRole::Assistant => "Agent",
                TurnRole::User => "Caller",
            };
            format!("{}: {}", who, turn.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Produce the structured brief for a completed call.
pub async fn generate_summary(state: &AppState, call: &CallRecord) -> Result<String, AppError> {
    let prompt = format!(
        "You are a sales analyst. Summarize this phone call transcript into a short brief with \
exactly these sections:\n\
Buyer temperature: (hot/warm/cold, one line)\n\
Pain points: (bullet list)\n\
Objections: (bullet list, or 'none raised')\n\
Next action: (one line)\n\
Booking status: {booking}\n\
\n\
Transcript:\n{transcript}",
        booking = if call.appointment_id.is_some() {
            "booked"
        } else {
            "not booked"
        },
        transcript = transcript_text(call),
    );
    state.openai.complete(&prompt, &[], 400).await
}
