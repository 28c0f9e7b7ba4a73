//! Parser for control directives embedded in generative model output.
//!
//! The system prompt authorizes two tokens: a booking request
//! `[BOOK:<preference text>]` and an end-of-call marker `[END_CALL]`. The
//! model also ends calls with plain closing phrases, so those are matched
//! heuristically. All the brittleness of natural-language-embedded commands
//! lives here.

use regex::Regex;

/// What the model's reply asks the orchestrator to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelDirective {
    /// Speak the text and keep listening.
    Continue(String),
    /// Book an appointment matching the preference, then speak the text.
    /// `terminal` records an explicit end marker that accompanied the booking
    /// token; stripping removes it from the text, so it has to be captured
    /// here.
    BookingRequested {
        text: String,
        preference: String,
        terminal: bool,
    },
    /// Speak the text and hang up.
    EndCall(String),
}

const END_TOKEN: &str = "[END_CALL]";
const END_PHRASES: &[&str] = &["goodbye", "have a great day"];

fn book_regex() -> Regex {
    Regex::new(r"(?i)\[BOOK:([^\]]*)\]").unwrap()
}

/// Collapse the whitespace holes left by stripping tokens mid-sentence.
fn tidy(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// True when the spoken text signals the conversation is over, either via the
/// explicit marker or a closing phrase.
pub fn signals_end(text: &str) -> bool {
    if text.contains(END_TOKEN) {
        return true;
    }
    let lowered = text.to_lowercase();
    END_PHRASES.iter().any(|p| lowered.contains(p))
}

/// Parse one model reply into a tagged directive. Booking takes precedence;
/// the caller re-checks `signals_end` on the returned text if it needs
/// termination after a booking turn.
pub fn parse(raw: &str) -> ModelDirective {
    let re = book_regex();
    if let Some(caps) = re.captures(raw) {
        let preference = caps
            .get(1)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();
        let terminal = raw.contains(END_TOKEN);
        let stripped = re.replace_all(raw, " ");
        let text = tidy(&stripped.replace(END_TOKEN, " "));
        return ModelDirective::BookingRequested {
            text,
            preference,
            terminal,
        };
    }

    if raw.contains(END_TOKEN) {
        return ModelDirective::EndCall(tidy(&raw.replace(END_TOKEN, " ")));
    }

    let lowered = raw.to_lowercase();
    if END_PHRASES.iter().any(|p| lowered.contains(p)) {
        return ModelDirective::EndCall(tidy(raw));
    }

    ModelDirective::Continue(tidy(raw))
}
