//! Spoken-response documents in the telephony provider's markup dialect.
//!
//! Every webhook invocation resolves to one of two shapes: speak-and-gather
//! (prompt, then listen for speech with a timeout and a callback URL carrying
//! the next-turn parameters) or speak-and-hangup (terminal).

pub fn wrap_twiml(twiml: String) -> String {
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>{twiml}")
}

mod verbs {
    use xmlserde_derives::XmlSerialize;

    #[derive(PartialEq, Eq, XmlSerialize)]
    #[xmlserde(root = b"Response")]
    pub struct Response {
        #[xmlserde(ty = "untag")]
        pub actions: Vec<ResponseAction>,
    }

    #[derive(PartialEq, Eq, XmlSerialize)]
    pub enum ResponseAction {
        #[xmlserde(name = b"Say")]
        Say(SayAction),
        #[xmlserde(name = b"Gather")]
        Gather(GatherAction),
        #[xmlserde(name = b"Hangup")]
        Hangup(HangupAction),
    }

    #[derive(PartialEq, Eq, XmlSerialize, Default)]
    pub struct SayAction {
        #[xmlserde(ty = "text")]
        pub text: String,
        #[xmlserde(name = b"voice", ty = "attr")]
        pub voice: Option<String>,
        #[xmlserde(name = b"language", ty = "attr")]
        pub language: Option<String>,
    }

    #[derive(PartialEq, Eq, XmlSerialize)]
    pub struct GatherAction {
        #[xmlserde(name = b"input", ty = "attr")]
        pub input: String,
        #[xmlserde(name = b"action", ty = "attr")]
        pub action: String,
        #[xmlserde(name = b"method", ty = "attr")]
        pub method: String,
        #[xmlserde(name = b"speechTimeout", ty = "attr")]
        pub speech_timeout: String,
        #[xmlserde(name = b"Say", ty = "child")]
        pub say: SayAction,
    }

    #[derive(PartialEq, Eq, XmlSerialize, Default)]
    pub struct HangupAction {
        // Hangup carries no attributes or content.
        #[xmlserde(ty = "text")]
        pub text: String,
    }
}
pub use verbs::*;

/// Speech-recognition window, seconds. The provider falls back to the verbs
/// after the Gather when the caller says nothing.
const SPEECH_TIMEOUT_SECS: &str = "5";

pub const NO_SPEECH_FALLBACK: &str =
    "Sorry, I didn't catch that. We'll follow up with you soon. Goodbye.";

fn say(text: &str) -> SayAction {
    SayAction {
        text: text.to_string(),
        ..Default::default()
    }
}

/// Prompt the caller and listen for the next speech turn. The action URL
/// carries the continuation query string for the stateless next invocation.
pub fn speak_and_gather(text: &str, action_url: &str) -> String {
    let response = Response {
        actions: vec![
            ResponseAction::Gather(GatherAction {
                input: "speech".to_string(),
                action: action_url.to_string(),
                method: "POST".to_string(),
                speech_timeout: SPEECH_TIMEOUT_SECS.to_string(),
                say: say(text),
            }),
            ResponseAction::Say(say(NO_SPEECH_FALLBACK)),
            ResponseAction::Hangup(HangupAction::default()),
        ],
    };
    wrap_twiml(xmlserde::xml_serialize(response))
}

/// Terminal spoken statement.
pub fn speak_and_hangup(text: &str) -> String {
    let response = Response {
        actions: vec![
            ResponseAction::Say(say(text)),
            ResponseAction::Hangup(HangupAction::default()),
        ],
    };
    wrap_twiml(xmlserde::xml_serialize(response))
}

/// Bare acknowledgment for callbacks that produce no speech (status,
/// recording). Still a well-formed document.
pub fn empty_response() -> String {
    let response = Response { actions: vec![] };
    wrap_twiml(xmlserde::xml_serialize(response))
}
