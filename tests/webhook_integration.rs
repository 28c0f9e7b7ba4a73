/// Integration tests for the voice webhook with mocked external APIs.
/// Drives the full handler path against the in-memory store without hitting
/// real telephony, email, or generative services.
use axum::body::to_bytes;
use axum::extract::{RawQuery, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{Duration, Utc};
use moka::future::Cache;
use std::sync::Arc;
use uuid::Uuid;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use voice_call_api::config::Config;
use voice_call_api::email_client::EmailClient;
use voice_call_api::models::{CallRecord, CallStatus, CallType, TranscriptTurn};
use voice_call_api::openai_client::OpenAiClient;
use voice_call_api::store::MemoryStore;
use voice_call_api::twilio_client::TwilioClient;
use voice_call_api::webhook_handler::{voice_webhook, AppState};

const TEST_PHONE: &str = "+15550001111";

/// Helper to build a test config with every external base URL pointed at the
/// mock server.
fn test_config(base_url: &str) -> Config {
    Config {
        database_url: "postgresql://test".to_string(),
        port: 3000,
        public_base_url: "https://voice.test".to_string(),
        openai_api_key: "test-openai-key".to_string(),
        openai_base_url: base_url.to_string(),
        openai_model: "gpt-4o-mini".to_string(),
        twilio_account_sid: "ACtest".to_string(),
        twilio_auth_token: "test-token".to_string(),
        twilio_base_url: base_url.to_string(),
        twilio_sms_from: "+15559990000".to_string(),
        email_api_key: Some("test-email-key".to_string()),
        email_base_url: base_url.to_string(),
        email_from: "bookings@test.example".to_string(),
    }
}

fn test_state(base_url: &str) -> (Arc<AppState>, Arc<MemoryStore>) {
    let config = test_config(base_url);
    let store = Arc::new(MemoryStore::new());
    let state = Arc::new(AppState {
        openai: OpenAiClient::new(&config).unwrap(),
        twilio: TwilioClient::new(&config).unwrap(),
        email: EmailClient::new(&config).unwrap(),
        store: store.clone(),
        summary_inflight: Cache::builder().max_capacity(100).build(),
        config,
    });
    (state, store)
}

/// Invoke the webhook handler and return the response body, asserting the
/// universal contract: 200 with an XML content type.
async fn post_webhook(state: &Arc<AppState>, query: &str, body: &str) -> String {
    let response = voice_webhook(
        State(state.clone()),
        RawQuery(Some(query.to_string())),
        body.to_string(),
    )
    .await
    .into_response();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("application/xml")
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn call_record(phone: &str, status: CallStatus) -> CallRecord {
    CallRecord {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        lead_id: None,
        phone: phone.to_string(),
        call_type: CallType::Outbound,
        status,
        respondent_name: Some("Dana Whitfield".to_string()),
        quiz_score: Some(8),
        quiz_result: Some("hot".to_string()),
        quiz_answers: Some("Q1: yes\nQ2: within a month".to_string()),
        transcript: Vec::new(),
        summary: None,
        recording_url: None,
        duration_secs: None,
        appointment_id: None,
        call_sid: None,
        created_at: Utc::now(),
    }
}

fn chat_reply(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "choices": [{"message": {"role": "assistant", "content": content}}]
    }))
}

async fn mock_chat(server: &MockServer, content: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(chat_reply(content))
        .mount(server)
        .await;
}

#[tokio::test]
async fn unknown_inbound_caller_is_turned_away_without_a_record() {
    let server = MockServer::start().await;
    let (state, store) = test_state(&server.uri());

    let xml = post_webhook(&state, "", "From=%2B15550009999&Direction=inbound").await;

    assert!(xml.contains("find a submission for this number"));
    assert!(xml.contains("<Hangup"));
    assert!(!xml.contains("<Gather"));
    assert!(store.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn pending_callback_record_is_reused_and_goes_live() {
    let server = MockServer::start().await;
    mock_chat(&server, "Hi Dana! Is now a good time?").await;
    let (state, store) = test_state(&server.uri());

    let record = call_record(TEST_PHONE, CallStatus::AwaitingCallback);
    let id = record.id;
    store.calls.lock().unwrap().push(record);

    let xml = post_webhook(
        &state,
        "",
        "From=%2B15550001111&CallSid=CAlive777&Direction=inbound&CallStatus=ringing",
    )
    .await;

    assert!(xml.contains("<Gather"));
    assert!(xml.contains(&format!("call_log_id={}", id)));

    let calls = store.calls.lock().unwrap();
    // reused, not duplicated, and correlated with the live leg
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].status, CallStatus::InProgress);
    assert_eq!(calls[0].call_sid.as_deref(), Some("CAlive777"));
    assert_eq!(calls[0].transcript.len(), 1);
}

#[tokio::test]
async fn pending_callback_outranks_quiz_history() {
    let server = MockServer::start().await;
    mock_chat(&server, "Welcome back!").await;
    let (state, store) = test_state(&server.uri());

    let mut old_quiz = call_record(TEST_PHONE, CallStatus::Completed);
    old_quiz.created_at = Utc::now() - Duration::hours(2);
    let mut pending = call_record(TEST_PHONE, CallStatus::AwaitingCallback);
    pending.created_at = Utc::now() - Duration::hours(1);
    let pending_id = pending.id;
    {
        let mut calls = store.calls.lock().unwrap();
        calls.push(old_quiz);
        calls.push(pending);
    }

    post_webhook(&state, "", "From=%2B15550001111&Direction=inbound").await;

    let calls = store.calls.lock().unwrap();
    assert_eq!(calls.len(), 2, "no new record should be created");
    let reused = calls.iter().find(|c| c.id == pending_id).unwrap();
    assert_eq!(reused.status, CallStatus::InProgress);
}

#[tokio::test]
async fn quiz_history_clones_context_into_a_fresh_record() {
    let server = MockServer::start().await;
    mock_chat(&server, "Hi again Dana!").await;
    let (state, store) = test_state(&server.uri());

    let mut previous = call_record(TEST_PHONE, CallStatus::Completed);
    previous.created_at = Utc::now() - Duration::days(1);
    let previous_id = previous.id;
    store.calls.lock().unwrap().push(previous);

    let xml = post_webhook(&state, "", "From=%2B15550001111&Direction=inbound").await;
    assert!(xml.contains("<Gather"));

    let calls = store.calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    let fresh = calls.iter().find(|c| c.id != previous_id).unwrap();
    assert_eq!(fresh.status, CallStatus::InProgress);
    assert_eq!(fresh.call_type, CallType::Inbound);
    assert_eq!(fresh.quiz_score, Some(8));
    assert_eq!(fresh.quiz_result.as_deref(), Some("hot"));
    // opener only; the old transcript does not carry over
    assert_eq!(fresh.transcript.len(), 1);
}

#[tokio::test]
async fn gather_turn_appends_user_and_assistant_turns_in_order() {
    let server = MockServer::start().await;
    mock_chat(&server, "Sure, happy to explain more.").await;
    let (state, store) = test_state(&server.uri());

    let mut record = call_record(TEST_PHONE, CallStatus::InProgress);
    record
        .transcript
        .push(TranscriptTurn::assistant("Hi Dana, got a minute?"));
    let id = record.id;
    store.calls.lock().unwrap().push(record);

    let xml = post_webhook(
        &state,
        &format!("event=gather&call_log_id={}", id),
        "SpeechResult=tell+me+more",
    )
    .await;

    assert!(xml.contains("<Gather"));
    assert!(xml.contains("Sure, happy to explain more."));

    let calls = store.calls.lock().unwrap();
    let transcript = &calls[0].transcript;
    // prior turns preserved as a prefix, new turns appended
    assert_eq!(transcript.len(), 3);
    assert_eq!(transcript[0].content, "Hi Dana, got a minute?");
    assert_eq!(transcript[1].content, "tell me more");
    assert_eq!(transcript[2].content, "Sure, happy to explain more.");
}

#[tokio::test]
async fn model_failure_speaks_fallback_and_keeps_listening() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let (state, store) = test_state(&server.uri());

    let record = call_record(TEST_PHONE, CallStatus::InProgress);
    let id = record.id;
    store.calls.lock().unwrap().push(record);

    let xml = post_webhook(
        &state,
        &format!("event=gather&call_log_id={}", id),
        "SpeechResult=hello",
    )
    .await;

    // generative failure is not a dead call: fallback line, still gathering
    assert!(xml.contains("Thanks for sharing that."));
    assert!(xml.contains("<Gather"));
}

#[tokio::test]
async fn turn_cap_forces_wrapup_without_calling_the_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(chat_reply("should never be asked"))
        .expect(0)
        .mount(&server)
        .await;
    let (state, store) = test_state(&server.uri());

    let mut record = call_record(TEST_PHONE, CallStatus::InProgress);
    for i in 0..39 {
        record.transcript.push(TranscriptTurn::user(format!("turn {i}")));
    }
    let id = record.id;
    store.calls.lock().unwrap().push(record);

    let xml = post_webhook(
        &state,
        &format!("event=gather&call_log_id={}", id),
        "SpeechResult=and+another+thing",
    )
    .await;

    assert!(xml.contains("Thanks so much for your time today."));
    assert!(xml.contains("<Hangup"));
    assert!(!xml.contains("<Gather"));

    let calls = store.calls.lock().unwrap();
    assert_eq!(calls[0].transcript.len(), 41);
}

#[tokio::test]
async fn agreed_booking_writes_appointment_booking_and_outreach() {
    let server = MockServer::start().await;
    mock_chat(&server, "Perfect! [BOOK:Tuesday morning] Talk soon.").await;
    Mock::given(method("POST"))
        .and(path("/2010-04-01/Accounts/ACtest/Messages.json"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"sid": "SM1"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "em1"})))
        .expect(1)
        .mount(&server)
        .await;
    let (state, store) = test_state(&server.uri());

    let record = call_record(TEST_PHONE, CallStatus::InProgress);
    let id = record.id;
    store.calls.lock().unwrap().push(record);

    let xml = post_webhook(
        &state,
        &format!("event=gather&call_log_id={}", id),
        "SpeechResult=Tuesday+morning+works",
    )
    .await;

    // the raw directive token never reaches the caller
    assert!(!xml.contains("[BOOK"));
    assert!(xml.contains("booked for"));

    let appointments = store.appointments.lock().unwrap();
    assert_eq!(appointments.len(), 1);
    assert_eq!(
        appointments[0].end_at - appointments[0].start_at,
        Duration::minutes(30)
    );
    assert!(appointments[0].start_at > Utc::now());

    let bookings = store.bookings.lock().unwrap();
    assert_eq!(bookings.len(), 1);
    assert_eq!(bookings[0].duration_minutes, 30);
    assert_eq!(bookings[0].guest_name, "Dana Whitfield");

    let outreach = store.outreach.lock().unwrap();
    assert_eq!(outreach.len(), 1);
    assert_eq!(outreach[0].kind, "booking");
    assert!(!outreach[0].pending_reconciliation);

    let calls = store.calls.lock().unwrap();
    assert_eq!(calls[0].appointment_id, Some(appointments[0].id));
}

#[tokio::test]
async fn booking_combined_with_end_marker_hangs_up() {
    let server = MockServer::start().await;
    mock_chat(&server, "See you then. [BOOK:Friday] [END_CALL]").await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/2010-04-01/Accounts/.*/Messages\.json$"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"sid": "SM1"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "em1"})))
        .mount(&server)
        .await;
    let (state, store) = test_state(&server.uri());

    let record = call_record(TEST_PHONE, CallStatus::InProgress);
    let id = record.id;
    store.calls.lock().unwrap().push(record);

    let xml = post_webhook(
        &state,
        &format!("event=gather&call_log_id={}", id),
        "SpeechResult=Friday+works+thanks",
    )
    .await;

    // the stripped end marker must still terminate the call
    assert!(xml.contains("booked for"));
    assert!(xml.contains("<Hangup"));
    assert!(!xml.contains("<Gather"));
    assert_eq!(store.appointments.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn booking_survives_notification_failures() {
    let server = MockServer::start().await;
    mock_chat(&server, "Great. [BOOK:tomorrow]").await;
    // SMS endpoint down; email endpoint never mounted (404)
    Mock::given(method("POST"))
        .and(path_regex(r"^/2010-04-01/Accounts/.*/Messages\.json$"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let (state, store) = test_state(&server.uri());

    let record = call_record(TEST_PHONE, CallStatus::InProgress);
    let id = record.id;
    store.calls.lock().unwrap().push(record);

    let xml = post_webhook(
        &state,
        &format!("event=gather&call_log_id={}", id),
        "SpeechResult=sure",
    )
    .await;

    // appointment landed, so the caller still hears a confirmation
    assert!(xml.contains("booked for"));
    assert_eq!(store.appointments.lock().unwrap().len(), 1);

    let outreach = store.outreach.lock().unwrap();
    assert_eq!(outreach.len(), 1);
    assert!(outreach[0].pending_reconciliation);
    assert!(outreach[0].detail.contains("sms"));
    assert!(outreach[0].detail.contains("email"));
}

#[tokio::test]
async fn completed_status_summarizes_exactly_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(chat_reply("Buyer temperature: warm"))
        .expect(1)
        .mount(&server)
        .await;
    let (state, store) = test_state(&server.uri());

    let mut record = call_record(TEST_PHONE, CallStatus::InProgress);
    record.transcript.push(TranscriptTurn::assistant("Hi!"));
    record.transcript.push(TranscriptTurn::user("Hello."));
    let id = record.id;
    store.calls.lock().unwrap().push(record);

    let query = format!("event=status&call_log_id={}", id);
    let body = "CallStatus=completed&CallDuration=62";
    post_webhook(&state, &query, body).await;
    // retried delivery of the same terminal callback
    post_webhook(&state, &query, body).await;

    let calls = store.calls.lock().unwrap();
    assert_eq!(calls[0].status, CallStatus::Completed);
    assert_eq!(calls[0].duration_secs, Some(62));
    assert_eq!(calls[0].summary.as_deref(), Some("Buyer temperature: warm"));
}

#[tokio::test]
async fn short_call_is_not_summarized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(chat_reply("should never be asked"))
        .expect(0)
        .mount(&server)
        .await;
    let (state, store) = test_state(&server.uri());

    let mut record = call_record(TEST_PHONE, CallStatus::InProgress);
    record.transcript.push(TranscriptTurn::assistant("Hi!"));
    let id = record.id;
    store.calls.lock().unwrap().push(record);

    post_webhook(
        &state,
        &format!("event=status&call_log_id={}", id),
        "CallStatus=completed&CallDuration=4",
    )
    .await;

    let calls = store.calls.lock().unwrap();
    assert_eq!(calls[0].status, CallStatus::Completed);
    assert!(calls[0].summary.is_none());
}

#[tokio::test]
async fn terminal_status_never_reverts_on_a_late_callback() {
    let server = MockServer::start().await;
    let (state, store) = test_state(&server.uri());

    let record = call_record(TEST_PHONE, CallStatus::Completed);
    let id = record.id;
    store.calls.lock().unwrap().push(record);

    post_webhook(
        &state,
        &format!("event=status&call_log_id={}", id),
        "CallStatus=in-progress",
    )
    .await;

    let calls = store.calls.lock().unwrap();
    assert_eq!(calls[0].status, CallStatus::Completed);
}

#[tokio::test]
async fn recording_callback_attaches_url_to_latest_active_call() {
    let server = MockServer::start().await;
    let (state, store) = test_state(&server.uri());

    let mut older = call_record(TEST_PHONE, CallStatus::Completed);
    older.created_at = Utc::now() - Duration::hours(1);
    let newer = call_record("+15550002222", CallStatus::InProgress);
    let newer_id = newer.id;
    {
        let mut calls = store.calls.lock().unwrap();
        calls.push(older);
        calls.push(newer);
    }

    let xml = post_webhook(
        &state,
        "event=recording",
        "RecordingUrl=https%3A%2F%2Fapi.twilio.com%2Frec%2FRE123",
    )
    .await;

    assert!(xml.contains("<Response"));
    assert!(!xml.contains("<Say"));

    let calls = store.calls.lock().unwrap();
    let newer = calls.iter().find(|c| c.id == newer_id).unwrap();
    assert_eq!(
        newer.recording_url.as_deref(),
        Some("https://api.twilio.com/rec/RE123")
    );
}

#[tokio::test]
async fn outbound_initial_answer_opens_and_gathers() {
    let server = MockServer::start().await;
    mock_chat(&server, "Hi Dana! Calling about your results.").await;
    let (state, store) = test_state(&server.uri());

    let record = call_record(TEST_PHONE, CallStatus::AwaitingCallback);
    let id = record.id;
    store.calls.lock().unwrap().push(record);

    let xml = post_webhook(
        &state,
        &format!("call_log_id={}", id),
        "CallStatus=in-progress&Direction=outbound-api",
    )
    .await;

    assert!(xml.contains("Hi Dana! Calling about your results."));
    assert!(xml.contains("<Gather"));
    assert!(xml.contains(&format!("call_log_id={}", id)));

    let calls = store.calls.lock().unwrap();
    assert_eq!(calls[0].status, CallStatus::InProgress);
    assert_eq!(calls[0].transcript.len(), 1);
}

#[tokio::test]
async fn garbage_input_still_yields_valid_twiml() {
    let server = MockServer::start().await;
    let (state, _store) = test_state(&server.uri());

    let xml = post_webhook(
        &state,
        "event=gather&call_log_id=not-a-uuid",
        "%%%garbage%%%",
    )
    .await;

    assert!(xml.starts_with("<?xml"));
    assert!(xml.contains("<Hangup"));
}
