/// Property-based tests using proptest
/// Tests invariants that should hold for all inputs: slot computation never
/// double-books, directive parsing never leaks tokens, and the webhook
/// parsers never panic.
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use proptest::prelude::*;
use uuid::Uuid;

use voice_call_api::directive::{self, ModelDirective};
use voice_call_api::models::{Appointment, AppointmentStatus, AvailabilitySlot};
use voice_call_api::scheduling::{open_slots, resolve_preference, MAX_OFFERED_SLOTS, SLOT_MINUTES};
use voice_call_api::webhook_models::{TwilioForm, VoiceQuery};

// Fixed anchor so generated appointments land inside the scheduling horizon.
// 2025-03-03 is a Monday.
fn anchor() -> DateTime<Utc> {
    Utc.from_utc_datetime(
        &NaiveDate::from_ymd_opt(2025, 3, 3)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap(),
    )
}

fn slot_strategy(user_id: Uuid) -> impl Strategy<Value = AvailabilitySlot> {
    (0i16..7, 6u32..16, 1u32..8).prop_map(move |(dow, start_hour, half_hours)| {
        let start = NaiveTime::from_hms_opt(start_hour, 0, 0).unwrap();
        let end = start + Duration::minutes(30 * half_hours as i64);
        AvailabilitySlot {
            id: Uuid::new_v4(),
            user_id,
            day_of_week: dow,
            start_time: start,
            end_time: end,
        }
    })
}

fn appointment_strategy(user_id: Uuid) -> impl Strategy<Value = Appointment> {
    (0i64..14, 6u32..20, 0u32..4, 1i64..5).prop_map(move |(day, hour, quarter, halves)| {
        let start = anchor() + Duration::days(day) + Duration::hours(hour as i64 - 6)
            + Duration::minutes(15 * quarter as i64);
        Appointment {
            id: Uuid::new_v4(),
            user_id,
            lead_id: None,
            title: "existing".to_string(),
            start_at: start,
            end_at: start + Duration::minutes(30 * halves),
            status: AppointmentStatus::Confirmed,
            notes: None,
            created_at: anchor(),
        }
    })
}

proptest! {
    #[test]
    fn open_slots_never_overlap_blocking_appointments(
        slots in proptest::collection::vec(slot_strategy(Uuid::nil()), 0..5),
        appointments in proptest::collection::vec(appointment_strategy(Uuid::nil()), 0..6),
    ) {
        let now = anchor();
        let open = open_slots(&slots, &appointments, now, MAX_OFFERED_SLOTS);

        prop_assert!(open.len() <= MAX_OFFERED_SLOTS);
        for candidate in &open {
            prop_assert!(candidate.start > now);
            prop_assert_eq!(candidate.end - candidate.start, Duration::minutes(SLOT_MINUTES));
            for a in &appointments {
                prop_assert!(
                    !(candidate.start < a.end_at && candidate.end > a.start_at),
                    "candidate {} overlaps appointment {}..{}",
                    candidate.start, a.start_at, a.end_at
                );
            }
        }
        // earliest-first ordering
        for pair in open.windows(2) {
            prop_assert!(pair[0].start < pair[1].start);
        }
    }

    #[test]
    fn preference_resolution_always_yields_a_future_half_hour_slot(
        slots in proptest::collection::vec(slot_strategy(Uuid::nil()), 0..5),
        appointments in proptest::collection::vec(appointment_strategy(Uuid::nil()), 0..6),
        preference in prop_oneof![
            Just("Tuesday".to_string()),
            Just("monday afternoon".to_string()),
            Just("Friday evening".to_string()),
            Just("whenever works".to_string()),
            Just(String::new()),
            "[a-z ]{0,30}",
        ],
    ) {
        let now = anchor();
        let resolved = resolve_preference(&slots, &appointments, &preference, now);
        // booking is never refused, and the slot is always ahead of the caller
        prop_assert!(resolved.start > now);
        prop_assert_eq!(resolved.end - resolved.start, Duration::minutes(SLOT_MINUTES));
    }
}

proptest! {
    #[test]
    fn booking_token_is_always_extracted_and_stripped(
        prefix in "[a-zA-Z ,.!]{0,40}",
        preference in "[a-zA-Z0-9 ]{0,20}",
        suffix in "[a-zA-Z ,.!]{0,40}",
    ) {
        let raw = format!("{prefix}[BOOK:{preference}]{suffix}");
        match directive::parse(&raw) {
            ModelDirective::BookingRequested { text, preference: parsed, .. } => {
                prop_assert_eq!(parsed, preference.trim().to_string());
                prop_assert!(!text.contains("[BOOK"));
                prop_assert!(!text.contains("[END_CALL]"));
            }
            other => prop_assert!(false, "expected a booking directive, got {:?}", other),
        }
    }

    #[test]
    fn parsed_directive_text_never_contains_control_tokens(raw in "\\PC{0,200}") {
        let directive = directive::parse(&raw);
        let text = match &directive {
            ModelDirective::Continue(t) => t,
            ModelDirective::EndCall(t) => t,
            ModelDirective::BookingRequested { text, .. } => text,
        };
        prop_assert!(!text.contains("[END_CALL]"));
    }
}

proptest! {
    #[test]
    fn webhook_form_parsing_never_panics(body in "\\PC*") {
        let _ = TwilioForm::parse(&body);
    }

    #[test]
    fn continuation_query_round_trips(
        call_log_id in "[a-f0-9-]{1,36}",
        name in proptest::option::of("[A-Za-z ]{1,20}"),
        score in proptest::option::of(0i32..100),
    ) {
        let query = VoiceQuery {
            respondent_name: name.clone(),
            quiz_score: score.map(|s| s.to_string()),
            ..Default::default()
        };
        let qs = query.continuation(&call_log_id);
        let parsed: VoiceQuery = serde_urlencoded::from_str(&qs).unwrap();

        prop_assert_eq!(parsed.event.as_deref(), Some("gather"));
        prop_assert_eq!(parsed.call_log_id.as_deref(), Some(call_log_id.as_str()));
        prop_assert_eq!(parsed.respondent_name.as_deref(), name.as_deref());
        prop_assert_eq!(parsed.quiz_score_value(), score.unwrap_or(0));
    }
}
