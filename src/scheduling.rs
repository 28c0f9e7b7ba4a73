//! Availability computation and booking resolution.
//!
//! Open slots are the owner's recurring weekly windows projected across the
//! next 14 days, cut into 30-minute candidates, minus anything overlapping an
//! existing scheduled or confirmed appointment. All functions take `now`
//! explicitly; callers pass `Utc::now()`. Times are handled in UTC.

use crate::email_client::EmailClient;
use crate::errors::AppError;
use crate::models::{
    Appointment, AppointmentStatus, AvailabilitySlot, Booking, CallRecord, Lead, OutreachLog,
};
use crate::store::Store;
use crate::twilio_client::TwilioClient;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use uuid::Uuid;

pub const SLOT_MINUTES: i64 = 30;
pub const HORIZON_DAYS: i64 = 14;
pub const MAX_OFFERED_SLOTS: usize = 10;

/// A concrete bookable 30-minute window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotCandidate {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl SlotCandidate {
    fn at(start: DateTime<Utc>) -> Self {
        Self {
            start,
            end: start + Duration::minutes(SLOT_MINUTES),
        }
    }

    /// Human-readable form the agent offers verbally, e.g.
    /// "Tuesday, March 4 at 9:00 AM".
    pub fn label(&self) -> String {
        self.start.format("%A, %B %-d at %-I:%M %p").to_string()
    }
}

/// Half-open interval overlap test.
fn overlaps(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    conflict_start: DateTime<Utc>,
    conflict_end: DateTime<Utc>,
) -> bool {
    start < conflict_end && end > conflict_start
}

fn is_free(candidate: &SlotCandidate, appointments: &[Appointment]) -> bool {
    !appointments
        .iter()
        .any(|a| overlaps(candidate.start, candidate.end, a.start_at, a.end_at))
}

/// 30-minute candidates for one calendar date from the recurring windows.
/// `day_of_week` uses 0 = Sunday.
fn candidates_for_date(slots: &[AvailabilitySlot], date: NaiveDate) -> Vec<SlotCandidate> {
    let dow = date.weekday().num_days_from_sunday() as i16;
    let mut out = Vec::new();
    for slot in slots.iter().filter(|s| s.day_of_week == dow) {
        let mut cursor = slot.start_time;
        loop {
            let (end, wrapped) = cursor.overflowing_add_signed(Duration::minutes(SLOT_MINUTES));
            // wrapped past midnight, or past the window end
            if wrapped != 0 || end <= cursor || end > slot.end_time {
                break;
            }
            let start = Utc.from_utc_datetime(&date.and_time(cursor));
            out.push(SlotCandidate::at(start));
            cursor = end;
        }
    }
    out.sort_by_key(|c| c.start);
    // overlapping weekly windows can slice out the same candidate twice
    out.dedup();
    out
}

/// Up to `limit` open candidates within the horizon, earliest first. Past
/// slots and anything overlapping a blocking appointment are excluded.
pub fn open_slots(
    slots: &[AvailabilitySlot],
    appointments: &[Appointment],
    now: DateTime<Utc>,
    limit: usize,
) -> Vec<SlotCandidate> {
    let mut out = Vec::new();
    for offset in 0..HORIZON_DAYS {
        let date = (now + Duration::days(offset)).date_naive();
        for candidate in candidates_for_date(slots, date) {
            if candidate.start <= now {
                continue;
            }
            if !is_free(&candidate, appointments) {
                continue;
            }
            out.push(candidate);
            if out.len() >= limit {
                return out;
            }
        }
    }
    out
}

/// Availability listing embedded in the system prompt.
pub fn availability_listing(
    slots: &[AvailabilitySlot],
    appointments: &[Appointment],
    now: DateTime<Utc>,
) -> String {
    let open = open_slots(slots, appointments, now, MAX_OFFERED_SLOTS);
    if open.is_empty() {
        "No preset availability; offer to find a time that works.".to_string()
    } else {
        open.iter()
            .map(|c| format!("- {}", c.label()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn parse_weekday(preference: &str) -> Option<Weekday> {
    let lowered = preference.to_lowercase();
    for (name, day) in [
        ("sunday", Weekday::Sun),
        ("monday", Weekday::Mon),
        ("tuesday", Weekday::Tue),
        ("wednesday", Weekday::Wed),
        ("thursday", Weekday::Thu),
        ("friday", Weekday::Fri),
        ("saturday", Weekday::Sat),
    ] {
        if lowered.contains(name) {
            return Some(day);
        }
    }
    None
}

fn wants_later(preference: &str) -> bool {
    let lowered = preference.to_lowercase();
    lowered.contains("afternoon") || lowered.contains("evening")
}

/// Next occurrence of `weekday` strictly after `now`'s date.
fn next_weekday_date(now: DateTime<Utc>, weekday: Weekday) -> NaiveDate {
    let today = now.date_naive();
    let today_dow = today.weekday().num_days_from_sunday() as i64;
    let target_dow = weekday.num_days_from_sunday() as i64;
    let mut ahead = (target_dow - today_dow).rem_euclid(7);
    if ahead == 0 {
        ahead = 7;
    }
    today + Duration::days(ahead)
}

fn first_free_for_date(
    slots: &[AvailabilitySlot],
    appointments: &[Appointment],
    date: NaiveDate,
    now: DateTime<Utc>,
    later_bias: bool,
) -> Option<SlotCandidate> {
    let mut candidates = candidates_for_date(slots, date);
    if later_bias {
        // afternoon/evening keywords bias toward later slots within the day
        candidates.reverse();
    }
    candidates
        .into_iter()
        .find(|c| c.start > now && is_free(c, appointments))
}

/// Fallback when the owner configured no availability at all: tomorrow,
/// skipping weekends, at 10:00 or 14:00. Booking is never refused.
fn fabricate_slot(now: DateTime<Utc>, afternoon: bool) -> SlotCandidate {
    let mut date = now.date_naive() + Duration::days(1);
    while matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
        date += Duration::days(1);
    }
    let hour = if afternoon { 14 } else { 10 };
    let time = NaiveTime::from_hms_opt(hour, 0, 0).unwrap();
    SlotCandidate::at(Utc.from_utc_datetime(&date.and_time(time)))
}

/// Match a free-text day/time preference to a concrete slot. Always resolves.
pub fn resolve_preference(
    slots: &[AvailabilitySlot],
    appointments: &[Appointment],
    preference: &str,
    now: DateTime<Utc>,
) -> SlotCandidate {
    let later = wants_later(preference);

    if let Some(weekday) = parse_weekday(preference) {
        let date = next_weekday_date(now, weekday);
        if let Some(found) = first_free_for_date(slots, appointments, date, now, later) {
            return found;
        }
    }

    // forward scan for the first open slot anywhere in the horizon
    for offset in 0..HORIZON_DAYS {
        let date = (now + Duration::days(offset)).date_naive();
        if let Some(found) = first_free_for_date(slots, appointments, date, now, false) {
            return found;
        }
    }

    fabricate_slot(now, later)
}

// ============ Booking side effects ============

/// Result of the best-effort booking sequence.
#[derive(Debug, Clone)]
pub struct BookingOutcome {
    /// The appointment row landed; the booking is real.
    pub confirmed: bool,
    pub slot: SlotCandidate,
    /// Step names that failed, for the reconciliation log.
    pub failed_steps: Vec<&'static str>,
}

impl BookingOutcome {
    pub fn confirmation_sentence(&self) -> String {
        format!("You're booked for {}.", self.slot.label())
    }
}

/// Insert Appointment -> mirrored Booking -> confirmation SMS -> confirmation
/// email, then one outreach-log row recording the outcome. Deliberately not
/// transactional: each step's failure is logged and swallowed so a failed
/// email never undoes a successful booking. A failure in any downstream step
/// sets the pending-reconciliation marker on the log row.
pub async fn execute_booking(
    store: &dyn Store,
    twilio: &TwilioClient,
    email: &EmailClient,
    call: &CallRecord,
    lead: Option<&Lead>,
    preference: &str,
    slot: SlotCandidate,
    now: DateTime<Utc>,
) -> BookingOutcome {
    let mut failed_steps: Vec<&'static str> = Vec::new();

    let guest_name = call
        .respondent_name
        .clone()
        .or_else(|| lead.map(|l| l.name.clone()))
        .unwrap_or_else(|| "Phone caller".to_string());
    let guest_email = lead.map(|l| l.booking_email()).unwrap_or_else(|| {
        let d: String = call.phone.chars().filter(|c| c.is_ascii_digit()).collect();
        format!("caller-{d}@phone.invalid")
    });

    let appointment = Appointment {
        id: Uuid::new_v4(),
        user_id: call.user_id,
        lead_id: call.lead_id,
        title: format!("Call with {}", guest_name),
        start_at: slot.start,
        end_at: slot.end,
        status: AppointmentStatus::Scheduled,
        notes: Some(format!("Caller asked for: {}", preference)),
        created_at: now,
    };

    let mut confirmed = false;
    match store.insert_appointment(&appointment).await {
        Ok(()) => {
            confirmed = true;
            if let Err(e) = store.set_appointment(call.id, appointment.id).await {
                tracing::error!("Failed to link appointment to call {}: {}", call.id, e);
                failed_steps.push("link_appointment");
            }
        }
        Err(e) => {
            tracing::error!("Failed to insert appointment: {}", e);
            failed_steps.push("appointment");
        }
    }

    let booking = Booking {
        id: Uuid::new_v4(),
        user_id: call.user_id,
        guest_name: guest_name.clone(),
        guest_email: guest_email.clone(),
        guest_phone: Some(call.phone.clone()),
        scheduled_at: slot.start,
        duration_minutes: SLOT_MINUTES as i32,
        status: AppointmentStatus::Scheduled,
        notes: appointment.notes.clone(),
        created_at: now,
    };
    if let Err(e) = store.insert_booking(&booking).await {
        tracing::error!("Failed to insert mirrored booking: {}", e);
        failed_steps.push("booking");
    }

    let confirmation = format!(
        "Hi {}, your call is confirmed for {}. Reply here if you need to reschedule.",
        guest_name,
        slot.label()
    );
    if let Err(e) = twilio.send_sms(&call.phone, &confirmation).await {
        tracing::error!("Confirmation SMS failed: {}", e);
        failed_steps.push("sms");
    }
    if let Err(e) = email
        .send(&guest_email, "Your call is confirmed", &confirmation)
        .await
    {
        tracing::error!("Confirmation email failed: {}", e);
        failed_steps.push("email");
    }

    let detail = if failed_steps.is_empty() {
        format!("booked {} for {}", slot.label(), guest_name)
    } else {
        format!(
            "booked {} for {}; failed steps: {}",
            slot.label(),
            guest_name,
            failed_steps.join(", ")
        )
    };
    let entry = OutreachLog {
        id: Uuid::new_v4(),
        user_id: call.user_id,
        lead_id: call.lead_id,
        call_record_id: Some(call.id),
        kind: "booking".to_string(),
        detail,
        pending_reconciliation: !failed_steps.is_empty(),
        created_at: now,
    };
    if let Err(e) = store.insert_outreach(&entry).await {
        tracing::error!("Failed to write outreach log: {}", e);
    }

    BookingOutcome {
        confirmed,
        slot,
        failed_steps,
    }
}

/// Load availability and blocking appointments, then resolve the preference.
/// Any storage failure falls back to the fabricated slot so the caller is
/// never told booking is impossible.
pub async fn resolve_for_owner(
    store: &dyn Store,
    user_id: Uuid,
    preference: &str,
    now: DateTime<Utc>,
) -> Result<SlotCandidate, AppError> {
    let slots = store.weekly_slots(user_id).await?;
    let horizon_end = now + Duration::days(HORIZON_DAYS);
    let appointments = store.blocking_appointments(user_id, now, horizon_end).await?;
    Ok(resolve_preference(&slots, &appointments, preference, now))
}
