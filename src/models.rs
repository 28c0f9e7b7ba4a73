use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============ Call records ============

/// Role of a transcript turn, OpenAI chat convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    Assistant,
    User,
}

/// One ordered turn of a phone conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptTurn {
    pub role: TurnRole,
    pub content: String,
}

impl TranscriptTurn {
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallType {
    Inbound,
    Outbound,
    Callback,
}

impl fmt::Display for CallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CallType::Inbound => "inbound",
            CallType::Outbound => "outbound",
            CallType::Callback => "callback",
        };
        f.write_str(s)
    }
}

impl FromStr for CallType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inbound" => Ok(CallType::Inbound),
            "outbound" => Ok(CallType::Outbound),
            "callback" => Ok(CallType::Callback),
            other => Err(format!("unknown call type '{other}'")),
        }
    }
}

/// Call lifecycle status. Wire values mix snake and kebab case because the
/// terminal ones come straight from the telephony provider's `CallStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallStatus {
    #[serde(rename = "awaiting_callback")]
    AwaitingCallback,
    #[serde(rename = "in-progress")]
    InProgress,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "busy")]
    Busy,
    #[serde(rename = "no-answer")]
    NoAnswer,
    #[serde(rename = "failed")]
    Failed,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::AwaitingCallback => "awaiting_callback",
            CallStatus::InProgress => "in-progress",
            CallStatus::Completed => "completed",
            CallStatus::Busy => "busy",
            CallStatus::NoAnswer => "no-answer",
            CallStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CallStatus::Completed | CallStatus::Busy | CallStatus::NoAnswer | CallStatus::Failed
        )
    }

    /// Ordering rank for the monotonic pending -> in-progress -> terminal rule.
    fn rank(&self) -> u8 {
        match self {
            CallStatus::AwaitingCallback => 0,
            CallStatus::InProgress => 1,
            _ => 2,
        }
    }

    /// Status transitions only move forward; a terminal status never reverts
    /// to in-progress on a late or retried callback.
    pub fn can_transition_to(&self, next: CallStatus) -> bool {
        next.rank() >= self.rank() && !(self.is_terminal() && !next.is_terminal())
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CallStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "awaiting_callback" => Ok(CallStatus::AwaitingCallback),
            "in-progress" => Ok(CallStatus::InProgress),
            "completed" => Ok(CallStatus::Completed),
            "busy" => Ok(CallStatus::Busy),
            "no-answer" => Ok(CallStatus::NoAnswer),
            "failed" => Ok(CallStatus::Failed),
            other => Err(format!("unknown call status '{other}'")),
        }
    }
}

/// One row per phone conversation. Audit record: updated on every gather turn
/// and on the final status callback, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRecord {
    pub id: Uuid,
    /// Owner whose availability and calendar the call books against.
    pub user_id: Uuid,
    pub lead_id: Option<Uuid>,
    pub phone: String,
    pub call_type: CallType,
    pub status: CallStatus,
    pub respondent_name: Option<String>,
    pub quiz_score: Option<i32>,
    pub quiz_result: Option<String>,
    /// Verbatim quiz answers summary text, embedded in the system prompt.
    pub quiz_answers: Option<String>,
    pub transcript: Vec<TranscriptTurn>,
    pub summary: Option<String>,
    pub recording_url: Option<String>,
    pub duration_secs: Option<i32>,
    pub appointment_id: Option<Uuid>,
    pub call_sid: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CallRecord {
    /// First name of the caller for prompt personalization.
    pub fn first_name(&self) -> &str {
        self.respondent_name
            .as_deref()
            .and_then(|n| n.split_whitespace().next())
            .unwrap_or("there")
    }
}

// ============ Availability & bookings ============

/// Owner-scoped recurring weekly window. Read-only input here; maintained by
/// the owning user elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    pub id: Uuid,
    pub user_id: Uuid,
    /// 0 = Sunday .. 6 = Saturday.
    pub day_of_week: i16,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Completed => "completed",
        }
    }

    /// Statuses that block a candidate slot.
    pub fn blocks_slot(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Scheduled | AppointmentStatus::Confirmed
        )
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(AppointmentStatus::Scheduled),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            "completed" => Ok(AppointmentStatus::Completed),
            other => Err(format!("unknown appointment status '{other}'")),
        }
    }
}

/// A concrete booked meeting on the owner's ops calendar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub lead_id: Option<Uuid>,
    pub title: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub status: AppointmentStatus,
    /// Free text recording the caller's stated preference.
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Calendar-facing mirror of an `Appointment`, 1:1, created in the same
/// best-effort sequence so the public booking view stays consistent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub guest_name: String,
    pub guest_email: String,
    pub guest_phone: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ============ Leads & outreach ============

/// External lead row, read-mostly here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Lead {
    /// Email used on the mirrored booking; placeholder when the lead has none.
    pub fn booking_email(&self) -> String {
        self.email.clone().unwrap_or_else(|| {
            let digits: String = self
                .phone
                .as_deref()
                .unwrap_or("unknown")
                .chars()
                .filter(|c| c.is_ascii_digit())
                .collect();
            format!("caller-{digits}@phone.invalid")
        })
    }
}

/// Outcome record for each booking/notification sequence. Carries the
/// reconciliation marker when a downstream step failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutreachLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub lead_id: Option<Uuid>,
    pub call_record_id: Option<Uuid>,
    pub kind: String,
    pub detail: String,
    pub pending_reconciliation: bool,
    pub created_at: DateTime<Utc>,
}
