//! Persistence seam. Every webhook invocation is stateless; conversation
//! state round-trips through these narrow read/write interfaces on each turn.

use crate::errors::AppError;
use crate::models::{
    Appointment, AppointmentStatus, AvailabilitySlot, Booking, CallRecord, CallStatus, CallType,
    Lead, OutreachLog, TranscriptTurn,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

#[async_trait]
pub trait CallRecordStore: Send + Sync {
    async fn insert_call(&self, record: &CallRecord) -> Result<(), AppError>;
    async fn get_call(&self, id: Uuid) -> Result<Option<CallRecord>, AppError>;
    /// Most recent record for a phone number with the given status.
    async fn latest_call_by_phone_and_status(
        &self,
        phone: &str,
        status: CallStatus,
    ) -> Result<Option<CallRecord>, AppError>;
    /// Most recent record for a phone number with a nonzero quiz score.
    async fn latest_quiz_call_by_phone(&self, phone: &str)
        -> Result<Option<CallRecord>, AppError>;
    /// Most recent in-progress or completed record, any phone number. The
    /// recording callback is not keyed by call SID, so this is deliberately
    /// global; under concurrent calls the URL can land on the wrong record.
    async fn latest_active_call(&self) -> Result<Option<CallRecord>, AppError>;
    async fn update_transcript(
        &self,
        id: Uuid,
        transcript: &[TranscriptTurn],
    ) -> Result<(), AppError>;
    /// Applies the status only when the monotonic transition rule allows it;
    /// late or retried callbacks are ignored, not errors.
    async fn update_status(
        &self,
        id: Uuid,
        status: CallStatus,
        duration_secs: Option<i32>,
    ) -> Result<(), AppError>;
    async fn set_recording_url(&self, id: Uuid, url: &str) -> Result<(), AppError>;
    /// Correlates a reused pending record with the live call leg.
    async fn set_call_sid(&self, id: Uuid, call_sid: &str) -> Result<(), AppError>;
    async fn set_summary(&self, id: Uuid, summary: &str) -> Result<(), AppError>;
    async fn set_appointment(&self, id: Uuid, appointment_id: Uuid) -> Result<(), AppError>;
}

#[async_trait]
pub trait AvailabilityStore: Send + Sync {
    /// Recurring weekly windows for an owner. Read-only here.
    async fn weekly_slots(&self, user_id: Uuid) -> Result<Vec<AvailabilitySlot>, AppError>;
}

#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn insert_appointment(&self, appointment: &Appointment) -> Result<(), AppError>;
    /// Scheduled/confirmed appointments for an owner intersecting a window.
    async fn blocking_appointments(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, AppError>;
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn insert_booking(&self, booking: &Booking) -> Result<(), AppError>;
}

#[async_trait]
pub trait OutreachStore: Send + Sync {
    async fn insert_outreach(&self, entry: &OutreachLog) -> Result<(), AppError>;
}

#[async_trait]
pub trait LeadStore: Send + Sync {
    async fn get_lead(&self, id: Uuid) -> Result<Option<Lead>, AppError>;
    async fn find_lead_by_phone(&self, phone: &str) -> Result<Option<Lead>, AppError>;
}

/// Everything the orchestrator persists through, injected into handlers.
pub trait Store:
    CallRecordStore + AvailabilityStore + AppointmentStore + BookingStore + OutreachStore + LeadStore
{
}

impl<T> Store for T where
    T: CallRecordStore
        + AvailabilityStore
        + AppointmentStore
        + BookingStore
        + OutreachStore
        + LeadStore
{
}

// ============ Postgres implementation ============

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Flat row shape; enums and the transcript come back as text/jsonb and are
/// converted after the fetch.
#[derive(sqlx::FromRow)]
struct CallRecordRow {
    id: Uuid,
    user_id: Uuid,
    lead_id: Option<Uuid>,
    phone: String,
    call_type: String,
    status: String,
    respondent_name: Option<String>,
    quiz_score: Option<i32>,
    quiz_result: Option<String>,
    quiz_answers: Option<String>,
    transcript: serde_json::Value,
    summary: Option<String>,
    recording_url: Option<String>,
    duration_secs: Option<i32>,
    appointment_id: Option<Uuid>,
    call_sid: Option<String>,
    created_at: DateTime<Utc>,
}

impl CallRecordRow {
    fn into_record(self) -> Result<CallRecord, AppError> {
        let call_type: CallType = self
            .call_type
            .parse()
            .map_err(AppError::InternalError)?;
        let status: CallStatus = self.status.parse().map_err(AppError::InternalError)?;
        let transcript: Vec<TranscriptTurn> =
            serde_json::from_value(self.transcript).map_err(|e| {
                AppError::InternalError(format!("corrupt transcript for call {}: {}", self.id, e))
            })?;
        Ok(CallRecord {
            id: self.id,
            user_id: self.user_id,
            lead_id: self.lead_id,
            phone: self.phone,
            call_type,
            status,
            respondent_name: self.respondent_name,
            quiz_score: self.quiz_score,
            quiz_result: self.quiz_result,
            quiz_answers: self.quiz_answers,
            transcript,
            summary: self.summary,
            recording_url: self.recording_url,
            duration_secs: self.duration_secs,
            appointment_id: self.appointment_id,
            call_sid: self.call_sid,
            created_at: self.created_at,
        })
    }
}

const CALL_COLUMNS: &str = "id, user_id, lead_id, phone, call_type, status, respondent_name, \
     quiz_score, quiz_result, quiz_answers, transcript, summary, recording_url, duration_secs, \
     appointment_id, call_sid, created_at";

#[async_trait]
impl CallRecordStore for PgStore {
    async fn insert_call(&self, record: &CallRecord) -> Result<(), AppError> {
        let transcript = serde_json::to_value(&record.transcript)
            .map_err(|e| AppError::InternalError(format!("serialize transcript: {}", e)))?;
        sqlx::query(
            r#"
            INSERT INTO call_records
                (id, user_id, lead_id, phone, call_type, status, respondent_name,
                 quiz_score, quiz_result, quiz_answers, transcript, summary,
                 recording_url, duration_secs, appointment_id, call_sid, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(record.id)
        .bind(record.user_id)
        .bind(record.lead_id)
        .bind(&record.phone)
        .bind(record.call_type.to_string())
        .bind(record.status.as_str())
        .bind(&record.respondent_name)
        .bind(record.quiz_score)
        .bind(&record.quiz_result)
        .bind(&record.quiz_answers)
        .bind(transcript)
        .bind(&record.summary)
        .bind(&record.recording_url)
        .bind(record.duration_secs)
        .bind(record.appointment_id)
        .bind(&record.call_sid)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_call(&self, id: Uuid) -> Result<Option<CallRecord>, AppError> {
        let row = sqlx::query_as::<_, CallRecordRow>(&format!(
            "SELECT {CALL_COLUMNS} FROM call_records WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(CallRecordRow::into_record).transpose()
    }

    async fn latest_call_by_phone_and_status(
        &self,
        phone: &str,
        status: CallStatus,
    ) -> Result<Option<CallRecord>, AppError> {
        let row = sqlx::query_as::<_, CallRecordRow>(&format!(
            "SELECT {CALL_COLUMNS} FROM call_records
             WHERE phone = $1 AND status = $2
             ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(phone)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(CallRecordRow::into_record).transpose()
    }

    async fn latest_quiz_call_by_phone(
        &self,
        phone: &str,
    ) -> Result<Option<CallRecord>, AppError> {
        let row = sqlx::query_as::<_, CallRecordRow>(&format!(
            "SELECT {CALL_COLUMNS} FROM call_records
             WHERE phone = $1 AND quiz_score IS NOT NULL AND quiz_score > 0
             ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?;
        row.map(CallRecordRow::into_record).transpose()
    }

    async fn latest_active_call(&self) -> Result<Option<CallRecord>, AppError> {
        let row = sqlx::query_as::<_, CallRecordRow>(&format!(
            "SELECT {CALL_COLUMNS} FROM call_records
             WHERE status IN ('in-progress', 'completed')
             ORDER BY created_at DESC LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await?;
        row.map(CallRecordRow::into_record).transpose()
    }

    async fn update_transcript(
        &self,
        id: Uuid,
        transcript: &[TranscriptTurn],
    ) -> Result<(), AppError> {
        let value = serde_json::to_value(transcript)
            .map_err(|e| AppError::InternalError(format!("serialize transcript: {}", e)))?;
        sqlx::query("UPDATE call_records SET transcript = $2 WHERE id = $1")
            .bind(id)
            .bind(value)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: CallStatus,
        duration_secs: Option<i32>,
    ) -> Result<(), AppError> {
        let Some(current) = self.get_call(id).await? else {
            return Err(AppError::NotFound(format!("call record {id}")));
        };
        if !current.status.can_transition_to(status) {
            tracing::warn!(
                "Ignoring non-monotonic status transition {} -> {} for call {}",
                current.status,
                status,
                id
            );
            return Ok(());
        }
        sqlx::query(
            "UPDATE call_records SET status = $2, duration_secs = COALESCE($3, duration_secs)
             WHERE id = $1",
        )
        .bind(id)
        .bind(status.as_str())
        .bind(duration_secs)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_recording_url(&self, id: Uuid, url: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE call_records SET recording_url = $2 WHERE id = $1")
            .bind(id)
            .bind(url)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_call_sid(&self, id: Uuid, call_sid: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE call_records SET call_sid = $2 WHERE id = $1")
            .bind(id)
            .bind(call_sid)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_summary(&self, id: Uuid, summary: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE call_records SET summary = $2 WHERE id = $1")
            .bind(id)
            .bind(summary)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_appointment(&self, id: Uuid, appointment_id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE call_records SET appointment_id = $2 WHERE id = $1")
            .bind(id)
            .bind(appointment_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct AvailabilitySlotRow {
    id: Uuid,
    user_id: Uuid,
    day_of_week: i16,
    start_time: chrono::NaiveTime,
    end_time: chrono::NaiveTime,
}

#[async_trait]
impl AvailabilityStore for PgStore {
    async fn weekly_slots(&self, user_id: Uuid) -> Result<Vec<AvailabilitySlot>, AppError> {
        let rows = sqlx::query_as::<_, AvailabilitySlotRow>(
            "SELECT id, user_id, day_of_week, start_time, end_time
             FROM availability_slots WHERE user_id = $1
             ORDER BY day_of_week, start_time",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| AvailabilitySlot {
                id: r.id,
                user_id: r.user_id,
                day_of_week: r.day_of_week,
                start_time: r.start_time,
                end_time: r.end_time,
            })
            .collect())
    }
}

#[derive(sqlx::FromRow)]
struct AppointmentRow {
    id: Uuid,
    user_id: Uuid,
    lead_id: Option<Uuid>,
    title: String,
    start_at: DateTime<Utc>,
    end_at: DateTime<Utc>,
    status: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

#[async_trait]
impl AppointmentStore for PgStore {
    async fn insert_appointment(&self, appointment: &Appointment) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO appointments
                (id, user_id, lead_id, title, start_at, end_at, status, notes, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(appointment.id)
        .bind(appointment.user_id)
        .bind(appointment.lead_id)
        .bind(&appointment.title)
        .bind(appointment.start_at)
        .bind(appointment.end_at)
        .bind(appointment.status.as_str())
        .bind(&appointment.notes)
        .bind(appointment.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn blocking_appointments(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, AppError> {
        let rows = sqlx::query_as::<_, AppointmentRow>(
            "SELECT id, user_id, lead_id, title, start_at, end_at, status, notes, created_at
             FROM appointments
             WHERE user_id = $1 AND status IN ('scheduled', 'confirmed')
               AND start_at < $3 AND end_at > $2
             ORDER BY start_at",
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|r| {
                let status: AppointmentStatus =
                    r.status.parse().map_err(AppError::InternalError)?;
                Ok(Appointment {
                    id: r.id,
                    user_id: r.user_id,
                    lead_id: r.lead_id,
                    title: r.title,
                    start_at: r.start_at,
                    end_at: r.end_at,
                    status,
                    notes: r.notes,
                    created_at: r.created_at,
                })
            })
            .collect()
    }
}

#[async_trait]
impl BookingStore for PgStore {
    async fn insert_booking(&self, booking: &Booking) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO bookings
                (id, user_id, guest_name, guest_email, guest_phone, scheduled_at,
                 duration_minutes, status, notes, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(booking.id)
        .bind(booking.user_id)
        .bind(&booking.guest_name)
        .bind(&booking.guest_email)
        .bind(&booking.guest_phone)
        .bind(booking.scheduled_at)
        .bind(booking.duration_minutes)
        .bind(booking.status.as_str())
        .bind(&booking.notes)
        .bind(booking.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl OutreachStore for PgStore {
    async fn insert_outreach(&self, entry: &OutreachLog) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO outreach_log
                (id, user_id, lead_id, call_record_id, kind, detail,
                 pending_reconciliation, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.id)
        .bind(entry.user_id)
        .bind(entry.lead_id)
        .bind(entry.call_record_id)
        .bind(&entry.kind)
        .bind(&entry.detail)
        .bind(entry.pending_reconciliation)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct LeadRow {
    id: Uuid,
    user_id: Uuid,
    name: String,
    email: Option<String>,
    phone: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<LeadRow> for Lead {
    fn from(r: LeadRow) -> Self {
        Lead {
            id: r.id,
            user_id: r.user_id,
            name: r.name,
            email: r.email,
            phone: r.phone,
            created_at: r.created_at,
        }
    }
}

#[async_trait]
impl LeadStore for PgStore {
    async fn get_lead(&self, id: Uuid) -> Result<Option<Lead>, AppError> {
        let row = sqlx::query_as::<_, LeadRow>(
            "SELECT id, user_id, name, email, phone, created_at FROM leads WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Lead::from))
    }

    async fn find_lead_by_phone(&self, phone: &str) -> Result<Option<Lead>, AppError> {
        // Match on trailing digits so "+1 (555) 867-5309" finds "5558675309".
        let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
        let row = sqlx::query_as::<_, LeadRow>(
            "SELECT id, user_id, name, email, phone, created_at FROM leads
             WHERE regexp_replace(phone, '[^0-9]', '', 'g') LIKE '%' || $1
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(&digits)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Lead::from))
    }
}

// ============ In-memory implementation ============

pub mod memory {
    //! In-memory store backing the test suite. Same semantics as `PgStore`
    //! for ordering, status monotonicity, and phone matching.

    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MemoryStore {
        pub calls: Mutex<Vec<CallRecord>>,
        pub slots: Mutex<Vec<AvailabilitySlot>>,
        pub appointments: Mutex<Vec<Appointment>>,
        pub bookings: Mutex<Vec<Booking>>,
        pub outreach: Mutex<Vec<OutreachLog>>,
        pub leads: Mutex<Vec<Lead>>,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            Self::default()
        }
    }

    fn digits(s: &str) -> String {
        s.chars().filter(|c| c.is_ascii_digit()).collect()
    }

    #[async_trait]
    impl CallRecordStore for MemoryStore {
        async fn insert_call(&self, record: &CallRecord) -> Result<(), AppError> {
            self.calls.lock().unwrap().push(record.clone());
            Ok(())
        }

        async fn get_call(&self, id: Uuid) -> Result<Option<CallRecord>, AppError> {
            Ok(self
                .calls
                .lock()
                .unwrap()
                .iter()
                .find(|c| c.id == id)
                .cloned())
        }

        async fn latest_call_by_phone_and_status(
            &self,
            phone: &str,
            status: CallStatus,
        ) -> Result<Option<CallRecord>, AppError> {
            Ok(self
                .calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.phone == phone && c.status == status)
                .max_by_key(|c| c.created_at)
                .cloned())
        }

        async fn latest_quiz_call_by_phone(
            &self,
            phone: &str,
        ) -> Result<Option<CallRecord>, AppError> {
            Ok(self
                .calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.phone == phone && c.quiz_score.unwrap_or(0) > 0)
                .max_by_key(|c| c.created_at)
                .cloned())
        }

        async fn latest_active_call(&self) -> Result<Option<CallRecord>, AppError> {
            Ok(self
                .calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| {
                    matches!(c.status, CallStatus::InProgress | CallStatus::Completed)
                })
                .max_by_key(|c| c.created_at)
                .cloned())
        }

        async fn update_transcript(
            &self,
            id: Uuid,
            transcript: &[TranscriptTurn],
        ) -> Result<(), AppError> {
            let mut calls = self.calls.lock().unwrap();
            if let Some(call) = calls.iter_mut().find(|c| c.id == id) {
                call.transcript = transcript.to_vec();
            }
            Ok(())
        }

        async fn update_status(
            &self,
            id: Uuid,
            status: CallStatus,
            duration_secs: Option<i32>,
        ) -> Result<(), AppError> {
            let mut calls = self.calls.lock().unwrap();
            let Some(call) = calls.iter_mut().find(|c| c.id == id) else {
                return Err(AppError::NotFound(format!("call record {id}")));
            };
            if !call.status.can_transition_to(status) {
                return Ok(());
            }
            call.status = status;
            if duration_secs.is_some() {
                call.duration_secs = duration_secs;
            }
            Ok(())
        }

        async fn set_recording_url(&self, id: Uuid, url: &str) -> Result<(), AppError> {
            let mut calls = self.calls.lock().unwrap();
            if let Some(call) = calls.iter_mut().find(|c| c.id == id) {
                call.recording_url = Some(url.to_string());
            }
            Ok(())
        }

        async fn set_call_sid(&self, id: Uuid, call_sid: &str) -> Result<(), AppError> {
            let mut calls = self.calls.lock().unwrap();
            if let Some(call) = calls.iter_mut().find(|c| c.id == id) {
                call.call_sid = Some(call_sid.to_string());
            }
            Ok(())
        }

        async fn set_summary(&self, id: Uuid, summary: &str) -> Result<(), AppError> {
            let mut calls = self.calls.lock().unwrap();
            if let Some(call) = calls.iter_mut().find(|c| c.id == id) {
                call.summary = Some(summary.to_string());
            }
            Ok(())
        }

        async fn set_appointment(&self, id: Uuid, appointment_id: Uuid) -> Result<(), AppError> {
            let mut calls = self.calls.lock().unwrap();
            if let Some(call) = calls.iter_mut().find(|c| c.id == id) {
                call.appointment_id = Some(appointment_id);
            }
            Ok(())
        }
    }

    #[async_trait]
    impl AvailabilityStore for MemoryStore {
        async fn weekly_slots(&self, user_id: Uuid) -> Result<Vec<AvailabilitySlot>, AppError> {
            Ok(self
                .slots
                .lock()
                .unwrap()
                .iter()
                .filter(|s| s.user_id == user_id)
                .cloned()
                .collect())
        }
    }

    #[async_trait]
    impl AppointmentStore for MemoryStore {
        async fn insert_appointment(&self, appointment: &Appointment) -> Result<(), AppError> {
            self.appointments.lock().unwrap().push(appointment.clone());
            Ok(())
        }

        async fn blocking_appointments(
            &self,
            user_id: Uuid,
            from: DateTime<Utc>,
            to: DateTime<Utc>,
        ) -> Result<Vec<Appointment>, AppError> {
            Ok(self
                .appointments
                .lock()
                .unwrap()
                .iter()
                .filter(|a| {
                    a.user_id == user_id
                        && a.status.blocks_slot()
                        && a.start_at < to
                        && a.end_at > from
                })
                .cloned()
                .collect())
        }
    }

    #[async_trait]
    impl BookingStore for MemoryStore {
        async fn insert_booking(&self, booking: &Booking) -> Result<(), AppError> {
            self.bookings.lock().unwrap().push(booking.clone());
            Ok(())
        }
    }

    #[async_trait]
    impl OutreachStore for MemoryStore {
        async fn insert_outreach(&self, entry: &OutreachLog) -> Result<(), AppError> {
            self.outreach.lock().unwrap().push(entry.clone());
            Ok(())
        }
    }

    #[async_trait]
    impl LeadStore for MemoryStore {
        async fn get_lead(&self, id: Uuid) -> Result<Option<Lead>, AppError> {
            Ok(self
                .leads
                .lock()
                .unwrap()
                .iter()
                .find(|l| l.id == id)
                .cloned())
        }

        async fn find_lead_by_phone(&self, phone: &str) -> Result<Option<Lead>, AppError> {
            let needle = digits(phone);
            Ok(self
                .leads
                .lock()
                .unwrap()
                .iter()
                .filter(|l| {
                    l.phone
                        .as_deref()
                        .map(|p| {
                            let d = digits(p);
                            d.ends_with(&needle) || needle.ends_with(&d)
                        })
                        .unwrap_or(false)
                })
                .max_by_key(|l| l.created_at)
                .cloned())
        }
    }
}

pub use memory::MemoryStore;
