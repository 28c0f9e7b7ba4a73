use std::env;
use uuid::Uuid;

use chrono::{Duration, Utc};
use voice_call_api::models::{CallRecord, CallStatus, CallType, TranscriptTurn};
use voice_call_api::store::{CallRecordStore, PgStore};

/// Integration smoke test for the Postgres store.
/// Marked ignored to avoid running against production by accident; set
/// TEST_DATABASE_URL to run.
#[tokio::test]
#[ignore]
async fn call_record_round_trip_smoke_test() -> anyhow::Result<()> {
    let db_url = env::var("TEST_DATABASE_URL")
        .or_else(|_| env::var("DATABASE_URL"))
        .map_err(|_| anyhow::anyhow!("Set TEST_DATABASE_URL or DATABASE_URL to run this test"))?;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(2)
        .connect(&db_url)
        .await?;
    sqlx::raw_sql(include_str!("../migrations/001_init.sql"))
        .execute(&pool)
        .await?;
    let store = PgStore::new(pool);

    // Unique phone per run to avoid collisions with earlier runs.
    let phone = format!("+1555{:07}", Uuid::new_v4().as_u128() % 10_000_000);
    let record = CallRecord {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        lead_id: None,
        phone: phone.clone(),
        call_type: CallType::Inbound,
        status: CallStatus::InProgress,
        respondent_name: Some("Smoke Test".to_string()),
        quiz_score: Some(7),
        quiz_result: Some("warm".to_string()),
        quiz_answers: None,
        transcript: vec![TranscriptTurn::assistant("Hi there!")],
        summary: None,
        recording_url: None,
        duration_secs: None,
        appointment_id: None,
        call_sid: Some("CAsmoke".to_string()),
        created_at: Utc::now() - Duration::seconds(30),
    };

    store
        .insert_call(&record)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let loaded = store
        .get_call(record.id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .ok_or_else(|| anyhow::anyhow!("inserted record not found"))?;
    assert_eq!(loaded.phone, phone);
    assert_eq!(loaded.status, CallStatus::InProgress);
    assert_eq!(loaded.transcript.len(), 1);

    // transcript append round-trips through jsonb
    let mut transcript = loaded.transcript.clone();
    transcript.push(TranscriptTurn::user("hello"));
    store
        .update_transcript(record.id, &transcript)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    // terminal status sticks; a late in-progress callback is ignored
    store
        .update_status(record.id, CallStatus::Completed, Some(42))
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    store
        .update_status(record.id, CallStatus::InProgress, None)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let final_state = store
        .get_call(record.id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .unwrap();
    assert_eq!(final_state.status, CallStatus::Completed);
    assert_eq!(final_state.duration_secs, Some(42));
    assert_eq!(final_state.transcript.len(), 2);

    Ok(())
}
