//! Audit queue batching, failure recovery and retention trim

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use admin_core::audit::{AuditConfig, AuditLogger, FlushState, TrimState};
use chrono::Utc;
use common::{ADMIN_EMAIL, FakeAuth, FakeTables};
use serde_json::json;
use shared::models::AuditEntry;
use tokio::sync::Notify;

fn logger(auth: Arc<FakeAuth>, tables: &Arc<FakeTables>) -> AuditLogger {
    AuditLogger::new(auth, tables.clone(), AuditConfig::default())
}

async fn log_numbered(audit: &AuditLogger, range: std::ops::Range<i64>) {
    for n in range {
        audit.log("events.update", json!({ "n": n })).await;
    }
}

fn numbers(entries: &[AuditEntry]) -> Vec<i64> {
    entries
        .iter()
        .map(|e| e.details["n"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn test_flushes_in_batches_of_five() {
    let tables = FakeTables::new();
    let audit = logger(FakeAuth::signed_in(ADMIN_EMAIL), &tables);

    log_numbered(&audit, 0..7).await;
    assert_eq!(audit.flush_state(), FlushState::Flushing);
    audit.wait_idle().await;

    assert_eq!(tables.batch_sizes(), vec![5, 2]);
    assert_eq!(numbers(&tables.written()), (0..7).collect::<Vec<_>>());
    assert_eq!(tables.written()[0].actor_email, ADMIN_EMAIL);
    assert_eq!(audit.pending_len(), 0);
    assert_eq!(audit.flush_state(), FlushState::Idle);
}

#[tokio::test]
async fn test_missing_session_logs_unknown_actor() {
    let tables = FakeTables::new();
    let audit = logger(FakeAuth::signed_out(), &tables);

    audit.log("auth.logout", json!({})).await;
    audit.wait_idle().await;

    assert_eq!(tables.written()[0].actor_email, "unknown");
}

#[tokio::test]
async fn test_failed_batch_returns_to_head() {
    let tables = FakeTables::new();
    let gate = Arc::new(Notify::new());
    *tables.insert_gate.lock() = Some(gate.clone());
    let audit = logger(FakeAuth::signed_in(ADMIN_EMAIL), &tables);

    log_numbered(&audit, 0..5).await;
    tables.insert_entered.notified().await;

    // Arrive while the first batch is in flight
    log_numbered(&audit, 5..7).await;
    assert_eq!(tables.insert_calls.load(Ordering::SeqCst), 1);

    tables.inserts_fail.store(true, Ordering::SeqCst);
    gate.notify_one();
    audit.wait_idle().await;

    assert_eq!(numbers(&audit.pending()), (0..7).collect::<Vec<_>>());
    assert!(tables.written().is_empty());
    // No retry without new activity
    assert_eq!(tables.insert_calls.load(Ordering::SeqCst), 1);

    *tables.insert_gate.lock() = None;
    tables.inserts_fail.store(false, Ordering::SeqCst);
    audit.flush_queue().await;

    assert_eq!(tables.batch_sizes(), vec![5, 2]);
    assert_eq!(numbers(&tables.written()), (0..7).collect::<Vec<_>>());
    assert_eq!(audit.pending_len(), 0);
}

#[tokio::test]
async fn test_next_log_retries_failed_entries() {
    let tables = FakeTables::new();
    tables.inserts_fail.store(true, Ordering::SeqCst);
    let audit = logger(FakeAuth::signed_in(ADMIN_EMAIL), &tables);

    log_numbered(&audit, 0..2).await;
    audit.wait_idle().await;
    assert_eq!(audit.pending_len(), 2);

    tables.inserts_fail.store(false, Ordering::SeqCst);
    log_numbered(&audit, 2..3).await;
    audit.wait_idle().await;

    assert_eq!(numbers(&tables.written()), vec![0, 1, 2]);
}

#[tokio::test(start_paused = true)]
async fn test_trim_runs_once_after_delay() {
    let tables = FakeTables::new();
    let audit = logger(FakeAuth::signed_in(ADMIN_EMAIL), &tables);

    log_numbered(&audit, 0..7).await;
    audit.wait_idle().await;
    assert_eq!(audit.trim_state(), TrimState::Scheduled);

    audit.schedule_trim();
    log_numbered(&audit, 7..8).await;
    audit.wait_idle().await;
    assert!(tables.trims.lock().is_empty());

    tokio::time::sleep(Duration::from_secs(3)).await;

    let trims = tables.trims.lock().clone();
    assert_eq!(trims.len(), 1);
    let age = Utc::now() - trims[0];
    assert!(age >= chrono::Duration::days(30));
    assert!(age < chrono::Duration::days(30) + chrono::Duration::minutes(1));
    assert_eq!(audit.trim_state(), TrimState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_unrepresentable_retention_skips_trim_and_recovers() {
    let tables = FakeTables::new();
    let config = AuditConfig {
        retention_days: 1_000_000_000,
        ..AuditConfig::default()
    };
    let audit = AuditLogger::new(FakeAuth::signed_in(ADMIN_EMAIL), tables.clone(), config);

    log_numbered(&audit, 0..1).await;
    audit.wait_idle().await;
    assert_eq!(audit.trim_state(), TrimState::Scheduled);

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(audit.trim_state(), TrimState::Idle);
    assert!(tables.trims.lock().is_empty());

    // The guard was released, so the next flush can schedule again
    log_numbered(&audit, 1..2).await;
    audit.wait_idle().await;
    assert_eq!(audit.trim_state(), TrimState::Scheduled);

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(audit.trim_state(), TrimState::Idle);
    assert!(tables.trims.lock().is_empty());
    assert_eq!(tables.batch_sizes(), vec![1, 1]);
}

#[tokio::test]
async fn test_failed_flush_schedules_no_trim() {
    let tables = FakeTables::new();
    tables.inserts_fail.store(true, Ordering::SeqCst);
    let audit = logger(FakeAuth::signed_in(ADMIN_EMAIL), &tables);

    log_numbered(&audit, 0..1).await;
    audit.wait_idle().await;

    assert_eq!(audit.trim_state(), TrimState::Idle);
}

#[tokio::test]
async fn test_shutdown_reports_stranded_entries() {
    let tables = FakeTables::new();
    tables.inserts_fail.store(true, Ordering::SeqCst);
    let audit = logger(FakeAuth::signed_in(ADMIN_EMAIL), &tables);

    log_numbered(&audit, 0..3).await;
    assert_eq!(audit.shutdown().await, 3);

    tables.inserts_fail.store(false, Ordering::SeqCst);
    assert_eq!(audit.shutdown().await, 0);
    assert_eq!(numbers(&tables.written()), vec![0, 1, 2]);
}
