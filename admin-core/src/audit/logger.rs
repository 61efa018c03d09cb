//! Batched audit log writer
//!
//! `log` enqueues and returns; a spawned flush drains the queue in fixed-size
//! batches. A failed batch goes back to the head of the queue and the flush
//! stops until the next `log` call. After a clean flush a retention trim is
//! scheduled, at most one at a time.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use dogbar_client::{AuthBackend, TableStore};
use parking_lot::Mutex;
use shared::models::AuditEntry;
use tokio::sync::watch;

use crate::core::Config;

/// Flush state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushState {
    Idle,
    Flushing,
}

/// Trim state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimState {
    Idle,
    Scheduled,
}

/// Tunables for the audit logger
#[derive(Debug, Clone)]
pub struct AuditConfig {
    pub batch_size: usize,
    pub retention_days: i64,
    pub trim_delay: Duration,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            retention_days: 30,
            trim_delay: Duration::from_secs(2),
        }
    }
}

impl From<&Config> for AuditConfig {
    fn from(config: &Config) -> Self {
        Self {
            batch_size: config.audit_batch_size.max(1),
            retention_days: config.audit_retention_days,
            trim_delay: config.audit_trim_delay(),
        }
    }
}

/// Oldest timestamp kept; `None` when the window does not fit the calendar
fn retention_cutoff(retention_days: i64) -> Option<DateTime<Utc>> {
    let window = TimeDelta::try_days(retention_days)?;
    Utc::now().checked_sub_signed(window)
}

enum FlushOutcome {
    Drained { sent: usize },
    Failed,
}

struct Inner {
    auth: Arc<dyn AuthBackend>,
    tables: Arc<dyn TableStore>,
    config: AuditConfig,
    queue: Mutex<VecDeque<AuditEntry>>,
    flush: watch::Sender<FlushState>,
    trim: watch::Sender<TrimState>,
}

/// Audit logger handle; clones share one queue
#[derive(Clone)]
pub struct AuditLogger {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLogger")
            .field("queued", &self.inner.queue.lock().len())
            .field("flush", &*self.inner.flush.borrow())
            .field("trim", &*self.inner.trim.borrow())
            .finish()
    }
}

impl AuditLogger {
    pub fn new(
        auth: Arc<dyn AuthBackend>,
        tables: Arc<dyn TableStore>,
        config: AuditConfig,
    ) -> Self {
        let (flush, _) = watch::channel(FlushState::Idle);
        let (trim, _) = watch::channel(TrimState::Idle);
        Self {
            inner: Arc::new(Inner {
                auth,
                tables,
                config,
                queue: Mutex::new(VecDeque::new()),
                flush,
                trim,
            }),
        }
    }

    /// Record an action for the current actor
    ///
    /// The actor email comes from the stored session, `"unknown"` if there is
    /// none. Never fails; a flush is started in the background if idle.
    pub async fn log(&self, action: impl Into<String>, details: serde_json::Value) {
        let email = match self.inner.auth.get_session().await {
            Ok(session) => session.map(|s| s.user.email),
            Err(e) => {
                tracing::debug!(error = %e, "Audit actor unresolved");
                None
            }
        };
        self.enqueue(AuditEntry::new(action, email, details));
    }

    /// Queue a prepared entry and kick off a flush if none is running
    pub fn enqueue(&self, entry: AuditEntry) {
        tracing::debug!(action = %entry.action, actor = %entry.actor_email, "Audit entry queued");
        self.inner.queue.lock().push_back(entry);

        if self.try_begin_flush() {
            let this = self.clone();
            tokio::spawn(async move {
                this.run_flush(true).await;
            });
        }
    }

    /// Drain the queue now unless a flush is already in flight
    pub async fn flush_queue(&self) {
        if self.inner.queue.lock().is_empty() {
            return;
        }
        if self.try_begin_flush() {
            self.run_flush(true).await;
        }
    }

    fn try_begin_flush(&self) -> bool {
        self.inner.flush.send_if_modified(|state| {
            if *state == FlushState::Idle {
                *state = FlushState::Flushing;
                true
            } else {
                false
            }
        })
    }

    /// Caller must hold the `Flushing` state
    async fn run_flush(&self, trim_after: bool) {
        loop {
            let outcome = self.drain().await;
            self.inner.flush.send_replace(FlushState::Idle);

            match outcome {
                FlushOutcome::Failed => return,
                FlushOutcome::Drained { sent } => {
                    if trim_after && sent > 0 {
                        self.schedule_trim();
                    }
                }
            }

            // Entries that landed between the last drain and going idle
            if self.inner.queue.lock().is_empty() || !self.try_begin_flush() {
                return;
            }
        }
    }

    async fn drain(&self) -> FlushOutcome {
        let batch_size = self.inner.config.batch_size.max(1);
        let mut sent = 0;

        loop {
            let batch: Vec<AuditEntry> = {
                let mut queue = self.inner.queue.lock();
                let n = queue.len().min(batch_size);
                queue.drain(..n).collect()
            };
            if batch.is_empty() {
                return FlushOutcome::Drained { sent };
            }

            match self.inner.tables.insert_audit_logs(&batch).await {
                Ok(()) => {
                    sent += batch.len();
                    tracing::debug!(count = batch.len(), "Audit batch written");
                }
                Err(e) => {
                    tracing::error!(count = batch.len(), error = %e, "Failed to flush audit logs");
                    let mut queue = self.inner.queue.lock();
                    for entry in batch.into_iter().rev() {
                        queue.push_front(entry);
                    }
                    return FlushOutcome::Failed;
                }
            }
        }
    }

    /// Delete remote entries past retention after the trim delay
    pub fn schedule_trim(&self) {
        let claimed = self.inner.trim.send_if_modified(|state| {
            if *state == TrimState::Idle {
                *state = TrimState::Scheduled;
                true
            } else {
                false
            }
        });
        if !claimed {
            tracing::debug!("Audit trim already scheduled");
            return;
        }

        let this = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(this.inner.config.trim_delay).await;
            match retention_cutoff(this.inner.config.retention_days) {
                Some(cutoff) => match this.inner.tables.delete_audit_logs_before(cutoff).await {
                    Ok(()) => tracing::debug!(%cutoff, "Old audit logs trimmed"),
                    Err(e) => tracing::warn!(error = %e, "Failed to trim old audit logs"),
                },
                None => tracing::warn!(
                    retention_days = this.inner.config.retention_days,
                    "Audit retention out of range, trim skipped"
                ),
            }
            this.inner.trim.send_replace(TrimState::Idle);
        });
    }

    pub fn flush_state(&self) -> FlushState {
        *self.inner.flush.borrow()
    }

    pub fn trim_state(&self) -> TrimState {
        *self.inner.trim.borrow()
    }

    /// Snapshot of entries not yet written, head first
    pub fn pending(&self) -> Vec<AuditEntry> {
        self.inner.queue.lock().iter().cloned().collect()
    }

    pub fn pending_len(&self) -> usize {
        self.inner.queue.lock().len()
    }

    /// Resolves once no flush is in flight
    pub async fn wait_idle(&self) {
        let mut rx = self.inner.flush.subscribe();
        while *rx.borrow_and_update() != FlushState::Idle {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Final flush attempt; returns how many entries are stranded
    pub async fn shutdown(&self) -> usize {
        self.wait_idle().await;
        if self.pending_len() > 0 && self.try_begin_flush() {
            self.run_flush(false).await;
        }

        let stranded = self.pending_len();
        if stranded > 0 {
            tracing::warn!(stranded, "Audit logger shut down with unsent entries");
        } else {
            tracing::info!("Audit logger drained");
        }
        stranded
    }
}
