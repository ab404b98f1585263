//! # Journal Outbox Worker
//!
//! Drains the journal_outbox table and posts balanced journal entries.
//!
//! ## Posting Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Journal Outbox Worker Flow                           │
//! │                                                                         │
//! │  1. Poll:  SELECT * FROM journal_outbox                                 │
//! │            WHERE posted_at IS NULL AND skipped_at IS NULL               │
//! │            ORDER BY created_at LIMIT batch                              │
//! │                                                                         │
//! │  2. Load:  the transaction and the tenant's system accounts             │
//! │                                                                         │
//! │  3. Draft: sale_journal() / refund_journal() (balanced by               │
//! │            construction, validated anyway)                              │
//! │                                                                         │
//! │  4. Post:  header + lines + balance increments in one db transaction    │
//! │                                                                         │
//! │  5. Mark:  posted_at on success                                         │
//! │            attempts += 1 on transient failure (retried next tick)       │
//! │            skipped_at when unpostable or retries exhausted              │
//! │                                                                         │
//! │  TIMING:                                                                │
//! │  • Poll interval: 5 seconds (configurable)                              │
//! │  • Batch size: 50 entries (configurable)                                │
//! │  • Max attempts: 10 (then marked skipped)                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A tenant without seeded system accounts is unpostable, not a failure:
//! the entry is marked skipped immediately and checkout is never affected.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::EngineResult;
use kasir_core::journal::{refund_journal, sale_journal, JournalDraft, SystemAccounts};
use kasir_core::{JournalEntry, JournalEntryLine, JournalOutboxEntry, JournalSource};
use kasir_db::Database;

// =============================================================================
// Journal Outbox Worker
// =============================================================================

/// Background task that posts pending journals.
pub struct JournalOutboxWorker {
    db: Arc<Database>,
    config: EngineConfig,
    shutdown_rx: mpsc::Receiver<()>,
}

/// Handle for controlling the worker.
#[derive(Clone)]
pub struct JournalOutboxWorkerHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl JournalOutboxWorkerHandle {
    /// Triggers graceful shutdown.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

impl JournalOutboxWorker {
    /// Creates a new worker and its control handle.
    pub fn new(db: Arc<Database>, config: EngineConfig) -> (Self, JournalOutboxWorkerHandle) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let worker = JournalOutboxWorker {
            db,
            config,
            shutdown_rx,
        };

        (worker, JournalOutboxWorkerHandle { shutdown_tx })
    }

    /// Runs the worker loop. Spawn this as a background task.
    pub async fn run(mut self) {
        info!("Journal outbox worker starting");

        let mut interval = tokio::time::interval(self.config.outbox_poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.run_once().await {
                        error!(?e, "Outbox pass failed");
                    }
                }

                _ = self.shutdown_rx.recv() => {
                    info!("Journal outbox worker shutting down");
                    break;
                }
            }
        }

        info!("Journal outbox worker stopped");
    }

    /// Processes one batch of pending entries. Exposed so tests (and a
    /// shutdown drain) can run a pass synchronously.
    pub async fn run_once(&self) -> EngineResult<usize> {
        let entries = self
            .db
            .journal_outbox()
            .pending(self.config.outbox_batch_size)
            .await?;

        if entries.is_empty() {
            debug!("No pending outbox entries");
            return Ok(0);
        }

        info!(count = entries.len(), "Processing journal outbox batch");

        let mut posted = 0;
        for entry in entries {
            if entry.attempts >= self.config.outbox_max_attempts {
                warn!(
                    id = %entry.id,
                    transaction_id = %entry.transaction_id,
                    attempts = entry.attempts,
                    "Skipping entry that exceeded max posting attempts"
                );
                self.db
                    .journal_outbox()
                    .mark_skipped(&entry.id, "max posting attempts exceeded")
                    .await?;
                continue;
            }

            if self.post_entry(&entry).await? {
                posted += 1;
            }
        }

        Ok(posted)
    }

    /// Posts one outbox entry. Returns whether a journal was written.
    async fn post_entry(&self, entry: &JournalOutboxEntry) -> EngineResult<bool> {
        let draft = match self.build_draft(entry).await {
            Ok(Some(draft)) => draft,
            Ok(None) => {
                // Unpostable (missing accounts or zero-line entry): the
                // sale stands, only the automatic posting is dropped.
                self.db
                    .journal_outbox()
                    .mark_skipped(&entry.id, "system accounts not configured")
                    .await?;
                return Ok(false);
            }
            Err(e) => {
                let attempts = self
                    .db
                    .journal_outbox()
                    .mark_failed(&entry.id, &e.to_string())
                    .await?;
                warn!(
                    id = %entry.id,
                    attempts = attempts,
                    error = %e,
                    "Journal draft construction failed"
                );
                return Ok(false);
            }
        };

        if let Err(e) = draft.validate() {
            self.db
                .journal_outbox()
                .mark_skipped(&entry.id, &e.to_string())
                .await?;
            error!(id = %entry.id, error = %e, "Unbalanced draft, skipped");
            return Ok(false);
        }

        let (journal, lines) = materialize(&draft);
        match self.db.accounting().create_journal(&journal, &lines).await {
            Ok(()) => {
                self.db.journal_outbox().mark_posted(&entry.id).await?;
                debug!(
                    id = %entry.id,
                    entry_number = %journal.entry_number,
                    "Journal posted"
                );
                Ok(true)
            }
            Err(e) => {
                let attempts = self
                    .db
                    .journal_outbox()
                    .mark_failed(&entry.id, &e.to_string())
                    .await?;
                warn!(
                    id = %entry.id,
                    attempts = attempts,
                    error = %e,
                    "Journal posting failed, will retry"
                );
                Ok(false)
            }
        }
    }

    /// Loads the transaction and builds the draft for an entry.
    async fn build_draft(
        &self,
        entry: &JournalOutboxEntry,
    ) -> EngineResult<Option<JournalDraft>> {
        let transaction = self
            .db
            .transactions()
            .find_by_id(&entry.transaction_id)
            .await?
            .ok_or_else(|| {
                kasir_core::CoreError::TransactionNotFound(entry.transaction_id.clone())
            })?;

        let accounts = self
            .db
            .accounting()
            .accounts_by_tenant(&entry.tenant_id)
            .await?;
        let system = SystemAccounts::resolve(&accounts);

        let draft = match entry.source {
            JournalSource::PosRefund => refund_journal(&system, &transaction),
            _ => sale_journal(&system, &transaction),
        };

        Ok(draft)
    }
}

/// Turns a draft into the persistable header and lines.
fn materialize(draft: &JournalDraft) -> (JournalEntry, Vec<JournalEntryLine>) {
    let now = Utc::now();
    let entry_id = Uuid::new_v4().to_string();

    let entry = JournalEntry {
        id: entry_id.clone(),
        tenant_id: draft.tenant_id.clone(),
        outlet_id: draft.outlet_id.clone(),
        entry_number: draft.entry_number.clone(),
        entry_date: draft.entry_date,
        description: draft.description.clone(),
        source: draft.source,
        reference_type: Some("transaction".to_string()),
        reference_id: Some(draft.reference_id.clone()),
        total_debit: draft.total_debit(),
        total_credit: draft.total_credit(),
        created_at: now,
    };

    let lines = draft
        .lines
        .iter()
        .map(|line| JournalEntryLine {
            id: Uuid::new_v4().to_string(),
            journal_entry_id: entry_id.clone(),
            account_id: line.account_id.clone(),
            description: line.description.clone(),
            debit: line.debit,
            credit: line.credit,
            created_at: now,
        })
        .collect();

    (entry, lines)
}
