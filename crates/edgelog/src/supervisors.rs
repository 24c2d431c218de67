//! 🎬 *[camera pans across a bucket with two years of edge logs in it]*
//! 🎬 *[dramatic orchestral music swells]*
//! 🎬 "In a world where logs were written in tabs..."
//! 🎬 "One supervisor dared to reprocess them all."
//! 🎬 *[record scratch]* 🦆
//!
//! 📦 The Supervisor module: the bulk backfill orchestrator. Part middle manager,
//! part helicopter parent, part auditor with a clipboard.
//!
//! ```text
//!   KeyCursor ──▶ BatchCursor ──▶ bounded queue ──▶ DispatchWorker × N ──▶ Dispatcher
//!   (pages,        (strict order,   (backpressure)     (fire and forget)      (print | invoke)
//!    tokens)        on this task)                              │
//!                                                              ▼
//!                         BackfillSummary ◀── aggregate ◀── outcome channel
//! ```
//!
//! 🧠 Knowledge graph:
//! - Batches are built one at a time on the supervisor's own task, in listing order.
//!   Only dispatch is concurrent. Logs and dry-run output stay reproducible.
//! - Print mode forces a single worker, so dry-run lines come out in batch order.
//! - A dispatch failure is counted and reported, never fatal.
//! - A listing failure stops enumeration, lets the queued batches finish, logs
//!   the partial summary and returns the `Listing` error.
//!
//! ⚠️ WORKERS ARE THE SUPERVISOR'S PRIVATE LITTLE MINIONS. DO NOT MAKE THEM PUB.

use std::num::NonZeroUsize;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

pub mod batcher;
pub mod cursor;
pub mod dispatch;
mod workers;

pub use batcher::{Batch, BatchCursor, Batcher, batched};
pub use cursor::KeyCursor;
pub use dispatch::{Dispatcher, SharedWriter};

use crate::backends::KeyLister;
use crate::errors::EdgeLogError;
use crate::progress::BackfillProgress;
use workers::{DispatchOutcome, DispatchWorker, Worker};

/// 💀 A batch that bounced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedBatch {
    pub index: usize,
    pub first_key: Option<String>,
    pub error: String,
}

/// 🧾 The receipt for a backfill run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackfillSummary {
    pub keys_listed: usize,
    pub pages_fetched: usize,
    pub batches_built: usize,
    pub batches_submitted: usize,
    /// 💀 sorted by batch index
    pub failed: Vec<FailedBatch>,
}

impl BackfillSummary {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// 🔧 How the supervisor manages its minions.
#[derive(Debug, Clone, Copy)]
pub struct SupervisorSettings {
    pub batch_size: NonZeroUsize,
    pub parallelism: usize,
    pub queue_capacity: usize,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            batch_size: NonZeroUsize::new(20).unwrap_or(NonZeroUsize::MIN),
            parallelism: 4,
            queue_capacity: 16,
        }
    }
}

/// 📦 The BackfillSupervisor: because even fire-and-forget needs someone keeping receipts.
#[derive(Debug)]
pub struct BackfillSupervisor {
    dispatcher: Arc<Dispatcher>,
    settings: SupervisorSettings,
    show_progress: bool,
}

impl BackfillSupervisor {
    pub fn new(dispatcher: Dispatcher, settings: SupervisorSettings) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            settings,
            show_progress: false,
        }
    }

    /// 📊 Draw a spinner on stderr while running.
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// 🧵 How many workers this run actually gets.
    pub fn effective_parallelism(&self) -> usize {
        if self.dispatcher.is_order_sensitive() {
            1
        } else {
            self.settings.parallelism.max(1)
        }
    }

    /// 🚀 Enumerate, batch, dispatch, aggregate.
    pub async fn run<L: KeyLister>(
        &self,
        keys: KeyCursor<L>,
    ) -> Result<BackfillSummary, EdgeLogError> {
        let the_source = format!("s3://{}/{}", keys.bucket(), keys.prefix());
        let the_parallelism = self.effective_parallelism();
        info!(
            "🚀 backfill of {the_source}: batches of {}, {the_parallelism} worker(s), dispatching to '{}'",
            self.settings.batch_size,
            self.dispatcher.function()
        );

        let mut progress = if self.show_progress {
            BackfillProgress::new(the_source.clone())
        } else {
            BackfillProgress::hidden(the_source.clone())
        };

        let (batch_tx, batch_rx) = async_channel::bounded::<Batch>(self.settings.queue_capacity.max(1));
        let (outcome_tx, outcome_rx) = async_channel::unbounded::<DispatchOutcome>();

        let the_workers: Vec<_> = (0..the_parallelism)
            .map(|id| {
                DispatchWorker::new(
                    id,
                    batch_rx.clone(),
                    outcome_tx.clone(),
                    Arc::clone(&self.dispatcher),
                )
                .start()
            })
            .collect();
        // -- 🔒 workers hold the only clones now; when they finish, the outcome stream ends
        drop(batch_rx);
        drop(outcome_tx);

        let mut batches = BatchCursor::new(keys, self.settings.batch_size);

        let produce = async {
            let mut built = 0usize;
            let the_error = loop {
                match batches.next_batch().await {
                    Ok(Some(batch)) => {
                        debug!(
                            "📦 batch #{}: {} key(s), first '{}'",
                            batch.index,
                            batch.len(),
                            batch.first_key().unwrap_or_default()
                        );
                        built += 1;
                        progress.update(batches.keys().keys_listed() as u64, built as u64);
                        if batch_tx.send(batch).await.is_err() {
                            // -- 💀 every worker is gone; the joins below will say why
                            break None;
                        }
                    }
                    Ok(None) => break None,
                    Err(e) => break Some(e),
                }
            };
            batch_tx.close();
            (built, the_error)
        };

        let aggregate = async {
            let mut submitted = 0usize;
            let mut failed = Vec::new();
            while let Ok(outcome) = outcome_rx.recv().await {
                match outcome.result {
                    Ok(()) => submitted += 1,
                    Err(e) => failed.push(FailedBatch {
                        index: outcome.index,
                        first_key: outcome.first_key,
                        error: error_chain(&e),
                    }),
                }
            }
            (submitted, failed)
        };

        let ((built, listing_error), (submitted, mut failed)) = tokio::join!(produce, aggregate);

        for handle in the_workers {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("💀 dispatch worker gave up: {e:#}"),
                Err(e) => error!("💀 dispatch worker panicked: {e}"),
            }
        }
        progress.finish();

        failed.sort_by_key(|f| f.index);
        let summary = BackfillSummary {
            keys_listed: batches.keys().keys_listed(),
            pages_fetched: batches.keys().pages_fetched(),
            batches_built: built,
            batches_submitted: submitted,
            failed,
        };

        match listing_error {
            Some(e) => {
                error!(
                    "💀 backfill of {the_source} aborted by a listing failure after {} batch(es): \
                     {} submitted, {} failed",
                    summary.batches_built,
                    summary.batches_submitted,
                    summary.failed.len()
                );
                Err(e)
            }
            None => {
                if summary.is_clean() {
                    info!(
                        "✅ backfill of {the_source} done: {} key(s), {} batch(es) submitted",
                        summary.keys_listed, summary.batches_submitted
                    );
                } else {
                    warn!(
                        "⚠️ backfill of {the_source} done with failures: {} submitted, {} failed",
                        summary.batches_submitted,
                        summary.failed.len()
                    );
                }
                Ok(summary)
            }
        }
    }
}

/// 🧅 "outer: inner: innermost", one line, for the summary table.
fn error_chain(error: &EdgeLogError) -> String {
    let mut the_text = error.to_string();
    let mut the_cause = std::error::Error::source(error);
    while let Some(cause) = the_cause {
        the_text.push_str(": ");
        the_text.push_str(&cause.to_string());
        the_cause = cause.source();
    }
    the_text
}
