//! 🎬 *[a channel fills with batches. a worker waits.]*
//! *[the clock on the wall reads 2:47am.]*
//!
//! 📡 The DispatchWorker: receives batches, dispatches batches, reports back.
//! It does not retry. It does not judge. One outcome per batch, success or not,
//! and a dispatch failure never stops it from taking the next batch.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_channel::{Receiver, Sender};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::Worker;
use crate::errors::EdgeLogError;
use crate::supervisors::batcher::Batch;
use crate::supervisors::dispatch::Dispatcher;

/// 🧾 What happened to one batch.
#[derive(Debug)]
pub(in crate::supervisors) struct DispatchOutcome {
    pub(in crate::supervisors) index: usize,
    pub(in crate::supervisors) first_key: Option<String>,
    pub(in crate::supervisors) result: Result<(), EdgeLogError>,
}

#[derive(Debug)]
pub(in crate::supervisors) struct DispatchWorker {
    id: usize,
    rx: Receiver<Batch>,
    outcomes: Sender<DispatchOutcome>,
    dispatcher: Arc<Dispatcher>,
}

impl DispatchWorker {
    pub(in crate::supervisors) fn new(
        id: usize,
        rx: Receiver<Batch>,
        outcomes: Sender<DispatchOutcome>,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        Self {
            id,
            rx,
            outcomes,
            dispatcher,
        }
    }
}

impl Worker for DispatchWorker {
    fn start(self) -> JoinHandle<Result<()>> {
        tokio::spawn(async move {
            debug!("📥 DispatchWorker #{} started draining the queue...", self.id);
            // -- 🏁 recv() errors only once the queue is empty and closed
            while let Ok(batch) = self.rx.recv().await {
                let result = self.dispatcher.dispatch(&batch).await;
                match &result {
                    Ok(()) => debug!(
                        "🚀 worker #{} dispatched batch #{} ({} key(s))",
                        self.id,
                        batch.index,
                        batch.len()
                    ),
                    Err(e) => warn!("⚠️ worker #{}: {e}", self.id),
                }

                self.outcomes
                    .send(DispatchOutcome {
                        index: batch.index,
                        first_key: batch.first_key().map(str::to_string),
                        result,
                    })
                    .await
                    .context("💀 DispatchWorker lost the outcome channel. The supervisor left the building.")?;
            }
            debug!("🏁 DispatchWorker #{}: queue closed. Shutting down.", self.id);
            Ok(())
        })
    }
}
