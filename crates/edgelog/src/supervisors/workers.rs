//! 🧵 Workers: the ones who actually dispatch batches while the Supervisor takes
//! all the credit in the sprint retro.
//!
//! ⚠️ Private to the supervisor. Nobody outside `supervisors` builds a worker.

use anyhow::Result;
use tokio::task::JoinHandle;

mod dispatch_worker;
pub(super) use dispatch_worker::{DispatchOutcome, DispatchWorker};

/// 🏗️ A background worker, that does work. duh.
///
/// "What's the DEAL with lifetime annotations? You borrow something,
///  you give it back. It's not that hard, Jerry!" (Seinfeld, on Rust)
pub(super) trait Worker {
    /// 🚀 Start the worker. Returns a JoinHandle because we trust but verify.
    fn start(self) -> JoinHandle<Result<()>>;
}
