// ai
//! 📡 Dispatcher: what happens to a batch once it is built.
//!
//! Two modes, chosen per run:
//! - **Print** (dry run): write `<function>(<keys>)` as one line and touch nothing.
//!   This is what you run first, read carefully, and then pipe to `wc -l`.
//! - **Invoke**: wrap the keys in a [`TriggerEvent`] and fire it at the remote
//!   function asynchronously. No response body is read. No retries here; the
//!   invocation transport has its own.
//!
//! Both take `&self`, so one dispatcher can be shared by every worker behind an `Arc`.

use std::io::Write;
use std::sync::{Arc, Mutex};

use tracing::trace;

use super::batcher::Batch;
use crate::backends::{Invoker, InvokerBackend};
use crate::errors::EdgeLogError;
use crate::event::TriggerEvent;

/// 🖨️ Where dry-run lines go. Stdout in the CLI, a `Vec<u8>` in tests.
pub type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

/// 🖨️ Dry-run dispatcher.
pub struct PrintDispatcher {
    function: String,
    out: SharedWriter,
}

impl std::fmt::Debug for PrintDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // -- 🎭 `dyn Write` has no Debug, and nobody wants to see stdout's guts anyway
        f.debug_struct("PrintDispatcher")
            .field("function", &self.function)
            .finish()
    }
}

/// 📡 Real dispatcher: async invocation of the remote function.
#[derive(Debug)]
pub struct InvokeDispatcher {
    function: String,
    bucket: String,
    invoker: InvokerBackend,
}

/// 🎭 Print or invoke. Chosen once per run.
#[derive(Debug)]
pub enum Dispatcher {
    Print(PrintDispatcher),
    Invoke(InvokeDispatcher),
}

impl Dispatcher {
    pub fn print(function: impl Into<String>, out: SharedWriter) -> Self {
        Dispatcher::Print(PrintDispatcher {
            function: function.into(),
            out,
        })
    }

    /// 🖨️ Print to the process's stdout.
    pub fn print_to_stdout(function: impl Into<String>) -> Self {
        let the_stdout: Box<dyn Write + Send> = Box::new(std::io::stdout());
        Self::print(function, Arc::new(Mutex::new(the_stdout)))
    }

    pub fn invoke(
        function: impl Into<String>,
        bucket: impl Into<String>,
        invoker: InvokerBackend,
    ) -> Self {
        Dispatcher::Invoke(InvokeDispatcher {
            function: function.into(),
            bucket: bucket.into(),
            invoker,
        })
    }

    pub fn function(&self) -> &str {
        match self {
            Dispatcher::Print(p) => &p.function,
            Dispatcher::Invoke(i) => &i.function,
        }
    }

    /// 📏 Whether output order is observable. Dry-run lines must come out in batch order.
    pub fn is_order_sensitive(&self) -> bool {
        matches!(self, Dispatcher::Print(_))
    }

    /// 🚀 Send one batch on its way.
    pub async fn dispatch(&self, batch: &Batch) -> Result<(), EdgeLogError> {
        match self {
            Dispatcher::Print(p) => p.dispatch(batch),
            Dispatcher::Invoke(i) => i.dispatch(batch).await,
        }
    }
}

impl PrintDispatcher {
    fn dispatch(&self, batch: &Batch) -> Result<(), EdgeLogError> {
        let mut out = self
            .out
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        writeln!(out, "{}({:?})", self.function, batch.keys)?;
        out.flush()?;
        Ok(())
    }
}

impl InvokeDispatcher {
    async fn dispatch(&self, batch: &Batch) -> Result<(), EdgeLogError> {
        let the_payload = TriggerEvent::for_batch(&self.bucket, &batch.keys).to_payload()?;
        trace!(
            "📡 batch #{}: {} byte payload for '{}'",
            batch.index,
            the_payload.len(),
            self.function
        );
        self.invoker
            .invoke_async(&self.function, the_payload)
            .await
            .map_err(|e| EdgeLogError::Dispatch {
                batch_index: batch.index,
                function: self.function.clone(),
                source: e.into(),
            })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::backends::InMemoryInvoker;

    /// 🧪 A `Write` that lands in a buffer the test can still read afterwards.
    #[derive(Clone, Default)]
    pub(crate) struct Captured(pub(crate) Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        pub(crate) fn writer(&self) -> SharedWriter {
            let the_writer: Box<dyn Write + Send> = Box::new(self.clone());
            Arc::new(Mutex::new(the_writer))
        }

        pub(crate) fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap_or_else(|p| p.into_inner())).into_owned()
        }
    }

    fn the_batch() -> Batch {
        Batch {
            index: 3,
            keys: vec!["a.gz".to_string(), "b.gz".to_string()],
        }
    }

    #[tokio::test]
    async fn the_one_where_a_dry_run_prints_the_call_it_would_make() -> anyhow::Result<()> {
        let captured = Captured::default();
        let dispatcher = Dispatcher::print("edgelog-process", captured.writer());
        dispatcher.dispatch(&the_batch()).await?;
        assert_eq!(captured.text(), "edgelog-process([\"a.gz\", \"b.gz\"])\n");
        assert!(dispatcher.is_order_sensitive());
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_invoke_sends_the_trigger_event() -> anyhow::Result<()> {
        let invoker = InMemoryInvoker::new();
        let dispatcher = Dispatcher::invoke(
            "edgelog-process",
            "cdn-logs",
            InvokerBackend::InMemory(invoker.clone()),
        );
        dispatcher.dispatch(&the_batch()).await?;

        let calls = invoker.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "edgelog-process");
        assert_eq!(
            String::from_utf8(calls[0].1.clone())?,
            r#"{"Records":[{"s3":{"bucket":{"name":"cdn-logs"},"object":{"key":"a.gz"}}},{"s3":{"bucket":{"name":"cdn-logs"},"object":{"key":"b.gz"}}}]}"#
        );
        assert!(!dispatcher.is_order_sensitive());
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_a_refused_invoke_names_the_batch() {
        let invoker = InMemoryInvoker::new().failing_on_key("b.gz");
        let dispatcher =
            Dispatcher::invoke("fn", "cdn-logs", InvokerBackend::InMemory(invoker));
        match dispatcher.dispatch(&the_batch()).await {
            Err(EdgeLogError::Dispatch {
                batch_index,
                function,
                ..
            }) => {
                assert_eq!(batch_index, 3);
                assert_eq!(function, "fn");
            }
            other => panic!("💀 expected a Dispatch error, got {other:?}"),
        }
    }
}
