// ai
//! 💀 Errors: the typed ways edgelog can let you down.
//!
//! 🎬 *[a log object named `definitely-not-a-cloudfront-log.txt` walks into the pipeline]*
//! *[the key codec looks it up and down]* "You're not on the list."
//!
//! The library speaks `EdgeLogError` so callers can `match` on what went wrong.
//! The binaries wrap everything in `anyhow` and `.context(...)` on top, the same
//! way the CLI peels the onion of sadness one cause at a time.
//!
//! 🧠 Knowledge graph:
//! - `MalformedKey`: Key Codec said no. Fatal for that object only.
//! - `Listing`: enumeration collaborator failed. Fatal for the whole backfill.
//! - `Dispatch`: one batch could not be handed to the remote function. Counted, not thrown.
//! - `Storage`: get/put against the object store failed.
//! - Malformed log LINES are never errors. They get reshaped, best effort, and move on. 🦆

use thiserror::Error;

/// 📦 Boxed error for collaborator failures: AWS SDK errors, in-memory test failures, whatever.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// 💀 Everything that can go sideways inside edgelog, with enough context to debug at 3am
/// without opening the source.
#[derive(Debug, Error)]
pub enum EdgeLogError {
    /// 🏷️ The object name is not `<edge>.<YYYY-MM-DD-HH>.<token>.<ext>`.
    #[error("💀 malformed log object name '{name}': {reason}")]
    MalformedKey { name: String, reason: String },

    /// 📜 The listing collaborator gave up on us. The run stops here.
    #[error(
        "💀 listing s3://{bucket}/{prefix} failed after {pages_fetched} page(s) and {keys_listed} key(s)"
    )]
    Listing {
        bucket: String,
        prefix: String,
        pages_fetched: usize,
        keys_listed: usize,
        #[source]
        source: BoxError,
    },

    /// 📡 One batch bounced off the remote function. The other batches carry on.
    #[error("💀 dispatch of batch #{batch_index} to '{function}' failed")]
    Dispatch {
        batch_index: usize,
        function: String,
        #[source]
        source: BoxError,
    },

    /// 🪣 get/put against the blob store failed.
    #[error("💀 {operation} s3://{bucket}/{key} failed")]
    Storage {
        operation: &'static str,
        bucket: String,
        key: String,
        #[source]
        source: BoxError,
    },

    /// 🐘 The compressed output outgrew the scratch space we are allowed to use.
    #[error("💀 output for '{key}' is {size} bytes, over the {limit} byte limit")]
    OutputTooLarge { key: String, size: u64, limit: u64 },

    /// 📬 Some records of a triggering event failed. The rest were still attempted.
    #[error("💀 {} of {total} object(s) failed to process: {}", failed.len(), failed.join(", "))]
    EventFailed { failed: Vec<String>, total: usize },

    /// 🔧 The configuration parsed, but it makes no sense.
    #[error("💀 invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl EdgeLogError {
    /// 🏷️ Shorthand for the key codec, which has a lot of ways to say no.
    pub(crate) fn malformed_key(name: &str, reason: impl Into<String>) -> Self {
        Self::MalformedKey {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn the_one_where_listing_errors_keep_their_backstory() {
        let the_error = EdgeLogError::Listing {
            bucket: "cdn-logs".to_string(),
            prefix: "2020/".to_string(),
            pages_fetched: 2,
            keys_listed: 2000,
            source: "AccessDenied".into(),
        };

        let the_message = the_error.to_string();
        assert!(the_message.contains("s3://cdn-logs/2020/"));
        assert!(the_message.contains("2 page(s)"));
        assert_eq!(
            the_error.source().map(|s| s.to_string()),
            Some("AccessDenied".to_string())
        );
    }

    #[test]
    fn the_one_where_event_failures_name_names() {
        let the_error = EdgeLogError::EventFailed {
            failed: vec!["a.gz".to_string(), "b.gz".to_string()],
            total: 5,
        };
        assert_eq!(
            the_error.to_string(),
            "💀 2 of 5 object(s) failed to process: a.gz, b.gz"
        );
    }
}
