//! # Previously, on edgelog...
//!
//! 🎬 The logs were trapped. Stranded in a bucket nobody could reach from a
//! unit test, like a traveler stuck in a connecting airport with no WiFi.
//! Someone had to fake the cloud. Someone had to write a bucket so simple it
//! lives entirely in RAM, gone the moment you blink.
//!
//! That someone was this module.
//!
//! `in_mem` provides an [`InMemoryBucket`] (lister + store over a `BTreeMap`)
//! and an [`InMemoryInvoker`] (records every payload it is handed). Both keep
//! their state behind an `Arc<Mutex<...>>` so a test can hold one clone and the
//! code under test another, then inspect what happened afterwards.
//!
//! Knobs for the unhappy paths:
//! - a page cap smaller than what the caller asks for (S3 does this too)
//! - empty pages that still carry a continuation token
//! - a listing that fails on the N-th page
//! - an invoker that refuses any batch containing a given key
//!
//! ⚠️ This is NOT for production. This is for tests and local dry runs.
//! ✅ No network calls. No credentials. No heartbeat. Just vibes and heap memory. 🦆

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;

use super::{Invoker, KeyLister, ListPage, ObjectReader, ObjectStore};
use crate::event::TriggerEvent;

// -- 🏷️ continuation token prefixes: `k:` resume after key, `e:` serve an empty page first
const RESUME: &str = "k:";
const EMPTY_FIRST: &str = "e:";

/// 🔒 Lock, and if a previous test thread panicked while holding it, take the data anyway.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Default)]
struct BucketState {
    // -- 📦 (bucket, key) → bytes, ordered like S3 lists them
    objects: BTreeMap<(String, String), Vec<u8>>,
    page_cap: Option<usize>,
    empty_pages_between: bool,
    fail_on_page: Option<usize>,
    fail_uploads: bool,
    pages_served: usize,
}

/// 🪣 The world's most agreeable object store.
#[derive(Debug, Default, Clone)]
pub struct InMemoryBucket {
    state: Arc<Mutex<BucketState>>,
}

impl InMemoryBucket {
    pub fn new() -> Self {
        Self::default()
    }

    /// 📦 Builder-style insert.
    pub fn with_object(self, bucket: &str, key: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(bucket, key, bytes);
        self
    }

    /// ✂️ Serve at most `cap` keys per page no matter how many the caller asks for.
    pub fn with_page_cap(self, cap: usize) -> Self {
        lock(&self.state).page_cap = Some(cap.max(1));
        self
    }

    /// 📭 After every non-final page, serve an empty page that still has a token.
    pub fn with_empty_pages_between(self) -> Self {
        lock(&self.state).empty_pages_between = true;
        self
    }

    /// 💀 Make the `page`-th listing call (1-based) fail.
    pub fn with_listing_failure_on_page(self, page: usize) -> Self {
        lock(&self.state).fail_on_page = Some(page);
        self
    }

    /// 💀 Refuse every upload, like a bucket policy written on a Friday.
    pub fn with_upload_failure(self) -> Self {
        lock(&self.state).fail_uploads = true;
        self
    }

    pub fn insert(&self, bucket: &str, key: &str, bytes: impl Into<Vec<u8>>) {
        lock(&self.state)
            .objects
            .insert((bucket.to_string(), key.to_string()), bytes.into());
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        lock(&self.state)
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// 📜 Every key in `bucket`, in listing order.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        lock(&self.state)
            .objects
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect()
    }

    /// 📊 How many listing calls have been answered (failed ones included).
    pub fn pages_served(&self) -> usize {
        lock(&self.state).pages_served
    }
}

#[async_trait]
impl KeyLister for InMemoryBucket {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        page_size: usize,
        token: Option<&str>,
    ) -> Result<ListPage> {
        let mut state = lock(&self.state);
        state.pages_served += 1;
        if state.fail_on_page == Some(state.pages_served) {
            bail!(
                "💀 AccessDenied: simulated listing failure on page {}",
                state.pages_served
            );
        }

        let the_resume_after = match token {
            None => None,
            Some(t) if t.starts_with(EMPTY_FIRST) => {
                return Ok(ListPage {
                    keys: Vec::new(),
                    next_token: Some(format!("{RESUME}{}", &t[EMPTY_FIRST.len()..])),
                });
            }
            Some(t) => Some(
                t.strip_prefix(RESUME)
                    .ok_or_else(|| anyhow!("💀 InvalidArgument: unknown continuation token '{t}'"))?
                    .to_string(),
            ),
        };

        let the_limit = state.page_cap.map_or(page_size, |cap| cap.min(page_size)).max(1);
        let mut the_candidates = state
            .objects
            .keys()
            .filter(|(b, k)| b == bucket && k.starts_with(prefix))
            .map(|(_, k)| k)
            .filter(|k| the_resume_after.as_deref().is_none_or(|after| k.as_str() > after));

        let keys: Vec<String> = the_candidates.by_ref().take(the_limit).cloned().collect();
        let more = the_candidates.next().is_some();

        let next_token = match keys.last() {
            Some(last) if more => {
                let the_marker = if state.empty_pages_between {
                    EMPTY_FIRST
                } else {
                    RESUME
                };
                Some(format!("{the_marker}{last}"))
            }
            _ => None,
        };
        Ok(ListPage { keys, next_token })
    }
}

#[async_trait]
impl ObjectStore for InMemoryBucket {
    async fn get(&self, bucket: &str, key: &str) -> Result<ObjectReader> {
        let the_bytes = self
            .object(bucket, key)
            .ok_or_else(|| anyhow!("💀 NoSuchKey: s3://{bucket}/{key} is not in the in-memory bucket"))?;
        Ok(Box::new(std::io::Cursor::new(the_bytes)))
    }

    async fn put_file(&self, bucket: &str, key: &str, path: &Path) -> Result<()> {
        if lock(&self.state).fail_uploads {
            bail!("💀 AccessDenied: simulated refusal to write s3://{bucket}/{key}");
        }
        let the_bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("💀 could not read '{}' for upload", path.display()))?;
        self.insert(bucket, key, the_bytes);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct InvokerState {
    calls: Vec<(String, Vec<u8>)>,
    poisoned_keys: HashSet<String>,
}

/// 📡 Records invocations instead of making them. Can be told to refuse some.
#[derive(Debug, Default, Clone)]
pub struct InMemoryInvoker {
    state: Arc<Mutex<InvokerState>>,
}

impl InMemoryInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 💀 Fail any invocation whose payload references `key`.
    pub fn failing_on_key(self, key: &str) -> Self {
        lock(&self.state).poisoned_keys.insert(key.to_string());
        self
    }

    /// 📜 Every attempted call as `(function, payload)`, in arrival order.
    pub fn calls(&self) -> Vec<(String, Vec<u8>)> {
        lock(&self.state).calls.clone()
    }

    /// 📨 Every attempted call's payload, decoded.
    pub fn events(&self) -> Result<Vec<TriggerEvent>> {
        lock(&self.state)
            .calls
            .iter()
            .map(|(_, payload)| {
                serde_json::from_slice(payload).context("💀 recorded payload is not a TriggerEvent")
            })
            .collect()
    }
}

#[async_trait]
impl Invoker for InMemoryInvoker {
    async fn invoke_async(&self, function: &str, payload: Vec<u8>) -> Result<()> {
        let the_event: TriggerEvent =
            serde_json::from_slice(&payload).context("💀 InvalidRequestContent: payload is not JSON")?;

        let mut state = lock(&self.state);
        state.calls.push((function.to_string(), payload));
        if let Some(bad) = the_event
            .records
            .iter()
            .find(|r| state.poisoned_keys.contains(r.key()))
        {
            bail!("💀 TooManyRequestsException: simulated throttle on batch containing '{}'", bad.key());
        }
        Ok(())
    }
}
