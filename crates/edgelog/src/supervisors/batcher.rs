// ai
//! 📦 Batcher: chop an ordered key sequence into fixed-size batches.
//!
//! All batches hold exactly `size` keys except possibly the last, which holds
//! the remainder. Empty input makes zero batches, not one empty batch. Batches
//! are numbered from 0 in the order they are built, and that order is the
//! enumeration order, always. Two flavors: [`batched`] for any plain iterator,
//! [`BatchCursor`] for the async [`KeyCursor`]. 🦆

use std::num::NonZeroUsize;

use tracing::warn;

use super::cursor::KeyCursor;
use crate::backends::KeyLister;
use crate::errors::EdgeLogError;

/// 📦 One unit of dispatch. Owned, immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// 🔢 0-based position in the run
    pub index: usize,
    pub keys: Vec<String>,
}

impl Batch {
    pub fn first_key(&self) -> Option<&str> {
        self.keys.first().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// 🧵 Lazy batching over any iterator of keys.
pub fn batched<I>(keys: I, size: NonZeroUsize) -> Batcher<I::IntoIter>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    Batcher {
        inner: keys.into_iter(),
        size,
        next_index: 0,
    }
}

#[derive(Debug)]
pub struct Batcher<I> {
    inner: I,
    size: NonZeroUsize,
    next_index: usize,
}

impl<I> Iterator for Batcher<I>
where
    I: Iterator,
    I::Item: Into<String>,
{
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        let keys: Vec<String> = self
            .inner
            .by_ref()
            .take(self.size.get())
            .map(Into::into)
            .collect();
        if keys.is_empty() {
            return None;
        }
        let index = self.next_index;
        self.next_index += 1;
        Some(Batch { index, keys })
    }
}

/// 📦 The same batching, pulled from a [`KeyCursor`] one key at a time.
#[derive(Debug)]
pub struct BatchCursor<L> {
    keys: KeyCursor<L>,
    size: NonZeroUsize,
    next_index: usize,
}

impl<L: KeyLister> BatchCursor<L> {
    pub fn new(keys: KeyCursor<L>, size: NonZeroUsize) -> Self {
        Self {
            keys,
            size,
            next_index: 0,
        }
    }

    /// 📦 The next full (or final partial) batch, `Ok(None)` when the listing is exhausted.
    ///
    /// A listing error drops the half-built batch: none of its keys were handed
    /// out yet, so nothing gets dispatched twice on a re-run.
    pub async fn next_batch(&mut self) -> Result<Option<Batch>, EdgeLogError> {
        let mut keys = Vec::with_capacity(self.size.get());
        while keys.len() < self.size.get() {
            match self.keys.next().await {
                Ok(Some(key)) => keys.push(key),
                Ok(None) => break,
                Err(e) => {
                    if !keys.is_empty() {
                        warn!(
                            "⚠️ listing failed mid-batch: {} key(s) of batch #{} will not be dispatched",
                            keys.len(),
                            self.next_index
                        );
                    }
                    return Err(e);
                }
            }
        }

        if keys.is_empty() {
            return Ok(None);
        }
        let index = self.next_index;
        self.next_index += 1;
        Ok(Some(Batch { index, keys }))
    }

    /// 📜 The underlying cursor, for its counters.
    pub fn keys(&self) -> &KeyCursor<L> {
        &self.keys
    }
}
