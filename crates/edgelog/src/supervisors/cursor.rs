// ai
//! 📜 KeyCursor: every key under a prefix, exactly once, in listing order.
//!
//! 🎬 *[the bucket has 31,337,042 objects. the listing API returns 1000 at a time.]*
//! *[somewhere between page 4,211 and page 4,212, a continuation token changes hands.]*
//! *[if we drop it, a day of logs never gets reprocessed. nobody notices for six months.]*
//!
//! An explicit cursor instead of a generator: one page buffer, one token, two
//! counters. The next page is fetched only when the buffer runs dry AND the last
//! response said there is more. An empty page that still carries a token is
//! followed, not mistaken for the end. Once the listing fails the cursor is done
//! for good; asking again returns `None` so nothing is yielded twice.

use std::collections::VecDeque;

use futures::Stream;
use tracing::{debug, trace};

use crate::backends::KeyLister;
use crate::errors::EdgeLogError;

/// 📏 Page size the listing API tops out at.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorState {
    // -- 🚀 nothing fetched yet
    Fresh,
    // -- 🔗 the last page came with a token
    More,
    // -- 🏁 the last page came without one, or the listing failed
    Done,
}

/// 📜 Pull-based enumeration over a [`KeyLister`].
#[derive(Debug)]
pub struct KeyCursor<L> {
    lister: L,
    bucket: String,
    prefix: String,
    page_size: usize,
    buffer: VecDeque<String>,
    token: Option<String>,
    state: CursorState,
    pages_fetched: usize,
    keys_listed: usize,
}

impl<L: KeyLister> KeyCursor<L> {
    pub fn new(lister: L, bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            lister,
            bucket: bucket.into(),
            prefix: prefix.into(),
            page_size: DEFAULT_PAGE_SIZE,
            buffer: VecDeque::new(),
            token: None,
            state: CursorState::Fresh,
            pages_fetched: 0,
            keys_listed: 0,
        }
    }

    /// 📏 Ask for pages of this size. The collaborator may still return fewer.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// 🔑 The next key, `Ok(None)` once the listing is exhausted.
    pub async fn next(&mut self) -> Result<Option<String>, EdgeLogError> {
        loop {
            if let Some(key) = self.buffer.pop_front() {
                return Ok(Some(key));
            }
            if self.state == CursorState::Done {
                return Ok(None);
            }

            let the_page = self
                .lister
                .list_page(
                    &self.bucket,
                    &self.prefix,
                    self.page_size,
                    self.token.as_deref(),
                )
                .await;

            let the_page = match the_page {
                Ok(page) => page,
                Err(e) => {
                    self.state = CursorState::Done;
                    return Err(EdgeLogError::Listing {
                        bucket: self.bucket.clone(),
                        prefix: self.prefix.clone(),
                        pages_fetched: self.pages_fetched,
                        keys_listed: self.keys_listed,
                        source: e.into(),
                    });
                }
            };

            self.pages_fetched += 1;
            self.keys_listed += the_page.keys.len();
            debug!(
                "📄 page {} of s3://{}/{}: {} key(s)",
                self.pages_fetched,
                self.bucket,
                self.prefix,
                the_page.keys.len()
            );

            self.buffer.extend(the_page.keys);
            self.token = the_page.next_token;
            self.state = if self.token.is_some() {
                CursorState::More
            } else {
                CursorState::Done
            };
            if self.state == CursorState::More && self.buffer.is_empty() {
                trace!("📭 empty page with a continuation token, following it");
            }
        }
    }

    /// 🌊 The same enumeration as a `Stream`. Ends after the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<String, EdgeLogError>> {
        futures::stream::unfold(self, |mut cursor| async move {
            match cursor.next().await {
                Ok(Some(key)) => Some((Ok(key), cursor)),
                Ok(None) => None,
                Err(e) => Some((Err(e), cursor)),
            }
        })
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// 📊 Keys received from the collaborator so far (buffered ones included).
    pub fn keys_listed(&self) -> usize {
        self.keys_listed
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}
