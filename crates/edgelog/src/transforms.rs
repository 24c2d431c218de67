// ai
//! 🔄 Transforms: turning tab-separated edge logs into canonical JSON lines 🎭🚀
//!
//! 🎬 COLD OPEN - INT. LAMBDA SANDBOX - 512 MB OF /tmp AND A DREAM
//!
//! A gzip arrives. Inside: a `#Version` line, a `#Fields` line, and then
//! thousands of tab-separated rows that each describe one HTTP request in
//! thirty-three columns. Nobody wants to query tabs. Everybody wants JSON.
//!
//! This module is the reshaper:
//!
//! ```text
//!   bytes ──▶ TsvReader ──▶ row: Vec<String> ──▶ LogRecord::bind ──▶ canonical JSON + '\n'
//!              (quotes,        (skip empty and       (positional,       (sorted keys, compact,
//!               lines)          '#' comment rows)     short rows ok)     ASCII-escaped)
//! ```
//!
//! ## Knowledge Graph 🧠
//! - `RecordTransformer` is a zero-sized marker type, same spirit as the other
//!   transforms that came before it: no state, no config, just a function with a name.
//! - Single forward pass. One row in memory at a time. The caller owns both streams
//!   (and their compression, and their closing).
//! - Malformed rows are NOT errors. They get bound as far as they go and serialized
//!   as-is. Validation is a downstream hobby.
//! - The only errors are I/O errors from the streams we were handed.
//!
//! 🦆 The duck has reviewed the schema. The duck has no further comments.

use std::io::{self, BufRead, Write};

pub mod canonical_json;
pub mod record;
pub mod schema;
pub mod tsv;

pub use record::LogRecord;
pub use schema::{Field, SCHEMA};
pub use tsv::TsvReader;

/// 📊 What happened during one transform pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TransformStats {
    /// 📄 rows the TSV reader produced, including the ones we skipped
    pub rows_read: u64,
    /// 🧾 JSON lines written
    pub records_emitted: u64,
    /// 🙈 empty rows and `#` comment/header rows
    pub rows_skipped: u64,
}

/// 🔄 The record transformer. Zero-sized. Monomorphized. Unbothered.
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordTransformer;

impl RecordTransformer {
    /// 🚀 Stream `reader` into `writer`, one canonical JSON line per data row.
    ///
    /// The writer is flushed at the end but not closed; finishing a gzip
    /// encoder (or anything else) is the caller's business.
    pub fn transform<R, W>(&self, reader: R, mut writer: W) -> io::Result<TransformStats>
    where
        R: BufRead,
        W: Write,
    {
        let mut rows = TsvReader::new(reader);
        let mut row = Vec::with_capacity(SCHEMA.len());
        let mut stats = TransformStats::default();

        while rows.read_row(&mut row)? {
            stats.rows_read += 1;
            if is_skippable(&row) {
                stats.rows_skipped += 1;
                continue;
            }

            LogRecord::bind(row.drain(..)).write_canonical(&mut writer)?;
            writer.write_all(b"\n")?;
            stats.records_emitted += 1;
        }

        writer.flush()?;
        Ok(stats)
    }

    /// 🧵 The same pass as a lazy iterator of canonical lines (no trailing `\n`).
    pub fn lines<R: BufRead>(&self, reader: R) -> CanonicalLines<R> {
        CanonicalLines {
            rows: TsvReader::new(reader),
            row: Vec::with_capacity(SCHEMA.len()),
            done: false,
        }
    }
}

/// 🙈 Empty rows and rows whose first field starts with `#` (`#Version`, `#Fields`) carry no record.
fn is_skippable(row: &[String]) -> bool {
    row.first().is_none_or(|first| first.starts_with('#'))
}

/// 🧵 Lazy, single-pass, not restartable. Like a Tuesday.
///
/// The first I/O error is yielded once, then the iterator is exhausted.
#[derive(Debug)]
pub struct CanonicalLines<R> {
    rows: TsvReader<R>,
    row: Vec<String>,
    done: bool,
}

impl<R: BufRead> Iterator for CanonicalLines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let the_line = match self.rows.read_row(&mut self.row) {
                Err(e) => Err(e),
                Ok(false) => {
                    self.done = true;
                    return None;
                }
                Ok(true) if is_skippable(&self.row) => continue,
                Ok(true) => LogRecord::bind(self.row.drain(..)).to_canonical_string(),
            };
            if the_line.is_err() {
                self.done = true;
            }
            return Some(the_line);
        }
    }
}

impl<R: BufRead> std::iter::FusedIterator for CanonicalLines<R> {}
