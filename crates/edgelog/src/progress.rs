// AI
//! 📊 progress.rs: "Are we there yet?" (every backfill, every time, forever.)
//!
//! 🚀 A spinner while the listing pages roll in and batches go out, and a table
//! so comfy it has lumbar support once the run is over. Nobody knows how many
//! objects are in the bucket until we've listed them all, so there is no bar
//! and no ETA. Just counters, a rate, and hope.
//!
//! ⚠️  Watching the spinner will not make it go faster. Science says no.
//!
//! 🦆 The duck has nothing to do with this module. It's just vibing.

use std::time::{Duration, Instant};

use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::NOTHING};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::supervisors::BackfillSummary;

/// 🔢 Formats a number with commas for the 3 people in the audience who like readability.
/// "1000000 keys" → "1,000,000 keys" (you're welcome, eyes.)
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    // -- 🧵 pre-allocate like we know what we're doing (we do, we read the book)
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

/// ⏱️ Formats a Duration into MM:SS or HH:MM:SS.
/// If it shows HH:MM:SS, you should probably call your mom. It's been a while.
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// 📊 Live counters for a backfill, drawn as a spinner on stderr.
///
/// Hidden automatically when stderr is not a terminal (CI logs, Lambda, pipes),
/// and always hidden in tests via [`BackfillProgress::hidden`].
pub struct BackfillProgress {
    /// 🏷️ `s3://bucket/prefix`, for the humans
    source_name: String,
    keys_listed: u64,
    batches_queued: u64,
    /// 🎨 indicatif does the heavy lifting here
    spinner: ProgressBar,
    start_time: Instant,
}

impl std::fmt::Debug for BackfillProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // -- 🎭 custom Debug impl because ProgressBar is a diva and doesn't derive Debug
        f.debug_struct("BackfillProgress")
            .field("source_name", &self.source_name)
            .field("keys_listed", &self.keys_listed)
            .field("batches_queued", &self.batches_queued)
            .finish()
    }
}

impl BackfillProgress {
    /// 🚀 Spinner on stderr. indicatif skips drawing when stderr isn't a TTY.
    pub fn new(source_name: String) -> Self {
        let spinner = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
        // -- 🐛 the template is hardcoded; if indicatif rejects it we keep the default style
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            spinner.set_style(style);
        }
        spinner.enable_steady_tick(Duration::from_millis(120));
        Self::with_bar(source_name, spinner)
    }

    /// 🙈 Counts, draws nothing.
    pub fn hidden(source_name: String) -> Self {
        Self::with_bar(source_name, ProgressBar::hidden())
    }

    fn with_bar(source_name: String, spinner: ProgressBar) -> Self {
        Self {
            source_name,
            keys_listed: 0,
            batches_queued: 0,
            spinner,
            start_time: Instant::now(),
        }
    }

    /// 🔄 Feed the spinner fresh totals after each batch is queued.
    pub fn update(&mut self, keys_listed: u64, batches_queued: u64) {
        self.keys_listed = keys_listed;
        self.batches_queued = batches_queued;

        let elapsed = self.start_time.elapsed();
        let the_rate = if elapsed.as_secs_f64() > 0.0 {
            keys_listed as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };
        self.spinner.set_message(format!(
            "{}: {} keys listed, {} batches queued, {} keys/s, {} elapsed",
            self.source_name,
            format_number(keys_listed),
            format_number(batches_queued),
            format_number(the_rate as u64),
            format_duration(elapsed)
        ));
    }

    /// ✅ Clear the spinner. The summary table takes it from here.
    pub fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

/// 🍽️ The end-of-run table: two columns, right-aligned values, no borders.
pub fn summary_table(summary: &BackfillSummary, elapsed: Duration) -> Table {
    let mut table = Table::new();
    table.load_preset(NOTHING);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let the_rows = [
        ("keys listed", format_number(summary.keys_listed as u64)),
        ("pages fetched", format_number(summary.pages_fetched as u64)),
        ("batches built", format_number(summary.batches_built as u64)),
        ("batches submitted", format_number(summary.batches_submitted as u64)),
        ("batches failed", format_number(summary.failed.len() as u64)),
        ("elapsed", format_duration(elapsed)),
    ];
    for (label, value) in the_rows {
        table.add_row(vec![
            Cell::new(label),
            Cell::new(value).set_alignment(CellAlignment::Right),
        ]);
    }

    // -- 💀 the first few failures get their own rows; the rest are in the logs
    for failed in summary.failed.iter().take(10) {
        table.add_row(vec![
            Cell::new(format!(
                "  #{} {}",
                failed.index,
                failed.first_key.as_deref().unwrap_or("-")
            )),
            Cell::new(&failed.error),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supervisors::FailedBatch;

    #[test]
    fn the_one_where_big_numbers_get_commas() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(31_337_042), "31,337,042");
    }

    #[test]
    fn the_one_where_long_runs_grow_an_hours_column() {
        assert_eq!(format_duration(Duration::from_secs(75)), "01:15");
        assert_eq!(format_duration(Duration::from_secs(3 * 3600 + 61)), "03:01:01");
    }

    #[test]
    fn the_one_where_the_summary_table_lists_failures() {
        let summary = BackfillSummary {
            keys_listed: 45,
            pages_fetched: 1,
            batches_built: 3,
            batches_submitted: 2,
            failed: vec![FailedBatch {
                index: 1,
                first_key: Some("E2ABC.2020-07-16-13.x.gz".to_string()),
                error: "throttled".to_string(),
            }],
        };
        let the_rendered = summary_table(&summary, Duration::from_secs(5)).to_string();
        assert!(the_rendered.contains("batches submitted"));
        assert!(the_rendered.contains("#1 E2ABC.2020-07-16-13.x.gz"));
        assert!(the_rendered.contains("throttled"));
    }

    #[test]
    fn the_one_where_a_hidden_spinner_still_counts() {
        let mut progress = BackfillProgress::hidden("s3://logs/".to_string());
        progress.update(1000, 50);
        progress.finish();
        assert_eq!(progress.keys_listed, 1000);
        assert_eq!(progress.batches_queued, 50);
    }
}
