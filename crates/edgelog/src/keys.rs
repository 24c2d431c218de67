// ai
//! 🗝️ Key Codec: reading the tea leaves of a CDN log object name.
//!
//! 🎬 COLD OPEN - EXT. S3 BUCKET - EVERY HOUR, ON THE HOUR
//!
//! An edge node somewhere finishes its shift and drops a gzip on the pile:
//! `E28YI0R0FWE4XB.2020-07-16-13.005547cc.gz`. Edge, hour, a random token so two
//! files from the same hour don't fight, and an extension nobody reads.
//!
//! This module parses that name into a [`SourceObjectKey`] and derives the
//! Hive-style destination key `date=2020-07-16/13_005547cc.json.gz`. Same input,
//! same output, every time. Re-runs overwrite, they never duplicate.
//!
//! 🧠 Knowledge graph:
//! - Leaf module. No I/O. No async. No feelings.
//! - `parse` strips any `prefix/` path segments, then demands exactly four `.` chunks.
//! - Date-hour is strictly `YYYY-MM-DD-HH` (13 chars), then chrono validates the calendar.
//! - The hour in the destination key is NOT zero padded. `7_token`, not `07_token`. 🦆

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, Timelike};

use crate::errors::EdgeLogError;

/// 🏷️ A parsed log object name: which edge, which hour, which random token.
///
/// Immutable once built. Lives just long enough to produce a destination key,
/// like a mayfly with a very specific job.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceObjectKey {
    edge: String,
    hour: NaiveDateTime,
    disambiguator: String,
}

impl SourceObjectKey {
    /// 🔍 Parse an object name, with or without a `directory/` prefix.
    ///
    /// 💀 Fails with [`EdgeLogError::MalformedKey`] when the basename does not split into
    /// exactly four `.` chunks, or the date-hour chunk is not a real `YYYY-MM-DD-HH`.
    /// No partial results. It's a yes or a no.
    pub fn parse(name: &str) -> Result<Self, EdgeLogError> {
        // -- 📂 basename: everything after the last '/', like os.path.basename but with more emoji
        let the_basename = name.rsplit('/').next().unwrap_or(name);

        let chunks: Vec<&str> = the_basename.split('.').collect();
        let [edge, date_hour, disambiguator, _extension] = chunks.as_slice() else {
            return Err(EdgeLogError::malformed_key(
                name,
                format!(
                    "expected 4 '.'-separated components, found {}",
                    chunks.len()
                ),
            ));
        };

        let hour = parse_date_hour(date_hour).map_err(|reason| {
            EdgeLogError::malformed_key(name, format!("date-hour '{date_hour}': {reason}"))
        })?;

        Ok(Self {
            edge: (*edge).to_string(),
            hour,
            disambiguator: (*disambiguator).to_string(),
        })
    }

    /// 🛰️ The edge node that wrote the log.
    pub fn edge(&self) -> &str {
        &self.edge
    }

    /// ⏰ The UTC hour the log covers, minutes and seconds always zero.
    pub fn hour(&self) -> NaiveDateTime {
        self.hour
    }

    /// 🎲 The random token that keeps same-hour objects apart.
    pub fn disambiguator(&self) -> &str {
        &self.disambiguator
    }

    /// 🎯 `date=<YYYY-MM-DD>/<hour>_<disambiguator>.json.gz`. Total. Pure. Boring on purpose.
    pub fn destination_key(&self) -> String {
        format!(
            "date={}/{}_{}.json.gz",
            self.hour.format("%Y-%m-%d"),
            self.hour.hour(),
            self.disambiguator
        )
    }
}

impl FromStr for SourceObjectKey {
    type Err = EdgeLogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SourceObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}",
            self.edge,
            self.hour.format("%Y-%m-%d-%H"),
            self.disambiguator
        )
    }
}

/// ⏰ `YYYY-MM-DD-HH`, exactly. chrono is generous about digit widths, we are not.
fn parse_date_hour(raw: &str) -> Result<NaiveDateTime, String> {
    let bytes = raw.as_bytes();
    let the_shape_is_right = bytes.len() == 13
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 | 10 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !the_shape_is_right {
        return Err("expected the shape YYYY-MM-DD-HH".to_string());
    }

    let date = NaiveDate::parse_from_str(&raw[..10], "%Y-%m-%d").map_err(|e| e.to_string())?;
    // -- 🔢 two ASCII digits, checked above, so this parse is a formality
    let hour: u32 = raw[11..].parse().map_err(|_| "hour is not a number".to_string())?;
    date.and_hms_opt(hour, 0, 0)
        .ok_or_else(|| format!("hour {hour} is out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const THE_CANONICAL_NAME: &str = "E28YI0R0FWE4XB.2020-07-16-13.005547cc.gz";

    #[test]
    fn the_one_where_a_real_cloudfront_name_parses() {
        let key = SourceObjectKey::parse(THE_CANONICAL_NAME).expect("💀 canonical name should parse");

        assert_eq!(key.edge(), "E28YI0R0FWE4XB");
        assert_eq!(
            key.hour(),
            NaiveDate::from_ymd_opt(2020, 7, 16)
                .and_then(|d| d.and_hms_opt(13, 0, 0))
                .expect("valid date")
        );
        assert_eq!(key.disambiguator(), "005547cc");
        assert_eq!(key.destination_key(), "date=2020-07-16/13_005547cc.json.gz");
    }

    #[test]
    fn the_one_where_directory_prefixes_are_shrugged_off() {
        let key = SourceObjectKey::parse("prefix/deeper/E28YI0R0FWE4XB.2020-07-16-13.005547cc.gz")
            .expect("💀 prefixed name should parse");
        assert_eq!(key.destination_key(), "date=2020-07-16/13_005547cc.json.gz");
    }

    #[test]
    fn the_one_where_single_digit_hours_stay_unpadded() {
        let key = SourceObjectKey::parse("EDGE.2021-01-02-07.abc.gz").expect("💀 should parse");
        assert_eq!(key.destination_key(), "date=2021-01-02/7_abc.json.gz");

        let midnight = SourceObjectKey::parse("EDGE.2021-01-02-00.abc.gz").expect("💀 should parse");
        assert_eq!(midnight.destination_key(), "date=2021-01-02/0_abc.json.gz");

        let late = SourceObjectKey::parse("EDGE.2021-12-31-23.abc.gz").expect("💀 should parse");
        assert_eq!(late.destination_key(), "date=2021-12-31/23_abc.json.gz");
    }

    #[test]
    fn the_one_where_deriving_twice_changes_nothing() {
        let first = SourceObjectKey::parse(THE_CANONICAL_NAME).expect("💀 should parse");
        let second = SourceObjectKey::parse(THE_CANONICAL_NAME).expect("💀 should parse");
        assert_eq!(first, second);
        assert_eq!(first.destination_key(), second.destination_key());
        assert_eq!(first.destination_key(), first.destination_key());
    }

    #[test]
    fn the_one_where_the_wrong_number_of_dots_gets_bounced() {
        for the_impostor in [
            "E28YI0R0FWE4XB.2020-07-16-13.gz",
            "E28YI0R0FWE4XB.2020-07-16-13.005547cc.log.gz",
            "no-dots-at-all",
            "",
            "prefix/",
        ] {
            let the_verdict = SourceObjectKey::parse(the_impostor);
            assert!(
                matches!(the_verdict, Err(EdgeLogError::MalformedKey { ref name, .. }) if name == the_impostor),
                "'{the_impostor}' should be rejected as malformed, got {the_verdict:?}"
            );
        }
    }

    #[test]
    fn the_one_where_bogus_dates_never_make_it_past_the_door() {
        for the_impostor in [
            "E.2020-7-16-13.tok.gz",   // -- 📏 short month
            "E.2020-07-16-1.tok.gz",   // -- 📏 short hour
            "E.2020-07-16-24.tok.gz",  // -- ⏰ no 24th hour, even in prod
            "E.2020-02-30-10.tok.gz",  // -- 📅 February 30th, the day bugs are born
            "E.2020-13-01-10.tok.gz",  // -- 📅 month 13
            "E.20a0-07-16-13.tok.gz",  // -- 🔢 not digits
            "E.2020/07/16/13.tok.gz",  // -- ➗ wrong separators
            "E.2020-07-16T13.tok.gz",
        ] {
            assert!(
                matches!(
                    SourceObjectKey::parse(the_impostor),
                    Err(EdgeLogError::MalformedKey { .. })
                ),
                "'{the_impostor}' should be rejected"
            );
        }
    }

    #[test]
    fn the_one_where_display_and_from_str_agree() {
        let key: SourceObjectKey = THE_CANONICAL_NAME.parse().expect("💀 should parse");
        assert_eq!(key.to_string(), "E28YI0R0FWE4XB.2020-07-16-13.005547cc");
    }
}
