// ai
//! 🧾 LogRecord: one delivery-log line, bound to names.
//!
//! The fields are declared in lexicographic order of their JSON keys, so serde
//! writes them sorted without a map, a sort, or a second thought. Every column is
//! `Option<String>`: short rows leave the tail unset and the unset keys are simply
//! absent from the output. `date` and `time` never get a slot of their own; they
//! are folded into `datetime` by the binder.
//!
//! ⚠️ If you add a field, put it where `sort` would. The ordering test will tell on you.

use std::io;

use serde::{Deserialize, Serialize};

use super::canonical_json;
use super::schema::{Field, SCHEMA};

/// 🧾 A bound delivery-log record, ready to become one canonical JSON line.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub c_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub c_port: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cs_bytes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cs_cookie: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cs_host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cs_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cs_protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cs_protocol_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cs_referer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cs_uri_query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cs_uri_stem: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cs_user_agent: Option<String>,
    /// ⏰ `<date> <time>Z`, always present.
    pub datetime: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fle_encrypted_fields: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fle_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sc_bytes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sc_content_len: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sc_content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sc_range_end: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sc_range_start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sc_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssl_cipher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssl_protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_taken: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_to_first_byte: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_edge_detailed_result_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_edge_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_edge_request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_edge_response_result_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_edge_result_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_forwarded_for: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_host_header: Option<String>,
}

impl LogRecord {
    /// 🔗 Zip a row against [`SCHEMA`], positionally, up to the shorter of the two.
    ///
    /// Short rows leave trailing fields unset. Extra fields past the schema are dropped.
    /// A row without `date` or `time` still gets a `datetime`, built from empty strings.
    /// Nothing here can fail. The binder reshapes, it does not judge.
    pub fn bind<I>(fields: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut record = Self::default();
        let mut date = String::new();
        let mut time = String::new();

        for (field, value) in SCHEMA.iter().zip(fields) {
            let value = value.into();
            match field {
                Field::Date => date = value,
                Field::Time => time = value,
                other => {
                    if let Some(slot) = record.slot_mut(*other) {
                        *slot = Some(value);
                    }
                }
            }
        }

        record.datetime = format!("{date} {time}Z");
        record
    }

    /// 🔍 Read a column by schema field. `date`/`time` live inside `datetime`, so they read as `None`.
    pub fn get(&self, field: Field) -> Option<&str> {
        let slot = match field {
            Field::Date | Field::Time => return None,
            Field::XEdgeLocation => &self.x_edge_location,
            Field::ScBytes => &self.sc_bytes,
            Field::CIp => &self.c_ip,
            Field::CsMethod => &self.cs_method,
            Field::CsHost => &self.cs_host,
            Field::CsUriStem => &self.cs_uri_stem,
            Field::ScStatus => &self.sc_status,
            Field::CsReferer => &self.cs_referer,
            Field::CsUserAgent => &self.cs_user_agent,
            Field::CsUriQuery => &self.cs_uri_query,
            Field::CsCookie => &self.cs_cookie,
            Field::XEdgeResultType => &self.x_edge_result_type,
            Field::XEdgeRequestId => &self.x_edge_request_id,
            Field::XHostHeader => &self.x_host_header,
            Field::CsProtocol => &self.cs_protocol,
            Field::CsBytes => &self.cs_bytes,
            Field::TimeTaken => &self.time_taken,
            Field::XForwardedFor => &self.x_forwarded_for,
            Field::SslProtocol => &self.ssl_protocol,
            Field::SslCipher => &self.ssl_cipher,
            Field::XEdgeResponseResultType => &self.x_edge_response_result_type,
            Field::CsProtocolVersion => &self.cs_protocol_version,
            Field::FleStatus => &self.fle_status,
            Field::FleEncryptedFields => &self.fle_encrypted_fields,
            Field::CPort => &self.c_port,
            Field::TimeToFirstByte => &self.time_to_first_byte,
            Field::XEdgeDetailedResultType => &self.x_edge_detailed_result_type,
            Field::ScContentType => &self.sc_content_type,
            Field::ScContentLen => &self.sc_content_len,
            Field::ScRangeStart => &self.sc_range_start,
            Field::ScRangeEnd => &self.sc_range_end,
        };
        slot.as_deref()
    }

    fn slot_mut(&mut self, field: Field) -> Option<&mut Option<String>> {
        let slot = match field {
            Field::Date | Field::Time => return None,
            Field::XEdgeLocation => &mut self.x_edge_location,
            Field::ScBytes => &mut self.sc_bytes,
            Field::CIp => &mut self.c_ip,
            Field::CsMethod => &mut self.cs_method,
            Field::CsHost => &mut self.cs_host,
            Field::CsUriStem => &mut self.cs_uri_stem,
            Field::ScStatus => &mut self.sc_status,
            Field::CsReferer => &mut self.cs_referer,
            Field::CsUserAgent => &mut self.cs_user_agent,
            Field::CsUriQuery => &mut self.cs_uri_query,
            Field::CsCookie => &mut self.cs_cookie,
            Field::XEdgeResultType => &mut self.x_edge_result_type,
            Field::XEdgeRequestId => &mut self.x_edge_request_id,
            Field::XHostHeader => &mut self.x_host_header,
            Field::CsProtocol => &mut self.cs_protocol,
            Field::CsBytes => &mut self.cs_bytes,
            Field::TimeTaken => &mut self.time_taken,
            Field::XForwardedFor => &mut self.x_forwarded_for,
            Field::SslProtocol => &mut self.ssl_protocol,
            Field::SslCipher => &mut self.ssl_cipher,
            Field::XEdgeResponseResultType => &mut self.x_edge_response_result_type,
            Field::CsProtocolVersion => &mut self.cs_protocol_version,
            Field::FleStatus => &mut self.fle_status,
            Field::FleEncryptedFields => &mut self.fle_encrypted_fields,
            Field::CPort => &mut self.c_port,
            Field::TimeToFirstByte => &mut self.time_to_first_byte,
            Field::XEdgeDetailedResultType => &mut self.x_edge_detailed_result_type,
            Field::ScContentType => &mut self.sc_content_type,
            Field::ScContentLen => &mut self.sc_content_len,
            Field::ScRangeStart => &mut self.sc_range_start,
            Field::ScRangeEnd => &mut self.sc_range_end,
        };
        Some(slot)
    }

    /// 📝 Write the canonical single-line JSON form (no trailing newline).
    pub fn write_canonical<W: io::Write>(&self, writer: W) -> io::Result<()> {
        canonical_json::to_writer(writer, self).map_err(io::Error::from)
    }

    /// 📝 The canonical single-line JSON form, as a `String`.
    pub fn to_canonical_string(&self) -> io::Result<String> {
        let mut out = Vec::with_capacity(512);
        self.write_canonical(&mut out)?;
        String::from_utf8(out).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_row() -> Vec<String> {
        SCHEMA
            .iter()
            .map(|f| match f {
                Field::Date => "2020-07-16".to_string(),
                Field::Time => "13:05:47".to_string(),
                other => format!("v_{}", other.name()),
            })
            .collect()
    }

    #[test]
    fn the_one_where_a_full_row_fills_every_slot() {
        let record = LogRecord::bind(full_row());

        assert_eq!(record.datetime, "2020-07-16 13:05:47Z");
        for field in SCHEMA.iter().skip(2) {
            assert_eq!(
                record.get(*field),
                Some(format!("v_{}", field.name()).as_str()),
                "{} should be bound",
                field.name()
            );
        }
        assert_eq!(record.get(Field::Date), None);
        assert_eq!(record.get(Field::Time), None);
    }

    #[test]
    fn the_one_where_keys_come_out_sorted_and_date_time_vanish() {
        let line = LogRecord::bind(full_row()).to_canonical_string().expect("💀 a Vec never refuses a write");
        let parsed: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(&line).expect("💀 canonical output should be valid JSON");

        assert!(parsed.contains_key("datetime"));
        assert!(!parsed.contains_key("date"));
        assert!(!parsed.contains_key("time"));
        assert_eq!(parsed.len(), SCHEMA.len() - 1);

        // -- 📐 the key order in the TEXT must be sorted, not just the parsed map
        let mut positions: Vec<(usize, String)> = parsed
            .keys()
            .map(|k| {
                let needle = format!("\"{k}\":");
                (line.find(&needle).expect("key present in text"), k.clone())
            })
            .collect();
        positions.sort();
        let in_text_order: Vec<String> = positions.into_iter().map(|(_, k)| k).collect();
        let mut sorted = in_text_order.clone();
        sorted.sort();
        assert_eq!(in_text_order, sorted);

        assert!(!line.contains(": ") && !line.contains(", "), "compact separators only");
    }

    #[test]
    fn the_one_where_short_rows_leave_the_tail_unset() {
        let record = LogRecord::bind(["2020-07-16", "13:05:47", "SEA19-C1", "1024"]);
        assert_eq!(record.x_edge_location.as_deref(), Some("SEA19-C1"));
        assert_eq!(record.sc_bytes.as_deref(), Some("1024"));
        assert_eq!(record.c_ip, None);

        assert_eq!(
            record.to_canonical_string().expect("💀 a Vec never refuses a write"),
            r#"{"datetime":"2020-07-16 13:05:47Z","sc_bytes":"1024","x_edge_location":"SEA19-C1"}"#
        );
    }

    #[test]
    fn the_one_where_a_lonely_date_still_gets_a_datetime() {
        let record = LogRecord::bind(["garbage"]);
        assert_eq!(record.datetime, "garbage Z");
        assert_eq!(record.to_canonical_string().expect("💀 a Vec never refuses a write"), r#"{"datetime":"garbage Z"}"#);

        let nothing = LogRecord::bind(Vec::<String>::new());
        assert_eq!(nothing.datetime, " Z");
    }

    #[test]
    fn the_one_where_extra_columns_fall_off_the_end() {
        let mut row = full_row();
        row.push("a 34th column nobody asked for".to_string());
        let record = LogRecord::bind(row);
        assert!(!record.to_canonical_string().expect("💀 a Vec never refuses a write").contains("nobody asked for"));
    }

    #[test]
    fn the_one_where_the_string_form_matches_the_writer_form() -> io::Result<()> {
        let record = LogRecord::bind(["2020-07-16", "13:05:47", "café"]);
        let mut written = Vec::new();
        record.write_canonical(&mut written)?;
        let the_string = record.to_canonical_string()?;
        assert_eq!(the_string.as_bytes(), written.as_slice());
        assert!(the_string.contains(r#""x_edge_location":"caf\u00e9""#));
        Ok(())
    }
}
