// ai
//! 📋 The fixed field list. Thirty-three columns, in the order the edge writes them.
//!
//! The log header spells it out as `#Fields: date time x-edge-location sc-bytes ...`.
//! We hard-code it here (lowercased, `-` and `(` become `_`, `)` dropped) because
//! the schema does not change and parsing the header of every object to learn it
//! again would be a hobby, not a feature.

/// 🏷️ One column of the delivery log, by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Date,
    Time,
    XEdgeLocation,
    ScBytes,
    CIp,
    CsMethod,
    CsHost,
    CsUriStem,
    ScStatus,
    CsReferer,
    CsUserAgent,
    CsUriQuery,
    CsCookie,
    XEdgeResultType,
    XEdgeRequestId,
    XHostHeader,
    CsProtocol,
    CsBytes,
    TimeTaken,
    XForwardedFor,
    SslProtocol,
    SslCipher,
    XEdgeResponseResultType,
    CsProtocolVersion,
    FleStatus,
    FleEncryptedFields,
    CPort,
    TimeToFirstByte,
    XEdgeDetailedResultType,
    ScContentType,
    ScContentLen,
    ScRangeStart,
    ScRangeEnd,
}

/// 📐 Positional schema. Row field `i` binds to `SCHEMA[i]`. Order is the contract.
pub const SCHEMA: [Field; 33] = [
    Field::Date,
    Field::Time,
    Field::XEdgeLocation,
    Field::ScBytes,
    Field::CIp,
    Field::CsMethod,
    Field::CsHost,
    Field::CsUriStem,
    Field::ScStatus,
    Field::CsReferer,
    Field::CsUserAgent,
    Field::CsUriQuery,
    Field::CsCookie,
    Field::XEdgeResultType,
    Field::XEdgeRequestId,
    Field::XHostHeader,
    Field::CsProtocol,
    Field::CsBytes,
    Field::TimeTaken,
    Field::XForwardedFor,
    Field::SslProtocol,
    Field::SslCipher,
    Field::XEdgeResponseResultType,
    Field::CsProtocolVersion,
    Field::FleStatus,
    Field::FleEncryptedFields,
    Field::CPort,
    Field::TimeToFirstByte,
    Field::XEdgeDetailedResultType,
    Field::ScContentType,
    Field::ScContentLen,
    Field::ScRangeStart,
    Field::ScRangeEnd,
];

impl Field {
    /// 🏷️ The snake_case name used as the JSON key.
    pub const fn name(self) -> &'static str {
        match self {
            Field::Date => "date",
            Field::Time => "time",
            Field::XEdgeLocation => "x_edge_location",
            Field::ScBytes => "sc_bytes",
            Field::CIp => "c_ip",
            Field::CsMethod => "cs_method",
            Field::CsHost => "cs_host",
            Field::CsUriStem => "cs_uri_stem",
            Field::ScStatus => "sc_status",
            Field::CsReferer => "cs_referer",
            Field::CsUserAgent => "cs_user_agent",
            Field::CsUriQuery => "cs_uri_query",
            Field::CsCookie => "cs_cookie",
            Field::XEdgeResultType => "x_edge_result_type",
            Field::XEdgeRequestId => "x_edge_request_id",
            Field::XHostHeader => "x_host_header",
            Field::CsProtocol => "cs_protocol",
            Field::CsBytes => "cs_bytes",
            Field::TimeTaken => "time_taken",
            Field::XForwardedFor => "x_forwarded_for",
            Field::SslProtocol => "ssl_protocol",
            Field::SslCipher => "ssl_cipher",
            Field::XEdgeResponseResultType => "x_edge_response_result_type",
            Field::CsProtocolVersion => "cs_protocol_version",
            Field::FleStatus => "fle_status",
            Field::FleEncryptedFields => "fle_encrypted_fields",
            Field::CPort => "c_port",
            Field::TimeToFirstByte => "time_to_first_byte",
            Field::XEdgeDetailedResultType => "x_edge_detailed_result_type",
            Field::ScContentType => "sc_content_type",
            Field::ScContentLen => "sc_content_len",
            Field::ScRangeStart => "sc_range_start",
            Field::ScRangeEnd => "sc_range_end",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn the_one_where_the_schema_matches_the_log_header() {
        // 📜 straight from the `#Fields:` line, after the lowercase/underscore treatment
        let the_header = "date time x-edge-location sc-bytes c-ip cs-method cs(Host) cs-uri-stem \
            sc-status cs(Referer) cs(User-Agent) cs-uri-query cs(Cookie) x-edge-result-type \
            x-edge-request-id x-host-header cs-protocol cs-bytes time-taken x-forwarded-for \
            ssl-protocol ssl-cipher x-edge-response-result-type cs-protocol-version fle-status \
            fle-encrypted-fields c-port time-to-first-byte x-edge-detailed-result-type \
            sc-content-type sc-content-len sc-range-start sc-range-end";
        let the_expected: Vec<String> = the_header
            .split_whitespace()
            .map(|f| f.to_lowercase().replace(['-', '('], "_").replace(')', ""))
            .collect();
        let the_actual: Vec<&str> = SCHEMA.iter().map(|f| f.name()).collect();
        assert_eq!(the_actual, the_expected);
    }

    #[test]
    fn the_one_where_no_column_is_listed_twice() {
        let unique: HashSet<&str> = SCHEMA.iter().map(|f| f.name()).collect();
        assert_eq!(unique.len(), SCHEMA.len());
    }
}
