// ai
//! 🔪 TSV row reader: tabs in, fields out, one row at a time.
//!
//! 🎬 *[a gzip stream opens. 40 million lines of tab-separated regret pour out.]*
//! *[the reader does not flinch. it has memchr.]*
//!
//! Classic CSV dialect with `\t` as the delimiter:
//! - a field that starts with `"` is quoted, `""` inside it is a literal quote
//! - a quoted field may swallow newlines and keep going on the next line
//! - a `"` in the middle of an unquoted field is just a character
//! - a closing quote followed by junk keeps the junk (lenient, never an error)
//! - `\n`, `\r\n` and bare `\r` all end a line
//! - a blank line is a row with zero fields
//!
//! Bytes are decoded as UTF-8 lossily at the field boundary. Binary garbage gets
//! replacement characters, not a stack trace. The reader buffers one physical line,
//! never the whole object.

use std::io::{self, BufRead};
use std::ops::Range;

use memchr::{memchr, memchr2};

const DELIMITER: u8 = b'\t';
const QUOTE: u8 = b'"';

/// 🧵 Where a physical line left us.
enum LineEnd {
    RowDone,
    StillQuoted,
}

/// 🚰 Streams rows out of any `BufRead`.
#[derive(Debug)]
pub struct TsvReader<R> {
    inner: R,
    // -- 📦 current physical chunk from `read_until`, may hold several `\r`-separated lines
    buf: Vec<u8>,
    pos: usize,
}

impl<R: BufRead> TsvReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::with_capacity(4096),
            pos: 0,
        }
    }

    /// 📄 Read the next row into `row` (cleared first). `Ok(false)` means EOF, and `row` is empty.
    pub fn read_row(&mut self, row: &mut Vec<String>) -> io::Result<bool> {
        row.clear();
        let mut field = Vec::new();
        let mut resumed_in_quotes = false;

        loop {
            let Some((range, terminated)) = self.next_line()? else {
                // -- 🏁 EOF inside an open quote: hand back what we have, lenient to the end
                if resumed_in_quotes {
                    row.push(decode(&mut field));
                    return Ok(true);
                }
                return Ok(false);
            };

            match parse_line(&self.buf[range], resumed_in_quotes, &mut field, row) {
                LineEnd::RowDone => return Ok(true),
                LineEnd::StillQuoted => {
                    // -- 🧶 the line break belongs to the quoted value
                    if terminated {
                        field.push(b'\n');
                    }
                    resumed_in_quotes = true;
                }
            }
        }
    }

    /// ✂️ Next physical line without its terminator, as a range into `self.buf`,
    /// plus whether it actually had a terminator (the last line of a file may not).
    fn next_line(&mut self) -> io::Result<Option<(Range<usize>, bool)>> {
        if self.pos >= self.buf.len() {
            self.buf.clear();
            self.pos = 0;
            if self.inner.read_until(b'\n', &mut self.buf)? == 0 {
                return Ok(None);
            }
        }

        let start = self.pos;
        match memchr2(b'\n', b'\r', &self.buf[start..]) {
            None => {
                self.pos = self.buf.len();
                Ok(Some((start..self.buf.len(), false)))
            }
            Some(offset) => {
                let end = start + offset;
                let mut next = end + 1;
                if self.buf[end] == b'\r' && self.buf.get(next) == Some(&b'\n') {
                    next += 1;
                }
                self.pos = next;
                Ok(Some((start..end, true)))
            }
        }
    }
}

#[derive(Clone, Copy)]
enum State {
    StartField,
    InField,
    InQuoted,
}

/// 🔍 Walk one physical line, pushing completed fields into `row`.
fn parse_line(
    line: &[u8],
    resumed_in_quotes: bool,
    field: &mut Vec<u8>,
    row: &mut Vec<String>,
) -> LineEnd {
    if !resumed_in_quotes && line.is_empty() {
        return LineEnd::RowDone;
    }

    let mut state = if resumed_in_quotes {
        State::InQuoted
    } else {
        State::StartField
    };
    let mut i = 0;

    loop {
        match state {
            State::StartField => match line.get(i) {
                None => {
                    row.push(decode(field));
                    return LineEnd::RowDone;
                }
                Some(&QUOTE) => {
                    i += 1;
                    state = State::InQuoted;
                }
                Some(&DELIMITER) => {
                    row.push(decode(field));
                    i += 1;
                }
                Some(_) => state = State::InField,
            },
            State::InField => match memchr(DELIMITER, &line[i..]) {
                None => {
                    field.extend_from_slice(&line[i..]);
                    row.push(decode(field));
                    return LineEnd::RowDone;
                }
                Some(offset) => {
                    field.extend_from_slice(&line[i..i + offset]);
                    row.push(decode(field));
                    i += offset + 1;
                    state = State::StartField;
                }
            },
            State::InQuoted => match memchr(QUOTE, &line[i..]) {
                None => {
                    field.extend_from_slice(&line[i..]);
                    return LineEnd::StillQuoted;
                }
                Some(offset) => {
                    field.extend_from_slice(&line[i..i + offset]);
                    i += offset + 1;
                    match line.get(i) {
                        Some(&QUOTE) => {
                            // -- 🪞 doubled quote, one literal quote, still inside
                            field.push(QUOTE);
                            i += 1;
                        }
                        Some(&DELIMITER) => {
                            row.push(decode(field));
                            i += 1;
                            state = State::StartField;
                        }
                        None => {
                            row.push(decode(field));
                            return LineEnd::RowDone;
                        }
                        // -- 🤷 `"abc"def`: the quote closes, `def` tags along unquoted
                        Some(_) => state = State::InField,
                    }
                }
            },
        }
    }
}

/// 🔤 Drain the field bytes into a `String`, lossily if it has to.
fn decode(field: &mut Vec<u8>) -> String {
    match String::from_utf8(std::mem::take(field)) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows_of(input: &[u8]) -> Vec<Vec<String>> {
        let mut reader = TsvReader::new(input);
        let mut row = Vec::new();
        let mut rows = Vec::new();
        while reader.read_row(&mut row).expect("💀 in-memory reads don't fail") {
            rows.push(row.clone());
        }
        rows
    }

    fn owned(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn the_one_where_plain_tabs_split_plain_fields() {
        let rows = rows_of(b"a\tb\tc\n1\t2\t3\n");
        assert_eq!(rows, vec![owned(&["a", "b", "c"]), owned(&["1", "2", "3"])]);
    }

    #[test]
    fn the_one_where_blank_lines_are_rows_with_nothing_in_them() {
        let rows = rows_of(b"a\tb\n\n\r\nc\n");
        assert_eq!(
            rows,
            vec![owned(&["a", "b"]), vec![], vec![], owned(&["c"])]
        );
    }

    #[test]
    fn the_one_where_every_flavor_of_newline_ends_a_line() {
        let rows = rows_of(b"a\r\nb\rc\nd");
        assert_eq!(
            rows,
            vec![owned(&["a"]), owned(&["b"]), owned(&["c"]), owned(&["d"])]
        );
    }

    #[test]
    fn the_one_where_empty_fields_are_still_fields() {
        assert_eq!(rows_of(b"\t\n"), vec![owned(&["", ""])]);
        assert_eq!(rows_of(b"a\t\tb\t\n"), vec![owned(&["a", "", "b", ""])]);
    }

    #[test]
    fn the_one_where_quotes_protect_tabs_and_each_other() {
        let rows = rows_of(b"\"x\ty\"\t\"say \"\"hi\"\"\"\tz\n");
        assert_eq!(rows, vec![owned(&["x\ty", "say \"hi\"", "z"])]);
    }

    #[test]
    fn the_one_where_a_quoted_field_spans_lines() {
        let rows = rows_of(b"\"first\nsecond\"\tafter\nnext\n");
        assert_eq!(
            rows,
            vec![owned(&["first\nsecond", "after"]), owned(&["next"])]
        );
    }

    #[test]
    fn the_one_where_mid_field_quotes_are_just_characters() {
        let rows = rows_of(b"Mozilla/5.0 \"quoted\"\tb\n");
        assert_eq!(rows, vec![owned(&["Mozilla/5.0 \"quoted\"", "b"])]);
    }

    #[test]
    fn the_one_where_junk_after_a_closing_quote_tags_along() {
        let rows = rows_of(b"\"abc\"def\tg\n");
        assert_eq!(rows, vec![owned(&["abcdef", "g"])]);
    }

    #[test]
    fn the_one_where_an_unterminated_quote_still_yields_a_row() {
        let rows = rows_of(b"a\t\"never closed");
        assert_eq!(rows, vec![owned(&["a", "never closed"])]);
    }

    #[test]
    fn the_one_where_binary_garbage_gets_replacement_characters_not_panics() {
        let rows = rows_of(b"ok\t\xff\xfe\x00\n");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0], "ok");
        assert_eq!(rows[0][1], "\u{fffd}\u{fffd}\u{0}");
    }

    #[test]
    fn the_one_where_empty_input_is_zero_rows() {
        assert!(rows_of(b"").is_empty());
    }
}
