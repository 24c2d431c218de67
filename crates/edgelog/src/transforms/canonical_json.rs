// ai
//! 🔤 Canonical JSON formatting: compact, and ASCII-only on the wire.
//!
//! serde_json already writes compact output and escapes quotes, backslashes and
//! control characters. This formatter also escapes everything outside printable
//! ASCII (`' '..='~'`) as `\uXXXX`, surrogate pairs included, so every output byte
//! is 7-bit and diffs of the same record are byte-for-byte stable no matter which
//! tool produced them. The JSON lines this replaces were written that way, and
//! downstream readers already compare them as bytes.

use std::io;

use serde_json::ser::Formatter;

/// 🧼 Compact formatter that `\u`-escapes anything non-printable-ASCII.
#[derive(Debug, Default, Clone, Copy)]
pub struct AsciiFormatter;

impl Formatter for AsciiFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let bytes = fragment.as_bytes();
        let mut start = 0;

        for (i, ch) in fragment.char_indices() {
            if (' '..='~').contains(&ch) {
                continue;
            }
            if start < i {
                writer.write_all(&bytes[start..i])?;
            }
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{unit:04x}")?;
            }
            start = i + ch.len_utf8();
        }

        if start < bytes.len() {
            writer.write_all(&bytes[start..])?;
        }
        Ok(())
    }
}

/// 📝 Serialize `value` with [`AsciiFormatter`] into `writer`.
pub fn to_writer<W, T>(writer: W, value: &T) -> serde_json::Result<()>
where
    W: io::Write,
    T: ?Sized + serde::Serialize,
{
    let mut serializer = serde_json::Serializer::with_formatter(writer, AsciiFormatter);
    value.serialize(&mut serializer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(value: &serde_json::Value) -> String {
        let mut out = Vec::new();
        to_writer(&mut out, value).expect("💀 Vec writes don't fail");
        String::from_utf8(out).expect("💀 output is ASCII by construction")
    }

    #[test]
    fn the_one_where_plain_ascii_walks_through_untouched() {
        let value = serde_json::json!({"a": "Mozilla/5.0 (X11; Linux)", "b": "-"});
        assert_eq!(render(&value), r#"{"a":"Mozilla/5.0 (X11; Linux)","b":"-"}"#);
    }

    #[test]
    fn the_one_where_accents_and_emoji_get_escaped() {
        let value = serde_json::json!("café 🦆");
        assert_eq!(render(&value), r#""caf\u00e9 \ud83e\udd86""#);
    }

    #[test]
    fn the_one_where_control_characters_and_del_are_escaped_too() {
        let value = serde_json::json!("tab\there\u{7f}\"quote\"");
        assert_eq!(render(&value), r#""tab\there\u007f\"quote\"""#);
    }
}
