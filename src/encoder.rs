// ABOUTME: Compact JSON text encoder with container state tracking.
// ABOUTME: Handles string escaping, number formatting, timestamps, guids and base64 payloads.

use crate::error::{Error, Result};
use crate::reflect::Timestamp;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::NaiveDateTime;
use std::fmt::Write as _;
use uuid::Uuid;

/// A JSON encoder that appends compact text to an owned buffer.
///
/// The encoder tracks container state to ensure well-formed output: keys only
/// inside objects, a value after every key, commas between siblings.
pub struct Encoder {
    out: String,
    escape_non_ascii: bool,
    containers: Vec<ContainerState>,
}

#[derive(Clone, Copy)]
struct ContainerState {
    is_object: bool,
    expecting_key: bool,
    has_items: bool,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder {
    /// Create an encoder that passes non-ASCII text through unescaped.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an encoder with a pre-sized buffer.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            out: String::with_capacity(capacity),
            escape_non_ascii: false,
            containers: Vec::new(),
        }
    }

    /// Escape every char outside printable ASCII as `\uXXXX`.
    #[must_use]
    pub fn escaping_non_ascii(mut self, escape: bool) -> Self {
        self.escape_non_ascii = escape;
        self
    }

    /// The text written so far.
    pub fn as_str(&self) -> &str {
        &self.out
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.out.len()
    }

    pub fn is_empty(&self) -> bool {
        self.out.is_empty()
    }

    /// Check if we're currently in an object and expecting a key.
    #[inline]
    fn expecting_object_key(&self) -> bool {
        self.containers
            .last()
            .map(|c| c.is_object && c.expecting_key)
            .unwrap_or(false)
    }

    /// Toggle the key/value expectation in the current object.
    #[inline]
    fn toggle_object_state(&mut self) {
        if let Some(container) = self.containers.last_mut() {
            if container.is_object {
                container.expecting_key = !container.expecting_key;
            }
        }
    }

    /// Validate state and write the separator in front of a value.
    #[inline]
    fn begin_value(&mut self) -> Result<()> {
        if self.expecting_object_key() {
            return Err(Error::ExpectedObjectKey);
        }
        if let Some(container) = self.containers.last_mut() {
            if !container.is_object {
                if container.has_items {
                    self.out.push(',');
                }
                container.has_items = true;
            }
        }
        Ok(())
    }

    /// Encode an object key followed by `:`.
    pub fn write_key(&mut self, key: &str) -> Result<()> {
        match self.containers.last_mut() {
            Some(container) if container.is_object && container.expecting_key => {
                if container.has_items {
                    self.out.push(',');
                }
                container.has_items = true;
            }
            Some(container) if container.is_object => return Err(Error::ExpectedObjectValue),
            _ => return Err(Error::Custom("object key written outside an object".into())),
        }
        write_escaped(&mut self.out, key, self.escape_non_ascii);
        self.out.push(':');
        self.toggle_object_state();
        Ok(())
    }

    /// Write `null`.
    pub fn write_null(&mut self) -> Result<()> {
        self.begin_value()?;
        self.out.push_str("null");
        self.toggle_object_state();
        Ok(())
    }

    /// Write `true` or `false`.
    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.begin_value()?;
        self.out.push_str(if value { "true" } else { "false" });
        self.toggle_object_state();
        Ok(())
    }

    /// Write an unsigned integer in decimal.
    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.begin_value()?;
        write!(self.out, "{value}")?;
        self.toggle_object_state();
        Ok(())
    }

    /// Write a signed integer in decimal.
    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        self.begin_value()?;
        write!(self.out, "{value}")?;
        self.toggle_object_state();
        Ok(())
    }

    /// Write a 64-bit float in its shortest decimal form.
    ///
    /// Non-finite values become a string marker: with `compact`, NaN and both
    /// infinities share `"NaN"`; otherwise they are written as `"NaN"`,
    /// `"Infinity"` and `"-Infinity"`.
    pub fn write_f64(&mut self, value: f64, compact: bool) -> Result<()> {
        self.begin_value()?;
        if !value.is_finite() {
            self.out
                .push_str(non_finite_marker(value.is_nan(), value.is_sign_negative(), compact));
        } else if needs_exponent(value.abs()) {
            write!(self.out, "{value:e}")?;
        } else {
            write!(self.out, "{value}")?;
        }
        self.toggle_object_state();
        Ok(())
    }

    /// Write a 32-bit float using its own shortest representation.
    pub fn write_f32(&mut self, value: f32, compact: bool) -> Result<()> {
        self.begin_value()?;
        if !value.is_finite() {
            self.out
                .push_str(non_finite_marker(value.is_nan(), value.is_sign_negative(), compact));
        } else if needs_exponent(f64::from(value.abs())) {
            write!(self.out, "{value:e}")?;
        } else {
            write!(self.out, "{value}")?;
        }
        self.toggle_object_state();
        Ok(())
    }

    /// Write a quoted, escaped string.
    pub fn write_str(&mut self, value: &str) -> Result<()> {
        self.begin_value()?;
        write_escaped(&mut self.out, value, self.escape_non_ascii);
        self.toggle_object_state();
        Ok(())
    }

    /// Encode a single char as a one-char string.
    pub fn write_char(&mut self, value: char) -> Result<()> {
        let mut buf = [0u8; 4];
        self.write_str(value.encode_utf8(&mut buf))
    }

    /// Encode a timestamp as `YYYY-MM-DDTHH:mm:ss[.fff]` plus a zone suffix.
    ///
    /// With `utc`, the value is converted and suffixed `Z`. Otherwise zoned
    /// values keep their offset (`+02:00`) and naive values carry no suffix.
    pub fn write_timestamp(&mut self, value: Timestamp, utc: bool, millis: bool) -> Result<()> {
        self.begin_value()?;
        self.out.push('"');
        match value {
            _ if utc => {
                write_date_time(&mut self.out, &value.to_utc().naive_utc(), millis)?;
                self.out.push('Z');
            }
            Timestamp::Zoned(dt) => {
                write_date_time(&mut self.out, &dt.naive_local(), millis)?;
                write!(self.out, "{}", dt.format("%:z"))?;
            }
            Timestamp::Naive(naive) => write_date_time(&mut self.out, &naive, millis)?,
        }
        self.out.push('"');
        self.toggle_object_state();
        Ok(())
    }

    /// Encode a guid, either as base64 of its raw bytes or hyphenated text.
    ///
    /// The raw bytes use the mixed-endian field layout of Windows guids.
    pub fn write_guid(&mut self, value: &Uuid, base64: bool) -> Result<()> {
        self.begin_value()?;
        self.out.push('"');
        if base64 {
            STANDARD.encode_string(value.to_bytes_le(), &mut self.out);
        } else {
            write!(self.out, "{}", value.hyphenated())?;
        }
        self.out.push('"');
        self.toggle_object_state();
        Ok(())
    }

    /// Encode a byte array as a base64 string.
    pub fn write_bytes(&mut self, value: &[u8]) -> Result<()> {
        self.begin_value()?;
        self.out.push('"');
        STANDARD.encode_string(value, &mut self.out);
        self.out.push('"');
        self.toggle_object_state();
        Ok(())
    }

    /// Write `[`.
    pub fn begin_array(&mut self) -> Result<()> {
        self.begin_value()?;
        self.out.push('[');
        self.containers.push(ContainerState {
            is_object: false,
            expecting_key: false,
            has_items: false,
        });
        Ok(())
    }

    /// Write `{`.
    pub fn begin_object(&mut self) -> Result<()> {
        self.begin_value()?;
        self.out.push('{');
        self.containers.push(ContainerState {
            is_object: true,
            expecting_key: true,
            has_items: false,
        });
        Ok(())
    }

    /// Write the `]` or `}` closing the innermost container.
    pub fn end_container(&mut self) -> Result<()> {
        let container = self
            .containers
            .pop()
            .ok_or(Error::UnbalancedContainers)?;

        // Can't close an object while expecting a value
        if container.is_object && !container.expecting_key {
            return Err(Error::ExpectedObjectValue);
        }

        self.out.push(if container.is_object { '}' } else { ']' });
        self.toggle_object_state();
        Ok(())
    }

    /// Take the text, failing if a container is still open.
    pub fn finish(self) -> Result<String> {
        if !self.containers.is_empty() {
            return Err(Error::UnclosedContainer);
        }
        Ok(self.out)
    }
}

#[inline]
fn non_finite_marker(nan: bool, negative: bool, compact: bool) -> &'static str {
    match (compact, nan, negative) {
        (true, _, _) | (false, true, _) => "\"NaN\"",
        (false, false, false) => "\"Infinity\"",
        (false, false, true) => "\"-Infinity\"",
    }
}

/// Magnitudes the plain decimal form would spell out with long zero runs.
#[inline]
fn needs_exponent(magnitude: f64) -> bool {
    magnitude >= 1e16 || (magnitude != 0.0 && magnitude < 1e-5)
}

fn write_date_time(out: &mut String, value: &NaiveDateTime, millis: bool) -> Result<()> {
    let pattern = if millis {
        "%Y-%m-%dT%H:%M:%S%.3f"
    } else {
        "%Y-%m-%dT%H:%M:%S"
    };
    write!(out, "{}", value.format(pattern))?;
    Ok(())
}

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Append `value` as a quoted JSON string.
///
/// Unescaped runs are copied in bulk; only the chars that need it are
/// rewritten. Chars above the BMP become UTF-16 surrogate pairs.
pub(crate) fn write_escaped(out: &mut String, value: &str, escape_non_ascii: bool) {
    out.reserve(value.len() + 2);
    out.push('"');
    let mut run_start = 0;
    for (index, c) in value.char_indices() {
        let plain = match c {
            '\t' | '\r' | '\n' | '"' | '\\' | '\0' => false,
            ' '..='~' => true,
            _ => !escape_non_ascii,
        };
        if plain {
            continue;
        }
        out.push_str(&value[run_start..index]);
        run_start = index + c.len_utf8();
        match c {
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            _ => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    push_unicode_escape(out, *unit);
                }
            }
        }
    }
    out.push_str(&value[run_start..]);
    out.push('"');
}

#[inline]
fn push_unicode_escape(out: &mut String, unit: u16) {
    out.push_str("\\u");
    for shift in [12u16, 8, 4, 0] {
        out.push(char::from(HEX_DIGITS[usize::from((unit >> shift) & 0xF)]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveDate};

    fn encode(f: impl FnOnce(&mut Encoder) -> Result<()>) -> String {
        let mut enc = Encoder::new();
        f(&mut enc).unwrap();
        enc.finish().unwrap()
    }

    fn sample_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_milli_opt(3, 4, 5, 678)
            .unwrap()
    }

    #[test]
    fn test_encode_scalars() {
        assert_eq!(encode(|e| e.write_null()), "null");
        assert_eq!(encode(|e| e.write_bool(true)), "true");
        assert_eq!(encode(|e| e.write_i64(-42)), "-42");
        assert_eq!(encode(|e| e.write_u64(u64::MAX)), "18446744073709551615");
    }

    #[test]
    fn test_encode_floats() {
        assert_eq!(encode(|e| e.write_f64(1.0, true)), "1");
        assert_eq!(encode(|e| e.write_f64(1.0, false)), "1");
        assert_eq!(encode(|e| e.write_f64(0.1, true)), "0.1");
        assert_eq!(encode(|e| e.write_f64(1e300, true)), "1e300");
        assert_eq!(encode(|e| e.write_f32(0.1, true)), "0.1");
        assert_eq!(encode(|e| e.write_f32(2.0, false)), "2");
    }

    #[test]
    fn test_nan_infinity_written_as_marker() {
        assert_eq!(encode(|e| e.write_f64(f64::NAN, true)), "\"NaN\"");
        assert_eq!(encode(|e| e.write_f64(f64::INFINITY, true)), "\"NaN\"");
        assert_eq!(encode(|e| e.write_f64(f64::NAN, false)), "\"NaN\"");
        assert_eq!(encode(|e| e.write_f64(f64::INFINITY, false)), "\"Infinity\"");
        assert_eq!(encode(|e| e.write_f32(f32::NEG_INFINITY, false)), "\"-Infinity\"");
        assert_eq!(encode(|e| e.write_f32(f32::NEG_INFINITY, true)), "\"NaN\"");
    }

    #[test]
    fn test_escape_short_forms() {
        assert_eq!(
            encode(|e| e.write_str("a\tb\"c\\d")),
            r#""a\tb\"c\\d""#
        );
        assert_eq!(encode(|e| e.write_str("x\0y\r\n")), r#""x\u0000y\r\n""#);
    }

    #[test]
    fn test_escape_non_ascii() {
        let mut enc = Encoder::new().escaping_non_ascii(true);
        enc.write_str("é😀\u{7f}").unwrap();
        assert_eq!(enc.finish().unwrap(), r#""\u00E9\uD83D\uDE00\u007F""#);

        assert_eq!(encode(|e| e.write_str("é")), "\"é\"");
    }

    #[test]
    fn test_encode_containers() {
        let out = encode(|e| {
            e.begin_object()?;
            e.write_key("a")?;
            e.write_i64(1)?;
            e.write_key("b")?;
            e.begin_array()?;
            e.write_null()?;
            e.write_str("x")?;
            e.begin_object()?;
            e.end_container()?;
            e.end_container()?;
            e.end_container()
        });
        assert_eq!(out, r#"{"a":1,"b":[null,"x",{}]}"#);
    }

    #[test]
    fn test_container_state_errors() {
        let mut enc = Encoder::new();
        enc.begin_object().unwrap();
        assert_eq!(enc.write_i64(1), Err(Error::ExpectedObjectKey));
        enc.write_key("k").unwrap();
        assert_eq!(enc.end_container(), Err(Error::ExpectedObjectValue));

        let mut enc = Encoder::new();
        assert_eq!(enc.end_container(), Err(Error::UnbalancedContainers));
        enc.begin_array().unwrap();
        assert!(enc.write_key("k").is_err());
        assert_eq!(enc.finish(), Err(Error::UnclosedContainer));
    }

    #[test]
    fn test_encode_timestamps() {
        let naive = sample_time();
        assert_eq!(
            encode(|e| e.write_timestamp(Timestamp::Naive(naive), false, false)),
            "\"2024-01-02T03:04:05\""
        );
        assert_eq!(
            encode(|e| e.write_timestamp(Timestamp::Naive(naive), false, true)),
            "\"2024-01-02T03:04:05.678\""
        );

        let zoned = naive
            .and_local_timezone(FixedOffset::east_opt(2 * 3600).unwrap())
            .unwrap();
        assert_eq!(
            encode(|e| e.write_timestamp(Timestamp::Zoned(zoned), false, false)),
            "\"2024-01-02T03:04:05+02:00\""
        );
        assert_eq!(
            encode(|e| e.write_timestamp(Timestamp::Zoned(zoned), true, true)),
            "\"2024-01-02T01:04:05.678Z\""
        );
    }

    #[test]
    fn test_encode_guid_and_bytes() {
        let guid = Uuid::parse_str("00112233-4455-6677-8899-aabbccddeeff").unwrap();
        assert_eq!(
            encode(|e| e.write_guid(&guid, false)),
            "\"00112233-4455-6677-8899-aabbccddeeff\""
        );
        assert_eq!(
            encode(|e| e.write_guid(&guid, true)),
            "\"MyIRAFVEd2aImaq7zN3u/w==\""
        );
        assert_eq!(encode(|e| e.write_bytes(b"hello")), "\"aGVsbG8=\"");
    }
}
