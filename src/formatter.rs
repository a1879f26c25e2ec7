// ABOUTME: Pretty-printer that re-indents compact JSON text.
// ABOUTME: A single pass over the input; strings are copied verbatim and malformed input never panics.

use crate::types::limits;

/// Re-indent `json` with the default three-space indent.
///
/// ```rust
/// let pretty = reflect_json::pretty_print(r#"{"a":[1,2]}"#);
/// assert_eq!(pretty, "{\n   \"a\" : [\n      1,\n      2\n   ]\n}");
/// ```
#[must_use]
pub fn pretty_print(json: &str) -> String {
    pretty_print_with_indent(json, limits::DEFAULT_INDENT)
}

/// Re-indent `json` using `indent` as one indent unit.
///
/// Whitespace outside strings is dropped and replaced by the layout's own
/// newlines and indentation, so pretty-printing pretty output is a no-op.
#[must_use]
pub fn pretty_print_with_indent(json: &str, indent: &str) -> String {
    let bytes = json.as_bytes();
    let mut out = String::with_capacity(json.len() + json.len() / 2);
    let mut depth = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                let end = string_end(bytes, i + 1);
                out.push_str(&json[i..end]);
                i = end;
                continue;
            }
            open @ (b'{' | b'[') => {
                out.push(char::from(open));
                depth += 1;
                newline(&mut out, indent, depth);
            }
            close @ (b'}' | b']') => {
                depth = depth.saturating_sub(1);
                newline(&mut out, indent, depth);
                out.push(char::from(close));
            }
            b',' => {
                out.push(',');
                newline(&mut out, indent, depth);
            }
            b':' => out.push_str(" : "),
            b' ' | b'\t' | b'\n' | b'\r' => {}
            _ => {
                let start = i;
                while i < bytes.len() && !is_structural(bytes[i]) {
                    i += 1;
                }
                out.extend(json[start..i].chars().filter(|c| !c.is_whitespace()));
                continue;
            }
        }
        i += 1;
    }
    out
}

#[inline]
fn is_structural(byte: u8) -> bool {
    matches!(
        byte,
        b'"' | b'{' | b'}' | b'[' | b']' | b',' | b':' | b' ' | b'\t' | b'\n' | b'\r'
    )
}

#[inline]
fn newline(out: &mut String, indent: &str, depth: usize) {
    out.push('\n');
    for _ in 0..depth {
        out.push_str(indent);
    }
}

/// Index just past the quote closing the string whose body starts at `from`.
/// An unterminated string runs to the end of the input.
fn string_end(bytes: &[u8], mut from: usize) -> usize {
    while from < bytes.len() {
        let Some(offset) = memchr::memchr2(b'"', b'\\', &bytes[from..]) else {
            break;
        };
        let at = from + offset;
        if bytes[at] == b'"' {
            return at + 1;
        }
        from = at + 2;
    }
    bytes.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let pretty = pretty_print(r#"{"a":1,"b":[true,null],"c":{}}"#);
        let expected = "{\n   \"a\" : 1,\n   \"b\" : [\n      true,\n      null\n   ],\n   \"c\" : {\n      \n   }\n}";
        assert_eq!(pretty, expected);
    }

    #[test]
    fn test_strings_copied_verbatim() {
        let json = r#"["a,b:{c}","quote \" inside","back\\slash",[]]"#;
        let pretty = pretty_print_with_indent(json, "  ");
        assert!(pretty.contains(r#""a,b:{c}""#));
        assert!(pretty.contains(r#""quote \" inside""#));
        assert!(pretty.contains(r#""back\\slash""#));
    }

    #[test]
    fn test_idempotent() {
        let json = r#"{"k":[1,{"x":"y z"}],"e":"é"}"#;
        let once = pretty_print(json);
        assert_eq!(pretty_print(&once), once);
    }

    #[test]
    fn test_malformed_input_does_not_panic() {
        assert_eq!(pretty_print("]]"), "\n]\n]");
        let unterminated = pretty_print(r#"{"abc"#);
        assert!(unterminated.ends_with(r#""abc"#));
        assert_eq!(pretty_print(r#""\"#), r#""\"#);
        assert_eq!(pretty_print(""), "");
    }
}
