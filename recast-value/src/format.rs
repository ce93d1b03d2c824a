//! Compact JSON-like rendering, used for diagnostics and error messages.

use core::fmt::Write;

use crate::Value;

/// Maximum number of characters a rendered blob preview may take.
const BYTES_PREVIEW: usize = 16;

/// Format a Value as compact JSON-like text.
///
/// Bytes render as `b"<hex>"` (truncated); this output is for humans and is
/// not meant to be parsed back.
pub fn format_value(value: &Value) -> String {
    let mut out = String::new();
    format_value_into(&mut out, value);
    out
}

fn format_value_into(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => {
            let _ = write!(out, "{b}");
        }
        Value::Number(n) => {
            let _ = write!(out, "{n}");
        }
        Value::String(s) => write_quoted(out, s),
        Value::Bytes(bytes) => {
            out.push_str("b\"");
            for b in bytes.iter().take(BYTES_PREVIEW) {
                let _ = write!(out, "{b:02x}");
            }
            if bytes.len() > BYTES_PREVIEW {
                out.push_str("..");
            }
            out.push('"');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                format_value_into(out, item);
            }
            out.push(']');
        }
        Value::Object(obj) => {
            out.push('{');
            for (i, (key, item)) in obj.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_quoted(out, key);
                out.push(':');
                format_value_into(out, item);
            }
            out.push('}');
        }
    }
}

fn write_quoted(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use crate::value;

    #[test]
    fn renders_compact_json() {
        let v = value!({"a": [1, 2.5, null], "b": "x\"y", "c": true});
        assert_eq!(v.to_string(), r#"{"a":[1,2.5,null],"b":"x\"y","c":true}"#);
    }

    #[test]
    fn renders_bytes_as_hex() {
        let v = crate::Value::Bytes(vec![0xde, 0xad]);
        assert_eq!(v.to_string(), r#"b"dead""#);
    }
}
