//! Compact JSON emission from tape elements.
//!
//! Writes straight into a byte buffer with `itoa` for integers and `ryu`
//! for doubles. Output is minified (no whitespace); non-finite doubles,
//! which can only arise from exponent overflow on parse, emit `null`.

use super::tape::{Element, JsonType};

/// Serialize `element` as compact JSON, appending to `out`.
pub fn to_minified_vec(element: Element<'_>, out: &mut Vec<u8>) {
    write_element(element, out);
}

/// Serialize `element` as a compact JSON string.
pub fn to_minified_string(element: Element<'_>) -> String {
    let mut out = Vec::new();
    write_element(element, &mut out);
    // Only valid UTF-8 goes in: decoded strings are validated input,
    // everything else is ASCII.
    String::from_utf8(out).unwrap_or_default()
}

fn write_element(element: Element<'_>, out: &mut Vec<u8>) {
    match element.json_type() {
        JsonType::Null => out.extend_from_slice(b"null"),
        JsonType::Boolean => {
            let b = element.get_bool().unwrap_or(false);
            out.extend_from_slice(if b { b"true" } else { b"false" });
        }
        JsonType::Int64 => {
            let mut fmt = itoa::Buffer::new();
            out.extend_from_slice(fmt.format(element.get_i64().unwrap_or(0)).as_bytes());
        }
        JsonType::Uint64 => {
            let mut fmt = itoa::Buffer::new();
            out.extend_from_slice(fmt.format(element.get_u64().unwrap_or(0)).as_bytes());
        }
        JsonType::Double => {
            let f = element.get_f64().unwrap_or(0.0);
            if f.is_finite() {
                let mut fmt = ryu::Buffer::new();
                out.extend_from_slice(fmt.format(f).as_bytes());
            } else {
                out.extend_from_slice(b"null");
            }
        }
        JsonType::String => {
            write_json_string(element.get_bytes().unwrap_or(b""), out);
        }
        JsonType::Array => {
            out.push(b'[');
            let mut first = true;
            if let Ok(array) = element.get_array() {
                for item in array.iter() {
                    if !first {
                        out.push(b',');
                    }
                    first = false;
                    write_element(item, out);
                }
            }
            out.push(b']');
        }
        JsonType::Object => {
            out.push(b'{');
            let mut first = true;
            if let Ok(object) = element.get_object() {
                for (key, value) in object.iter() {
                    if !first {
                        out.push(b',');
                    }
                    first = false;
                    write_json_string(key.as_bytes(), out);
                    out.push(b':');
                    write_element(value, out);
                }
            }
            out.push(b'}');
        }
    }
}

/// Write `bytes` as a quoted JSON string, escaping what RFC 8259 requires.
fn write_json_string(bytes: &[u8], out: &mut Vec<u8>) {
    out.push(b'"');
    let mut start = 0;
    for (i, &b) in bytes.iter().enumerate() {
        let escape: &[u8] = match b {
            b'"' => b"\\\"",
            b'\\' => b"\\\\",
            0x08 => b"\\b",
            0x0C => b"\\f",
            b'\n' => b"\\n",
            b'\r' => b"\\r",
            b'\t' => b"\\t",
            0x00..=0x1F => b"",
            _ => continue,
        };
        out.extend_from_slice(&bytes[start..i]);
        if escape.is_empty() {
            const HEX: &[u8; 16] = b"0123456789abcdef";
            out.extend_from_slice(b"\\u00");
            out.push(HEX[(b >> 4) as usize]);
            out.push(HEX[(b & 0x0F) as usize]);
        } else {
            out.extend_from_slice(escape);
        }
        start = i + 1;
    }
    out.extend_from_slice(&bytes[start..]);
    out.push(b'"');
}
