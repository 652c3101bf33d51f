//! Hive-style `column=value` directory names for partition cells.

use sales_core::Value;

/// Directory value standing in for a null partition cell.
pub const HIVE_DEFAULT_PARTITION: &str = "__HIVE_DEFAULT_PARTITION__";

/// Characters that cannot appear raw in a directory name. All ASCII, so
/// escapes are single `%XX` pairs.
const ESCAPED: [char; 5] = ['/', '\\', '=', '%', '\0'];

/// Render one partition cell as the value half of a `column=value` segment.
pub fn encode_value(cell: &Value) -> String {
    match cell.canonical() {
        Some(raw) => escape(&raw),
        None => HIVE_DEFAULT_PARTITION.to_string(),
    }
}

/// Inverse of [`encode_value`]. Foreign directory names with stray `%` that
/// do not form a valid escape pass through untouched.
pub fn decode_value(encoded: &str) -> Value {
    if encoded == HIVE_DEFAULT_PARTITION {
        return Value::Null;
    }
    Value::Str(unescape(encoded))
}

/// Split a directory name into its column and encoded-value halves.
pub fn parse_segment(name: &str) -> Option<(&str, &str)> {
    name.split_once('=')
}

fn escape(raw: &str) -> String {
    if !raw.contains(&ESCAPED[..]) {
        return raw.to_string();
    }
    let mut escaped = String::with_capacity(raw.len() + 2);
    for c in raw.chars() {
        if ESCAPED.contains(&c) {
            escaped.push_str(&format!("%{:02X}", c as u32));
        } else {
            escaped.push(c);
        }
    }
    escaped
}

fn unescape(encoded: &str) -> String {
    let bytes = encoded.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3])
                .ok()
                .and_then(|pair| u8::from_str_radix(pair, 16).ok());
            if let Some(byte) = hex {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
