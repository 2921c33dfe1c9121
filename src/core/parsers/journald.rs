// LogScout - core/parsers/journald.rs
//
// journald JSON dialect (`journalctl -o json` output, one object per line).
//
// A line is treated as JSON only when, trimmed, it starts with `{` and ends
// with `}`. If it then fails to decode it falls through to text parsing;
// decode failures are not errors.

use crate::core::model::{Level, ParsedLogEntry};
use crate::core::parsers::{extract, syslog};
use crate::core::timestamp;
use serde_json::{Map, Value};

/// Structural check only; does not decode.
pub fn looks_like_json(line: &str) -> bool {
    let t = line.trim();
    t.len() >= 2 && t.starts_with('{') && t.ends_with('}')
}

fn decode(line: &str) -> Option<Map<String, Value>> {
    if !looks_like_json(line) {
        return None;
    }
    match serde_json::from_str::<Value>(line.trim()) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) => None,
        Err(e) => {
            tracing::trace!(error = %e, "Line looked like JSON but did not decode");
            None
        }
    }
}

/// journald writes strings, numbers, or byte arrays for non-UTF-8 payloads.
fn field(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => {
            let bytes: Vec<u8> = items
                .iter()
                .filter_map(|v| v.as_u64().and_then(|b| u8::try_from(b).ok()))
                .collect();
            Some(String::from_utf8_lossy(&bytes).into_owned())
        }
        _ => None,
    }
}

fn first_field(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| field(map, k).filter(|v| !v.trim().is_empty()))
}

fn entry_from_map(map: &Map<String, Value>, line: &str) -> ParsedLogEntry {
    let message = first_field(map, &["MESSAGE"])
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| line.trim().to_string());

    let priority = field(map, "PRIORITY").and_then(|p| p.trim().parse::<u8>().ok());
    let level = match priority {
        Some(p) => Level::from_syslog_priority(u32::from(p)),
        None => extract::infer_level(&message),
    };

    let timestamp = first_field(map, &["_SOURCE_REALTIME_TIMESTAMP", "__REALTIME_TIMESTAMP"])
        .map(|ts| timestamp::parse_timestamp(&ts));

    let ip_address = extract::extract_ip(&message);
    let user = extract::extract_user(&message);

    ParsedLogEntry {
        timestamp,
        hostname: first_field(map, &["_HOSTNAME"]),
        service: first_field(map, &["SYSLOG_IDENTIFIER", "_COMM", "_SYSTEMD_UNIT"]),
        pid: first_field(map, &["_PID", "SYSLOG_PID"]).and_then(|p| p.parse().ok()),
        level,
        message,
        user,
        ip_address,
        component: first_field(map, &["_SYSTEMD_UNIT", "UNIT"]),
        priority,
        ..Default::default()
    }
}

/// Parse a journald JSON line, falling back to text parsing.
pub fn parse_line(line: &str) -> Option<ParsedLogEntry> {
    if line.trim().is_empty() {
        return None;
    }
    match decode(line) {
        Some(map) => Some(entry_from_map(&map, line)),
        None => syslog::parse_line(line),
    }
}

/// A decodable JSON object carrying a `MESSAGE` field.
pub fn recognizes(line: &str) -> bool {
    decode(line).is_some_and(|map| map.contains_key("MESSAGE"))
}
