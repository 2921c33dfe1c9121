// LogScout - core/parsers/kernel.rs
//
// Kernel log dialect: kern.log lines forwarded through syslog, and bare
// dmesg output (`[ 1234.567890] message`).

use crate::core::model::{Level, ParsedLogEntry};
use crate::core::parsers::{extract, syslog};
use regex::Regex;
use std::sync::OnceLock;

/// Kernel messages that are errors regardless of wording elsewhere.
const KERNEL_ERROR_MARKERS: &[&str] = &[
    "oops",
    "call trace",
    "bug:",
    "kernel panic",
    "out of memory",
    "i/o error",
    "hung_task",
    "soft lockup",
];

fn uptime_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\[\s*(\d+\.\d+)\]\s*").expect("kernel: invalid uptime regex"))
}

fn component_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([A-Za-z][\w.\-]*)(?:\s+[^\s:]+)?(?:\s*\([^)]*\))?:\s")
            .expect("kernel: invalid component regex")
    })
}

/// Split a `[ uptime]` prefix off `message`.
fn strip_uptime(message: &str) -> (Option<f64>, &str) {
    match uptime_re().captures(message) {
        Some(caps) => {
            let secs = caps[1].parse().ok();
            let end = caps.get(0).map(|m| m.end()).unwrap_or(0);
            (secs, &message[end..])
        }
        None => (None, message),
    }
}

fn kernel_level(message: &str) -> Level {
    let lower = message.to_lowercase();
    if KERNEL_ERROR_MARKERS.iter().any(|m| lower.contains(m)) {
        Level::Error
    } else {
        extract::infer_level(message)
    }
}

/// Apply kernel-specific enrichment to an entry whose `message` may still
/// carry the uptime prefix.
fn enrich(mut entry: ParsedLogEntry, from_priority: bool) -> ParsedLogEntry {
    let (uptime, body) = strip_uptime(&entry.message);
    let body = body.trim().to_string();
    entry.kernel_timestamp = uptime;
    if !body.is_empty() {
        entry.message = body;
    }
    entry.component = component_re()
        .captures(&entry.message)
        .map(|c| c[1].to_string());
    if !from_priority {
        entry.level = kernel_level(&entry.message);
    }
    if entry.service.is_none() {
        entry.service = Some("kernel".to_string());
    }
    entry
}

pub fn parse_line(line: &str) -> Option<ParsedLogEntry> {
    if line.trim().is_empty() {
        return None;
    }
    let entry = match syslog::split_frame(line) {
        Some(frame) => {
            let from_priority = frame.priority.is_some();
            enrich(frame.into_entry(line), from_priority)
        }
        None if uptime_re().is_match(line.trim_start()) => {
            enrich(ParsedLogEntry::raw(line), false)
        }
        None => syslog::raw_entry(line),
    };
    Some(entry)
}

/// A syslog frame from the `kernel` program, or a dmesg line.
pub fn recognizes(line: &str) -> bool {
    match syslog::split_frame(line) {
        Some(frame) => frame.program.as_deref() == Some("kernel"),
        None => uptime_re().is_match(line.trim_start()),
    }
}
