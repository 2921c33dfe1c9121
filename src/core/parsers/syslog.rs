// LogScout - core/parsers/syslog.rs
//
// Generic syslog dialect and the shared line framing used by every
// text-based dialect.
//
// A line is split into its syslog frame (timestamp, hostname, program, pid,
// message) by trying, in order:
//   1. ISO-8601 timestamp with optional hostname (rsyslog RFC3339 template,
//      journald forwarding to flat files)
//   2. The BSD grok template `Mon D HH:MM:SS host prog[pid]: message`
//   3. A hand-written BSD regex with optional hostname, kept in case the
//      grok template fails to compile
// A leading `<PRI>` is stripped first and recorded as the priority.

use crate::core::grok;
use crate::core::model::{Level, ParsedLogEntry};
use crate::core::parsers::extract;
use crate::core::timestamp;
use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::OnceLock;

/// Grok template for the canonical BSD line.
pub const BSD_SYSLOG_TEMPLATE: &str =
    r"%{SYSLOGTIMESTAMP:timestamp} %{SYSLOGHOST:hostname} %{PROG:program}(?:\[%{PID:pid}\])?: %{GREEDYDATA:message}";

fn iso_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?P<timestamp>\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(?:[.,]\d+)?(?:Z|[+-]\d{2}:?\d{2})?)\s+(?:(?P<hostname>[A-Za-z0-9][\w.\-]*)\s+)?(?P<program>[^\s\[\]:]+)(?:\[(?P<pid>\d+)\])?:\s*(?P<message>.*)$",
        )
        .expect("syslog: invalid ISO line regex")
    })
}

fn bsd_fallback_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?P<timestamp>[A-Z][a-z]{2}\s+\d{1,2}\s+\d{1,2}:\d{2}:\d{2})\s+(?:(?P<hostname>[\w.\-]+)\s+)?(?P<program>[^\s\[\]:]+)(?:\[(?P<pid>\d+)\])?:\s*(?P<message>.*)$",
        )
        .expect("syslog: invalid BSD fallback regex")
    })
}

fn pri_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^<(\d{1,3})>\s*").expect("syslog: invalid PRI regex"))
}

/// The structural parts of a syslog line, before any dialect enrichment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyslogFrame {
    pub priority: Option<u8>,
    pub timestamp: Option<DateTime<Utc>>,
    pub hostname: Option<String>,
    pub program: Option<String>,
    pub pid: Option<u32>,
    pub message: String,
}

impl SyslogFrame {
    /// Convert to an entry. The level comes from the PRI value when present,
    /// otherwise from message keywords. An empty message falls back to the
    /// whole line.
    pub fn into_entry(self, line: &str) -> ParsedLogEntry {
        let message = if self.message.trim().is_empty() {
            line.trim().to_string()
        } else {
            self.message.trim().to_string()
        };
        let level = match self.priority {
            Some(p) => Level::from_syslog_priority(u32::from(p)),
            None => extract::infer_level(&message),
        };
        ParsedLogEntry {
            timestamp: self.timestamp,
            hostname: self.hostname,
            service: self.program,
            pid: self.pid,
            level,
            message,
            priority: self.priority,
            ..Default::default()
        }
    }
}

/// Split `line` into a syslog frame. `None` if no known shape matches.
pub fn split_frame(line: &str) -> Option<SyslogFrame> {
    let mut rest = line.trim();
    let mut priority = None;
    if let Some(caps) = pri_re().captures(rest) {
        priority = caps[1].parse::<u16>().ok().and_then(|p| u8::try_from(p).ok());
        let end = caps.get(0).map(|m| m.end()).unwrap_or(0);
        rest = &rest[end..];
    }

    let mut frame = frame_from_iso(rest)
        .or_else(|| frame_from_grok(rest))
        .or_else(|| frame_from_fallback(rest))?;
    frame.priority = priority;
    Some(frame)
}

fn frame_from_iso(line: &str) -> Option<SyslogFrame> {
    let caps = iso_line_re().captures(line)?;
    let get = |name: &str| caps.name(name).map(|m| m.as_str().to_string());
    Some(SyslogFrame {
        priority: None,
        timestamp: get("timestamp").map(|t| timestamp::parse_timestamp(&t)),
        hostname: get("hostname"),
        program: get("program"),
        pid: get("pid").and_then(|p| p.parse().ok()),
        message: get("message").unwrap_or_default(),
    })
}

fn frame_from_grok(line: &str) -> Option<SyslogFrame> {
    let pattern = grok::compile_cached(BSD_SYSLOG_TEMPLATE);
    let mut fields = pattern.captures(line)?;
    Some(SyslogFrame {
        priority: None,
        timestamp: fields
            .get("timestamp")
            .map(|t| timestamp::parse_timestamp(t)),
        hostname: fields.remove("hostname"),
        program: fields.remove("program"),
        pid: fields.get("pid").and_then(|p| p.parse().ok()),
        message: fields.remove("message").unwrap_or_default(),
    })
}

fn frame_from_fallback(line: &str) -> Option<SyslogFrame> {
    let caps = bsd_fallback_re().captures(line)?;
    let get = |name: &str| caps.name(name).map(|m| m.as_str().to_string());
    Some(SyslogFrame {
        priority: None,
        timestamp: get("timestamp").map(|t| timestamp::parse_timestamp(&t)),
        hostname: get("hostname"),
        program: get("program"),
        pid: get("pid").and_then(|p| p.parse().ok()),
        message: get("message").unwrap_or_default(),
    })
}

/// Degraded record for a line with no recognisable frame.
pub(crate) fn raw_entry(line: &str) -> ParsedLogEntry {
    let mut entry = ParsedLogEntry::raw(line);
    entry.level = extract::infer_level(&entry.message);
    entry
}

/// Parse a generic syslog line. `None` only for blank input.
pub fn parse_line(line: &str) -> Option<ParsedLogEntry> {
    if line.trim().is_empty() {
        return None;
    }
    let entry = match split_frame(line) {
        Some(frame) => {
            let mut entry = frame.into_entry(line);
            entry.ip_address = extract::extract_ip(&entry.message);
            entry
        }
        None => raw_entry(line),
    };
    Some(entry)
}

/// Any well-formed syslog line.
pub fn recognizes(line: &str) -> bool {
    split_frame(line).is_some()
}
