// LogScout - core/parsers/daemon.rs
//
// Daemon log dialect (daemon.log): service managers and long-running
// daemons. The systemd unit named in the message becomes the component.

use crate::core::model::ParsedLogEntry;
use crate::core::parsers::{extract, syslog};
use regex::Regex;
use std::sync::OnceLock;

fn unit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"([\w@\-.\\:]+\.(?:service|socket|timer|mount|automount|target|path|slice|scope|swap|device))\b")
            .expect("daemon: invalid unit regex")
    })
}

/// Unit lifecycle action from a service-manager message.
pub fn classify_action(message: &str) -> Option<&'static str> {
    let lower = message.to_lowercase();
    if lower.contains("failed") || lower.contains("main process exited, code=killed") {
        Some("failed")
    } else if lower.starts_with("started ") || lower.contains(": started ") {
        Some("started")
    } else if lower.starts_with("stopped ") || lower.contains("deactivated successfully") {
        Some("stopped")
    } else if lower.starts_with("reloaded ") || lower.contains(": reloaded ") {
        Some("reloaded")
    } else {
        None
    }
}

pub fn parse_line(line: &str) -> Option<ParsedLogEntry> {
    if line.trim().is_empty() {
        return None;
    }
    let Some(frame) = syslog::split_frame(line) else {
        return Some(syslog::raw_entry(line));
    };

    let mut entry = frame.into_entry(line);
    entry.component = unit_re()
        .captures(&entry.message)
        .map(|c| c[1].to_string())
        .or_else(|| entry.service.clone());
    entry.action = classify_action(&entry.message).map(str::to_string);
    entry.ip_address = extract::extract_ip(&entry.message);
    Some(entry)
}

/// A syslog frame from systemd, or one that names a unit.
pub fn recognizes(line: &str) -> bool {
    let Some(frame) = syslog::split_frame(line) else {
        return false;
    };
    frame
        .program
        .as_deref()
        .is_some_and(|p| p.starts_with("systemd"))
        || unit_re().is_match(&frame.message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::Level;

    #[test]
    fn test_unit_started() {
        let e = parse_line(
            "Jan 15 10:30:45 host systemd[1]: Started nginx.service - A high performance web server.",
        )
        .unwrap();
        assert_eq!(e.component.as_deref(), Some("nginx.service"));
        assert_eq!(e.action.as_deref(), Some("started"));
    }

    #[test]
    fn test_unit_failed_is_error() {
        let e = parse_line(
            "Jan 15 10:30:45 host systemd[1]: backup.service: Failed with result 'exit-code'.",
        )
        .unwrap();
        assert_eq!(e.component.as_deref(), Some("backup.service"));
        assert_eq!(e.action.as_deref(), Some("failed"));
        assert_eq!(e.level, Level::Error);
    }

    #[test]
    fn test_component_falls_back_to_program() {
        let e = parse_line("Jan 15 10:30:45 host named[812]: zone example.org loaded").unwrap();
        assert_eq!(e.component.as_deref(), Some("named"));
        assert_eq!(e.action, None);
    }

    #[test]
    fn test_recognizes() {
        assert!(recognizes("Jan 15 10:30:45 h systemd[1]: Reloaded cron.service."));
        assert!(recognizes("Jan 15 10:30:45 h init: ssh.socket: listening"));
        assert!(!recognizes("Jan 15 10:30:45 h named[2]: zone loaded"));
    }
}
