// LogScout - core/parsers/mail.rs
//
// Mail log dialect (mail.log / maillog): postfix, sendmail, dovecot, exim.

use crate::core::model::{Level, ParsedLogEntry};
use crate::core::parsers::{extract, syslog};
use regex::Regex;
use std::sync::OnceLock;

const MAIL_PROGRAMS: &[&str] = &[
    "sendmail",
    "sm-mta",
    "sm-msp-queue",
    "dovecot",
    "exim",
    "exim4",
    "opendkim",
    "opendmarc",
    "amavis",
    "spamd",
    "postgrey",
];

fn queue_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([0-9A-Za-z]{5,20}):\s").expect("mail: invalid queue id regex"))
}

fn client_ip_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[\w.\-]+\[([0-9A-Fa-f:.]+)\]").expect("mail: invalid client regex")
    })
}

fn status_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bstatus=(\w+)").expect("mail: invalid status regex"))
}

fn sasl_user_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\bsasl_username=([\w.@$+-]+)").expect("mail: invalid sasl regex")
    })
}

/// Postfix queue ids contain at least one digit; `warning:` and `NOQUEUE:`
/// never do.
fn extract_queue_id(message: &str) -> Option<String> {
    let caps = queue_id_re().captures(message)?;
    let id = &caps[1];
    id.chars()
        .any(|c| c.is_ascii_digit())
        .then(|| id.to_string())
}

/// Client address from the `host[addr]` notation postfix uses.
fn extract_client_ip(message: &str) -> Option<String> {
    client_ip_re()
        .captures_iter(message)
        .map(|c| c[1].to_string())
        .find(|ip| extract::is_valid_ipv4(ip) || ip.contains(':'))
}

fn is_mail_program(program: &str) -> bool {
    program.starts_with("postfix") || MAIL_PROGRAMS.contains(&program)
}

pub fn parse_line(line: &str) -> Option<ParsedLogEntry> {
    if line.trim().is_empty() {
        return None;
    }
    let Some(frame) = syslog::split_frame(line) else {
        return Some(syslog::raw_entry(line));
    };
    let from_priority = frame.priority.is_some();

    let mut entry = frame.into_entry(line);
    let msg = entry.message.as_str();

    entry.queue_id = extract_queue_id(msg);
    entry.ip_address = extract_client_ip(msg).or_else(|| extract::extract_ip(msg));
    entry.user = sasl_user_re()
        .captures(msg)
        .map(|c| c[1].to_string())
        .or_else(|| extract::extract_user(msg));
    entry.action = status_re()
        .captures(msg)
        .map(|c| c[1].to_string())
        .or_else(|| msg.contains("reject:").then(|| "rejected".to_string()));
    entry.component = entry
        .service
        .as_deref()
        .and_then(|s| s.split_once('/'))
        .map(|(_, sub)| sub.to_string());

    if !from_priority {
        match entry.action.as_deref() {
            Some("bounced") | Some("rejected") => entry.level = Level::Error,
            Some("deferred") => entry.level = Level::Warning,
            _ => {}
        }
    }
    Some(entry)
}

/// A syslog frame from a mail transfer/delivery agent.
pub fn recognizes(line: &str) -> bool {
    syslog::split_frame(line)
        .and_then(|f| f.program)
        .is_some_and(|p| is_mail_program(&p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postfix_client_line() {
        let e = parse_line(
            "Jan 15 10:30:45 mx postfix/smtpd[1234]: 4BCD12345: client=unknown[192.168.1.5]",
        )
        .unwrap();
        assert_eq!(e.service.as_deref(), Some("postfix/smtpd"));
        assert_eq!(e.component.as_deref(), Some("smtpd"));
        assert_eq!(e.queue_id.as_deref(), Some("4BCD12345"));
        assert_eq!(e.ip_address.as_deref(), Some("192.168.1.5"));
    }

    #[test]
    fn test_delivery_status() {
        let e = parse_line(
            "Jan 15 10:30:46 mx postfix/smtp[1240]: 4BCD12345: to=<bob@example.org>, relay=mx.example.org[203.0.113.9]:25, delay=1.2, status=deferred (connection timed out)",
        )
        .unwrap();
        assert_eq!(e.action.as_deref(), Some("deferred"));
        assert_eq!(e.ip_address.as_deref(), Some("203.0.113.9"));
        assert_eq!(e.level, Level::Warning);

        let e = parse_line(
            "Jan 15 10:30:47 mx postfix/smtp[1240]: 5EF0001: to=<x@y.z>, status=sent (250 OK)",
        )
        .unwrap();
        assert_eq!(e.action.as_deref(), Some("sent"));
    }

    #[test]
    fn test_warning_is_not_a_queue_id() {
        let e = parse_line("Jan 15 10:30:45 mx postfix/smtpd[1]: warning: hostname does not resolve")
            .unwrap();
        assert_eq!(e.queue_id, None);
    }

    #[test]
    fn test_sasl_user() {
        let e = parse_line(
            "Jan 15 10:30:45 mx postfix/smtpd[9]: 1A2B3C4D: client=a[10.0.0.1], sasl_method=PLAIN, sasl_username=carol@example.org",
        )
        .unwrap();
        assert_eq!(e.user.as_deref(), Some("carol@example.org"));
    }

    #[test]
    fn test_recognizes() {
        assert!(recognizes("Jan 15 10:30:45 mx postfix/qmgr[5]: 1A2B3: removed"));
        assert!(recognizes("Jan 15 10:30:45 mx dovecot: imap-login: Login"));
        assert!(!recognizes("Jan 15 10:30:45 mx sshd[5]: Accepted"));
    }
}
