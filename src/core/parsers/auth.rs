// LogScout - core/parsers/auth.rs
//
// Authentication log dialect (auth.log / secure): sshd, sudo, su, PAM,
// account management.

use crate::core::model::ParsedLogEntry;
use crate::core::parsers::{extract, syslog};
use regex::Regex;
use std::sync::OnceLock;

/// Programs that write to the auth facility.
const AUTH_PROGRAMS: &[&str] = &[
    "sshd",
    "sudo",
    "su",
    "login",
    "passwd",
    "chpasswd",
    "useradd",
    "userdel",
    "usermod",
    "groupadd",
    "groupdel",
    "chage",
    "systemd-logind",
    "polkitd",
    "pkexec",
    "gdm-password",
    "unix_chkpwd",
];

/// Ordered (needle, action) pairs; the first needle found wins.
const ACTIONS: &[(&str, &str)] = &[
    ("Accepted ", "login_success"),
    ("Invalid user", "invalid_user"),
    ("invalid user", "invalid_user"),
    ("Failed password", "login_failed"),
    ("Failed publickey", "login_failed"),
    ("authentication failure", "login_failed"),
    ("FAILED LOGIN", "login_failed"),
    ("session opened", "session_opened"),
    ("session closed", "session_closed"),
    ("COMMAND=", "sudo"),
    ("Disconnected from", "disconnect"),
    ("Received disconnect", "disconnect"),
    ("Connection closed", "disconnect"),
    ("new user:", "user_added"),
    ("password changed", "password_change"),
];

fn sudo_user_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*([\w.@$-]+)\s+:\s.*COMMAND=").expect("auth: invalid sudo regex")
    })
}

fn new_user_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"new user: name=([\w.@$-]+)").expect("auth: invalid useradd regex"))
}

/// Classify an auth message into an action keyword.
pub fn classify_action(message: &str) -> Option<&'static str> {
    ACTIONS
        .iter()
        .find(|(needle, _)| message.contains(needle))
        .map(|(_, action)| *action)
}

fn program_base(program: &str) -> &str {
    program.rsplit('/').next().unwrap_or(program)
}

pub fn parse_line(line: &str) -> Option<ParsedLogEntry> {
    if line.trim().is_empty() {
        return None;
    }
    let Some(frame) = syslog::split_frame(line) else {
        return Some(syslog::raw_entry(line));
    };

    let mut entry = frame.into_entry(line);
    let msg = entry.message.as_str();

    entry.action = classify_action(msg).map(str::to_string);
    entry.user = sudo_user_re()
        .captures(msg)
        .or_else(|| new_user_re().captures(msg))
        .map(|c| c[1].to_string())
        .or_else(|| extract::extract_user(msg));
    entry.ip_address = extract::extract_ip(msg);
    Some(entry)
}

/// A syslog frame written by an authentication program, or carrying a PAM
/// module message.
pub fn recognizes(line: &str) -> bool {
    let Some(frame) = syslog::split_frame(line) else {
        return false;
    };
    let by_program = frame
        .program
        .as_deref()
        .map(program_base)
        .is_some_and(|p| AUTH_PROGRAMS.contains(&p));
    by_program || frame.message.contains("pam_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::Level;

    #[test]
    fn test_accepted_login() {
        let e = parse_line(
            "Jan 15 10:30:45 bastion sshd[4242]: Accepted publickey for deploy from 203.0.113.5 port 50022 ssh2",
        )
        .unwrap();
        assert_eq!(e.action.as_deref(), Some("login_success"));
        assert_eq!(e.user.as_deref(), Some("deploy"));
        assert_eq!(e.ip_address.as_deref(), Some("203.0.113.5"));
        assert_eq!(e.level, Level::Info);
    }

    #[test]
    fn test_failed_login_for_invalid_user() {
        let e = parse_line(
            "Jan 15 10:31:00 bastion sshd[4243]: Failed password for invalid user admin from 198.51.100.7 port 2222 ssh2",
        )
        .unwrap();
        assert_eq!(e.action.as_deref(), Some("invalid_user"));
        assert_eq!(e.user.as_deref(), Some("admin"));
        assert_eq!(e.level, Level::Error);
    }

    #[test]
    fn test_sudo_command() {
        let e = parse_line(
            "Jan 15 10:32:00 bastion sudo:   alice : TTY=pts/0 ; PWD=/home/alice ; USER=root ; COMMAND=/usr/bin/apt update",
        )
        .unwrap();
        assert_eq!(e.action.as_deref(), Some("sudo"));
        assert_eq!(e.user.as_deref(), Some("alice"));
    }

    #[test]
    fn test_session_and_useradd() {
        let e = parse_line(
            "Jan 15 10:33:00 bastion sshd[5000]: pam_unix(sshd:session): session closed for user deploy",
        )
        .unwrap();
        assert_eq!(e.action.as_deref(), Some("session_closed"));
        assert_eq!(e.user.as_deref(), Some("deploy"));

        let e = parse_line(
            "Jan 15 10:34:00 bastion useradd[77]: new user: name=svc, UID=998, GID=998, home=/home/svc",
        )
        .unwrap();
        assert_eq!(e.action.as_deref(), Some("user_added"));
        assert_eq!(e.user.as_deref(), Some("svc"));
    }

    #[test]
    fn test_recognizes_by_program() {
        assert!(recognizes("Jan 15 10:30:45 h sshd[1]: Connection closed by 1.2.3.4"));
        assert!(recognizes("Jan 15 10:30:45 h CRON[9]: pam_unix(cron:session): session opened"));
        assert!(!recognizes("Jan 15 10:30:45 h nginx[1]: worker started"));
        assert!(!recognizes("plain text"));
    }
}
