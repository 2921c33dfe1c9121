// LogScout - core/parsers/mod.rs
//
// Dialect parsers for syslog-derived logs.
//
// Every dialect follows the same contract:
//   - `parse_line` returns `None` for blank input and a best-effort
//     `ParsedLogEntry` (non-empty message) for anything else
//   - `recognizes` is the strict structural check used by format detection,
//     since `parse_line` accepts everything

pub mod auth;
pub mod daemon;
pub mod extract;
pub mod journald;
pub mod kernel;
pub mod mail;
pub mod syslog;

use crate::core::model::{LogType, ParsedLogEntry};
use serde::{Deserialize, Serialize};

/// Identifies one of the built-in dialect parsers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParserKind {
    Syslog,
    Auth,
    Kernel,
    Daemon,
    Mail,
    Journald,
}

impl ParserKind {
    pub fn all() -> &'static [ParserKind] {
        &[
            ParserKind::Syslog,
            ParserKind::Auth,
            ParserKind::Kernel,
            ParserKind::Daemon,
            ParserKind::Mail,
            ParserKind::Journald,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ParserKind::Syslog => "syslog",
            ParserKind::Auth => "auth",
            ParserKind::Kernel => "kernel",
            ParserKind::Daemon => "daemon",
            ParserKind::Mail => "mail",
            ParserKind::Journald => "journald",
        }
    }

    /// Look up a parser by its `as_str` name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        Self::all().iter().copied().find(|k| k.as_str() == lower)
    }

    /// Dedicated parser for a log type. Types without one use generic syslog.
    pub fn for_log_type(log_type: LogType) -> Self {
        match log_type {
            LogType::Auth => ParserKind::Auth,
            LogType::Kern => ParserKind::Kernel,
            LogType::Daemon => ParserKind::Daemon,
            LogType::Mail => ParserKind::Mail,
            _ => ParserKind::Syslog,
        }
    }

    pub fn parse_line(&self, line: &str) -> Option<ParsedLogEntry> {
        match self {
            ParserKind::Syslog => syslog::parse_line(line),
            ParserKind::Auth => auth::parse_line(line),
            ParserKind::Kernel => kernel::parse_line(line),
            ParserKind::Daemon => daemon::parse_line(line),
            ParserKind::Mail => mail::parse_line(line),
            ParserKind::Journald => journald::parse_line(line),
        }
    }

    pub fn recognizes(&self, line: &str) -> bool {
        match self {
            ParserKind::Syslog => syslog::recognizes(line),
            ParserKind::Auth => auth::recognizes(line),
            ParserKind::Kernel => kernel::recognizes(line),
            ParserKind::Daemon => daemon::recognizes(line),
            ParserKind::Mail => mail::recognizes(line),
            ParserKind::Journald => journald::recognizes(line),
        }
    }
}

impl std::fmt::Display for ParserKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
