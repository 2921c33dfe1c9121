// LogScout - core/parsers/extract.rs
//
// Heuristic field extraction shared by the dialect parsers. Everything here
// scans the free-text message fragment, never the whole line, and returns
// `None` rather than a guess when nothing convincing is found.

use crate::core::model::Level;
use regex::Regex;
use std::net::Ipv6Addr;
use std::sync::OnceLock;

/// Keywords checked case-insensitively, most severe level first.
const ERROR_KEYWORDS: &[&str] = &[
    "error",
    "fail",
    "fatal",
    "critical",
    "panic",
    "denied",
    "refused",
    "segfault",
    "emerg",
    "alert",
];
const WARNING_KEYWORDS: &[&str] = &["warn", "deprecated", "timed out", "timeout", "retrying"];
const DEBUG_KEYWORDS: &[&str] = &["debug", "trace"];

/// Infer a level from keywords in `message`. Defaults to `Info`.
pub fn infer_level(message: &str) -> Level {
    let lower = message.to_lowercase();
    let hit = |words: &[&str]| words.iter().any(|w| lower.contains(w));

    if hit(ERROR_KEYWORDS) {
        Level::Error
    } else if hit(WARNING_KEYWORDS) {
        Level::Warning
    } else if hit(DEBUG_KEYWORDS) {
        Level::Debug
    } else {
        Level::Info
    }
}

// =============================================================================
// IP addresses
// =============================================================================

fn ipv4_candidate_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}").expect("extract: invalid IPv4 regex")
    })
}

fn bracketed_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\[([0-9A-Fa-f:.]+(?:%\w+)?)\]").expect("extract: invalid bracket regex")
    })
}

/// Dotted quad with every octet in 0-255.
pub fn is_valid_ipv4(candidate: &str) -> bool {
    let octets: Vec<&str> = candidate.split('.').collect();
    octets.len() == 4
        && octets
            .iter()
            .all(|o| !o.is_empty() && o.len() <= 3 && o.parse::<u8>().is_ok())
}

/// First valid IPv4 address in `message`.
///
/// A candidate glued to further digits or dots (`1.2.3.4.5`, `v10.0.0.1.2`)
/// is part of a version string, not an address.
pub fn extract_ipv4(message: &str) -> Option<String> {
    let bytes = message.as_bytes();
    for m in ipv4_candidate_re().find_iter(message) {
        let before = m.start().checked_sub(1).map(|i| bytes[i]);
        let after = bytes.get(m.end()).copied();
        let after_next = bytes.get(m.end() + 1).copied();

        let glued_before = matches!(before, Some(b) if b.is_ascii_digit() || b == b'.');
        let glued_after = matches!(after, Some(b) if b.is_ascii_digit())
            || (after == Some(b'.') && matches!(after_next, Some(b) if b.is_ascii_digit()));

        if !glued_before && !glued_after && is_valid_ipv4(m.as_str()) {
            return Some(m.as_str().to_string());
        }
    }
    None
}

fn parses_as_ipv6(candidate: &str) -> bool {
    let addr = candidate.split('%').next().unwrap_or(candidate);
    addr.contains(':') && addr.parse::<Ipv6Addr>().is_ok()
}

/// First IPv6 address in `message`, bracketed (`[fe80::1]`) or bare.
pub fn extract_ipv6(message: &str) -> Option<String> {
    for caps in bracketed_re().captures_iter(message) {
        let inner = &caps[1];
        if parses_as_ipv6(inner) {
            return Some(inner.to_string());
        }
    }

    message
        .split(|c: char| c.is_whitespace() || ",;()<>\"'=".contains(c))
        .map(|tok| tok.trim_end_matches('.'))
        .find(|tok| tok.len() >= 2 && parses_as_ipv6(tok))
        .map(str::to_string)
}

/// First IP address of either family, IPv4 preferred.
pub fn extract_ip(message: &str) -> Option<String> {
    extract_ipv4(message).or_else(|| extract_ipv6(message))
}

// =============================================================================
// User names
// =============================================================================

const USER_CHARS: &str = r"[\w.@$-]+";

fn user_patterns() -> &'static [Regex; 3] {
    static RE: OnceLock<[Regex; 3]> = OnceLock::new();
    RE.get_or_init(|| {
        let re = |p: String| Regex::new(&p).expect("extract: invalid user regex");
        [
            re(format!(r"\bfor user ({USER_CHARS})")),
            re(format!(
                r"\b(?:Accepted|Failed) \S+ for (?:invalid user )?({USER_CHARS})"
            )),
            re(format!(r"\buser=({USER_CHARS})")),
        ]
    })
}

fn bare_user_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"\buser ({USER_CHARS})")).expect("extract: invalid user regex")
    })
}

/// Extract a user name, trying in order: `for user X`, `Accepted <method>
/// for X`, `user=X`, then `user X` unless it directly follows `for `.
pub fn extract_user(message: &str) -> Option<String> {
    for re in user_patterns() {
        if let Some(caps) = re.captures(message) {
            return Some(caps[1].to_string());
        }
    }

    bare_user_re()
        .captures_iter(message)
        .find(|caps| {
            let start = caps.get(0).map(|m| m.start()).unwrap_or(0);
            !message[..start].ends_with("for ")
        })
        .map(|caps| caps[1].to_string())
}
