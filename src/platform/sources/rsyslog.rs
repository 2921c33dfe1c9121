// LogScout - platform/sources/rsyslog.rs
//
// rsyslog configuration reader. Handles the legacy selector syntax
// (`auth,authpriv.* /var/log/auth.log`) together with the parts of
// RainerScript that name files: `include(file=...)`, `action(type="omfile"
// file=...)` and `if ... then` filters.
//
// Lines are first folded into logical statements: a statement continues
// while parentheses are open or the line ends in a backslash.

use crate::core::model::{push_configured_file, ConfigSource, ConfiguredLogFile, LogType};
use crate::platform::fs::FileSystem;
use crate::platform::sources::include::{self, IncludeStack};
use crate::platform::sources::log_type_for_facilities;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// RainerScript objects that never name a log file directly.
const SKIPPED_OBJECTS: &[&str] = &[
    "module",
    "input",
    "global",
    "template",
    "ruleset",
    "main_queue",
    "parser",
    "lookup_table",
    "timezone",
    "license",
    "set",
    "unset",
    "call",
    "stop",
];

/// Destinations that are not plain files.
const NON_FILE_PREFIXES: &[&str] = &["|", "@", ":om", "*", "~", "?", "^", "/dev/"];

fn param_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)\b([a-z_.]+)\s*=\s*"([^"]*)""#).expect("rsyslog: invalid parameter regex")
    })
}

/// `name="value"` parameter of a RainerScript object, case-insensitive.
fn param<'a>(statement: &'a str, name: &str) -> Option<&'a str> {
    param_re()
        .captures_iter(statement)
        .find(|c| c[1].eq_ignore_ascii_case(name))
        .and_then(|c| c.get(2))
        .map(|m| m.as_str())
}

/// Net parenthesis depth change of `line`, ignoring quoted text.
fn paren_delta(line: &str) -> i32 {
    let mut depth = 0;
    let mut in_quote = false;
    let mut escaped = false;
    for c in line.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quote => escaped = true,
            '"' => in_quote = !in_quote,
            '(' if !in_quote => depth += 1,
            ')' if !in_quote => depth -= 1,
            _ => {}
        }
    }
    depth
}

/// Fold physical lines into logical statements, dropping comments and
/// blank lines.
fn statements(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut buf = String::new();
    let mut depth = 0i32;

    for raw in text.lines() {
        let line = raw.trim();
        if buf.is_empty() && (line.is_empty() || line.starts_with('#')) {
            continue;
        }

        let (content, continued) = match line.strip_suffix('\\') {
            Some(head) => (head.trim_end(), true),
            None => (line, false),
        };
        if !buf.is_empty() {
            buf.push(' ');
        }
        buf.push_str(content);
        depth += paren_delta(content);

        if depth <= 0 && !continued {
            out.push(std::mem::take(&mut buf));
            depth = 0;
        }
    }
    if !buf.is_empty() {
        out.push(buf);
    }
    out
}

fn keyword(statement: &str) -> &str {
    let end = statement
        .find(|c: char| c == '(' || c.is_whitespace())
        .unwrap_or(statement.len());
    &statement[..end]
}

/// Facilities selected by a selector such as `*.*;auth,authpriv.none` or
/// `mail.info;mail.!debug`. `.none` removes facilities from the set.
fn selected_facilities(selector: &str) -> Vec<String> {
    let mut included: Vec<String> = Vec::new();
    let mut excluded: Vec<String> = Vec::new();

    for clause in selector.split(';').map(str::trim).filter(|c| !c.is_empty()) {
        let Some((facilities, priority)) = clause.rsplit_once('.') else {
            continue;
        };
        let target = if priority.eq_ignore_ascii_case("none") {
            &mut excluded
        } else {
            &mut included
        };
        for facility in facilities.split(',').map(str::trim).filter(|f| !f.is_empty()) {
            let facility = facility.to_ascii_lowercase();
            if !target.contains(&facility) {
                target.push(facility);
            }
        }
    }

    included.retain(|f| !excluded.contains(f));
    included
}

/// File path written by a rule action, if the action is a plain file.
fn action_file(action: &str) -> Option<PathBuf> {
    let action = action.trim();
    if keyword(action).eq_ignore_ascii_case("action") {
        let kind = param(action, "type")?;
        if !kind.eq_ignore_ascii_case("omfile") {
            return None;
        }
        let file = param(action, "file")?;
        return file.starts_with('/').then(|| PathBuf::from(file));
    }

    let target = action.strip_prefix('-').unwrap_or(action);
    let target = target.split(';').next().unwrap_or("").trim();
    if target.is_empty() || NON_FILE_PREFIXES.iter().any(|p| target.starts_with(p)) {
        return None;
    }
    target.starts_with('/').then(|| PathBuf::from(target))
}

/// Rule target carried over to `&` continuation lines.
#[derive(Clone)]
struct Selection {
    log_type: LogType,
    facility: Option<String>,
}

struct RsyslogReader<'a> {
    fs: &'a dyn FileSystem,
    stack: IncludeStack,
    out: Vec<ConfiguredLogFile>,
}

impl<'a> RsyslogReader<'a> {
    fn read_file(&mut self, path: &Path) {
        if !self.stack.enter(path) {
            return;
        }
        match self.fs.read_to_string(path) {
            Ok(text) => self.parse_text(&text, path),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Cannot read rsyslog config");
            }
        }
        self.stack.leave();
    }

    fn include(&mut self, source: &Path, target: &str) {
        let target = include::resolve_relative(source, target);
        for file in include::resolve_include(self.fs, &target) {
            self.read_file(&file);
        }
    }

    fn push(&mut self, path: PathBuf, selection: &Selection) {
        let mut file = ConfiguredLogFile::new(path, selection.log_type, ConfigSource::Config);
        file.facility = selection.facility.clone();
        push_configured_file(&mut self.out, file);
    }

    fn parse_text(&mut self, text: &str, source: &Path) {
        let custom = Selection {
            log_type: LogType::Custom,
            facility: None,
        };
        let mut last: Option<Selection> = None;

        for statement in statements(text) {
            let statement = statement.trim();
            if statement.is_empty() || statement == "}" || statement == "{" {
                continue;
            }

            // Legacy `$` directive names are case-insensitive.
            if let Some(directive) = statement.strip_prefix('$') {
                let (name, rest) = directive
                    .split_once(char::is_whitespace)
                    .unwrap_or((directive, ""));
                let target = rest.trim();
                if name.eq_ignore_ascii_case("IncludeConfig") && !target.is_empty() {
                    self.include(source, target);
                }
                continue;
            }

            let word = keyword(statement);
            if word.eq_ignore_ascii_case("include") {
                if let Some(file) = param(statement, "file") {
                    self.include(source, file);
                }
                continue;
            }
            if SKIPPED_OBJECTS.iter().any(|k| word.eq_ignore_ascii_case(k)) {
                continue;
            }
            if word.eq_ignore_ascii_case("action") {
                // Bare action inside an if/ruleset block.
                if let Some(path) = action_file(statement) {
                    self.push(path, &custom);
                }
                continue;
            }

            if word == "if" {
                if let Some((_, action)) = statement.split_once(" then ") {
                    if let Some(path) = action_file(action.trim_start_matches('{')) {
                        self.push(path, &custom);
                    }
                }
                last = Some(custom.clone());
                continue;
            }

            if let Some(rest) = statement.strip_prefix('&') {
                if let (Some(selection), Some(path)) = (last.clone(), action_file(rest)) {
                    self.push(path, &selection);
                }
                continue;
            }

            if statement.starts_with(':') {
                // :property, compare-op, "value" action
                let action = property_filter_action(statement);
                if let Some(path) = action.and_then(action_file) {
                    self.push(path, &custom);
                }
                last = Some(custom.clone());
                continue;
            }

            let Some((selector, action)) = statement.split_once(char::is_whitespace) else {
                continue;
            };
            if !selector.contains('.') {
                tracing::trace!(source = %source.display(), statement, "Unrecognised rsyslog statement");
                continue;
            }
            let facilities = selected_facilities(selector);
            if facilities.is_empty() {
                continue;
            }
            let selection = Selection {
                log_type: log_type_for_facilities(&facilities),
                facility: Some(facilities.join(",")),
            };
            if let Some(path) = action_file(action) {
                self.push(path, &selection);
            }
            last = Some(selection);
        }
    }
}

/// Action part of a property-based filter line, following the quoted
/// comparison value.
fn property_filter_action(statement: &str) -> Option<&str> {
    let mut quotes = statement.match_indices('"').map(|(i, _)| i);
    let _open = quotes.next()?;
    let close = quotes.next()?;
    Some(statement[close + 1..].trim())
}

/// Read an rsyslog configuration (following includes) and return the files
/// its rules write to, first definition of a path winning.
pub fn parse_rsyslog_config(fs: &dyn FileSystem, path: &Path) -> Vec<ConfiguredLogFile> {
    let mut reader = RsyslogReader {
        fs,
        stack: IncludeStack::new(),
        out: Vec::new(),
    };
    reader.read_file(path);
    tracing::debug!(
        config = %path.display(),
        files = reader.out.len(),
        "rsyslog configuration read"
    );
    reader.out
}
