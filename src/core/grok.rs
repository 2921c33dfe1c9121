// LogScout - core/grok.rs
//
// Grok-style pattern compiler. Turns `%{NAME:capture}` templates into
// anchored regular expressions.
//
// Compilation pipeline:
//   1. Composite macros (SYSLOGTIMESTAMP, IPORHOST, ...) are rewritten into
//      base-macro references, iteratively, with a hard pass limit. The
//      composite's capture name becomes an enclosing named group and its
//      sub-captures are namespaced under it (`ts` -> `ts_month`, `ts_day`).
//   2. Literal whitespace runs in the template collapse to `\s+`.
//   3. Base macros are substituted with their regex fragments.
//   4. The expression is anchored at both ends.
//
// Compilation never fails outward: an unknown macro, a runaway expansion or
// an invalid resulting regex produces a `CompiledPattern` that matches
// nothing and carries the error for diagnostics.

use crate::util::constants;
use crate::util::error::GrokError;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

// =============================================================================
// Macro tables
// =============================================================================

/// Base macros: name -> regex fragment. Fragments never contain literal
/// whitespace or capture groups.
pub const BASE_MACROS: &[(&str, &str)] = &[
    ("USERNAME", r"[a-zA-Z0-9._-]+"),
    ("USER", r"[a-zA-Z0-9._-]+"),
    ("INT", r"[+-]?\d+"),
    ("POSINT", r"\d+"),
    ("NONNEGINT", r"\d+"),
    ("NUMBER", r"[+-]?(?:\d+(?:\.\d*)?|\.\d+)"),
    ("BASE16NUM", r"(?:0[xX])?[0-9A-Fa-f]+"),
    ("WORD", r"\w+"),
    ("NOTSPACE", r"\S+"),
    ("SPACE", r"\s*"),
    ("DATA", r".*?"),
    ("GREEDYDATA", r".*"),
    ("QUOTEDSTRING", r#""(?:[^"\\]|\\.)*""#),
    ("UUID", r"[A-Fa-f0-9]{8}-(?:[A-Fa-f0-9]{4}-){3}[A-Fa-f0-9]{12}"),
    (
        "IPV4",
        r"(?:(?:25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)\.){3}(?:25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)",
    ),
    ("IPV6", r"(?:[0-9A-Fa-f]{0,4}:){2,7}[0-9A-Fa-f]{0,4}(?:%\w+)?"),
    (
        "HOSTNAME",
        r"[0-9A-Za-z][0-9A-Za-z_-]{0,62}(?:\.[0-9A-Za-z_-]{1,63})*\.?",
    ),
    (
        "MONTH",
        r"(?:Jan(?:uary)?|Feb(?:ruary)?|Mar(?:ch)?|Apr(?:il)?|May|June?|July?|Aug(?:ust)?|Sept?(?:ember)?|Oct(?:ober)?|Nov(?:ember)?|Dec(?:ember)?)",
    ),
    ("MONTHNUM", r"(?:0?[1-9]|1[0-2])"),
    ("MONTHDAY", r"(?:0?[1-9]|[12]\d|3[01])"),
    ("YEAR", r"\d{4}"),
    ("HOUR", r"(?:[01]?\d|2[0-3])"),
    ("MINUTE", r"[0-5]\d"),
    ("SECOND", r"(?:[0-5]?\d|60)(?:[.,]\d+)?"),
    ("TIME", r"(?:[01]?\d|2[0-3]):[0-5]\d:(?:[0-5]\d|60)(?:[.,]\d+)?"),
    ("ISO8601_TIMEZONE", r"(?:Z|[+-](?:[01]?\d|2[0-3]):?[0-5]\d)"),
    ("PROG", r"[\w._/%-]+"),
    ("PID", r"\d+"),
    (
        "LOGLEVEL",
        r"(?i:alert|trace|debug|notice|info(?:rmation)?|warn(?:ing)?|err(?:or)?|crit(?:ical)?|fatal|severe|emerg(?:ency)?)",
    ),
    ("URIPATHPARAM", r"\S+"),
    ("SYSLOGPRI", r"<\d{1,3}>"),
];

/// Composite macros: name -> template over other macros. Sub-capture names
/// start with `_` and are prefixed with the parent capture name on expansion.
pub const COMPOSITE_MACROS: &[(&str, &str)] = &[
    (
        "SYSLOGTIMESTAMP",
        "%{MONTH:_month} +%{MONTHDAY:_day} %{TIME:_time}",
    ),
    (
        "TIMESTAMP_ISO8601",
        "%{YEAR:_year}-%{MONTHNUM:_month}-%{MONTHDAY:_day}[T ]%{HOUR:_hour}:?%{MINUTE:_minute}(?::?%{SECOND:_second})?%{ISO8601_TIMEZONE:_tz}?",
    ),
    ("IP", "(?:%{IPV6:_v6}|%{IPV4:_v4})"),
    ("IPORHOST", "(?:%{IP:_ip}|%{HOSTNAME:_host})"),
    ("SYSLOGHOST", "%{IPORHOST:_host}"),
    ("SYSLOGPROG", r"%{PROG:_program}(?:\[%{PID:_pid}\])?"),
    (
        "HTTPDATE",
        "%{MONTHDAY:_day}/%{MONTH:_month}/%{YEAR:_year}:%{TIME:_time} %{INT:_tz}",
    ),
];

fn lookup(table: &[(&str, &'static str)], name: &str) -> Option<&'static str> {
    table.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
}

/// Matches a macro reference: `%{NAME}` or `%{NAME:capture}`.
fn reference_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"%\{(\w+)(?::([^}]*))?\}").expect("grok: invalid reference regex"))
}

/// Matches a namespaced sub-capture inside a composite body.
fn sub_capture_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"%\{(\w+):(_\w+)\}").expect("grok: invalid sub-capture regex"))
}

// =============================================================================
// Compiled pattern
// =============================================================================

/// A compiled grok template.
///
/// `regex` is `None` when compilation failed; such a pattern never matches.
#[derive(Debug)]
pub struct CompiledPattern {
    pub source_template: String,
    /// Capture names in the order they appear in the original (pre-expansion)
    /// template.
    pub capture_names: Vec<String>,
    regex: Option<Regex>,
    error: Option<GrokError>,
}

impl CompiledPattern {
    fn never_matching(template: &str, capture_names: Vec<String>, error: GrokError) -> Self {
        tracing::debug!(template, error = %error, "Grok template compiles to a never-matching pattern");
        Self {
            source_template: template.to_string(),
            capture_names,
            regex: None,
            error: Some(error),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.regex.is_some()
    }

    pub fn error(&self) -> Option<&GrokError> {
        self.error.as_ref()
    }

    pub fn into_error(self) -> Option<GrokError> {
        self.error
    }

    /// The final anchored expression, if compilation succeeded.
    pub fn as_regex_str(&self) -> Option<&str> {
        self.regex.as_ref().map(Regex::as_str)
    }

    pub fn is_match(&self, line: &str) -> bool {
        self.regex.as_ref().is_some_and(|re| re.is_match(line))
    }

    /// Match `line` and return the value of every capture named in the
    /// original template. Composite captures yield the full text their
    /// sub-parts matched. Optional captures that did not participate are
    /// omitted.
    pub fn captures(&self, line: &str) -> Option<HashMap<String, String>> {
        let caps = self.regex.as_ref()?.captures(line)?;
        let mut out = HashMap::with_capacity(self.capture_names.len());
        for name in &self.capture_names {
            if let Some(m) = caps.name(name) {
                out.insert(name.clone(), m.as_str().to_string());
            }
        }
        Some(out)
    }
}

// =============================================================================
// Compilation
// =============================================================================

/// Compile a template. Never fails: see module docs.
pub fn compile(template: &str) -> CompiledPattern {
    let capture_names = template_capture_names(template);

    if template.len() > constants::MAX_GROK_TEMPLATE_LENGTH {
        return CompiledPattern::never_matching(
            template,
            capture_names,
            GrokError::PatternTooLong {
                length: template.len(),
                max_length: constants::MAX_GROK_TEMPLATE_LENGTH,
            },
        );
    }

    let expanded = match expand_composites(
        template,
        COMPOSITE_MACROS,
        constants::MAX_GROK_EXPANSION_PASSES,
    ) {
        Ok(e) => e,
        Err(e) => return CompiledPattern::never_matching(template, capture_names, e),
    };

    let collapsed = collapse_whitespace(&expanded);

    let substituted = match substitute_base(&collapsed, BASE_MACROS) {
        Ok(s) => s,
        Err(e) => return CompiledPattern::never_matching(template, capture_names, e),
    };

    let anchored = format!("^(?:{substituted})$");
    if anchored.len() > constants::MAX_EXPANDED_PATTERN_LENGTH {
        return CompiledPattern::never_matching(
            template,
            capture_names,
            GrokError::PatternTooLong {
                length: anchored.len(),
                max_length: constants::MAX_EXPANDED_PATTERN_LENGTH,
            },
        );
    }

    match Regex::new(&anchored) {
        Ok(regex) => CompiledPattern {
            source_template: template.to_string(),
            capture_names,
            regex: Some(regex),
            error: None,
        },
        Err(source) => CompiledPattern::never_matching(
            template,
            capture_names,
            GrokError::InvalidRegex {
                template: template.to_string(),
                source,
            },
        ),
    }
}

/// Compile through a process-wide cache keyed by template text.
pub fn compile_cached(template: &str) -> Arc<CompiledPattern> {
    static CACHE: OnceLock<Mutex<HashMap<String, Arc<CompiledPattern>>>> = OnceLock::new();
    let cache = CACHE.get_or_init(|| Mutex::new(HashMap::new()));

    if let Some(hit) = cache
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .get(template)
    {
        return Arc::clone(hit);
    }

    // Compile outside the lock; a racing thread may compile the same template
    // twice, which is harmless.
    let compiled = Arc::new(compile(template));
    cache
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .entry(template.to_string())
        .or_insert_with(|| Arc::clone(&compiled));
    compiled
}

/// Match `line` against `template` and return its captures by original name.
pub fn parse(line: &str, template: &str) -> Option<HashMap<String, String>> {
    compile_cached(template).captures(line)
}

/// Ordered capture names declared in a template, before any expansion.
pub fn template_capture_names(template: &str) -> Vec<String> {
    reference_re()
        .captures_iter(template)
        .filter_map(|c| c.get(2).map(|m| m.as_str().to_string()))
        .filter(|name| !name.is_empty())
        .collect()
}

/// Rewrite composite references into base references using `rules`, at most
/// `max_passes` times. Returns `ExpansionLimit` if composites remain.
pub fn expand_composites(
    template: &str,
    rules: &[(&str, &'static str)],
    max_passes: usize,
) -> Result<String, GrokError> {
    let mut current = template.to_string();

    for _ in 0..max_passes {
        let mut changed = false;
        let next = reference_re().replace_all(&current, |caps: &Captures| {
            let name = &caps[1];
            match lookup(rules, name) {
                Some(body) => {
                    changed = true;
                    let parent = caps.get(2).map(|m| m.as_str()).filter(|s| !s.is_empty());
                    let body = namespace_body(body, parent);
                    match parent {
                        Some(cap) => format!("(?P<{cap}>{body})"),
                        None => format!("(?:{body})"),
                    }
                }
                None => caps[0].to_string(),
            }
        });
        if !changed {
            return Ok(next.into_owned());
        }
        current = next.into_owned();
    }

    // One last check: the final pass may have produced only base references.
    let leftover = reference_re()
        .captures_iter(&current)
        .any(|c| lookup(rules, &c[1]).is_some());
    if leftover {
        Err(GrokError::ExpansionLimit {
            template: template.to_string(),
            passes: max_passes,
        })
    } else {
        Ok(current)
    }
}

/// Prefix a composite body's `_sub` captures with the parent capture name,
/// or drop them when the composite itself is unnamed.
fn namespace_body(body: &str, parent: Option<&str>) -> String {
    sub_capture_re()
        .replace_all(body, |caps: &Captures| match parent {
            Some(p) => format!("%{{{}:{}{}}}", &caps[1], p, &caps[2]),
            None => format!("%{{{}}}", &caps[1]),
        })
        .into_owned()
}

/// Substitute base macro references with their fragments.
fn substitute_base(expr: &str, table: &[(&str, &'static str)]) -> Result<String, GrokError> {
    let mut unknown: Option<String> = None;
    let out = reference_re().replace_all(expr, |caps: &Captures| {
        let name = &caps[1];
        match lookup(table, name) {
            Some(fragment) => match caps.get(2).map(|m| m.as_str()).filter(|s| !s.is_empty()) {
                Some(cap) => format!("(?P<{cap}>{fragment})"),
                None => format!("(?:{fragment})"),
            },
            None => {
                unknown.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });
    match unknown {
        Some(name) => Err(GrokError::UnknownMacro { name }),
        None => Ok(out.into_owned()),
    }
}

/// Collapse literal space/tab runs outside character classes into `\s+`.
/// A run already followed by a quantifier becomes bare `\s` so the
/// quantifier is not doubled (`" +"` -> `\s+`, `" *"` -> `\s*`).
pub fn collapse_whitespace(expr: &str) -> String {
    let chars: Vec<char> = expr.chars().collect();
    let mut out = String::with_capacity(expr.len() + 8);
    let mut in_class = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\\' => {
                out.push(c);
                if let Some(&next) = chars.get(i + 1) {
                    out.push(next);
                    i += 1;
                }
            }
            '[' if !in_class => {
                in_class = true;
                out.push(c);
            }
            ']' if in_class => {
                in_class = false;
                out.push(c);
            }
            ' ' | '\t' if !in_class => {
                while matches!(chars.get(i + 1), Some(' ' | '\t')) {
                    i += 1;
                }
                let quantified = match chars.get(i + 1) {
                    Some('+' | '*' | '?') => true,
                    Some('{') => chars.get(i + 2).is_some_and(|c| c.is_ascii_digit()),
                    _ => false,
                };
                out.push_str(if quantified { r"\s" } else { r"\s+" });
            }
            _ => out.push(c),
        }
        i += 1;
    }
    out
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SSHD_TEMPLATE: &str =
        r"%{SYSLOGTIMESTAMP:timestamp} %{IPORHOST:hostname} %{PROG:program}\[%{PID:pid}\]: %{GREEDYDATA:message}";

    #[test]
    fn test_composite_template_matches_sshd_line() {
        let pattern = compile(SSHD_TEMPLATE);
        assert!(pattern.is_valid(), "error: {:?}", pattern.error());
        let caps = pattern
            .captures("Jan 15 10:30:45 hostname sshd[12345]: Accepted password for user")
            .expect("line should match");
        assert_eq!(caps["timestamp"], "Jan 15 10:30:45");
        assert_eq!(caps["hostname"], "hostname");
        assert_eq!(caps["program"], "sshd");
        assert_eq!(caps["pid"], "12345");
        assert_eq!(caps["message"], "Accepted password for user");
    }

    #[test]
    fn test_capture_names_come_from_original_template() {
        let pattern = compile(SSHD_TEMPLATE);
        assert_eq!(
            pattern.capture_names,
            vec!["timestamp", "hostname", "program", "pid", "message"]
        );
    }

    #[test]
    fn test_space_padded_day_matches() {
        let caps = parse(
            "Feb  5 01:02:03 box CRON[1]: job",
            SSHD_TEMPLATE,
        )
        .expect("double space should collapse");
        assert_eq!(caps["timestamp"], "Feb  5 01:02:03");
    }

    #[test]
    fn test_unknown_macro_never_matches() {
        let pattern = compile("%{NOSUCHMACRO:x} %{GREEDYDATA:message}");
        assert!(!pattern.is_valid());
        assert!(matches!(
            pattern.error(),
            Some(GrokError::UnknownMacro { name }) if name == "NOSUCHMACRO"
        ));
        assert!(!pattern.is_match("anything at all"));
        assert!(pattern.captures("anything at all").is_none());
    }

    #[test]
    fn test_invalid_regex_never_matches() {
        let pattern = compile("%{WORD:x} (unclosed");
        assert!(!pattern.is_valid());
        assert!(!pattern.is_match("foo (unclosed"));
    }

    #[test]
    fn test_same_composite_twice_is_namespaced() {
        let pattern = compile("%{SYSLOGTIMESTAMP:start} to %{SYSLOGTIMESTAMP:end}");
        assert!(pattern.is_valid(), "error: {:?}", pattern.error());
        let re = pattern.as_regex_str().unwrap();
        assert!(re.contains("start_month") && re.contains("end_month"));
        let caps = pattern
            .captures("Jan 1 00:00:00 to Feb 2 11:11:11")
            .unwrap();
        assert_eq!(caps["start"], "Jan 1 00:00:00");
        assert_eq!(caps["end"], "Feb 2 11:11:11");
    }

    #[test]
    fn test_nested_composites_expand_fully() {
        let pattern = compile("%{IPORHOST:client} %{GREEDYDATA:rest}");
        let re = pattern.as_regex_str().unwrap();
        assert!(re.contains("client_ip_v4"));
        assert!(!re.contains("%{"));
        let caps = pattern.captures("10.0.0.7 GET /").unwrap();
        assert_eq!(caps["client"], "10.0.0.7");
    }

    #[test]
    fn test_unnamed_composite_has_no_sub_groups() {
        let pattern = compile("%{SYSLOGTIMESTAMP} %{GREEDYDATA:message}");
        let re = pattern.as_regex_str().unwrap();
        assert!(!re.contains("_month"));
        assert_eq!(pattern.capture_names, vec!["message"]);
        assert!(pattern.is_match("Mar 3 03:03:03 hello"));
    }

    #[test]
    fn test_self_referential_rules_hit_pass_limit() {
        let rules: &[(&str, &'static str)] = &[("LOOP", "x%{LOOP:_again}")];
        let result = expand_composites("%{LOOP:a}", rules, 8);
        assert!(matches!(
            result,
            Err(GrokError::ExpansionLimit { passes: 8, .. })
        ));
    }

    #[test]
    fn test_collapse_whitespace_does_not_double_quantifier() {
        assert_eq!(collapse_whitespace("a  b"), r"a\s+b");
        assert_eq!(collapse_whitespace("a +b"), r"a\s+b");
        assert_eq!(collapse_whitespace("a *b"), r"a\s*b");
        assert_eq!(collapse_whitespace("a {2}b"), r"a\s{2}b");
        // Inside a class and escaped spaces are left alone.
        assert_eq!(collapse_whitespace("[T ]"), "[T ]");
        assert_eq!(collapse_whitespace(r"a\ b"), r"a\ b");
    }

    #[test]
    fn test_iso_timestamp_composite() {
        let caps = parse(
            "2024-03-01T12:00:01.123456+02:00 web nginx: started",
            "%{TIMESTAMP_ISO8601:ts} %{HOSTNAME:host} %{PROG:prog}: %{GREEDYDATA:message}",
        )
        .unwrap();
        assert_eq!(caps["ts"], "2024-03-01T12:00:01.123456+02:00");
        assert_eq!(caps["host"], "web");
    }

    #[test]
    fn test_optional_capture_omitted_when_absent() {
        let template = "%{SYSLOGTIMESTAMP:ts} %{SYSLOGPROG:prog}: %{GREEDYDATA:message}";
        let caps = parse("Jan 2 03:04:05 kernel: boot", template).unwrap();
        assert_eq!(caps["prog"], "kernel");
        assert!(!caps.contains_key("prog_pid"));
    }

    #[test]
    fn test_compile_cached_returns_shared_instance() {
        let a = compile_cached("%{WORD:w}");
        let b = compile_cached("%{WORD:w}");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_template_too_long_never_matches() {
        let long = "a".repeat(constants::MAX_GROK_TEMPLATE_LENGTH + 1);
        let pattern = compile(&long);
        assert!(matches!(
            pattern.error(),
            Some(GrokError::PatternTooLong { .. })
        ));
    }
}
