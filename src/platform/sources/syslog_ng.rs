// LogScout - platform/sources/syslog_ng.rs
//
// syslog-ng configuration reader.
//
// syslog-ng wires sources, filters and destinations together in `log`
// statements, so files are found in two passes: first collect every
// `destination` (name -> file paths) and `filter` (name -> facilities)
// across the main file and its `@include`s, then resolve each `log`
// statement against those maps. Inline `destination { file(...); }` and
// `filter { facility(...); }` inside a `log` body are honoured too.

use crate::core::model::{push_configured_file, ConfigSource, ConfiguredLogFile, LogType};
use crate::platform::fs::FileSystem;
use crate::platform::sources::include::{self, IncludeStack};
use crate::platform::sources::log_type_for_facilities;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

fn statement_head_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"([A-Za-z_][\w-]*)(?:\s+([\w.-]+))?\s*\{").expect("syslog_ng: invalid statement regex")
    })
}

fn file_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\bfile\s*\(\s*(?:"([^"]+)"|'([^']+)'|([^\s)"']+))"#)
            .expect("syslog_ng: invalid file regex")
    })
}

fn facility_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\bnot\s+)?\bfacility\s*\(([^)]*)\)").expect("syslog_ng: invalid facility regex")
    })
}

fn reference_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(filter|destination)\s*\(\s*([\w.-]+)\s*\)").expect("syslog_ng: invalid reference regex")
    })
}

fn selective_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(program|match|message|host)\s*\(").expect("syslog_ng: invalid selector regex")
    })
}

/// One top-level `kind [name] { body };` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Statement {
    kind: String,
    name: Option<String>,
    body: String,
}

/// Facilities a filter admits.
#[derive(Debug, Clone, Default)]
struct FilterInfo {
    facilities: Vec<String>,
    /// Matches on program/message/host rather than facility.
    selective: bool,
}

impl FilterInfo {
    fn from_body(body: &str) -> Self {
        let mut facilities = Vec::new();
        for caps in facility_re().captures_iter(body) {
            if caps.get(1).is_some() {
                continue;
            }
            for f in caps[2]
                .split(|c: char| c == ',' || c.is_whitespace())
                .map(str::trim)
                .filter(|f| !f.is_empty())
            {
                let f = f.to_ascii_lowercase();
                if !facilities.contains(&f) {
                    facilities.push(f);
                }
            }
        }
        Self {
            facilities,
            selective: selective_re().is_match(body),
        }
    }
}

/// Remove `#` comments outside quoted strings.
fn strip_comment(line: &str) -> &str {
    let mut quote: Option<char> = None;
    for (i, c) in line.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '#' => return &line[..i],
            None => {}
        }
    }
    line
}

/// Index just past the `}` matching the `{` at `open`, ignoring braces in
/// quoted strings. `None` if unbalanced.
fn matching_brace(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (i, c) in text[open..].char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '{' => depth += 1,
            None if c == '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(open + i + 1);
                }
            }
            None => {}
        }
    }
    None
}

/// Split comment-free config text into top-level statements.
fn scan_statements(text: &str) -> Vec<Statement> {
    let mut out = Vec::new();
    let mut pos = 0;
    while let Some(caps) = statement_head_re().captures_at(text, pos) {
        let Some(whole) = caps.get(0) else { break };
        let open = whole.end() - 1;
        let Some(close) = matching_brace(text, open) else {
            tracing::debug!("Unbalanced braces in syslog-ng config, stopping");
            break;
        };
        out.push(Statement {
            kind: caps[1].to_string(),
            name: caps.get(2).map(|m| m.as_str().to_string()),
            body: text[open + 1..close - 1].to_string(),
        });
        pos = close;
    }
    out
}

/// Literal file paths named in a destination body. Paths built from
/// `$MACRO`s are per-message and cannot be enumerated.
fn destination_files(body: &str) -> Vec<PathBuf> {
    file_re()
        .captures_iter(body)
        .filter_map(|c| c.get(1).or_else(|| c.get(2)).or_else(|| c.get(3)))
        .map(|m| m.as_str())
        .filter(|p| p.starts_with('/') && !p.contains('$'))
        .map(PathBuf::from)
        .collect()
}

struct SyslogNgReader<'a> {
    fs: &'a dyn FileSystem,
    stack: IncludeStack,
    statements: Vec<Statement>,
}

impl<'a> SyslogNgReader<'a> {
    fn read_file(&mut self, path: &Path) {
        if !self.stack.enter(path) {
            return;
        }
        match self.fs.read_to_string(path) {
            Ok(text) => self.collect(&text, path),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Cannot read syslog-ng config");
            }
        }
        self.stack.leave();
    }

    /// Gather statements, recursing into `@include`s where they appear.
    fn collect(&mut self, text: &str, source: &Path) {
        let mut pending = String::new();
        for raw in text.lines() {
            let line = strip_comment(raw).trim();
            if let Some(directive) = line.strip_prefix('@') {
                if let Some(target) = directive.strip_prefix("include") {
                    self.statements.extend(scan_statements(&pending));
                    pending.clear();
                    let target = target.trim().trim_end_matches(';').trim().trim_matches(['"', '\'']);
                    let target = include::resolve_relative(source, target);
                    for file in include::resolve_include(self.fs, &target) {
                        self.read_file(&file);
                    }
                }
                continue;
            }
            pending.push_str(line);
            pending.push('\n');
        }
        self.statements.extend(scan_statements(&pending));
    }

    fn resolve(self) -> Vec<ConfiguredLogFile> {
        let mut destinations: HashMap<&str, Vec<PathBuf>> = HashMap::new();
        let mut filters: HashMap<&str, FilterInfo> = HashMap::new();

        for st in &self.statements {
            let Some(name) = st.name.as_deref() else { continue };
            match st.kind.as_str() {
                "destination" => {
                    destinations.insert(name, destination_files(&st.body));
                }
                "filter" => {
                    filters.insert(name, FilterInfo::from_body(&st.body));
                }
                _ => {}
            }
        }

        let mut out: Vec<ConfiguredLogFile> = Vec::new();
        for st in self.statements.iter().filter(|s| s.kind == "log") {
            let inline = FilterInfo::from_body(&st.body);
            let mut facilities = inline.facilities;
            let mut selective = inline.selective;
            let mut paths: Vec<PathBuf> = Vec::new();

            for caps in reference_re().captures_iter(&st.body) {
                let name = &caps[2];
                match &caps[1] {
                    "filter" => match filters.get(name) {
                        Some(info) => {
                            selective |= info.selective;
                            for f in &info.facilities {
                                if !facilities.contains(f) {
                                    facilities.push(f.clone());
                                }
                            }
                        }
                        None => tracing::debug!(filter = name, "Log statement references unknown filter"),
                    },
                    _ => match destinations.get(name) {
                        Some(files) => paths.extend(files.iter().cloned()),
                        None => {
                            tracing::debug!(destination = name, "Log statement references unknown destination")
                        }
                    },
                }
            }
            // Inline destinations: file() directly inside the log body.
            paths.extend(destination_files(&st.body));

            let log_type = if facilities.is_empty() && selective {
                LogType::Custom
            } else {
                log_type_for_facilities(&facilities)
            };
            let facility = (!facilities.is_empty()).then(|| facilities.join(","));

            for path in paths {
                let mut file = ConfiguredLogFile::new(path, log_type, ConfigSource::Config);
                file.facility = facility.clone();
                push_configured_file(&mut out, file);
            }
        }
        out
    }
}

/// Read a syslog-ng configuration (following `@include`s) and return the
/// files its `log` statements write to, first definition of a path winning.
pub fn parse_syslog_ng_config(fs: &dyn FileSystem, path: &Path) -> Vec<ConfiguredLogFile> {
    let mut reader = SyslogNgReader {
        fs,
        stack: IncludeStack::new(),
        statements: Vec::new(),
    };
    reader.read_file(path);
    let files = reader.resolve();
    tracing::debug!(
        config = %path.display(),
        files = files.len(),
        "syslog-ng configuration read"
    );
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::fs::{LocalFs, PathTranslator};
    use std::fs;

    const DEBIAN_CONF: &str = r#"
@version: 3.38
@include "scl.conf"

# First, set some global options.
options { chain_hostnames(off); flush_lines(0); use_dns(no); };

source s_src {
       system();
       internal();
};

destination d_auth { file("/var/log/auth.log"); };
destination d_kern { file("/var/log/kern.log"); };
destination d_mail { file("/var/log/mail.log" template("${ISODATE} ${MSG}\n")); };
destination d_syslog { file("/var/log/syslog"); };
destination d_per_host { file("/var/log/hosts/$HOST/messages"); };
destination d_net { network("10.0.0.1" port(514)); };

filter f_auth { facility(auth, authpriv) and not filter(f_debug); };
filter f_kern { facility(kern) and not filter(f_debug); };
filter f_mail { facility(mail) and not filter(f_debug); };
filter f_syslog3 { not facility(auth, authpriv, mail) and not filter(f_debug); };
filter f_sshd { program("sshd"); };

log { source(s_src); filter(f_auth); destination(d_auth); };
log { source(s_src); filter(f_kern); destination(d_kern); };
log { source(s_src); filter(f_mail); destination(d_mail); };
log { source(s_src); filter(f_syslog3); destination(d_syslog); };
log { source(s_src); destination(d_per_host); destination(d_net); };
log { source(s_src); filter(f_sshd); destination { file("/var/log/sshd.log"); }; };

@include "/etc/syslog-ng/conf.d/*.conf"
"#;

    fn write(root: &Path, host_path: &str, content: &str) {
        let p = root.join(host_path.trim_start_matches('/'));
        fs::create_dir_all(p.parent().unwrap()).unwrap();
        fs::write(p, content).unwrap();
    }

    fn host(dir: &tempfile::TempDir) -> LocalFs {
        LocalFs::new(PathTranslator::new(Some(dir.path().to_path_buf())))
    }

    #[test]
    fn test_debian_default_config() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "/etc/syslog-ng/syslog-ng.conf", DEBIAN_CONF);
        write(
            dir.path(),
            "/etc/syslog-ng/conf.d/app.conf",
            "destination d_app { file(\"/var/log/app.log\"); };\n\
             filter f_local0 { facility(local0); };\n\
             log { source(s_src); filter(f_local0); destination(d_app); };\n\
             log { source(s_src); filter(f_auth); destination(d_auth); };\n",
        );

        let files = parse_syslog_ng_config(&host(&dir), Path::new("/etc/syslog-ng/syslog-ng.conf"));
        let summary: Vec<(&str, LogType)> = files
            .iter()
            .map(|f| (f.path.to_str().unwrap(), f.log_type))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("/var/log/auth.log", LogType::Auth),
                ("/var/log/kern.log", LogType::Kern),
                ("/var/log/mail.log", LogType::Mail),
                ("/var/log/syslog", LogType::Syslog),
                ("/var/log/sshd.log", LogType::Custom),
                ("/var/log/app.log", LogType::Custom),
            ]
        );
        assert_eq!(files[0].facility.as_deref(), Some("auth,authpriv"));
        assert_eq!(files[3].facility, None, "negated facilities are not selected");
    }

    #[test]
    fn test_relative_include_and_cycle() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "/etc/syslog-ng/syslog-ng.conf",
            "@include \"conf.d\"\n@include \"syslog-ng.conf\"\n",
        );
        write(
            dir.path(),
            "/etc/syslog-ng/conf.d/a.conf",
            "destination d { file('/var/log/a.log'); };\nlog { destination(d); };\n",
        );
        let files = parse_syslog_ng_config(&host(&dir), Path::new("/etc/syslog-ng/syslog-ng.conf"));
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, PathBuf::from("/var/log/a.log"));
        assert_eq!(files[0].log_type, LogType::Syslog);
    }

    #[test]
    fn test_scan_statements_nested_braces() {
        let st = scan_statements("log { source(s); destination { file(\"/x\"); }; };\nfilter f { facility(mail); };");
        assert_eq!(st.len(), 2);
        assert_eq!(st[0].kind, "log");
        assert_eq!(st[0].name, None);
        assert_eq!(st[1].kind, "filter");
        assert_eq!(st[1].name.as_deref(), Some("f"));
        assert_eq!(st[1].body.trim(), "facility(mail);");
    }

    #[test]
    fn test_strip_comment_respects_quotes() {
        assert_eq!(strip_comment("file(\"/var/log/#weird\"); # note"), "file(\"/var/log/#weird\"); ");
    }
}
