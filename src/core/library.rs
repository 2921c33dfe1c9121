// LogScout - core/library.rs
//
// Format pattern library: the set of known log formats scored by the
// detector. Definitions are TOML (`[[pattern]]` tables); the built-in set is
// embedded at compile time and user files are fed in by the app layer.
// Core layer: accepts TOML strings, never touches the filesystem.

use crate::core::grok;
use crate::core::parsers::{journald, ParserKind};
use crate::util::constants;
use crate::util::error::PatternError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// =============================================================================
// Runtime types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternCategory {
    System,
    Application,
    Custom,
}

/// How an entry decides whether a line belongs to its format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "value")]
pub enum PatternMatcher {
    /// Grok template, compiled lazily through the shared cache.
    Grok(String),
    /// One of the dialect parsers.
    Parser(ParserKind),
    /// Any line that decodes as a JSON object.
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogPatternEntry {
    pub name: String,
    pub description: String,
    pub category: PatternCategory,
    /// Parser type assigned to files detected as this format.
    pub log_type: String,
    pub matcher: PatternMatcher,
    /// Minimum confidence (percent) for this entry to win detection.
    pub confidence_threshold: u8,
}

impl LogPatternEntry {
    /// Whether `line` belongs to this format. For dialect parsers a match
    /// means a structural recognition and a non-empty parsed message.
    pub fn matches(&self, line: &str) -> bool {
        let line = line.trim_end();
        match &self.matcher {
            PatternMatcher::Grok(template) => grok::compile_cached(template).is_match(line),
            PatternMatcher::Parser(kind) => {
                kind.recognizes(line)
                    && kind
                        .parse_line(line)
                        .is_some_and(|e| !e.message.is_empty())
            }
            PatternMatcher::Json => {
                journald::looks_like_json(line)
                    && serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(
                        line.trim(),
                    )
                    .is_ok()
            }
        }
    }

    /// Dialect parser able to extract fields for this format, if any.
    pub fn parser_kind(&self) -> Option<ParserKind> {
        match &self.matcher {
            PatternMatcher::Parser(kind) => Some(*kind),
            _ => ParserKind::from_name(&self.log_type),
        }
    }
}

// =============================================================================
// TOML definitions
// =============================================================================

#[derive(Debug, Deserialize)]
struct PatternFile {
    #[serde(default)]
    pattern: Vec<PatternDefinition>,
}

/// Raw `[[pattern]]` table as deserialised from TOML.
#[derive(Debug, Deserialize)]
pub struct PatternDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: Option<PatternCategory>,
    #[serde(default)]
    pub log_type: String,
    pub grok: Option<String>,
    pub parser: Option<ParserKind>,
    #[serde(default)]
    pub json: bool,
    pub confidence_threshold: Option<u8>,
}

/// Parse a pattern file. `source_path` is used for error messages only.
pub fn parse_pattern_toml(
    toml_content: &str,
    source_path: &Path,
) -> Result<Vec<PatternDefinition>, PatternError> {
    toml::from_str::<PatternFile>(toml_content)
        .map(|f| f.pattern)
        .map_err(|e| PatternError::TomlParse {
            path: source_path.to_path_buf(),
            source: e,
        })
}

/// Validate a definition into a runtime entry. Grok templates are compiled
/// here so a broken template is reported instead of silently never matching.
pub fn validate_entry(
    def: PatternDefinition,
    default_category: PatternCategory,
) -> Result<LogPatternEntry, PatternError> {
    if def.name.trim().is_empty() {
        return Err(PatternError::MissingField {
            pattern: "(empty)".to_string(),
            field: "name",
        });
    }
    let name = def.name;

    let count = usize::from(def.grok.is_some()) + usize::from(def.parser.is_some()) + usize::from(def.json);
    if count != 1 {
        return Err(PatternError::AmbiguousMatcher {
            pattern: name,
            count,
        });
    }

    let threshold = def
        .confidence_threshold
        .unwrap_or(constants::DEFAULT_AUTO_DETECT_THRESHOLD);
    if threshold > 100 {
        return Err(PatternError::ThresholdOutOfRange {
            pattern: name,
            value: threshold,
        });
    }

    let matcher = match (def.grok, def.parser) {
        (Some(template), _) => {
            if template.trim().is_empty() {
                return Err(PatternError::MissingField {
                    pattern: name,
                    field: "grok",
                });
            }
            if let Some(e) = grok::compile(&template).into_error() {
                return Err(PatternError::InvalidTemplate {
                    pattern: name,
                    source: e,
                });
            }
            PatternMatcher::Grok(template)
        }
        (None, Some(kind)) => PatternMatcher::Parser(kind),
        (None, None) => PatternMatcher::Json,
    };

    let log_type = if def.log_type.trim().is_empty() {
        match &matcher {
            PatternMatcher::Parser(kind) => kind.as_str().to_string(),
            _ => name.clone(),
        }
    } else {
        def.log_type
    };

    Ok(LogPatternEntry {
        name,
        description: def.description,
        category: def.category.unwrap_or(default_category),
        log_type,
        matcher,
        confidence_threshold: threshold,
    })
}

/// Load every entry from one pattern file. Invalid entries are returned
/// alongside the valid ones so the caller can report them.
pub fn load_pattern_file(
    toml_content: &str,
    source_path: &Path,
    default_category: PatternCategory,
) -> (Vec<LogPatternEntry>, Vec<PatternError>) {
    let defs = match parse_pattern_toml(toml_content, source_path) {
        Ok(d) => d,
        Err(e) => return (Vec::new(), vec![e]),
    };

    let mut entries = Vec::with_capacity(defs.len());
    let mut errors = Vec::new();
    for def in defs {
        match validate_entry(def, default_category) {
            Ok(entry) => entries.push(entry),
            Err(e) => errors.push(e),
        }
    }
    (entries, errors)
}

// =============================================================================
// Built-in library (embedded at compile time)
// =============================================================================

/// Embedded pattern files, in scoring order.
pub fn builtin_pattern_sources() -> Vec<(&'static str, &'static str)> {
    vec![
        ("system.toml", include_str!("../../patterns/system.toml")),
        (
            "application.toml",
            include_str!("../../patterns/application.toml"),
        ),
    ]
}

/// Load and validate the built-in library.
///
/// Invalid entries are logged and skipped.
pub fn load_builtin_library() -> Vec<LogPatternEntry> {
    let mut library = Vec::new();
    for (filename, content) in builtin_pattern_sources() {
        let path = PathBuf::from(format!("<builtin>/{filename}"));
        let (entries, errors) = load_pattern_file(content, &path, PatternCategory::System);
        for e in &errors {
            tracing::error!(file = filename, error = %e, "Failed to load built-in pattern");
        }
        for entry in &entries {
            tracing::trace!(pattern = %entry.name, "Loaded built-in pattern");
        }
        library.extend(entries);
    }
    library
}

/// The built-in library, loaded once per process.
pub fn builtin_library() -> &'static [LogPatternEntry] {
    static LIBRARY: OnceLock<Vec<LogPatternEntry>> = OnceLock::new();
    LIBRARY.get_or_init(load_builtin_library)
}

/// Find a built-in entry by name.
pub fn find_builtin(name: &str) -> Option<&'static LogPatternEntry> {
    builtin_library().iter().find(|e| e.name == name)
}
