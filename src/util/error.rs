// LogScout - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// All errors preserve the causal chain for diagnostic logging.
//
// Most of the core never surfaces these to callers: parsers degrade to
// fallback records and the grok compiler stores its error on the compiled
// pattern. Errors flow outward only at I/O boundaries (config loading,
// directory scans, file sampling).

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for all LogScout operations.
/// Errors are categorised by the subsystem that produced them.
#[derive(Debug)]
pub enum LogScoutError {
    /// Pattern template compilation failed.
    Grok(GrokError),

    /// A pattern library definition is invalid.
    Pattern(PatternError),

    /// Directory scan failed.
    Discovery(DiscoveryError),

    /// Sampling a candidate log file failed.
    Sample(SampleError),

    /// Configuration loading or validation failed.
    Config(ConfigError),

    /// I/O error with path context.
    Io {
        path: PathBuf,
        operation: &'static str,
        source: io::Error,
    },
}

impl fmt::Display for LogScoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grok(e) => write!(f, "Grok error: {e}"),
            Self::Pattern(e) => write!(f, "Pattern library error: {e}"),
            Self::Discovery(e) => write!(f, "Discovery error: {e}"),
            Self::Sample(e) => write!(f, "Sample error: {e}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
            Self::Io {
                path,
                operation,
                source,
            } => write!(
                f,
                "I/O error during {operation} on '{}': {source}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for LogScoutError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Grok(e) => Some(e),
            Self::Pattern(e) => Some(e),
            Self::Discovery(e) => Some(e),
            Self::Sample(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Io { source, .. } => Some(source),
        }
    }
}

// ---------------------------------------------------------------------------
// Grok errors
// ---------------------------------------------------------------------------

/// Errors raised while compiling a grok template.
#[derive(Debug)]
pub enum GrokError {
    /// A `%{NAME}` reference names neither a base nor a composite macro.
    UnknownMacro { name: String },

    /// Composite expansion did not settle within the pass limit.
    ExpansionLimit { template: String, passes: usize },

    /// The template or its expansion exceeds the size limit.
    PatternTooLong { length: usize, max_length: usize },

    /// The expanded expression is not a valid regular expression.
    InvalidRegex {
        template: String,
        source: regex::Error,
    },
}

impl fmt::Display for GrokError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownMacro { name } => write!(f, "unknown macro '%{{{name}}}'"),
            Self::ExpansionLimit { template, passes } => write!(
                f,
                "composite expansion of '{template}' did not terminate after {passes} passes"
            ),
            Self::PatternTooLong { length, max_length } => write!(
                f,
                "pattern is {length} bytes, exceeds maximum of {max_length}"
            ),
            Self::InvalidRegex { template, source } => {
                write!(f, "template '{template}' compiled to an invalid regex: {source}")
            }
        }
    }
}

impl std::error::Error for GrokError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidRegex { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<GrokError> for LogScoutError {
    fn from(e: GrokError) -> Self {
        Self::Grok(e)
    }
}

// ---------------------------------------------------------------------------
// Pattern library errors
// ---------------------------------------------------------------------------

/// Errors related to loading and validating pattern library definitions.
#[derive(Debug)]
pub enum PatternError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A required field is missing or empty.
    MissingField {
        pattern: String,
        field: &'static str,
    },

    /// The entry names zero or several matchers (`grok`, `parser`, `json`).
    AmbiguousMatcher { pattern: String, count: usize },

    /// The grok template does not compile.
    InvalidTemplate { pattern: String, source: GrokError },

    /// The confidence threshold is above 100.
    ThresholdOutOfRange { pattern: String, value: u8 },
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Failed to parse '{}': {source}", path.display())
            }
            Self::MissingField { pattern, field } => {
                write!(f, "Pattern '{pattern}' is missing required field '{field}'")
            }
            Self::AmbiguousMatcher { pattern, count } => write!(
                f,
                "Pattern '{pattern}' must define exactly one of grok/parser/json, found {count}"
            ),
            Self::InvalidTemplate { pattern, source } => {
                write!(f, "Pattern '{pattern}' has an invalid template: {source}")
            }
            Self::ThresholdOutOfRange { pattern, value } => write!(
                f,
                "Pattern '{pattern}' confidence_threshold {value} exceeds 100"
            ),
        }
    }
}

impl std::error::Error for PatternError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::InvalidTemplate { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<PatternError> for LogScoutError {
    fn from(e: PatternError) -> Self {
        Self::Pattern(e)
    }
}

// ---------------------------------------------------------------------------
// Discovery errors
// ---------------------------------------------------------------------------

/// Errors related to scanning a log directory.
#[derive(Debug)]
pub enum DiscoveryError {
    /// The scan directory does not exist.
    RootNotFound { path: PathBuf },

    /// The scan path is not a directory.
    NotADirectory { path: PathBuf },

    /// Permission denied accessing the scan directory.
    PermissionDenied { path: PathBuf, source: io::Error },

    /// Any other I/O failure while listing the directory.
    Io { path: PathBuf, source: io::Error },
}

impl DiscoveryError {
    /// Classify an I/O error raised while opening a scan directory.
    pub fn from_io(path: PathBuf, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => Self::RootNotFound { path },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { path, source },
            _ => Self::Io { path, source },
        }
    }
}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RootNotFound { path } => {
                write!(f, "Scan path '{}' does not exist", path.display())
            }
            Self::NotADirectory { path } => {
                write!(f, "Scan path '{}' is not a directory", path.display())
            }
            Self::PermissionDenied { path, source } => {
                write!(
                    f,
                    "Permission denied accessing '{}': {source}",
                    path.display()
                )
            }
            Self::Io { path, source } => {
                write!(f, "Error listing '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for DiscoveryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::PermissionDenied { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<DiscoveryError> for LogScoutError {
    fn from(e: DiscoveryError) -> Self {
        Self::Discovery(e)
    }
}

// ---------------------------------------------------------------------------
// Sample errors
// ---------------------------------------------------------------------------

/// Errors raised while sampling lines from a candidate log file.
/// A file that fails sampling is classified once and never retried.
#[derive(Debug)]
pub enum SampleError {
    /// The file could not be opened or read.
    Io { path: PathBuf, source: io::Error },

    /// Sampling did not finish before the per-file deadline.
    Timeout { path: PathBuf, timeout_ms: u64 },

    /// The path is not a regular file (FIFO, socket, device, directory).
    NotAFile { path: PathBuf },

    /// The file is compressed in a format the filesystem cannot decode.
    Unsupported { path: PathBuf },
}

impl fmt::Display for SampleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "Cannot read '{}': {source}", path.display())
            }
            Self::Timeout { path, timeout_ms } => write!(
                f,
                "Sampling '{}' timed out after {timeout_ms} ms",
                path.display()
            ),
            Self::NotAFile { path } => {
                write!(f, "'{}' is not a regular file", path.display())
            }
            Self::Unsupported { path } => {
                write!(f, "'{}' uses an unsupported compression", path.display())
            }
        }
    }
}

impl std::error::Error for SampleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<SampleError> for LogScoutError {
    fn from(e: SampleError) -> Self {
        Self::Sample(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A config value is out of the allowed range.
    ValueOutOfRange {
        field: String,
        value: String,
        expected: String,
    },

    /// I/O error reading config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::ValueOutOfRange {
                field,
                value,
                expected,
            } => write!(
                f,
                "Config '{field}' = '{value}' is out of range. Expected: {expected}"
            ),
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for LogScoutError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Convenience type alias for LogScout results.
pub type Result<T> = std::result::Result<T, LogScoutError>;
