// LogScout - platform/config.rs
//
// Platform directory resolution and config.toml loading with startup
// validation. Every value is checked against the bounds in
// `util::constants`; out-of-range values fall back to the default and
// produce a warning string instead of an error.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance.

use crate::util::constants;
use crate::util::error::ConfigError;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Resolved platform paths for LogScout configuration.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/logscout/)
    pub config_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to current directory if platform dirs cannot be determined.
    pub fn resolve() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("", "", constants::APP_ID) {
            let config_dir = proj_dirs.config_dir().to_path_buf();
            tracing::debug!(config = %config_dir.display(), "Platform paths resolved");
            Self { config_dir }
        } else {
            tracing::warn!("Could not determine platform directories, using current directory");
            Self {
                config_dir: PathBuf::from("."),
            }
        }
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(constants::CONFIG_FILE_NAME)
    }
}

// =============================================================================
// config.toml shape
// =============================================================================

/// Raw deserialisable shape of config.toml.
///
/// Unknown keys are silently ignored so a newer config file still loads in
/// an older binary.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    pub scan: ScanSection,
    pub detection: DetectionSection,
    pub pipeline: PipelineSection,
    pub host: HostSection,
    pub logging: LoggingSection,
}

/// `[scan]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct ScanSection {
    pub directories: Option<Vec<String>>,
    pub recursive: Option<bool>,
    pub max_depth: Option<usize>,
    pub exclude_file_patterns: Option<Vec<String>>,
    pub exclude_dir_patterns: Option<Vec<String>>,
    pub exclude_path_patterns: Option<Vec<String>>,
}

/// `[detection]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct DetectionSection {
    pub sample_lines: Option<usize>,
    pub validation_lines: Option<usize>,
    pub auto_detect_threshold: Option<u8>,
    pub validation_threshold: Option<u8>,
    /// Extra pattern files appended to the built-in library.
    pub pattern_files: Option<Vec<String>>,
}

/// `[pipeline]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    pub worker_threads: Option<usize>,
    pub sample_timeout_ms: Option<u64>,
}

/// `[host]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct HostSection {
    /// Where the monitored host's root filesystem is mounted.
    pub mount_prefix: Option<String>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
}

// =============================================================================
// Validated configuration
// =============================================================================

/// Directory scan settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    pub directories: Vec<PathBuf>,
    /// Scan below the top level of each directory. Off for host-system scans.
    pub recursive: bool,
    pub max_depth: usize,
    pub exclude_file_patterns: Vec<String>,
    pub exclude_dir_patterns: Vec<String>,
    pub exclude_path_patterns: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            directories: constants::DEFAULT_SCAN_DIRECTORIES
                .iter()
                .map(PathBuf::from)
                .collect(),
            recursive: false,
            max_depth: constants::DEFAULT_MAX_DEPTH,
            exclude_file_patterns: to_strings(constants::DEFAULT_EXCLUDE_FILE_PATTERNS),
            exclude_dir_patterns: to_strings(constants::DEFAULT_EXCLUDE_DIR_PATTERNS),
            exclude_path_patterns: Vec::new(),
        }
    }
}

/// Sampling sizes and thresholds for format detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionConfig {
    pub sample_lines: usize,
    pub validation_lines: usize,
    pub auto_detect_threshold: u8,
    pub validation_threshold: u8,
    pub pattern_files: Vec<PathBuf>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            sample_lines: constants::DEFAULT_SAMPLE_LINES,
            validation_lines: constants::DEFAULT_VALIDATION_LINES,
            auto_detect_threshold: constants::DEFAULT_AUTO_DETECT_THRESHOLD,
            validation_threshold: constants::DEFAULT_VALIDATION_THRESHOLD,
            pattern_files: Vec::new(),
        }
    }
}

/// Worker pool settings for the classification pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    pub worker_threads: usize,
    pub sample_timeout_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            worker_threads: constants::DEFAULT_WORKER_THREADS,
            sample_timeout_ms: constants::DEFAULT_SAMPLE_TIMEOUT_MS,
        }
    }
}

/// Validated application configuration derived from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    pub scan: ScanConfig,
    pub detection: DetectionConfig,
    pub pipeline: PipelineConfig,
    pub mount_prefix: Option<PathBuf>,
    /// Logging level string (for init before tracing is available).
    pub log_level: Option<String>,
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn out_of_range(field: &str, value: impl ToString, expected: String, default: impl ToString) -> String {
    let err = ConfigError::ValueOutOfRange {
        field: field.to_string(),
        value: value.to_string(),
        expected,
    };
    format!("{err}. Using default ({}).", default.to_string())
}

/// Keep the glob patterns that compile, warning about the rest.
fn valid_globs(field: &str, patterns: Vec<String>, warnings: &mut Vec<String>) -> Vec<String> {
    patterns
        .into_iter()
        .filter(|p| match glob::Pattern::new(p) {
            Ok(_) => true,
            Err(e) => {
                warnings.push(format!("{field}: ignoring invalid glob \"{p}\": {e}"));
                false
            }
        })
        .collect()
}

/// Validate a raw config against the bounds in `util::constants`.
pub fn validate(raw: RawConfig) -> (AppConfig, Vec<String>) {
    let mut warnings: Vec<String> = Vec::new();
    let mut config = AppConfig::default();

    // -- Scan --
    if let Some(dirs) = raw.scan.directories {
        if dirs.is_empty() {
            warnings.push("[scan] directories is empty. Using default (/var/log).".to_string());
        } else {
            config.scan.directories = dirs.into_iter().map(PathBuf::from).collect();
        }
    }
    if let Some(recursive) = raw.scan.recursive {
        config.scan.recursive = recursive;
    }
    if let Some(depth) = raw.scan.max_depth {
        if (1..=constants::ABSOLUTE_MAX_DEPTH).contains(&depth) {
            config.scan.max_depth = depth;
        } else {
            warnings.push(out_of_range(
                "[scan] max_depth",
                depth,
                format!("1-{}", constants::ABSOLUTE_MAX_DEPTH),
                constants::DEFAULT_MAX_DEPTH,
            ));
        }
    }
    if let Some(p) = raw.scan.exclude_file_patterns {
        config.scan.exclude_file_patterns = valid_globs("[scan] exclude_file_patterns", p, &mut warnings);
    }
    if let Some(p) = raw.scan.exclude_dir_patterns {
        config.scan.exclude_dir_patterns = valid_globs("[scan] exclude_dir_patterns", p, &mut warnings);
    }
    if let Some(p) = raw.scan.exclude_path_patterns {
        config.scan.exclude_path_patterns = valid_globs("[scan] exclude_path_patterns", p, &mut warnings);
    }

    // -- Detection --
    if let Some(n) = raw.detection.sample_lines {
        if (1..=constants::MAX_SAMPLE_LINES).contains(&n) {
            config.detection.sample_lines = n;
        } else {
            warnings.push(out_of_range(
                "[detection] sample_lines",
                n,
                format!("1-{}", constants::MAX_SAMPLE_LINES),
                constants::DEFAULT_SAMPLE_LINES,
            ));
        }
    }
    if let Some(n) = raw.detection.validation_lines {
        if (1..=constants::MAX_SAMPLE_LINES).contains(&n) {
            config.detection.validation_lines = n;
        } else {
            warnings.push(out_of_range(
                "[detection] validation_lines",
                n,
                format!("1-{}", constants::MAX_SAMPLE_LINES),
                constants::DEFAULT_VALIDATION_LINES,
            ));
        }
    }
    if let Some(t) = raw.detection.auto_detect_threshold {
        if t <= 100 {
            config.detection.auto_detect_threshold = t;
        } else {
            warnings.push(out_of_range(
                "[detection] auto_detect_threshold",
                t,
                "0-100".to_string(),
                constants::DEFAULT_AUTO_DETECT_THRESHOLD,
            ));
        }
    }
    if let Some(t) = raw.detection.validation_threshold {
        if t <= 100 {
            config.detection.validation_threshold = t;
        } else {
            warnings.push(out_of_range(
                "[detection] validation_threshold",
                t,
                "0-100".to_string(),
                constants::DEFAULT_VALIDATION_THRESHOLD,
            ));
        }
    }
    if let Some(files) = raw.detection.pattern_files {
        config.detection.pattern_files = files.into_iter().map(PathBuf::from).collect();
    }

    // -- Pipeline --
    if let Some(n) = raw.pipeline.worker_threads {
        if (1..=constants::MAX_WORKER_THREADS).contains(&n) {
            config.pipeline.worker_threads = n;
        } else {
            warnings.push(out_of_range(
                "[pipeline] worker_threads",
                n,
                format!("1-{}", constants::MAX_WORKER_THREADS),
                constants::DEFAULT_WORKER_THREADS,
            ));
        }
    }
    if let Some(ms) = raw.pipeline.sample_timeout_ms {
        if (constants::MIN_SAMPLE_TIMEOUT_MS..=constants::MAX_SAMPLE_TIMEOUT_MS).contains(&ms) {
            config.pipeline.sample_timeout_ms = ms;
        } else {
            warnings.push(out_of_range(
                "[pipeline] sample_timeout_ms",
                ms,
                format!(
                    "{}-{}",
                    constants::MIN_SAMPLE_TIMEOUT_MS,
                    constants::MAX_SAMPLE_TIMEOUT_MS
                ),
                constants::DEFAULT_SAMPLE_TIMEOUT_MS,
            ));
        }
    }

    // -- Host --
    if let Some(prefix) = raw.host.mount_prefix {
        if !prefix.is_empty() {
            config.mount_prefix = Some(PathBuf::from(prefix));
        }
    }

    // -- Logging: level --
    if let Some(level) = raw.logging.level {
        let valid = ["error", "warn", "info", "debug", "trace"];
        if valid.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level);
        } else {
            warnings.push(format!(
                "[logging] level = \"{level}\" is not recognised. \
                 Valid values: error, warn, info, debug, trace. Using default (info).",
            ));
        }
    }

    (config, warnings)
}

/// Read and validate `config_path`, failing if it cannot be read or parsed.
/// Used when the user names a config file explicitly.
pub fn load_config_strict(config_path: &Path) -> Result<(AppConfig, Vec<String>), ConfigError> {
    let content = std::fs::read_to_string(config_path).map_err(|source| ConfigError::Io {
        path: config_path.to_path_buf(),
        source,
    })?;
    let raw: RawConfig = toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
        path: config_path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %config_path.display(), "Loaded config.toml");
    Ok(validate(raw))
}

/// Load and validate `config_path`.
///
/// A missing file yields defaults with no warnings (first run). An
/// unreadable or unparseable file yields defaults plus a warning; the
/// application still starts but the user is informed.
pub fn load_config(config_path: &Path) -> (AppConfig, Vec<String>) {
    if !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "No config.toml found; using defaults");
        return (AppConfig::default(), Vec::new());
    }

    let (config, warnings) = match load_config_strict(config_path) {
        Ok(loaded) => loaded,
        Err(e) => {
            let msg = format!("{e}. Using defaults.");
            tracing::warn!("{}", msg);
            (AppConfig::default(), vec![msg])
        }
    };

    if !warnings.is_empty() {
        tracing::warn!(count = warnings.len(), "Config validation produced warnings");
    }
    (config, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn parse(text: &str) -> (AppConfig, Vec<String>) {
        validate(toml::from_str(text).unwrap())
    }

    #[test]
    fn test_empty_config_is_default() {
        let (config, warnings) = parse("");
        assert!(warnings.is_empty());
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.scan.directories, vec![PathBuf::from("/var/log")]);
        assert!(!config.scan.recursive);
        assert_eq!(config.detection.sample_lines, 50);
        assert_eq!(config.detection.validation_lines, 100);
        assert_eq!(config.detection.auto_detect_threshold, 70);
    }

    #[test]
    fn test_valid_values_applied() {
        let (config, warnings) = parse(
            r#"
[scan]
directories = ["/var/log", "/opt/app/logs"]
recursive = true
max_depth = 2
exclude_path_patterns = ["/var/log/private/**"]

[detection]
sample_lines = 20
validation_threshold = 90
pattern_files = ["/etc/logscout/patterns.toml"]

[pipeline]
worker_threads = 8
sample_timeout_ms = 250

[host]
mount_prefix = "/host"

[logging]
level = "debug"
unknown_key = 1
"#,
        );
        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(config.scan.directories.len(), 2);
        assert!(config.scan.recursive);
        assert_eq!(config.scan.max_depth, 2);
        assert_eq!(config.scan.exclude_path_patterns, vec!["/var/log/private/**"]);
        assert_eq!(config.detection.sample_lines, 20);
        assert_eq!(config.detection.validation_threshold, 90);
        assert_eq!(config.detection.pattern_files.len(), 1);
        assert_eq!(config.pipeline.worker_threads, 8);
        assert_eq!(config.pipeline.sample_timeout_ms, 250);
        assert_eq!(config.mount_prefix, Some(PathBuf::from("/host")));
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_out_of_range_values_warn_and_default() {
        let (config, warnings) = parse(
            r#"
[scan]
max_depth = 99
exclude_file_patterns = ["*.log", "[bad"]

[detection]
auto_detect_threshold = 150

[pipeline]
worker_threads = 0
sample_timeout_ms = 1

[logging]
level = "loud"
"#,
        );
        assert_eq!(warnings.len(), 6, "{warnings:?}");
        assert_eq!(config.scan.max_depth, constants::DEFAULT_MAX_DEPTH);
        assert_eq!(config.scan.exclude_file_patterns, vec!["*.log"]);
        assert_eq!(config.detection.auto_detect_threshold, 70);
        assert_eq!(config.pipeline.worker_threads, constants::DEFAULT_WORKER_THREADS);
        assert_eq!(config.pipeline.sample_timeout_ms, constants::DEFAULT_SAMPLE_TIMEOUT_MS);
        assert!(config.log_level.is_none());
        assert!(warnings[0].contains("[scan] max_depth"));
    }

    #[test]
    fn test_load_config_missing_and_broken() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let (config, warnings) = load_config(&path);
        assert!(warnings.is_empty());
        assert_eq!(config, AppConfig::default());
        assert!(matches!(load_config_strict(&path), Err(ConfigError::Io { .. })));

        fs::write(&path, "[scan\nrecursive = ").unwrap();
        let (config, warnings) = load_config(&path);
        assert_eq!(config, AppConfig::default());
        assert_eq!(warnings.len(), 1);
        assert!(matches!(load_config_strict(&path), Err(ConfigError::TomlParse { .. })));
    }
}
