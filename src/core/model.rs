// LogScout - core/model.rs
//
// Core data model types. Pure data definitions with no I/O and no platform
// dependencies. These types are the shared vocabulary across all layers and
// the only data handed to the (external) persistence and rendering layers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// =============================================================================
// Parsed log entry (normalised output of the dialect parsers)
// =============================================================================

/// Normalised severity of a parsed line.
///
/// Every parse result carries exactly one of these; `Info` is the default
/// when nothing in the line indicates otherwise.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Error,
    Warning,
    #[default]
    Info,
    Debug,
}

impl Level {
    pub fn all() -> &'static [Level] {
        &[Level::Error, Level::Warning, Level::Info, Level::Debug]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Error => "error",
            Level::Warning => "warning",
            Level::Info => "info",
            Level::Debug => "debug",
        }
    }

    /// Map a syslog priority (0-7, or a full PRI value) to a level.
    pub fn from_syslog_priority(priority: u32) -> Self {
        match priority % 8 {
            0..=3 => Level::Error,
            4 => Level::Warning,
            5 | 6 => Level::Info,
            _ => Level::Debug,
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single parsed log line, normalised across all dialects.
///
/// Invariant: `message` is non-empty and trimmed for every value returned by
/// a dialect parser.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedLogEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    /// Program name / syslog tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    pub level: Level,
    pub message: String,

    // Dialect-specific fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    /// Seconds since boot from a `[ 1234.567890]` kernel prefix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kernel_timestamp: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
}

impl ParsedLogEntry {
    /// Degraded record for a line no dialect shape recognised.
    pub fn raw(line: &str) -> Self {
        Self {
            message: line.trim().to_string(),
            level: Level::Info,
            ..Default::default()
        }
    }
}

// =============================================================================
// Configured log files (output of config-based discovery)
// =============================================================================

/// Log file type, derived from syslog facility or file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogType {
    Syslog,
    Auth,
    Kern,
    Daemon,
    Mail,
    Cron,
    User,
    Custom,
}

impl LogType {
    /// Map a syslog facility keyword to a log type. Unknown facilities
    /// (local0-7, news, uucp, ...) map to `Custom`.
    pub fn from_facility(facility: &str) -> Self {
        match facility.to_ascii_lowercase().as_str() {
            "auth" | "authpriv" | "security" => LogType::Auth,
            "kern" => LogType::Kern,
            "daemon" => LogType::Daemon,
            "mail" => LogType::Mail,
            "cron" => LogType::Cron,
            "user" => LogType::User,
            "syslog" | "*" => LogType::Syslog,
            _ => LogType::Custom,
        }
    }

    /// Infer a log type from a log file path's name.
    pub fn from_path(path: &std::path::Path) -> Self {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        if name.starts_with("auth") || name.starts_with("secure") {
            LogType::Auth
        } else if name.starts_with("kern") {
            LogType::Kern
        } else if name.starts_with("daemon") {
            LogType::Daemon
        } else if name.starts_with("mail") {
            LogType::Mail
        } else if name.starts_with("cron") {
            LogType::Cron
        } else if name.starts_with("user") {
            LogType::User
        } else if name.starts_with("syslog") || name.starts_with("messages") {
            LogType::Syslog
        } else {
            LogType::Custom
        }
    }
}

/// Rotation frequency from a logrotate block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationPattern {
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl RotationPattern {
    pub fn from_directive(word: &str) -> Option<Self> {
        match word {
            "hourly" => Some(Self::Hourly),
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            "yearly" => Some(Self::Yearly),
            _ => None,
        }
    }
}

/// Whether a configured file was read from a daemon config or substituted
/// from the OS defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Config,
    Default,
}

/// A log file path recovered from a daemon's configuration.
///
/// Produced fresh on every discovery pass and never mutated afterwards, only
/// merged by path (first occurrence wins).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfiguredLogFile {
    pub path: PathBuf,
    #[serde(rename = "type")]
    pub log_type: LogType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facility: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation_pattern: Option<RotationPattern>,
    /// Number of rotated generations kept (`rotate N`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compress: Option<bool>,
    pub source: ConfigSource,
}

impl ConfiguredLogFile {
    pub fn new(path: PathBuf, log_type: LogType, source: ConfigSource) -> Self {
        Self {
            path,
            log_type,
            facility: None,
            rotation_pattern: None,
            keep_count: None,
            compress: None,
            source,
        }
    }
}

/// Append `file` unless its path is already present; earlier entries always
/// win. Returns whether it was added.
pub fn push_configured_file(into: &mut Vec<ConfiguredLogFile>, file: ConfiguredLogFile) -> bool {
    if into.iter().any(|f| f.path == file.path) {
        return false;
    }
    into.push(file);
    true
}

// =============================================================================
// Logging services
// =============================================================================

/// Logging daemon family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoggingServiceType {
    Journald,
    SyslogNg,
    Rsyslog,
    None,
}

impl LoggingServiceType {
    /// Fixed preference order used to pick the primary service.
    pub const PRIORITY: [LoggingServiceType; 3] = [
        LoggingServiceType::Journald,
        LoggingServiceType::SyslogNg,
        LoggingServiceType::Rsyslog,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Journald => "journald",
            Self::SyslogNg => "syslog-ng",
            Self::Rsyslog => "rsyslog",
            Self::None => "none",
        }
    }
}

impl std::fmt::Display for LoggingServiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One logging daemon found on the host, with the files it writes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedLoggingService {
    #[serde(rename = "type")]
    pub service_type: LoggingServiceType,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_path: Option<PathBuf>,
    pub files: Vec<ConfiguredLogFile>,
}

// =============================================================================
// Host OS
// =============================================================================

/// Distribution family of the monitored host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OsFamily {
    Ubuntu,
    Debian,
    Rhel,
    Suse,
    Arch,
    Alpine,
    /// No identification file, but systemd is present.
    SystemdGeneric,
    Unknown,
}

/// Timestamp style the host's syslog daemon is expected to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampStyle {
    Bsd,
    Iso8601,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OsInfo {
    #[serde(rename = "type")]
    pub os_type: OsFamily,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub log_format: TimestampStyle,
    #[serde(rename = "usesISO8601")]
    pub uses_iso8601: bool,
}

impl Default for OsInfo {
    fn default() -> Self {
        Self {
            os_type: OsFamily::Unknown,
            version: None,
            log_format: TimestampStyle::Bsd,
            uses_iso8601: false,
        }
    }
}

// =============================================================================
// Scanning and classification
// =============================================================================

/// A file found by the directory scan or named by a daemon configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannedFile {
    pub path: PathBuf,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

/// Classification tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClassificationCategory {
    /// Well-known critical system log, parsed by its dedicated dialect.
    SystemBase,
    /// Format confidently detected from a sample.
    AutoDetected,
    /// Needs a user-supplied pattern before it can be parsed.
    Custom,
}

/// User-suppliable parser settings for custom-tier files. Starts empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomParserConfig {
    pub pattern: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_format: Option<String>,
}

/// Final verdict for one rotation family.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileClassification {
    /// Canonical base path of the rotation family.
    pub path: PathBuf,
    /// Member that was sampled.
    pub representative: PathBuf,
    /// Every scanned member of the family, including the representative.
    pub members: Vec<PathBuf>,
    pub category: ClassificationCategory,
    /// Parser type used for this file (dialect or library log type).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_type: Option<String>,
    /// Winning library format name, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    pub confidence: u8,
    pub validated: bool,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_config: Option<CustomParserConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_error: Option<String>,
}

/// Three-tier classification output.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub system_base_files: Vec<FileClassification>,
    pub auto_detected_files: Vec<FileClassification>,
    pub custom_files: Vec<FileClassification>,
}

impl ClassificationResult {
    pub fn push(&mut self, classification: FileClassification) {
        match classification.category {
            ClassificationCategory::SystemBase => self.system_base_files.push(classification),
            ClassificationCategory::AutoDetected => self.auto_detected_files.push(classification),
            ClassificationCategory::Custom => self.custom_files.push(classification),
        }
    }

    pub fn len(&self) -> usize {
        self.system_base_files.len() + self.auto_detected_files.len() + self.custom_files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over every classification regardless of tier.
    pub fn iter(&self) -> impl Iterator<Item = &FileClassification> {
        self.system_base_files
            .iter()
            .chain(self.auto_detected_files.iter())
            .chain(self.custom_files.iter())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_level_from_priority() {
        assert_eq!(Level::from_syslog_priority(0), Level::Error);
        assert_eq!(Level::from_syslog_priority(3), Level::Error);
        assert_eq!(Level::from_syslog_priority(4), Level::Warning);
        assert_eq!(Level::from_syslog_priority(6), Level::Info);
        assert_eq!(Level::from_syslog_priority(7), Level::Debug);
        // Full PRI value: facility auth (4) * 8 + warning (4)
        assert_eq!(Level::from_syslog_priority(36), Level::Warning);
    }

    #[test]
    fn test_log_type_from_facility() {
        assert_eq!(LogType::from_facility("authpriv"), LogType::Auth);
        assert_eq!(LogType::from_facility("KERN"), LogType::Kern);
        assert_eq!(LogType::from_facility("*"), LogType::Syslog);
        assert_eq!(LogType::from_facility("local3"), LogType::Custom);
    }

    #[test]
    fn test_log_type_from_path() {
        assert_eq!(LogType::from_path(Path::new("/var/log/secure")), LogType::Auth);
        assert_eq!(LogType::from_path(Path::new("/var/log/maillog")), LogType::Mail);
        assert_eq!(LogType::from_path(Path::new("/var/log/messages")), LogType::Syslog);
        assert_eq!(LogType::from_path(Path::new("/var/log/app/x.log")), LogType::Custom);
    }

    #[test]
    fn test_merge_first_path_wins() {
        let mut files = vec![ConfiguredLogFile::new(
            PathBuf::from("/var/log/auth.log"),
            LogType::Auth,
            ConfigSource::Config,
        )];
        assert!(!push_configured_file(
            &mut files,
            ConfiguredLogFile::new(
                PathBuf::from("/var/log/auth.log"),
                LogType::Custom,
                ConfigSource::Default,
            ),
        ));
        assert!(push_configured_file(
            &mut files,
            ConfiguredLogFile::new(PathBuf::from("/var/log/kern.log"), LogType::Kern, ConfigSource::Config),
        ));
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].log_type, LogType::Auth);
        assert_eq!(files[1].path, PathBuf::from("/var/log/kern.log"));
    }

    #[test]
    fn test_raw_entry_is_trimmed_info() {
        let e = ParsedLogEntry::raw("  something odd  ");
        assert_eq!(e.message, "something odd");
        assert_eq!(e.level, Level::Info);
        assert!(e.timestamp.is_none());
    }

    #[test]
    fn test_classification_result_routes_by_category() {
        let mut result = ClassificationResult::default();
        let base = FileClassification {
            path: PathBuf::from("/var/log/syslog"),
            representative: PathBuf::from("/var/log/syslog"),
            members: vec![PathBuf::from("/var/log/syslog")],
            category: ClassificationCategory::SystemBase,
            log_type: Some("syslog".to_string()),
            format: None,
            confidence: 100,
            validated: true,
            enabled: true,
            custom_config: None,
            sample_error: None,
        };
        result.push(base.clone());
        result.push(FileClassification {
            category: ClassificationCategory::Custom,
            ..base
        });
        assert_eq!(result.system_base_files.len(), 1);
        assert_eq!(result.custom_files.len(), 1);
        assert_eq!(result.len(), 2);
    }
}
