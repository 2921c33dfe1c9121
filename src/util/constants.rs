// LogScout - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.
// Every bound used by the scanner, detector, and config parsers lives here so
// the limits are auditable in one place.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "LogScout";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "LogScout";

/// Current application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Pattern compiler limits
// =============================================================================

/// Maximum number of composite-macro rewrite passes before compilation gives
/// up and yields a never-matching pattern.
pub const MAX_GROK_EXPANSION_PASSES: usize = 16;

/// Maximum length of a template (before expansion) accepted by the compiler.
pub const MAX_GROK_TEMPLATE_LENGTH: usize = 4_096;

/// Maximum size of the expanded regular expression, in bytes.
pub const MAX_EXPANDED_PATTERN_LENGTH: usize = 64 * 1024;

// =============================================================================
// Timestamp normalisation
// =============================================================================

/// A year-less syslog timestamp further than this many days in the future
/// (relative to "now") is assumed to belong to the previous year.
pub const YEAR_ROLLOVER_FUTURE_DAYS: i64 = 183;

/// Epoch values at or above this are milliseconds rather than seconds.
pub const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// Epoch values at or above this are microseconds rather than milliseconds.
pub const EPOCH_MICROS_THRESHOLD: i64 = 100_000_000_000_000;

// =============================================================================
// Detection
// =============================================================================

/// Number of lines sampled from a file for format detection.
pub const DEFAULT_SAMPLE_LINES: usize = 50;

/// Number of lines read for the second, confirming validation pass.
pub const DEFAULT_VALIDATION_LINES: usize = 100;

/// Minimum detection confidence (percent) for the auto-detected tier.
pub const DEFAULT_AUTO_DETECT_THRESHOLD: u8 = 70;

/// Minimum match rate (percent) for a validation pass to succeed.
pub const DEFAULT_VALIDATION_THRESHOLD: u8 = 70;

/// Upper bound on sample sizes accepted from configuration.
pub const MAX_SAMPLE_LINES: usize = 10_000;

/// Maximum bytes read from one file per sampling request, so a file with
/// no newlines cannot be pulled into memory whole.
pub const MAX_SAMPLE_BYTES: u64 = 4 * 1024 * 1024;

/// Format name reported when no library entry clears its threshold.
pub const CUSTOM_FORMAT_NAME: &str = "custom";

// =============================================================================
// Classification pipeline
// =============================================================================

/// Default number of worker threads used to sample candidate files.
pub const DEFAULT_WORKER_THREADS: usize = 4;

/// Hard upper bound on worker threads.
pub const MAX_WORKER_THREADS: usize = 64;

/// Per-file sampling deadline in milliseconds.
pub const DEFAULT_SAMPLE_TIMEOUT_MS: u64 = 5_000;

/// Minimum / maximum configurable sampling deadline.
pub const MIN_SAMPLE_TIMEOUT_MS: u64 = 100;
pub const MAX_SAMPLE_TIMEOUT_MS: u64 = 120_000;

/// Well-known critical system log names. A canonical base path whose file
/// name equals or starts with one of these is classified as system-base.
pub const CRITICAL_LOG_NAMES: &[&str] = &[
    "syslog",
    "messages",
    "auth.log",
    "secure",
    "kern.log",
    "daemon.log",
    "mail.log",
    "maillog",
];

/// Compression suffixes stripped when computing a canonical base path.
pub const COMPRESSION_SUFFIXES: &[&str] = &[".gz", ".bz2", ".xz", ".zst", ".Z"];

// =============================================================================
// Scanning
// =============================================================================

/// Directories scanned for host-system logs when none are configured.
pub const DEFAULT_SCAN_DIRECTORIES: &[&str] = &["/var/log"];

/// Maximum recursion depth when recursive scanning is enabled.
pub const DEFAULT_MAX_DEPTH: usize = 3;

/// Hard upper bound on recursion depth.
pub const ABSOLUTE_MAX_DEPTH: usize = 16;

/// Default exclusion globs applied to file names.
pub const DEFAULT_EXCLUDE_FILE_PATTERNS: &[&str] = &[
    "*.journal",
    "*.journal~",
    "wtmp",
    "btmp",
    "lastlog",
    "faillog",
    "*.pid",
    "*.lock",
];

/// Default exclusion globs applied to directory names.
pub const DEFAULT_EXCLUDE_DIR_PATTERNS: &[&str] = &["journal", "private"];

// =============================================================================
// Config-based discovery
// =============================================================================

/// Maximum size of a daemon configuration file that will be read.
pub const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Maximum number of files pulled in by a single directory/glob include.
pub const MAX_INCLUDE_FILES: usize = 256;

/// Maximum nesting of config includes, independent of cycle detection.
pub const MAX_INCLUDE_DEPTH: usize = 16;

/// File-name suffixes ignored when a directory is included (mirrors
/// logrotate's taboo extensions).
pub const INCLUDE_TABOO_SUFFIXES: &[&str] = &[
    ".dpkg-old",
    ".dpkg-dist",
    ".dpkg-new",
    ".dpkg-bak",
    ".dpkg-del",
    ".rpmsave",
    ".rpmorig",
    ".rpmnew",
    ".swp",
    ".bak",
    ".disabled",
    "~",
];

pub const LOGROTATE_CONFIG_PATH: &str = "/etc/logrotate.conf";
pub const RSYSLOG_CONFIG_PATH: &str = "/etc/rsyslog.conf";
pub const SYSLOG_NG_CONFIG_PATH: &str = "/etc/syslog-ng/syslog-ng.conf";
pub const JOURNALD_CONFIG_PATH: &str = "/etc/systemd/journald.conf";

pub const RSYSLOG_BINARIES: &[&str] = &["/usr/sbin/rsyslogd", "/sbin/rsyslogd"];
pub const SYSLOG_NG_BINARIES: &[&str] = &["/usr/sbin/syslog-ng", "/sbin/syslog-ng"];
pub const JOURNALD_BINARIES: &[&str] = &[
    "/usr/lib/systemd/systemd-journald",
    "/lib/systemd/systemd-journald",
];

/// Files probed (in order) for distribution identification.
pub const OS_RELEASE_PATHS: &[&str] = &["/etc/os-release", "/usr/lib/os-release"];

/// Paths whose presence indicates systemd is the init system.
pub const SYSTEMD_MARKERS: &[&str] = &[
    "/run/systemd/system",
    "/usr/lib/systemd/systemd",
    "/lib/systemd/systemd",
];

// =============================================================================
// Logging
// =============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Maximum length of a log line included in debug output.
pub const DEBUG_MAX_LINE_PREVIEW: usize = 200;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";
