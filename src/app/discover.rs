// LogScout - app/discover.rs
//
// End-to-end host discovery: OS identification, logging-service probes,
// directory scan and classification, in one pass that runs to completion.
//
// The service probes and the directory scan are independent and run
// concurrently. Files named by a daemon configuration that exist on the
// host but lie outside the scanned directories are added to the candidate
// set before classification.

use crate::app::classify::Classifier;
use crate::app::scan::{self, ScanOutcome};
use crate::core::library::{self, LogPatternEntry, PatternCategory};
use crate::core::model::{
    ClassificationResult, ConfiguredLogFile, DetectedLoggingService, LoggingServiceType, OsInfo,
    ScannedFile,
};
use crate::platform::config::{AppConfig, DetectionConfig};
use crate::platform::fs::FileSystem;
use crate::platform::os::{self, ServiceDiscovery};
use serde::Serialize;
use std::sync::Arc;

/// Everything one discovery pass learned about the host.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryReport {
    pub os: OsInfo,
    pub services: Vec<DetectedLoggingService>,
    pub primary_service: LoggingServiceType,
    /// Files named by logrotate, with their rotation settings.
    pub rotated_files: Vec<ConfiguredLogFile>,
    /// Directories or pattern files that could not be read.
    pub warnings: Vec<String>,
    pub classification: ClassificationResult,
}

/// The built-in library followed by every entry of the configured pattern
/// files. Unreadable files and invalid entries become warnings.
pub fn load_library(detection: &DetectionConfig) -> (Vec<LogPatternEntry>, Vec<String>) {
    let mut entries = library::builtin_library().to_vec();
    let mut warnings = Vec::new();

    for path in &detection.pattern_files {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                warnings.push(format!("Cannot read pattern file '{}': {e}", path.display()));
                continue;
            }
        };
        let (loaded, errors) = library::load_pattern_file(&content, path, PatternCategory::Custom);
        tracing::info!(file = %path.display(), patterns = loaded.len(), "Loaded pattern file");
        warnings.extend(errors.iter().map(|e| e.to_string()));
        entries.extend(loaded);
    }
    (entries, warnings)
}

/// Configured files that exist as regular files but were not scanned.
fn configured_candidates(
    fs: &dyn FileSystem,
    services: &[DetectedLoggingService],
    scanned: &[ScannedFile],
) -> Vec<ScannedFile> {
    let mut extra: Vec<ScannedFile> = Vec::new();
    for file in services.iter().flat_map(|s| s.files.iter()) {
        if scanned.iter().chain(extra.iter()).any(|f| f.path == file.path) {
            continue;
        }
        match fs.stat(&file.path) {
            Ok(stat) if stat.is_file => extra.push(ScannedFile {
                path: file.path.clone(),
                size: stat.size,
                modified: stat.modified,
            }),
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(file = %file.path.display(), error = %e, "Configured file not present");
            }
        }
    }
    extra
}

/// Run a full discovery pass against `fs`.
pub fn discover(fs: Arc<dyn FileSystem>, config: &AppConfig) -> DiscoveryReport {
    let host: &dyn FileSystem = fs.as_ref();
    let os = os::detect_os(host);

    let (found, outcome): (ServiceDiscovery, ScanOutcome) = std::thread::scope(|scope| {
        let probe = scope.spawn(|| os::discover_services(host, &os));
        let outcome = scan::scan_directories(host, &config.scan);
        let found = probe.join().unwrap_or_else(|_| {
            tracing::warn!("Service discovery thread panicked");
            ServiceDiscovery::default()
        });
        (found, outcome)
    });

    let mut warnings: Vec<String> = outcome.errors.iter().map(|e| e.to_string()).collect();
    let mut candidates = outcome.files;
    let extra = configured_candidates(host, &found.services, &candidates);
    if !extra.is_empty() {
        tracing::debug!(count = extra.len(), "Adding configured files outside scanned directories");
        candidates.extend(extra);
    }

    let (library, library_warnings) = load_library(&config.detection);
    warnings.extend(library_warnings);

    let classification = Classifier::new(Arc::clone(&fs), config.detection.clone(), config.pipeline)
        .with_library(library)
        .classify_scanned_files(&candidates);
    let primary_service = os::get_primary_logging_service(&found.services);

    tracing::info!(
        os = ?os.os_type,
        primary = %primary_service,
        services = found.services.len(),
        classified = classification.len(),
        "Discovery complete"
    );

    DiscoveryReport {
        os,
        services: found.services,
        primary_service,
        rotated_files: found.rotated_files,
        warnings,
        classification,
    }
}
