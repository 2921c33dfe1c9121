// LogScout - app/classify.rs
//
// Classification pipeline: scanned files -> three-tier verdicts.
//
//   1. Group files into rotation families by canonical base path.
//   2. Sample one representative per family (uncompressed member first).
//   3. Well-known critical names (syslog, auth.log, ...) are system-base:
//      validated with their own dialect parser and enabled by default.
//   4. Everything else is run through the format detector. Confidence at or
//      above the auto-detect threshold makes it auto-detected (then
//      re-validated on a larger, later sample); below it, custom.
//   5. Auto-detected and custom files stay disabled until a user confirms.
//
// Families are classified on a bounded rayon pool. Each sampling read runs
// on its own thread under a deadline so one hung file (a FIFO, a stalled
// network mount) cannot hold a worker; a sample that fails or times out is
// classified once as custom with `sample_error` set and never retried.
//
// On timeout the reader is told to stop through a cancel flag it checks
// between lines. A read blocked inside a single syscall cannot be
// interrupted from std: that thread lingers until the syscall returns, then
// exits without delivering anything.

use crate::core::detector::{self, Validation};
use crate::core::library::{self, LogPatternEntry, PatternCategory, PatternMatcher};
use crate::core::model::{
    ClassificationCategory, ClassificationResult, CustomParserConfig, FileClassification, LogType,
    ScannedFile,
};
use crate::core::parsers::ParserKind;
use crate::core::rotation::{self, RotationGroup};
use crate::platform::config::{DetectionConfig, PipelineConfig};
use crate::platform::fs::FileSystem;
use crate::util::constants;
use crate::util::error::SampleError;
use rayon::prelude::*;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

/// Whether a canonical base path names a well-known critical system log,
/// by exact or prefix match on the file name.
pub fn is_critical_log(base: &Path) -> bool {
    let name = base.file_name().and_then(|n| n.to_str()).unwrap_or("");
    !name.is_empty()
        && constants::CRITICAL_LOG_NAMES
            .iter()
            .any(|critical| name.starts_with(critical))
}

/// Classifies rotation families using a pattern library and a filesystem.
pub struct Classifier {
    fs: Arc<dyn FileSystem>,
    library: Vec<LogPatternEntry>,
    detection: DetectionConfig,
    pipeline: PipelineConfig,
}

impl Classifier {
    /// Classifier over the built-in pattern library.
    pub fn new(fs: Arc<dyn FileSystem>, detection: DetectionConfig, pipeline: PipelineConfig) -> Self {
        Self {
            fs,
            library: library::builtin_library().to_vec(),
            detection,
            pipeline,
        }
    }

    /// Replace the pattern library (built-ins plus user pattern files).
    pub fn with_library(mut self, library: Vec<LogPatternEntry>) -> Self {
        self.library = library;
        self
    }

    pub fn library(&self) -> &[LogPatternEntry] {
        &self.library
    }

    /// Read up to `max_lines` lines from `path` at `offset` under the
    /// per-file deadline.
    pub fn sample(&self, path: &Path, offset: usize, max_lines: usize) -> Result<Vec<String>, SampleError> {
        let timeout_ms = self.pipeline.sample_timeout_ms;
        let (tx, rx) = mpsc::channel();
        let fs = Arc::clone(&self.fs);
        let target = path.to_path_buf();
        let cancel = Arc::new(AtomicBool::new(false));
        let reader_cancel = Arc::clone(&cancel);

        std::thread::Builder::new()
            .name("logscout-sample".to_string())
            .spawn(move || {
                let _ = tx.send(fs.read_lines_cancellable(&target, offset, max_lines, &reader_cancel));
            })
            .map_err(|source| SampleError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        match rx.recv_timeout(Duration::from_millis(timeout_ms)) {
            Ok(Ok(lines)) => Ok(lines),
            Ok(Err(e)) if e.kind() == io::ErrorKind::Unsupported => Err(SampleError::Unsupported {
                path: path.to_path_buf(),
            }),
            Ok(Err(source)) => Err(SampleError::Io {
                path: path.to_path_buf(),
                source,
            }),
            Err(RecvTimeoutError::Timeout) => {
                cancel.store(true, Ordering::Relaxed);
                tracing::warn!(file = %path.display(), timeout_ms, "Sampling timed out");
                Err(SampleError::Timeout {
                    path: path.to_path_buf(),
                    timeout_ms,
                })
            }
            Err(RecvTimeoutError::Disconnected) => Err(SampleError::Io {
                path: path.to_path_buf(),
                source: io::Error::other("sampling thread exited without a result"),
            }),
        }
    }

    fn check_regular(&self, path: &Path) -> Result<(), SampleError> {
        match self.fs.stat(path) {
            Ok(stat) if stat.is_file => Ok(()),
            Ok(_) => Err(SampleError::NotAFile {
                path: path.to_path_buf(),
            }),
            Err(source) => Err(SampleError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Validation sample: the lines after the detection sample, or the head
    /// of the file when it is too short to have any.
    fn validation_sample(&self, path: &Path) -> Result<Vec<String>, SampleError> {
        let later = self.sample(
            path,
            self.detection.sample_lines,
            self.detection.validation_lines,
        )?;
        if later.iter().any(|l| !l.trim().is_empty()) {
            return Ok(later);
        }
        self.sample(path, 0, self.detection.validation_lines)
    }

    /// Classify one rotation family.
    pub fn classify_group(&self, group: &RotationGroup) -> FileClassification {
        let members = group.member_paths();
        let representative = group
            .representative()
            .map(|f| f.path.clone())
            .unwrap_or_else(|| group.base.clone());

        let mut verdict = FileClassification {
            path: group.base.clone(),
            representative: representative.clone(),
            members,
            category: ClassificationCategory::Custom,
            log_type: None,
            format: None,
            confidence: 0,
            validated: false,
            enabled: false,
            custom_config: None,
            sample_error: None,
        };

        let outcome = if is_critical_log(&group.base) {
            self.classify_system_base(&representative, &group.base, &mut verdict)
        } else {
            self.classify_by_detection(&representative, &mut verdict)
        };

        if let Err(e) = outcome {
            tracing::debug!(file = %representative.display(), error = %e, "Sampling failed, classifying as custom");
            verdict.category = ClassificationCategory::Custom;
            verdict.enabled = false;
            verdict.validated = false;
            verdict.sample_error = Some(e.to_string());
        }
        if verdict.category == ClassificationCategory::Custom && verdict.custom_config.is_none() {
            verdict.custom_config = Some(CustomParserConfig::default());
        }

        tracing::debug!(
            file = %verdict.path.display(),
            category = ?verdict.category,
            format = ?verdict.format,
            confidence = verdict.confidence,
            validated = verdict.validated,
            "File classified"
        );
        verdict
    }

    fn classify_system_base(
        &self,
        representative: &Path,
        base: &Path,
        verdict: &mut FileClassification,
    ) -> Result<(), SampleError> {
        let kind = ParserKind::for_log_type(LogType::from_path(base));
        self.check_regular(representative)?;
        let lines = self.sample(representative, 0, self.detection.validation_lines)?;

        let dialect = LogPatternEntry {
            name: kind.as_str().to_string(),
            description: String::new(),
            category: PatternCategory::System,
            log_type: kind.as_str().to_string(),
            matcher: PatternMatcher::Parser(kind),
            confidence_threshold: self.detection.validation_threshold,
        };
        let Validation {
            validated,
            confidence,
            ..
        } = detector::validate_detected_format(&dialect, &lines, self.detection.validation_threshold);

        verdict.category = ClassificationCategory::SystemBase;
        verdict.log_type = Some(kind.as_str().to_string());
        verdict.confidence = confidence;
        verdict.validated = validated;
        verdict.enabled = true;
        Ok(())
    }

    fn classify_by_detection(
        &self,
        representative: &Path,
        verdict: &mut FileClassification,
    ) -> Result<(), SampleError> {
        self.check_regular(representative)?;
        let lines = self.sample(representative, 0, self.detection.sample_lines)?;

        let Some(detected) = detector::detect_format_with(&self.library, &lines) else {
            tracing::debug!(file = %representative.display(), "Empty sample, classifying as custom");
            return Ok(());
        };
        verdict.confidence = detected.confidence;

        let entry = match detected.entry {
            Some(entry) if detected.confidence >= self.detection.auto_detect_threshold => entry,
            _ => {
                if let Some(first) = lines.iter().find(|l| !l.trim().is_empty()) {
                    let preview: String = first.chars().take(constants::DEBUG_MAX_LINE_PREVIEW).collect();
                    tracing::debug!(
                        file = %representative.display(),
                        confidence = detected.confidence,
                        line = %preview,
                        "No library entry matched"
                    );
                }
                return Ok(());
            }
        };

        let validation_lines = self.validation_sample(representative)?;
        let validation = detector::validate_detected_format(
            &entry,
            &validation_lines,
            self.detection.validation_threshold,
        );

        verdict.category = ClassificationCategory::AutoDetected;
        verdict.log_type = Some(
            entry
                .parser_kind()
                .map(|k| k.as_str().to_string())
                .unwrap_or_else(|| entry.log_type.clone()),
        );
        verdict.format = Some(entry.name);
        verdict.validated = validation.validated;
        Ok(())
    }

    /// Classify every rotation family in `files` on the worker pool.
    pub fn classify_scanned_files(&self, files: &[ScannedFile]) -> ClassificationResult {
        let groups = rotation::group_by_base(files);
        tracing::info!(
            files = files.len(),
            groups = groups.len(),
            workers = self.pipeline.worker_threads,
            "Classification starting"
        );

        let verdicts: Vec<FileClassification> = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.pipeline.worker_threads)
            .thread_name(|i| format!("logscout-classify-{i}"))
            .build()
        {
            Ok(pool) => pool.install(|| groups.par_iter().map(|g| self.classify_group(g)).collect()),
            Err(e) => {
                tracing::warn!(error = %e, "Worker pool unavailable, classifying sequentially");
                groups.iter().map(|g| self.classify_group(g)).collect()
            }
        };

        let mut result = ClassificationResult::default();
        for verdict in verdicts {
            result.push(verdict);
        }
        tracing::info!(
            system_base = result.system_base_files.len(),
            auto_detected = result.auto_detected_files.len(),
            custom = result.custom_files.len(),
            "Classification complete"
        );
        result
    }
}

/// Classify `files` with the built-in library.
pub fn classify_scanned_files(
    fs: Arc<dyn FileSystem>,
    files: &[ScannedFile],
    detection: &DetectionConfig,
    pipeline: &PipelineConfig,
) -> ClassificationResult {
    Classifier::new(fs, detection.clone(), *pipeline).classify_scanned_files(files)
}

/// Every member path across all three tiers.
pub fn classified_paths(result: &ClassificationResult) -> Vec<PathBuf> {
    result.iter().flat_map(|c| c.members.iter().cloned()).collect()
}
