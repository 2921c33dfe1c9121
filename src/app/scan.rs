// LogScout - app/scan.rs
//
// Directory scan producing the candidate file list for classification.
//
// Reads metadata only (list-dir / stat), never file contents. Host-system
// directories are scanned one level deep unless `[scan] recursive` is set.
// Exclusion globs are evaluated before an entry is considered: file globs
// against file names, directory globs against directory names (excluded
// subtrees are never descended), path globs against the full host path.
//
// Per-directory errors are non-fatal: they are collected and the scan moves
// on to the remaining directories.

use crate::core::model::ScannedFile;
use crate::platform::config::ScanConfig;
use crate::platform::fs::FileSystem;
use crate::util::constants;
use crate::util::error::DiscoveryError;
use std::path::{Path, PathBuf};

/// Compile glob strings, skipping any that fail.
fn compile_patterns(patterns: &[String], kind: &str) -> Vec<glob::Pattern> {
    patterns
        .iter()
        .filter_map(|p| match glob::Pattern::new(p) {
            Ok(compiled) => Some(compiled),
            Err(e) => {
                tracing::warn!(pattern = %p, kind, error = %e, "Invalid glob pattern, skipping");
                None
            }
        })
        .collect()
}

fn name_of(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("")
}

/// Compiled exclusion globs.
#[derive(Debug, Clone, Default)]
pub struct ExclusionFilter {
    files: Vec<glob::Pattern>,
    dirs: Vec<glob::Pattern>,
    paths: Vec<glob::Pattern>,
}

impl ExclusionFilter {
    pub fn new(file_patterns: &[String], dir_patterns: &[String], path_patterns: &[String]) -> Self {
        Self {
            files: compile_patterns(file_patterns, "file"),
            dirs: compile_patterns(dir_patterns, "dir"),
            paths: compile_patterns(path_patterns, "path"),
        }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(
            &config.exclude_file_patterns,
            &config.exclude_dir_patterns,
            &config.exclude_path_patterns,
        )
    }

    fn path_excluded(&self, path: &Path) -> bool {
        let text = path.to_string_lossy();
        self.paths.iter().any(|p| p.matches(&text))
    }

    pub fn excludes_file(&self, path: &Path) -> bool {
        let name = name_of(path);
        self.files.iter().any(|p| p.matches(name)) || self.path_excluded(path)
    }

    pub fn excludes_dir(&self, path: &Path) -> bool {
        let name = name_of(path);
        self.dirs.iter().any(|p| p.matches(name)) || self.path_excluded(path)
    }
}

/// Files found by a scan plus the directories that could not be read.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub files: Vec<ScannedFile>,
    pub errors: Vec<DiscoveryError>,
}

fn check_root(fs: &dyn FileSystem, root: &Path) -> Result<(), DiscoveryError> {
    match fs.stat(root) {
        Ok(stat) if stat.is_dir => Ok(()),
        Ok(_) => Err(DiscoveryError::NotADirectory {
            path: root.to_path_buf(),
        }),
        Err(e) => Err(DiscoveryError::from_io(root.to_path_buf(), e)),
    }
}

/// Scan one directory. Fails only when `root` itself is missing, not a
/// directory, or unreadable; errors below the root land in `outcome.errors`.
pub fn scan_directory(
    fs: &dyn FileSystem,
    root: &Path,
    config: &ScanConfig,
    filter: &ExclusionFilter,
    outcome: &mut ScanOutcome,
) -> Result<(), DiscoveryError> {
    check_root(fs, root)?;

    let max_depth = if config.recursive {
        config.max_depth.clamp(1, constants::ABSOLUTE_MAX_DEPTH)
    } else {
        1
    };
    tracing::debug!(root = %root.display(), max_depth, "Scanning directory");

    // (directory, depth of its children)
    let mut pending: Vec<(PathBuf, usize)> = vec![(root.to_path_buf(), 1)];
    let mut found = 0usize;

    while let Some((dir, depth)) = pending.pop() {
        let children = match fs.list_dir(&dir) {
            Ok(c) => c,
            Err(e) if dir == root => return Err(DiscoveryError::from_io(dir, e)),
            Err(e) => {
                tracing::debug!(dir = %dir.display(), error = %e, "Cannot list directory");
                outcome.errors.push(DiscoveryError::from_io(dir, e));
                continue;
            }
        };

        let mut subdirs = Vec::new();
        for child in children {
            let stat = match fs.stat(&child) {
                Ok(s) => s,
                Err(e) => {
                    tracing::debug!(path = %child.display(), error = %e, "Cannot stat entry");
                    continue;
                }
            };

            if stat.is_dir {
                if depth < max_depth && !filter.excludes_dir(&child) {
                    subdirs.push((child, depth + 1));
                }
                continue;
            }
            if !stat.is_file {
                tracing::debug!(path = %child.display(), "Skipping non-regular file");
                continue;
            }
            if filter.excludes_file(&child) {
                tracing::trace!(path = %child.display(), "Excluded by pattern");
                continue;
            }

            outcome.files.push(ScannedFile {
                path: child,
                size: stat.size,
                modified: stat.modified,
            });
            found += 1;
        }
        // Reverse so the stack pops subdirectories in name order.
        pending.extend(subdirs.into_iter().rev());
    }

    tracing::debug!(root = %root.display(), files = found, "Directory scan complete");
    Ok(())
}

/// Scan every configured directory. A directory that fails is recorded and
/// skipped. Files come back sorted by path with duplicates removed.
pub fn scan_directories(fs: &dyn FileSystem, config: &ScanConfig) -> ScanOutcome {
    let filter = ExclusionFilter::from_config(config);
    let mut outcome = ScanOutcome::default();

    for dir in &config.directories {
        if let Err(e) = scan_directory(fs, dir, config, &filter, &mut outcome) {
            tracing::warn!(dir = %dir.display(), error = %e, "Scan directory skipped");
            outcome.errors.push(e);
        }
    }

    outcome.files.sort_by(|a, b| a.path.cmp(&b.path));
    outcome.files.dedup_by(|a, b| a.path == b.path);
    tracing::info!(
        files = outcome.files.len(),
        errors = outcome.errors.len(),
        "Scan complete"
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::fs::{LocalFs, PathTranslator};
    use std::fs;

    fn setup() -> (tempfile::TempDir, LocalFs) {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("var/log");
        fs::create_dir_all(log.join("nginx")).unwrap();
        fs::create_dir_all(log.join("journal/abc")).unwrap();
        fs::write(log.join("syslog"), "x\n").unwrap();
        fs::write(log.join("auth.log"), "x\n").unwrap();
        fs::write(log.join("wtmp"), "x").unwrap();
        fs::write(log.join("nginx/access.log"), "x\n").unwrap();
        fs::write(log.join("journal/abc/system.journal"), "x").unwrap();
        let lfs = LocalFs::new(PathTranslator::new(Some(dir.path().to_path_buf())));
        (dir, lfs)
    }

    fn paths(outcome: &ScanOutcome) -> Vec<&str> {
        outcome
            .files
            .iter()
            .map(|f| f.path.to_str().unwrap())
            .collect()
    }

    #[test]
    fn test_non_recursive_by_default() {
        let (_dir, lfs) = setup();
        let outcome = scan_directories(&lfs, &ScanConfig::default());
        assert!(outcome.errors.is_empty());
        assert_eq!(paths(&outcome), vec!["/var/log/auth.log", "/var/log/syslog"]);
    }

    #[test]
    fn test_recursive_skips_excluded_dirs() {
        let (_dir, lfs) = setup();
        let config = ScanConfig {
            recursive: true,
            ..ScanConfig::default()
        };
        let outcome = scan_directories(&lfs, &config);
        assert_eq!(
            paths(&outcome),
            vec!["/var/log/auth.log", "/var/log/nginx/access.log", "/var/log/syslog"]
        );
    }

    #[test]
    fn test_path_patterns() {
        let (_dir, lfs) = setup();
        let config = ScanConfig {
            recursive: true,
            exclude_path_patterns: vec!["/var/log/nginx/*".to_string(), "/var/log/auth*".to_string()],
            ..ScanConfig::default()
        };
        let outcome = scan_directories(&lfs, &config);
        assert_eq!(paths(&outcome), vec!["/var/log/syslog"]);
    }

    #[test]
    fn test_missing_directory_is_recorded() {
        let (_dir, lfs) = setup();
        let config = ScanConfig {
            directories: vec![PathBuf::from("/var/log"), PathBuf::from("/opt/missing")],
            ..ScanConfig::default()
        };
        let outcome = scan_directories(&lfs, &config);
        assert_eq!(outcome.files.len(), 2);
        assert_eq!(outcome.errors.len(), 1);
        assert!(matches!(outcome.errors[0], DiscoveryError::RootNotFound { .. }));
    }

    #[test]
    fn test_file_as_root_is_not_a_directory() {
        let (_dir, lfs) = setup();
        let mut outcome = ScanOutcome::default();
        let err = scan_directory(
            &lfs,
            Path::new("/var/log/syslog"),
            &ScanConfig::default(),
            &ExclusionFilter::default(),
            &mut outcome,
        )
        .unwrap_err();
        assert!(matches!(err, DiscoveryError::NotADirectory { .. }));
    }
}
