// LogScout - core/rotation.rs
//
// Rotation-family grouping. `access.log`, `access.log.1` and
// `access.log.2.gz` share the canonical base path `access.log` and are
// classified once, through a single representative member.

use crate::core::model::ScannedFile;
use crate::util::constants;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

fn numeric_suffix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\.(\d+)$").expect("rotation: invalid numeric regex"))
}

/// logrotate `dateext` suffixes: `-20240115`, `.2024-01-15`, `-2024011512`.
fn date_suffix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[.-]\d{4}-?\d{2}-?\d{2}(?:[-_]?\d{2,6})?$").expect("rotation: invalid date regex")
    })
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("")
}

/// Compression suffix of `path`, if any.
pub fn compression_suffix(path: &Path) -> Option<&'static str> {
    let name = file_name(path);
    constants::COMPRESSION_SUFFIXES
        .iter()
        .copied()
        .find(|s| name.len() > s.len() && name.ends_with(s))
}

pub fn is_compressed(path: &Path) -> bool {
    compression_suffix(path).is_some()
}

/// Rotation generation (`syslog.3` -> 3). Date-stamped and live files have none.
pub fn rotation_index(path: &Path) -> Option<u32> {
    let name = file_name(path);
    let name = compression_suffix(path)
        .map(|s| &name[..name.len() - s.len()])
        .unwrap_or(name);
    numeric_suffix_re()
        .captures(name)
        .and_then(|c| c[1].parse().ok())
}

/// Strip one compression suffix, then one rotation suffix (numeric or date).
pub fn canonical_base_path(path: &Path) -> PathBuf {
    let original = file_name(path);
    if original.is_empty() {
        return path.to_path_buf();
    }

    let mut name = original;
    if let Some(suffix) = compression_suffix(path) {
        name = &name[..name.len() - suffix.len()];
    }
    if let Some(m) = date_suffix_re().find(name) {
        name = &name[..m.start()];
    } else if let Some(m) = numeric_suffix_re().find(name) {
        name = &name[..m.start()];
    }

    if name.is_empty() || name == original {
        return path.to_path_buf();
    }
    path.with_file_name(name)
}

/// Scanned files sharing one canonical base path.
#[derive(Debug, Clone, PartialEq)]
pub struct RotationGroup {
    pub base: PathBuf,
    pub members: Vec<ScannedFile>,
}

impl RotationGroup {
    /// The member to sample: uncompressed first, then the live file itself,
    /// then the most recent generation.
    pub fn representative(&self) -> Option<&ScannedFile> {
        self.members.iter().min_by_key(|f| {
            (
                is_compressed(&f.path),
                f.path != self.base,
                rotation_index(&f.path).unwrap_or(0),
                f.path.clone(),
            )
        })
    }

    pub fn member_paths(&self) -> Vec<PathBuf> {
        self.members.iter().map(|f| f.path.clone()).collect()
    }
}

/// Group files by canonical base path. Groups come back sorted by base path
/// and members sorted by path.
pub fn group_by_base(files: &[ScannedFile]) -> Vec<RotationGroup> {
    let mut map: BTreeMap<PathBuf, Vec<ScannedFile>> = BTreeMap::new();
    for f in files {
        map.entry(canonical_base_path(&f.path))
            .or_default()
            .push(f.clone());
    }
    map.into_iter()
        .map(|(base, mut members)| {
            members.sort_by(|a, b| a.path.cmp(&b.path));
            members.dedup_by(|a, b| a.path == b.path);
            RotationGroup { base, members }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanned(path: &str) -> ScannedFile {
        ScannedFile {
            path: PathBuf::from(path),
            size: 10,
            modified: None,
        }
    }

    #[test]
    fn test_canonical_base_path() {
        let cases = [
            ("/var/log/access.log", "/var/log/access.log"),
            ("/var/log/access.log.1", "/var/log/access.log"),
            ("/var/log/access.log.2.gz", "/var/log/access.log"),
            ("/var/log/syslog.10.xz", "/var/log/syslog"),
            ("/var/log/messages-20240115", "/var/log/messages"),
            ("/var/log/messages-20240115.gz", "/var/log/messages"),
            ("/var/log/app.log.2024-01-15", "/var/log/app.log"),
            ("/var/log/name.log.3.gz", "/var/log/name.log"),
            ("/var/log/.gz", "/var/log/.gz"),
        ];
        for (input, expected) in cases {
            assert_eq!(
                canonical_base_path(Path::new(input)),
                PathBuf::from(expected),
                "input: {input}"
            );
        }
    }

    #[test]
    fn test_rotation_family_grouped_once() {
        let files = vec![
            scanned("/logs/access.log.2.gz"),
            scanned("/logs/access.log"),
            scanned("/logs/access.log.1"),
        ];
        let groups = group_by_base(&files);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].base, PathBuf::from("/logs/access.log"));
        assert_eq!(groups[0].members.len(), 3);
        assert_eq!(
            groups[0].representative().map(|f| f.path.clone()),
            Some(PathBuf::from("/logs/access.log"))
        );
    }

    #[test]
    fn test_representative_prefers_uncompressed_then_newest() {
        let groups = group_by_base(&[
            scanned("/logs/syslog.3.gz"),
            scanned("/logs/syslog.2"),
            scanned("/logs/syslog.1"),
        ]);
        assert_eq!(
            groups[0].representative().map(|f| f.path.clone()),
            Some(PathBuf::from("/logs/syslog.1"))
        );

        let groups = group_by_base(&[scanned("/logs/syslog.3.gz"), scanned("/logs/syslog.2.gz")]);
        assert_eq!(
            groups[0].representative().map(|f| f.path.clone()),
            Some(PathBuf::from("/logs/syslog.2.gz"))
        );
    }

    #[test]
    fn test_rotation_index() {
        assert_eq!(rotation_index(Path::new("/x/syslog.4.gz")), Some(4));
        assert_eq!(rotation_index(Path::new("/x/syslog")), None);
        assert!(is_compressed(Path::new("/x/a.log.1.zst")));
        assert!(!is_compressed(Path::new("/x/a.log")));
    }
}
