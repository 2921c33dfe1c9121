// LogScout - platform/sources/include.rs
//
// Include resolution shared by the logrotate, rsyslog and syslog-ng config
// readers. An include names a file, a directory, or a glob; each resolves to
// a sorted list of config files read through the `FileSystem`.
//
// Cycle safety: readers thread an `IncludeStack` through their recursion.
// A file already on the stack is never re-entered.

use crate::platform::fs::FileSystem;
use crate::util::constants;
use std::path::{Component, Path, PathBuf};

/// Config files currently being processed, outermost first.
#[derive(Debug, Default)]
pub struct IncludeStack {
    open: Vec<PathBuf>,
}

impl IncludeStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push `path` if it may be entered. Returns `false` for a cycle or when
    /// the nesting limit is reached.
    pub fn enter(&mut self, path: &Path) -> bool {
        if self.open.iter().any(|p| p == path) {
            tracing::warn!(path = %path.display(), "Include cycle detected, skipping");
            return false;
        }
        if self.open.len() >= constants::MAX_INCLUDE_DEPTH {
            tracing::warn!(
                path = %path.display(),
                depth = self.open.len(),
                "Include nesting limit reached, skipping"
            );
            return false;
        }
        self.open.push(path.to_path_buf());
        true
    }

    pub fn leave(&mut self) {
        self.open.pop();
    }

    pub fn depth(&self) -> usize {
        self.open.len()
    }
}

pub fn has_glob_meta(s: &str) -> bool {
    s.contains(['*', '?', '['])
}

/// Hidden files and package-manager leftovers are never included.
pub fn is_taboo(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    name.is_empty()
        || name.starts_with('.')
        || constants::INCLUDE_TABOO_SUFFIXES
            .iter()
            .any(|s| name.ends_with(s))
}

/// Resolve `target` against the directory of `including_file` when relative.
pub fn resolve_relative(including_file: &Path, target: &str) -> PathBuf {
    let target = Path::new(target);
    if target.is_absolute() {
        target.to_path_buf()
    } else {
        including_file
            .parent()
            .unwrap_or_else(|| Path::new("/"))
            .join(target)
    }
}

/// Expand a glob pattern component by component through `fs`. Only
/// existing paths are returned, sorted.
pub fn expand_glob(fs: &dyn FileSystem, pattern: &Path) -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = vec![PathBuf::new()];

    for component in pattern.components() {
        let part = match component {
            Component::RootDir => {
                candidates = candidates.into_iter().map(|c| c.join("/")).collect();
                continue;
            }
            Component::Normal(os) => os.to_string_lossy().into_owned(),
            other => {
                let s = other.as_os_str().to_owned();
                candidates = candidates.into_iter().map(|c| c.join(&s)).collect();
                continue;
            }
        };

        if !has_glob_meta(&part) {
            candidates = candidates.into_iter().map(|c| c.join(&part)).collect();
            continue;
        }

        let matcher = match glob::Pattern::new(&part) {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!(pattern = %pattern.display(), error = %e, "Invalid glob pattern");
                return Vec::new();
            }
        };
        let mut next = Vec::new();
        for dir in &candidates {
            let Ok(children) = fs.list_dir(dir) else {
                continue;
            };
            for child in children {
                let name = child.file_name().and_then(|n| n.to_str()).unwrap_or("");
                if name.starts_with('.') && !part.starts_with('.') {
                    continue;
                }
                if matcher.matches(name) {
                    next.push(child);
                }
            }
        }
        candidates = next;
        if candidates.is_empty() {
            break;
        }
    }

    let mut found: Vec<PathBuf> = candidates
        .into_iter()
        .filter(|p| !p.as_os_str().is_empty() && fs.exists(p))
        .collect();
    found.sort();
    found.dedup();
    found.truncate(constants::MAX_INCLUDE_FILES);
    found
}

/// Config files named by an include target: a glob, a directory (every
/// non-taboo regular file in it), or a single file.
pub fn resolve_include(fs: &dyn FileSystem, target: &Path) -> Vec<PathBuf> {
    let is_regular = |p: &Path| fs.stat(p).map(|s| s.is_file).unwrap_or(false);

    let mut files: Vec<PathBuf> = if has_glob_meta(&target.to_string_lossy()) {
        expand_glob(fs, target)
            .into_iter()
            .filter(|p| is_regular(p) && !is_taboo(p))
            .collect()
    } else if fs.is_dir(target) {
        match fs.list_dir(target) {
            Ok(children) => children
                .into_iter()
                .filter(|p| is_regular(p) && !is_taboo(p))
                .collect(),
            Err(e) => {
                tracing::debug!(dir = %target.display(), error = %e, "Cannot list include directory");
                Vec::new()
            }
        }
    } else if is_regular(target) {
        vec![target.to_path_buf()]
    } else {
        tracing::debug!(target = %target.display(), "Include target does not exist");
        Vec::new()
    };

    if files.len() > constants::MAX_INCLUDE_FILES {
        tracing::warn!(
            target = %target.display(),
            count = files.len(),
            max = constants::MAX_INCLUDE_FILES,
            "Include expands to too many files, truncating"
        );
        files.truncate(constants::MAX_INCLUDE_FILES);
    }
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::fs::{LocalFs, PathTranslator};
    use std::fs;

    fn host(dir: &tempfile::TempDir) -> LocalFs {
        LocalFs::new(PathTranslator::new(Some(dir.path().to_path_buf())))
    }

    #[test]
    fn test_stack_rejects_cycles() {
        let mut stack = IncludeStack::new();
        assert!(stack.enter(Path::new("/etc/a.conf")));
        assert!(stack.enter(Path::new("/etc/b.conf")));
        assert!(!stack.enter(Path::new("/etc/a.conf")));
        stack.leave();
        assert_eq!(stack.depth(), 1);
        assert!(stack.enter(Path::new("/etc/b.conf")));
    }

    #[test]
    fn test_directory_include_skips_taboo() {
        let dir = tempfile::tempdir().unwrap();
        let d = dir.path().join("etc/logrotate.d");
        fs::create_dir_all(&d).unwrap();
        for name in ["nginx", "rsyslog", "apt.dpkg-old", ".hidden", "old~", "x.rpmnew"] {
            fs::write(d.join(name), "").unwrap();
        }
        fs::create_dir(d.join("subdir")).unwrap();

        let files = resolve_include(&host(&dir), Path::new("/etc/logrotate.d"));
        assert_eq!(
            files,
            vec![
                PathBuf::from("/etc/logrotate.d/nginx"),
                PathBuf::from("/etc/logrotate.d/rsyslog")
            ]
        );
    }

    #[test]
    fn test_glob_include() {
        let dir = tempfile::tempdir().unwrap();
        let d = dir.path().join("etc/rsyslog.d");
        fs::create_dir_all(&d).unwrap();
        fs::write(d.join("50-default.conf"), "").unwrap();
        fs::write(d.join("20-ufw.conf"), "").unwrap();
        fs::write(d.join("README"), "").unwrap();

        let files = resolve_include(&host(&dir), Path::new("/etc/rsyslog.d/*.conf"));
        assert_eq!(
            files,
            vec![
                PathBuf::from("/etc/rsyslog.d/20-ufw.conf"),
                PathBuf::from("/etc/rsyslog.d/50-default.conf")
            ]
        );
    }

    #[test]
    fn test_glob_in_directory_component() {
        let dir = tempfile::tempdir().unwrap();
        for app in ["alpha", "beta"] {
            let d = dir.path().join("var/log").join(app);
            fs::create_dir_all(&d).unwrap();
            fs::write(d.join("app.log"), "x").unwrap();
        }
        let found = expand_glob(&host(&dir), Path::new("/var/log/*/app.log"));
        assert_eq!(
            found,
            vec![
                PathBuf::from("/var/log/alpha/app.log"),
                PathBuf::from("/var/log/beta/app.log")
            ]
        );
    }

    #[test]
    fn test_missing_target_resolves_to_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(resolve_include(&host(&dir), Path::new("/etc/nothing.conf")).is_empty());
        assert!(resolve_include(&host(&dir), Path::new("/etc/nothing/*.conf")).is_empty());
    }

    #[test]
    fn test_resolve_relative() {
        assert_eq!(
            resolve_relative(Path::new("/etc/syslog-ng/syslog-ng.conf"), "conf.d/*.conf"),
            PathBuf::from("/etc/syslog-ng/conf.d/*.conf")
        );
        assert_eq!(
            resolve_relative(Path::new("/etc/syslog-ng/syslog-ng.conf"), "/abs.conf"),
            PathBuf::from("/abs.conf")
        );
    }
}
