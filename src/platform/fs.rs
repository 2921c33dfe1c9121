// LogScout - platform/fs.rs
//
// Filesystem abstraction. Every path handed to a `FileSystem` is a path as
// seen on the monitored host; implementations translate it to their own view
// (e.g. a mount prefix) before touching the disk. Paths returned by
// `list_dir` are host paths too.
//
// Rotated members compressed with gzip, bzip2 or xz are decoded on the fly
// when sampled; the sample byte cap applies to the decoded stream.

use crate::util::constants;
use chrono::{DateTime, Utc};
use std::io::{self, BufRead, Read};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// Metadata for one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    /// Regular file (FIFOs, sockets and devices are not).
    pub is_file: bool,
    pub is_dir: bool,
}

/// Read-only filesystem access used by discovery and classification.
pub trait FileSystem: Send + Sync {
    /// Immediate children of `dir`, sorted by file name.
    fn list_dir(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;

    fn stat(&self, path: &Path) -> io::Result<FileStat>;

    /// Up to `max_lines` lines starting at line `offset` (0-based). Invalid
    /// UTF-8 is replaced, line terminators are stripped.
    fn read_lines(&self, path: &Path, offset: usize, max_lines: usize) -> io::Result<Vec<String>>;

    /// `read_lines` that gives up with `ErrorKind::Interrupted` once `cancel`
    /// is set. A read already blocked inside the OS is not interrupted; the
    /// flag is checked between lines.
    fn read_lines_cancellable(
        &self,
        path: &Path,
        offset: usize,
        max_lines: usize,
        cancel: &AtomicBool,
    ) -> io::Result<Vec<String>> {
        if cancel.load(Ordering::Relaxed) {
            return Err(cancelled(path));
        }
        self.read_lines(path, offset, max_lines)
    }

    /// Whole file as text, for configuration files. Files larger than
    /// `MAX_CONFIG_FILE_SIZE` are refused.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    fn exists(&self, path: &Path) -> bool {
        self.stat(path).is_ok()
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.stat(path).map(|s| s.is_dir).unwrap_or(false)
    }
}

// =============================================================================
// Path translation
// =============================================================================

/// Maps host paths onto the local view when the host's root filesystem is
/// mounted somewhere else (container sidecar, forensic image).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathTranslator {
    mount_prefix: Option<PathBuf>,
}

impl PathTranslator {
    pub fn new(mount_prefix: Option<PathBuf>) -> Self {
        let mount_prefix = mount_prefix.filter(|p| !p.as_os_str().is_empty() && p != Path::new("/"));
        Self { mount_prefix }
    }

    pub fn identity() -> Self {
        Self::default()
    }

    pub fn mount_prefix(&self) -> Option<&Path> {
        self.mount_prefix.as_deref()
    }

    /// Host path -> local path.
    pub fn to_local(&self, host_path: &Path) -> PathBuf {
        match &self.mount_prefix {
            None => host_path.to_path_buf(),
            Some(prefix) => {
                let relative: PathBuf = host_path
                    .components()
                    .filter(|c| !matches!(c, Component::RootDir | Component::Prefix(_)))
                    .collect();
                prefix.join(relative)
            }
        }
    }

    /// Local path -> host path. `None` if `local` lies outside the prefix.
    pub fn to_host(&self, local: &Path) -> Option<PathBuf> {
        match &self.mount_prefix {
            None => Some(local.to_path_buf()),
            Some(prefix) => local
                .strip_prefix(prefix)
                .ok()
                .map(|rel| Path::new("/").join(rel)),
        }
    }
}

// =============================================================================
// Local filesystem
// =============================================================================

/// The real filesystem, seen through a `PathTranslator`.
#[derive(Debug, Clone, Default)]
pub struct LocalFs {
    translator: PathTranslator,
}

impl LocalFs {
    pub fn new(translator: PathTranslator) -> Self {
        Self { translator }
    }

    pub fn translator(&self) -> &PathTranslator {
        &self.translator
    }
}

fn unsupported_compression(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        format!("no decoder for compressed file: {}", path.display()),
    )
}

fn cancelled(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::Interrupted,
        format!("read cancelled: {}", path.display()),
    )
}

/// Open `local` for sampling, decoding by the host path's compression suffix.
fn open_sample(host: &Path, local: &Path) -> io::Result<Box<dyn Read>> {
    let suffix = crate::core::rotation::compression_suffix(host);
    let file = std::fs::File::open(local)?;
    let reader: Box<dyn Read> = match suffix {
        None => Box::new(file),
        Some(".gz") => Box::new(flate2::read::MultiGzDecoder::new(file)),
        Some(".bz2") => Box::new(bzip2::read::MultiBzDecoder::new(file)),
        Some(".xz") => Box::new(xz2::read::XzDecoder::new_multi_decoder(file)),
        Some(_) => return Err(unsupported_compression(host)),
    };
    Ok(reader)
}

impl LocalFs {
    fn read_sample(
        &self,
        path: &Path,
        offset: usize,
        max_lines: usize,
        cancel: Option<&AtomicBool>,
    ) -> io::Result<Vec<String>> {
        let source = open_sample(path, &self.translator.to_local(path))?;
        let mut reader = io::BufReader::new(source.take(constants::MAX_SAMPLE_BYTES));

        let mut lines = Vec::with_capacity(max_lines.min(constants::MAX_SAMPLE_LINES));
        let mut buf = Vec::new();
        let mut index = 0usize;
        while lines.len() < max_lines {
            if cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
                tracing::debug!(file = %path.display(), lines = lines.len(), "Sample read cancelled");
                return Err(cancelled(path));
            }
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            if index >= offset {
                let text = String::from_utf8_lossy(&buf);
                lines.push(text.trim_end_matches(['\n', '\r']).to_string());
            }
            index += 1;
        }
        Ok(lines)
    }
}

impl FileSystem for LocalFs {
    fn list_dir(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let local = self.translator.to_local(dir);
        // Surface "missing" / "not a directory" / "permission denied" for the
        // directory itself instead of an empty listing.
        std::fs::read_dir(&local)?;

        let mut children = Vec::new();
        for entry in walkdir::WalkDir::new(&local)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .sort_by_file_name()
        {
            match entry {
                Ok(e) => children.push(dir.join(e.file_name())),
                Err(e) => {
                    tracing::debug!(dir = %dir.display(), error = %e, "Skipping unreadable entry");
                }
            }
        }
        Ok(children)
    }

    fn stat(&self, path: &Path) -> io::Result<FileStat> {
        let meta = std::fs::metadata(self.translator.to_local(path))?;
        Ok(FileStat {
            size: meta.len(),
            modified: meta.modified().ok().map(DateTime::<Utc>::from),
            is_file: meta.is_file(),
            is_dir: meta.is_dir(),
        })
    }

    fn read_lines(&self, path: &Path, offset: usize, max_lines: usize) -> io::Result<Vec<String>> {
        self.read_sample(path, offset, max_lines, None)
    }

    fn read_lines_cancellable(
        &self,
        path: &Path,
        offset: usize,
        max_lines: usize,
        cancel: &AtomicBool,
    ) -> io::Result<Vec<String>> {
        self.read_sample(path, offset, max_lines, Some(cancel))
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let local = self.translator.to_local(path);
        let meta = std::fs::metadata(&local)?;
        if meta.len() > constants::MAX_CONFIG_FILE_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "{} is {} bytes, exceeds maximum of {}",
                    path.display(),
                    meta.len(),
                    constants::MAX_CONFIG_FILE_SIZE
                ),
            ));
        }
        let bytes = std::fs::read(&local)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_translator_round_trip() {
        let t = PathTranslator::new(Some(PathBuf::from("/host")));
        assert_eq!(t.to_local(Path::new("/var/log/syslog")), PathBuf::from("/host/var/log/syslog"));
        assert_eq!(
            t.to_host(Path::new("/host/var/log/syslog")),
            Some(PathBuf::from("/var/log/syslog"))
        );
        assert_eq!(t.to_host(Path::new("/elsewhere/x")), None);

        let id = PathTranslator::new(Some(PathBuf::from("/")));
        assert_eq!(id.mount_prefix(), None);
        assert_eq!(id.to_local(Path::new("/var/log")), PathBuf::from("/var/log"));
    }

    #[test]
    fn test_local_fs_through_prefix() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("var/log")).unwrap();
        fs::write(dir.path().join("var/log/b.log"), "one\ntwo\r\nthree\n").unwrap();
        fs::write(dir.path().join("var/log/a.log"), "x").unwrap();

        let lfs = LocalFs::new(PathTranslator::new(Some(dir.path().to_path_buf())));
        let listed = lfs.list_dir(Path::new("/var/log")).unwrap();
        assert_eq!(
            listed,
            vec![PathBuf::from("/var/log/a.log"), PathBuf::from("/var/log/b.log")]
        );

        let stat = lfs.stat(Path::new("/var/log/b.log")).unwrap();
        assert!(stat.is_file);
        assert_eq!(stat.size, 15);

        assert_eq!(
            lfs.read_lines(Path::new("/var/log/b.log"), 1, 10).unwrap(),
            vec!["two".to_string(), "three".to_string()]
        );
        assert_eq!(
            lfs.read_lines(Path::new("/var/log/b.log"), 0, 1).unwrap(),
            vec!["one".to_string()]
        );
        assert!(lfs.exists(Path::new("/var/log/a.log")));
        assert!(lfs.is_dir(Path::new("/var/log")));
        assert!(!lfs.exists(Path::new("/var/log/missing")));
    }

    #[test]
    fn test_list_missing_dir_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let lfs = LocalFs::new(PathTranslator::new(Some(dir.path().to_path_buf())));
        let err = lfs.list_dir(Path::new("/nope")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_rotated_members_are_decompressed() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let text = b"Jan 15 10:30:45 h sshd[1]: one\nJan 15 10:30:46 h sshd[1]: two\nJan 15 10:30:47 h sshd[1]: three\n";

        let mut gz = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        gz.write_all(text).unwrap();
        fs::write(dir.path().join("auth.log.1.gz"), gz.finish().unwrap()).unwrap();

        let mut bz = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
        bz.write_all(text).unwrap();
        fs::write(dir.path().join("auth.log.2.bz2"), bz.finish().unwrap()).unwrap();

        let mut xz = xz2::write::XzEncoder::new(Vec::new(), 6);
        xz.write_all(text).unwrap();
        fs::write(dir.path().join("auth.log.3.xz"), xz.finish().unwrap()).unwrap();

        let lfs = LocalFs::new(PathTranslator::new(Some(dir.path().to_path_buf())));
        for name in ["/auth.log.1.gz", "/auth.log.2.bz2", "/auth.log.3.xz"] {
            let lines = lfs.read_lines(Path::new(name), 1, 5).unwrap();
            assert_eq!(
                lines,
                vec![
                    "Jan 15 10:30:46 h sshd[1]: two".to_string(),
                    "Jan 15 10:30:47 h sshd[1]: three".to_string(),
                ],
                "{name}"
            );
        }
    }

    #[test]
    fn test_compression_without_decoder_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("x.log.1.zst"), b"\x28\xb5\x2f\xfd").unwrap();
        let err = LocalFs::default()
            .read_lines(&dir.path().join("x.log.1.zst"), 0, 5)
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
    }

    #[test]
    fn test_corrupt_gzip_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("x.log.1.gz"), b"\x1f\x8b").unwrap();
        assert!(LocalFs::default()
            .read_lines(&dir.path().join("x.log.1.gz"), 0, 5)
            .is_err());
    }

    #[test]
    fn test_cancelled_read_stops() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("a.log");
        fs::write(&p, "one\ntwo\n").unwrap();
        let lfs = LocalFs::default();

        let cancel = AtomicBool::new(false);
        assert_eq!(lfs.read_lines_cancellable(&p, 0, 10, &cancel).unwrap().len(), 2);

        cancel.store(true, Ordering::Relaxed);
        let err = lfs.read_lines_cancellable(&p, 0, 10, &cancel).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Interrupted);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("bin.log");
        fs::write(&p, b"ok\n\xff\xfe bad\n").unwrap();
        let lines = LocalFs::default().read_lines(&p, 0, 10).unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].ends_with(" bad"));
    }
}
