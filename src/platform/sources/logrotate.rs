// LogScout - platform/sources/logrotate.rs
//
// logrotate configuration reader.
//
// Grammar handled:
//   - global directives before any block become defaults for later blocks
//   - `include <file|dir|glob>` is followed recursively and shares the
//     global defaults, as logrotate itself does
//   - `path [path...] {` opens a block (the paths may also sit on the
//     preceding lines); a line ending in `}` closes it, and
//     `path { directive }` opens and closes on one line
//   - only path-like tokens become block paths, and only absolute paths
//     are reported
//   - `postrotate`/`prerotate`/`firstaction`/`lastaction`/`preremove`
//     bodies are skipped up to `endscript`
//   - block paths containing glob characters are expanded through the
//     filesystem; literal paths are reported even if absent

use crate::core::model::{
    push_configured_file, ConfigSource, ConfiguredLogFile, LogType, RotationPattern,
};
use crate::platform::fs::FileSystem;
use crate::platform::sources::include::{self, IncludeStack};
use std::path::{Path, PathBuf};

const SCRIPT_DIRECTIVES: &[&str] = &[
    "postrotate",
    "prerotate",
    "firstaction",
    "lastaction",
    "preremove",
];

/// Rotation settings carried by a block or by the global scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RotateSettings {
    pub rotation: Option<RotationPattern>,
    pub keep: Option<u32>,
    pub compress: Option<bool>,
}

impl RotateSettings {
    /// Apply one directive. Returns `false` if the directive is not a
    /// rotation setting.
    fn apply(&mut self, tokens: &[String]) -> bool {
        let Some(first) = tokens.first() else {
            return false;
        };
        if let Some(pattern) = RotationPattern::from_directive(first) {
            self.rotation = Some(pattern);
            return true;
        }
        match first.as_str() {
            "rotate" => {
                self.keep = tokens.get(1).and_then(|n| n.parse().ok());
                true
            }
            "compress" => {
                self.compress = Some(true);
                true
            }
            "nocompress" => {
                self.compress = Some(false);
                true
            }
            _ => false,
        }
    }
}

/// Split a config line into whitespace-separated tokens, honouring double
/// and single quotes.
pub(crate) fn split_tokens(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in line.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            None => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn looks_like_path(token: &str) -> bool {
    token.starts_with('/') || token.starts_with('~') || include::has_glob_meta(token)
}

struct Block {
    paths: Vec<String>,
    settings: RotateSettings,
}

struct LogrotateReader<'a> {
    fs: &'a dyn FileSystem,
    stack: IncludeStack,
    defaults: RotateSettings,
    out: Vec<ConfiguredLogFile>,
}

impl<'a> LogrotateReader<'a> {
    fn read_file(&mut self, path: &Path) {
        if !self.stack.enter(path) {
            return;
        }
        match self.fs.read_to_string(path) {
            Ok(text) => self.parse_text(&text, path),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Cannot read logrotate config");
            }
        }
        self.stack.leave();
    }

    fn parse_text(&mut self, text: &str, source: &Path) {
        let mut block: Option<Block> = None;
        let mut pending_paths: Vec<String> = Vec::new();
        let mut in_script = false;

        for raw in text.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if in_script {
                if line == "endscript" {
                    in_script = false;
                }
                continue;
            }

            if let Some(current) = block.as_mut() {
                let (body, closes) = match line.strip_suffix('}') {
                    Some(body) => (body.trim(), true),
                    None => (line, false),
                };
                in_script = block_directive(current, body);
                if closes && !in_script {
                    if let Some(done) = block.take() {
                        self.emit(done);
                    }
                }
                continue;
            }

            // `path [path...] { [directive] [}]` on one line.
            if let Some((header, rest)) = line.split_once('{') {
                let mut paths = std::mem::take(&mut pending_paths);
                extend_paths(&mut paths, header, source);
                if paths.is_empty() {
                    tracing::debug!(source = %source.display(), "Block with no paths, ignoring");
                }
                let mut opened = Block {
                    paths,
                    settings: self.defaults,
                };
                match rest.split_once('}') {
                    Some((body, _)) => {
                        block_directive(&mut opened, body.trim());
                        self.emit(opened);
                    }
                    None => {
                        in_script = block_directive(&mut opened, rest.trim());
                        block = Some(opened);
                    }
                }
                continue;
            }

            let tokens = split_tokens(line);
            let Some(first) = tokens.first() else {
                continue;
            };
            if first == "include" {
                if let Some(target) = tokens.get(1) {
                    let target = include::resolve_relative(source, target);
                    for file in include::resolve_include(self.fs, &target) {
                        self.read_file(&file);
                    }
                }
            } else if looks_like_path(first) {
                extend_paths(&mut pending_paths, line, source);
            } else if !self.defaults.apply(&tokens) {
                tracing::trace!(source = %source.display(), directive = %first, "Ignoring global directive");
            }
        }

        if block.is_some() {
            tracing::debug!(source = %source.display(), "Unterminated block at end of file, ignoring");
        }
    }

    fn emit(&mut self, block: Block) {
        for token in &block.paths {
            let candidates: Vec<PathBuf> = if include::has_glob_meta(token) {
                include::expand_glob(self.fs, Path::new(token))
            } else {
                vec![PathBuf::from(token)]
            };
            for path in candidates {
                if !path.is_absolute() {
                    tracing::debug!(path = %path.display(), "Skipping non-absolute logrotate path");
                    continue;
                }
                let log_type = LogType::from_path(&path);
                let mut file = ConfiguredLogFile::new(path, log_type, ConfigSource::Config);
                file.rotation_pattern = block.settings.rotation;
                file.keep_count = block.settings.keep;
                file.compress = block.settings.compress;
                push_configured_file(&mut self.out, file);
            }
        }
    }
}

/// Append the path tokens of `text` to `paths`, dropping anything else.
fn extend_paths(paths: &mut Vec<String>, text: &str, source: &Path) {
    for token in split_tokens(text) {
        if looks_like_path(&token) {
            paths.push(token);
        } else {
            tracing::debug!(source = %source.display(), token = %token, "Ignoring non-path token");
        }
    }
}

/// Apply one directive inside a block. Returns `true` when it opens a script
/// body that runs up to `endscript`.
fn block_directive(block: &mut Block, text: &str) -> bool {
    let tokens = split_tokens(text);
    if tokens
        .first()
        .is_some_and(|t| SCRIPT_DIRECTIVES.contains(&t.as_str()))
    {
        return true;
    }
    block.settings.apply(&tokens);
    false
}

/// Read a logrotate configuration (and everything it includes) and return
/// the log files it rotates. Unreadable files yield nothing.
pub fn parse_logrotate_config(fs: &dyn FileSystem, path: &Path) -> Vec<ConfiguredLogFile> {
    let mut reader = LogrotateReader {
        fs,
        stack: IncludeStack::new(),
        defaults: RotateSettings::default(),
        out: Vec::new(),
    };
    reader.read_file(path);
    tracing::debug!(
        config = %path.display(),
        files = reader.out.len(),
        "logrotate configuration read"
    );
    reader.out
}

/// Copy rotation metadata from `rotations` onto `files` with the same path,
/// without overriding values already present.
pub fn apply_rotation_metadata(files: &mut [ConfiguredLogFile], rotations: &[ConfiguredLogFile]) {
    for file in files.iter_mut() {
        if let Some(r) = rotations.iter().find(|r| r.path == file.path) {
            file.rotation_pattern = file.rotation_pattern.or(r.rotation_pattern);
            file.keep_count = file.keep_count.or(r.keep_count);
            file.compress = file.compress.or(r.compress);
        }
    }
}
