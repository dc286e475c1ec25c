use crate::persist;
use log::debug;
use regex::Regex;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

const RESERVED_GROUPS: [&str; 2] = ["pre", "post"];

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("Invalid read pattern '{pattern}': {source}")]
    Invalid {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("Read pattern '{pattern}' must not define a '{group}' capture group")]
    ReservedGroup { pattern: String, group: String },
}

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("File not found: '{}'", .0.display())]
    NotFound(PathBuf),
    #[error("Failed to read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to back up '{}': {source}", path.display())]
    Backup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to write '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A configured read pattern, wrapped so that everything around the version
/// token is captured as `pre` and `post`.
#[derive(Debug, Clone)]
pub struct LinePattern {
    regex: Regex,
}

impl LinePattern {
    pub fn new(read_regex: &str) -> Result<Self, PatternError> {
        let inner = Regex::new(read_regex).map_err(|source| PatternError::Invalid {
            pattern: read_regex.to_string(),
            source,
        })?;
        if let Some(group) = inner
            .capture_names()
            .flatten()
            .find(|name| RESERVED_GROUPS.contains(name))
        {
            return Err(PatternError::ReservedGroup {
                pattern: read_regex.to_string(),
                group: group.to_string(),
            });
        }

        let full = format!("^(?P<pre>.*)(?:{read_regex})(?P<post>.*)$");
        let regex = Regex::new(&full).map_err(|source| PatternError::Invalid {
            pattern: read_regex.to_string(),
            source,
        })?;
        Ok(Self { regex })
    }

    /// Returns `line` with the matched version token swapped for
    /// `replacement`, or `None` when the line does not match.
    ///
    /// `line` must not carry its line terminator.
    pub fn rewrite(&self, line: &str, replacement: &str) -> Option<String> {
        let captures = self.regex.captures(line)?;
        let pre = captures.name("pre").map_or("", |m| m.as_str());
        let post = captures.name("post").map_or("", |m| m.as_str());
        Some(format!("{pre}{replacement}{post}"))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Report only, leave the file untouched.
    pub dry_run: bool,
    /// Keep a `.bak` copy of the original before replacing it.
    pub backup: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpdate {
    pub path: PathBuf,
    pub lines_modified: usize,
    pub written: bool,
    pub backup: Option<PathBuf>,
}

/// Rewrites every line of `contents` that matches `pattern`.
///
/// Line terminators are preserved as found. Returns the new contents and the
/// number of matched lines.
pub fn rewrite_lines(contents: &str, pattern: &LinePattern, replacement: &str) -> (String, usize) {
    let mut output = String::with_capacity(contents.len());
    let mut lines_modified = 0;

    for line in contents.split_inclusive('\n') {
        let (body, terminator) = split_terminator(line);
        match pattern.rewrite(body, replacement) {
            Some(rewritten) => {
                debug!("Rewrote line: '{}' -> '{}'", body, rewritten);
                output.push_str(&rewritten);
                lines_modified += 1;
            }
            None => output.push_str(body),
        }
        output.push_str(terminator);
    }

    (output, lines_modified)
}

fn split_terminator(line: &str) -> (&str, &str) {
    if let Some(body) = line.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = line.strip_suffix('\n') {
        (body, "\n")
    } else {
        (line, "")
    }
}

/// Substitutes `replacement` into every matching line of the file at `path`
/// and commits the result with a backup-then-atomic-replace.
pub fn update_file(
    path: impl AsRef<Path>,
    pattern: &LinePattern,
    replacement: &str,
    options: &WriteOptions,
) -> Result<FileUpdate, UpdateError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            UpdateError::NotFound(path.to_path_buf())
        } else {
            UpdateError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let (new_contents, lines_modified) = rewrite_lines(&contents, pattern, replacement);
    let mut update = FileUpdate {
        path: path.to_path_buf(),
        lines_modified,
        written: false,
        backup: None,
    };

    if new_contents == contents {
        debug!("'{}' is already up to date", path.display());
        return Ok(update);
    }
    if options.dry_run {
        debug!("Dry run, not writing '{}'", path.display());
        return Ok(update);
    }

    if options.backup {
        let backup = persist::backup(path).map_err(|source| UpdateError::Backup {
            path: path.to_path_buf(),
            source,
        })?;
        update.backup = Some(backup);
    }
    persist::write_atomic(path, &new_contents).map_err(|source| UpdateError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    update.written = true;

    Ok(update)
}
