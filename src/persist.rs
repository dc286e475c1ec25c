use log::debug;
use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// `Cargo.toml` -> `Cargo.toml.bak`
pub fn backup_path(path: impl AsRef<Path>) -> PathBuf {
    let mut name: OsString = path.as_ref().as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

/// Copies `path` next to itself with a `.bak` suffix, replacing any older backup.
pub fn backup(path: impl AsRef<Path>) -> io::Result<PathBuf> {
    let path = path.as_ref();
    let backup = backup_path(path);
    fs::copy(path, &backup)?;
    debug!("Backed up '{}' to '{}'", path.display(), backup.display());
    Ok(backup)
}

/// Replaces the contents of `path` through a temporary file in the same
/// directory, so readers never observe a partially written file.
///
/// The permissions of an existing file are carried over.
pub fn write_atomic(path: impl AsRef<Path>, contents: &str) -> io::Result<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(contents.as_bytes())?;
    temp.as_file().sync_all()?;
    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(temp.path(), metadata.permissions())?;
    }
    temp.persist(path).map_err(|e| e.error)?;

    debug!("Wrote {} bytes to '{}'", contents.len(), path.display());
    Ok(())
}
