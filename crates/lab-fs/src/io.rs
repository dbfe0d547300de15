//! Atomic, owner-only I/O operations with file locking
//!
//! Everything lab persists (environment records, cluster topologies,
//! decrypted kubeconfigs) is private to the invoking user, so writes always
//! produce `0600` files inside `0700` directories on Unix.

use std::fs;
use std::io::Write;
use std::path::Path;

use fs2::FileExt;

use crate::{Error, Result};

/// Permission bits for files written by lab.
pub const PRIVATE_FILE_MODE: u32 = 0o600;

/// Permission bits for directories created by lab.
pub const PRIVATE_DIR_MODE: u32 = 0o700;

/// Create `dir` (and missing parents) restricted to the owner.
///
/// Directories that already exist keep their permissions.
pub fn ensure_private_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        return Ok(());
    }

    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(PRIVATE_DIR_MODE);
    }
    builder.create(dir).map_err(|e| Error::io(dir, e))
}

/// Write content atomically to a file with locking.
///
/// Uses write-to-temp-then-rename so readers never observe a partial file,
/// and holds an advisory lock on the temp file while writing. Every call gets
/// its own uniquely named temp file, so concurrent writers only race on the
/// final rename and the last one wins.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    // Same directory as the target so the rename stays on one filesystem
    let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            ensure_private_dir(parent)?;
            parent
        }
        None => Path::new("."),
    };

    let prefix = format!(
        ".{}.",
        path.file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default()
    );
    // NamedTempFile creates 0600 files and removes them again on drop
    let mut temp_file = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| Error::io(dir, e))?;

    temp_file.as_file().lock_exclusive().map_err(|_| Error::LockFailed {
        path: path.to_path_buf(),
    })?;

    temp_file
        .write_all(content)
        .and_then(|()| temp_file.as_file().sync_all())
        .map_err(|e| Error::io(temp_file.path(), e))?;

    temp_file.as_file().unlock().map_err(|_| Error::LockFailed {
        path: path.to_path_buf(),
    })?;

    temp_file
        .persist(path)
        .map_err(|e| Error::io(path, e.error))?;

    tracing::trace!(path = %path.display(), bytes = content.len(), "Wrote file atomically");
    Ok(())
}

/// Read text content from a file.
pub fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| Error::io(path, e))
}

/// Write text content to a file atomically.
pub fn write_text(path: &Path, content: &str) -> Result<()> {
    write_atomic(path, content.as_bytes())
}

/// Remove a file, treating an already-missing file as success.
///
/// Returns whether a file was actually removed.
pub fn remove_file_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// Remove a directory tree, treating an already-missing directory as success.
pub fn remove_dir_if_exists(dir: &Path) -> Result<bool> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::io(dir, e)),
    }
}
