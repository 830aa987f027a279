//! Filesystem primitives: lock-protected durable writes and `file://`
//! reference resolution.
//!
//! The engine treats these as its only way of touching disk for writes. The
//! exclusive lock is held for the duration of a single file write; it gives
//! writer-writer exclusion per file and nothing more (see the concurrency
//! notes on [`crate::Silo`]).

use std::env;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;

/// Scheme prefix recognized by [`resolve_file_ref`].
const FILE_SCHEME: &str = "file://";

/// Write `bytes` to `path`: create parent directories, take an exclusive
/// lock for the duration of the write, truncate, write, flush, and set the
/// file permissions. The write happens in place; there is no rename swap.
pub fn write_durable(path: &Path, bytes: &[u8], file_mode: u32, dir_mode: u32) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent, dir_mode)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .open(path)?;
    file.lock_exclusive()?;
    let outcome = write_locked(&file, bytes);
    let _ = fs2::FileExt::unlock(&file);
    outcome?;

    set_file_mode(path, file_mode)
}

fn write_locked(mut file: &File, bytes: &[u8]) -> io::Result<()> {
    file.set_len(0)?;
    file.write_all(bytes)?;
    file.flush()
}

/// Create `dir` (and any missing parents) with the given permission bits.
#[cfg(unix)]
pub fn ensure_dir(dir: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    if dir.is_dir() {
        return Ok(());
    }
    fs::DirBuilder::new().recursive(true).mode(mode).create(dir)
}

#[cfg(not(unix))]
pub fn ensure_dir(dir: &Path, _mode: u32) -> io::Result<()> {
    fs::create_dir_all(dir)
}

#[cfg(unix)]
fn set_file_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_file_mode(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}

/// When `text` is a `file://` reference, read the named file and return its
/// content. Relative references resolve against the current directory.
/// Returns `None` for non-references and unreadable files, in which case
/// the caller keeps the literal string.
pub fn resolve_file_ref(text: &str) -> Option<Vec<u8>> {
    let rest = text.strip_prefix(FILE_SCHEME)?;
    let path = Path::new(rest);
    let path: PathBuf = if path.is_absolute() || rest.starts_with('.') {
        path.to_path_buf()
    } else {
        env::current_dir().ok()?.join(rest)
    };
    fs::read(path).ok()
}
