//! Atomic file replacement.
//!
//! `write_atomic` either leaves the destination fully replaced with the
//! given bytes, durable to `sync_all`, or leaves it untouched. The temp
//! file is created in the destination's own directory so the final
//! rename never crosses a filesystem boundary (a cross-device rename is
//! not atomic).
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Every failure path removes the temp file (best effort) and reports
//!   a distinct [`WriteError`] variant

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tracing::debug;

/// Per-process sequence for unique temp file names.
static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

// ============================================================================
// Error Types
// ============================================================================

/// Failure modes of an atomic write. None are retried internally.
#[derive(Debug, Error)]
pub enum WriteError {
    /// The destination path was empty or blank.
    #[error("destination path is empty")]
    EmptyPath,

    /// The destination's parent directory could not be created.
    #[error("failed to create parent directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The destination exists and is a directory.
    #[error("destination is a directory: {path}")]
    DestinationIsDirectory { path: PathBuf },

    /// The temp file could not be created.
    #[error("failed to create temp file {path}: {source}")]
    CreateTemp {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Writing or syncing the temp file failed.
    #[error("failed to write temp file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Fewer bytes reached the temp file than were requested.
    #[error("short write: {written} of {expected} bytes")]
    ShortWrite { expected: u64, written: u64 },

    /// The final rename onto the destination failed.
    #[error("failed to rename {from} onto {to}: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

// ============================================================================
// Atomic Write
// ============================================================================

/// Replaces `dest` with `bytes`, all-or-nothing.
///
/// The parent directory is created if missing. `mode`, when given, is
/// applied to the temp file before the rename (Unix permission bits,
/// e.g. `0o644`); on non-Unix targets it is ignored.
///
/// # Errors
///
/// Any [`WriteError`]. On every error the destination holds its prior
/// contents (or remains absent) and no temp file is left behind.
pub fn write_atomic(bytes: &[u8], dest: &Path, mode: Option<u32>) -> Result<(), WriteError> {
    if dest.as_os_str().is_empty() || dest.to_string_lossy().trim().is_empty() {
        return Err(WriteError::EmptyPath);
    }

    if dest.is_dir() {
        return Err(WriteError::DestinationIsDirectory {
            path: dest.to_path_buf(),
        });
    }

    let parent = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(|source| WriteError::CreateDir {
        path: parent.clone(),
        source,
    })?;

    let temp_path = temp_path_for(dest, &parent);

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp_path)
        .map_err(|source| WriteError::CreateTemp {
            path: temp_path.clone(),
            source,
        })?;

    if let Err(source) = write_and_sync(&mut file, bytes, mode) {
        drop(file);
        remove_temp(&temp_path);
        return Err(WriteError::Write {
            path: temp_path,
            source,
        });
    }

    // Verify everything reached the temp file before it becomes visible.
    let written = file.metadata().map(|m| m.len()).unwrap_or(0);
    drop(file);
    if written != bytes.len() as u64 {
        remove_temp(&temp_path);
        return Err(WriteError::ShortWrite {
            expected: bytes.len() as u64,
            written,
        });
    }

    if let Err(source) = fs::rename(&temp_path, dest) {
        remove_temp(&temp_path);
        return Err(WriteError::Rename {
            from: temp_path,
            to: dest.to_path_buf(),
            source,
        });
    }

    debug!(path = %dest.display(), bytes = bytes.len(), "atomic write complete");
    Ok(())
}

/// Builds a unique temp path next to the destination.
fn temp_path_for(dest: &Path, parent: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
    parent.join(format!(".{}.tmp.{}.{}", name, process::id(), seq))
}

fn write_and_sync(file: &mut File, bytes: &[u8], mode: Option<u32>) -> io::Result<()> {
    file.write_all(bytes)?;
    file.sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Some(mode) = mode {
            file.set_permissions(fs::Permissions::from_mode(mode))?;
        }
    }
    #[cfg(not(unix))]
    let _ = mode;

    Ok(())
}

/// Best-effort temp cleanup; failures here must not mask the real error.
fn remove_temp(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        debug!(path = %path.display(), error = %e, "temp file cleanup failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn no_temp_files(dir: &Path) -> bool {
        fs::read_dir(dir)
            .map(|entries| {
                !entries
                    .filter_map(|e| e.ok())
                    .any(|e| e.file_name().to_string_lossy().contains(".tmp."))
            })
            .unwrap_or(false)
    }

    #[test]
    fn test_write_creates_file_with_exact_contents() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("config.json");

        write_atomic(b"{\"a\":1}", &dest, None).unwrap();

        assert_eq!(fs::read(&dest).unwrap(), b"{\"a\":1}");
        assert!(no_temp_files(dir.path()));
    }

    #[test]
    fn test_write_replaces_existing_file() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("config.json");
        fs::write(&dest, b"old contents").unwrap();

        write_atomic(b"new", &dest, None).unwrap();

        assert_eq!(fs::read(&dest).unwrap(), b"new");
        assert!(no_temp_files(dir.path()));
    }

    #[test]
    fn test_write_creates_missing_parent_directories() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("deep/nested/state/config.json");

        write_atomic(b"x", &dest, None).unwrap();

        assert_eq!(fs::read(&dest).unwrap(), b"x");
    }

    #[test]
    fn test_empty_path_is_rejected() {
        let result = write_atomic(b"x", Path::new(""), None);
        assert!(matches!(result, Err(WriteError::EmptyPath)));
    }

    #[test]
    fn test_directory_destination_is_rejected_and_untouched() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("subdir");
        fs::create_dir(&dest).unwrap();
        fs::write(dest.join("inner.txt"), b"keep me").unwrap();

        let result = write_atomic(b"x", &dest, None);

        assert!(matches!(
            result,
            Err(WriteError::DestinationIsDirectory { .. })
        ));
        assert_eq!(fs::read(dest.join("inner.txt")).unwrap(), b"keep me");
        assert!(no_temp_files(dir.path()));
    }

    #[test]
    fn test_failed_write_leaves_prior_contents() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("config.json");
        fs::write(&dest, b"prior").unwrap();

        // Writing with the destination swapped to a directory mid-way is
        // hard to provoke portably; a directory destination is the
        // simplest guaranteed-failure path that exercises the contract.
        let as_dir = dir.path().join("blocked");
        fs::create_dir(&as_dir).unwrap();
        assert!(write_atomic(b"x", &as_dir, None).is_err());

        assert_eq!(fs::read(&dest).unwrap(), b"prior");
    }

    #[test]
    fn test_empty_byte_buffer_is_valid() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("empty.json");

        write_atomic(b"", &dest, None).unwrap();

        assert_eq!(fs::read(&dest).unwrap(), b"");
    }

    #[cfg(unix)]
    #[test]
    fn test_requested_permissions_are_applied() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("config.json");

        write_atomic(b"{}", &dest, Some(0o644)).unwrap();

        let mode = fs::metadata(&dest).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
    }

    #[test]
    fn test_sequential_writes_observe_last_value() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("config.json");

        for i in 0..20 {
            let body = format!("{{\"n\":{i}}}");
            write_atomic(body.as_bytes(), &dest, None).unwrap();
            // Every intermediate read sees a complete document.
            let read = fs::read_to_string(&dest).unwrap();
            assert_eq!(read, body);
        }
        assert!(no_temp_files(dir.path()));
    }
}
