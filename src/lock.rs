//! Cross-process repository lock.
//!
//! Mutating operations hold an exclusive advisory lock on
//! `<repo>/.git/lnk.lock` so two concurrent invocations cannot interleave
//! tracking-file writes.  The lock is released when the guard is dropped.

use std::fs::{File, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs4::fs_std::FileExt;

use crate::error::{ErrorCode, LnkError, Result, Severity};

/// File name of the lock inside the repository's `.git` directory.
pub const LOCK_FILE: &str = "lnk.lock";

/// Holds the repository lock until dropped.
#[derive(Debug)]
pub struct RepoLock {
    _file: File,
    path: PathBuf,
}

impl RepoLock {
    /// Acquire the lock for `repo`, retrying until `timeout` elapses.
    ///
    /// # Errors
    ///
    /// Returns a `FILE_OPERATION` error if the lock file cannot be opened or
    /// another process still holds the lock after `timeout`.
    pub fn acquire(repo: &Path, timeout: Duration) -> Result<Self> {
        let retry_interval = if cfg!(test) {
            Duration::from_millis(10)
        } else {
            Duration::from_millis(100)
        };
        let path = repo.join(".git").join(LOCK_FILE);
        let start = Instant::now();

        loop {
            let file = OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .open(&path)
                .map_err(|e| {
                    LnkError::wrap(
                        e,
                        ErrorCode::FileOperation,
                        "cannot open repository lock",
                        Severity::Error,
                    )
                    .with_context("lock_path", path.display())
                })?;

            match file.try_lock_exclusive() {
                Ok(true) => {
                    let _ = file.set_len(0);
                    let mut handle = &file;
                    let _ = writeln!(handle, "pid={}", std::process::id());
                    tracing::trace!(path = %path.display(), "repository lock acquired");
                    return Ok(Self { _file: file, path });
                }
                Ok(false) | Err(_) if start.elapsed() < timeout => {
                    std::thread::sleep(retry_interval);
                }
                Ok(false) | Err(_) => {
                    return Err(LnkError::new(
                        ErrorCode::FileOperation,
                        "another lnk process is using this repository",
                        Severity::Error,
                    )
                    .with_context("lock_path", path.display())
                    .with_suggestion("wait for the other lnk command to finish, then retry")
                    .with_recoverable(true));
                }
            }
        }
    }

    /// Path of the lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_times_out_while_held() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();

        let held = RepoLock::acquire(dir.path(), Duration::from_millis(50)).unwrap();
        let err = RepoLock::acquire(dir.path(), Duration::from_millis(50)).unwrap_err();

        assert_eq!(err.code(), ErrorCode::FileOperation);
        assert!(err.recoverable());
        assert!(held.path().ends_with(".git/lnk.lock"));
    }

    #[test]
    fn lock_released_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();

        drop(RepoLock::acquire(dir.path(), Duration::from_millis(50)).unwrap());
        RepoLock::acquire(dir.path(), Duration::from_millis(50)).unwrap();
    }

    #[test]
    fn missing_git_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = RepoLock::acquire(dir.path(), Duration::from_millis(10)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::FileOperation);
    }
}
