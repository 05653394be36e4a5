#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::print_stderr
)]
//! Failure injection: a failed step leaves the world as it was before the
//! operation, and a failed rollback is reported as critical.

mod common;

use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use common::{Sandbox, git, git_log};
use lnk::fs::{FileSystemOps, FsError, FsResult, SystemFileSystemOps};
use lnk::Severity;

/// Delegates to [`SystemFileSystemOps`], failing selected operations.
#[derive(Debug, Default)]
struct FailingFs {
    inner: SystemFileSystemOps,
    /// Fail the n-th symlink creation (1-based) and every later one.
    fail_symlink_from: Option<usize>,
    /// Fail the n-th move (1-based) and every later one.
    fail_move_from: Option<usize>,
    symlinks: AtomicUsize,
    moves: AtomicUsize,
}

fn injected(operation: &'static str, path: &Path) -> FsError {
    FsError::Io {
        operation,
        path: path.to_path_buf(),
        source: std::io::Error::other("injected failure"),
    }
}

impl FileSystemOps for FailingFs {
    fn validate_for_add(&self, path: &Path) -> FsResult<()> {
        self.inner.validate_for_add(path)
    }

    fn move_path(&self, src: &Path, dst: &Path) -> FsResult<()> {
        let n = self.moves.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_move_from.is_some_and(|from| n >= from) {
            return Err(injected("move", src));
        }
        self.inner.move_path(src, dst)
    }

    fn create_symlink(&self, target: &Path, link: &Path) -> FsResult<()> {
        let n = self.symlinks.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_symlink_from.is_some_and(|from| n >= from) {
            return Err(injected("symlink", link));
        }
        self.inner.create_symlink(target, link)
    }

    fn restore_symlink(&self, raw: &Path, link: &Path) -> FsResult<()> {
        self.inner.restore_symlink(raw, link)
    }

    fn create_hardlink(&self, target: &Path, link: &Path) -> FsResult<()> {
        self.inner.create_hardlink(target, link)
    }

    fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.inner.is_dir(path)
    }

    fn is_symlink(&self, path: &Path) -> bool {
        self.inner.is_symlink(path)
    }

    fn read_link(&self, path: &Path) -> FsResult<PathBuf> {
        self.inner.read_link(path)
    }

    fn metadata(&self, path: &Path) -> FsResult<Metadata> {
        self.inner.metadata(path)
    }

    fn remove_file(&self, path: &Path) -> FsResult<()> {
        self.inner.remove_file(path)
    }

    fn remove_dir_all(&self, path: &Path) -> FsResult<()> {
        self.inner.remove_dir_all(path)
    }

    fn list_dir(&self, path: &Path) -> FsResult<Vec<PathBuf>> {
        self.inner.list_dir(path)
    }

    fn ensure_dir(&self, path: &Path) -> FsResult<()> {
        self.inner.ensure_dir(path)
    }

    fn is_hardlink_to(&self, a: &Path, b: &Path) -> bool {
        self.inner.is_hardlink_to(a, b)
    }
}

/// A link failure after the move puts the file back untouched.
#[test]
fn failed_link_rolls_back_add() {
    require_git!();
    let sb = Sandbox::initialized();
    let content = "y".repeat(500);
    sb.write(".bashrc", &content);
    let lnk = sb.lnk_with_fs(FailingFs {
        fail_symlink_from: Some(1),
        ..FailingFs::default()
    });

    let err = lnk.add(sb.path(".bashrc")).unwrap_err();

    assert_eq!(err.severity(), Severity::Error);
    assert!(!sb.is_symlink(".bashrc"));
    assert_eq!(sb.read(".bashrc"), content);
    assert!(!sb.repo.join(".bashrc").exists());
    assert_eq!(sb.tracking(), "");
    assert_eq!(git_log(&sb.repo).len(), 1);
    assert_eq!(git(&sb.repo, &["status", "--porcelain"]), "");
}

/// When the undo itself fails the error turns critical and names the
/// stranded file.
#[test]
fn failed_rollback_is_critical() {
    require_git!();
    let sb = Sandbox::initialized();
    sb.write(".vimrc", "set nu");
    let lnk = sb.lnk_with_fs(FailingFs {
        fail_symlink_from: Some(1),
        fail_move_from: Some(2),
        ..FailingFs::default()
    });

    let err = lnk.add(sb.path(".vimrc")).unwrap_err();

    assert_eq!(err.severity(), Severity::Critical);
    assert!(!err.recoverable());
    assert!(err.to_string().contains(".vimrc"), "got: {err}");
    // The copy is stranded in the repository but never tracked.
    assert!(sb.repo.join(".vimrc").is_file());
    assert_eq!(sb.tracking(), "");
}

/// A batch whose third link fails leaves none of the batch applied.
#[test]
fn failed_batch_rolls_back_every_file() {
    require_git!();
    let sb = Sandbox::initialized();
    let paths = [
        sb.write(".a", "a"),
        sb.write(".b", "b"),
        sb.write(".c", "c"),
    ];
    let lnk = sb.lnk_with_fs(FailingFs {
        fail_symlink_from: Some(3),
        ..FailingFs::default()
    });

    let err = lnk.add_multiple(&paths).unwrap_err();

    assert_eq!(err.severity(), Severity::Error);
    for name in [".a", ".b", ".c"] {
        assert!(!sb.is_symlink(name), "{name} still linked");
        assert_eq!(sb.read(name), &name[1..]);
        assert!(!sb.repo.join(name).exists(), "{name} left in repository");
    }
    assert_eq!(sb.tracking(), "");
    assert_eq!(git_log(&sb.repo).len(), 1);
}

/// Remove of a file whose move-back fails relinks it and keeps the entry.
#[test]
fn failed_remove_keeps_file_managed() {
    require_git!();
    let sb = Sandbox::initialized();
    sb.write(".gitconfig", "[core]");
    sb.lnk().add(sb.path(".gitconfig")).unwrap();
    let lnk = sb.lnk_with_fs(FailingFs {
        fail_move_from: Some(1),
        ..FailingFs::default()
    });

    let err = lnk.remove(sb.path(".gitconfig")).unwrap_err();

    assert_eq!(err.severity(), Severity::Error);
    assert!(sb.is_symlink(".gitconfig"));
    assert_eq!(sb.read(".gitconfig"), "[core]");
    assert_eq!(sb.tracking(), ".gitconfig|soft\n");
}

/// A rejected commit puts a symlinked source back as the same link.
#[cfg(unix)]
#[test]
fn rejected_commit_restores_symlinked_source() {
    use std::os::unix::fs::{PermissionsExt as _, symlink};

    require_git!();
    let sb = Sandbox::initialized();
    sb.write("dotsrc/bashrc", "alias ll='ls -l'");
    symlink("dotsrc/bashrc", sb.path(".bashrc")).unwrap();
    let hook = sb.repo.join(".git/hooks/pre-commit");
    std::fs::create_dir_all(hook.parent().unwrap()).unwrap();
    std::fs::write(&hook, "#!/bin/sh\nexit 1\n").unwrap();
    std::fs::set_permissions(&hook, std::fs::Permissions::from_mode(0o755)).unwrap();

    assert!(sb.lnk().add(sb.path(".bashrc")).is_err());

    assert!(sb.is_symlink(".bashrc"));
    assert_eq!(
        std::fs::read_link(sb.path(".bashrc")).unwrap(),
        PathBuf::from("dotsrc/bashrc")
    );
    assert_eq!(sb.read(".bashrc"), "alias ll='ls -l'");
    assert!(!sb.repo.join(".bashrc").exists());
    assert_eq!(sb.tracking(), "");
}
