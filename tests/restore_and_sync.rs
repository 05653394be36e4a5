#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::print_stderr
)]
//! Integration tests for restore, status, validation, cleanup and syncing
//! two machines through a bare remote.

mod common;

use std::fs;

use common::{Sandbox, bare_remote, git_for, git_log};
use lnk::engine::{BootstrapOutcome, ValidationIssue};
use lnk::git::GitOps as _;
use lnk::{BACKUP_SUFFIX, ErrorCode};

// ---------------------------------------------------------------------------
// restore
// ---------------------------------------------------------------------------

/// Restoring twice changes nothing the second time.
#[test]
fn restore_is_idempotent() {
    require_git!();
    let sb = Sandbox::initialized();
    sb.write(".bashrc", "b");
    sb.write(".config/fish/config.fish", "f");
    let lnk = sb.lnk();
    lnk.add(sb.path(".bashrc")).unwrap();
    lnk.add(sb.path(".config/fish/config.fish")).unwrap();
    fs::remove_file(sb.path(".bashrc")).unwrap();
    fs::remove_dir_all(sb.path(".config/fish")).unwrap();

    let first = lnk.restore_symlinks().unwrap();

    assert_eq!(first.restored.len(), 2);
    assert!(sb.is_symlink(".bashrc"));
    assert_eq!(sb.read(".config/fish/config.fish"), "f");

    let second = lnk.restore_symlinks().unwrap();

    assert!(second.is_noop());
    assert_eq!(second.already_correct, 2);
}

/// A real file in the way is moved aside, never overwritten.
#[test]
fn restore_backs_up_conflicting_file() {
    require_git!();
    let sb = Sandbox::initialized();
    sb.write(".vimrc", "managed");
    let lnk = sb.lnk();
    lnk.add(sb.path(".vimrc")).unwrap();
    fs::remove_file(sb.path(".vimrc")).unwrap();
    sb.write(".vimrc", "local edit");

    let report = lnk.restore_symlinks().unwrap();

    assert_eq!(report.backups.len(), 1);
    assert!(sb.is_symlink(".vimrc"));
    assert_eq!(sb.read(".vimrc"), "managed");
    assert_eq!(sb.read(&format!(".vimrc{BACKUP_SUFFIX}")), "local edit");
}

// ---------------------------------------------------------------------------
// status / validate / cleanup
// ---------------------------------------------------------------------------

/// A lost repository copy shows up as a broken link, a validation issue and
/// finally a cleanup commit.
#[test]
fn lost_copy_is_reported_and_cleaned_up() {
    require_git!();
    let sb = Sandbox::initialized();
    sb.write(".bashrc", "b");
    sb.write(".zshrc", "z");
    let lnk = sb.lnk();
    lnk.add(sb.path(".bashrc")).unwrap();
    lnk.add(sb.path(".zshrc")).unwrap();
    fs::remove_file(sb.repo.join(".zshrc")).unwrap();

    let status = lnk.status().unwrap();
    assert_eq!(status.managed_files, 2);
    assert_eq!(status.broken_links, vec![".zshrc"]);
    assert!(status.git.dirty);
    assert_eq!(status.git.remote, None);

    let issues = lnk.validate().unwrap();
    assert!(
        issues
            .iter()
            .any(|i| matches!(i, ValidationIssue::MissingRepoFile { key, .. } if key == ".zshrc")),
        "got: {issues:?}"
    );

    let removed = lnk.cleanup_invalid_entries().unwrap();

    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].path, ".zshrc");
    assert_eq!(sb.tracking(), ".bashrc|soft\n");
    assert_eq!(git_log(&sb.repo)[0], "lnk: 清理无效条目 1 项");
    assert!(lnk.cleanup_invalid_entries().unwrap().is_empty());
}

#[test]
fn validate_reports_replaced_link() {
    require_git!();
    let sb = Sandbox::initialized();
    sb.write(".inputrc", "i");
    let lnk = sb.lnk();
    lnk.add(sb.path(".inputrc")).unwrap();
    fs::remove_file(sb.path(".inputrc")).unwrap();
    sb.write(".inputrc", "copy");

    let issues = lnk.validate().unwrap();

    assert_eq!(
        issues,
        vec![ValidationIssue::NotSymlink {
            key: ".inputrc".into()
        }]
    );
}

// ---------------------------------------------------------------------------
// push / pull between two machines
// ---------------------------------------------------------------------------

#[test]
fn push_without_remote_fails_after_committing() {
    require_git!();
    let sb = Sandbox::initialized();
    fs::write(sb.repo.join("notes.txt"), "n").unwrap();

    let err = sb.lnk().push(Some("notes")).unwrap_err();

    assert_eq!(err.code(), ErrorCode::GitCommand);
    assert_eq!(git_log(&sb.repo)[0], "notes");
}

/// Files added on one machine appear as links on another after a pull.
#[test]
fn two_machines_sync_through_bare_remote() {
    require_git!();
    let remote_dir = tempfile::tempdir().unwrap();
    let remote = remote_dir.path().join("dots.git");
    bare_remote(&remote);
    let url = remote.to_string_lossy().into_owned();

    let laptop = Sandbox::initialized();
    laptop.write(".bashrc", "from laptop");
    let a = laptop.lnk();
    a.add(laptop.path(".bashrc")).unwrap();
    git_for(&laptop.repo).set_remote("origin", &url).unwrap();
    assert!(!a.push(None).unwrap(), "add already committed everything");

    let desktop = Sandbox::new();
    let b = desktop.lnk();
    let report = b.init_with_remote(&url).unwrap();
    assert_eq!(report.bootstrap, BootstrapOutcome::NotFound);
    assert_eq!(b.list().unwrap().len(), 1);

    b.restore_symlinks().unwrap();
    assert!(desktop.is_symlink(".bashrc"));
    assert_eq!(desktop.read(".bashrc"), "from laptop");

    laptop.write(".vimrc", "set nu");
    a.add(laptop.path(".vimrc")).unwrap();
    a.push(None).unwrap();

    let pulled = b.pull().unwrap();

    assert_eq!(pulled.restored, vec![desktop.path(".vimrc")]);
    assert_eq!(pulled.already_correct, 1);
    assert_eq!(desktop.read(".vimrc"), "set nu");
}

#[test]
fn clone_of_plain_repository_is_rejected() {
    require_git!();
    let remote_dir = tempfile::tempdir().unwrap();
    let remote = remote_dir.path().join("plain.git");
    bare_remote(&remote);
    let seed = Sandbox::new();
    fs::create_dir_all(&seed.repo).unwrap();
    common::git(&seed.repo, &["init", "-q"]);
    fs::write(seed.repo.join("README"), "r").unwrap();
    common::git(&seed.repo, &["add", "README"]);
    common::git(&seed.repo, &["commit", "-q", "-m", "readme"]);
    common::git(
        &seed.repo,
        &["push", "-q", remote.to_str().unwrap(), "HEAD:refs/heads/main"],
    );

    let sb = Sandbox::new();
    let err = sb
        .lnk()
        .init_with_remote(remote.to_str().unwrap())
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::RepoNotInitialized);
    assert!(!sb.repo.exists());
}
