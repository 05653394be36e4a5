#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::print_stderr
)]
//! Integration tests for init, add and remove against a real git repository.

mod common;

use std::fs;

use common::{Sandbox, git, git_log};
use lnk::{ErrorCode, LinkType, TrackedEntry};

// ---------------------------------------------------------------------------
// init
// ---------------------------------------------------------------------------

/// The first commit contains exactly an empty tracking file.
#[test]
fn init_commits_empty_tracking_file() {
    require_git!();
    let sb = Sandbox::new();

    sb.lnk().init().unwrap();

    assert_eq!(git_log(&sb.repo), vec!["lnk: 初始化仓库"]);
    assert_eq!(git(&sb.repo, &["ls-files"]), ".lnk");
    assert_eq!(sb.tracking(), "");
}

#[test]
fn operations_before_init_fail() {
    require_git!();
    let sb = Sandbox::new();
    sb.write(".bashrc", "x");

    let err = sb.lnk().add(sb.path(".bashrc")).unwrap_err();

    assert_eq!(err.code(), ErrorCode::RepoNotInitialized);
    assert!(!sb.is_symlink(".bashrc"));
}

// ---------------------------------------------------------------------------
// add / remove
// ---------------------------------------------------------------------------

/// Add then remove returns a 500-byte file to its original state.
#[test]
fn add_then_remove_round_trips_content() {
    require_git!();
    let sb = Sandbox::initialized();
    let content = "x".repeat(500);
    sb.write(".bashrc", &content);
    let lnk = sb.lnk();

    lnk.add(sb.path(".bashrc")).unwrap();

    assert!(sb.is_symlink(".bashrc"));
    assert_eq!(sb.read(".bashrc"), content);
    assert_eq!(fs::read_to_string(sb.repo.join(".bashrc")).unwrap(), content);
    assert_eq!(sb.tracking(), ".bashrc|soft\n");
    assert_eq!(git_log(&sb.repo)[0], "lnk: 添加文件 .bashrc");
    assert_eq!(git(&sb.repo, &["status", "--porcelain"]), "");

    lnk.remove(sb.path(".bashrc")).unwrap();

    assert!(!sb.is_symlink(".bashrc"));
    assert_eq!(sb.read(".bashrc"), content);
    assert!(!sb.repo.join(".bashrc").exists());
    assert_eq!(sb.tracking(), "");
    assert_eq!(git_log(&sb.repo)[0], "lnk: 移除文件 .bashrc");
    assert_eq!(git(&sb.repo, &["ls-files"]), ".lnk");
}

/// A second add of the same path is rejected and changes nothing.
#[test]
fn adding_twice_is_rejected() {
    require_git!();
    let sb = Sandbox::initialized();
    sb.write(".vimrc", "set nu");
    let lnk = sb.lnk();
    lnk.add(sb.path(".vimrc")).unwrap();
    let commits = git_log(&sb.repo).len();

    let err = lnk.add(sb.path(".vimrc")).unwrap_err();

    assert_eq!(err.code(), ErrorCode::FileAlreadyManaged);
    assert_eq!(sb.tracking(), ".vimrc|soft\n");
    assert_eq!(git_log(&sb.repo).len(), commits);
}

#[test]
fn nested_file_keeps_relative_layout() {
    require_git!();
    let sb = Sandbox::initialized();
    sb.write(".config/git/config", "[user]");

    sb.lnk().add(sb.path(".config/git/config")).unwrap();

    assert!(sb.repo.join(".config/git/config").is_file());
    assert_eq!(sb.tracking(), ".config/git/config|soft\n");
    assert!(sb.is_symlink(".config/git/config"));
}

#[cfg(unix)]
#[test]
fn hardlink_add_shares_inode() {
    use std::os::unix::fs::MetadataExt as _;

    require_git!();
    let sb = Sandbox::initialized();
    sb.write(".profile", "export A=1");
    let lnk = sb.builder().link_type(LinkType::Hard).build().unwrap();

    lnk.add(sb.path(".profile")).unwrap();

    let home_meta = fs::metadata(sb.path(".profile")).unwrap();
    let repo_meta = fs::metadata(sb.repo.join(".profile")).unwrap();
    assert!(!sb.is_symlink(".profile"));
    assert_eq!(home_meta.ino(), repo_meta.ino());
    assert_eq!(sb.tracking(), ".profile|hard\n");

    lnk.remove(sb.path(".profile")).unwrap();
    assert_eq!(sb.read(".profile"), "export A=1");
    assert!(!sb.repo.join(".profile").exists());
}

#[test]
fn batch_add_and_remove_use_one_commit_each() {
    require_git!();
    let sb = Sandbox::initialized();
    let paths = [
        sb.write(".bashrc", "b"),
        sb.write(".vimrc", "v"),
        sb.write(".gitconfig", "g"),
    ];
    let lnk = sb.lnk();

    let added = lnk.add_multiple(&paths).unwrap();

    assert_eq!(added.len(), 3);
    assert_eq!(git_log(&sb.repo)[0], "lnk: 批量添加 3 个文件");
    assert_eq!(lnk.list().unwrap().len(), 3);

    let removed = lnk.remove_multiple(&paths).unwrap();

    assert_eq!(removed.len(), 3);
    assert_eq!(git_log(&sb.repo)[0], "lnk: 批量移除 3 个文件");
    assert!(lnk.list().unwrap().is_empty());
    assert_eq!(sb.read(".gitconfig"), "g");
}

/// A batch naming an already-managed file skips it and adds the rest.
#[test]
fn batch_add_skips_managed_file() {
    require_git!();
    let sb = Sandbox::initialized();
    let bashrc = sb.write(".bashrc", "b");
    let vimrc = sb.write(".vimrc", "v");
    let lnk = sb.lnk();
    lnk.add(&bashrc).unwrap();

    let added = lnk.add_multiple(&[&bashrc, &vimrc]).unwrap();

    assert_eq!(added, vec![vimrc]);
    assert_eq!(sb.tracking(), ".bashrc|soft\n.vimrc|soft\n");
    assert_eq!(git_log(&sb.repo)[0], "lnk: 批量添加 1 个文件");
}

/// Names the tracking file cannot hold are refused before anything moves.
#[test]
fn untrackable_names_are_refused() {
    require_git!();
    let sb = Sandbox::initialized();
    let lnk = sb.lnk();
    for name in ["#notes#", "a|b"] {
        sb.write(name, "x");

        let err = lnk.add(sb.path(name)).unwrap_err();

        assert_eq!(err.code(), ErrorCode::FileOperation, "{name}");
        assert!(!sb.is_symlink(name));
    }
    assert!(lnk.list().unwrap().is_empty());
    assert_eq!(git_log(&sb.repo).len(), 1);
}

#[test]
fn recursive_add_commits_every_file() {
    require_git!();
    let sb = Sandbox::initialized();
    sb.write("dots/zshrc", "z");
    sb.write("dots/sub/tmux.conf", "t");
    sb.write("dots/.hidden", "h");

    let added = sb.lnk().add_recursive(&[sb.path("dots")]).unwrap();

    assert_eq!(added.len(), 2);
    assert_eq!(git_log(&sb.repo)[0], "lnk: 递归添加 2 个文件");
    assert!(sb.is_symlink("dots/zshrc"));
    assert!(sb.is_symlink("dots/sub/tmux.conf"));
    assert!(!sb.is_symlink("dots/.hidden"));
    assert_eq!(git(&sb.repo, &["status", "--porcelain"]), "");
}

// ---------------------------------------------------------------------------
// directory consolidation
// ---------------------------------------------------------------------------

/// Adding a directory whose child is already managed folds the child into
/// a single directory entry.
#[test]
fn directory_add_consolidates_managed_children() {
    require_git!();
    let sb = Sandbox::initialized();
    sb.write(".config/nvim/init.lua", "require('a')");
    sb.write(".config/nvim/lua/plugins.lua", "return {}");
    let lnk = sb.lnk();
    lnk.add(sb.path(".config/nvim/init.lua")).unwrap();

    lnk.add(sb.path(".config/nvim")).unwrap();

    assert_eq!(
        lnk.list().unwrap(),
        vec![TrackedEntry::new(".config/nvim", LinkType::Soft)]
    );
    assert!(sb.is_symlink(".config/nvim"));
    assert!(!sb.repo.join(".config/nvim/init.lua").is_symlink());
    assert_eq!(sb.read(".config/nvim/init.lua"), "require('a')");
    assert_eq!(sb.read(".config/nvim/lua/plugins.lua"), "return {}");
    assert!(git_log(&sb.repo)[0].starts_with("lnk: 目录整合 nvim"));
    assert_eq!(git(&sb.repo, &["status", "--porcelain"]), "");
    assert!(lnk.validate().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// hosts
// ---------------------------------------------------------------------------

#[test]
fn host_files_live_in_their_own_namespace() {
    require_git!();
    let sb = Sandbox::initialized();
    sb.write(".bashrc", "shared");
    sb.write(".ssh/config", "Host work");
    sb.lnk().add(sb.path(".bashrc")).unwrap();
    let work = sb.lnk_for_host("work");

    work.add(sb.path(".ssh/config")).unwrap();

    assert!(sb.repo.join("work.lnk/.ssh/config").is_file());
    assert_eq!(
        fs::read_to_string(sb.repo.join(".lnk.work")).unwrap(),
        ".ssh/config|soft\n"
    );
    assert_eq!(sb.tracking(), ".bashrc|soft\n");

    let all = sb.lnk().list_all().unwrap();
    assert_eq!(all.keys().collect::<Vec<_>>(), vec!["general", "work"]);
    assert_eq!(sb.lnk().list_by_host("work").unwrap().len(), 1);
    assert_eq!(
        sb.lnk().list_by_host("home").unwrap_err().code(),
        ErrorCode::HostNotFound
    );
}

#[test]
fn localhost_is_the_default_namespace() {
    require_git!();
    let sb = Sandbox::initialized();
    sb.write(".inputrc", "set bell-style none");

    sb.lnk_for_host("localhost").add(sb.path(".inputrc")).unwrap();

    assert_eq!(sb.tracking(), ".inputrc|soft\n");
    assert!(sb.repo.join(".inputrc").is_file());
}
