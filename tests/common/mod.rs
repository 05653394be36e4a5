// Shared helpers for integration tests.
//
// Every test gets a temporary home directory with the repository at its
// default location (`~/.config/lnk`) and drives the real `git` binary with a
// fixed identity and no user or system git config.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use lnk::fs::FileSystemOps;
use lnk::git::GitCli;
use lnk::{Lnk, LnkBuilder};

/// `true` if a `git` binary is on `PATH`.
pub fn git_available() -> bool {
    which::which("git").is_ok()
}

/// Return early from a test when git is missing.
#[macro_export]
macro_rules! require_git {
    () => {
        if !common::git_available() {
            eprintln!("git not found on PATH; skipping");
            return;
        }
    };
}

/// Git wrapper for `repo` isolated from the user's configuration.
pub fn git_for(repo: &Path) -> GitCli {
    GitCli::new(repo)
        .with_identity("lnk test", "lnk@example.com")
        .with_env("GIT_CONFIG_GLOBAL", "/dev/null")
        .with_env("GIT_CONFIG_NOSYSTEM", "1")
}

/// Run git directly in `dir` and return trimmed stdout.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_CONFIG_GLOBAL", "/dev/null")
        .env("GIT_CONFIG_NOSYSTEM", "1")
        .env("GIT_AUTHOR_NAME", "lnk test")
        .env("GIT_AUTHOR_EMAIL", "lnk@example.com")
        .env("GIT_COMMITTER_NAME", "lnk test")
        .env("GIT_COMMITTER_EMAIL", "lnk@example.com")
        .output()
        .expect("run git");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Commit subjects of `repo`, newest first.
pub fn git_log(repo: &Path) -> Vec<String> {
    git(repo, &["log", "--format=%s"])
        .lines()
        .map(ToString::to_string)
        .collect()
}

/// An isolated home directory backed by a [`tempfile::TempDir`].
pub struct Sandbox {
    /// Keeps the directory alive.
    pub tmp: tempfile::TempDir,
    /// Canonical home directory.
    pub home: PathBuf,
    /// Repository path (`~/.config/lnk`).
    pub repo: PathBuf,
}

impl Sandbox {
    /// Create an empty home directory.
    pub fn new() -> Self {
        let tmp = tempfile::tempdir().expect("create temp dir");
        let root = dunce::canonicalize(tmp.path()).expect("canonicalize temp dir");
        let home = root.join("home");
        std::fs::create_dir_all(&home).expect("create home");
        let repo = home.join(".config").join("lnk");
        Self { tmp, home, repo }
    }

    /// Create an empty home directory with an initialized repository.
    pub fn initialized() -> Self {
        let sandbox = Self::new();
        sandbox.lnk().init().expect("init");
        sandbox
    }

    /// Engine builder for this home with real git.
    pub fn builder(&self) -> LnkBuilder {
        Lnk::builder()
            .home(&self.home)
            .repo_path(&self.repo)
            .git(git_for(&self.repo))
            .lock_timeout(Duration::from_secs(5))
    }

    /// Engine for the default host.
    pub fn lnk(&self) -> Lnk {
        self.builder().build().expect("build lnk")
    }

    /// Engine for a named host.
    pub fn lnk_for_host(&self, host: &str) -> Lnk {
        self.builder().host(host).build().expect("build lnk")
    }

    /// Engine using the given filesystem implementation.
    pub fn lnk_with_fs(&self, fs: impl FileSystemOps + 'static) -> Lnk {
        self.builder().fs(fs).build().expect("build lnk")
    }

    /// Absolute path of `rel` under the home directory.
    pub fn path(&self, rel: &str) -> PathBuf {
        self.home.join(rel)
    }

    /// Write `content` to `~/<rel>`, creating parents.
    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent");
        }
        std::fs::write(&path, content).expect("write file");
        path
    }

    /// Content of `~/<rel>`, following links.
    pub fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.path(rel)).expect("read file")
    }

    /// Content of the default tracking file.
    pub fn tracking(&self) -> String {
        std::fs::read_to_string(self.repo.join(lnk::TRACK_FILE)).expect("read tracking file")
    }

    /// `true` if `~/<rel>` is a symlink.
    pub fn is_symlink(&self, rel: &str) -> bool {
        self.path(rel)
            .symlink_metadata()
            .is_ok_and(|m| m.file_type().is_symlink())
    }
}

/// Create a bare repository at `path` to act as a remote.
pub fn bare_remote(path: &Path) {
    std::fs::create_dir_all(path).expect("create remote dir");
    git(path, &["init", "--bare", "-q"]);
}
