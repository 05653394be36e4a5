//! Fixtures for engine unit tests: a temp home, a temp repository with a
//! `.git` directory for the lock, and a git mock.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{Lnk, LnkBuilder};
use crate::exec::{ExecResult, Executor};
use crate::git::{GitError, MockGitOps};

pub struct TestEnv {
    _dir: tempfile::TempDir,
    home: PathBuf,
    repo: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dunce::canonicalize(dir.path()).unwrap();
        let home = root.join("home");
        let repo = root.join("repo");
        fs::create_dir_all(&home).unwrap();
        fs::create_dir_all(repo.join(".git")).unwrap();
        Self {
            _dir: dir,
            home,
            repo,
        }
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn repo(&self) -> &Path {
        &self.repo
    }

    /// Write `content` to `rel` under home, creating parents.
    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.home.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    pub fn builder(&self, git: MockGitOps) -> LnkBuilder {
        Lnk::builder()
            .home(&self.home)
            .repo_path(&self.repo)
            .git(git)
            .lock_timeout(Duration::from_millis(200))
    }

    pub fn lnk(&self, git: MockGitOps) -> Lnk {
        self.builder(git).build().unwrap()
    }

    pub fn tracking(&self) -> String {
        fs::read_to_string(self.repo.join(".lnk")).unwrap_or_default()
    }
}

/// Git mock that accepts every call and reports an initialized repository.
pub fn quiet_git() -> MockGitOps {
    let mut git = MockGitOps::new();
    git.expect_is_repo().return_const(true);
    git.expect_add().returning(|_| Ok(()));
    git.expect_add_multiple().returning(|_| Ok(()));
    git.expect_remove().returning(|_| Ok(()));
    git.expect_reset().returning(|_| Ok(()));
    git.expect_commit().returning(|_| Ok(true));
    git
}

/// Like [`quiet_git`], but every commit fails.
pub fn git_failing_commit() -> MockGitOps {
    let mut git = MockGitOps::new();
    git.expect_is_repo().return_const(true);
    git.expect_add().returning(|_| Ok(()));
    git.expect_add_multiple().returning(|_| Ok(()));
    git.expect_remove().returning(|_| Ok(()));
    git.expect_reset().returning(|_| Ok(()));
    git.expect_commit().returning(|_| {
        Err(GitError::Command {
            command: "git commit".into(),
            output: "fatal: unable to write new index file".into(),
        })
    });
    git
}

/// Git mock for an uninitialized repository.
pub fn uninitialized_git() -> MockGitOps {
    let mut git = MockGitOps::new();
    git.expect_is_repo().return_const(false);
    git
}

/// Records inherited runs and answers with a fixed exit code.
#[derive(Debug)]
pub struct ScriptExecutor {
    code: Option<i32>,
    pub calls: Mutex<Vec<(PathBuf, String, Vec<String>)>>,
}

impl ScriptExecutor {
    pub fn exiting(code: Option<i32>) -> Arc<Self> {
        Arc::new(Self {
            code,
            calls: Mutex::new(Vec::new()),
        })
    }
}

impl Executor for ScriptExecutor {
    fn run_in(&self, _: &Path, _: &str, _: &[&str], _: &[(&str, &str)]) -> io::Result<ExecResult> {
        Err(io::Error::other("unexpected captured run"))
    }

    fn run_inherited(&self, dir: &Path, program: &str, args: &[&str]) -> io::Result<Option<i32>> {
        self.calls.lock().unwrap().push((
            dir.to_path_buf(),
            program.to_string(),
            args.iter().map(ToString::to_string).collect(),
        ));
        Ok(self.code)
    }

    fn which(&self, _: &str) -> bool {
        true
    }
}
