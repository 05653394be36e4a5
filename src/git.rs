//! Git collaborator.
//!
//! [`GitOps`] is the set of repository operations the engine needs;
//! [`GitCli`] implements it by shelling out to the `git` binary through an
//! [`Executor`].  Failed invocations are classified into [`GitError`]
//! variants by [`classify`], a pure function over the captured output.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::exec::{ExecResult, Executor, SystemExecutor};

/// Errors produced by the git collaborator.
#[derive(Error, Debug)]
pub enum GitError {
    /// The `git` binary could not be started.
    #[error("failed to run git (is it installed and on PATH?)")]
    Spawn {
        /// Underlying spawn error.
        #[source]
        source: io::Error,
    },

    /// The remote could not be reached.
    #[error("network error during git {operation}: {output}")]
    Network {
        /// `clone`, `push` or `pull`.
        operation: &'static str,
        /// Captured git output.
        output: String,
    },

    /// The remote rejected our credentials.
    #[error("authentication failed during git {operation}: {output}")]
    Auth {
        /// `clone`, `push` or `pull`.
        operation: &'static str,
        /// Captured git output.
        output: String,
    },

    /// A pull stopped with conflicts.
    #[error("merge conflict in {}", .files.join(", "))]
    MergeConflict {
        /// Conflicting paths as reported by git.
        files: Vec<String>,
    },

    /// A clone URL does not name a reachable repository.
    #[error("remote repository not found: {url}")]
    InvalidRemote {
        /// URL passed to `git clone`.
        url: String,
    },

    /// The operation needs a remote and none is configured.
    #[error("no git remote configured")]
    NoRemote,

    /// Any other failure.
    #[error("`{command}` failed: {output}")]
    Command {
        /// Command line that failed.
        command: String,
        /// Captured git output.
        output: String,
    },
}

/// Result alias for git operations.
pub type GitResult<T> = Result<T, GitError>;

/// Snapshot of the repository's sync state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GitStatus {
    /// Uncommitted changes in the working tree or index.
    pub dirty: bool,
    /// Remote used for ahead/behind (`origin` preferred).
    pub remote: Option<String>,
    /// Local commits not on the remote branch.
    pub ahead: usize,
    /// Remote commits not on the local branch.
    pub behind: usize,
}

/// Repository operations consumed by the engine.
///
/// Paths are relative to the repository root.
#[cfg_attr(test, mockall::automock)]
pub trait GitOps: Send + Sync + std::fmt::Debug {
    /// `git init`.
    ///
    /// # Errors
    ///
    /// Returns an error if git fails.
    fn init(&self) -> GitResult<()>;

    /// Clone `url` into the repository path, creating its parent.
    ///
    /// # Errors
    ///
    /// Network, auth and invalid-URL failures are classified.
    fn clone_from(&self, url: &str) -> GitResult<()>;

    /// Stage one path.
    ///
    /// # Errors
    ///
    /// Returns an error if git fails.
    fn add(&self, path: &Path) -> GitResult<()>;

    /// Stage several paths in one invocation.  An empty list is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if git fails.
    fn add_multiple(&self, paths: &[PathBuf]) -> GitResult<()>;

    /// Stage every change in the working tree.
    ///
    /// # Errors
    ///
    /// Returns an error if git fails.
    fn add_all(&self) -> GitResult<()>;

    /// Stage the removal of a path (recursively).
    ///
    /// # Errors
    ///
    /// Returns an error if git fails.
    fn remove(&self, path: &Path) -> GitResult<()>;

    /// Reset the index entries of `paths` to `HEAD`, leaving the working
    /// tree alone.  Used to unstage the changes of a rolled-back operation.
    ///
    /// # Errors
    ///
    /// Returns an error if git fails.
    fn reset(&self, paths: &[PathBuf]) -> GitResult<()>;

    /// Commit staged changes.  Returns `false` when there was nothing to
    /// commit.
    ///
    /// # Errors
    ///
    /// Returns an error if git fails for any other reason.
    fn commit(&self, message: &str) -> GitResult<bool>;

    /// Push the current branch.
    ///
    /// # Errors
    ///
    /// Network and auth failures are classified.
    fn push(&self) -> GitResult<()>;

    /// Pull the current branch.
    ///
    /// # Errors
    ///
    /// Conflicts, network and auth failures are classified.
    fn pull(&self) -> GitResult<()>;

    /// Dirty flag, preferred remote and ahead/behind counts.
    ///
    /// # Errors
    ///
    /// Returns an error if git fails.
    fn status(&self) -> GitResult<GitStatus>;

    /// `true` if the repository path contains a `.git` directory.
    fn is_repo(&self) -> bool;

    /// `true` if at least one remote is configured.
    fn has_remote(&self) -> bool;

    /// Add a remote, or update its URL if it already exists.
    ///
    /// # Errors
    ///
    /// Returns an error if git fails.
    fn set_remote(&self, name: &str, url: &str) -> GitResult<()>;
}

/// [`GitOps`] implementation that runs the `git` binary.
#[derive(Debug, Clone)]
pub struct GitCli {
    repo: PathBuf,
    exec: Arc<dyn Executor>,
    env: Vec<(String, String)>,
}

impl GitCli {
    /// Git wrapper for `repo` using real subprocesses.
    #[must_use]
    pub fn new(repo: impl Into<PathBuf>) -> Self {
        Self::with_executor(repo, Arc::new(SystemExecutor))
    }

    /// Git wrapper for `repo` using the given executor.
    #[must_use]
    pub fn with_executor(repo: impl Into<PathBuf>, exec: Arc<dyn Executor>) -> Self {
        Self {
            repo: repo.into(),
            exec,
            env: Vec::new(),
        }
    }

    /// Set an environment variable on every git invocation.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Commit as `name <email>` regardless of the user's git config.
    #[must_use]
    pub fn with_identity(self, name: &str, email: &str) -> Self {
        self.with_env("GIT_AUTHOR_NAME", name)
            .with_env("GIT_AUTHOR_EMAIL", email)
            .with_env("GIT_COMMITTER_NAME", name)
            .with_env("GIT_COMMITTER_EMAIL", email)
    }

    /// Repository path this wrapper operates on.
    #[must_use]
    pub fn repo(&self) -> &Path {
        &self.repo
    }

    fn output_in(&self, dir: &Path, args: &[&str]) -> GitResult<ExecResult> {
        let env: Vec<(&str, &str)> = self
            .env
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        self.exec
            .run_in(dir, "git", args, &env)
            .map_err(|source| GitError::Spawn { source })
    }

    fn output(&self, args: &[&str]) -> GitResult<ExecResult> {
        self.output_in(&self.repo, args)
    }

    /// Run and require success, classifying any failure.
    fn run(&self, operation: &'static str, args: &[&str]) -> GitResult<ExecResult> {
        let result = self.output(args)?;
        if result.success {
            Ok(result)
        } else {
            Err(classify(operation, &format!("git {}", args.join(" ")), &result.combined()))
        }
    }

    fn remote_name(&self) -> GitResult<Option<String>> {
        let out = self.run("remote", &["remote"])?;
        let remotes: Vec<&str> = out.stdout.split_whitespace().collect();
        if remotes.contains(&"origin") {
            return Ok(Some("origin".to_string()));
        }
        Ok(remotes.first().map(ToString::to_string))
    }

    fn current_branch(&self) -> GitResult<String> {
        let out = self.run("branch", &["branch", "--show-current"])?;
        let branch = out.stdout.trim();
        Ok(if branch.is_empty() {
            "main".to_string()
        } else {
            branch.to_string()
        })
    }

    fn has_upstream(&self) -> bool {
        self.output(&["rev-parse", "--abbrev-ref", "--symbolic-full-name", "@{u}"])
            .is_ok_and(|r| r.success)
    }
}

impl GitOps for GitCli {
    fn init(&self) -> GitResult<()> {
        self.run("init", &["init"])?;
        Ok(())
    }

    fn clone_from(&self, url: &str) -> GitResult<()> {
        let parent = self
            .repo
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent).map_err(|e| GitError::Command {
            command: format!("mkdir {}", parent.display()),
            output: e.to_string(),
        })?;

        let repo = self.repo.to_string_lossy();
        let args = ["clone", url, repo.as_ref()];
        let result = self.output_in(parent, &args)?;
        if result.success {
            return Ok(());
        }
        let output = result.combined();
        match classify("clone", &format!("git {}", args.join(" ")), &output) {
            GitError::Command { .. }
                if output.contains("not found") || output.contains("does not exist") =>
            {
                Err(GitError::InvalidRemote {
                    url: url.to_string(),
                })
            }
            other => Err(other),
        }
    }

    fn add(&self, path: &Path) -> GitResult<()> {
        let p = path.to_string_lossy();
        self.run("add", &["add", "--", p.as_ref()])?;
        Ok(())
    }

    fn add_multiple(&self, paths: &[PathBuf]) -> GitResult<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let owned: Vec<String> = paths
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        let mut args = vec!["add", "--"];
        args.extend(owned.iter().map(String::as_str));
        self.run("add", &args)?;
        Ok(())
    }

    fn add_all(&self) -> GitResult<()> {
        self.run("add", &["add", "-A"])?;
        Ok(())
    }

    fn remove(&self, path: &Path) -> GitResult<()> {
        let p = path.to_string_lossy();
        self.run("rm", &["rm", "-r", "-q", "--cached", "--ignore-unmatch", "--", p.as_ref()])?;
        Ok(())
    }

    fn reset(&self, paths: &[PathBuf]) -> GitResult<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let owned: Vec<String> = paths
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        let mut args = vec!["reset", "-q", "--"];
        args.extend(owned.iter().map(String::as_str));
        self.run("reset", &args)?;
        Ok(())
    }

    fn commit(&self, message: &str) -> GitResult<bool> {
        let message = if message.is_empty() {
            "lnk: automated commit"
        } else {
            message
        };
        let result = self.output(&["commit", "-m", message])?;
        if result.success {
            return Ok(true);
        }
        let output = result.combined();
        if is_nothing_to_commit(&output) {
            tracing::debug!("nothing to commit");
            return Ok(false);
        }
        Err(GitError::Command {
            command: format!("git commit -m \"{message}\""),
            output,
        })
    }

    fn push(&self) -> GitResult<()> {
        if self.has_upstream() {
            self.run("push", &["push"])?;
        } else {
            let remote = self.remote_name()?.ok_or(GitError::NoRemote)?;
            self.run("push", &["push", "-u", &remote, "HEAD"])?;
        }
        Ok(())
    }

    fn pull(&self) -> GitResult<()> {
        if self.has_upstream() {
            self.run("pull", &["pull"])?;
        } else {
            let remote = self.remote_name()?.ok_or(GitError::NoRemote)?;
            let branch = self.current_branch()?;
            self.run("pull", &["pull", &remote, &branch])?;
        }
        Ok(())
    }

    fn status(&self) -> GitResult<GitStatus> {
        let porcelain = self.run("status", &["status", "--porcelain"])?;
        let mut status = GitStatus {
            dirty: !porcelain.stdout.trim().is_empty(),
            ..GitStatus::default()
        };

        let Some(remote) = self.remote_name()? else {
            return Ok(status);
        };
        let branch = self.current_branch()?;
        let range = format!("{remote}/{branch}...HEAD");
        let result = self.output(&["rev-list", "--count", "--left-right", &range])?;
        if result.success {
            let (ahead, behind) = parse_ahead_behind(&result.stdout).ok_or_else(|| {
                GitError::Command {
                    command: format!("git rev-list --count --left-right {range}"),
                    output: format!("unexpected output: {}", result.stdout.trim()),
                }
            })?;
            status.ahead = ahead;
            status.behind = behind;
        } else {
            let output = result.combined();
            if !is_unknown_revision(&output) {
                return Err(GitError::Command {
                    command: format!("git rev-list --count --left-right {range}"),
                    output,
                });
            }
        }
        status.remote = Some(remote);
        Ok(status)
    }

    fn is_repo(&self) -> bool {
        self.repo.join(".git").exists()
    }

    fn has_remote(&self) -> bool {
        self.output(&["remote"])
            .is_ok_and(|r| r.success && !r.stdout.trim().is_empty())
    }

    fn set_remote(&self, name: &str, url: &str) -> GitResult<()> {
        let result = self.output(&["remote", "add", name, url])?;
        if result.success {
            return Ok(());
        }
        let output = result.combined();
        if output.contains("already exists") {
            self.run("remote", &["remote", "set-url", name, url])?;
            return Ok(());
        }
        Err(GitError::Command {
            command: format!("git remote add {name} {url}"),
            output,
        })
    }
}

// ---------------------------------------------------------------------------
// Output classification
// ---------------------------------------------------------------------------

/// Map the output of a failed git invocation onto a [`GitError`].
#[must_use]
pub fn classify(operation: &'static str, command: &str, output: &str) -> GitError {
    if output.contains("CONFLICT") {
        return GitError::MergeConflict {
            files: parse_conflict_files(output),
        };
    }
    if output.contains("Could not resolve host") || output.contains("Connection refused") {
        return GitError::Network {
            operation,
            output: output.trim().to_string(),
        };
    }
    if output.contains("Authentication failed") || output.contains("Permission denied") {
        return GitError::Auth {
            operation,
            output: output.trim().to_string(),
        };
    }
    GitError::Command {
        command: command.to_string(),
        output: output.trim().to_string(),
    }
}

/// Paths named on `CONFLICT ... in <file>` lines, in order, deduplicated.
#[must_use]
pub fn parse_conflict_files(output: &str) -> Vec<String> {
    let mut files: Vec<String> = Vec::new();
    for line in output.lines().filter(|l| l.contains("CONFLICT")) {
        let Some((_, file)) = line.rsplit_once(" in ") else {
            continue;
        };
        let file = file.trim().to_string();
        if !file.is_empty() && !files.contains(&file) {
            files.push(file);
        }
    }
    files
}

/// Parse `rev-list --count --left-right` output (`<behind>\t<ahead>`) into
/// `(ahead, behind)`.
#[must_use]
pub fn parse_ahead_behind(output: &str) -> Option<(usize, usize)> {
    let mut parts = output.split_whitespace();
    let behind = parts.next()?.parse().ok()?;
    let ahead = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((ahead, behind))
}

fn is_nothing_to_commit(output: &str) -> bool {
    output.contains("nothing to commit") || output.contains("no changes added to commit")
}

fn is_unknown_revision(output: &str) -> bool {
    output.contains("unknown revision") || output.contains("bad revision")
}
