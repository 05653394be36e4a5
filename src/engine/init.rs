//! Creating a repository, empty or from a remote.

use std::path::PathBuf;

use serde::Serialize;

use super::{BootstrapOutcome, Lnk, step_failed};
use crate::error::{ErrorCode, LnkError, Result, Severity};

/// What `init` did.
#[derive(Debug, Clone, Serialize)]
pub struct InitReport {
    /// Repository root.
    pub repo_path: PathBuf,
    /// Remote URL the repository was cloned from.
    pub cloned_from: Option<String>,
    /// Bootstrap script result.
    pub bootstrap: BootstrapOutcome,
}

impl Lnk {
    /// Create an empty repository: `git init`, an empty tracking file for
    /// the active host, and an initial commit.
    ///
    /// # Errors
    ///
    /// `REPO_ALREADY_EXISTS` if the repository is already a git working
    /// tree; git or filesystem failures otherwise.  A directory created by
    /// this call is removed again on failure.
    pub fn init(&self) -> Result<InitReport> {
        if self.is_initialized() {
            return Err(LnkError::repo_already_exists(&self.repo_path));
        }
        let existed = self.fs.exists(&self.repo_path);

        let result = self.init_steps();
        if result.is_err()
            && !existed
            && let Err(e) = self.fs.remove_dir_all(&self.repo_path)
        {
            tracing::warn!(error = %e, "cannot remove partially initialized repository");
        }
        result?;

        tracing::info!(repo = %self.repo_path.display(), "repository initialized");
        Ok(InitReport {
            repo_path: self.repo_path.clone(),
            cloned_from: None,
            bootstrap: BootstrapOutcome::Skipped,
        })
    }

    fn init_steps(&self) -> Result<()> {
        self.fs
            .ensure_dir(&self.repo_path)
            .map_err(|e| step_failed(e, "cannot create repository directory"))?;
        self.git
            .init()
            .map_err(|e| step_failed(e, "git init failed"))?;
        self.write_tracking(&[])?;
        self.git
            .add(&self.tracking_rel())
            .map_err(|e| step_failed(e, "failed to stage tracking file"))?;
        self.commit("lnk: 初始化仓库")?;
        Ok(())
    }

    /// Clone `url` into the repository path and run its bootstrap script.
    ///
    /// # Errors
    ///
    /// `REPO_ALREADY_EXISTS` if a repository exists; clone failures; a
    /// `REPO_NOT_INITIALIZED` error if the clone is not an lnk repository
    /// (the clone is deleted again).
    pub fn init_with_remote(&self, url: &str) -> Result<InitReport> {
        self.clone_repo(url, false, true)
    }

    /// Like [`Lnk::init_with_remote`], replacing any existing repository.
    ///
    /// # Errors
    ///
    /// As [`Lnk::init_with_remote`], minus `REPO_ALREADY_EXISTS`.
    pub fn init_with_remote_force(&self, url: &str, no_bootstrap: bool) -> Result<InitReport> {
        self.clone_repo(url, true, !no_bootstrap)
    }

    fn clone_repo(&self, url: &str, force: bool, bootstrap: bool) -> Result<InitReport> {
        if self.is_initialized() && !force {
            return Err(LnkError::repo_already_exists(&self.repo_path));
        }
        if force && self.fs.is_dir(&self.repo_path) {
            tracing::info!(repo = %self.repo_path.display(), "removing existing repository");
            self.fs
                .remove_dir_all(&self.repo_path)
                .map_err(|e| step_failed(e, "cannot remove existing repository"))?;
        }

        self.git
            .clone_from(url)
            .map_err(|e| step_failed(e, "clone failed").with_context("remote", url))?;
        self.cache.invalidate();

        if !self.is_initialized() || !self.has_tracking_file(&self.repo_path) {
            if let Err(e) = self.fs.remove_dir_all(&self.repo_path) {
                tracing::warn!(error = %e, "cannot remove invalid clone");
            }
            return Err(LnkError::new(
                ErrorCode::RepoNotInitialized,
                "not an lnk repository",
                Severity::Error,
            )
            .with_context("remote", url)
            .with_suggestion("the remote has no .lnk tracking file; run 'lnk init' without --remote instead"));
        }
        self.fs
            .ensure_dir(&self.host_dir())
            .map_err(|e| step_failed(e, "cannot create host directory"))?;

        let bootstrap = if bootstrap {
            self.try_bootstrap()
        } else {
            BootstrapOutcome::Skipped
        };
        tracing::info!(remote = url, repo = %self.repo_path.display(), "repository cloned");
        Ok(InitReport {
            repo_path: self.repo_path.clone(),
            cloned_from: Some(url.to_string()),
            bootstrap,
        })
    }
}
