//! Push and pull against the configured remote.

use super::{Lnk, RestoreReport, step_failed};
use crate::error::{ErrorCode, LnkError, Result, Severity};

/// Commit message used by [`Lnk::push`] when none is given.
pub const DEFAULT_SYNC_MESSAGE: &str = "lnk: 自动同步变更";

fn no_remote() -> LnkError {
    LnkError::new(
        ErrorCode::GitCommand,
        "no remote repository configured",
        Severity::Error,
    )
    .with_suggestion("add one with 'git -C <repo> remote add origin <url>'")
    .with_recoverable(true)
}

impl Lnk {
    /// Stage everything, commit and push.
    ///
    /// Returns whether a new commit was created; pushing already committed
    /// work with a clean tree returns `false` and still pushes.
    ///
    /// # Errors
    ///
    /// `GIT_COMMAND` when no remote is configured, or any git failure
    /// (network, auth).
    pub fn push(&self, message: Option<&str>) -> Result<bool> {
        self.ensure_initialized()?;
        let _lock = self.lock()?;
        self.git
            .add_all()
            .map_err(|e| step_failed(e, "failed to stage changes"))?;
        let created = self.commit(message.unwrap_or(DEFAULT_SYNC_MESSAGE))?;
        if !self.git.has_remote() {
            return Err(no_remote());
        }
        self.git
            .push()
            .map_err(|e| step_failed(e, "failed to push"))?;
        tracing::info!(committed = created, "pushed");
        Ok(created)
    }

    /// Pull from the remote, then restore links for the active host.
    ///
    /// # Errors
    ///
    /// `GIT_COMMAND` when no remote is configured, git failures (including
    /// `GIT_MERGE_CONFLICT`), or the aggregate restore error.
    pub fn pull(&self) -> Result<RestoreReport> {
        self.ensure_initialized()?;
        if !self.git.has_remote() {
            return Err(no_remote());
        }
        let _lock = self.lock()?;
        self.git
            .pull()
            .map_err(|e| step_failed(e, "failed to pull"))?;
        self.cache.invalidate();
        self.restore_entries(self.host.as_deref())
    }
}
