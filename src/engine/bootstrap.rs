//! The optional `bootstrap.sh` setup script at the repository root.

use std::path::PathBuf;

use serde::Serialize;

use super::{BOOTSTRAP_SCRIPT, Lnk};
use crate::error::{ErrorCode, LnkError, Result, Severity};

/// What happened to the bootstrap script during `init --remote`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum BootstrapOutcome {
    /// Disabled by the caller.
    Skipped,
    /// The repository has no script.
    NotFound,
    /// The script ran and exited zero.
    Succeeded,
    /// The script failed; the message describes how.
    Failed(String),
}

impl Lnk {
    /// Path of the repository's bootstrap script.
    ///
    /// # Errors
    ///
    /// `BOOTSTRAP_NOT_FOUND` if there is none.
    pub fn find_bootstrap_script(&self) -> Result<PathBuf> {
        let script = self.repo_path.join(BOOTSTRAP_SCRIPT);
        if self.fs.exists(&script) && !self.fs.is_dir(&script) {
            Ok(script)
        } else {
            Err(LnkError::bootstrap_not_found(&self.repo_path))
        }
    }

    /// Run the bootstrap script with `bash` in the repository directory,
    /// streaming its output to the terminal.
    ///
    /// # Errors
    ///
    /// `BOOTSTRAP_NOT_FOUND` without a script, `BOOTSTRAP_EXECUTION` if it
    /// cannot be started or exits non-zero.
    pub fn run_bootstrap_script(&self) -> Result<()> {
        let script = self.find_bootstrap_script()?;
        if cfg!(windows) {
            tracing::warn!(script = %script.display(), "bootstrap scripts are not run on Windows");
            return Ok(());
        }
        make_executable(&script)?;

        tracing::info!(script = %script.display(), "running bootstrap script");
        let script_arg = script.to_string_lossy();
        let code = self
            .exec
            .run_inherited(&self.repo_path, "bash", &[script_arg.as_ref()])
            .map_err(|e| {
                LnkError::wrap(
                    e,
                    ErrorCode::BootstrapExecution,
                    "cannot start bootstrap script",
                    Severity::Error,
                )
                .with_context("script_path", script.display())
                .with_suggestion("make sure bash is installed")
            })?;
        match code {
            Some(0) => Ok(()),
            code => Err(LnkError::new(
                ErrorCode::BootstrapExecution,
                "bootstrap script failed",
                Severity::Error,
            )
            .with_context("script_path", script.display())
            .with_context(
                "exit_code",
                code.map_or_else(|| "signal".to_string(), |c| c.to_string()),
            )
            .with_suggestion("fix the script and run 'lnk bootstrap' again")
            .with_recoverable(true)),
        }
    }

    /// Run the script if there is one, turning every failure into an
    /// outcome instead of an error.
    pub(super) fn try_bootstrap(&self) -> BootstrapOutcome {
        if self.find_bootstrap_script().is_err() {
            return BootstrapOutcome::NotFound;
        }
        match self.run_bootstrap_script() {
            Ok(()) => BootstrapOutcome::Succeeded,
            Err(err) => {
                tracing::warn!(error = %err, "bootstrap script failed");
                BootstrapOutcome::Failed(err.to_string())
            }
        }
    }
}

#[cfg(unix)]
fn make_executable(script: &std::path::Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt as _;
    std::fs::set_permissions(script, std::fs::Permissions::from_mode(0o755)).map_err(|e| {
        LnkError::wrap(
            e,
            ErrorCode::FilePermission,
            "cannot make bootstrap script executable",
            Severity::Error,
        )
        .with_context("script_path", script.display())
    })
}

#[cfg(not(unix))]
fn make_executable(_script: &std::path::Path) -> Result<()> {
    Ok(())
}
