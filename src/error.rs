//! Structured error type for the lnk engine.
//!
//! Collaborators return their own typed errors ([`FsError`](crate::fs::FsError)
//! for filesystem primitives, [`GitError`](crate::git::GitError) for the git
//! subprocess).  The engine converts them into [`LnkError`], which carries a
//! stable [`ErrorCode`], a [`Severity`], free-form context and an optional
//! suggestion for the user.  Command handlers at the CLI boundary convert to
//! [`anyhow::Error`] via the standard `?` operator.
//!
//! # Error codes
//!
//! ```text
//! repository   REPO_NOT_INITIALIZED, REPO_ALREADY_EXISTS
//! files        FILE_NOT_EXISTS, FILE_ALREADY_MANAGED, FILE_NOT_MANAGED,
//!              FILE_PERMISSION, FILE_OPERATION
//! git          GIT_COMMAND, GIT_NETWORK, GIT_AUTH, GIT_MERGE_CONFLICT
//! hosts        HOST_NOT_FOUND
//! bootstrap    BOOTSTRAP_NOT_FOUND, BOOTSTRAP_EXECUTION
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use thiserror::Error;

use crate::fs::FsError;
use crate::git::GitError;

/// Boxed error used as the cause of an [`LnkError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used throughout the engine.
pub type Result<T, E = LnkError> = std::result::Result<T, E>;

/// Closed taxonomy of failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// The repository directory is not a git working tree.
    RepoNotInitialized,
    /// `init` was asked to create a repository that already exists.
    RepoAlreadyExists,
    /// A path that must exist does not.
    FileNotExists,
    /// The path is already tracked.
    FileAlreadyManaged,
    /// The path is not tracked.
    FileNotManaged,
    /// The path exists but cannot be read or written.
    FilePermission,
    /// A filesystem operation (move, link, remove, tracking write) failed.
    FileOperation,
    /// A git invocation failed for a reason not covered below.
    GitCommand,
    /// Git could not reach the remote.
    GitNetwork,
    /// The remote rejected our credentials.
    GitAuth,
    /// `git pull` stopped on a merge conflict.
    GitMergeConflict,
    /// No tracking file exists for the requested host.
    HostNotFound,
    /// The repository has no `bootstrap.sh`.
    BootstrapNotFound,
    /// `bootstrap.sh` ran and failed.
    BootstrapExecution,
}

impl ErrorCode {
    /// Stable identifier, e.g. `FILE_NOT_MANAGED`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RepoNotInitialized => "REPO_NOT_INITIALIZED",
            Self::RepoAlreadyExists => "REPO_ALREADY_EXISTS",
            Self::FileNotExists => "FILE_NOT_EXISTS",
            Self::FileAlreadyManaged => "FILE_ALREADY_MANAGED",
            Self::FileNotManaged => "FILE_NOT_MANAGED",
            Self::FilePermission => "FILE_PERMISSION",
            Self::FileOperation => "FILE_OPERATION",
            Self::GitCommand => "GIT_COMMAND",
            Self::GitNetwork => "GIT_NETWORK",
            Self::GitAuth => "GIT_AUTH",
            Self::GitMergeConflict => "GIT_MERGE_CONFLICT",
            Self::HostNotFound => "HOST_NOT_FOUND",
            Self::BootstrapNotFound => "BOOTSTRAP_NOT_FOUND",
            Self::BootstrapExecution => "BOOTSTRAP_EXECUTION",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How bad a failure is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Informational; nothing went wrong.
    Info,
    /// The request was not carried out but nothing is broken.
    Warning,
    /// The operation failed and its effects were undone.
    Error,
    /// The operation failed and on-disk state may be inconsistent.
    Critical,
}

impl Severity {
    /// Upper-case label, e.g. `CRITICAL`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The error type returned by every [`Lnk`](crate::Lnk) operation.
///
/// Built with [`LnkError::new`] (or one of the named constructors) and
/// refined with the `with_*` methods:
///
/// ```
/// use lnk::error::{ErrorCode, LnkError, Severity};
///
/// let err = LnkError::new(ErrorCode::FileOperation, "move failed", Severity::Error)
///     .with_context("source", "/home/u/.bashrc")
///     .with_suggestion("check disk space");
///
/// assert_eq!(err.code(), ErrorCode::FileOperation);
/// assert_eq!(err.to_string(), "[FILE_OPERATION] move failed (source=/home/u/.bashrc)");
/// ```
#[derive(Error, Debug)]
#[error("[{code}] {message}{}", render_context(.context))]
pub struct LnkError {
    code: ErrorCode,
    message: String,
    severity: Severity,
    context: BTreeMap<String, String>,
    suggestion: Option<String>,
    recoverable: bool,
    #[source]
    source: Option<BoxError>,
}

fn render_context(context: &BTreeMap<String, String>) -> String {
    if context.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = context.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!(" ({})", parts.join(", "))
}

impl LnkError {
    /// Create an error with no context, suggestion or cause.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            code,
            message: message.into(),
            severity,
            context: BTreeMap::new(),
            suggestion: None,
            recoverable: false,
            source: None,
        }
    }

    /// Wrap `cause` under a new code and message.
    #[must_use]
    pub fn wrap(
        cause: impl Into<BoxError>,
        code: ErrorCode,
        message: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self::new(code, message, severity).with_source(cause)
    }

    /// The repository at `repo` has not been initialised.
    #[must_use]
    pub fn repo_not_initialized(repo: &Path) -> Self {
        Self::new(
            ErrorCode::RepoNotInitialized,
            "lnk repository is not initialized",
            Severity::Error,
        )
        .with_context("repo_path", repo.display())
        .with_suggestion("run 'lnk init' first")
    }

    /// A repository already exists at `repo`.
    #[must_use]
    pub fn repo_already_exists(repo: &Path) -> Self {
        Self::new(
            ErrorCode::RepoAlreadyExists,
            "lnk repository already exists",
            Severity::Warning,
        )
        .with_context("repo_path", repo.display())
        .with_suggestion("pass --force to re-initialize from the remote")
    }

    /// `path` is already tracked.
    #[must_use]
    pub fn file_already_managed(path: &Path) -> Self {
        Self::new(
            ErrorCode::FileAlreadyManaged,
            "file is already managed by lnk",
            Severity::Warning,
        )
        .with_context("file_path", path.display())
        .with_suggestion("the file is already tracked; nothing to do")
    }

    /// `path` is not tracked.
    #[must_use]
    pub fn file_not_managed(path: &Path) -> Self {
        Self::new(
            ErrorCode::FileNotManaged,
            "file is not managed by lnk",
            Severity::Error,
        )
        .with_context("file_path", path.display())
        .with_suggestion("add it first with 'lnk add'")
    }

    /// No tracking file exists for `host`.
    #[must_use]
    pub fn host_not_found(host: &str) -> Self {
        Self::new(
            ErrorCode::HostNotFound,
            "no configuration found for host",
            Severity::Error,
        )
        .with_context("host_name", host)
        .with_suggestion("check the host name, or add a file for that host first")
    }

    /// The repository at `repo` has no `bootstrap.sh`.
    #[must_use]
    pub fn bootstrap_not_found(repo: &Path) -> Self {
        Self::new(
            ErrorCode::BootstrapNotFound,
            "bootstrap script not found",
            Severity::Warning,
        )
        .with_context("repo_path", repo.display())
        .with_context("script_path", repo.join(crate::BOOTSTRAP_SCRIPT).display())
        .with_suggestion("create bootstrap.sh at the repository root to automate setup")
    }

    /// Prepend `prefix: ` to the message, e.g. to name the step that failed.
    #[must_use]
    pub fn prefixed(mut self, prefix: &str) -> Self {
        self.message = format!("{prefix}: {}", self.message);
        self
    }

    /// Attach a key/value pair of context.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.context.insert(key.into(), value.to_string());
        self
    }

    /// Attach a human-readable remedy.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Mark whether the caller may retry after fixing the cause.
    #[must_use]
    pub const fn with_recoverable(mut self, recoverable: bool) -> Self {
        self.recoverable = recoverable;
        self
    }

    /// Attach the underlying cause.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Upgrade a transactional failure whose rollback did not complete.
    ///
    /// The result keeps the original code, becomes [`Severity::Critical`],
    /// lists every failed undo step under the `rollback_errors` context key,
    /// and carries the original error as its source.
    #[must_use]
    pub fn escalate(self, rollback_failures: &[String]) -> Self {
        let code = self.code;
        let message = format!("operation failed and rollback was incomplete: {}", self.message);
        Self::new(code, message, Severity::Critical)
            .with_context("rollback_errors", rollback_failures.join("; "))
            .with_suggestion(
                "the repository may be inconsistent; run 'lnk validate' and fix the listed paths",
            )
            .with_source(self)
    }

    /// Failure category.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        self.code
    }

    /// Human-readable message without context.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Failure severity.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        self.severity
    }

    /// Context key/value pairs, sorted by key.
    #[must_use]
    pub const fn context(&self) -> &BTreeMap<String, String> {
        &self.context
    }

    /// Suggested remedy, if any.
    #[must_use]
    pub fn suggestion(&self) -> Option<&str> {
        self.suggestion.as_deref()
    }

    /// Whether the caller may retry after fixing the cause.
    #[must_use]
    pub const fn recoverable(&self) -> bool {
        self.recoverable
    }

    /// Returns `true` if this error has the given code.
    #[must_use]
    pub fn is(&self, code: ErrorCode) -> bool {
        self.code == code
    }

    /// Display string followed by the cause chain and a `suggestion:` line.
    #[must_use]
    pub fn render_with_suggestion(&self) -> String {
        let mut out = self.to_string();
        let mut cause = std::error::Error::source(self);
        while let Some(err) = cause {
            out.push_str(&format!("\n  caused by: {err}"));
            cause = err.source();
        }
        if let Some(suggestion) = &self.suggestion {
            out.push_str(&format!("\nsuggestion: {suggestion}"));
        }
        out
    }
}

impl From<FsError> for LnkError {
    fn from(err: FsError) -> Self {
        let code = match &err {
            FsError::NotFound { .. } => ErrorCode::FileNotExists,
            FsError::PermissionDenied { .. } => ErrorCode::FilePermission,
            FsError::Io { source, .. } if source.kind() == std::io::ErrorKind::PermissionDenied => {
                ErrorCode::FilePermission
            }
            _ => ErrorCode::FileOperation,
        };
        let message = err.to_string();
        Self::new(code, message, Severity::Error).with_source(err)
    }
}

impl From<GitError> for LnkError {
    fn from(err: GitError) -> Self {
        let mut out = match &err {
            GitError::Network { .. } => Self::new(ErrorCode::GitNetwork, err.to_string(), Severity::Error)
                .with_suggestion("check the network connection and the remote URL")
                .with_recoverable(true),
            GitError::Auth { .. } => Self::new(ErrorCode::GitAuth, err.to_string(), Severity::Error)
                .with_suggestion("check your git credentials for this remote"),
            GitError::MergeConflict { files } => {
                let joined = files.join(", ");
                Self::new(ErrorCode::GitMergeConflict, err.to_string(), Severity::Error)
                    .with_context("files", joined)
                    .with_suggestion("resolve the conflicts in the repository, commit, then run 'lnk restore'")
            }
            _ => Self::new(ErrorCode::GitCommand, err.to_string(), Severity::Error),
        };
        out.source = Some(Box::new(err));
        out
    }
}
