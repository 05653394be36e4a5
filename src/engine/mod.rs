//! The [`Lnk`] orchestrator.
//!
//! One `Lnk` is built per invocation with [`LnkBuilder`].  Mutating
//! operations run inside [`Lnk::transact`]: every completed step records the
//! [`UndoOp`] that reverses it, and on failure the log is unwound newest
//! first before the error is returned.  A rollback that itself fails turns
//! the error [`Severity::Critical`].
//!
//! ```text
//! <repo>/
//!   .lnk                 tracking file, default host
//!   .lnk.<host>          tracking file, named host
//!   .bashrc              repository copy, default host
//!   <host>.lnk/.bashrc   repository copy, named host
//!   _external/<hash>/x   copy of a file outside $HOME
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};

use crate::config;
use crate::error::{ErrorCode, LnkError, Result, Severity};
use crate::exec::{Executor, SystemExecutor};
use crate::fs::{FileSystemOps, FsResult, SystemFileSystemOps, clean_path, expand_home};
use crate::git::{GitCli, GitOps};
use crate::lock::RepoLock;
use crate::rollback::{RollbackLog, UndoOp};
use crate::tracking::{self, LinkType, TrackedEntry, TrackingCache};

mod add;
mod bootstrap;
mod cleanup;
mod consolidate;
mod init;
mod query;
mod remove;
mod restore;
mod sync;

pub use bootstrap::BootstrapOutcome;
pub use init::InitReport;
pub use query::{StatusInfo, ValidationIssue};
pub use restore::{Backup, RestoreReport};
pub use sync::DEFAULT_SYNC_MESSAGE;

/// Tracking file name for the default host.
pub const TRACK_FILE: &str = ".lnk";
/// Suffix of a named host's repository directory (`<host>.lnk`).
pub const HOST_DIR_SUFFIX: &str = ".lnk";
/// Repository directory holding copies of files outside the home directory.
pub const EXTERNAL_DIR: &str = "_external";
/// Label [`Lnk::list_all`] uses for the default host.
pub const DEFAULT_HOST_LABEL: &str = "general";
/// Suffix appended to a conflicting file moved aside by restore.
pub const BACKUP_SUFFIX: &str = ".lnk.backup";
/// Setup script run after cloning.
pub const BOOTSTRAP_SCRIPT: &str = "bootstrap.sh";
/// How long a mutating operation waits for another lnk process.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// Map a user-supplied host to a namespace.  `""`, `localhost` and
/// `general` are the default namespace.
///
/// # Errors
///
/// Rejects names that cannot be used as a file-name suffix.
pub fn host_namespace(host: &str) -> Result<Option<String>> {
    let host = host.trim();
    if host.is_empty() || host == "localhost" || host == DEFAULT_HOST_LABEL {
        return Ok(None);
    }
    let valid = !host.starts_with('.')
        && !host.ends_with('~')
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if !valid {
        return Err(LnkError::new(
            ErrorCode::HostNotFound,
            "invalid host name",
            Severity::Error,
        )
        .with_context("host_name", host)
        .with_suggestion("host names may contain letters, digits, '-', '_' and '.'"));
    }
    Ok(Some(host.to_string()))
}

fn tracking_file_name(host: Option<&str>) -> String {
    host.map_or_else(|| TRACK_FILE.to_string(), |h| format!("{TRACK_FILE}.{h}"))
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|n| n.to_string_lossy().starts_with('.'))
}

fn basename(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |n| n.to_string_lossy().into_owned(),
    )
}

/// `/`-joined form of a relative path, used as a tracking key.
fn key_from_rel(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Canonicalize `path`, or its parent when `path` does not exist yet.
fn canonical_lenient(path: &Path) -> PathBuf {
    if let Ok(p) = dunce::canonicalize(path) {
        return p;
    }
    if let (Some(parent), Some(name)) = (path.parent(), path.file_name())
        && let Ok(parent) = dunce::canonicalize(parent)
    {
        return parent.join(name);
    }
    path.to_path_buf()
}

fn absolutize(path: &Path) -> PathBuf {
    let abs = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().unwrap_or_default().join(path)
    };
    clean_path(&abs)
}

/// Attach the failed step's description to an error.
fn step_failed(err: impl Into<LnkError>, step: &str) -> LnkError {
    err.into().prefixed(step)
}

/// Builder for [`Lnk`].
#[derive(Debug)]
pub struct LnkBuilder {
    repo_path: Option<PathBuf>,
    host: Option<String>,
    link_type: LinkType,
    home: Option<PathBuf>,
    fs: Option<Arc<dyn FileSystemOps>>,
    git: Option<Box<dyn GitOps>>,
    exec: Option<Arc<dyn Executor>>,
    lock_timeout: Duration,
}

impl Default for LnkBuilder {
    fn default() -> Self {
        Self {
            repo_path: None,
            host: None,
            link_type: LinkType::Soft,
            home: None,
            fs: None,
            git: None,
            exec: None,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }
}

impl LnkBuilder {
    /// Builder with every option at its default.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository location (default `~/.config/lnk`).
    #[must_use]
    pub fn repo_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.repo_path = Some(path.into());
        self
    }

    /// Host namespace.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Link type used by `add`.
    #[must_use]
    pub const fn link_type(mut self, link_type: LinkType) -> Self {
        self.link_type = link_type;
        self
    }

    /// Home directory that tracking keys are relative to.
    #[must_use]
    pub fn home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    /// Filesystem implementation.
    #[must_use]
    pub fn fs(mut self, fs: impl FileSystemOps + 'static) -> Self {
        self.fs = Some(Arc::new(fs));
        self
    }

    /// Git implementation.  Defaults to [`GitCli`] on the repository path.
    #[must_use]
    pub fn git(mut self, git: impl GitOps + 'static) -> Self {
        self.git = Some(Box::new(git));
        self
    }

    /// Process runner for git and the bootstrap script.
    #[must_use]
    pub fn executor(mut self, exec: Arc<dyn Executor>) -> Self {
        self.exec = Some(exec);
        self
    }

    /// How long to wait for the repository lock.
    #[must_use]
    pub const fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Resolve paths and assemble the orchestrator.
    ///
    /// # Errors
    ///
    /// Fails if no home directory is known or the host name is invalid.
    pub fn build(self) -> Result<Lnk> {
        let home = match self.home {
            Some(home) => home,
            None => config::home_dir().ok_or_else(|| {
                LnkError::new(
                    ErrorCode::FileNotExists,
                    "cannot determine home directory",
                    Severity::Error,
                )
                .with_suggestion("set the HOME environment variable")
            })?,
        };
        let home = canonical_lenient(&absolutize(&home));
        let repo_path = self.repo_path.map_or_else(
            || config::default_repo(&home),
            |p| expand_home(&p.to_string_lossy(), &home),
        );
        let repo_path = canonical_lenient(&absolutize(&repo_path));
        let host = match self.host.as_deref() {
            Some(h) => host_namespace(h)?,
            None => None,
        };
        let exec = self.exec.unwrap_or_else(|| Arc::new(SystemExecutor));
        let git = self
            .git
            .unwrap_or_else(|| Box::new(GitCli::with_executor(&repo_path, Arc::clone(&exec))));
        let fs = self.fs.unwrap_or_else(|| Arc::new(SystemFileSystemOps));

        tracing::debug!(
            repo = %repo_path.display(),
            host = host.as_deref().unwrap_or(DEFAULT_HOST_LABEL),
            link_type = %self.link_type,
            "lnk configured"
        );

        Ok(Lnk {
            repo_path,
            host,
            link_type: self.link_type,
            home,
            fs,
            git,
            exec,
            cache: TrackingCache::new(),
            lock_timeout: self.lock_timeout,
        })
    }
}

/// Dotfiles orchestrator bound to one repository and host.
#[derive(Debug)]
pub struct Lnk {
    repo_path: PathBuf,
    host: Option<String>,
    link_type: LinkType,
    home: PathBuf,
    fs: Arc<dyn FileSystemOps>,
    git: Box<dyn GitOps>,
    exec: Arc<dyn Executor>,
    cache: TrackingCache,
    lock_timeout: Duration,
}

impl Lnk {
    /// Start building an orchestrator.
    #[must_use]
    pub fn builder() -> LnkBuilder {
        LnkBuilder::new()
    }

    /// Repository root.
    #[must_use]
    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// Active host, `None` for the default namespace.
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Home directory tracking keys are relative to.
    #[must_use]
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Link type used by `add`.
    #[must_use]
    pub const fn link_type(&self) -> LinkType {
        self.link_type
    }

    /// Change the link type used by subsequent adds.
    pub fn set_link_type(&mut self, link_type: LinkType) {
        self.link_type = link_type;
    }

    /// `true` once the repository is a git working tree.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.git.is_repo()
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(LnkError::repo_not_initialized(&self.repo_path))
        }
    }

    fn lock(&self) -> Result<RepoLock> {
        RepoLock::acquire(&self.repo_path, self.lock_timeout)
    }

    // -----------------------------------------------------------------------
    // Paths and keys
    // -----------------------------------------------------------------------

    fn host_dir_for(&self, host: Option<&str>) -> PathBuf {
        host.map_or_else(
            || self.repo_path.clone(),
            |h| self.repo_path.join(format!("{h}{HOST_DIR_SUFFIX}")),
        )
    }

    fn host_dir(&self) -> PathBuf {
        self.host_dir_for(self.host.as_deref())
    }

    fn tracking_file_for(&self, host: Option<&str>) -> PathBuf {
        self.repo_path.join(tracking_file_name(host))
    }

    fn tracking_file(&self) -> PathBuf {
        self.tracking_file_for(self.host.as_deref())
    }

    /// Tracking file path relative to the repository root.
    fn tracking_rel(&self) -> PathBuf {
        PathBuf::from(tracking_file_name(self.host.as_deref()))
    }

    /// `path` relative to the repository root.
    fn repo_rel(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.repo_path)
            .map_or_else(|_| path.to_path_buf(), Path::to_path_buf)
    }

    /// Absolute, cleaned form of user input.  `~` is expanded and the parent
    /// directory is canonicalized; the final component is left alone so a
    /// symlink keeps its own identity.
    fn normalize(&self, input: &Path) -> PathBuf {
        let expanded = input
            .to_str()
            .map_or_else(|| input.to_path_buf(), |s| expand_home(s, &self.home));
        let cleaned = absolutize(&expanded);
        if let (Some(parent), Some(name)) = (cleaned.parent(), cleaned.file_name())
            && let Ok(parent) = dunce::canonicalize(parent)
        {
            return parent.join(name);
        }
        cleaned
    }

    /// Tracking key for an absolute path: home-relative when inside home,
    /// the absolute path otherwise.
    ///
    /// Keys that would not read back from the tracking file unchanged are
    /// refused.
    fn tracking_key(&self, abs: &Path) -> Result<String> {
        let key = match abs.strip_prefix(&self.home) {
            Ok(rel) if rel.as_os_str().is_empty() => {
                return Err(LnkError::new(
                    ErrorCode::FileOperation,
                    "cannot manage the home directory itself",
                    Severity::Error,
                )
                .with_context("file_path", abs.display()));
            }
            Ok(rel) => key_from_rel(rel),
            Err(_) => abs.to_string_lossy().into_owned(),
        };
        if let Some(problem) = tracking::key_problem(&key) {
            return Err(LnkError::new(
                ErrorCode::FileOperation,
                format!("path cannot be tracked: {problem}"),
                Severity::Error,
            )
            .with_context("file_path", abs.display())
            .with_suggestion(
                "rename the file; a tracked name cannot start with '#' or hold '|' or newlines",
            ));
        }
        Ok(key)
    }

    fn abs_from_key(&self, key: &str) -> PathBuf {
        let path = Path::new(key);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.home.join(path)
        }
    }

    fn repo_path_for_key(&self, key: &str) -> PathBuf {
        self.repo_path_for_key_in(self.host.as_deref(), key)
    }

    /// Repository copy of `key` in `host`'s namespace.
    ///
    /// Absolute keys are placed under `_external/<hash>/` so two files with
    /// the same name in different directories never share a copy.
    fn repo_path_for_key_in(&self, host: Option<&str>, key: &str) -> PathBuf {
        let base = self.host_dir_for(host);
        let path = Path::new(key);
        if !path.is_absolute() {
            return base.join(path);
        }
        let digest = format!("{:x}", Sha256::digest(key.as_bytes()));
        let short: String = digest.chars().take(12).collect();
        let name = path
            .file_name()
            .map_or_else(|| "root".into(), ToOwned::to_owned);
        base.join(EXTERNAL_DIR).join(short).join(name)
    }

    /// Resolve input naming a managed path: a tracking key relative to home,
    /// or a `~`/absolute path.
    fn resolve_managed(&self, input: &Path) -> Result<(PathBuf, String)> {
        let text = input.to_string_lossy();
        if !input.is_absolute() && !text.starts_with('~') {
            let key = key_from_rel(&clean_path(input));
            return Ok((self.abs_from_key(&key), key));
        }
        let abs = self.normalize(input);
        let key = self.tracking_key(&abs)?;
        Ok((abs, key))
    }

    // -----------------------------------------------------------------------
    // Tracking file
    // -----------------------------------------------------------------------

    fn read_tracking_for(&self, host: Option<&str>) -> Result<Vec<TrackedEntry>> {
        let path = self.tracking_file_for(host);
        tracking::read_entries(&path, &self.cache)
            .map_err(|e| step_failed(e, "cannot read tracking file"))
    }

    fn read_tracking(&self) -> Result<Vec<TrackedEntry>> {
        self.read_tracking_for(self.host.as_deref())
    }

    fn write_tracking(&self, entries: &[TrackedEntry]) -> Result<()> {
        tracking::write_entries(&self.tracking_file(), entries, &self.cache)
            .map_err(|e| step_failed(e, "cannot write tracking file"))
    }

    fn find_entry(&self, key: &str) -> Result<Option<TrackedEntry>> {
        Ok(self.read_tracking()?.into_iter().find(|e| e.path == key))
    }

    // -----------------------------------------------------------------------
    // Transaction steps
    // -----------------------------------------------------------------------

    /// Run `body` as a transaction.
    ///
    /// On error every op recorded in the log is undone newest first.  If any
    /// undo fails the original error is escalated to critical with the undo
    /// failures attached.
    fn transact<T>(&self, body: impl FnOnce(&mut RollbackLog) -> Result<T>) -> Result<T> {
        let mut log = RollbackLog::new();
        match body(&mut log) {
            Ok(value) => {
                log.commit();
                Ok(value)
            }
            Err(err) => {
                tracing::debug!(steps = log.len(), error = %err, "transaction failed, rolling back");
                let failures = log.unwind(|op| self.undo(op));
                if failures.is_empty() {
                    Err(err)
                } else {
                    tracing::error!(count = failures.len(), "rollback incomplete");
                    Err(err.escalate(&failures))
                }
            }
        }
    }

    fn undo(&self, op: &UndoOp) -> Result<()> {
        match op {
            UndoOp::MoveBack { from, to } => self.fs.move_path(from, to)?,
            UndoOp::RestoreSymlink { copy, link, raw } => {
                if self.fs.is_dir(copy) && !self.fs.is_symlink(copy) {
                    self.fs.remove_dir_all(copy)?;
                } else {
                    self.fs.remove_file(copy)?;
                }
                self.fs.restore_symlink(raw, link)?;
            }
            UndoOp::RemoveLink { path } => self.fs.remove_file(path)?,
            UndoOp::CreateLink {
                target,
                link,
                link_type,
            } => self.link(*link_type, target, link)?,
            UndoOp::RemoveTrackingEntry { key } => {
                let mut entries = self.read_tracking()?;
                entries.retain(|e| e.path != *key);
                self.write_tracking(&entries)?;
            }
            UndoOp::RestoreTrackingEntry { entry, index } => {
                let mut entries = self.read_tracking()?;
                if !entries.iter().any(|e| e.path == entry.path) {
                    entries.insert((*index).min(entries.len()), entry.clone());
                }
                self.write_tracking(&entries)?;
            }
            UndoOp::RecreateDir { path } => self.fs.ensure_dir(path)?,
            UndoOp::Unstage { paths } => self.git.reset(paths)?,
        }
        Ok(())
    }

    fn link(&self, link_type: LinkType, target: &Path, link: &Path) -> FsResult<()> {
        match link_type {
            LinkType::Soft => self.fs.create_symlink(target, link),
            LinkType::Hard => self.fs.create_hardlink(target, link),
        }
    }

    /// Move `from` to `to`.  A symlinked `from` is materialized by the move,
    /// so its undo puts the original link back instead of the copy.
    fn move_recorded(&self, log: &mut RollbackLog, from: &Path, to: &Path) -> Result<()> {
        tracing::debug!(from = %from.display(), to = %to.display(), "move");
        let original_link = if self.fs.is_symlink(from) {
            let raw = self.fs.read_link(from).map_err(|e| {
                step_failed(e, "cannot read link").with_context("source", from.display())
            })?;
            Some(raw)
        } else {
            None
        };
        self.fs.move_path(from, to).map_err(|e| {
            step_failed(e, "failed to move file")
                .with_context("source", from.display())
                .with_context("destination", to.display())
                .with_recoverable(true)
        })?;
        log.record(match original_link {
            Some(raw) => UndoOp::RestoreSymlink {
                copy: to.to_path_buf(),
                link: from.to_path_buf(),
                raw,
            },
            None => UndoOp::MoveBack {
                from: to.to_path_buf(),
                to: from.to_path_buf(),
            },
        });
        Ok(())
    }

    fn link_recorded(
        &self,
        log: &mut RollbackLog,
        link_type: LinkType,
        target: &Path,
        link: &Path,
    ) -> Result<()> {
        tracing::debug!(%link_type, link = %link.display(), target = %target.display(), "link");
        self.link(link_type, target, link).map_err(|e| {
            step_failed(e, "failed to create link")
                .with_context("link", link.display())
                .with_context("target", target.display())
                .with_recoverable(true)
        })?;
        log.record(UndoOp::RemoveLink {
            path: link.to_path_buf(),
        });
        Ok(())
    }

    /// Remove the link at `link`; undo recreates it towards `target`.
    fn unlink_recorded(
        &self,
        log: &mut RollbackLog,
        link_type: LinkType,
        target: &Path,
        link: &Path,
    ) -> Result<()> {
        tracing::debug!(link = %link.display(), "unlink");
        self.fs.remove_file(link).map_err(|e| {
            step_failed(e, "failed to remove link")
                .with_context("link", link.display())
                .with_recoverable(true)
        })?;
        log.record(UndoOp::CreateLink {
            target: target.to_path_buf(),
            link: link.to_path_buf(),
            link_type,
        });
        Ok(())
    }

    fn append_entries(&self, log: &mut RollbackLog, new: Vec<TrackedEntry>) -> Result<()> {
        let mut entries = self.read_tracking()?;
        let keys: Vec<String> = new.iter().map(|e| e.path.clone()).collect();
        entries.extend(new);
        self.write_tracking(&entries)?;
        for key in keys {
            log.record(UndoOp::RemoveTrackingEntry { key });
        }
        Ok(())
    }

    /// Remove the entries with these keys.  Undo re-inserts each at its old
    /// index; they are recorded last-first so the unwind inserts in
    /// ascending order.
    fn drop_entries(&self, log: &mut RollbackLog, keys: &[&str]) -> Result<Vec<TrackedEntry>> {
        let mut removed = Vec::new();
        let mut kept = Vec::new();
        for (index, entry) in self.read_tracking()?.into_iter().enumerate() {
            if keys.contains(&entry.path.as_str()) {
                removed.push((index, entry));
            } else {
                kept.push(entry);
            }
        }
        self.write_tracking(&kept)?;
        for (index, entry) in removed.iter().rev() {
            log.record(UndoOp::RestoreTrackingEntry {
                entry: entry.clone(),
                index: *index,
            });
        }
        Ok(removed.into_iter().map(|(_, entry)| entry).collect())
    }

    /// Stage repository-relative `paths`; undo resets them in the index.
    fn stage(&self, log: &mut RollbackLog, paths: Vec<PathBuf>) -> Result<()> {
        log.record(UndoOp::Unstage {
            paths: paths.clone(),
        });
        self.git
            .add_multiple(&paths)
            .map_err(|e| step_failed(e, "failed to stage changes"))
    }

    /// `git rm --cached` each path, then stage the tracking file.
    fn stage_removals(&self, log: &mut RollbackLog, removed: Vec<PathBuf>) -> Result<()> {
        let tracking = self.tracking_rel();
        let mut paths = removed;
        paths.push(tracking.clone());
        log.record(UndoOp::Unstage {
            paths: paths.clone(),
        });
        for path in paths.iter().filter(|p| **p != tracking) {
            self.git
                .remove(path)
                .map_err(|e| step_failed(e, "failed to unstage removed file"))?;
        }
        self.git
            .add(&tracking)
            .map_err(|e| step_failed(e, "failed to stage tracking file"))
    }

    fn commit(&self, message: &str) -> Result<bool> {
        let created = self
            .git
            .commit(message)
            .map_err(|e| step_failed(e, "failed to commit"))?;
        tracing::debug!(message, created, "commit");
        Ok(created)
    }

    /// Refuse paths that are the repository, inside it, or contain it.
    fn check_addable(&self, abs: &Path) -> Result<()> {
        self.fs
            .validate_for_add(abs)
            .map_err(|e| LnkError::from(e).with_context("file_path", abs.display()))?;
        let resolved = dunce::canonicalize(abs).unwrap_or_else(|_| abs.to_path_buf());
        if abs.starts_with(&self.repo_path) || resolved.starts_with(&self.repo_path) {
            return Err(LnkError::file_already_managed(abs)
                .with_suggestion("the path lives inside the lnk repository; add its original location instead"));
        }
        if self.repo_path.starts_with(abs) {
            return Err(LnkError::new(
                ErrorCode::FileOperation,
                "cannot add a directory that contains the lnk repository",
                Severity::Error,
            )
            .with_context("file_path", abs.display()));
        }
        Ok(())
    }

    /// Error for a repository copy that already exists where a new one would
    /// be placed.
    fn ensure_repo_slot_free(&self, repo_file: &Path) -> Result<()> {
        if self.fs.exists(repo_file) || self.fs.is_symlink(repo_file) {
            return Err(LnkError::new(
                ErrorCode::FileOperation,
                "the repository already holds a file at this location",
                Severity::Error,
            )
            .with_context("repo_path", repo_file.display())
            .with_suggestion("run 'lnk cleanup' or delete the stale copy from the repository"));
        }
        Ok(())
    }

    /// `true` if `link` already points at `repo_file` the way `link_type`
    /// requires.
    fn link_is_correct(&self, link_type: LinkType, link: &Path, repo_file: &Path) -> bool {
        match link_type {
            LinkType::Soft => {
                self.fs.is_symlink(link)
                    && matches!(
                        (dunce::canonicalize(link), dunce::canonicalize(repo_file)),
                        (Ok(a), Ok(b)) if a == b
                    )
            }
            LinkType::Hard => self.fs.is_hardlink_to(link, repo_file),
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing
)]
pub(crate) mod test_support;
