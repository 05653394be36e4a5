//! Recreating links from the tracking file, typically after a pull.

use std::path::{Path, PathBuf};

use serde::Serialize;

use super::{BACKUP_SUFFIX, Lnk, host_namespace};
use crate::error::{ErrorCode, LnkError, Result, Severity};
use crate::tracking::TrackedEntry;

/// A conflicting file moved aside before linking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Backup {
    /// Where the file was.
    pub original: PathBuf,
    /// Where it is now.
    pub backup: PathBuf,
}

/// Outcome of a restore pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RestoreReport {
    /// Links created by this pass.
    pub restored: Vec<PathBuf>,
    /// Entries whose link was already correct.
    pub already_correct: usize,
    /// Files moved aside to make room for a link.
    pub backups: Vec<Backup>,
}

impl RestoreReport {
    /// `true` if the pass changed nothing on disk.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.restored.is_empty() && self.backups.is_empty()
    }
}

impl Lnk {
    /// Make every entry of the active host point at its repository copy.
    ///
    /// Entries are handled independently: correct links are left alone, a
    /// conflicting regular file is renamed to `<path>.lnk.backup`, and
    /// missing parent directories are created.
    ///
    /// # Errors
    ///
    /// A `FILE_OPERATION` error summarizing restored and failed counts when
    /// any entry could not be restored.  Entries before and after a failure
    /// are still processed.
    pub fn restore_symlinks(&self) -> Result<RestoreReport> {
        self.ensure_initialized()?;
        let _lock = self.lock()?;
        self.restore_entries(self.host.as_deref())
    }

    /// Like [`Lnk::restore_symlinks`], for another host's tracking file and
    /// repository directory.
    ///
    /// # Errors
    ///
    /// `HOST_NOT_FOUND` if `host` has no tracking file; otherwise as
    /// [`Lnk::restore_symlinks`].
    pub fn restore_symlinks_for_host(&self, host: &str) -> Result<RestoreReport> {
        self.ensure_initialized()?;
        let ns = host_namespace(host)?;
        if !self.fs.exists(&self.tracking_file_for(ns.as_deref())) {
            return Err(LnkError::host_not_found(host));
        }
        let _lock = self.lock()?;
        self.restore_entries(ns.as_deref())
    }

    /// The restore pass itself.  The caller holds the lock.
    pub(super) fn restore_entries(&self, host: Option<&str>) -> Result<RestoreReport> {
        let entries = self.read_tracking_for(host)?;
        let mut report = RestoreReport::default();
        let mut failures = Vec::new();

        for entry in &entries {
            let repo_file = self.repo_path_for_key_in(host, &entry.path);
            if let Err(err) = self.restore_entry(entry, &repo_file, &mut report) {
                tracing::warn!(path = %entry.path, error = %err, "restore failed");
                failures.push(format!("{}: {}", entry.path, err.message()));
            }
        }

        tracing::info!(
            restored = report.restored.len(),
            already_correct = report.already_correct,
            failed = failures.len(),
            "restore finished"
        );
        if failures.is_empty() {
            return Ok(report);
        }
        Err(LnkError::new(
            ErrorCode::FileOperation,
            format!(
                "some links could not be restored (restored: {}, already correct: {}, failed: {})",
                report.restored.len(),
                report.already_correct,
                failures.len()
            ),
            Severity::Error,
        )
        .with_context("failures", failures.join("; "))
        .with_suggestion("fix the listed paths and run 'lnk restore' again")
        .with_recoverable(true))
    }

    fn restore_entry(
        &self,
        entry: &TrackedEntry,
        repo_file: &Path,
        report: &mut RestoreReport,
    ) -> Result<()> {
        let abs = self.abs_from_key(&entry.path);
        if !self.fs.exists(repo_file) {
            return Err(LnkError::new(
                ErrorCode::FileNotExists,
                "repository copy is missing",
                Severity::Error,
            )
            .with_context("repo_path", repo_file.display()));
        }
        if self.link_is_correct(entry.link_type, &abs, repo_file) {
            report.already_correct += 1;
            return Ok(());
        }

        if self.fs.is_symlink(&abs) {
            self.fs.remove_file(&abs)?;
        } else if self.fs.exists(&abs) {
            let backup = self.backup_path(&abs);
            self.fs.move_path(&abs, &backup)?;
            tracing::info!(path = %abs.display(), backup = %backup.display(), "backed up conflicting file");
            report.backups.push(Backup {
                original: abs.clone(),
                backup,
            });
        }
        if let Some(parent) = abs.parent() {
            self.fs.ensure_dir(parent)?;
        }
        self.link(entry.link_type, repo_file, &abs)?;
        tracing::debug!(path = %abs.display(), link_type = %entry.link_type, "restored");
        report.restored.push(abs);
        Ok(())
    }

    /// `<path>.lnk.backup`, or `<path>.lnk.backup.<pid>` if that is taken.
    fn backup_path(&self, abs: &Path) -> PathBuf {
        let mut name = abs.as_os_str().to_os_string();
        name.push(BACKUP_SUFFIX);
        let backup = PathBuf::from(name);
        if !self.fs.exists(&backup) && !self.fs.is_symlink(&backup) {
            return backup;
        }
        let mut name = backup.into_os_string();
        name.push(format!(".{}", std::process::id()));
        PathBuf::from(name)
    }
}
