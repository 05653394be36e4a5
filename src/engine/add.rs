//! Bringing files under management: `add`, `add_multiple` and the
//! recursive variant.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::{Lnk, basename, is_hidden};
use crate::error::{ErrorCode, LnkError, Result, Severity};
use crate::tracking::{LinkType, TrackedEntry};

/// A validated file waiting to be relocated.
#[derive(Debug)]
struct BatchItem {
    abs: PathBuf,
    key: String,
}

impl Lnk {
    /// Move `path` into the repository and link it back.
    ///
    /// Directories are consolidated into a single symlinked entry.  The whole
    /// operation is rolled back if any step fails.
    ///
    /// # Errors
    ///
    /// `FILE_ALREADY_MANAGED` if the path is tracked or lives in the
    /// repository, `FILE_NOT_EXISTS` / `FILE_PERMISSION` from validation, and
    /// step failures from the filesystem or git.
    pub fn add(&self, path: impl AsRef<Path>) -> Result<()> {
        self.ensure_initialized()?;
        let abs = self.normalize(path.as_ref());
        self.check_addable(&abs)?;
        let key = self.tracking_key(&abs)?;
        let _lock = self.lock()?;

        if self.find_entry(&key)?.is_some() {
            return Err(LnkError::file_already_managed(&abs));
        }

        if self.fs.is_dir(&abs) && !self.fs.is_symlink(&abs) {
            return self.consolidate_dir(&abs, &key);
        }

        // A symlink to a directory is materialized as a directory, which
        // can only be soft-linked.
        let link_type = if self.fs.is_dir(&abs) {
            LinkType::Soft
        } else {
            self.link_type
        };
        let repo_file = self.repo_path_for_key(&key);
        self.ensure_repo_slot_free(&repo_file)?;
        self.fs
            .ensure_dir(&self.host_dir())
            .map_err(|e| LnkError::from(e).prefixed("cannot create host directory"))?;

        let name = basename(&abs);
        self.transact(|log| {
            self.move_recorded(log, &abs, &repo_file)?;
            self.link_recorded(log, link_type, &repo_file, &abs)?;
            self.append_entries(log, vec![TrackedEntry::new(key.as_str(), link_type)])?;
            self.stage(log, vec![self.repo_rel(&repo_file), self.tracking_rel()])?;
            self.commit(&format!("lnk: 添加文件 {name}"))?;
            Ok(())
        })?;

        tracing::info!(path = %abs.display(), %link_type, "added");
        Ok(())
    }

    /// Add several files in one transaction and one commit.
    ///
    /// Already-managed files are skipped with a warning.  Returns the paths
    /// that were added.
    ///
    /// # Errors
    ///
    /// Every path is validated before anything is moved; a directory, a
    /// missing file or an unreadable file aborts the batch untouched.
    /// `FILE_OPERATION` for an empty list, `FILE_ALREADY_MANAGED` if every
    /// path is already managed.
    pub fn add_multiple<P: AsRef<Path>>(&self, paths: &[P]) -> Result<Vec<PathBuf>> {
        self.ensure_initialized()?;
        let _lock = self.lock()?;
        let tracked = self.read_tracking()?;

        let mut items = Vec::new();
        let mut seen = HashSet::new();
        let mut first_managed = None;
        for path in paths {
            let abs = self.normalize(path.as_ref());
            let key = self.tracking_key(&abs)?;
            if !seen.insert(key.clone()) {
                continue;
            }
            let managed = if tracked.iter().any(|e| e.path == key) {
                true
            } else {
                match self.check_addable(&abs) {
                    Ok(()) => false,
                    Err(err) if err.is(ErrorCode::FileAlreadyManaged) => true,
                    Err(err) => return Err(err),
                }
            };
            if managed {
                tracing::warn!(path = %abs.display(), "already managed, skipping");
                if first_managed.is_none() {
                    first_managed = Some(abs);
                }
                continue;
            }
            if self.fs.is_dir(&abs) {
                return Err(LnkError::new(
                    ErrorCode::FileOperation,
                    "directories cannot be part of a batch add",
                    Severity::Error,
                )
                .with_context("file_path", abs.display())
                .with_suggestion("add the directory on its own, or use --recursive"));
            }
            items.push(BatchItem { abs, key });
        }

        if items.is_empty() {
            return Err(first_managed
                .map_or_else(no_paths, |abs| LnkError::file_already_managed(&abs)));
        }
        let message = format!("lnk: 批量添加 {} 个文件", items.len());
        self.add_batch(&items, &message, |_, _, _| {})
    }

    /// Add every file under the given paths, descending into directories.
    ///
    /// # Errors
    ///
    /// See [`Lnk::add_recursive_with_progress`].
    pub fn add_recursive<P: AsRef<Path>>(&self, paths: &[P]) -> Result<Vec<PathBuf>> {
        self.add_recursive_with_progress(paths, |_, _, _| {})
    }

    /// Expand directories into their files and add them as one batch.
    ///
    /// Hidden files and hidden subdirectories are skipped, as are files that
    /// are already managed or cannot be added.  `progress` is called once per
    /// file with `(current, total, path)` before it is moved.
    ///
    /// # Errors
    ///
    /// Fails before any mutation if a top-level path is invalid or a
    /// directory cannot be read; step failures roll back the whole batch.
    /// `FILE_NOT_EXISTS` when the paths hold no files, `FILE_ALREADY_MANAGED`
    /// when none of them is left to add.
    pub fn add_recursive_with_progress<P, F>(&self, paths: &[P], progress: F) -> Result<Vec<PathBuf>>
    where
        P: AsRef<Path>,
        F: FnMut(usize, usize, &Path),
    {
        self.ensure_initialized()?;
        let _lock = self.lock()?;
        let tracked = self.read_tracking()?;

        if paths.is_empty() {
            return Err(no_paths());
        }

        let mut items = Vec::new();
        let mut seen = HashSet::new();
        let mut found = 0;
        for path in paths {
            let abs = self.normalize(path.as_ref());
            let top_managed = self
                .tracking_key(&abs)
                .is_ok_and(|key| tracked.iter().any(|e| e.path == key));
            if !top_managed {
                match self.check_addable(&abs) {
                    Ok(()) => {}
                    Err(err) if err.is(ErrorCode::FileAlreadyManaged) => {}
                    Err(err) => return Err(err),
                }
            }
            let candidates = if self.fs.is_dir(&abs) && !self.fs.is_symlink(&abs) {
                collect_files(&abs)?
            } else {
                vec![abs]
            };
            found += candidates.len();
            for file in candidates {
                let Ok(key) = self.tracking_key(&file) else {
                    tracing::debug!(path = %file.display(), "cannot be tracked, skipping");
                    continue;
                };
                if tracked.iter().any(|e| e.path == key) || !seen.insert(key.clone()) {
                    tracing::debug!(path = %file.display(), "already managed, skipping");
                    continue;
                }
                if self.check_addable(&file).is_err() {
                    tracing::debug!(path = %file.display(), "not addable, skipping");
                    continue;
                }
                items.push(BatchItem { abs: file, key });
            }
        }

        if found == 0 {
            return Err(LnkError::new(
                ErrorCode::FileNotExists,
                "no files found to add",
                Severity::Error,
            )
            .with_suggestion("hidden files and empty directories are skipped"));
        }
        if items.is_empty() {
            return Err(LnkError::new(
                ErrorCode::FileAlreadyManaged,
                "no files left to add; every file is already managed or cannot be added",
                Severity::Error,
            ));
        }
        let message = format!("lnk: 递归添加 {} 个文件", items.len());
        self.add_batch(&items, &message, progress)
    }

    /// Relocate, link and track `items` in one transaction, then commit.
    fn add_batch<F>(&self, items: &[BatchItem], message: &str, mut progress: F) -> Result<Vec<PathBuf>>
    where
        F: FnMut(usize, usize, &Path),
    {
        let link_type = self.link_type;
        for item in items {
            self.ensure_repo_slot_free(&self.repo_path_for_key(&item.key))?;
        }
        self.fs
            .ensure_dir(&self.host_dir())
            .map_err(|e| LnkError::from(e).prefixed("cannot create host directory"))?;

        let total = items.len();
        self.transact(|log| {
            let mut staged = Vec::with_capacity(total + 1);
            for (index, item) in items.iter().enumerate() {
                progress(index + 1, total, &item.abs);
                let repo_file = self.repo_path_for_key(&item.key);
                self.move_recorded(log, &item.abs, &repo_file)?;
                self.link_recorded(log, link_type, &repo_file, &item.abs)?;
                staged.push(self.repo_rel(&repo_file));
            }
            let entries = items
                .iter()
                .map(|item| TrackedEntry::new(item.key.as_str(), link_type))
                .collect();
            self.append_entries(log, entries)?;
            staged.push(self.tracking_rel());
            self.stage(log, staged)?;
            self.commit(message)?;
            Ok(())
        })?;

        tracing::info!(count = total, "added files");
        Ok(items.iter().map(|item| item.abs.clone()).collect())
    }
}

fn no_paths() -> LnkError {
    LnkError::new(ErrorCode::FileOperation, "no paths given", Severity::Error)
}

/// Regular files under `dir`, skipping hidden entries below the root.
fn collect_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let walker = WalkDir::new(dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()));
    for entry in walker {
        let entry = entry.map_err(|e| {
            LnkError::wrap(
                e,
                ErrorCode::FileOperation,
                "cannot read directory",
                Severity::Error,
            )
            .with_context("dir", dir.display())
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
