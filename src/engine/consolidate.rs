//! Directory consolidation: a directory becomes one tracked entry backed by
//! one symlink to a single directory in the repository.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::{Lnk, basename, is_hidden};
use crate::error::{ErrorCode, LnkError, Result, Severity};
use crate::rollback::UndoOp;
use crate::tracking::{LinkType, TrackedEntry};

/// What to do with one non-directory entry of the tree.
#[derive(Debug)]
enum Child {
    /// Untracked: move it into the consolidated directory.
    Plain { path: PathBuf },
    /// Tracked with a repository copy: drop the link, relocate the copy.
    Managed {
        link: PathBuf,
        entry: TrackedEntry,
        copy: PathBuf,
    },
    /// Tracked, but its repository copy is gone and the file itself is
    /// real: forget the entry, move the file.
    Orphaned { path: PathBuf, entry: TrackedEntry },
}

impl Lnk {
    /// Consolidate `dir` (tracking key `key`) into the repository.
    pub(super) fn consolidate_dir(&self, dir: &Path, key: &str) -> Result<()> {
        let repo_dir = self.repo_path_for_key(key);
        let tracked = self.read_tracking()?;

        let mut dirs = Vec::new();
        let mut children = Vec::new();
        for entry in WalkDir::new(dir).follow_links(false).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                LnkError::wrap(
                    e,
                    ErrorCode::FileOperation,
                    "cannot read directory",
                    Severity::Error,
                )
                .with_context("dir", dir.display())
            })?;
            if entry.file_type().is_dir() {
                dirs.push(entry.into_path());
            } else {
                children.push(self.classify_child(entry.into_path(), &tracked)?);
            }
        }
        self.check_consolidation_slot(&repo_dir, &children)?;

        let counted = children
            .iter()
            .filter(|c| !is_hidden(c.path()))
            .count();
        let name = basename(dir);
        self.fs
            .ensure_dir(&self.host_dir())
            .map_err(|e| LnkError::from(e).prefixed("cannot create host directory"))?;

        self.transact(|log| {
            let mut staged = vec![self.repo_rel(&repo_dir), self.tracking_rel()];
            let mut dropped = Vec::new();
            for child in &children {
                let dst = repo_dir.join(child.path().strip_prefix(dir).unwrap_or(child.path()));
                match child {
                    Child::Plain { path } => self.move_recorded(log, path, &dst)?,
                    Child::Managed { link, entry, copy } => {
                        self.unlink_recorded(log, entry.link_type, copy, link)?;
                        if *copy != dst {
                            self.move_recorded(log, copy, &dst)?;
                            staged.push(self.repo_rel(copy));
                        }
                        dropped.push(entry.path.as_str());
                    }
                    Child::Orphaned { path, entry } => {
                        self.move_recorded(log, path, &dst)?;
                        dropped.push(entry.path.as_str());
                    }
                }
            }
            self.drop_entries(log, &dropped)?;

            // Only empty directories remain.
            self.fs.remove_dir_all(dir).map_err(|e| {
                LnkError::from(e)
                    .prefixed("failed to remove original directory")
                    .with_recoverable(true)
            })?;
            for path in &dirs {
                log.record(UndoOp::RecreateDir { path: path.clone() });
            }
            self.fs.ensure_dir(&repo_dir)?;

            self.link_recorded(log, LinkType::Soft, &repo_dir, dir)?;
            self.append_entries(log, vec![TrackedEntry::new(key, LinkType::Soft)])?;
            self.stage(log, staged)?;
            self.commit(&format!("lnk: 目录整合 {name} ({counted} 项)"))?;
            Ok(())
        })?;

        tracing::info!(path = %dir.display(), files = counted, "directory consolidated");
        Ok(())
    }

    fn classify_child(&self, path: PathBuf, tracked: &[TrackedEntry]) -> Result<Child> {
        let child_key = self.tracking_key(&path)?;
        let Some(entry) = tracked.iter().find(|e| e.path == child_key) else {
            if self.fs.is_symlink(&path) && !self.fs.exists(&path) {
                return Err(LnkError::new(
                    ErrorCode::FileNotExists,
                    "directory contains a dangling symlink",
                    Severity::Error,
                )
                .with_context("file_path", path.display())
                .with_suggestion("remove or fix the link, then add the directory again"));
            }
            return Ok(Child::Plain { path });
        };
        let copy = self.repo_path_for_key(&child_key);
        if self.fs.exists(&copy) {
            return Ok(Child::Managed {
                link: path,
                entry: entry.clone(),
                copy,
            });
        }
        if self.fs.exists(&path) && !self.fs.is_symlink(&path) {
            return Ok(Child::Orphaned {
                path,
                entry: entry.clone(),
            });
        }
        Err(LnkError::new(
            ErrorCode::FileNotExists,
            "a managed file inside the directory has no repository copy",
            Severity::Error,
        )
        .with_context("file_path", path.display())
        .with_suggestion("run 'lnk cleanup' to drop the stale entry first"))
    }

    /// The consolidated directory may already exist only because it holds
    /// the repository copies of children being absorbed.
    fn check_consolidation_slot(&self, repo_dir: &Path, children: &[Child]) -> Result<()> {
        if !self.fs.exists(repo_dir) && !self.fs.is_symlink(repo_dir) {
            return Ok(());
        }
        if !self.fs.is_dir(repo_dir) || self.fs.is_symlink(repo_dir) {
            return self.ensure_repo_slot_free(repo_dir);
        }
        let copies: Vec<&Path> = children
            .iter()
            .filter_map(|c| match c {
                Child::Managed { copy, .. } => Some(copy.as_path()),
                _ => None,
            })
            .collect();
        for entry in WalkDir::new(repo_dir).follow_links(false) {
            let entry = entry.map_err(|e| {
                LnkError::wrap(
                    e,
                    ErrorCode::FileOperation,
                    "cannot read directory",
                    Severity::Error,
                )
                .with_context("dir", repo_dir.display())
            })?;
            let absorbed = copies.iter().any(|c| entry.path().starts_with(c));
            if !entry.file_type().is_dir() && !absorbed {
                return Err(LnkError::new(
                    ErrorCode::FileOperation,
                    "the repository already holds unrelated files at this location",
                    Severity::Error,
                )
                .with_context("repo_path", repo_dir.display())
                .with_context("conflict", entry.path().display())
                .with_suggestion("run 'lnk cleanup' or delete the stale copy from the repository"));
            }
        }
        Ok(())
    }
}

impl Child {
    fn path(&self) -> &Path {
        match self {
            Self::Plain { path } | Self::Orphaned { path, .. } => path,
            Self::Managed { link, .. } => link,
        }
    }
}
