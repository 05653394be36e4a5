//! Read-only views of the repository: listings, status and validation.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::Metadata;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::{DEFAULT_HOST_LABEL, Lnk, TRACK_FILE, host_namespace, step_failed};
use crate::error::{ErrorCode, LnkError, Result, Severity};
use crate::git::GitStatus;
use crate::tracking::{LinkType, TrackedEntry};

/// Snapshot returned by [`Lnk::status`].
#[derive(Debug, Clone, Serialize)]
pub struct StatusInfo {
    /// Repository root.
    pub repo_path: PathBuf,
    /// Active host, `None` for the default namespace.
    pub host: Option<String>,
    /// Git working tree state.
    pub git: GitStatus,
    /// Number of entries in the active host's tracking file.
    pub managed_files: usize,
    /// Tracking keys whose link is missing or dangling.
    pub broken_links: Vec<String>,
}

/// One problem found by [`Lnk::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationIssue {
    /// The active host has no tracking file.
    MissingTrackingFile {
        /// Expected tracking file.
        path: PathBuf,
    },
    /// The repository copy of a tracked entry is gone.
    MissingRepoFile {
        /// Tracking key.
        key: String,
        /// Where the copy should be.
        repo_path: PathBuf,
    },
    /// Nothing exists at the managed path.
    MissingLink {
        /// Tracking key.
        key: String,
    },
    /// A soft entry's managed path is a regular file or directory.
    NotSymlink {
        /// Tracking key.
        key: String,
    },
    /// The symlink points at something that does not exist.
    DanglingLink {
        /// Tracking key.
        key: String,
    },
    /// The symlink resolves somewhere other than the repository copy.
    WrongTarget {
        /// Tracking key.
        key: String,
        /// Repository copy.
        expected: PathBuf,
        /// Resolved link target.
        actual: PathBuf,
    },
    /// A hard entry no longer shares the repository copy's inode.
    NotHardlinked {
        /// Tracking key.
        key: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingTrackingFile { path } => {
                write!(f, "tracking file missing: {}", path.display())
            }
            Self::MissingRepoFile { key, repo_path } => {
                write!(f, "{key}: repository copy missing ({})", repo_path.display())
            }
            Self::MissingLink { key } => write!(f, "{key}: link missing"),
            Self::NotSymlink { key } => write!(f, "{key}: not a symlink"),
            Self::DanglingLink { key } => write!(f, "{key}: symlink target does not exist"),
            Self::WrongTarget {
                key,
                expected,
                actual,
            } => write!(
                f,
                "{key}: points to {} instead of {}",
                actual.display(),
                expected.display()
            ),
            Self::NotHardlinked { key } => {
                write!(f, "{key}: no longer hardlinked to the repository copy")
            }
        }
    }
}

impl Lnk {
    /// Entries tracked for the active host.
    ///
    /// # Errors
    ///
    /// `REPO_NOT_INITIALIZED`, or the tracking file cannot be read.
    pub fn list(&self) -> Result<Vec<TrackedEntry>> {
        self.ensure_initialized()?;
        self.read_tracking()
    }

    /// Entries of every host with a tracking file, keyed by host label.
    /// The default namespace is reported as `general`.
    ///
    /// # Errors
    ///
    /// `REPO_NOT_INITIALIZED`, or the repository root cannot be read.
    pub fn list_all(&self) -> Result<BTreeMap<String, Vec<TrackedEntry>>> {
        self.ensure_initialized()?;
        let mut out = BTreeMap::new();
        for host in self.known_hosts()? {
            let entries = self.read_tracking_for(host.as_deref())?;
            out.insert(host.unwrap_or_else(|| DEFAULT_HOST_LABEL.to_string()), entries);
        }
        Ok(out)
    }

    /// Entries tracked for `host`, without changing the active host.
    ///
    /// # Errors
    ///
    /// `HOST_NOT_FOUND` if `host` has no tracking file.
    pub fn list_by_host(&self, host: &str) -> Result<Vec<TrackedEntry>> {
        self.ensure_initialized()?;
        let ns = host_namespace(host)?;
        if !self.fs.exists(&self.tracking_file_for(ns.as_deref())) {
            return Err(LnkError::host_not_found(host));
        }
        self.read_tracking_for(ns.as_deref())
    }

    /// Number of entries tracked for the active host.
    ///
    /// # Errors
    ///
    /// As [`Lnk::list`].
    pub fn managed_file_count(&self) -> Result<usize> {
        Ok(self.list()?.len())
    }

    /// Entry count per host label.
    ///
    /// # Errors
    ///
    /// As [`Lnk::list_all`].
    pub fn all_hosts_file_count(&self) -> Result<BTreeMap<String, usize>> {
        Ok(self
            .list_all()?
            .into_iter()
            .map(|(host, entries)| (host, entries.len()))
            .collect())
    }

    /// `true` if the active host's repository copy of `key` exists.
    #[must_use]
    pub fn is_file_in_repo(&self, key: &str) -> bool {
        let repo_file = self.repo_path_for_key(key);
        self.fs.exists(&repo_file) || self.fs.is_symlink(&repo_file)
    }

    /// Metadata of the repository copy of `key`.
    ///
    /// # Errors
    ///
    /// `FILE_NOT_EXISTS` if there is no copy.
    pub fn repo_file_metadata(&self, key: &str) -> Result<Metadata> {
        let repo_file = self.repo_path_for_key(key);
        if !self.fs.exists(&repo_file) {
            return Err(LnkError::new(
                ErrorCode::FileNotExists,
                "repository copy does not exist",
                Severity::Error,
            )
            .with_context("key", key)
            .with_context("repo_path", repo_file.display()));
        }
        self.fs
            .metadata(&repo_file)
            .map_err(|e| LnkError::from(e).with_context("key", key))
    }

    /// Git state, entry count and broken links for the active host.
    ///
    /// # Errors
    ///
    /// `REPO_NOT_INITIALIZED`, or git status fails.
    pub fn status(&self) -> Result<StatusInfo> {
        self.ensure_initialized()?;
        let git = self
            .git
            .status()
            .map_err(|e| step_failed(e, "cannot read git status"))?;
        let entries = self.read_tracking()?;
        let broken_links = entries
            .iter()
            .filter(|e| self.is_broken(e))
            .map(|e| e.path.clone())
            .collect();
        Ok(StatusInfo {
            repo_path: self.repo_path.clone(),
            host: self.host.clone(),
            git,
            managed_files: entries.len(),
            broken_links,
        })
    }

    /// Check every entry of the active host against the filesystem.
    /// An empty result means the repository is consistent.
    ///
    /// # Errors
    ///
    /// `REPO_NOT_INITIALIZED`, or the tracking file cannot be read.
    pub fn validate(&self) -> Result<Vec<ValidationIssue>> {
        self.ensure_initialized()?;
        let tracking_file = self.tracking_file();
        if !self.fs.exists(&tracking_file) {
            return Ok(vec![ValidationIssue::MissingTrackingFile {
                path: tracking_file,
            }]);
        }
        let mut issues = Vec::new();
        for entry in self.read_tracking()? {
            if let Some(issue) = self.check_entry(&entry) {
                issues.push(issue);
            }
        }
        Ok(issues)
    }

    fn is_broken(&self, entry: &TrackedEntry) -> bool {
        let abs = self.abs_from_key(&entry.path);
        match entry.link_type {
            LinkType::Soft => !self.fs.is_symlink(&abs) || !self.fs.exists(&abs),
            LinkType::Hard => !self.fs.exists(&abs),
        }
    }

    fn check_entry(&self, entry: &TrackedEntry) -> Option<ValidationIssue> {
        let key = entry.path.clone();
        let abs = self.abs_from_key(&key);
        let repo_file = self.repo_path_for_key(&key);

        if !self.fs.exists(&repo_file) {
            return Some(ValidationIssue::MissingRepoFile {
                key,
                repo_path: repo_file,
            });
        }
        let is_link = self.fs.is_symlink(&abs);
        if !is_link && !self.fs.exists(&abs) {
            return Some(ValidationIssue::MissingLink { key });
        }
        match entry.link_type {
            LinkType::Soft if !is_link => Some(ValidationIssue::NotSymlink { key }),
            LinkType::Soft => {
                let Ok(actual) = dunce::canonicalize(&abs) else {
                    return Some(ValidationIssue::DanglingLink { key });
                };
                let expected = dunce::canonicalize(&repo_file).unwrap_or(repo_file);
                (actual != expected).then_some(ValidationIssue::WrongTarget {
                    key,
                    expected,
                    actual,
                })
            }
            LinkType::Hard => (!self.fs.is_hardlink_to(&abs, &repo_file))
                .then_some(ValidationIssue::NotHardlinked { key }),
        }
    }

    /// Hosts with a tracking file at the repository root, `None` for the
    /// default namespace.
    fn known_hosts(&self) -> Result<Vec<Option<String>>> {
        let entries = self
            .fs
            .list_dir(&self.repo_path)
            .map_err(|e| LnkError::from(e).prefixed("cannot read repository directory"))?;
        let mut hosts: Vec<Option<String>> = entries
            .iter()
            .filter_map(|p| host_from_tracking_name(&p.file_name()?.to_string_lossy()))
            .collect();
        hosts.sort();
        Ok(hosts)
    }

    /// `true` if the repository root holds any tracking file.
    pub(super) fn has_tracking_file(&self, root: &Path) -> bool {
        self.fs.list_dir(root).is_ok_and(|entries| {
            entries.iter().any(|p| {
                p.file_name()
                    .is_some_and(|n| host_from_tracking_name(&n.to_string_lossy()).is_some())
            })
        })
    }
}

/// `Some(None)` for `.lnk`, `Some(Some(host))` for `.lnk.<host>`.
///
/// A suffix that names the default namespace (`.lnk.general`,
/// `.lnk.localhost`) is not a host file: no lnk command writes one, and
/// listing it would shadow the default host's label.
fn host_from_tracking_name(name: &str) -> Option<Option<String>> {
    if name == TRACK_FILE {
        return Some(None);
    }
    let host = name.strip_prefix(TRACK_FILE)?.strip_prefix('.')?;
    if host.is_empty() || host.ends_with('~') || host.trim() != host {
        return None;
    }
    host_namespace(host).ok().flatten().map(Some)
}
