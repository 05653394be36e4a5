//! Compensating actions for multi-step operations.
//!
//! Each forward step of a transaction records the [`UndoOp`] that reverses
//! it.  On success the [`RollbackLog`] is committed and forgotten; on
//! failure it is unwound in reverse order.  Unwinding never stops early: a
//! failed undo is collected and the remaining ops still run, so as much
//! state as possible is restored and nothing is silently lost.

use std::fmt;
use std::path::PathBuf;

use crate::tracking::{LinkType, TrackedEntry};

/// A single compensating action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoOp {
    /// Move `from` back to `to` (reverses a relocation into the repository).
    MoveBack {
        /// Where the content is now.
        from: PathBuf,
        /// Where it came from.
        to: PathBuf,
    },
    /// Replace the copy a symlinked source was materialized into with the
    /// original link.
    RestoreSymlink {
        /// Materialized copy to delete.
        copy: PathBuf,
        /// Where the link lived.
        link: PathBuf,
        /// Original link text.
        raw: PathBuf,
    },
    /// Remove the link created at `path`.
    RemoveLink {
        /// Link to delete.
        path: PathBuf,
    },
    /// Recreate a link that was deleted.
    CreateLink {
        /// Repository file the link points at.
        target: PathBuf,
        /// Link location.
        link: PathBuf,
        /// Link kind to recreate.
        link_type: LinkType,
    },
    /// Drop the tracking entry with this key.
    RemoveTrackingEntry {
        /// Tracking key to remove.
        key: String,
    },
    /// Put a removed tracking entry back at its former position.
    RestoreTrackingEntry {
        /// Entry to re-add.
        entry: TrackedEntry,
        /// Index the entry had in the tracking file.
        index: usize,
    },
    /// Recreate a directory that was removed.
    RecreateDir {
        /// Directory to create.
        path: PathBuf,
    },
    /// Reset the git index entries of these repository-relative paths.
    Unstage {
        /// Paths relative to the repository root.
        paths: Vec<PathBuf>,
    },
}

impl fmt::Display for UndoOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MoveBack { from, to } => {
                write!(f, "move {} back to {}", from.display(), to.display())
            }
            Self::RestoreSymlink { copy, link, raw } => write!(
                f,
                "replace {} with link {} -> {}",
                copy.display(),
                link.display(),
                raw.display()
            ),
            Self::RemoveLink { path } => write!(f, "remove link {}", path.display()),
            Self::CreateLink {
                target,
                link,
                link_type,
            } => write!(
                f,
                "recreate {link_type} link {} -> {}",
                link.display(),
                target.display()
            ),
            Self::RemoveTrackingEntry { key } => write!(f, "remove tracking entry {key}"),
            Self::RestoreTrackingEntry { entry, .. } => {
                write!(f, "restore tracking entry {}", entry.path)
            }
            Self::RecreateDir { path } => write!(f, "recreate directory {}", path.display()),
            Self::Unstage { paths } => {
                let joined: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
                write!(f, "unstage {}", joined.join(" "))
            }
        }
    }
}

/// Ordered record of the undo ops for one transaction.
#[derive(Debug, Default)]
pub struct RollbackLog {
    ops: Vec<UndoOp>,
}

impl RollbackLog {
    /// Empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the undo for a step that just completed.
    pub fn record(&mut self, op: UndoOp) {
        tracing::trace!(%op, "recorded undo");
        self.ops.push(op);
    }

    /// Recorded ops in forward order.
    #[must_use]
    pub fn ops(&self) -> &[UndoOp] {
        &self.ops
    }

    /// Number of recorded ops.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// `true` if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// The transaction succeeded; discard the undo ops.
    pub fn commit(self) {
        tracing::trace!(steps = self.ops.len(), "transaction committed");
    }

    /// Run every recorded op through `undo`, newest first.
    ///
    /// Returns one message per failed op; an empty vector means the
    /// rollback was complete.
    pub fn unwind<F, E>(self, mut undo: F) -> Vec<String>
    where
        F: FnMut(&UndoOp) -> Result<(), E>,
        E: fmt::Display,
    {
        let mut failures = Vec::new();
        for op in self.ops.iter().rev() {
            tracing::debug!(%op, "rolling back");
            if let Err(e) = undo(op) {
                tracing::warn!(%op, error = %e, "rollback step failed");
                failures.push(format!("{op}: {e}"));
            }
        }
        failures
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_log() -> RollbackLog {
        let mut log = RollbackLog::new();
        log.record(UndoOp::MoveBack {
            from: "/repo/.bashrc".into(),
            to: "/home/u/.bashrc".into(),
        });
        log.record(UndoOp::RemoveLink {
            path: "/home/u/.bashrc".into(),
        });
        log.record(UndoOp::RemoveTrackingEntry {
            key: ".bashrc".into(),
        });
        log
    }

    #[test]
    fn unwind_runs_newest_first() {
        let mut seen = Vec::new();
        let failures = sample_log().unwind(|op| {
            seen.push(op.clone());
            Ok::<(), String>(())
        });

        assert!(failures.is_empty());
        assert_eq!(
            seen,
            vec![
                UndoOp::RemoveTrackingEntry {
                    key: ".bashrc".into()
                },
                UndoOp::RemoveLink {
                    path: "/home/u/.bashrc".into()
                },
                UndoOp::MoveBack {
                    from: "/repo/.bashrc".into(),
                    to: "/home/u/.bashrc".into()
                },
            ]
        );
    }

    #[test]
    fn unwind_continues_after_failure_and_reports_it() {
        let mut count = 0;
        let failures = sample_log().unwind(|op| {
            count += 1;
            match op {
                UndoOp::RemoveLink { .. } => Err("device busy"),
                _ => Ok(()),
            }
        });

        assert_eq!(count, 3, "every op attempted");
        assert_eq!(failures, vec!["remove link /home/u/.bashrc: device busy"]);
    }

    #[test]
    fn empty_log_unwinds_to_nothing() {
        let log = RollbackLog::new();
        assert!(log.is_empty());
        assert!(log.unwind(|_| Ok::<(), String>(())).is_empty());
    }

    #[test]
    fn ops_are_inspectable_in_forward_order() {
        let log = sample_log();
        assert_eq!(log.len(), 3);
        assert!(matches!(log.ops().first(), Some(UndoOp::MoveBack { .. })));
    }

    #[test]
    fn display_describes_each_op() {
        let op = UndoOp::CreateLink {
            target: "/repo/.vimrc".into(),
            link: "/home/u/.vimrc".into(),
            link_type: LinkType::Hard,
        };
        assert_eq!(op.to_string(), "recreate hard link /home/u/.vimrc -> /repo/.vimrc");
        let op = UndoOp::RestoreTrackingEntry {
            entry: TrackedEntry::new(".vimrc", LinkType::Soft),
            index: 0,
        };
        assert_eq!(op.to_string(), "restore tracking entry .vimrc");
    }
}
