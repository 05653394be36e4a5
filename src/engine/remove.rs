//! Taking files out of management.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::{Lnk, basename};
use crate::error::{ErrorCode, LnkError, Result, Severity};
use crate::rollback::RollbackLog;
use crate::tracking::{LinkType, TrackedEntry};

/// A tracked path checked and ready to be restored.
#[derive(Debug)]
struct Removal {
    abs: PathBuf,
    entry: TrackedEntry,
    repo_file: PathBuf,
}

impl Lnk {
    /// Replace the link at `path` with the repository copy and stop tracking
    /// it.
    ///
    /// `path` is either a tracking key (`.bashrc`) or a `~`/absolute path.
    ///
    /// # Errors
    ///
    /// `FILE_NOT_MANAGED` if the path is not tracked, `FILE_OPERATION` if a
    /// soft entry is not a symlink or a hard entry has diverged, and step
    /// failures from the filesystem or git (rolled back).
    pub fn remove(&self, path: impl AsRef<Path>) -> Result<()> {
        self.ensure_initialized()?;
        let _lock = self.lock()?;
        let tracked = self.read_tracking()?;
        let removal = self.prepare_removal(path.as_ref(), &tracked)?;
        let name = basename(&removal.abs);

        self.transact(|log| {
            self.restore_original(log, &removal)?;
            self.drop_entries(log, &[removal.entry.path.as_str()])?;
            self.stage_removals(log, vec![self.repo_rel(&removal.repo_file)])?;
            self.commit(&format!("lnk: 移除文件 {name}"))?;
            Ok(())
        })?;

        tracing::info!(path = %removal.abs.display(), "removed");
        Ok(())
    }

    /// Remove several paths in one transaction and one commit.
    ///
    /// Every path is checked before anything changes.  Returns the restored
    /// paths.
    ///
    /// # Errors
    ///
    /// As [`Lnk::remove`]; a single invalid path aborts the whole batch.
    pub fn remove_multiple<P: AsRef<Path>>(&self, paths: &[P]) -> Result<Vec<PathBuf>> {
        self.ensure_initialized()?;
        let _lock = self.lock()?;
        let tracked = self.read_tracking()?;

        let mut removals = Vec::new();
        let mut seen = HashSet::new();
        for path in paths {
            let removal = self.prepare_removal(path.as_ref(), &tracked)?;
            if seen.insert(removal.entry.path.clone()) {
                removals.push(removal);
            }
        }
        if removals.is_empty() {
            return Ok(Vec::new());
        }

        self.transact(|log| {
            for removal in &removals {
                self.restore_original(log, removal)?;
            }
            let keys: Vec<&str> = removals.iter().map(|r| r.entry.path.as_str()).collect();
            self.drop_entries(log, &keys)?;
            let rels = removals.iter().map(|r| self.repo_rel(&r.repo_file)).collect();
            self.stage_removals(log, rels)?;
            self.commit(&format!("lnk: 批量移除 {} 个文件", removals.len()))?;
            Ok(())
        })?;

        tracing::info!(count = removals.len(), "removed files");
        Ok(removals.into_iter().map(|r| r.abs).collect())
    }

    fn prepare_removal(&self, input: &Path, tracked: &[TrackedEntry]) -> Result<Removal> {
        let (abs, key) = self.resolve_managed(input)?;
        let entry = tracked
            .iter()
            .find(|e| e.path == key)
            .cloned()
            .ok_or_else(|| LnkError::file_not_managed(&abs))?;
        let repo_file = self.repo_path_for_key(&key);

        match entry.link_type {
            LinkType::Soft if !self.fs.is_symlink(&abs) => {
                return Err(LnkError::new(
                    ErrorCode::FileOperation,
                    "managed path is not a symlink",
                    Severity::Error,
                )
                .with_context("file_path", abs.display())
                .with_suggestion("move the file aside and run 'lnk restore' to relink it"));
            }
            LinkType::Hard
                if self.fs.exists(&abs)
                    && self.fs.exists(&repo_file)
                    && !self.fs.is_hardlink_to(&abs, &repo_file) =>
            {
                return Err(LnkError::new(
                    ErrorCode::FileOperation,
                    "hardlinked file no longer shares the repository copy",
                    Severity::Error,
                )
                .with_context("file_path", abs.display())
                .with_context("repo_path", repo_file.display())
                .with_suggestion("reconcile the two copies by hand, then run 'lnk restore'"));
            }
            _ => {}
        }

        if !self.fs.exists(&repo_file) {
            return Err(LnkError::new(
                ErrorCode::FileNotExists,
                "repository copy is missing",
                Severity::Error,
            )
            .with_context("repo_path", repo_file.display())
            .with_suggestion("run 'lnk cleanup' to drop the stale entry"));
        }

        Ok(Removal {
            abs,
            entry,
            repo_file,
        })
    }

    /// Drop the link and move the repository copy back into place.
    fn restore_original(&self, log: &mut RollbackLog, removal: &Removal) -> Result<()> {
        if self.fs.is_symlink(&removal.abs) || self.fs.exists(&removal.abs) {
            self.unlink_recorded(
                log,
                removal.entry.link_type,
                &removal.repo_file,
                &removal.abs,
            )?;
        }
        self.move_recorded(log, &removal.repo_file, &removal.abs)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use std::fs;

    use super::super::test_support::*;
    use super::*;
    use crate::git::MockGitOps;

    fn is_symlink(path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_symlink())
    }

    #[test]
    fn remove_by_key_restores_regular_file() {
        let env = TestEnv::new();
        let file = env.write(".bashrc", &"x".repeat(500));
        let lnk = env.lnk(quiet_git());
        lnk.add(&file).unwrap();

        lnk.remove(".bashrc").unwrap();

        assert!(!is_symlink(&file));
        assert_eq!(fs::read_to_string(&file).unwrap().len(), 500);
        assert!(!env.repo().join(".bashrc").exists());
        assert_eq!(env.tracking(), "");
    }

    #[test]
    fn remove_by_path_stages_removal_and_commits() {
        let env = TestEnv::new();
        let file = env.write(".config/app/rc", "x");
        env.lnk(quiet_git()).add(&file).unwrap();
        let mut git = MockGitOps::new();
        git.expect_is_repo().return_const(true);
        git.expect_remove()
            .withf(|p| p == Path::new(".config/app/rc"))
            .times(1)
            .returning(|_| Ok(()));
        git.expect_add()
            .withf(|p| p == Path::new(".lnk"))
            .times(1)
            .returning(|_| Ok(()));
        git.expect_commit()
            .withf(|msg| msg == "lnk: 移除文件 rc")
            .times(1)
            .returning(|_| Ok(true));

        env.lnk(git).remove(&file).unwrap();

        assert!(file.is_file());
    }

    #[test]
    fn remove_unmanaged_is_not_managed() {
        let env = TestEnv::new();
        env.write(".bashrc", "x");
        let err = env.lnk(quiet_git()).remove(".bashrc").unwrap_err();
        assert_eq!(err.code(), ErrorCode::FileNotManaged);
    }

    #[test]
    fn remove_rejects_replaced_symlink() {
        let env = TestEnv::new();
        let file = env.write(".bashrc", "x");
        let lnk = env.lnk(quiet_git());
        lnk.add(&file).unwrap();
        fs::remove_file(&file).unwrap();
        fs::write(&file, "user edit").unwrap();

        let err = lnk.remove(".bashrc").unwrap_err();

        assert_eq!(err.code(), ErrorCode::FileOperation);
        assert_eq!(fs::read_to_string(&file).unwrap(), "user edit");
    }

    #[test]
    fn remove_with_missing_repo_copy_points_to_cleanup() {
        let env = TestEnv::new();
        let file = env.write(".bashrc", "x");
        let lnk = env.lnk(quiet_git());
        lnk.add(&file).unwrap();
        fs::remove_file(env.repo().join(".bashrc")).unwrap();

        let err = lnk.remove(".bashrc").unwrap_err();

        assert_eq!(err.code(), ErrorCode::FileNotExists);
        assert!(err.suggestion().unwrap().contains("cleanup"));
    }

    #[test]
    fn failed_commit_relinks_file() {
        let env = TestEnv::new();
        let file = env.write(".bashrc", "x");
        env.lnk(quiet_git()).add(&file).unwrap();

        let err = env.lnk(git_failing_commit()).remove(".bashrc").unwrap_err();

        assert_eq!(err.code(), ErrorCode::GitCommand);
        assert!(is_symlink(&file));
        assert_eq!(fs::read_to_string(&file).unwrap(), "x");
        assert_eq!(env.tracking(), ".bashrc|soft\n");
    }

    #[test]
    fn failed_remove_keeps_entry_in_place() {
        let env = TestEnv::new();
        let paths = [env.write(".a", "a"), env.write(".b", "b"), env.write(".c", "c")];
        env.lnk(quiet_git()).add_multiple(&paths).unwrap();

        let lnk = env.lnk(git_failing_commit());
        assert!(lnk.remove(".a").is_err());
        assert!(lnk.remove_multiple(&[".a", ".b"]).is_err());

        assert_eq!(env.tracking(), ".a|soft\n.b|soft\n.c|soft\n");
    }

    #[test]
    fn remove_multiple_validates_all_first() {
        let env = TestEnv::new();
        let a = env.write(".a", "a");
        let lnk = env.lnk(quiet_git());
        lnk.add(&a).unwrap();

        let err = lnk.remove_multiple(&[".a", ".not-managed"]).unwrap_err();

        assert_eq!(err.code(), ErrorCode::FileNotManaged);
        assert!(is_symlink(&a));
        assert_eq!(env.tracking(), ".a|soft\n");
    }

    #[test]
    fn remove_multiple_restores_each_file() {
        let env = TestEnv::new();
        let a = env.write(".a", "a");
        let b = env.write(".b", "b");
        let lnk = env.lnk(quiet_git());
        lnk.add_multiple(&[&a, &b]).unwrap();

        let removed = lnk.remove_multiple(&[".a", ".b", ".a"]).unwrap();

        assert_eq!(removed.len(), 2);
        assert!(!is_symlink(&a) && !is_symlink(&b));
        assert_eq!(fs::read_to_string(&b).unwrap(), "b");
        assert_eq!(env.tracking(), "");
    }

    #[cfg(unix)]
    #[test]
    fn remove_hardlinked_entry() {
        let env = TestEnv::new();
        let file = env.write(".gitconfig", "x");
        let lnk = env
            .builder(quiet_git())
            .link_type(LinkType::Hard)
            .build()
            .unwrap();
        lnk.add(&file).unwrap();

        lnk.remove(".gitconfig").unwrap();

        assert_eq!(fs::read_to_string(&file).unwrap(), "x");
        assert!(!env.repo().join(".gitconfig").exists());
    }

    #[cfg(unix)]
    #[test]
    fn remove_refuses_diverged_hardlink() {
        let env = TestEnv::new();
        let file = env.write(".gitconfig", "x");
        let lnk = env
            .builder(quiet_git())
            .link_type(LinkType::Hard)
            .build()
            .unwrap();
        lnk.add(&file).unwrap();
        // Editors that write-and-rename break the shared inode.
        fs::remove_file(&file).unwrap();
        fs::write(&file, "edited").unwrap();

        let err = lnk.remove(".gitconfig").unwrap_err();

        assert_eq!(err.code(), ErrorCode::FileOperation);
        assert_eq!(fs::read_to_string(&file).unwrap(), "edited");
        assert_eq!(fs::read_to_string(env.repo().join(".gitconfig")).unwrap(), "x");
    }
}
