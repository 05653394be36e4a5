//! Dropping tracking entries whose repository copy is gone.

use super::Lnk;
use crate::error::Result;
use crate::tracking::TrackedEntry;

impl Lnk {
    /// Remove every entry of the active host whose repository copy no
    /// longer exists, rewriting the tracking file once and committing it.
    ///
    /// Returns the removed entries; an empty result means nothing changed.
    ///
    /// # Errors
    ///
    /// `REPO_NOT_INITIALIZED`, or failures writing, staging or committing
    /// the tracking file (rolled back).
    pub fn cleanup_invalid_entries(&self) -> Result<Vec<TrackedEntry>> {
        self.ensure_initialized()?;
        let _lock = self.lock()?;
        let stale: Vec<String> = self
            .read_tracking()?
            .into_iter()
            .filter(|e| {
                let repo_file = self.repo_path_for_key(&e.path);
                !self.fs.exists(&repo_file) && !self.fs.is_symlink(&repo_file)
            })
            .map(|e| e.path)
            .collect();
        if stale.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<&str> = stale.iter().map(String::as_str).collect();
        let invalid = self.transact(|log| {
            let removed = self.drop_entries(log, &keys)?;
            self.stage(log, vec![self.tracking_rel()])?;
            self.commit(&format!("lnk: 清理无效条目 {} 项", removed.len()))?;
            Ok(removed)
        })?;

        for entry in &invalid {
            tracing::info!(path = %entry.path, "removed invalid entry");
        }
        Ok(invalid)
    }
}
