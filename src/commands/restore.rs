//! Commands: restore links and clean up lost entries.
use anyhow::Result;

use crate::cli::{GlobalOpts, RestoreOpts};
use crate::engine::RestoreReport;
use crate::logging::Logger;

/// Run the restore command.
///
/// # Errors
///
/// Returns an error if the repository is not initialized, `--for-host`
/// names an unknown host, or some links could not be restored.
pub fn run(global: &GlobalOpts, opts: &RestoreOpts, log: &Logger) -> Result<()> {
    let lnk = super::open(global, None, log)?;
    log.stage("Restoring links");
    let outcome = match &opts.for_host {
        Some(host) => lnk.restore_symlinks_for_host(host)?,
        None => lnk.restore_symlinks()?,
    };
    report(&outcome, log);
    Ok(())
}

/// Log what a restore pass did.
pub(super) fn report(report: &RestoreReport, log: &Logger) {
    for path in &report.restored {
        log.debug(&format!("linked {}", path.display()));
    }
    for backup in &report.backups {
        log.warn(&format!(
            "moved existing {} to {}",
            backup.original.display(),
            backup.backup.display()
        ));
    }
    if report.is_noop() {
        log.info("all links already in place");
    } else {
        log.info(&format!(
            "restored {}, {} already correct",
            super::files(report.restored.len()),
            report.already_correct
        ));
    }
}

/// Run the cleanup command.
///
/// # Errors
///
/// Returns an error if the tracking file cannot be rewritten or committed.
pub fn cleanup(global: &GlobalOpts, log: &Logger) -> Result<()> {
    let lnk = super::open(global, None, log)?;
    log.stage("Cleaning up tracking entries");
    let removed = lnk.cleanup_invalid_entries()?;
    if removed.is_empty() {
        log.info("no invalid entries");
        return Ok(());
    }
    for entry in &removed {
        log.info(&format!("dropped {}", entry.path));
    }
    log.info(&format!("removed {} invalid entries", removed.len()));
    Ok(())
}
