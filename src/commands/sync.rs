//! Commands: push and pull.
use anyhow::Result;

use crate::cli::{GlobalOpts, PushOpts};
use crate::logging::Logger;

/// Run the push command.
///
/// # Errors
///
/// Returns an error if nothing can be committed, no remote is configured,
/// or the push fails.
pub fn push(global: &GlobalOpts, opts: &PushOpts, log: &Logger) -> Result<()> {
    let lnk = super::open(global, None, log)?;
    log.stage("Pushing changes");
    let committed = lnk.push(opts.message.as_deref())?;
    if committed {
        log.info("committed and pushed local changes");
    } else {
        log.info("nothing to commit; pushed existing commits");
    }
    Ok(())
}

/// Run the pull command.
///
/// # Errors
///
/// Returns an error if no remote is configured, the pull fails, or links
/// cannot be restored afterwards.
pub fn pull(global: &GlobalOpts, log: &Logger) -> Result<()> {
    let lnk = super::open(global, None, log)?;
    log.stage("Pulling changes");
    let report = lnk.pull()?;
    super::restore::report(&report, log);
    Ok(())
}
