//! Command: stop managing files.
use anyhow::Result;

use crate::cli::{GlobalOpts, RmOpts};
use crate::logging::Logger;

/// Run the rm command.
///
/// # Errors
///
/// Returns an error if any path is not managed or cannot be restored; a
/// batch is validated completely before anything moves.
pub fn run(global: &GlobalOpts, opts: &RmOpts, log: &Logger) -> Result<()> {
    let lnk = super::open(global, None, log)?;
    match opts.paths.as_slice() {
        [path] => {
            log.stage(&format!("Removing {}", path.display()));
            lnk.remove(path)?;
            log.info(&format!("{} is no longer managed", path.display()));
        }
        paths => {
            log.stage(&format!("Removing {}", super::files(paths.len())));
            let removed = lnk.remove_multiple(paths)?;
            for path in &removed {
                log.debug(&format!("restored {}", path.display()));
            }
            log.info(&format!("{} no longer managed", super::files(removed.len())));
        }
    }
    Ok(())
}
