//! Command: run the repository's bootstrap script.
use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::logging::Logger;

/// Run the bootstrap command.
///
/// # Errors
///
/// Returns an error if the repository has no bootstrap script or the script
/// fails.
pub fn run(global: &GlobalOpts, log: &Logger) -> Result<()> {
    let lnk = super::open(global, None, log)?;
    let script = lnk.find_bootstrap_script()?;
    log.stage(&format!("Running {}", script.display()));
    lnk.run_bootstrap_script()?;
    log.info("bootstrap script completed");
    Ok(())
}
