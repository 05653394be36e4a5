//! Command: create or clone a repository.
use anyhow::Result;

use crate::cli::{GlobalOpts, InitOpts};
use crate::engine::{BootstrapOutcome, InitReport};
use crate::logging::Logger;

/// Run the init command.
///
/// # Errors
///
/// Returns an error if the repository already exists, the clone fails, or
/// the clone is not an lnk repository.
pub fn run(global: &GlobalOpts, opts: &InitOpts, log: &Logger) -> Result<()> {
    let lnk = super::open(global, None, log)?;
    let report = match &opts.remote {
        Some(url) => {
            log.stage(&format!("Cloning {url}"));
            if opts.force {
                lnk.init_with_remote_force(url, opts.no_bootstrap)?
            } else {
                lnk.init_with_remote(url)?
            }
        }
        None => {
            log.stage("Initializing repository");
            lnk.init()?
        }
    };
    for line in summary(&report) {
        log.info(&line);
    }
    if let BootstrapOutcome::Failed(reason) = &report.bootstrap {
        log.warn(&format!("bootstrap script failed: {reason}"));
        log.warn("fix the script and run 'lnk bootstrap' again");
    }
    Ok(())
}

fn summary(report: &InitReport) -> Vec<String> {
    let mut lines = vec![match &report.cloned_from {
        Some(url) => format!("cloned {url} into {}", report.repo_path.display()),
        None => format!("initialized empty repository at {}", report.repo_path.display()),
    }];
    match report.bootstrap {
        BootstrapOutcome::Succeeded => lines.push("bootstrap script completed".to_string()),
        BootstrapOutcome::NotFound if report.cloned_from.is_some() => {
            lines.push("no bootstrap script found".to_string());
        }
        _ => {}
    }
    if report.cloned_from.is_some() {
        lines.push("run 'lnk restore' to link the managed files".to_string());
    }
    lines
}
