//! Command: move files into the repository.
use anyhow::Result;

use crate::cli::{AddOpts, GlobalOpts};
use crate::logging::Logger;
use crate::tracking::LinkType;

/// Run the add command.
///
/// One path goes through a single add (directories are consolidated into
/// one entry); several paths are added as one batch; `--recursive` adds the
/// files inside directories individually.
///
/// # Errors
///
/// Returns an error if the repository is not initialized or any add fails.
/// A failed add leaves no partial state behind.
pub fn run(global: &GlobalOpts, opts: &AddOpts, log: &Logger) -> Result<()> {
    let link_type = opts.hard.then_some(LinkType::Hard);
    let lnk = super::open(global, link_type, log)?;

    if opts.recursive {
        log.stage("Adding files recursively");
        let added = lnk.add_recursive_with_progress(&opts.paths, |current, total, path| {
            log.debug(&format!("({current}/{total}) {}", path.display()));
        })?;
        log.info(&format!("added {}", super::files(added.len())));
        return Ok(());
    }

    match opts.paths.as_slice() {
        [path] => {
            log.stage(&format!("Adding {}", path.display()));
            lnk.add(path)?;
            log.info(&format!("now managing {} ({})", path.display(), lnk.link_type()));
        }
        paths => {
            log.stage(&format!("Adding {}", super::files(paths.len())));
            let added = lnk.add_multiple(paths)?;
            for path in &added {
                log.debug(&format!("added {}", path.display()));
            }
            log.info(&format!("now managing {} more", super::files(added.len())));
        }
    }
    Ok(())
}
