//! Subcommand handlers.
//!
//! Each handler resolves settings, builds an [`Lnk`], calls one engine
//! operation and reports the outcome through the [`Logger`].  Errors cross
//! this boundary as [`anyhow::Error`]; `main` renders them.

pub mod add;
pub mod bootstrap;
pub mod completions;
pub mod init;
pub mod list;
pub mod remove;
pub mod restore;
pub mod status;
pub mod sync;
pub mod version;

use std::io::Write as _;

use anyhow::{Context as _, Result};
use serde::Serialize;

use crate::Lnk;
use crate::cli::GlobalOpts;
use crate::config::{Overrides, Settings};
use crate::logging::Logger;
use crate::tracking::LinkType;

/// Command-line layer of the settings.
fn overrides(global: &GlobalOpts, link_type: Option<LinkType>) -> Overrides {
    Overrides {
        repo: global.repo.clone(),
        host: global.host.clone(),
        link_type,
    }
}

/// Resolve settings and build the engine.
///
/// # Errors
///
/// Returns an error if settings cannot be loaded or the host name is invalid.
pub fn open(global: &GlobalOpts, link_type: Option<LinkType>, log: &Logger) -> Result<Lnk> {
    let settings = Settings::load(&overrides(global, link_type))?;
    log.debug(&format!("repository: {}", settings.repo.display()));
    if let Some(host) = &settings.host {
        log.debug(&format!("host: {host}"));
    }
    Ok(settings.builder().build()?)
}

/// Write `value` to stdout as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn write_json<T: Serialize>(value: &T) -> Result<()> {
    let mut out = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value).context("failed to serialize output")?;
    writeln!(out).context("failed to write output")?;
    Ok(())
}

/// `"1 file"` / `"3 files"`.
fn files(n: usize) -> String {
    if n == 1 {
        "1 file".to_string()
    } else {
        format!("{n} files")
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn overrides_carry_global_flags() {
        let global = GlobalOpts {
            repo: Some("/srv/dots".into()),
            host: Some("work".into()),
        };
        let o = overrides(&global, Some(LinkType::Hard));
        assert_eq!(o.repo.as_deref(), Some("/srv/dots"));
        assert_eq!(o.host.as_deref(), Some("work"));
        assert_eq!(o.link_type, Some(LinkType::Hard));
    }

    #[test]
    fn files_pluralizes() {
        assert_eq!(files(0), "0 files");
        assert_eq!(files(1), "1 file");
        assert_eq!(files(2), "2 files");
    }
}
