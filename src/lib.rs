//! Git-backed dotfiles manager.
//!
//! `lnk` moves configuration files into a git repository and links them
//! back into place, tracking which files are managed per host.  Every
//! mutating operation is transactional: a failed step unwinds the completed
//! ones before the error is returned.
//!
//! The public API is organised into three layers:
//!
//! - **[`engine`]**: the [`Lnk`] orchestrator and its operations
//! - **[`fs`], [`git`], [`exec`]**: collaborator traits with system
//!   implementations, replaceable in tests
//! - **[`commands`]**: subcommand handlers behind the `lnk` binary
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod exec;
pub mod fs;
pub mod git;
pub mod lock;
pub mod logging;
pub mod rollback;
pub mod tracking;

pub use engine::{
    BACKUP_SUFFIX, BOOTSTRAP_SCRIPT, DEFAULT_HOST_LABEL, EXTERNAL_DIR, HOST_DIR_SUFFIX, Lnk,
    LnkBuilder, TRACK_FILE,
};
pub use error::{ErrorCode, LnkError, Result, Severity};
pub use tracking::{LinkType, TrackedEntry};

/// Version string: `LNK_VERSION` at build time, else the package version.
#[must_use]
pub fn version() -> &'static str {
    option_env!("LNK_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
}
