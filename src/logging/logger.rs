//! Presentation facade used by command handlers.
use std::path::PathBuf;

use super::STAGE_TARGET;
use super::utils::log_file_path;

/// Console and log-file output for one command invocation.
///
/// Every message goes through [`tracing`], so it reaches the console layer
/// and the log file at `$XDG_CACHE_HOME/lnk/<command>.log` installed by
/// [`init_subscriber`](super::init_subscriber).
#[derive(Debug)]
pub struct Logger {
    log_file: Option<PathBuf>,
}

impl Logger {
    /// Create a logger for `command`.
    ///
    /// Only remembers the log file path; the file itself is created by
    /// [`init_subscriber`](super::init_subscriber).
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self {
            log_file: log_file_path(command),
        }
    }

    /// Path of the log file, if the cache directory is usable.
    #[must_use]
    pub const fn log_path(&self) -> Option<&PathBuf> {
        self.log_file.as_ref()
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Log a stage header.
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE_TARGET, "{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Log a debug message (console only with `--verbose`; always in the
    /// log file).
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// Report a failed command: the error, its causes and its suggestion.
    pub fn failure(&self, err: &anyhow::Error) {
        if let Some(lnk_err) = err.downcast_ref::<crate::LnkError>() {
            for (i, line) in lnk_err.render_with_suggestion().lines().enumerate() {
                if i == 0 {
                    self.error(line);
                } else {
                    self.info(line);
                }
            }
        } else {
            self.error(&format!("{err:#}"));
        }
        if let Some(path) = &self.log_file {
            self.info(&format!("\x1b[2mlog: {}\x1b[0m", path.display()));
        }
    }
}
