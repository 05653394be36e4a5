//! Commands: repository status and validation.
use anyhow::Result;

use crate::DEFAULT_HOST_LABEL;
use crate::cli::{GlobalOpts, JsonOpts};
use crate::engine::StatusInfo;
use crate::logging::Logger;

/// Run the status command.
///
/// # Errors
///
/// Returns an error if the repository is not initialized or git status
/// cannot be read.
pub fn run(global: &GlobalOpts, opts: &JsonOpts, log: &Logger) -> Result<()> {
    let lnk = super::open(global, None, log)?;
    let status = lnk.status()?;
    if opts.json {
        return super::write_json(&status);
    }
    for line in render_status(&status) {
        log.info(&line);
    }
    for link in &status.broken_links {
        log.warn(&format!("broken link: {link}"));
    }
    Ok(())
}

/// Run the validate command.
///
/// # Errors
///
/// Returns an error if the repository cannot be read, or if any issue was
/// found.
pub fn validate(global: &GlobalOpts, opts: &JsonOpts, log: &Logger) -> Result<()> {
    let lnk = super::open(global, None, log)?;
    let issues = lnk.validate()?;
    if opts.json {
        super::write_json(&issues)?;
    } else if issues.is_empty() {
        log.info("repository is consistent");
    } else {
        for issue in &issues {
            log.warn(&issue.to_string());
        }
        log.info("run 'lnk restore' to relink files or 'lnk cleanup' to drop lost entries");
    }
    if !issues.is_empty() {
        anyhow::bail!("{} issue(s) found", issues.len());
    }
    Ok(())
}

fn render_status(status: &StatusInfo) -> Vec<String> {
    let git = &status.git;
    let sync = match (&git.remote, git.ahead, git.behind) {
        (None, _, _) => "no remote configured".to_string(),
        (Some(remote), 0, 0) => format!("up to date with {remote}"),
        (Some(remote), ahead, 0) => format!("{ahead} commit(s) ahead of {remote}"),
        (Some(remote), 0, behind) => format!("{behind} commit(s) behind {remote}"),
        (Some(remote), ahead, behind) => {
            format!("{ahead} ahead, {behind} behind {remote}")
        }
    };
    vec![
        format!("repository: {}", status.repo_path.display()),
        format!("host: {}", status.host.as_deref().unwrap_or(DEFAULT_HOST_LABEL)),
        format!("sync: {sync}"),
        format!(
            "working tree: {}",
            if git.dirty { "uncommitted changes" } else { "clean" }
        ),
        format!("managed: {}", super::files(status.managed_files)),
    ]
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::git::GitStatus;

    fn status(git: GitStatus) -> StatusInfo {
        StatusInfo {
            repo_path: PathBuf::from("/home/u/.config/lnk"),
            host: None,
            git,
            managed_files: 2,
            broken_links: Vec::new(),
        }
    }

    #[test]
    fn renders_clean_synced_repo() {
        let lines = render_status(&status(GitStatus {
            dirty: false,
            remote: Some("origin".into()),
            ahead: 0,
            behind: 0,
        }));
        insta::assert_snapshot!(lines.join("\n"), @r"
        repository: /home/u/.config/lnk
        host: general
        sync: up to date with origin
        working tree: clean
        managed: 2 files
        ");
    }

    #[test]
    fn renders_divergence_and_dirty_tree() {
        let lines = render_status(&status(GitStatus {
            dirty: true,
            remote: Some("origin".into()),
            ahead: 1,
            behind: 3,
        }));
        assert_eq!(lines[2], "sync: 1 ahead, 3 behind origin");
        assert_eq!(lines[3], "working tree: uncommitted changes");
    }

    #[test]
    fn renders_missing_remote() {
        let lines = render_status(&status(GitStatus::default()));
        assert_eq!(lines[2], "sync: no remote configured");
    }
}
