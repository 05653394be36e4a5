//! Command: list managed files.
use std::collections::BTreeMap;

use anyhow::Result;

use crate::DEFAULT_HOST_LABEL;
use crate::cli::{GlobalOpts, ListOpts};
use crate::logging::Logger;
use crate::tracking::TrackedEntry;

/// Run the list command.
///
/// # Errors
///
/// Returns an error if the repository is not initialized, a tracking file
/// cannot be read, or `--for-host` names a host without a tracking file.
pub fn run(global: &GlobalOpts, opts: &ListOpts, log: &Logger) -> Result<()> {
    let lnk = super::open(global, None, log)?;

    if opts.all {
        let groups = lnk.list_all()?;
        if opts.json {
            return super::write_json(&groups);
        }
        for line in render_groups(&groups) {
            log.info(&line);
        }
        return Ok(());
    }

    let (label, entries) = match &opts.for_host {
        Some(host) => (host.clone(), lnk.list_by_host(host)?),
        None => (
            lnk.host().unwrap_or(DEFAULT_HOST_LABEL).to_string(),
            lnk.list()?,
        ),
    };
    if opts.json {
        return super::write_json(&entries);
    }
    if entries.is_empty() {
        log.info(&format!("no files managed for host {label}"));
        return Ok(());
    }
    log.stage(&format!("{label} ({})", super::files(entries.len())));
    for entry in &entries {
        log.info(&render_entry(entry));
    }
    Ok(())
}

fn render_entry(entry: &TrackedEntry) -> String {
    format!("{} [{}]", entry.path, entry.link_type)
}

/// Text lines for `list --all`: the default host first, then the others by
/// name.
fn render_groups(groups: &BTreeMap<String, Vec<TrackedEntry>>) -> Vec<String> {
    let total: usize = groups.values().map(Vec::len).sum();
    if total == 0 {
        return vec!["no files managed".to_string()];
    }
    let mut lines = vec![format!("{} managed", super::files(total))];
    let default = groups.get_key_value(DEFAULT_HOST_LABEL).into_iter();
    let others = groups.iter().filter(|(host, _)| *host != DEFAULT_HOST_LABEL);
    for (host, entries) in default.chain(others) {
        if entries.is_empty() {
            continue;
        }
        lines.push(String::new());
        lines.push(format!("{host} ({}):", super::files(entries.len())));
        lines.extend(entries.iter().map(|e| format!("  {}", render_entry(e))));
    }
    lines
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::tracking::LinkType;

    #[test]
    fn groups_put_default_host_first() {
        let mut groups = BTreeMap::new();
        groups.insert(
            "alpha".to_string(),
            vec![TrackedEntry::new(".zshrc", LinkType::Soft)],
        );
        groups.insert(
            DEFAULT_HOST_LABEL.to_string(),
            vec![
                TrackedEntry::new(".bashrc", LinkType::Soft),
                TrackedEntry::new(".gitconfig", LinkType::Hard),
            ],
        );

        insta::assert_snapshot!(render_groups(&groups).join("\n"), @r"
        3 files managed

        general (2 files):
          .bashrc [soft]
          .gitconfig [hard]

        alpha (1 file):
          .zshrc [soft]
        ");
    }

    #[test]
    fn groups_skip_empty_hosts() {
        let mut groups = BTreeMap::new();
        groups.insert(DEFAULT_HOST_LABEL.to_string(), Vec::new());
        groups.insert(
            "work".to_string(),
            vec![TrackedEntry::new(".vimrc", LinkType::Soft)],
        );
        let lines = render_groups(&groups);
        assert!(!lines.iter().any(|l| l.starts_with("general")));
        assert!(lines.contains(&"work (1 file):".to_string()));
    }

    #[test]
    fn empty_groups_say_so() {
        assert_eq!(render_groups(&BTreeMap::new()), vec!["no files managed"]);
    }
}
