use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Top-level CLI entry point for lnk.
#[derive(Parser, Debug)]
#[command(
    name = "lnk",
    about = "Git-backed dotfiles manager: move files into a repository and link them back",
    version = crate::version()
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Repository path (default ~/.config/lnk)
    #[arg(long, global = true, value_name = "PATH")]
    pub repo: Option<String>,

    /// Host namespace for host-specific files
    #[arg(long, global = true, value_name = "HOST")]
    pub host: Option<String>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a repository, empty or cloned from a remote
    Init(InitOpts),
    /// Move files into the repository and link them back
    Add(AddOpts),
    /// Stop managing files and move them back into place
    #[command(alias = "remove")]
    Rm(RmOpts),
    /// List managed files
    List(ListOpts),
    /// Show repository and sync status
    Status(JsonOpts),
    /// Commit every change and push it to the remote
    Push(PushOpts),
    /// Pull from the remote and restore links
    Pull,
    /// Recreate missing or wrong links
    Restore(RestoreOpts),
    /// Drop tracking entries whose repository copy is gone
    Cleanup,
    /// Check every managed file and its link
    Validate(JsonOpts),
    /// Run the repository's bootstrap.sh
    Bootstrap,
    /// Generate shell completion scripts
    Completions(CompletionsOpts),
    /// Print version information
    Version,
}

/// Options for the `init` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct InitOpts {
    /// Clone an existing lnk repository from this URL
    #[arg(short, long, value_name = "URL")]
    pub remote: Option<String>,

    /// Replace an existing repository (with --remote)
    #[arg(long, requires = "remote")]
    pub force: bool,

    /// Do not run bootstrap.sh after a forced clone
    #[arg(long, requires = "force")]
    pub no_bootstrap: bool,
}

/// Options for the `add` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct AddOpts {
    /// Files or directories to manage
    #[arg(required = true, value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Add the files inside directories one by one
    #[arg(short, long)]
    pub recursive: bool,

    /// Use hardlinks instead of symlinks
    #[arg(long)]
    pub hard: bool,
}

/// Options for the `rm` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct RmOpts {
    /// Managed files to restore
    #[arg(required = true, value_name = "PATH")]
    pub paths: Vec<PathBuf>,
}

/// Options for the `list` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct ListOpts {
    /// List the files of every host
    #[arg(short, long, conflicts_with = "for_host")]
    pub all: bool,

    /// List the files of another host
    #[arg(long, value_name = "HOST")]
    pub for_host: Option<String>,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

/// `--json` switch shared by the reporting subcommands.
#[derive(Parser, Debug, Clone)]
pub struct JsonOpts {
    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

/// Options for the `push` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct PushOpts {
    /// Commit message
    #[arg(short, long, value_name = "MSG")]
    pub message: Option<String>,
}

/// Options for the `restore` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct RestoreOpts {
    /// Restore the links of another host
    #[arg(long, value_name = "HOST")]
    pub for_host: Option<String>,
}

/// Options for the `completions` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct CompletionsOpts {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

impl Command {
    /// Name used for the log file of this invocation.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Init(_) => "init",
            Self::Add(_) => "add",
            Self::Rm(_) => "rm",
            Self::List(_) => "list",
            Self::Status(_) => "status",
            Self::Push(_) => "push",
            Self::Pull => "pull",
            Self::Restore(_) => "restore",
            Self::Cleanup => "cleanup",
            Self::Validate(_) => "validate",
            Self::Bootstrap => "bootstrap",
            Self::Completions(_) => "completions",
            Self::Version => "version",
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_global_repo_and_host() {
        let cli = Cli::parse_from(["lnk", "--repo", "/srv/dots", "--host", "work", "status"]);
        assert_eq!(cli.global.repo.as_deref(), Some("/srv/dots"));
        assert_eq!(cli.global.host.as_deref(), Some("work"));
        assert!(matches!(cli.command, Command::Status(_)));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["lnk", "list", "--host", "work", "-v"]);
        assert_eq!(cli.global.host.as_deref(), Some("work"));
        assert!(cli.verbose);
    }

    #[test]
    fn parse_init_with_remote() {
        let cli = Cli::parse_from([
            "lnk",
            "init",
            "--remote",
            "https://example.com/dots.git",
            "--force",
            "--no-bootstrap",
        ]);
        assert!(
            matches!(&cli.command, Command::Init(_)),
            "Expected Init command"
        );
        if let Command::Init(opts) = cli.command {
            assert_eq!(opts.remote.as_deref(), Some("https://example.com/dots.git"));
            assert!(opts.force);
            assert!(opts.no_bootstrap);
        }
    }

    #[test]
    fn force_requires_remote() {
        assert!(Cli::try_parse_from(["lnk", "init", "--force"]).is_err());
    }

    #[test]
    fn no_bootstrap_requires_force() {
        assert!(
            Cli::try_parse_from(["lnk", "init", "-r", "https://example.com/d.git", "--no-bootstrap"])
                .is_err()
        );
    }

    #[test]
    fn parse_add_paths_and_flags() {
        let cli = Cli::parse_from(["lnk", "add", "~/.bashrc", "~/.vimrc", "--hard", "-r"]);
        assert!(
            matches!(&cli.command, Command::Add(_)),
            "Expected Add command"
        );
        if let Command::Add(opts) = cli.command {
            assert_eq!(opts.paths.len(), 2);
            assert!(opts.hard);
            assert!(opts.recursive);
        }
    }

    #[test]
    fn add_requires_a_path() {
        assert!(Cli::try_parse_from(["lnk", "add"]).is_err());
    }

    #[test]
    fn parse_remove_alias() {
        let cli = Cli::parse_from(["lnk", "remove", "~/.bashrc"]);
        assert!(matches!(cli.command, Command::Rm(_)));
    }

    #[test]
    fn list_all_conflicts_with_for_host() {
        assert!(Cli::try_parse_from(["lnk", "list", "--all", "--for-host", "work"]).is_err());
    }

    #[test]
    fn parse_push_message() {
        let cli = Cli::parse_from(["lnk", "push", "-m", "update vimrc"]);
        assert!(
            matches!(&cli.command, Command::Push(_)),
            "Expected Push command"
        );
        if let Command::Push(opts) = cli.command {
            assert_eq!(opts.message.as_deref(), Some("update vimrc"));
        }
    }

    #[test]
    fn parse_completions() {
        let cli = Cli::parse_from(["lnk", "completions", "zsh"]);
        assert!(matches!(
            cli.command,
            Command::Completions(CompletionsOpts { shell: Shell::Zsh })
        ));
    }

    #[test]
    fn command_names_match_subcommands() {
        let cli = Cli::parse_from(["lnk", "restore", "--for-host", "work"]);
        assert_eq!(cli.command.name(), "restore");
        assert_eq!(Cli::parse_from(["lnk", "version"]).command.name(), "version");
    }
}
