//! Layered settings.
//!
//! Resolution order, later layers winning:
//!
//! ```text
//! built-in defaults   repo = ~/.config/lnk, no host, soft links
//! config file         $XDG_CONFIG_HOME/lnk.toml (default ~/.config/lnk.toml)
//! environment         LNK_REPO, LNK_HOST, LNK_LINK_TYPE
//! command line        --repo, --host, --hard
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::engine::LnkBuilder;
use crate::fs::expand_home;
use crate::tracking::LinkType;

/// Name of the config file inside the config directory.
pub const CONFIG_FILE: &str = "lnk.toml";

/// Contents of `lnk.toml`.  Every key is optional.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Repository path; `~/` is expanded.
    pub repo: Option<String>,
    /// Host namespace.
    pub host: Option<String>,
    /// Default link type for `add`.
    pub link_type: Option<LinkType>,
}

/// One layer of overrides (environment or command line).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Overrides {
    /// Repository path.
    pub repo: Option<String>,
    /// Host namespace.
    pub host: Option<String>,
    /// Link type.
    pub link_type: Option<LinkType>,
}

impl Overrides {
    /// Read `LNK_REPO`, `LNK_HOST` and `LNK_LINK_TYPE` from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if `LNK_LINK_TYPE` is set to something other than
    /// `soft` or `hard`.
    pub fn from_env() -> Result<Self> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        let link_type = var("LNK_LINK_TYPE")
            .map(|v| v.parse::<LinkType>())
            .transpose()
            .map_err(anyhow::Error::msg)
            .context("invalid LNK_LINK_TYPE")?;
        Ok(Self {
            repo: var("LNK_REPO"),
            host: var("LNK_HOST"),
            link_type,
        })
    }
}

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// User home directory.
    pub home: PathBuf,
    /// Repository path.
    pub repo: PathBuf,
    /// Host namespace, `None` for the default one.
    pub host: Option<String>,
    /// Default link type.
    pub link_type: LinkType,
}

impl Settings {
    /// Merge the layers.  Pure; does not touch the environment.
    #[must_use]
    pub fn resolve(home: PathBuf, file: FileConfig, env: &Overrides, cli: &Overrides) -> Self {
        let repo = cli
            .repo
            .clone()
            .or_else(|| env.repo.clone())
            .or(file.repo)
            .map_or_else(|| default_repo(&home), |r| expand_home(&r, &home));
        let host = cli
            .host
            .clone()
            .or_else(|| env.host.clone())
            .or(file.host)
            .filter(|h| !h.is_empty());
        let link_type = cli
            .link_type
            .or(env.link_type)
            .or(file.link_type)
            .unwrap_or_default();
        Self {
            home,
            repo,
            host,
            link_type,
        }
    }

    /// Resolve settings from the real environment and config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory is unknown, the config file is
    /// malformed, or an environment override is invalid.
    pub fn load(cli: &Overrides) -> Result<Self> {
        let home = home_dir().context("cannot determine home directory (HOME is not set)")?;
        let file = load_file(&config_file_path(&home))?;
        let env = Overrides::from_env()?;
        Ok(Self::resolve(home, file, &env, cli))
    }

    /// Engine builder preconfigured with these settings.
    #[must_use]
    pub fn builder(&self) -> LnkBuilder {
        let builder = LnkBuilder::new()
            .home(&self.home)
            .repo_path(&self.repo)
            .link_type(self.link_type);
        match &self.host {
            Some(host) => builder.host(host),
            None => builder,
        }
    }
}

/// Default repository location under `home`.
#[must_use]
pub fn default_repo(home: &Path) -> PathBuf {
    home.join(".config").join("lnk")
}

/// Home directory from `HOME`, falling back to `USERPROFILE`.
#[must_use]
pub fn home_dir() -> Option<PathBuf> {
    ["HOME", "USERPROFILE"]
        .iter()
        .filter_map(|name| std::env::var_os(name))
        .find(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// `$XDG_CONFIG_HOME/lnk.toml`, or `~/.config/lnk.toml`.
#[must_use]
pub fn config_file_path(home: &Path) -> PathBuf {
    std::env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map_or_else(|| home.join(".config"), PathBuf::from)
        .join(CONFIG_FILE)
}

/// Load a config file.  A missing file is an empty config.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_file(path: &Path) -> Result<FileConfig> {
    if !path.exists() {
        return Ok(FileConfig::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))
}
