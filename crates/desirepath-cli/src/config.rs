use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreMode {
    #[default]
    Local,
    Remote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database file; relative paths are rooted at the data directory.
    pub db_path: Option<PathBuf>,

    /// Source tag recorded with events when no override is given.
    pub source: String,

    /// Canonical tool names used by `suggest` and transcript analysis.
    pub known_tools: Vec<String>,

    /// Default output format: table or json.
    pub output: String,

    pub mode: StoreMode,

    /// Base URL of the remote store; required when mode = "remote".
    pub remote_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: None,
            source: "claude-code".to_string(),
            known_tools: [
                "Read", "Write", "Edit", "Bash", "Glob", "Grep", "WebFetch", "WebSearch", "Task",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            output: "table".to_string(),
            mode: StoreMode::Local,
            remote_url: None,
        }
    }
}

impl Config {
    /// Effective configuration for this invocation: the config file when
    /// one exists, built-in defaults otherwise. A present-but-broken file
    /// is an error; silently ignoring it would send events to the wrong
    /// store.
    pub fn load() -> Result<Self> {
        Self::read(&Self::path()?)
    }

    pub fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    pub fn read(path: &Path) -> Result<Self> {
        let config = match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str::<Config>(&content)
                .with_context(|| format!("parsing config {}", path.display()))?,
            Err(err) if err.kind() == ErrorKind::NotFound => Self::default(),
            Err(err) => {
                return Err(err).with_context(|| format!("reading config {}", path.display()));
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).context("serializing config")?;
        std::fs::write(path, content)
            .with_context(|| format!("writing config {}", path.display()))
    }

    fn validate(&self) -> Result<()> {
        if !matches!(self.output.as_str(), "table" | "json") {
            bail!(
                "config field 'output' must be \"table\" or \"json\", got \"{}\"",
                self.output
            );
        }
        if self.mode == StoreMode::Remote && self.remote_url.is_none() {
            bail!("config field 'remote_url' is required when mode = \"remote\"");
        }
        Ok(())
    }

    /// Absolute database path, rooted at the data directory unless the
    /// configured path is already absolute.
    pub fn database_path(&self) -> Result<PathBuf> {
        let base = data_dir()?;
        Ok(match &self.db_path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => base.join(path),
            None => base.join("desires.db"),
        })
    }
}

/// Where desirepath keeps its state. `DESIREPATH_PATH` wins when set (so
/// tests and multi-profile setups can redirect everything), then the
/// platform data directory, then a dot directory under `$HOME`.
pub fn data_dir() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("DESIREPATH_PATH") {
        return Ok(home_relative(&path));
    }
    if let Some(dir) = dirs::data_dir() {
        return Ok(dir.join("desirepath"));
    }
    match std::env::var_os("HOME") {
        Some(home) => Ok(PathBuf::from(home).join(".desirepath")),
        None => bail!("cannot locate a data directory: neither DESIREPATH_PATH nor HOME is set"),
    }
}

/// Expand a leading tilde so `DESIREPATH_PATH=~/traces` works even when
/// the shell passed it through unexpanded.
fn home_relative(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), std::env::var_os("HOME")) {
        (Some(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => PathBuf::from(path),
    }
}
