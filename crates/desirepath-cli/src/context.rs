use anyhow::{Context as _, Result};

use desirepath_client::RemoteStore;
use desirepath_store::{CancelToken, LocalStore, Store};

use crate::args::{Cli, OutputFormat};
use crate::config::{Config, StoreMode};

/// Resolved invocation context: config merged with the global flags,
/// plus the cancellation token handed to every store call.
pub struct AppContext {
    pub config: Config,
    pub format: OutputFormat,
    pub source: String,
    pub cancel: CancelToken,
    db_override: Option<String>,
    base_url_override: Option<String>,
}

impl AppContext {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let config = Config::load()?;

        let format = match cli.format {
            Some(format) => format,
            None if config.output == "json" => OutputFormat::Json,
            None => OutputFormat::Table,
        };
        let source = cli.source.clone().unwrap_or_else(|| config.source.clone());

        Ok(Self {
            config,
            format,
            source,
            cancel: CancelToken::new(),
            db_override: cli.db.clone(),
            base_url_override: cli.base_url.clone(),
        })
    }

    /// Open the configured store. `--base-url` forces the remote store,
    /// `--db` forces a local database file.
    pub fn open_store(&self) -> Result<Box<dyn Store>> {
        if let Some(base_url) = &self.base_url_override {
            return Ok(Box::new(RemoteStore::new(base_url)));
        }
        if let Some(db) = &self.db_override {
            let store = LocalStore::open(std::path::Path::new(db))
                .with_context(|| format!("opening database {}", db))?;
            return Ok(Box::new(store));
        }

        match self.config.mode {
            StoreMode::Remote => {
                let base_url = self
                    .config
                    .remote_url
                    .as_deref()
                    .context("store mode is 'remote' but no remote_url is configured")?;
                Ok(Box::new(RemoteStore::new(base_url)))
            }
            StoreMode::Local => {
                let db_path = self.config.database_path()?;
                let store = LocalStore::open(&db_path)
                    .with_context(|| format!("opening database {}", db_path.display()))?;
                Ok(Box::new(store))
            }
        }
    }
}
