// ⚙️ Configuration - command line flags with environment fallbacks

use crate::catalog::Catalog;
use crate::store::VoteStore;
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

/// Where the votes live and which Pokemon can be voted on
#[derive(Args, Debug, Clone)]
pub struct StoreConfig {
    /// SQLite database file holding the vote counters
    #[arg(long = "db", env = "POKEMON_VOTE_DB", default_value = "pokemon_votes.db")]
    pub db_path: PathBuf,

    /// Optional CSV catalog (`id,name,image,type`); the built-in ten Pokemon otherwise
    #[arg(long, env = "POKEMON_VOTE_CATALOG")]
    pub catalog: Option<PathBuf>,

    /// How long a write waits on a locked database before failing
    #[arg(long, env = "POKEMON_VOTE_BUSY_TIMEOUT_MS", default_value_t = 5000)]
    pub busy_timeout_ms: u64,
}

impl StoreConfig {
    pub fn load_catalog(&self) -> Result<Catalog> {
        match &self.catalog {
            Some(path) => Catalog::load_csv(path),
            None => Ok(Catalog::builtin()),
        }
    }

    /// Open and initialize the store for `catalog`
    pub fn open_store(&self, catalog: &Catalog) -> Result<VoteStore> {
        let store = VoteStore::open_with_timeout(
            &self.db_path,
            catalog,
            Duration::from_millis(self.busy_timeout_ms),
        )
        .with_context(|| format!("Failed to open vote database {:?}", self.db_path))?;

        store
            .initialize()
            .context("Failed to initialize vote database")?;

        Ok(store)
    }
}
