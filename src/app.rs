use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::Cli;
use crate::config::Config;
use crate::error::{ExoError, Result};
use crate::search::SearchEngine;
use crate::storage::SqliteListingStore;

pub struct AppContext {
    pub config_path: Option<PathBuf>,
    pub config: Config,
    pub db_path: PathBuf,
    pub store: Arc<SqliteListingStore>,
    pub engine: SearchEngine,
    pub robot_mode: bool,
}

impl AppContext {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let config = Config::load(cli.config.as_deref())?;
        let config_path = cli.config.clone().or_else(Config::global_path);

        let db_path = match cli.db.clone().or_else(|| config.store.database.clone()) {
            Some(path) => path,
            None => default_db_path()?,
        };
        let store = Arc::new(SqliteListingStore::open(&db_path)?);
        let engine = SearchEngine::new(store.clone(), &config);

        Ok(Self {
            config_path,
            config,
            db_path,
            store,
            engine,
            robot_mode: cli.robot,
        })
    }
}

fn default_db_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
        .ok_or_else(|| ExoError::MissingConfig("data directory not found".to_string()))?;
    Ok(data_dir.join("exo-search").join("listings.db"))
}
