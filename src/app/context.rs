use std::sync::Arc;

use crate::app::error::{GatorError, Result};
use crate::config::Config;
use crate::domain::User;
use crate::fetcher::{FeedFetcher, HttpFetcher};
use crate::store::{SqliteStore, Store};

/// Everything a command needs: the loaded config, the store and the fetcher.
pub struct AppContext {
    pub config: Config,
    pub store: Arc<dyn Store + Send + Sync>,
    pub fetcher: Arc<dyn FeedFetcher + Send + Sync>,
}

impl AppContext {
    /// Open the database named in `config` and build an HTTP fetcher.
    pub fn new(config: Config) -> Result<Self> {
        let store: Arc<dyn Store + Send + Sync> = Arc::new(SqliteStore::open_url(&config.db_url)?);
        let fetcher: Arc<dyn FeedFetcher + Send + Sync> = Arc::new(HttpFetcher::new()?);

        Ok(Self::with_parts(config, store, fetcher))
    }

    pub fn with_parts(
        config: Config,
        store: Arc<dyn Store + Send + Sync>,
        fetcher: Arc<dyn FeedFetcher + Send + Sync>,
    ) -> Self {
        Self {
            config,
            store,
            fetcher,
        }
    }

    /// Resolve the logged-in user named in the config.
    pub fn current_user(&self) -> Result<User> {
        let name = self
            .config
            .current_user_name
            .as_deref()
            .ok_or_else(|| GatorError::NotFound("no user is logged in".to_string()))?;

        self.store
            .get_user_by_name(name)?
            .ok_or_else(|| GatorError::NotFound(format!("user with name {} does not exist", name)))
    }
}
