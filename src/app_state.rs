use std::sync::Arc;

use log::info;

use crate::aggregator::TaskAggregator;
use crate::config::{Config, StoreBackend};
use crate::error::TaskResult;
use crate::store::{InMemoryTaskStore, MongoTaskStore, TaskStore};

#[derive(Clone)]
pub struct AppState {
    pub tasks: TaskAggregator,
    pub config: Config,
}

impl AppState {
    pub fn new(store: Arc<dyn TaskStore>, config: Config) -> Self {
        AppState {
            tasks: TaskAggregator::new(store),
            config,
        }
    }

    /// Connects the configured store backend.
    pub async fn init(config: Config) -> TaskResult<Self> {
        let store: Arc<dyn TaskStore> = match &config.store {
            StoreBackend::Mongo { uri, database_name } => {
                info!("Using MongoDB database {}", database_name);
                Arc::new(MongoTaskStore::connect(uri, database_name).await?)
            }
            StoreBackend::Memory => {
                info!("Using in-memory task store");
                Arc::new(InMemoryTaskStore::new())
            }
        };
        Ok(Self::new(store, config))
    }
}
