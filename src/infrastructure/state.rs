//! Application state containing repositories and shared resources

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::domain::{DomainError, ProductRepository};
use crate::infrastructure::SeaOrmProductRepository;
use crate::infrastructure::config::Config;
use crate::infrastructure::persistence::{EntityRegistry, EntityStore};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Entity store every write goes through
    pub store: EntityStore,
    /// Product repository
    pub product_repo: Arc<dyn ProductRepository>,
    /// Actor recorded when a request does not name one
    pub system_actor: String,
}

impl AppState {
    /// Create a new AppState, bootstrapping the entity registry
    pub fn new(db: DatabaseConnection, config: &Config) -> Result<Self, DomainError> {
        let registry = Arc::new(EntityRegistry::bootstrap()?);
        let store = EntityStore::new(db, registry, config.retry.clone());
        let product_repo = Arc::new(SeaOrmProductRepository::new(store.clone()));

        Ok(Self {
            store,
            product_repo,
            system_actor: config.system_actor.clone(),
        })
    }
}
