use crate::config::AppConfig;
use crate::services::{CacheService, DatabaseService, StorageService};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub cache: Arc<CacheService>,
    pub database: Arc<DatabaseService>,
    pub storage: Arc<StorageService>,
}
