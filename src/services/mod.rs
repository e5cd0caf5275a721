pub mod analytics;
pub mod auth;
pub mod cache;
pub mod experiments;
pub mod projects;
pub mod references;
pub mod storage;

pub use crate::database::DatabaseService;
pub use auth::AuthService;
pub use cache::CacheService;
pub use experiments::ExperimentService;
pub use projects::ProjectService;
pub use references::ReferenceService;
pub use storage::StorageService;
