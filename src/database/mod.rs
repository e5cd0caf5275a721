//! Database module providing organized access to all database operations
//!
//! - `connection`: connection pool, pragmas and embedded migrations
//! - `projects`: project records and their cascading deletion
//! - `experiments`: experiment records, digest lookups and reference links
//! - `references`: sequence reference records
//! - `service`: `DatabaseService`, the facade handed to routes and services

pub mod connection;
pub mod experiments;
pub mod projects;
pub mod references;
pub mod service;

pub use connection::{DbConnection, DbPool, MIGRATIONS};
pub use service::DatabaseService;

pub use experiments::ExperimentOperations;
pub use projects::ProjectOperations;
pub use references::ReferenceOperations;
