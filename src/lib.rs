pub mod config;
pub mod database;
pub mod error;
pub mod fairings;
pub mod fasta;
pub mod models;
pub mod ribo;
pub mod routes;
pub mod schema;
pub mod services;
pub mod state;

use rocket::Config;
use rocket::data::{Limits, ToByteUnit};
use rocket_cors::{AllowedOrigins, CorsOptions};
use std::sync::Arc;

pub use config::AppConfig;
pub use fairings::RequestLogger;
pub use services::{CacheService, DatabaseService, StorageService};
pub use state::AppState;

/// Builds the application from environment configuration.
pub fn create_rocket() -> rocket::Rocket<rocket::Build> {
    let config = AppConfig::from_env();
    build_rocket(config).expect("Failed to initialize ribograph")
}

/// Builds the application for an explicit configuration, creating the
/// database and storage directories it names.
pub fn build_rocket(
    config: AppConfig,
) -> Result<rocket::Rocket<rocket::Build>, Box<dyn std::error::Error>> {
    let database = Arc::new(DatabaseService::new(&config.database_url)?);
    let storage = Arc::new(StorageService::new(&config)?);
    let cache = Arc::new(CacheService::new(&config));

    let upload_limit = config.max_upload_mb.mebibytes();
    let rocket_config = Config {
        port: config.port,
        address: config.host.parse()?,
        limits: Limits::default()
            .limit("file", upload_limit)
            .limit("data-form", upload_limit),
        ..Config::default()
    };

    let state = AppState {
        config,
        cache,
        database,
        storage,
    };

    let cors = CorsOptions::default()
        .allowed_origins(AllowedOrigins::all())
        .to_cors()?;

    Ok(rocket::custom(&rocket_config)
        .manage(state)
        .attach(cors)
        .attach(RequestLogger)
        .mount("/", routes::get_routes()))
}
