use log::info;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub host: String,
    pub data_dir: String,
    pub database_url: String,
    pub ribo_dir: String,
    pub reference_dir: String,
    pub staging_dir: String,
    pub api_cache_ttl_secs: u64,
    pub ribo_cache_ttl_secs: u64,
    pub sequence_cache_ttl_secs: u64,
    pub max_upload_mb: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            host: "127.0.0.1".to_string(),
            data_dir: "./data".to_string(),
            database_url: "./data/ribograph.db".to_string(),
            ribo_dir: "./data/ribo".to_string(),
            reference_dir: "./data/references".to_string(),
            staging_dir: default_staging_dir(),
            api_cache_ttl_secs: 600,
            ribo_cache_ttl_secs: 300,
            sequence_cache_ttl_secs: 3600,
            max_upload_mb: 2048,
        }
    }
}

fn default_staging_dir() -> String {
    env::temp_dir()
        .join("ribograph")
        .to_string_lossy()
        .to_string()
}

impl AppConfig {
    /// Builds a configuration rooted at `data_dir`, deriving every storage
    /// location from it.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir: PathBuf = data_dir.into();
        Self {
            database_url: data_dir.join("ribograph.db").to_string_lossy().to_string(),
            ribo_dir: data_dir.join("ribo").to_string_lossy().to_string(),
            reference_dir: data_dir.join("references").to_string_lossy().to_string(),
            staging_dir: data_dir.join("staging").to_string_lossy().to_string(),
            data_dir: data_dir.to_string_lossy().to_string(),
            ..Self::default()
        }
    }

    pub fn from_env() -> Self {
        let port = env::var("RIBOGRAPH_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u16>()
            .unwrap_or(8000);

        let host = env::var("RIBOGRAPH_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let data_dir = env::var("RIBOGRAPH_DATA_DIR").unwrap_or_else(|_| "./data".to_string());

        let database_url = env::var("RIBOGRAPH_DATABASE_URL")
            .unwrap_or_else(|_| format!("{data_dir}/ribograph.db"));

        let ribo_dir =
            env::var("RIBOGRAPH_RIBO_DIR").unwrap_or_else(|_| format!("{data_dir}/ribo"));

        let reference_dir = env::var("RIBOGRAPH_REFERENCE_DIR")
            .unwrap_or_else(|_| format!("{data_dir}/references"));

        let staging_dir =
            env::var("RIBOGRAPH_STAGING_DIR").unwrap_or_else(|_| default_staging_dir());

        let api_cache_ttl_secs = parse_u64_var("RIBOGRAPH_API_CACHE_TTL_SECS", 600);
        let ribo_cache_ttl_secs = parse_u64_var("RIBOGRAPH_RIBO_CACHE_TTL_SECS", 300);
        let sequence_cache_ttl_secs = parse_u64_var("RIBOGRAPH_SEQUENCE_CACHE_TTL_SECS", 3600);
        let max_upload_mb = parse_u64_var("RIBOGRAPH_MAX_UPLOAD_MB", 2048);

        info!("Configuration loaded:");
        info!("  Host: {host}");
        info!("  Port: {port}");
        info!("  Data Directory: {data_dir}");
        info!("  Database URL: {database_url}");
        info!("  Ribo Directory: {ribo_dir}");
        info!("  Reference Directory: {reference_dir}");
        info!("  Staging Directory: {staging_dir}");
        info!("  API Cache TTL: {api_cache_ttl_secs} seconds");
        info!("  Ribo Cache TTL: {ribo_cache_ttl_secs} seconds");
        info!("  Sequence Cache TTL: {sequence_cache_ttl_secs} seconds");
        info!("  Max Upload Size: {max_upload_mb} MB");

        Self {
            port,
            host,
            data_dir,
            database_url,
            ribo_dir,
            reference_dir,
            staging_dir,
            api_cache_ttl_secs,
            ribo_cache_ttl_secs,
            sequence_cache_ttl_secs,
            max_upload_mb,
        }
    }
}

fn parse_u64_var(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.data_dir, "./data");
        assert_eq!(config.database_url, "./data/ribograph.db");
        assert_eq!(config.api_cache_ttl_secs, 600);
        assert_eq!(config.ribo_cache_ttl_secs, 300);
        assert_eq!(config.sequence_cache_ttl_secs, 3600);
    }

    #[test]
    fn test_with_data_dir_derives_paths() {
        let config = AppConfig::with_data_dir("/srv/ribograph");
        assert_eq!(config.database_url, "/srv/ribograph/ribograph.db");
        assert_eq!(config.ribo_dir, "/srv/ribograph/ribo");
        assert_eq!(config.reference_dir, "/srv/ribograph/references");
        assert_eq!(config.staging_dir, "/srv/ribograph/staging");
        assert_eq!(config.port, 8000);
    }

    #[test]
    fn test_config_parsing() {
        assert_eq!("8080".parse::<u16>().unwrap_or(8000), 8080);
        assert_eq!("invalid".parse::<u16>().unwrap_or(8000), 8000);
        assert_eq!(parse_u64_var("RIBOGRAPH_SURELY_UNSET_VARIABLE", 42), 42);
    }
}
