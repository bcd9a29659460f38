use crate::constants;
use crate::error::{EtlError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Run configuration: the source URL, the local working directory, the
/// object-store slots, and the warehouse connection parameters. Loaded from
/// a TOML file; secrets are taken from the environment, never from disk.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_source_url")]
    pub source_url: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default)]
    pub store: StoreConfig,
    pub database: DbConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_bucket")]
    pub bucket: String,
    #[serde(default = "default_staging_key")]
    pub staging_key: String,
    #[serde(default = "default_transformed_key")]
    pub transformed_key: String,
    /// Base URL of a remote object store. Unset means the local
    /// filesystem store under the data directory.
    #[serde(default)]
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    pub host: String,
    pub user: String,
    #[serde(default)]
    pub password: String,
    pub port: u16,
    pub database: String,
}

fn default_source_url() -> String {
    constants::SOURCE_URL.to_string()
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_bucket() -> String {
    constants::DEFAULT_BUCKET.to_string()
}

fn default_staging_key() -> String {
    constants::STAGING_KEY.to_string()
}

fn default_transformed_key() -> String {
    constants::TRANSFORMED_KEY.to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
            staging_key: default_staging_key(),
            transformed_key: default_transformed_key(),
            endpoint: None,
        }
    }
}

impl PipelineConfig {
    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            EtlError::Config(format!("Failed to read config file '{}': {}", path, e))
        })?;
        let mut config: PipelineConfig = toml::from_str(&content)?;

        if let Ok(url) = std::env::var("FRAUD_ETL_SOURCE_URL") {
            config.source_url = url;
        }
        if let Ok(password) = std::env::var("FRAUD_ETL_DB_PASSWORD") {
            config.database.password = password;
        }
        Ok(config)
    }

    /// Local path of the raw artifact, overwritten each run.
    pub fn raw_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join(constants::RAW_FILE)
    }

    /// Local path of the cleaned artifact, overwritten each run.
    pub fn transformed_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join(constants::TRANSFORMED_FILE)
    }
}
