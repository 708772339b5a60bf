//! Process configuration read from the environment (and `.env`).

use std::env;

use anyhow::{bail, Context};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageDriver {
    Local { dir: String },
    Remote { url: String, bucket: String, key: String },
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub driver: StorageDriver,
    /// Base URL that local files are served from.
    pub public_url: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub storage: StorageConfig,
    pub cors_origins: Vec<String>,
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

impl StorageConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let driver = match var_or("STORAGE_DRIVER", "local").to_lowercase().as_str() {
            "local" => StorageDriver::Local {
                dir: var_or("STORAGE_LOCAL_DIR", "./uploads"),
            },
            "remote" => StorageDriver::Remote {
                url: env::var("STORAGE_REMOTE_URL").context("STORAGE_REMOTE_URL must be set for remote storage")?,
                bucket: var_or("STORAGE_REMOTE_BUCKET", "portal"),
                key: env::var("STORAGE_REMOTE_KEY").context("STORAGE_REMOTE_KEY must be set for remote storage")?,
            },
            other => bail!("Unknown STORAGE_DRIVER '{}', expected local or remote", other),
        };

        Ok(Self {
            driver,
            public_url: var_or("STORAGE_PUBLIC_URL", "http://127.0.0.1:8080/uploads"),
        })
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let port = var_or("PORT", "8080")
            .parse::<u16>()
            .context("PORT must be a valid port number")?;
        let cors_origins = parse_origins(&var_or("CORS_ORIGINS", "http://localhost:3000,http://localhost:5173"));

        Ok(Self {
            host: var_or("HOST", "0.0.0.0"),
            port,
            database_url,
            storage: StorageConfig::from_env()?,
            cors_origins,
        })
    }
}

pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
