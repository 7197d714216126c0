// src/config.rs

use std::{env, fmt, net::SocketAddr};

/// Runtime configuration, built once at startup and carried in `AppState`.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. When unset the in-memory store is used.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    /// Shared secret of the external session provider (HS256).
    pub jwt_secret: String,
    pub rust_log: String,
    pub log_dir: String,
    pub bind_addr: SocketAddr,
    /// Username of an admin record created at startup if missing.
    pub admin_username: Option<String>,
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{} must be set", key),
            ConfigError::Invalid { key, value } => write!(f, "{} has invalid value '{}'", key, value),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Reads the configuration from the process environment.
    /// Call `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_secret = non_empty("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let db_max_connections = match non_empty("DB_MAX_CONNECTIONS") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                key: "DB_MAX_CONNECTIONS",
                value,
            })?,
            None => 5,
        };

        let bind_addr = match non_empty("BIND_ADDR") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                key: "BIND_ADDR",
                value,
            })?,
            None => SocketAddr::from(([0, 0, 0, 0], 3000)),
        };

        Ok(Self {
            database_url: non_empty("DATABASE_URL"),
            db_max_connections,
            jwt_secret,
            rust_log: non_empty("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            log_dir: non_empty("LOG_DIR").unwrap_or_else(|| "logs".to_string()),
            bind_addr,
            admin_username: non_empty("ADMIN_USERNAME"),
        })
    }
}
