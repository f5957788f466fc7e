use std::env;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("Unknown STORE_BACKEND '{0}' (expected 'mongo' or 'memory')")]
    UnknownBackend(String),
}

/// Where task documents live.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Mongo { uri: String, database_name: String },
    /// Process-local, lost on restart. For local development.
    Memory,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub store: StoreBackend,
    pub jwt_secret: String,
    pub frontend_origin: String,
    pub bind_address: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = lookup("STORE_BACKEND").unwrap_or_else(|| "mongo".to_string());
        let store = match backend.to_lowercase().as_str() {
            "mongo" | "mongodb" => StoreBackend::Mongo {
                uri: lookup("MONGO_URI").ok_or(ConfigError::Missing("MONGO_URI"))?,
                database_name: lookup("DATABASE_NAME").unwrap_or_else(|| "todo_db".to_string()),
            },
            "memory" => StoreBackend::Memory,
            _ => return Err(ConfigError::UnknownBackend(backend)),
        };

        Ok(Self {
            store,
            jwt_secret: lookup("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?,
            frontend_origin: lookup("FRONTEND_ORIGIN")
                .unwrap_or_else(|| "http://localhost:3000".to_string()),
            bind_address: lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
        })
    }
}
