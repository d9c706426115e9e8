use anyhow::{Context, Result};
use std::net::{IpAddr, SocketAddr};

/// Runtime settings read from the environment (and `.env` when present)
#[derive(Debug, Clone, PartialEq)]
pub struct BackendConfig {
    pub database_url: String,
    pub host: IpAddr,
    pub port: u16,
    pub cors_origin: String,
    pub default_operator: String,
}

impl BackendConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup; unset keys take their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let host = get("HOST", "127.0.0.1");
        let port = get("PORT", "3000");
        let default_operator = get("DEFAULT_OPERATOR", "admin");
        if default_operator.trim().is_empty() {
            anyhow::bail!("DEFAULT_OPERATOR cannot be empty");
        }

        Ok(Self {
            database_url: get("DATABASE_URL", "sqlite:blood_bank.db"),
            host: host.parse().with_context(|| format!("Invalid HOST: '{}'", host))?,
            port: port.parse().with_context(|| format!("Invalid PORT: '{}'", port))?,
            cors_origin: get("CORS_ORIGIN", "http://localhost:8080"),
            default_operator: default_operator.trim().to_string(),
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
