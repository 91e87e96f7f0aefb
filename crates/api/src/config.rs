use std::str::FromStr;

/// Which [`CatalogStore`](procforge_db::CatalogStore) backs the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(StoreBackend::Postgres),
            "memory" | "mem" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown store backend '{other}'")),
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Upper bound on post-shutdown cleanup in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    pub store_backend: StoreBackend,
    /// Required when `store_backend` is Postgres.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    /// Base URL of the workflow engine. Unset means the in-process engine.
    pub gateway_url: Option<String>,
    pub gateway_timeout_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                           | Default                 |
    /// |-----------------------------------|-------------------------|
    /// | `HOST`                            | `0.0.0.0`               |
    /// | `PORT`                            | `3000`                  |
    /// | `CORS_ORIGINS`                    | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`            | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS`           | `30`                    |
    /// | `STORE_BACKEND`                   | `postgres`              |
    /// | `DATABASE_URL`                    | (none)                  |
    /// | `DB_MAX_CONNECTIONS`              | `10`                    |
    /// | `DEPLOYMENT_GATEWAY_URL`          | (none)                  |
    /// | `DEPLOYMENT_GATEWAY_TIMEOUT_SECS` | `15`                    |
    ///
    /// Panics on malformed values so misconfiguration fails at startup.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ServerConfig::from_env`], reading values through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let optional = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let host = var("HOST", "0.0.0.0");

        let port: u16 = var("PORT", "3000")
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = var("CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = var("REQUEST_TIMEOUT_SECS", "30")
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = var("SHUTDOWN_TIMEOUT_SECS", "30")
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let store_backend: StoreBackend = var("STORE_BACKEND", "postgres")
            .parse()
            .unwrap_or_else(|e| panic!("STORE_BACKEND is invalid: {e}"));

        let database_url = optional("DATABASE_URL");
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            panic!("DATABASE_URL must be set unless STORE_BACKEND=memory");
        }

        let db_max_connections: u32 = var("DB_MAX_CONNECTIONS", "10")
            .parse()
            .expect("DB_MAX_CONNECTIONS must be a valid u32");

        let gateway_url = optional("DEPLOYMENT_GATEWAY_URL");

        let gateway_timeout_secs: u64 = var("DEPLOYMENT_GATEWAY_TIMEOUT_SECS", "15")
            .parse()
            .expect("DEPLOYMENT_GATEWAY_TIMEOUT_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            store_backend,
            database_url,
            db_max_connections,
            gateway_url,
            gateway_timeout_secs,
        }
    }
}
