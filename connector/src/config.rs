//! Configuration loading
//!
//! Everything is resolved once at startup and passed by reference afterwards.
//! Database settings come from the environment:
//!
//! 1. `DATABASE_URL` if set (managed Postgres or remote DSN)
//! 2. Otherwise `DB_HOST` / `DB_PORT` / `DB_NAME` / `DB_USER` / `DB_PASSWORD`
//!
//! `DB_SSLMODE` applies to both and defaults to `require`.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use sqlx::postgres::{PgConnectOptions, PgSslMode};
use thiserror::Error;

const DEFAULT_DB_PORT: u16 = 5432;
const DEFAULT_SSL_MODE: &str = "require";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "Missing required database environment variables: {}. Set DATABASE_URL or the DB_* variables.",
        .0.join(", ")
    )]
    Missing(Vec<&'static str>),

    #[error("Invalid DATABASE_URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid DB_PORT '{0}': expected a port number")]
    InvalidPort(String),

    #[error("Invalid DB_SSLMODE '{0}'")]
    InvalidSslMode(String),
}

/// Where the connection settings came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbSource {
    /// A single `DATABASE_URL`
    Url,
    /// Discrete `DB_*` variables
    Discrete,
}

/// Resolved database connection settings
#[derive(Clone)]
pub struct DbConfig {
    source: DbSource,
    options: PgConnectOptions,
}

impl DbConfig {
    /// Resolve settings from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve settings through an arbitrary variable lookup
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let ssl_raw = get("DB_SSLMODE").unwrap_or_else(|| DEFAULT_SSL_MODE.to_string());
        let ssl_mode = PgSslMode::from_str(&ssl_raw)
            .map_err(|_| ConfigError::InvalidSslMode(ssl_raw.clone()))?;

        if let Some(url) = get("DATABASE_URL") {
            let options = PgConnectOptions::from_str(&url)
                .map_err(|e| ConfigError::InvalidUrl(e.to_string()))?
                .ssl_mode(ssl_mode);
            return Ok(Self {
                source: DbSource::Url,
                options,
            });
        }

        let host = get("DB_HOST");
        let name = get("DB_NAME");
        let user = get("DB_USER");
        let password = get("DB_PASSWORD");

        let missing: Vec<&'static str> = [
            ("DB_HOST", host.is_none()),
            ("DB_NAME", name.is_none()),
            ("DB_USER", user.is_none()),
            ("DB_PASSWORD", password.is_none()),
        ]
        .into_iter()
        .filter_map(|(key, absent)| absent.then_some(key))
        .collect();

        let (Some(host), Some(name), Some(user), Some(password)) = (host, name, user, password)
        else {
            return Err(ConfigError::Missing(missing));
        };

        let port = match get("DB_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(raw.clone()))?,
            None => DEFAULT_DB_PORT,
        };

        let options = PgConnectOptions::new()
            .host(&host)
            .port(port)
            .database(&name)
            .username(&user)
            .password(&password)
            .ssl_mode(ssl_mode);

        Ok(Self {
            source: DbSource::Discrete,
            options,
        })
    }

    /// Send `statement_timeout` as a startup option on every connection
    pub fn with_statement_timeout(mut self, secs: u64) -> Self {
        self.options = self
            .options
            .options([("statement_timeout", format!("{}s", secs))]);
        self
    }

    pub fn source(&self) -> DbSource {
        self.source
    }

    pub fn host(&self) -> &str {
        self.options.get_host()
    }

    pub fn port(&self) -> u16 {
        self.options.get_port()
    }

    pub fn database(&self) -> Option<&str> {
        self.options.get_database()
    }

    pub fn connect_options(&self) -> &PgConnectOptions {
        &self.options
    }
}

// Credentials stay out of logs
impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("source", &self.source)
            .field("host", &self.host())
            .field("port", &self.port())
            .field("database", &self.database())
            .finish_non_exhaustive()
    }
}

/// HTTP server and pool settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Schema that every accepted query must reference
    pub schema: String,
    pub max_connections: u32,
    pub statement_timeout_secs: Option<u64>,
    /// Placeholder only: read and reported at startup, never enforced
    pub api_key: Option<String>,
}

/// Complete process configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub db: DbConfig,
}

impl AppConfig {
    /// Combine server settings with database settings from the environment
    pub fn load(server: ServerConfig) -> Result<Self, ConfigError> {
        let mut db = DbConfig::from_env()?;
        if let Some(secs) = server.statement_timeout_secs {
            db = db.with_statement_timeout(secs);
        }
        Ok(Self { server, db })
    }
}
