use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use sqlx::postgres::PgConnectOptions;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// A configuration value that must never show up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub name: String,
    pub password: Secret,
    pub max_connections: u32,
    /// Upper bound for any single statement and for waiting on a row lock.
    pub statement_timeout: Duration,
}

impl DatabaseConfig {
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .database(&self.name)
            .password(self.password.expose())
            .options(self.session_options())
    }

    /// Per-connection settings; a statement that exceeds them fails with SQLSTATE
    /// 57014 or 55P03 instead of waiting.
    pub fn session_options(&self) -> [(&'static str, String); 2] {
        let millis = self.statement_timeout.as_millis().to_string();
        [("statement_timeout", millis.clone()), ("lock_timeout", millis)]
    }
}

/// Process-wide settings, read once at startup and passed into constructors.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub jwt_secret: Secret,
    pub token_ttl: chrono::Duration,
    pub store_backend: StoreBackend,
    pub store_timeout: Duration,
    pub database: DatabaseConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests don't touch the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let store_backend = match lookup("STORE_BACKEND")
            .unwrap_or_else(|| "postgres".to_string())
            .to_lowercase()
            .as_str()
        {
            "postgres" => StoreBackend::Postgres,
            "memory" => StoreBackend::Memory,
            other => {
                return Err(ConfigError::Invalid {
                    name: "STORE_BACKEND",
                    reason: format!("{} (expected 'postgres' or 'memory')", other),
                })
            }
        };

        let store_timeout = Duration::from_secs(parse_or(&lookup, "STORE_TIMEOUT_SECS", 5)?);
        if store_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                name: "STORE_TIMEOUT_SECS",
                reason: "must be positive".to_string(),
            });
        }

        let database = if store_backend == StoreBackend::Postgres {
            DatabaseConfig {
                host: lookup("DB_HOST").ok_or(ConfigError::Missing("DB_HOST"))?,
                port: parse_or(&lookup, "DB_PORT", 5432)?,
                user: lookup("DB_USER").ok_or(ConfigError::Missing("DB_USER"))?,
                name: lookup("DB_NAME").ok_or(ConfigError::Missing("DB_NAME"))?,
                password: Secret::new(lookup("DB_PASSWORD").unwrap_or_default()),
                max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 10)?,
                statement_timeout: store_timeout,
            }
        } else {
            DatabaseConfig {
                host: String::new(),
                port: 5432,
                user: String::new(),
                name: String::new(),
                password: Secret::new(""),
                max_connections: 0,
                statement_timeout: store_timeout,
            }
        };

        let token_ttl = token_ttl(parse_or(&lookup, "JWT_TTL_SECS", 15_000)?)?;

        Ok(Self {
            listen_addr: parse_or(&lookup, "LISTEN_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?,
            jwt_secret: Secret::new(jwt_secret),
            token_ttl,
            store_backend,
            store_timeout,
            database,
        })
    }
}

/// Tokens expire at `now + ttl`, so the window has to fit the calendar as well as `i64`.
fn token_ttl(secs: i64) -> Result<chrono::Duration, ConfigError> {
    let invalid = |reason: &str| ConfigError::Invalid {
        name: "JWT_TTL_SECS",
        reason: reason.to_string(),
    };
    if secs <= 0 {
        return Err(invalid("must be positive"));
    }
    let ttl = chrono::Duration::try_seconds(secs).ok_or_else(|| invalid("too large"))?;
    chrono::Utc::now()
        .checked_add_signed(ttl)
        .ok_or_else(|| invalid("too large"))?;
    Ok(ttl)
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
