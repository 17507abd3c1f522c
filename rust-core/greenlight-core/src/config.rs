//! # Configuration
//!
//! Server, database and environment settings, loaded from `GREENLIGHT_*`
//! environment variables.

use crate::database::DEFAULT_MAX_CONNECTIONS;
use crate::error::{Error, Result};
use crate::json::MAX_BODY_BYTES;
use crate::validation::permitted_value;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Environments the server may report
pub const ENVIRONMENTS: [&str; 3] = ["development", "staging", "production"];

/// HTTP Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to
    pub address: SocketAddr,
    /// Enable keep-alive connections
    pub keep_alive: bool,
    /// Shutdown timeout for graceful shutdown (default: 30 seconds)
    pub shutdown_timeout: Duration,
    /// Max request body size in bytes
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: ([127, 0, 0, 1], 4000).into(),
            keep_alive: true,
            shutdown_timeout: Duration::from_secs(30),
            max_body_size: MAX_BODY_BYTES,
        }
    }
}

/// Database settings
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Connection URL; `sqlite:` or `postgres://`
    pub dsn: Option<String>,
    /// Maximum open connections in the pool
    pub max_open_conns: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            dsn: None,
            max_open_conns: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Deployment environment name
    pub environment: String,
    /// HTTP server settings
    pub server: ServerConfig,
    /// Database settings
    pub db: DatabaseConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            server: ServerConfig::default(),
            db: DatabaseConfig::default(),
        }
    }
}

impl Config {
    /// Load from the process environment
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for any value that fails to parse.
    pub fn from_env() -> Result<Self> {
        let kv: HashMap<String, String> = std::env::vars().collect();
        Self::from_kv(&kv)
    }

    /// Load from a key/value map; missing keys keep their defaults
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for any value that fails to parse.
    pub fn from_kv(kv: &HashMap<String, String>) -> Result<Self> {
        let defaults = Self::default();

        let environment = lookup(kv, "GREENLIGHT_ENV")
            .map_or(defaults.environment, ToString::to_string);
        if !permitted_value(&environment.as_str(), &ENVIRONMENTS) {
            return Err(Error::Config {
                key: "GREENLIGHT_ENV".to_string(),
                reason: format!("must be one of {}", ENVIRONMENTS.join(", ")),
            });
        }

        let server = ServerConfig {
            address: parse_or(kv, "GREENLIGHT_ADDR", defaults.server.address)?,
            keep_alive: parse_or(kv, "GREENLIGHT_KEEP_ALIVE", defaults.server.keep_alive)?,
            shutdown_timeout: Duration::from_secs(parse_or(
                kv,
                "GREENLIGHT_SHUTDOWN_TIMEOUT_SECS",
                defaults.server.shutdown_timeout.as_secs(),
            )?),
            max_body_size: parse_or(
                kv,
                "GREENLIGHT_MAX_BODY_BYTES",
                defaults.server.max_body_size,
            )?,
        };
        if server.max_body_size == 0 {
            return Err(Error::Config {
                key: "GREENLIGHT_MAX_BODY_BYTES".to_string(),
                reason: "must be >= 1".to_string(),
            });
        }

        let db = DatabaseConfig {
            dsn: lookup(kv, "GREENLIGHT_DB_DSN").map(ToString::to_string),
            max_open_conns: parse_or(
                kv,
                "GREENLIGHT_DB_MAX_OPEN_CONNS",
                defaults.db.max_open_conns,
            )?,
        };

        Ok(Self {
            environment,
            server,
            db,
        })
    }
}

/// Trimmed, non-empty value for `key`
fn lookup<'a>(kv: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    kv.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn parse_or<T>(kv: &HashMap<String, String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(kv, key).map_or(Ok(default), |raw| {
        raw.parse().map_err(|e| Error::Config {
            key: key.to_string(),
            reason: format!("{e}"),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kv(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_kv(&HashMap::new()).unwrap();
        assert_eq!(config.environment, "development");
        assert_eq!(config.server.address.port(), 4000);
        assert!(config.server.keep_alive);
        assert_eq!(config.server.max_body_size, 1_048_576);
        assert_eq!(config.db.max_open_conns, 25);
        assert!(config.db.dsn.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_kv(&kv(&[
            ("GREENLIGHT_ENV", "staging"),
            ("GREENLIGHT_ADDR", "0.0.0.0:8080"),
            ("GREENLIGHT_DB_DSN", " postgres://greenlight@localhost/greenlight "),
            ("GREENLIGHT_DB_MAX_OPEN_CONNS", "5"),
            ("GREENLIGHT_SHUTDOWN_TIMEOUT_SECS", "3"),
        ]))
        .unwrap();

        assert_eq!(config.environment, "staging");
        assert_eq!(config.server.address.port(), 8080);
        assert_eq!(config.server.shutdown_timeout, Duration::from_secs(3));
        assert_eq!(
            config.db.dsn.as_deref(),
            Some("postgres://greenlight@localhost/greenlight")
        );
        assert_eq!(config.db.max_open_conns, 5);
    }

    #[test]
    fn test_invalid_values() {
        let err = Config::from_kv(&kv(&[("GREENLIGHT_ADDR", "not-an-addr")])).unwrap_err();
        assert!(err.to_string().contains("GREENLIGHT_ADDR"));

        let err = Config::from_kv(&kv(&[("GREENLIGHT_ENV", "qa")])).unwrap_err();
        assert!(matches!(err, Error::Config { ref key, .. } if key == "GREENLIGHT_ENV"));

        let err = Config::from_kv(&kv(&[("GREENLIGHT_MAX_BODY_BYTES", "0")])).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}
