//! # Database Module
//!
//! SQLx connection pools for PostgreSQL and SQLite.
//!
//! The pool is created once at startup and shared by every request through
//! the movie store.

use crate::error::{Error, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::time::Duration;
use tracing::info;

/// Default maximum pool size
pub const DEFAULT_MAX_CONNECTIONS: u32 = 25;

/// Database connection pool supporting multiple backends
#[derive(Clone, Debug)]
pub enum DatabasePool {
    /// SQLite connection pool
    Sqlite(SqlitePool),
    /// PostgreSQL connection pool
    Postgres(PgPool),
}

impl DatabasePool {
    /// Connect using the URL scheme to pick the backend
    ///
    /// # Example
    ///
    /// ```ignore
    /// let pool = DatabasePool::connect("postgres://greenlight@localhost/greenlight", None).await?;
    /// let pool = DatabasePool::connect("sqlite::memory:", Some(1)).await?;
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for an unsupported scheme and
    /// `Error::Database` if the connection fails.
    pub async fn connect(url: &str, max_connections: Option<u32>) -> Result<Self> {
        if url.starts_with("sqlite:") {
            Self::connect_sqlite(url, max_connections).await
        } else if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Self::connect_postgres(url, max_connections).await
        } else {
            Err(Error::Config {
                key: "database url".to_string(),
                reason: "expected a sqlite: or postgres:// URL".to_string(),
            })
        }
    }

    /// Connect to a SQLite database
    ///
    /// # Errors
    ///
    /// Returns `Error::Database` if the connection fails.
    pub async fn connect_sqlite(url: &str, max_connections: Option<u32>) -> Result<Self> {
        let pool_size = max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS);
        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .connect(url)
            .await
            .map_err(|e| Error::Database {
                message: format!("SQLite connection failed: {e}"),
            })?;

        info!(backend = "sqlite", max_connections = pool_size, "database pool established");
        Ok(Self::Sqlite(pool))
    }

    /// Connect to a PostgreSQL database
    ///
    /// # Errors
    ///
    /// Returns `Error::Database` if the connection fails.
    pub async fn connect_postgres(url: &str, max_connections: Option<u32>) -> Result<Self> {
        let pool_size = max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS);
        let pool = PgPoolOptions::new()
            .max_connections(pool_size)
            .idle_timeout(Duration::from_secs(15 * 60))
            .connect(url)
            .await
            .map_err(|e| Error::Database {
                message: format!("PostgreSQL connection failed: {e}"),
            })?;

        info!(backend = "postgres", max_connections = pool_size, "database pool established");
        Ok(Self::Postgres(pool))
    }

    /// Backend name for logs
    #[must_use]
    pub const fn backend(&self) -> &'static str {
        match self {
            Self::Sqlite(_) => "sqlite",
            Self::Postgres(_) => "postgres",
        }
    }

    /// Execute a statement that doesn't return rows
    ///
    /// Returns the number of affected rows.
    ///
    /// # Errors
    ///
    /// Returns `Error::Database` if the statement fails.
    pub async fn execute(&self, query: &str) -> Result<u64> {
        let rows_affected = match self {
            Self::Sqlite(pool) => sqlx::query(query).execute(pool).await?.rows_affected(),
            Self::Postgres(pool) => sqlx::query(query).execute(pool).await?.rows_affected(),
        };
        Ok(rows_affected)
    }

    /// Close the database connection pool
    pub async fn close(&self) {
        match self {
            Self::Sqlite(pool) => pool.close().await,
            Self::Postgres(pool) => pool.close().await,
        }
    }
}
