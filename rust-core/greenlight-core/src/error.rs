//! # Error Handling
//!
//! Centralized error types for Greenlight core.
//! Uses `thiserror` for ergonomic error definitions.

use thiserror::Error;

/// Result type alias for Greenlight operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for the Greenlight runtime
#[derive(Error, Debug)]
pub enum Error {
    /// Server failed to bind to the specified address
    #[error("Failed to bind server to {address}: {source}")]
    BindError {
        /// The address we tried to bind to
        address: String,
        /// The underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Router failed to match the requested path
    #[error("No route found for path: {path}")]
    RouteNotFound {
        /// The path that wasn't matched
        path: String,
    },

    /// The path exists but not for the requested method
    #[error("Method {method} not allowed for path: {path}")]
    MethodNotAllowed {
        /// The request method
        method: String,
        /// The matched path
        path: String,
    },

    /// Invalid route pattern provided
    #[error("Invalid route pattern: {pattern}: {reason}")]
    InvalidRoutePattern {
        /// The invalid pattern
        pattern: String,
        /// Reason for invalidity
        reason: String,
    },

    /// HTTP protocol error
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Database error
    #[error("Database error: {message}")]
    Database {
        /// Error message from database
        message: String,
    },

    /// Path parameter missing or out of range
    #[error("invalid {name} parameter")]
    InvalidParam {
        /// Parameter name
        name: String,
    },

    /// No row matched the requested id
    #[error("record not found")]
    RecordNotFound,

    /// Invalid configuration value
    #[error("Invalid configuration for {key}: {reason}")]
    Config {
        /// Configuration key
        key: String,
        /// Why the value was rejected
        reason: String,
    },
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::RecordNotFound,
            other => Self::Database {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_not_found_error() {
        let err = Error::RouteNotFound {
            path: "/unknown".to_string(),
        };
        assert!(err.to_string().contains("/unknown"));
    }

    #[test]
    fn test_bind_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use");
        let err = Error::BindError {
            address: "0.0.0.0:4000".to_string(),
            source: io_err,
        };
        assert!(err.to_string().contains("0.0.0.0:4000"));
    }

    #[test]
    fn test_row_not_found_maps_to_record_not_found() {
        let err: Error = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, Error::RecordNotFound));
    }

    #[test]
    fn test_other_sqlx_errors_map_to_database() {
        let err: Error = sqlx::Error::PoolClosed.into();
        assert!(matches!(err, Error::Database { .. }));
    }
}
