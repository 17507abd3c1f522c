//! # Greenlight Core
//!
//! Core library for the Greenlight movie API: JSON request decoding,
//! envelope responses, validation and movie persistence, served over a
//! Hyper/Tokio HTTP stack.
//!
//! ## Modules
//!
//! - `server` - HTTP server built on Hyper
//! - `router` - Routing using matchit (radix trie)
//! - `types` - Path parameter types and conversion
//! - `request` - HTTP request wrapper with size-limited body
//! - `response` - Network-agnostic JSON response
//! - `json` - Strict body decoding and envelope encoding
//! - `responder` - Error responses
//! - `validation` - Field validation
//! - `movie` - Movie model and rules
//! - `store` - Movie persistence over SQLx
//! - `database` - SQLx connection pools (SQLite, PostgreSQL)
//! - `middleware` - Request/response middleware
//! - `handlers` - Healthcheck and movie endpoints
//! - `state` - Shared application state
//! - `config` - Environment configuration
//! - `error` - Error types

pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod json;
pub mod middleware;
pub mod movie;
pub mod request;
pub mod responder;
pub mod response;
pub mod router;
pub mod server;
pub mod state;
pub mod store;
pub mod types;
pub mod validation;

pub use config::{Config, DatabaseConfig, ServerConfig};
pub use database::DatabasePool;
pub use error::{Error, Result};
pub use handlers::build_server;
pub use json::{decode_json, write_json, DecodeError, Envelope};
pub use middleware::{LoggingMiddleware, Middleware, MiddlewareChain};
pub use movie::{Movie, MovieInput};
pub use request::ApiRequest;
pub use response::JsonResponse;
pub use router::{Method, Router};
pub use server::Server;
pub use state::AppState;
pub use store::{MovieStore, NoopMovieStore, SqlMovieStore};
pub use validation::{ValidationErrors, Validator};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
