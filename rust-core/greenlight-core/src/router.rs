//! # Router
//!
//! Radix-trie based router using `matchit`.
//!
//! ## Features
//!
//! - Path parameter extraction (`/v1/movies/{id}`)
//! - Typed parameters (`/v1/movies/{id:int}`)
//! - Distinguishes an unknown path (404) from a known path served under a
//!   different method (405)

use crate::error::{Error, Result};
use crate::types::{normalize_pattern, ParamType, ParamValue};
use matchit::Router as MatchitRouter;
use std::collections::HashMap;

/// HTTP methods supported by the router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// HTTP GET
    Get,
    /// HTTP POST
    Post,
    /// HTTP PUT
    Put,
    /// HTTP DELETE
    Delete,
    /// HTTP PATCH
    Patch,
    /// HTTP HEAD
    Head,
    /// HTTP OPTIONS
    Options,
}

impl Method {
    /// Map a hyper method; `None` for methods no route can use
    #[must_use]
    pub fn from_hyper(method: &hyper::Method) -> Option<Self> {
        match *method {
            hyper::Method::GET => Some(Self::Get),
            hyper::Method::POST => Some(Self::Post),
            hyper::Method::PUT => Some(Self::Put),
            hyper::Method::DELETE => Some(Self::Delete),
            hyper::Method::PATCH => Some(Self::Patch),
            hyper::Method::HEAD => Some(Self::Head),
            hyper::Method::OPTIONS => Some(Self::Options),
            _ => None,
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Delete => write!(f, "DELETE"),
            Self::Patch => write!(f, "PATCH"),
            Self::Head => write!(f, "HEAD"),
            Self::Options => write!(f, "OPTIONS"),
        }
    }
}

/// Route handler identifier
pub type HandlerId = usize;

/// Matched route with converted parameters
#[derive(Debug)]
pub struct Match {
    /// The handler ID for this route
    pub handler_id: HandlerId,
    /// Typed path parameters
    pub params: HashMap<String, ParamValue>,
}

/// Value stored in the trie for each registered pattern
#[derive(Debug, Clone)]
struct Route {
    handler_id: HandlerId,
    param_types: HashMap<String, ParamType>,
}

/// HTTP router using a radix trie per method
#[derive(Clone, Default)]
pub struct Router {
    method_routes: HashMap<Method, MatchitRouter<Route>>,
    next_handler_id: HandlerId,
}

impl Router {
    /// Create a new empty router
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route with the given method and path pattern
    ///
    /// Returns the handler ID assigned to this route. Ids are consecutive
    /// over successful registrations.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRoutePattern` if the pattern is malformed or
    /// conflicts with an existing route.
    pub fn add_route(&mut self, method: Method, path: &str) -> Result<HandlerId> {
        let handler_id = self.next_handler_id;
        let (pattern, param_types) = normalize_pattern(path);

        self.method_routes
            .entry(method)
            .or_insert_with(MatchitRouter::new)
            .insert(
                pattern,
                Route {
                    handler_id,
                    param_types,
                },
            )
            .map_err(|e| Error::InvalidRoutePattern {
                pattern: path.to_string(),
                reason: e.to_string(),
            })?;

        self.next_handler_id += 1;
        Ok(handler_id)
    }

    /// Match a request path against registered routes
    ///
    /// Parameters that fail their declared type conversion are kept as
    /// strings so the handler can reject them.
    ///
    /// # Errors
    ///
    /// Returns `Error::MethodNotAllowed` if the path is registered only
    /// under other methods, `Error::RouteNotFound` otherwise.
    pub fn match_route(&self, method: Method, path: &str) -> Result<Match> {
        let Some(matched) = self
            .method_routes
            .get(&method)
            .and_then(|routes| routes.at(path).ok())
        else {
            return Err(if self.allowed_methods(path).is_empty() {
                Error::RouteNotFound {
                    path: path.to_string(),
                }
            } else {
                Error::MethodNotAllowed {
                    method: method.to_string(),
                    path: path.to_string(),
                }
            });
        };

        let route = matched.value;
        let params = matched
            .params
            .iter()
            .map(|(name, raw)| {
                let declared = route.param_types.get(name).copied().unwrap_or_default();
                (name.to_string(), declared.convert(raw))
            })
            .collect();

        Ok(Match {
            handler_id: route.handler_id,
            params,
        })
    }

    /// Methods registered for `path`, sorted by name
    #[must_use]
    pub fn allowed_methods(&self, path: &str) -> Vec<Method> {
        let mut methods: Vec<Method> = self
            .method_routes
            .iter()
            .filter(|(_, routes)| routes.at(path).is_ok())
            .map(|(method, _)| *method)
            .collect();
        methods.sort_by_key(ToString::to_string);
        methods
    }
}
