//! # Middleware
//!
//! Request/response interception around every routed handler.
//!
//! Middlewares run in registration order before the handler and in reverse
//! order after it. Any middleware may short-circuit with its own response.

use crate::request::ApiRequest;
use crate::response::JsonResponse;
use std::sync::Arc;
use tracing::{debug, info};

/// Middleware trait for request/response interception
pub trait Middleware: Send + Sync {
    /// Called before the request handler
    fn before_request(&self, _req: &ApiRequest) -> MiddlewareResult {
        MiddlewareResult::Continue
    }

    /// Called after the request handler
    fn after_response(&self, _req: &ApiRequest, _res: &mut JsonResponse) {}

    /// Middleware name for logging
    fn name(&self) -> &'static str {
        "Unknown"
    }
}

/// Result of middleware execution
#[derive(Debug)]
pub enum MiddlewareResult {
    /// Continue to next middleware/handler
    Continue,
    /// Short-circuit with this response (skip handler)
    Respond(JsonResponse),
}

/// Ordered middleware list
#[derive(Default, Clone)]
pub struct MiddlewareChain {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    /// Create a new empty middleware chain
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a middleware to the chain
    pub fn add<M: Middleware + 'static>(&mut self, middleware: M) {
        self.middlewares.push(Arc::new(middleware));
    }

    /// Run `before_request` until one responds
    pub fn run_before(&self, req: &ApiRequest) -> MiddlewareResult {
        for mw in &self.middlewares {
            if let MiddlewareResult::Respond(resp) = mw.before_request(req) {
                debug!(middleware = mw.name(), "middleware short-circuited request");
                return MiddlewareResult::Respond(resp);
            }
        }
        MiddlewareResult::Continue
    }

    /// Run `after_response` in reverse order
    pub fn run_after(&self, req: &ApiRequest, res: &mut JsonResponse) {
        for mw in self.middlewares.iter().rev() {
            mw.after_response(req, res);
        }
    }
}

/// Structured request/response log lines
#[derive(Default)]
pub struct LoggingMiddleware;

impl LoggingMiddleware {
    /// Create a new logging middleware
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Middleware for LoggingMiddleware {
    fn before_request(&self, req: &ApiRequest) -> MiddlewareResult {
        debug!(
            method = %req.method,
            path = %req.path,
            request_id = req.header("x-request-id").unwrap_or("-"),
            "request received"
        );
        MiddlewareResult::Continue
    }

    fn after_response(&self, req: &ApiRequest, res: &mut JsonResponse) {
        info!(
            method = %req.method,
            path = %req.path,
            status = res.status_code(),
            request_id = req.header("x-request-id").unwrap_or("-"),
            "response sent"
        );
    }

    fn name(&self) -> &'static str {
        "LoggingMiddleware"
    }
}
