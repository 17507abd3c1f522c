//! # HTTP Server
//!
//! HTTP/1 server built on Hyper and Tokio with graceful shutdown.
//!
//! Requests are read into an [`ApiRequest`], matched against the router,
//! passed through the middleware chain and answered with a [`JsonResponse`].
//! Unknown paths get a 404 and known paths under the wrong method a 405,
//! both as JSON error envelopes.

use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::middleware::{Middleware, MiddlewareChain, MiddlewareResult};
use crate::request::ApiRequest;
use crate::responder::{
    error_response, method_not_allowed_response, not_found_response, server_error_response,
};
use crate::response::JsonResponse;
use crate::router::{Method, Router};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::collections::HashMap;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Boxed handler future
pub type HandlerFuture = Pin<Box<dyn Future<Output = JsonResponse> + Send>>;

/// Route handler
pub type Handler = Arc<dyn Fn(ApiRequest) -> HandlerFuture + Send + Sync>;

/// HTTP server
pub struct Server {
    config: ServerConfig,
    router: Router,
    handlers: Vec<Handler>,
    middleware: MiddlewareChain,
}

impl Server {
    /// Create a server with no routes
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            router: Router::new(),
            handlers: Vec::new(),
            middleware: MiddlewareChain::new(),
        }
    }

    /// Server settings
    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Add a middleware to the chain
    pub fn add_middleware<M: Middleware + 'static>(&mut self, middleware: M) {
        self.middleware.add(middleware);
    }

    /// Add a route and its handler
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRoutePattern` if the router rejects the path.
    pub fn add_route(&mut self, method: Method, path: &str, handler: Handler) -> Result<()> {
        let id = self.router.add_route(method, path)?;
        debug_assert_eq!(id, self.handlers.len());
        self.handlers.push(handler);
        debug!(%method, path, "route registered");
        Ok(())
    }

    /// Serve until Ctrl+C or SIGTERM
    ///
    /// # Errors
    ///
    /// Returns `Error::BindError` if the listener cannot be created and
    /// `Error::Io` if accepting fails.
    pub async fn serve(&self) -> Result<()> {
        self.serve_with_shutdown(shutdown_signal()).await
    }

    /// Serve until `signal` completes, then drain open connections
    ///
    /// Connections still open after `shutdown_timeout` are abandoned.
    ///
    /// # Errors
    ///
    /// Returns `Error::BindError` if the listener cannot be created and
    /// `Error::Io` if accepting fails.
    pub async fn serve_with_shutdown<F>(&self, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let addr = self.config.address;
        let listener = bind(addr).map_err(|source| Error::BindError {
            address: addr.to_string(),
            source,
        })?;

        info!(address = %addr, "server listening");

        let router = Arc::new(self.router.clone());
        let handlers = Arc::new(self.handlers.clone());
        let middleware = Arc::new(self.middleware.clone());
        let active = Arc::new(AtomicUsize::new(0));
        let max_body_size = self.config.max_body_size;
        let keep_alive = self.config.keep_alive;

        tokio::pin!(signal);
        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    let (stream, remote_addr) = accept_result?;
                    let io = TokioIo::new(stream);

                    let router = router.clone();
                    let handlers = handlers.clone();
                    let middleware = middleware.clone();
                    let active = active.clone();

                    active.fetch_add(1, Ordering::Relaxed);
                    tokio::task::spawn(async move {
                        let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                            let router = router.clone();
                            let handlers = handlers.clone();
                            let middleware = middleware.clone();
                            async move {
                                let method = req.method().clone();
                                let path = req.uri().path().to_string();
                                let version = req.version();

                                let result = handle_request(
                                    req,
                                    &router,
                                    &handlers,
                                    &middleware,
                                    remote_addr,
                                    max_body_size,
                                )
                                .await;

                                if let Ok(resp) = &result {
                                    debug!(
                                        remote = %remote_addr,
                                        %method,
                                        path = %path,
                                        version = ?version,
                                        status = resp.status().as_u16(),
                                        "access"
                                    );
                                }
                                result
                            }
                        });

                        if let Err(err) = http1::Builder::new()
                            .keep_alive(keep_alive)
                            .serve_connection(io, service)
                            .await
                        {
                            warn!(remote = %remote_addr, error = %err, "error serving connection");
                        }
                        active.fetch_sub(1, Ordering::Relaxed);
                    });
                }
                () = &mut signal => {
                    info!("shutdown signal received, stopping server");
                    break;
                }
            }
        }

        let timeout = self.config.shutdown_timeout;
        let drain = async {
            while active.load(Ordering::Relaxed) > 0 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        };
        if tokio::time::timeout(timeout, drain).await.is_err() {
            warn!(
                open_connections = active.load(Ordering::Relaxed),
                "shutdown timeout elapsed with connections still open"
            );
        }
        info!("server stopped");
        Ok(())
    }

    /// Execute a request directly without the network stack
    pub async fn test_request(
        &self,
        method: Method,
        path: &str,
        headers: HashMap<String, String>,
        body: Option<Bytes>,
    ) -> JsonResponse {
        let mut req =
            ApiRequest::new(method, path, headers, body).with_max_body_bytes(self.config.max_body_size);
        req.set_header("x-client-ip", "test");

        process_request(req, &self.router, &self.handlers, &self.middleware).await
    }
}

fn bind(addr: SocketAddr) -> std::io::Result<tokio::net::TcpListener> {
    let socket = if addr.is_ipv4() {
        tokio::net::TcpSocket::new_v4()?
    } else {
        tokio::net::TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    socket.listen(1024)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

/// Core request processing (network agnostic)
async fn process_request(
    mut req: ApiRequest,
    router: &Router,
    handlers: &[Handler],
    middleware: &MiddlewareChain,
) -> JsonResponse {
    if req.header("x-request-id").is_none() {
        req.set_header("x-request-id", &generate_request_id());
    }

    let mut response = match router.match_route(req.method, &req.path) {
        Ok(matched) => {
            req.params = matched.params;
            match middleware.run_before(&req) {
                MiddlewareResult::Continue => match handlers.get(matched.handler_id) {
                    Some(handler) => handler(req.clone()).await,
                    None => {
                        let err = Error::RouteNotFound {
                            path: req.path.clone(),
                        };
                        server_error_response(&req, &err)
                    }
                },
                MiddlewareResult::Respond(resp) => resp,
            }
        }
        Err(Error::MethodNotAllowed { .. }) => {
            let mut resp = method_not_allowed_response();
            let allow = router
                .allowed_methods(&req.path)
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            resp.set_header("allow", &allow);
            resp
        }
        Err(Error::RouteNotFound { .. }) => not_found_response(),
        Err(e) => server_error_response(&req, &e),
    };

    if let Some(request_id) = req.header("x-request-id") {
        response.set_header("x-request-id", request_id);
    }
    middleware.run_after(&req, &mut response);
    response
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    router: &Router,
    handlers: &[Handler],
    middleware: &MiddlewareChain,
    remote_addr: SocketAddr,
    max_body_size: usize,
) -> std::result::Result<Response<Full<Bytes>>, Infallible> {
    let response = match ApiRequest::from_hyper_with_limit(req, max_body_size).await {
        Ok(mut api_request) => {
            api_request.set_header("x-client-ip", &remote_addr.ip().to_string());
            process_request(api_request, router, handlers, middleware).await
        }
        Err(Error::MethodNotAllowed { .. }) => method_not_allowed_response(),
        Err(e) => {
            warn!(remote = %remote_addr, error = %e, "failed to read request");
            error_response(StatusCode::BAD_REQUEST, "the request body could not be read")
        }
    };
    Ok(response.into_hyper())
}

static REQUEST_COUNTER: AtomicUsize = AtomicUsize::new(1);

fn generate_request_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let counter = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{:x}-{:x}", now.as_nanos(), counter)
}
