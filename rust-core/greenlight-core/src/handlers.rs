//! # Handlers
//!
//! Healthcheck and movie CRUD endpoints, plus the route table that binds
//! them to paths.
//!
//! | Method | Path | Success |
//! |---|---|---|
//! | GET | `/v1/healthcheck` | 200 |
//! | POST | `/v1/movies` | 201 + `Location` |
//! | GET | `/v1/movies/{id}` | 200 |
//! | PUT | `/v1/movies/{id}` | 200 |
//! | DELETE | `/v1/movies/{id}` | 200 |

use crate::error::{Error, Result};
use crate::json::{write_json, DecodeError, Envelope};
use crate::middleware::LoggingMiddleware;
use crate::movie::{validate_movie, Movie, MovieInput};
use crate::request::ApiRequest;
use crate::responder::{
    bad_request_response, failed_validation_response, not_found_response, server_error_response,
};
use crate::response::JsonResponse;
use crate::router::Method;
use crate::server::{Handler, HandlerFuture, Server};
use crate::state::AppState;
use crate::validation::Validator;
use hyper::header::{HeaderMap, HeaderValue, LOCATION};
use hyper::StatusCode;
use serde::Serialize;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;

/// Build a server with every route registered over `state`
///
/// # Errors
///
/// Returns `Error::InvalidRoutePattern` if a route fails to register.
pub fn build_server(state: &AppState) -> Result<Server> {
    let mut server = Server::new(state.config.server.clone());
    server.add_middleware(LoggingMiddleware::new());

    server.add_route(Method::Get, "/v1/healthcheck", handler(state, healthcheck))?;
    server.add_route(Method::Post, "/v1/movies", handler(state, create_movie))?;
    server.add_route(Method::Get, "/v1/movies/{id:int}", handler(state, show_movie))?;
    server.add_route(Method::Put, "/v1/movies/{id:int}", handler(state, update_movie))?;
    server.add_route(Method::Delete, "/v1/movies/{id:int}", handler(state, delete_movie))?;

    Ok(server)
}

fn handler<F, Fut>(state: &AppState, f: F) -> Handler
where
    F: Fn(AppState, ApiRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = JsonResponse> + Send + 'static,
{
    let state = state.clone();
    Arc::new(move |req: ApiRequest| -> HandlerFuture { Box::pin(f(state.clone(), req)) })
}

/// `GET /v1/healthcheck`
pub async fn healthcheck(state: AppState, req: ApiRequest) -> JsonResponse {
    let system_info = json!({
        "environment": state.config.environment,
        "version": crate::VERSION,
    });
    let envelope = Envelope::wrap("status", "available")
        .and_then(|env| env.with("system_info", &system_info));

    match envelope.and_then(|env| write_json(StatusCode::OK, &env, None)) {
        Ok(response) => response,
        Err(e) => server_error_response(&req, &e),
    }
}

/// `POST /v1/movies`
pub async fn create_movie(state: AppState, req: ApiRequest) -> JsonResponse {
    let input = match read_movie_input(&req) {
        Ok(input) => input,
        Err(e) => return bad_request_response(&e),
    };

    let mut v = Validator::new();
    validate_movie(&mut v, &input);
    if v.has_errors() {
        return failed_validation_response(v.errors());
    }

    let mut movie = Movie::from(input);
    if let Err(e) = state.movies.insert(&mut movie).await {
        return server_error_response(&req, &e);
    }

    let mut headers = HeaderMap::new();
    if let Ok(location) = HeaderValue::from_str(&format!("/v1/movies/{}", movie.id)) {
        headers.insert(LOCATION, location);
    }
    respond(&req, StatusCode::CREATED, "movie", &movie, Some(&headers))
}

/// `GET /v1/movies/{id}`
pub async fn show_movie(state: AppState, req: ApiRequest) -> JsonResponse {
    let id = match req.read_id_param() {
        Ok(id) => id,
        Err(e) => return bad_request_response(&e),
    };

    match state.movies.get(id).await {
        Ok(movie) => respond(&req, StatusCode::OK, "movie", &movie, None),
        Err(e) => store_error_response(&req, &e),
    }
}

/// `PUT /v1/movies/{id}`
///
/// Replaces every client-settable field; the store bumps the version.
pub async fn update_movie(state: AppState, req: ApiRequest) -> JsonResponse {
    let id = match req.read_id_param() {
        Ok(id) => id,
        Err(e) => return bad_request_response(&e),
    };

    let mut movie = match state.movies.get(id).await {
        Ok(movie) => movie,
        Err(e) => return store_error_response(&req, &e),
    };

    let input = match read_movie_input(&req) {
        Ok(input) => input,
        Err(e) => return bad_request_response(&e),
    };

    let mut v = Validator::new();
    validate_movie(&mut v, &input);
    if v.has_errors() {
        return failed_validation_response(v.errors());
    }

    movie.apply(input);
    if let Err(e) = state.movies.update(&mut movie).await {
        return store_error_response(&req, &e);
    }

    respond(&req, StatusCode::OK, "movie", &movie, None)
}

/// `DELETE /v1/movies/{id}`
pub async fn delete_movie(state: AppState, req: ApiRequest) -> JsonResponse {
    let id = match req.read_id_param() {
        Ok(id) => id,
        Err(e) => return bad_request_response(&e),
    };

    match state.movies.delete(id).await {
        Ok(()) => respond(
            &req,
            StatusCode::OK,
            "message",
            "movie successfully deleted",
            None,
        ),
        Err(e) => store_error_response(&req, &e),
    }
}

/// Decode a movie body; a bare `null` yields an empty input for validation
fn read_movie_input(req: &ApiRequest) -> std::result::Result<MovieInput, DecodeError> {
    req.read_json::<Option<MovieInput>>().map(Option::unwrap_or_default)
}

fn respond<T: Serialize + ?Sized>(
    req: &ApiRequest,
    status: StatusCode,
    key: &str,
    payload: &T,
    headers: Option<&HeaderMap>,
) -> JsonResponse {
    match Envelope::wrap(key, payload).and_then(|env| write_json(status, &env, headers)) {
        Ok(response) => response,
        Err(e) => server_error_response(req, &e),
    }
}

fn store_error_response(req: &ApiRequest, err: &Error) -> JsonResponse {
    match err {
        Error::RecordNotFound => not_found_response(),
        _ => server_error_response(req, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::store::tests::sqlite_store;
    use crate::store::{MovieStore, NoopMovieStore};
    use async_trait::async_trait;
    use hyper::body::Bytes;
    use serde_json::Value;
    use std::collections::HashMap;

    async fn sqlite_server() -> Server {
        let state = AppState::new(Config::default(), sqlite_store().await);
        build_server(&state).unwrap()
    }

    async fn send(server: &Server, method: Method, path: &str, body: Option<&str>) -> JsonResponse {
        server
            .test_request(
                method,
                path,
                HashMap::new(),
                body.map(|b| Bytes::from(b.to_string())),
            )
            .await
    }

    fn json(resp: &JsonResponse) -> Value {
        serde_json::from_slice(&resp.body).unwrap()
    }

    const MOANA: &str =
        r#"{"title":"Moana","year":2016,"runtime":107,"genres":["animation","adventure"]}"#;

    #[tokio::test]
    async fn test_healthcheck() {
        let server = sqlite_server().await;
        let resp = send(&server, Method::Get, "/v1/healthcheck", None).await;

        assert_eq!(resp.status, StatusCode::OK);
        let body = json(&resp);
        assert_eq!(body["status"], "available");
        assert_eq!(body["system_info"]["environment"], "development");
        assert_eq!(body["system_info"]["version"], crate::VERSION);
    }

    #[tokio::test]
    async fn test_create_movie() {
        let server = sqlite_server().await;
        let resp = send(&server, Method::Post, "/v1/movies", Some(MOANA)).await;

        assert_eq!(resp.status, StatusCode::CREATED);
        assert_eq!(resp.header("location"), Some("/v1/movies/1"));
        assert_eq!(resp.header("content-type"), Some("application/json"));

        let movie = &json(&resp)["movie"];
        assert_eq!(movie["id"], 1);
        assert_eq!(movie["title"], "Moana");
        assert_eq!(movie["runtime"], 107);
        assert_eq!(movie["version"], 1);
        assert!(movie.get("created_at").is_none());
    }

    #[tokio::test]
    async fn test_movie_fields_keep_declared_order() {
        let server = sqlite_server().await;
        let resp = send(&server, Method::Post, "/v1/movies", Some(MOANA)).await;

        let body = resp.body_str().unwrap();
        let positions: Vec<usize> = ["\"id\"", "\"title\"", "\"year\"", "\"runtime\"", "\"genres\"", "\"version\""]
            .iter()
            .map(|key| body.find(key).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn test_create_movie_failed_validation() {
        let server = sqlite_server().await;
        let resp = send(
            &server,
            Method::Post,
            "/v1/movies",
            Some(r#"{"title":"","year":1500,"runtime":-3,"genres":["a","a"]}"#),
        )
        .await;

        assert_eq!(resp.status, StatusCode::UNPROCESSABLE_ENTITY);
        let errors = &json(&resp)["error"];
        assert_eq!(errors["title"], "must be provided");
        assert_eq!(errors["year"], "year must be greater than 1888");
        assert_eq!(errors["runtime"], "runtime must be positive integer");
        assert_eq!(errors["genres"], "genres must be unique");
    }

    #[tokio::test]
    async fn test_create_movie_bad_bodies() {
        let server = sqlite_server().await;

        let resp = send(&server, Method::Post, "/v1/movies", None).await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert_eq!(json(&resp)["error"], "body must not be empty");

        let resp = send(&server, Method::Post, "/v1/movies", Some(r#"{"title": 7}"#)).await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            json(&resp)["error"],
            "body contains incorrect JSON type for field \"title\""
        );

        let resp = send(&server, Method::Post, "/v1/movies", Some(r#"{"rating": 5}"#)).await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert!(json(&resp)["error"]
            .as_str()
            .unwrap()
            .contains("unknown field"));

        let resp = send(&server, Method::Post, "/v1/movies", Some("{} {}")).await;
        assert_eq!(
            json(&resp)["error"],
            "body must contain a single JSON value"
        );
    }

    #[tokio::test]
    async fn test_show_movie() {
        let server = sqlite_server().await;
        send(&server, Method::Post, "/v1/movies", Some(MOANA)).await;

        let resp = send(&server, Method::Get, "/v1/movies/1", None).await;
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(json(&resp)["movie"]["title"], "Moana");

        let resp = send(&server, Method::Get, "/v1/movies/2", None).await;
        assert_eq!(resp.status, StatusCode::NOT_FOUND);
        assert_eq!(
            json(&resp)["error"],
            "the requested resource could not be found"
        );

        for path in ["/v1/movies/0", "/v1/movies/-3", "/v1/movies/abc"] {
            let resp = send(&server, Method::Get, path, None).await;
            assert_eq!(resp.status, StatusCode::BAD_REQUEST, "{path}");
            assert_eq!(json(&resp)["error"], "invalid id parameter", "{path}");
        }
    }

    #[tokio::test]
    async fn test_invalid_id_rejected_before_store() {
        let server = sqlite_server().await;
        send(&server, Method::Post, "/v1/movies", Some(MOANA)).await;

        let resp = send(&server, Method::Put, "/v1/movies/abc", Some(MOANA)).await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert_eq!(json(&resp)["error"], "invalid id parameter");

        let resp = send(&server, Method::Delete, "/v1/movies/0", None).await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert_eq!(json(&resp)["error"], "invalid id parameter");

        let resp = send(&server, Method::Get, "/v1/movies/1", None).await;
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(json(&resp)["movie"]["version"], 1);
    }

    #[tokio::test]
    async fn test_null_body_reports_every_field() {
        let server = sqlite_server().await;
        let resp = send(&server, Method::Post, "/v1/movies", Some("null")).await;

        assert_eq!(resp.status, StatusCode::UNPROCESSABLE_ENTITY);
        let errors = &json(&resp)["error"];
        assert_eq!(errors["title"], "must be provided");
        assert_eq!(errors["year"], "year must be greater than 1888");
        assert_eq!(errors["runtime"], "runtime must be provided");
        assert_eq!(errors["genres"], "genres must be provided");
    }

    #[tokio::test]
    async fn test_update_movie() {
        let server = sqlite_server().await;
        send(&server, Method::Post, "/v1/movies", Some(MOANA)).await;

        let resp = send(
            &server,
            Method::Put,
            "/v1/movies/1",
            Some(r#"{"title":"Moana","year":2016,"runtime":108,"genres":["animation"]}"#),
        )
        .await;
        assert_eq!(resp.status, StatusCode::OK);
        let movie = &json(&resp)["movie"];
        assert_eq!(movie["runtime"], 108);
        assert_eq!(movie["genres"], json!(["animation"]));
        assert_eq!(movie["version"], 2);

        let resp = send(&server, Method::Put, "/v1/movies/1", Some(r#"{"title":"Moana"}"#)).await;
        assert_eq!(resp.status, StatusCode::UNPROCESSABLE_ENTITY);

        let resp = send(&server, Method::Put, "/v1/movies/9", Some(MOANA)).await;
        assert_eq!(resp.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_movie() {
        let server = sqlite_server().await;
        send(&server, Method::Post, "/v1/movies", Some(MOANA)).await;

        let resp = send(&server, Method::Delete, "/v1/movies/1", None).await;
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(json(&resp)["message"], "movie successfully deleted");

        let resp = send(&server, Method::Delete, "/v1/movies/1", None).await;
        assert_eq!(resp.status, StatusCode::NOT_FOUND);

        let resp = send(&server, Method::Get, "/v1/movies/1", None).await;
        assert_eq!(resp.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unrouted_requests() {
        let server = sqlite_server().await;

        let resp = send(&server, Method::Get, "/v1/directors", None).await;
        assert_eq!(resp.status, StatusCode::NOT_FOUND);

        let resp = send(&server, Method::Patch, "/v1/movies/1", None).await;
        assert_eq!(resp.status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(resp.header("allow"), Some("DELETE, GET, PUT"));
    }

    struct BrokenStore;

    #[async_trait]
    impl MovieStore for BrokenStore {
        async fn insert(&self, _movie: &mut Movie) -> Result<()> {
            Err(Error::Database {
                message: "disk I/O error".to_string(),
            })
        }

        async fn get(&self, _id: i64) -> Result<Movie> {
            Err(Error::Database {
                message: "disk I/O error".to_string(),
            })
        }

        async fn update(&self, _movie: &mut Movie) -> Result<()> {
            Ok(())
        }

        async fn delete(&self, _id: i64) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_store_failure_is_opaque_500() {
        let state = AppState::new(Config::default(), BrokenStore);
        let server = build_server(&state).unwrap();

        for (method, path, body) in [
            (Method::Post, "/v1/movies", Some(MOANA)),
            (Method::Get, "/v1/movies/1", None),
        ] {
            let resp = send(&server, method, path, body).await;
            assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(
                json(&resp)["error"],
                "the server encountered a problem and could not process your request"
            );
        }
    }

    #[tokio::test]
    async fn test_noop_store_accepts_everything() {
        let state = AppState::new(Config::default(), NoopMovieStore);
        let server = build_server(&state).unwrap();

        let resp = send(&server, Method::Post, "/v1/movies", Some(MOANA)).await;
        assert_eq!(resp.status, StatusCode::CREATED);

        let resp = send(&server, Method::Delete, "/v1/movies/5", None).await;
        assert_eq!(resp.status, StatusCode::OK);
    }
}
