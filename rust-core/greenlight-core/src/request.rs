//! # HTTP Request
//!
//! Request wrapper handed to handlers.
//!
//! The body is collected once, up to the configured ceiling. A body that
//! crosses the ceiling is not kept; it is marked [`RequestBody::Oversized`]
//! so decoding can report the size error instead of a parse error.

use crate::error::{Error, Result};
use crate::json::{decode_json, DecodeError, MAX_BODY_BYTES};
use crate::router::Method;
use crate::types::ParamValue;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Bytes;
use hyper::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_LENGTH};
use hyper::Request;
use serde::de::DeserializeOwned;
use std::collections::HashMap;

/// Collected request body
#[derive(Debug, Clone)]
pub enum RequestBody {
    /// The full body
    Complete(Bytes),
    /// The body crossed the size ceiling and was discarded
    Oversized,
}

impl Default for RequestBody {
    fn default() -> Self {
        Self::Complete(Bytes::new())
    }
}

/// HTTP request as seen by handlers
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// HTTP method
    pub method: Method,
    /// Request path (without query string)
    pub path: String,
    /// Typed path parameters
    pub params: HashMap<String, ParamValue>,
    /// Request headers
    headers: HeaderMap,
    /// Request body
    body: RequestBody,
    /// Ceiling applied when the body was read
    max_body_bytes: usize,
}

impl ApiRequest {
    /// Create a request manually (for testing/internal use)
    ///
    /// Any query string on `path` is dropped.
    pub fn new(
        method: Method,
        path: &str,
        headers_map: HashMap<String, String>,
        body: Option<Bytes>,
    ) -> Self {
        let path = path.split_once('?').map_or(path, |(p, _)| p).to_string();

        let mut headers = HeaderMap::new();
        for (k, v) in headers_map {
            if let (Ok(n), Ok(v)) = (
                HeaderName::from_bytes(k.as_bytes()),
                HeaderValue::from_str(&v),
            ) {
                headers.insert(n, v);
            }
        }

        Self {
            method,
            path,
            params: HashMap::new(),
            headers,
            body: RequestBody::Complete(body.unwrap_or_default()),
            max_body_bytes: MAX_BODY_BYTES,
        }
    }

    /// Override the body ceiling, marking an existing body oversized if needed
    #[must_use]
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        if let RequestBody::Complete(bytes) = &self.body {
            if bytes.len() > max_body_bytes {
                self.body = RequestBody::Oversized;
            }
        }
        self.max_body_bytes = max_body_bytes;
        self
    }

    /// Create from a hyper request, reading at most `max_body_bytes`
    ///
    /// # Errors
    ///
    /// Returns `Error::MethodNotAllowed` for methods the router never serves
    /// and `Error::Http`/`Error::Io` if the body stream fails.
    pub async fn from_hyper_with_limit(
        req: Request<hyper::body::Incoming>,
        max_body_bytes: usize,
    ) -> Result<Self> {
        let path = req.uri().path().to_string();
        let method = Method::from_hyper(req.method()).ok_or_else(|| Error::MethodNotAllowed {
            method: req.method().to_string(),
            path: path.clone(),
        })?;

        let headers = req.headers().clone();
        let declared_len = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok());

        let body = if declared_len.is_some_and(|len| len > max_body_bytes) {
            RequestBody::Oversized
        } else {
            match Limited::new(req.into_body(), max_body_bytes).collect().await {
                Ok(collected) => RequestBody::Complete(collected.to_bytes()),
                Err(e) if e.is::<LengthLimitError>() => RequestBody::Oversized,
                Err(e) => {
                    return Err(match e.downcast::<hyper::Error>() {
                        Ok(hyper_err) => Error::Http(*hyper_err),
                        Err(other) => Error::Io(std::io::Error::other(other)),
                    })
                }
            }
        };

        Ok(Self {
            method,
            path,
            params: HashMap::new(),
            headers,
            body,
            max_body_bytes,
        })
    }

    /// Get a header value by name (case-insensitive)
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Set or override a header
    pub fn set_header(&mut self, name: &str, value: &str) {
        if let (Ok(n), Ok(v)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(n, v);
        }
    }

    /// The collected body
    #[must_use]
    pub const fn body(&self) -> &RequestBody {
        &self.body
    }

    /// Decode the body as a single JSON value
    ///
    /// # Errors
    ///
    /// Returns the classified [`DecodeError`].
    pub fn read_json<T: DeserializeOwned>(&self) -> std::result::Result<T, DecodeError> {
        match &self.body {
            RequestBody::Oversized => Err(DecodeError::TooLarge {
                limit: self.max_body_bytes,
            }),
            RequestBody::Complete(bytes) => decode_json(bytes, self.max_body_bytes),
        }
    }

    /// Read the positive `id` path parameter
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidParam` if the parameter is missing, not an
    /// integer, or less than 1.
    pub fn read_id_param(&self) -> Result<i64> {
        self.params
            .get("id")
            .and_then(ParamValue::as_int)
            .filter(|id| *id >= 1)
            .ok_or_else(|| Error::InvalidParam {
                name: "id".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movie::MovieInput;

    fn request_with_body(body: &str) -> ApiRequest {
        ApiRequest::new(
            Method::Post,
            "/v1/movies",
            HashMap::new(),
            Some(Bytes::from(body.to_string())),
        )
    }

    #[test]
    fn test_new_strips_query_string() {
        let req = ApiRequest::new(Method::Get, "/v1/movies/1?x=y", HashMap::new(), None);
        assert_eq!(req.path, "/v1/movies/1");
    }

    #[test]
    fn test_headers_case_insensitive() {
        let mut headers = HashMap::new();
        headers.insert("X-Request-Id".to_string(), "abc".to_string());
        let mut req = ApiRequest::new(Method::Get, "/", headers, None);

        assert_eq!(req.header("x-request-id"), Some("abc"));
        req.set_header("x-request-id", "def");
        assert_eq!(req.header("X-REQUEST-ID"), Some("def"));
    }

    #[test]
    fn test_read_json() {
        let req = request_with_body(r#"{"title":"Up"}"#);
        let input: MovieInput = req.read_json().unwrap();
        assert_eq!(input.title, "Up");
    }

    #[test]
    fn test_read_json_without_body() {
        let req = ApiRequest::new(Method::Post, "/v1/movies", HashMap::new(), None);
        let err = req.read_json::<MovieInput>().unwrap_err();
        assert_eq!(err, DecodeError::Empty);
    }

    #[test]
    fn test_read_json_oversized() {
        let req = request_with_body(r#"{"title":"A long enough title"}"#).with_max_body_bytes(8);
        assert!(matches!(req.body(), RequestBody::Oversized));
        let err = req.read_json::<MovieInput>().unwrap_err();
        assert_eq!(err.to_string(), "body must not be larger than 8 bytes");
    }

    #[test]
    fn test_read_id_param() {
        let mut req = ApiRequest::new(Method::Get, "/v1/movies/5", HashMap::new(), None);
        assert!(req.read_id_param().is_err());

        req.params.insert("id".to_string(), ParamValue::Int(5));
        assert_eq!(req.read_id_param().unwrap(), 5);

        req.params.insert("id".to_string(), ParamValue::Int(0));
        assert!(req.read_id_param().is_err());

        req.params.insert("id".to_string(), ParamValue::Int(-3));
        assert!(req.read_id_param().is_err());

        req.params
            .insert("id".to_string(), ParamValue::String("abc".to_string()));
        let err = req.read_id_param().unwrap_err();
        assert_eq!(err.to_string(), "invalid id parameter");
    }
}
