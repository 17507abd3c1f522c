//! # HTTP Response
//!
//! Network-agnostic response produced by handlers and converted to a hyper
//! response at the edge.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderMap, HeaderName, HeaderValue};
use hyper::{Response, StatusCode};

/// Response returned by every handler
#[derive(Debug, Clone)]
pub struct JsonResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body
    pub body: Bytes,
}

impl Default for JsonResponse {
    fn default() -> Self {
        Self::empty(StatusCode::OK)
    }
}

impl JsonResponse {
    /// Create a response with a body and no headers
    #[must_use]
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Create a bodiless response
    #[must_use]
    pub fn empty(status: StatusCode) -> Self {
        Self::new(status, Bytes::new())
    }

    /// Status code as a number
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// Get a header value by name
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Set or override a header; invalid names or values are ignored
    pub fn set_header(&mut self, name: &str, value: &str) {
        if let (Ok(n), Ok(v)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(n, v);
        }
    }

    /// Body as UTF-8 text
    #[must_use]
    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    /// Convert to hyper Response
    pub(crate) fn into_hyper(self) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_response() {
        let resp = JsonResponse::empty(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp.status_code(), 500);
        assert!(resp.body.is_empty());
        assert!(resp.headers.is_empty());
    }

    #[test]
    fn test_set_header_overrides() {
        let mut resp = JsonResponse::new(StatusCode::OK, "{}");
        resp.set_header("Location", "/v1/movies/1");
        resp.set_header("location", "/v1/movies/2");
        assert_eq!(resp.header("Location"), Some("/v1/movies/2"));
        assert_eq!(resp.headers.len(), 1);
    }

    #[test]
    fn test_into_hyper_keeps_status_and_headers() {
        let mut resp = JsonResponse::new(StatusCode::CREATED, "{}");
        resp.set_header("x-request-id", "abc");
        let hyper_resp = resp.into_hyper();
        assert_eq!(hyper_resp.status(), StatusCode::CREATED);
        assert_eq!(
            hyper_resp.headers().get("x-request-id").map(HeaderValue::as_bytes),
            Some(&b"abc"[..])
        );
    }
}
