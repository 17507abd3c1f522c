//! # Error Responses
//!
//! Maps failure outcomes to status codes and `{"error": ...}` envelopes.
//!
//! | Outcome | Status | Payload |
//! |---|---|---|
//! | internal failure | 500 | fixed opaque message, real error logged |
//! | resource absent | 404 | fixed message |
//! | method not routable | 405 | fixed message |
//! | malformed input | 400 | decode or parameter message |
//! | validation failure | 422 | field → message object |

use crate::error::Error;
use crate::json::{write_json, Envelope};
use crate::request::ApiRequest;
use crate::response::JsonResponse;
use crate::validation::ValidationErrors;
use hyper::StatusCode;
use serde::Serialize;
use std::fmt::Display;
use tracing::error;

/// Message sent for every internal failure
pub const SERVER_ERROR_MESSAGE: &str =
    "the server encountered a problem and could not process your request";

/// Message sent when a resource is absent
pub const NOT_FOUND_MESSAGE: &str = "the requested resource could not be found";

/// Message sent when a path exists but not for the method
pub const METHOD_NOT_ALLOWED_MESSAGE: &str =
    "the requested method is not supported for this resource";

/// Record `err` against the request in the operator log
pub fn log_error(req: &ApiRequest, err: &dyn Display) {
    error!(
        method = %req.method,
        path = %req.path,
        request_id = req.header("x-request-id").unwrap_or("-"),
        error = %err,
        "request failed"
    );
}

/// Wrap `message` under `"error"` with `status`
///
/// If the envelope cannot be encoded the response degrades to a bare 500.
pub fn error_response<T: Serialize + ?Sized>(status: StatusCode, message: &T) -> JsonResponse {
    match Envelope::wrap("error", message).and_then(|env| write_json(status, &env, None)) {
        Ok(response) => response,
        Err(e) => {
            error!(error = %e, status = status.as_u16(), "failed to encode error response");
            JsonResponse::empty(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// 500 with an opaque message; `err` goes to the log only
pub fn server_error_response(req: &ApiRequest, err: &Error) -> JsonResponse {
    log_error(req, err);
    error_response(StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR_MESSAGE)
}

/// 404
pub fn not_found_response() -> JsonResponse {
    error_response(StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE)
}

/// 405
pub fn method_not_allowed_response() -> JsonResponse {
    error_response(StatusCode::METHOD_NOT_ALLOWED, METHOD_NOT_ALLOWED_MESSAGE)
}

/// 400 carrying the error's message
pub fn bad_request_response(err: &dyn Display) -> JsonResponse {
    error_response(StatusCode::BAD_REQUEST, &err.to_string())
}

/// 422 carrying every field failure
pub fn failed_validation_response(errors: &ValidationErrors) -> JsonResponse {
    error_response(StatusCode::UNPROCESSABLE_ENTITY, errors)
}
