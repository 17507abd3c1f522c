//! # JSON Envelope Codec
//!
//! Reads request bodies strictly and writes every response as a
//! pretty-printed `{"key": payload}` envelope.
//!
//! Decoding accepts exactly one JSON value of at most `max_bytes` bytes and
//! turns each serde_json failure into a [`DecodeError`] whose `Display` is
//! the message sent back to the client. Unknown keys are rejected by the
//! destination type (`#[serde(deny_unknown_fields)]`).

use crate::error::Result;
use crate::response::JsonResponse;
use hyper::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use hyper::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::error::Category;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Default request body ceiling (1 MiB)
pub const MAX_BODY_BYTES: usize = 1_048_576;

/// Classified request body decode failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Malformed syntax at a byte offset
    #[error("body contains badly-formed JSON (at character {offset})")]
    Syntax {
        /// Byte offset of the failure
        offset: usize,
    },

    /// Body ended in the middle of a value
    #[error("body contains badly-formed JSON")]
    Truncated,

    /// A field holds a value of the wrong type
    #[error("body contains incorrect JSON type for field {field:?}")]
    FieldType {
        /// Top-level key whose value did not fit
        field: String,
    },

    /// Type mismatch that could not be attributed to a field
    #[error("body contains incorrect JSON type (at character {offset})")]
    Type {
        /// Byte offset of the failure
        offset: usize,
    },

    /// Nothing but whitespace
    #[error("body must not be empty")]
    Empty,

    /// Body exceeds the ceiling
    #[error("body must not be larger than {limit} bytes")]
    TooLarge {
        /// The ceiling in bytes
        limit: usize,
    },

    /// Content follows the first value
    #[error("body must contain a single JSON value")]
    TrailingValue,

    /// Anything else, passed through unchanged
    #[error("{0}")]
    Other(String),
}

/// Decode exactly one JSON value from `body`
///
/// # Errors
///
/// Returns the [`DecodeError`] describing why the body was rejected.
///
/// # Panics
///
/// Panics if serde_json reports an I/O failure, which cannot happen for an
/// in-memory body and means the decoder was misused.
pub fn decode_json<T: DeserializeOwned>(
    body: &[u8],
    max_bytes: usize,
) -> std::result::Result<T, DecodeError> {
    if body.len() > max_bytes {
        return Err(DecodeError::TooLarge { limit: max_bytes });
    }
    if body.iter().all(|b| is_json_whitespace(*b)) {
        return Err(DecodeError::Empty);
    }

    let mut de = serde_json::Deserializer::from_slice(body);
    let value = T::deserialize(&mut de).map_err(|e| classify(body, &e))?;
    de.end().map_err(|_| DecodeError::TrailingValue)?;

    Ok(value)
}

/// Insignificant whitespace as JSON defines it (no form feed or vertical tab)
const fn is_json_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

fn classify(body: &[u8], err: &serde_json::Error) -> DecodeError {
    let offset = byte_offset(body, err.line(), err.column());
    match err.classify() {
        Category::Syntax => DecodeError::Syntax { offset },
        Category::Eof => DecodeError::Truncated,
        Category::Data => {
            let message = err.to_string();
            // unknown, missing and duplicate fields are data errors too
            if !is_type_mismatch(&message) {
                return DecodeError::Other(message);
            }
            match field_at(body, offset) {
                Some(field) => DecodeError::FieldType { field },
                None => DecodeError::Type { offset },
            }
        }
        Category::Io => panic!("in-memory JSON decode reported an I/O error: {err}"),
    }
}

/// serde's `invalid_type`, `invalid_value` and `invalid_length` messages
fn is_type_mismatch(message: &str) -> bool {
    ["invalid type", "invalid value", "invalid length"]
        .iter()
        .any(|prefix| message.starts_with(prefix))
}

/// Convert serde_json's 1-based line and column into a byte offset
fn byte_offset(body: &[u8], line: usize, column: usize) -> usize {
    let preceding: usize = body
        .split(|b| *b == b'\n')
        .take(line.saturating_sub(1))
        .map(|l| l.len() + 1)
        .sum();
    preceding + column
}

/// Find the top-level object key whose value spans `offset`
fn field_at(body: &[u8], offset: usize) -> Option<String> {
    let end = offset.min(body.len());
    let mut depth = 0usize;
    let mut top_is_object = false;
    let mut expect_key = false;
    let mut field = None;
    let mut i = 0;

    while i < end {
        match body[i] {
            b'{' => {
                if depth == 0 {
                    top_is_object = true;
                    expect_key = true;
                }
                depth += 1;
            }
            b'[' => depth += 1,
            b'}' | b']' => depth = depth.saturating_sub(1),
            b',' if depth == 1 => expect_key = true,
            b'"' => {
                let start = i + 1;
                i = start;
                while i < body.len() && body[i] != b'"' {
                    if body[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                if depth == 1 && top_is_object && expect_key {
                    let key = body.get(start..i.min(body.len()))?;
                    field = Some(String::from_utf8_lossy(key).into_owned());
                    expect_key = false;
                }
            }
            _ => {}
        }
        i += 1;
    }

    field
}

/// Single-level JSON wrapper used for every response body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Envelope(BTreeMap<String, Value>);

impl Envelope {
    /// Wrap `payload` under `key`
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` if the payload cannot be represented as JSON.
    pub fn wrap<T: Serialize + ?Sized>(key: &str, payload: &T) -> Result<Self> {
        Self::default().with(key, payload)
    }

    /// Add another key to the envelope
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` if the payload cannot be represented as JSON.
    pub fn with<T: Serialize + ?Sized>(mut self, key: &str, payload: &T) -> Result<Self> {
        self.0.insert(key.to_string(), serde_json::to_value(payload)?);
        Ok(self)
    }

    /// Look up a wrapped payload
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

/// Serialize `data` into a JSON response
///
/// The body is tab-indented with a trailing newline. Headers in `extra`
/// replace same-named defaults; `Content-Type` is always JSON.
///
/// # Errors
///
/// Returns `Error::Json` if serialization fails.
pub fn write_json(
    status: StatusCode,
    data: &Envelope,
    extra: Option<&HeaderMap>,
) -> Result<JsonResponse> {
    let mut body = Vec::with_capacity(128);
    let formatter = PrettyFormatter::with_indent(b"\t");
    let mut ser = serde_json::Serializer::with_formatter(&mut body, formatter);
    data.serialize(&mut ser)?;
    body.push(b'\n');

    let mut response = JsonResponse::new(status, body);
    if let Some(extra) = extra {
        for key in extra.keys() {
            response.headers.remove(key);
            for value in extra.get_all(key) {
                response.headers.append(key.clone(), value.clone());
            }
        }
    }
    response
        .headers
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    Ok(response)
}
