//! # Validation Module
//!
//! Field-keyed validation errors for API responses.
//!
//! A [`Validator`] lives for a single request. Each field keeps the first
//! message recorded against it; later failures on the same field are dropped,
//! so the order of checks decides which message the client sees.

use std::collections::{BTreeMap, HashSet};
use std::hash::Hash;

/// Field name to error message mapping
pub type ValidationErrors = BTreeMap<String, String>;

/// Accumulates validation failures, at most one per field
#[derive(Debug, Clone, Default)]
pub struct Validator {
    errors: ValidationErrors,
}

impl Validator {
    /// Create an empty validator
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message` under `field` unless the field already failed
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_insert_with(|| message.into());
    }

    /// Record `message` under `field` when `ok` is false
    pub fn check(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.add_error(field, message);
        }
    }

    /// True when no errors were recorded
    #[must_use]
    pub fn valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// True when at least one error was recorded
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.valid()
    }

    /// Recorded errors keyed by field
    #[must_use]
    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    /// Consume the validator, returning its errors
    #[must_use]
    pub fn into_errors(self) -> ValidationErrors {
        self.errors
    }
}

/// True if `value` appears in `permitted`
pub fn permitted_value<T: PartialEq>(value: &T, permitted: &[T]) -> bool {
    permitted.contains(value)
}

/// True if no two elements of `values` are equal
pub fn unique<T: Eq + Hash>(values: &[T]) -> bool {
    let mut seen = HashSet::with_capacity(values.len());
    values.iter().all(|v| seen.insert(v))
}
