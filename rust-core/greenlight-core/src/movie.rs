//! # Movie Model
//!
//! The movie record, its client-settable input and the validation rules
//! every record must pass before it reaches the store.

use crate::validation::{unique, Validator};
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

/// Earliest year a movie can have been released
pub const MIN_YEAR: i32 = 1888;

/// Maximum title length in bytes
pub const MAX_TITLE_BYTES: usize = 500;

/// Maximum number of genres per movie
pub const MAX_GENRES: usize = 5;

/// A persisted movie
///
/// `id`, `created_at` and `version` are owned by the store. `created_at`
/// is never serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movie {
    /// Store-assigned identity
    pub id: i64,
    /// Creation timestamp
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
    /// Movie title
    pub title: String,
    /// Release year
    #[serde(default, skip_serializing_if = "is_zero")]
    pub year: i32,
    /// Runtime in minutes
    #[serde(default, skip_serializing_if = "is_zero")]
    pub runtime: i32,
    /// Ordered genre list
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<String>,
    /// Concurrency token, bumped by the store on every update
    pub version: i32,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_zero(value: &i32) -> bool {
    *value == 0
}

impl Movie {
    /// Overwrite every client-settable field from `input`
    pub fn apply(&mut self, input: MovieInput) {
        self.title = input.title;
        self.year = input.year;
        self.runtime = input.runtime;
        self.genres = input.genres.unwrap_or_default();
    }
}

impl From<MovieInput> for Movie {
    fn from(input: MovieInput) -> Self {
        let mut movie = Self::default();
        movie.apply(input);
        movie
    }
}

/// Request body for creating or replacing a movie
///
/// Missing fields take their zero value so validation can report them.
/// Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MovieInput {
    /// Movie title
    #[serde(default)]
    pub title: String,
    /// Release year
    #[serde(default)]
    pub year: i32,
    /// Runtime in minutes
    #[serde(default)]
    pub runtime: i32,
    /// Genre list; `None` when the key was absent or null
    #[serde(default)]
    pub genres: Option<Vec<String>>,
}

/// The current calendar year (UTC)
pub fn current_year() -> i32 {
    Utc::now().year()
}

/// Run every movie rule against `movie`, recording failures in `v`
///
/// Checks run in a fixed order; the first failure per field wins.
pub fn validate_movie(v: &mut Validator, movie: &MovieInput) {
    v.check(!movie.title.is_empty(), "title", "must be provided");
    v.check(
        movie.title.len() <= MAX_TITLE_BYTES,
        "title",
        "must not be more than 500 bytes long",
    );

    v.check(movie.year >= 0, "year", "year must be provided");
    v.check(movie.year >= MIN_YEAR, "year", "year must be greater than 1888");
    v.check(
        movie.year <= current_year(),
        "year",
        "year must not be in the future",
    );

    v.check(movie.runtime != 0, "runtime", "runtime must be provided");
    v.check(movie.runtime > 0, "runtime", "runtime must be positive integer");

    let genres = movie.genres.as_deref();
    v.check(genres.is_some(), "genres", "genres must be provided");
    let genres = genres.unwrap_or_default();
    v.check(!genres.is_empty(), "genres", "must contain at least 1 genre");
    v.check(
        genres.len() <= MAX_GENRES,
        "genres",
        "must not contain more than 5 genres",
    );
    v.check(unique(genres), "genres", "genres must be unique");
}
