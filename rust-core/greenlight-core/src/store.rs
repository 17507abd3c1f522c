//! # Movie Store
//!
//! Persistence for [`Movie`] records.
//!
//! [`SqlMovieStore`] is the live store over a [`DatabasePool`];
//! [`NoopMovieStore`] satisfies the same trait without touching anything
//! and exists to exercise call sites in tests.
//!
//! `update` bumps `version` by exactly one in the same statement that
//! writes the row. It is keyed by id only: the version the caller read is
//! not compared, so two overlapping read-modify-write cycles end in
//! last-write-wins.

use crate::database::DatabasePool;
use crate::error::{Error, Result};
use crate::movie::Movie;
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

/// CRUD operations over the movies table
#[async_trait]
pub trait MovieStore: Send + Sync {
    /// Insert `movie`, filling in `id`, `created_at` and `version`
    async fn insert(&self, movie: &mut Movie) -> Result<()>;

    /// Fetch a movie by id
    ///
    /// Returns `Err(Error::RecordNotFound)` if the movie doesn't exist.
    async fn get(&self, id: i64) -> Result<Movie>;

    /// Write every settable field of `movie` and bump its version
    ///
    /// Returns `Err(Error::RecordNotFound)` if the movie doesn't exist.
    async fn update(&self, movie: &mut Movie) -> Result<()>;

    /// Hard-delete a movie by id
    ///
    /// Returns `Err(Error::RecordNotFound)` if nothing was deleted.
    async fn delete(&self, id: i64) -> Result<()>;
}

mod pg {
    pub const INSERT: &str = "
        INSERT INTO movies (title, year, runtime, genres)
        VALUES ($1, $2, $3, $4)
        RETURNING id, created_at, version";

    pub const GET: &str = "
        SELECT id, created_at, title, year, runtime, genres, version
        FROM movies
        WHERE id = $1";

    pub const UPDATE: &str = "
        UPDATE movies
        SET title = $1, year = $2, runtime = $3, genres = $4, version = version + 1
        WHERE id = $5
        RETURNING version";

    pub const DELETE: &str = "
        DELETE FROM movies
        WHERE id = $1";
}

mod sqlite {
    pub const INSERT: &str = "
        INSERT INTO movies (title, year, runtime, genres)
        VALUES (?1, ?2, ?3, ?4)
        RETURNING id, created_at, version";

    pub const GET: &str = "
        SELECT id, created_at, title, year, runtime, genres, version
        FROM movies
        WHERE id = ?1";

    pub const UPDATE: &str = "
        UPDATE movies
        SET title = ?1, year = ?2, runtime = ?3, genres = ?4, version = version + 1
        WHERE id = ?5
        RETURNING version";

    pub const DELETE: &str = "
        DELETE FROM movies
        WHERE id = ?1";
}

/// Live store backed by a SQL database
///
/// PostgreSQL keeps `genres` as `text[]`; SQLite keeps it as a JSON array
/// in a text column.
#[derive(Clone, Debug)]
pub struct SqlMovieStore {
    db: DatabasePool,
}

impl SqlMovieStore {
    /// Create a store over a shared pool
    #[must_use]
    pub const fn new(db: DatabasePool) -> Self {
        Self { db }
    }

    /// The underlying pool
    #[must_use]
    pub const fn pool(&self) -> &DatabasePool {
        &self.db
    }
}

#[async_trait]
impl MovieStore for SqlMovieStore {
    async fn insert(&self, movie: &mut Movie) -> Result<()> {
        match &self.db {
            DatabasePool::Postgres(pool) => {
                let row = sqlx::query(pg::INSERT)
                    .bind(&movie.title)
                    .bind(movie.year)
                    .bind(movie.runtime)
                    .bind(&movie.genres)
                    .fetch_one(pool)
                    .await
                    .map_err(infrastructure)?;
                movie.id = row.try_get("id")?;
                movie.created_at = row.try_get("created_at")?;
                movie.version = row.try_get("version")?;
            }
            DatabasePool::Sqlite(pool) => {
                let row = sqlx::query(sqlite::INSERT)
                    .bind(&movie.title)
                    .bind(movie.year)
                    .bind(movie.runtime)
                    .bind(serde_json::to_string(&movie.genres)?)
                    .fetch_one(pool)
                    .await
                    .map_err(infrastructure)?;
                movie.id = row.try_get("id")?;
                movie.created_at = row.try_get("created_at")?;
                movie.version = row.try_get("version")?;
            }
        }
        Ok(())
    }

    async fn get(&self, id: i64) -> Result<Movie> {
        if id < 1 {
            return Err(Error::RecordNotFound);
        }

        match &self.db {
            DatabasePool::Postgres(pool) => {
                let row = sqlx::query(pg::GET).bind(id).fetch_optional(pool).await?;
                row.as_ref().map_or(Err(Error::RecordNotFound), pg_row_to_movie)
            }
            DatabasePool::Sqlite(pool) => {
                let row = sqlx::query(sqlite::GET)
                    .bind(id)
                    .fetch_optional(pool)
                    .await?;
                row.as_ref()
                    .map_or(Err(Error::RecordNotFound), sqlite_row_to_movie)
            }
        }
    }

    async fn update(&self, movie: &mut Movie) -> Result<()> {
        let version: Option<i32> = match &self.db {
            DatabasePool::Postgres(pool) => {
                sqlx::query_scalar(pg::UPDATE)
                    .bind(&movie.title)
                    .bind(movie.year)
                    .bind(movie.runtime)
                    .bind(&movie.genres)
                    .bind(movie.id)
                    .fetch_optional(pool)
                    .await?
            }
            DatabasePool::Sqlite(pool) => {
                sqlx::query_scalar(sqlite::UPDATE)
                    .bind(&movie.title)
                    .bind(movie.year)
                    .bind(movie.runtime)
                    .bind(serde_json::to_string(&movie.genres)?)
                    .bind(movie.id)
                    .fetch_optional(pool)
                    .await?
            }
        };

        movie.version = version.ok_or(Error::RecordNotFound)?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        if id < 1 {
            return Err(Error::RecordNotFound);
        }

        let rows_affected = match &self.db {
            DatabasePool::Postgres(pool) => sqlx::query(pg::DELETE)
                .bind(id)
                .execute(pool)
                .await?
                .rows_affected(),
            DatabasePool::Sqlite(pool) => sqlx::query(sqlite::DELETE)
                .bind(id)
                .execute(pool)
                .await?
                .rows_affected(),
        };

        if rows_affected == 0 {
            return Err(Error::RecordNotFound);
        }
        Ok(())
    }
}

/// Map every sqlx error, including `RowNotFound`, to `Error::Database`
fn infrastructure(err: sqlx::Error) -> Error {
    Error::Database {
        message: err.to_string(),
    }
}

fn pg_row_to_movie(row: &PgRow) -> Result<Movie> {
    Ok(Movie {
        id: row.try_get("id")?,
        created_at: row.try_get("created_at")?,
        title: row.try_get("title")?,
        year: row.try_get("year")?,
        runtime: row.try_get("runtime")?,
        genres: row.try_get("genres")?,
        version: row.try_get("version")?,
    })
}

fn sqlite_row_to_movie(row: &SqliteRow) -> Result<Movie> {
    let genres: String = row.try_get("genres")?;
    Ok(Movie {
        id: row.try_get("id")?,
        created_at: row.try_get("created_at")?,
        title: row.try_get("title")?,
        year: row.try_get("year")?,
        runtime: row.try_get("runtime")?,
        genres: serde_json::from_str(&genres)?,
        version: row.try_get("version")?,
    })
}

/// Store that accepts every call and does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMovieStore;

#[async_trait]
impl MovieStore for NoopMovieStore {
    async fn insert(&self, _movie: &mut Movie) -> Result<()> {
        Ok(())
    }

    async fn get(&self, _id: i64) -> Result<Movie> {
        Ok(Movie::default())
    }

    async fn update(&self, _movie: &mut Movie) -> Result<()> {
        Ok(())
    }

    async fn delete(&self, _id: i64) -> Result<()> {
        Ok(())
    }
}
