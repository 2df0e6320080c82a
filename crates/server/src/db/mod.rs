//! Database access for the back office `PostgreSQL` instance.
//!
//! # Tables
//!
//! - `users` / `addresses` - Customers, admins, and their shipping addresses
//! - `categories` / `sizes` / `colors` - Catalog lookups
//! - `products` / `product_variants` / `product_images` - The catalog itself
//! - `orders` / `order_items` / `payments` - Orders and their payment records
//! - `cart_items` - Per-user carts
//! - `return_requests` - Customer return requests
//!
//! Queries use runtime-checked `sqlx::query`/`query_as` so the workspace
//! builds without a live database. Repositories return domain models from
//! [`crate::models`]; multi-statement operations that must be atomic take a
//! `&mut PgConnection` so the calling service controls the transaction.
//!
//! # Migrations
//!
//! Migrations live in `crates/server/migrations/` and run on startup via
//! `sqlx::migrate!`.

pub mod carts;
pub mod catalog;
pub mod orders;
pub mod returns;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Errors surfaced by the repository layer.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The requested row does not exist.
    #[error("not found")]
    NotFound,

    /// A uniqueness constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A stored value could not be mapped back to a domain type.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

impl RepositoryError {
    /// Map a sqlx error, converting unique violations into `Conflict`.
    pub(crate) fn from_sqlx(e: sqlx::Error, conflict_msg: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return Self::Conflict(conflict_msg.to_owned());
        }
        Self::Database(e)
    }
}
