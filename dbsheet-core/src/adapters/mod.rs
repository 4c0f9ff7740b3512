//! Catalog adapters: read-only access to a database's metadata views.
//!
//! Every adapter implements [`CatalogSource`], the seam between the
//! database and the [`Collector`](crate::collector::Collector). The trait
//! is object-safe so the binary can hold a `Box<dyn CatalogSource>` picked
//! from the connection string.
//!
//! # Module Structure
//! - `config`: `ConnectionConfig`
//! - `helpers`: row decoding helpers shared by SQL adapters
//! - `postgres`: PostgreSQL catalog adapter

use crate::{
    Result,
    models::{DatabaseType, TableCatalog},
};
use async_trait::async_trait;

pub mod config;

#[cfg(feature = "postgresql")]
pub mod helpers;

#[cfg(feature = "postgresql")]
pub mod postgres;

pub use config::ConnectionConfig;

/// Source of raw catalog metadata for tables in a schema.
///
/// # Security Guarantees
/// - All operations are read-only
/// - Credentials are never stored or logged
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Tests the connection and verifies catalog access.
    ///
    /// # Errors
    /// Returns error if the connection fails or the catalog is not readable
    async fn test_connection(&self) -> Result<()>;

    /// Lists the base tables of `schema`, ordered by name.
    async fn list_tables(&self, schema: &str) -> Result<Vec<String>>;

    /// Runs the column, primary key, foreign key and comment lookups for
    /// one table.
    ///
    /// Columns come back in catalog ordinal order. An unknown table yields
    /// an empty column list; deciding that this is an error is left to the
    /// caller.
    async fn fetch_table_catalog(&self, schema: &str, table: &str) -> Result<TableCatalog>;

    /// Returns the database type this adapter handles.
    fn database_type(&self) -> DatabaseType;

    /// Releases pooled connections. The default does nothing.
    async fn close(&self) {}
}

/// Creates a catalog adapter for the given connection string.
///
/// The pool connects lazily, so this succeeds without a reachable server;
/// the first query surfaces connection errors.
///
/// # Errors
/// Returns error if:
/// - Connection string format is invalid
/// - Database type is not supported
/// - Required features are not compiled in
pub async fn create_catalog_source(connection_string: &str) -> Result<Box<dyn CatalogSource>> {
    let database_type = detect_database_type(connection_string)?;

    match database_type {
        #[cfg(feature = "postgresql")]
        DatabaseType::PostgreSQL => {
            let adapter = postgres::PostgresAdapter::new(connection_string).await?;
            Ok(Box::new(adapter))
        }
        #[cfg(not(feature = "postgresql"))]
        DatabaseType::PostgreSQL => Err(crate::error::DbSheetError::configuration(
            "PostgreSQL support not compiled in. Build with --features postgresql",
        )),
    }
}

/// Safely redacts credentials from database connection URLs.
///
/// Delegates to [`crate::error::redact_database_url`].
#[inline]
pub fn redact_database_url(url: &str) -> String {
    crate::error::redact_database_url(url)
}

/// Detects database type from connection string.
///
/// # Errors
/// Returns error if the scheme is not a supported database
pub fn detect_database_type(connection_string: &str) -> Result<DatabaseType> {
    if connection_string.starts_with("postgres://")
        || connection_string.starts_with("postgresql://")
    {
        Ok(DatabaseType::PostgreSQL)
    } else {
        Err(crate::error::DbSheetError::configuration(format!(
            "Unsupported database URL '{}': expected postgres:// or postgresql://",
            redact_database_url(connection_string)
        )))
    }
}
