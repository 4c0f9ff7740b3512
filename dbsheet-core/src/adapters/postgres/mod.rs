//! PostgreSQL catalog adapter.
//!
//! # Module Structure
//! - `connection`: pool creation, URL validation and session settings
//! - `catalog`: information_schema queries for columns, keys and comments
//! - `type_mapping`: rendering of column types as documentation strings
//!
//! # Security Guarantees
//! - All operations are read-only (every session sets
//!   `default_transaction_read_only`)
//! - Connection strings are sanitized in error messages
//! - Statement timeouts bound every catalog query

mod catalog;
mod connection;
mod type_mapping;


use super::{CatalogSource, ConnectionConfig};
use crate::{
    Result,
    models::{DatabaseType, TableCatalog},
};
use async_trait::async_trait;
use sqlx::PgPool;

pub use type_mapping::render_type_name;

/// PostgreSQL catalog adapter backed by a connection pool
pub struct PostgresAdapter {
    pub pool: PgPool,
    pub config: ConnectionConfig,
}

impl std::fmt::Debug for PostgresAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresAdapter")
            .field("config", &self.config)
            .field("pool_size", &self.pool.size())
            .field("pool_idle", &self.pool.num_idle())
            .finish()
    }
}

#[async_trait]
impl CatalogSource for PostgresAdapter {
    async fn test_connection(&self) -> Result<()> {
        let connectivity_result: i32 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(crate::error::DbSheetError::connection_failed)?;

        if connectivity_result != 1 {
            return Err(crate::error::DbSheetError::configuration(
                "Basic connectivity test failed: unexpected result",
            ));
        }

        self.validate_catalog_privileges().await
    }

    async fn list_tables(&self, schema: &str) -> Result<Vec<String>> {
        self.collect_table_names(schema).await
    }

    async fn fetch_table_catalog(&self, schema: &str, table: &str) -> Result<TableCatalog> {
        catalog::fetch_table_catalog(self, schema, table).await
    }

    fn database_type(&self) -> DatabaseType {
        DatabaseType::PostgreSQL
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
