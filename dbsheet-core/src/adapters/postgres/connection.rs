//! PostgreSQL connection pool management and validation.

use super::{ConnectionConfig, PostgresAdapter};
use crate::Result;
use crate::adapters::helpers::catalog_query_error;
use crate::error::DbSheetError;
use sqlx::PgPool;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnectOptions, Postgres};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// PostgreSQL role and database names are limited to 63 bytes
const MAX_IDENTIFIER_LENGTH: usize = 63;

impl PostgresAdapter {
    /// Creates a new PostgreSQL adapter with a lazily connecting pool.
    ///
    /// # Errors
    /// Returns error if the connection string is malformed, uses another
    /// scheme, or carries out-of-range pool parameters.
    pub async fn new(connection_string: &str) -> Result<Self> {
        let config = Self::parse_connection_config(connection_string)?;
        let pool = Self::create_connection_pool(connection_string, &config).await?;

        Ok(Self { pool, config })
    }

    /// Acquire a connection from the pool.
    ///
    /// The connection goes back to the pool when the guard is dropped, on
    /// success and on error alike.
    ///
    /// # Errors
    /// Returns `DbSheetError::Connection` if no connection can be acquired
    /// within the configured `connect_timeout`.
    pub async fn acquire(&self) -> Result<PoolConnection<Postgres>> {
        self.pool.acquire().await.map_err(|e| match e {
            sqlx::Error::PoolTimedOut => DbSheetError::Connection {
                context: format!(
                    "Timed out after {}s waiting for a pooled connection",
                    self.config.connect_timeout.as_secs()
                ),
                source: Box::new(e),
            },
            other => DbSheetError::connection_failed(other),
        })
    }

    /// Parses a connection string into a validated configuration.
    ///
    /// Recognized query parameters: `connect_timeout` (seconds, 1 to 300),
    /// `statement_timeout` (milliseconds, 1 to 300000) and `pool_max_conns`
    /// (1 to 100). Out-of-range values are ignored.
    ///
    /// # Errors
    /// Returns error if connection string is malformed or the database or
    /// user name exceeds 63 bytes
    pub fn parse_connection_config(connection_string: &str) -> Result<ConnectionConfig> {
        Self::validate_connection_string(connection_string)?;

        let url = Url::parse(connection_string).map_err(|e| {
            DbSheetError::configuration(format!(
                "Invalid PostgreSQL connection string format: {}",
                e
            ))
        })?;

        let mut config = ConnectionConfig::new(url.host_str().unwrap_or("localhost").to_string());

        match url.port() {
            Some(0) => {
                return Err(DbSheetError::configuration(
                    "Invalid port number: must be greater than 0",
                ));
            }
            Some(port) => config = config.with_port(port),
            None => config = config.with_port(5432),
        }

        // sqlx percent-decodes the user and database it will log in with
        let options = PgConnectOptions::from_str(connection_string).map_err(|e| {
            DbSheetError::configuration(format!("Invalid PostgreSQL connection options: {}", e))
        })?;

        if !url.path().trim_start_matches('/').is_empty()
            && let Some(database) = options.get_database()
        {
            check_identifier_length(database, "Database name")?;
            config = config.with_database(database.to_string());
        }

        if !url.username().is_empty() {
            let username = options.get_username();
            check_identifier_length(username, "Username")?;
            config = config.with_username(username.to_string());
        }

        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "connect_timeout" => {
                    if let Ok(timeout_secs) = value.parse::<u64>()
                        && (1..=300).contains(&timeout_secs)
                    {
                        config.connect_timeout = Duration::from_secs(timeout_secs);
                    }
                }
                "statement_timeout" => {
                    if let Ok(timeout_ms) = value.parse::<u64>()
                        && (1..=300_000).contains(&timeout_ms)
                    {
                        config.query_timeout = Duration::from_millis(timeout_ms);
                    }
                }
                "pool_max_conns" => {
                    if let Ok(max_conns) = value.parse::<u32>()
                        && (1..=100).contains(&max_conns)
                    {
                        config.max_connections = max_conns;
                    }
                }
                _ => {}
            }
        }

        config.validate()?;

        Ok(config)
    }

    /// Creates the connection pool.
    ///
    /// Every new connection runs the session setup below before it is
    /// handed out, so all catalog queries run read-only with a statement
    /// timeout.
    pub(crate) async fn create_connection_pool(
        connection_string: &str,
        config: &ConnectionConfig,
    ) -> Result<PgPool> {
        use sqlx::Executor;

        Self::validate_connection_string(connection_string)?;

        let query_timeout_ms = config.query_timeout.as_millis();
        let read_only = config.read_only;

        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.max_connections.min(100))
            .min_connections(config.min_idle_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(config.idle_timeout)
            .max_lifetime(config.max_lifetime)
            .test_before_acquire(true)
            .after_connect(move |conn, _meta| {
                Box::pin(async move {
                    conn.execute(
                        format!("SET statement_timeout = '{}ms'", query_timeout_ms).as_str(),
                    )
                    .await?;
                    conn.execute("SET lock_timeout = '30s'").await?;
                    conn.execute("SET idle_in_transaction_session_timeout = '60s'")
                        .await?;

                    let app_name = format!("dbsheet-{}", env!("CARGO_PKG_VERSION"));
                    conn.execute(format!("SET application_name = '{}'", app_name).as_str())
                        .await?;

                    if read_only {
                        conn.execute("SET default_transaction_read_only = on")
                            .await?;
                    }

                    Ok(())
                })
            })
            .connect_lazy(connection_string)
            .map_err(|e| DbSheetError::Connection {
                context: format!(
                    "Failed to create PostgreSQL connection pool to {}",
                    crate::adapters::redact_database_url(connection_string)
                ),
                source: Box::new(e),
            })?;

        Ok(pool)
    }

    /// Validates connection string format.
    ///
    /// # Errors
    /// Returns error if the string is not a `postgres://` or
    /// `postgresql://` URL with a host, or if `statement_timeout` exceeds
    /// five minutes
    pub fn validate_connection_string(connection_string: &str) -> Result<()> {
        let url = Url::parse(connection_string).map_err(|e| {
            DbSheetError::configuration(format!(
                "Invalid PostgreSQL connection string format: {}",
                e
            ))
        })?;

        if !matches!(url.scheme(), "postgres" | "postgresql") {
            return Err(DbSheetError::configuration(
                "Connection string must use postgres:// or postgresql:// scheme",
            ));
        }

        if url.host_str().is_none_or(str::is_empty) {
            return Err(DbSheetError::configuration(
                "Connection string must specify a host",
            ));
        }

        for (key, value) in url.query_pairs() {
            if key == "statement_timeout"
                && let Ok(timeout_ms) = value.parse::<u64>()
                && timeout_ms > 300_000
            {
                return Err(DbSheetError::configuration(
                    "statement_timeout should not exceed 300 seconds",
                ));
            }
        }

        Ok(())
    }

    /// Verifies that the role can read the catalog views used for
    /// collection.
    pub(crate) async fn validate_catalog_privileges(&self) -> Result<()> {
        let tables_access: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = 'information_schema'",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            catalog_query_error(
                e,
                "information_schema.tables",
                "Failed to read information_schema.tables".to_string(),
            )
        })?;

        if tables_access == 0 {
            return Err(DbSheetError::insufficient_privileges(
                "No access to information_schema.tables",
            ));
        }

        let columns_access: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM information_schema.columns")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    catalog_query_error(
                        e,
                        "information_schema.columns",
                        "Failed to read information_schema.columns".to_string(),
                    )
                })?;

        if columns_access == 0 {
            tracing::warn!(
                "information_schema.columns returned 0 rows - this may indicate limited privileges"
            );
        }

        tracing::info!("Catalog privileges validated successfully");
        Ok(())
    }
}

/// Rejects database and role names over PostgreSQL's 63-byte limit.
/// Any other name is passed through; the server decides what exists.
fn check_identifier_length(value: &str, what: &str) -> Result<()> {
    if value.len() > MAX_IDENTIFIER_LENGTH {
        return Err(DbSheetError::configuration(format!(
            "{} too long: maximum {} bytes",
            what, MAX_IDENTIFIER_LENGTH
        )));
    }
    Ok(())
}
