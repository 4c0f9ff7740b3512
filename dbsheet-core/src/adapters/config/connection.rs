//! Database connection configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the catalog connection pool.
///
/// # Security
/// This struct does NOT store passwords.
///
/// # Example
/// ```rust
/// use dbsheet_core::adapters::ConnectionConfig;
///
/// let config = ConnectionConfig::new("localhost".to_string())
///     .with_port(5432)
///     .with_database("mydb".to_string())
///     .with_username("admin".to_string());
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Database host address
    pub host: String,
    /// Optional port number
    pub port: Option<u16>,
    /// Optional database name
    pub database: Option<String>,
    /// Optional username (password handled separately)
    pub username: Option<String>,
    /// Pool acquire timeout
    pub connect_timeout: Duration,
    /// Per-statement timeout applied to every session
    pub query_timeout: Duration,
    /// Maximum number of connections in pool
    pub max_connections: u32,
    /// Connections kept open while idle
    pub min_idle_connections: u32,
    /// Idle connections are closed after this long
    pub idle_timeout: Option<Duration>,
    /// Connections are recycled after this long
    pub max_lifetime: Option<Duration>,
    /// Whether sessions run with `default_transaction_read_only`
    pub read_only: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: None,
            database: None,
            username: None,
            connect_timeout: Duration::from_secs(30),
            query_timeout: Duration::from_secs(30),
            // Tables are collected one at a time
            max_connections: 2,
            min_idle_connections: 0,
            idle_timeout: Some(Duration::from_secs(600)),
            max_lifetime: Some(Duration::from_secs(3600)),
            read_only: true,
        }
    }
}

impl ConnectionConfig {
    /// Validates connection configuration parameters.
    ///
    /// # Errors
    /// Returns error if configuration values are invalid or unsafe
    pub fn validate(&self) -> crate::Result<()> {
        if self.host.is_empty() {
            return Err(crate::error::DbSheetError::configuration(
                "host cannot be empty",
            ));
        }

        if self.port == Some(0) {
            return Err(crate::error::DbSheetError::configuration(
                "port must be greater than 0",
            ));
        }

        if self.max_connections == 0 {
            return Err(crate::error::DbSheetError::configuration(
                "max_connections must be greater than 0",
            ));
        }

        if self.max_connections > 100 {
            return Err(crate::error::DbSheetError::configuration(
                "max_connections should not exceed 100",
            ));
        }

        if self.min_idle_connections > self.max_connections {
            return Err(crate::error::DbSheetError::configuration(
                "min_idle_connections cannot exceed max_connections",
            ));
        }

        if self.connect_timeout.is_zero() {
            return Err(crate::error::DbSheetError::configuration(
                "connect_timeout must be greater than 0",
            ));
        }

        if self.query_timeout.is_zero() {
            return Err(crate::error::DbSheetError::configuration(
                "query_timeout must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Creates a new connection config with safe defaults.
    pub fn new(host: String) -> Self {
        Self {
            host,
            ..Default::default()
        }
    }

    /// Builder method to set port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Builder method to set database.
    pub fn with_database(mut self, database: String) -> Self {
        self.database = Some(database);
        self
    }

    /// Builder method to set username.
    pub fn with_username(mut self, username: String) -> Self {
        self.username = Some(username);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_config_default() {
        let config = ConnectionConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, None);
        assert_eq!(config.max_connections, 2);
        assert_eq!(config.min_idle_connections, 0);
        assert!(config.read_only);
    }

    #[test]
    fn test_connection_config_validation() {
        assert!(ConnectionConfig::new("localhost".to_string()).validate().is_ok());

        let config = ConnectionConfig {
            host: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ConnectionConfig {
            port: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ConnectionConfig {
            max_connections: 101,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ConnectionConfig {
            max_connections: 1,
            min_idle_connections: 2,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ConnectionConfig {
            query_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_connection_config_builder() {
        let config = ConnectionConfig::new("example.com".to_string())
            .with_port(5432)
            .with_database("testdb".to_string())
            .with_username("admin".to_string());

        assert_eq!(config.host, "example.com");
        assert_eq!(config.port, Some(5432));
        assert_eq!(config.database, Some("testdb".to_string()));
        assert_eq!(config.username, Some("admin".to_string()));
    }
}
