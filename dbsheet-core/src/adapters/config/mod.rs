//! Configuration types for catalog adapters.
//!
//! `ConnectionConfig` does NOT store passwords or credentials;
//! the connection string is handed to the driver and never kept.

mod connection;

pub use connection::ConnectionConfig;
