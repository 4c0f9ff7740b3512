//! Core library for dbsheet.
//!
//! dbsheet reads table metadata from a database catalog and lays it out as
//! a formatted spreadsheet, one sheet per table. This crate holds the
//! pieces the binary wires together:
//!
//! - [`adapters`]: read-only catalog access behind the
//!   [`CatalogSource`] trait (PostgreSQL via `sqlx`)
//! - [`collector`]: merges raw catalog results into column descriptors
//! - [`report`]: sheet layout and `.xlsx` serialization
//! - [`error`] and [`logging`]: shared error type and tracing setup
//!
//! # Security Guarantees
//! - All database operations are read-only
//! - Connection strings are redacted before they reach logs or errors

pub mod adapters;
pub mod collector;
pub mod error;
pub mod logging;
pub mod models;
pub mod report;

// Re-export commonly used types
pub use adapters::{CatalogSource, ConnectionConfig, create_catalog_source};
pub use collector::{Collector, merge_column_descriptors};
pub use error::{DbSheetError, Result};
pub use models::{
    CatalogColumn, ColumnDescriptor, ColumnDetail, DatabaseType, ForeignKeyColumn,
    ForeignKeyReference, TableCatalog, TableDocumentation,
};
pub use report::{RenderError, Workbook, render_workbook, write_workbook};
