//! Helper utilities for SQL catalog adapters.

use crate::{Result, error::DbSheetError};
use sqlx::{Row, postgres::PgRow};

/// SQLSTATE for `insufficient_privilege`
const INSUFFICIENT_PRIVILEGE: &str = "42501";

/// Extension trait for extracting typed values from catalog rows
/// with consistent error handling.
///
/// # Example
/// ```rust,ignore
/// use dbsheet_core::adapters::helpers::RowExt;
///
/// let name: String = row.get_field("column_name", Some("users"))?;
/// let length: Option<i32> = row.get_field("character_maximum_length", Some("users"))?;
/// ```
pub trait RowExt {
    /// Extracts a typed field from the row with table context on failure.
    fn get_field<'r, T>(&'r self, field_name: &str, table_context: Option<&str>) -> Result<T>
    where
        T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>;
}

impl RowExt for PgRow {
    fn get_field<'r, T>(&'r self, field_name: &str, table_context: Option<&str>) -> Result<T>
    where
        T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
    {
        self.try_get(field_name)
            .map_err(|e| DbSheetError::parse_field(field_name, table_context, e))
    }
}

/// Maps a failed catalog query to a dbsheet error.
///
/// Permission failures become [`DbSheetError::InsufficientPrivileges`]
/// naming `resource`; anything else is a collection error with `context`.
pub fn catalog_query_error(error: sqlx::Error, resource: &str, context: String) -> DbSheetError {
    match &error {
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(INSUFFICIENT_PRIVILEGE) => {
            DbSheetError::insufficient_privileges(format!(
                "Cannot access {} - insufficient privileges",
                resource
            ))
        }
        _ => DbSheetError::collection_failed(context, error),
    }
}
