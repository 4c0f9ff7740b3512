//! Workbook rendering.
//!
//! Collected tables are laid out as sheets in an in-memory [`Workbook`].
//! The `.xlsx` bytes are produced only once every table has been added,
//! and the output file is written in a single call, so a failure at any
//! point leaves no partial file behind.

use std::path::Path;

use thiserror::Error;

use crate::Result;
use crate::error::DbSheetError;
use crate::models::TableDocumentation;

pub mod layout;
pub mod style;
pub mod xlsx;

pub use layout::{
    Cell, CellRange, CellRef, CellValue, HEADER, Sheet, apply_document_layout, build_sheet,
    column_width, data_table, sheet_name,
};
pub use style::{CellStyle, StyleTable};

/// Errors raised while laying out or serializing the workbook.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Two tables map to the same sheet name after truncation
    #[error(
        "Tables '{first}' and '{second}' both map to sheet name '{sheet}' (sheet names are limited to 31 characters)"
    )]
    DuplicateSheetName {
        sheet: String,
        first: String,
        second: String,
    },

    /// A table name cannot be used as a sheet name
    #[error("Table '{table}' cannot be used as a sheet name: {reason}")]
    InvalidSheetName { table: String, reason: String },

    /// A workbook needs at least one sheet
    #[error("Workbook has no sheets")]
    EmptyWorkbook,

    #[error("XML serialization failed: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("ZIP archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Write to in-memory buffer failed: {0}")]
    Io(#[from] std::io::Error),
}

/// In-memory workbook: one sheet per documented table.
#[derive(Debug, Default)]
pub struct Workbook {
    sheets: Vec<Sheet>,
    tables: Vec<String>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lays out `table` as a new sheet at the end of the workbook.
    ///
    /// # Errors
    /// Returns [`RenderError::DuplicateSheetName`] if the truncated sheet
    /// name is already taken (compared case-insensitively, as spreadsheet
    /// applications do), or [`RenderError::InvalidSheetName`] if the table
    /// name holds a forbidden character.
    pub fn add_table(&mut self, table: &TableDocumentation) -> std::result::Result<(), RenderError> {
        let sheet = build_sheet(table)?;

        let folded = sheet.name.to_lowercase();
        if let Some(index) = self
            .sheets
            .iter()
            .position(|existing| existing.name.to_lowercase() == folded)
        {
            return Err(RenderError::DuplicateSheetName {
                sheet: sheet.name,
                first: self.tables[index].clone(),
                second: table.name.clone(),
            });
        }

        tracing::debug!(
            "Laid out sheet '{}' with {} rows",
            sheet.name,
            table.columns.len() + 3
        );
        self.sheets.push(sheet);
        self.tables.push(table.name.clone());
        Ok(())
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    /// Serializes the workbook as `.xlsx` bytes.
    pub fn to_bytes(&self) -> std::result::Result<Vec<u8>, RenderError> {
        xlsx::write_package(&self.sheets)
    }
}

/// Renders all tables into `.xlsx` bytes.
///
/// # Errors
/// Returns [`DbSheetError::Render`] naming the table that could not be
/// laid out, or the serialization failure.
pub fn render_workbook(tables: &[TableDocumentation]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    for table in tables {
        workbook.add_table(table).map_err(|e| {
            DbSheetError::render_failed(
                format!("Failed to add sheet for table '{}'", table.qualified_name()),
                e,
            )
        })?;
    }

    workbook
        .to_bytes()
        .map_err(|e| DbSheetError::render_failed("Failed to serialize workbook", e))
}

/// Renders all tables and writes the workbook to `path`.
///
/// Returns the number of sheets written.
///
/// # Errors
/// Returns [`DbSheetError::Render`] if rendering fails (nothing is
/// written), or [`DbSheetError::Io`] if the file cannot be written.
pub async fn write_workbook(path: &Path, tables: &[TableDocumentation]) -> Result<usize> {
    let bytes = render_workbook(tables)?;

    tokio::fs::write(path, &bytes)
        .await
        .map_err(|e| DbSheetError::Io {
            context: format!("Failed to write workbook to {}", path.display()),
            source: e,
        })?;

    tracing::debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(tables.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ColumnDescriptor;
    use tempfile::TempDir;

    fn table(name: &str) -> TableDocumentation {
        TableDocumentation {
            schema: "public".to_string(),
            name: name.to_string(),
            columns: vec![ColumnDescriptor {
                position: 1,
                name: "id".to_string(),
                comment: String::new(),
                is_nullable: false,
                type_name: "INTEGER".to_string(),
                max_length: None,
                is_primary_key: true,
                foreign_keys: Vec::new(),
            }],
        }
    }

    #[test]
    fn test_one_sheet_per_table_in_order() {
        let mut workbook = Workbook::new();
        workbook.add_table(&table("users")).unwrap();
        workbook.add_table(&table("companies")).unwrap();

        let names: Vec<&str> = workbook.sheets().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["users", "companies"]);
    }

    #[test]
    fn test_truncated_name_collision_names_both_tables() {
        let first = "customer_subscription_billing_history_2023";
        let second = "customer_subscription_billing_history_2024";

        let mut workbook = Workbook::new();
        workbook.add_table(&table(first)).unwrap();
        let error = workbook.add_table(&table(second)).unwrap_err();

        match &error {
            RenderError::DuplicateSheetName {
                sheet,
                first: a,
                second: b,
            } => {
                assert_eq!(sheet, "customer_subscription_billing_h");
                assert_eq!(a, first);
                assert_eq!(b, second);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(workbook.sheets().len(), 1);
    }

    #[test]
    fn test_sheet_names_collide_case_insensitively() {
        let mut workbook = Workbook::new();
        workbook.add_table(&table("Users")).unwrap();
        assert!(workbook.add_table(&table("users")).is_err());
    }

    #[test]
    fn test_render_workbook_wraps_errors() {
        let error = render_workbook(&[table("a:b")]).unwrap_err();
        assert!(matches!(error, DbSheetError::Render { .. }));
        assert!(error.to_string().contains("public.a:b"));

        let error = render_workbook(&[]).unwrap_err();
        assert!(matches!(
            error,
            DbSheetError::Render {
                source: RenderError::EmptyWorkbook,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_write_workbook_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("docs.xlsx");

        let written = write_workbook(&path, &[table("users"), table("companies")])
            .await
            .unwrap();

        assert_eq!(written, 2);
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }

    #[tokio::test]
    async fn test_failed_render_leaves_no_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("docs.xlsx");

        let result = write_workbook(&path, &[table("users"), table("users")]).await;

        assert!(result.is_err());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_unwritable_path_is_io_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("docs.xlsx");

        let error = write_workbook(&path, &[table("users")]).await.unwrap_err();
        assert!(matches!(error, DbSheetError::Io { .. }));
    }
}
