//! End-to-end generation against an in-memory catalog.

use async_trait::async_trait;
use dbsheet::generate_documentation;
use dbsheet_core::{
    CatalogColumn, CatalogSource, DatabaseType, Result, TableCatalog,
    error::DbSheetError,
};
use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use tempfile::TempDir;
use zip::ZipArchive;

struct StaticCatalog {
    tables: BTreeMap<String, TableCatalog>,
}

#[async_trait]
impl CatalogSource for StaticCatalog {
    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    async fn list_tables(&self, _schema: &str) -> Result<Vec<String>> {
        Ok(self.tables.keys().cloned().collect())
    }

    async fn fetch_table_catalog(&self, _schema: &str, table: &str) -> Result<TableCatalog> {
        Ok(self.tables.get(table).cloned().unwrap_or_default())
    }

    fn database_type(&self) -> DatabaseType {
        DatabaseType::PostgreSQL
    }
}

fn catalog(tables: &[(&str, Vec<&str>)]) -> StaticCatalog {
    StaticCatalog {
        tables: tables
            .iter()
            .map(|(name, columns)| {
                let catalog = TableCatalog {
                    columns: columns
                        .iter()
                        .map(|column| CatalogColumn {
                            name: column.to_string(),
                            is_nullable: true,
                            type_name: "TEXT".to_string(),
                        })
                        .collect(),
                    ..Default::default()
                };
                (name.to_string(), catalog)
            })
            .collect(),
    }
}

fn sheet_names(path: &std::path::Path) -> Vec<String> {
    let bytes = std::fs::read(path).unwrap();
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut workbook = String::new();
    archive
        .by_name("xl/workbook.xml")
        .unwrap()
        .read_to_string(&mut workbook)
        .unwrap();

    workbook
        .split("<sheet name=\"")
        .skip(1)
        .filter_map(|rest| rest.split('"').next())
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_generate_explicit_tables_in_given_order() {
    let source = catalog(&[("alpha", vec!["id"]), ("beta", vec!["id", "name"])]);
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("docs.xlsx");

    let tables = vec!["beta".to_string(), "alpha".to_string()];
    let count = generate_documentation(&source, "public", Some(tables.as_slice()), &output)
        .await
        .unwrap();

    assert_eq!(count, 2);
    assert_eq!(sheet_names(&output), vec!["beta", "alpha"]);
}

#[tokio::test]
async fn test_generate_all_tables_when_none_listed() {
    let source = catalog(&[("orders", vec!["id"]), ("customers", vec!["id"])]);
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("docs.xlsx");

    let count = generate_documentation(&source, "public", None, &output)
        .await
        .unwrap();

    assert_eq!(count, 2);
    assert_eq!(sheet_names(&output), vec!["customers", "orders"]);
}

#[tokio::test]
async fn test_generate_missing_table_writes_nothing() {
    let source = catalog(&[("users", vec!["id"])]);
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("docs.xlsx");

    let tables = vec!["users".to_string(), "missing".to_string()];
    let error = generate_documentation(&source, "public", Some(tables.as_slice()), &output)
        .await
        .unwrap_err();

    assert!(matches!(error, DbSheetError::TableNotFound { .. }));
    assert!(!output.exists());
}

#[tokio::test]
async fn test_generate_empty_schema_is_error() {
    let source = catalog(&[]);
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("docs.xlsx");

    let error = generate_documentation(&source, "empty", None, &output)
        .await
        .unwrap_err();

    assert!(matches!(error, DbSheetError::Configuration { .. }));
    assert!(!output.exists());
}
