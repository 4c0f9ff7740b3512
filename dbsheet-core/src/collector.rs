//! Metadata collection: folds raw catalog results into column descriptors.

use std::collections::{HashMap, HashSet};

use crate::adapters::CatalogSource;
use crate::error::DbSheetError;
use crate::models::{ColumnDescriptor, ForeignKeyReference, TableCatalog, TableDocumentation};
use crate::Result;

/// Collects per-table documentation from a [`CatalogSource`].
///
/// Tables are processed one at a time in the order given; the first
/// failure aborts the whole collection.
pub struct Collector<'a> {
    source: &'a dyn CatalogSource,
    schema: String,
}

impl<'a> Collector<'a> {
    /// Creates a collector for tables in `schema`.
    pub fn new(source: &'a dyn CatalogSource, schema: impl Into<String>) -> Self {
        Self {
            source,
            schema: schema.into(),
        }
    }

    /// Collects the column descriptors of one table.
    ///
    /// # Errors
    /// Returns [`DbSheetError::TableNotFound`] when the catalog lists no
    /// columns for the table, and propagates any catalog failure.
    pub async fn collect_table(&self, table: &str) -> Result<TableDocumentation> {
        let catalog = self.source.fetch_table_catalog(&self.schema, table).await?;

        if catalog.columns.is_empty() {
            return Err(DbSheetError::table_not_found(&self.schema, table));
        }

        let columns = merge_column_descriptors(catalog);

        for column in columns.iter().filter(|c| c.is_foreign_key()) {
            let targets: Vec<String> = column.foreign_keys.iter().map(ToString::to_string).collect();
            tracing::debug!(
                "{}.{}.{} references {}",
                self.schema,
                table,
                column.name,
                targets.join(", ")
            );
        }

        Ok(TableDocumentation {
            schema: self.schema.clone(),
            name: table.to_string(),
            columns,
        })
    }

    /// Collects every table in `tables`, in order.
    pub async fn collect_tables(&self, tables: &[String]) -> Result<Vec<TableDocumentation>> {
        let mut collected = Vec::with_capacity(tables.len());
        for table in tables {
            tracing::info!("Processing {}...", table);
            let documentation = self.collect_table(table).await?;
            tracing::debug!(
                "Collected {} columns for {}",
                documentation.columns.len(),
                documentation.qualified_name()
            );
            collected.push(documentation);
        }
        Ok(collected)
    }
}

/// Merges the four catalog result sets into one descriptor per column.
///
/// Rows keep the catalog's column order and are numbered from 1. Primary
/// key and comment/length lookups are keyed by column name; repeated
/// primary key rows collapse into one flag, and repeated foreign key rows
/// accumulate references.
pub fn merge_column_descriptors(catalog: TableCatalog) -> Vec<ColumnDescriptor> {
    let TableCatalog {
        columns,
        primary_key_columns,
        foreign_key_columns,
        column_details,
    } = catalog;

    let primary_keys: HashSet<String> = primary_key_columns.into_iter().collect();

    let mut foreign_keys: HashMap<String, Vec<ForeignKeyReference>> = HashMap::new();
    for fk in foreign_key_columns {
        foreign_keys
            .entry(fk.column_name)
            .or_default()
            .push(fk.reference);
    }

    let details: HashMap<String, (Option<String>, Option<u32>)> = column_details
        .into_iter()
        .map(|d| (d.column_name, (d.comment, d.character_maximum_length)))
        .collect();

    columns
        .into_iter()
        .zip(1u32..)
        .map(|(column, position)| {
            let (comment, max_length) = details.get(&column.name).cloned().unwrap_or_default();
            ColumnDescriptor {
                position,
                is_primary_key: primary_keys.contains(&column.name),
                foreign_keys: foreign_keys.remove(&column.name).unwrap_or_default(),
                comment: comment.unwrap_or_default(),
                max_length,
                is_nullable: column.is_nullable,
                type_name: column.type_name,
                name: column.name,
            }
        })
        .collect()
}
