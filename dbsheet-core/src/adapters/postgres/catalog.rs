//! information_schema queries for table documentation.
//!
//! The column list is read through the pool. The primary key, foreign key
//! and comment lookups share one connection acquired for the table and
//! returned to the pool when the lookup finishes or fails.

use super::PostgresAdapter;
use super::type_mapping::render_type_name;
use crate::Result;
use crate::adapters::helpers::{RowExt, catalog_query_error};
use crate::models::{
    CatalogColumn, ColumnDetail, ForeignKeyColumn, ForeignKeyReference, TableCatalog,
};
use sqlx::PgConnection;

const TABLES_QUERY: &str = r#"
    SELECT table_name::text AS table_name
    FROM information_schema.tables
    WHERE table_schema = $1
    AND table_type = 'BASE TABLE'
    ORDER BY table_name
"#;

const COLUMNS_QUERY: &str = r#"
    SELECT
        column_name::text AS column_name,
        is_nullable::text AS is_nullable,
        data_type::text AS data_type,
        udt_name::text AS udt_name,
        numeric_precision::int4 AS numeric_precision,
        numeric_scale::int4 AS numeric_scale
    FROM information_schema.columns
    WHERE table_schema = $1
    AND table_name = $2
    ORDER BY ordinal_position
"#;

const PRIMARY_KEY_QUERY: &str = r#"
    SELECT kcu.column_name::text AS column_name
    FROM information_schema.table_constraints tc
    JOIN information_schema.key_column_usage kcu
        ON tc.constraint_name = kcu.constraint_name
        AND tc.table_schema = kcu.table_schema
        AND tc.table_name = kcu.table_name
    WHERE tc.constraint_type = 'PRIMARY KEY'
    AND tc.table_schema = $1
    AND tc.table_name = $2
"#;

const FOREIGN_KEY_QUERY: &str = r#"
    SELECT
        kcu.column_name::text AS column_name,
        ccu.table_schema::text AS foreign_table_schema,
        ccu.table_name::text AS foreign_table_name,
        ccu.column_name::text AS foreign_column_name,
        tc.constraint_name::text AS constraint_name
    FROM information_schema.table_constraints tc
    JOIN information_schema.key_column_usage kcu
        ON tc.constraint_name = kcu.constraint_name
        AND tc.table_schema = kcu.table_schema
        AND tc.table_name = kcu.table_name
    JOIN information_schema.constraint_column_usage ccu
        ON tc.constraint_name = ccu.constraint_name
        AND tc.table_schema = ccu.constraint_schema
    WHERE tc.constraint_type = 'FOREIGN KEY'
    AND tc.table_schema = $1
    AND tc.table_name = $2
    ORDER BY tc.constraint_name, kcu.ordinal_position
"#;

// format('%I.%I') quotes mixed-case and reserved names before the regclass cast
const COLUMN_DETAILS_QUERY: &str = r#"
    SELECT
        c.column_name::text AS column_name,
        col_description(
            format('%I.%I', c.table_schema, c.table_name)::regclass::oid,
            c.ordinal_position::int4
        ) AS column_comment,
        c.character_maximum_length::int4 AS character_maximum_length
    FROM information_schema.columns c
    WHERE c.table_schema = $1
    AND c.table_name = $2
"#;

/// Runs the four catalog lookups for `schema.table`.
pub(crate) async fn fetch_table_catalog(
    adapter: &PostgresAdapter,
    schema: &str,
    table: &str,
) -> Result<TableCatalog> {
    let columns = adapter.collect_columns(schema, table).await?;

    let mut conn = adapter.acquire().await?;
    let primary_key_columns = collect_primary_key_columns(&mut conn, schema, table).await?;
    let foreign_key_columns = collect_foreign_key_columns(&mut conn, schema, table).await?;
    let column_details = collect_column_details(&mut conn, schema, table).await?;
    drop(conn);

    tracing::debug!(
        "Fetched catalog for '{}.{}': {} columns, {} primary key columns, {} foreign key columns",
        schema,
        table,
        columns.len(),
        primary_key_columns.len(),
        foreign_key_columns.len()
    );

    Ok(TableCatalog {
        columns,
        primary_key_columns,
        foreign_key_columns,
        column_details,
    })
}

impl PostgresAdapter {
    /// Lists base tables in `schema`, ordered by name.
    pub(crate) async fn collect_table_names(&self, schema: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(TABLES_QUERY)
            .bind(schema)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                catalog_query_error(
                    e,
                    "information_schema.tables",
                    format!("Failed to list tables in schema '{}'", schema),
                )
            })?;

        let mut tables = Vec::with_capacity(rows.len());
        for row in &rows {
            let table_name: String = row.get_field("table_name", None)?;
            tables.push(table_name);
        }

        tracing::debug!("Found {} base tables in schema '{}'", tables.len(), schema);
        Ok(tables)
    }

    /// Collects the column list in ordinal order.
    pub(crate) async fn collect_columns(
        &self,
        schema: &str,
        table: &str,
    ) -> Result<Vec<CatalogColumn>> {
        let rows = sqlx::query(COLUMNS_QUERY)
            .bind(schema)
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                catalog_query_error(
                    e,
                    "information_schema.columns",
                    format!("Failed to collect columns for table '{}.{}'", schema, table),
                )
            })?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            let name: String = row.get_field("column_name", Some(table))?;
            let is_nullable: String = row.get_field("is_nullable", Some(table))?;
            let data_type: String = row.get_field("data_type", Some(table))?;
            let udt_name: String = row.get_field("udt_name", Some(table))?;
            let numeric_precision: Option<i32> = row.get_field("numeric_precision", Some(table))?;
            let numeric_scale: Option<i32> = row.get_field("numeric_scale", Some(table))?;

            columns.push(CatalogColumn {
                name,
                is_nullable: is_nullable == "YES",
                type_name: render_type_name(&data_type, &udt_name, numeric_precision, numeric_scale),
            });
        }

        Ok(columns)
    }
}

async fn collect_primary_key_columns(
    conn: &mut PgConnection,
    schema: &str,
    table: &str,
) -> Result<Vec<String>> {
    let rows = sqlx::query(PRIMARY_KEY_QUERY)
        .bind(schema)
        .bind(table)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| {
            catalog_query_error(
                e,
                "information_schema.table_constraints",
                format!(
                    "Failed to collect primary key for table '{}.{}'",
                    schema, table
                ),
            )
        })?;

    let mut columns = Vec::with_capacity(rows.len());
    for row in &rows {
        let column_name: String = row.get_field("column_name", Some(table))?;
        columns.push(column_name);
    }
    Ok(columns)
}

async fn collect_foreign_key_columns(
    conn: &mut PgConnection,
    schema: &str,
    table: &str,
) -> Result<Vec<ForeignKeyColumn>> {
    let rows = sqlx::query(FOREIGN_KEY_QUERY)
        .bind(schema)
        .bind(table)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| {
            catalog_query_error(
                e,
                "information_schema.constraint_column_usage",
                format!(
                    "Failed to collect foreign keys for table '{}.{}'",
                    schema, table
                ),
            )
        })?;

    let mut foreign_keys = Vec::with_capacity(rows.len());
    for row in &rows {
        foreign_keys.push(ForeignKeyColumn {
            column_name: row.get_field("column_name", Some(table))?,
            reference: ForeignKeyReference {
                referenced_schema: row.get_field("foreign_table_schema", Some(table))?,
                referenced_table: row.get_field("foreign_table_name", Some(table))?,
                referenced_column: row.get_field("foreign_column_name", Some(table))?,
                constraint_name: row.get_field("constraint_name", Some(table))?,
            },
        });
    }
    Ok(foreign_keys)
}

async fn collect_column_details(
    conn: &mut PgConnection,
    schema: &str,
    table: &str,
) -> Result<Vec<ColumnDetail>> {
    let rows = sqlx::query(COLUMN_DETAILS_QUERY)
        .bind(schema)
        .bind(table)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| {
            catalog_query_error(
                e,
                "pg_description",
                format!(
                    "Failed to collect column comments for table '{}.{}'",
                    schema, table
                ),
            )
        })?;

    let mut details = Vec::with_capacity(rows.len());
    for row in &rows {
        let character_maximum_length: Option<i32> =
            row.get_field("character_maximum_length", Some(table))?;
        details.push(ColumnDetail {
            column_name: row.get_field("column_name", Some(table))?,
            comment: row.get_field("column_comment", Some(table))?,
            character_maximum_length: character_maximum_length
                .and_then(|length| u32::try_from(length).ok()),
        });
    }
    Ok(details)
}
