//! Data models for collected table metadata.
//!
//! Raw catalog results ([`TableCatalog`] and its parts) are produced by a
//! [`CatalogSource`](crate::adapters::CatalogSource); the collector folds
//! them into [`ColumnDescriptor`]s, one per column, which the report layer
//! turns into sheet rows.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported database types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatabaseType {
    PostgreSQL,
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseType::PostgreSQL => write!(f, "PostgreSQL"),
        }
    }
}

/// A column as listed by the catalog, in ordinal order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogColumn {
    pub name: String,
    pub is_nullable: bool,
    /// Rendered type name, e.g. `INTEGER` or `NUMERIC(10, 2)`
    pub type_name: String,
}

/// Target of a foreign key constraint for a single column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyReference {
    pub referenced_schema: String,
    pub referenced_table: String,
    pub referenced_column: String,
    pub constraint_name: String,
}

impl fmt::Display for ForeignKeyReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}({})[{}]",
            self.referenced_schema,
            self.referenced_table,
            self.referenced_column,
            self.constraint_name
        )
    }
}

/// One foreign key row: a source column and where it points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyColumn {
    pub column_name: String,
    pub reference: ForeignKeyReference,
}

/// Comment and character length of a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDetail {
    pub column_name: String,
    pub comment: Option<String>,
    pub character_maximum_length: Option<u32>,
}

/// Raw result of the four catalog lookups for one table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCatalog {
    pub columns: Vec<CatalogColumn>,
    pub primary_key_columns: Vec<String>,
    pub foreign_key_columns: Vec<ForeignKeyColumn>,
    pub column_details: Vec<ColumnDetail>,
}

/// Documentation row for a single column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// 1-based position in catalog order
    pub position: u32,
    pub name: String,
    /// Comment text, empty when the column has none
    pub comment: String,
    pub is_nullable: bool,
    pub type_name: String,
    /// Character length limit; `None` for non-character types
    pub max_length: Option<u32>,
    pub is_primary_key: bool,
    pub foreign_keys: Vec<ForeignKeyReference>,
}

impl ColumnDescriptor {
    /// Returns true when the column takes part in at least one foreign key.
    pub fn is_foreign_key(&self) -> bool {
        !self.foreign_keys.is_empty()
    }

    /// Renders the key membership flag: `PK`, `FK`, `PK, FK` or empty.
    pub fn key_flag(&self) -> String {
        let mut flags = Vec::with_capacity(2);
        if self.is_primary_key {
            flags.push("PK");
        }
        if self.is_foreign_key() {
            flags.push("FK");
        }
        flags.join(", ")
    }
}

/// All collected columns of one table, ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDocumentation {
    pub schema: String,
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
}

impl TableDocumentation {
    /// Qualified `schema.table` name, used in logs and errors.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(is_primary_key: bool, foreign_keys: Vec<ForeignKeyReference>) -> ColumnDescriptor {
        ColumnDescriptor {
            position: 1,
            name: "id".to_string(),
            comment: String::new(),
            is_nullable: false,
            type_name: "INTEGER".to_string(),
            max_length: None,
            is_primary_key,
            foreign_keys,
        }
    }

    fn reference() -> ForeignKeyReference {
        ForeignKeyReference {
            referenced_schema: "public".to_string(),
            referenced_table: "companies".to_string(),
            referenced_column: "id".to_string(),
            constraint_name: "users_company_id_fkey".to_string(),
        }
    }

    #[test]
    fn test_key_flag_combinations() {
        assert_eq!(descriptor(true, vec![]).key_flag(), "PK");
        assert_eq!(descriptor(false, vec![reference()]).key_flag(), "FK");
        assert_eq!(descriptor(true, vec![reference()]).key_flag(), "PK, FK");
        assert_eq!(descriptor(false, vec![]).key_flag(), "");
    }

    #[test]
    fn test_key_flag_ignores_reference_count() {
        let column = descriptor(false, vec![reference(), reference()]);
        assert_eq!(column.key_flag(), "FK");
    }

    #[test]
    fn test_foreign_key_reference_display() {
        assert_eq!(
            reference().to_string(),
            "public.companies(id)[users_company_id_fkey]"
        );
    }

    #[test]
    fn test_qualified_name() {
        let table = TableDocumentation {
            schema: "hr".to_string(),
            name: "employees".to_string(),
            columns: Vec::new(),
        };
        assert_eq!(table.qualified_name(), "hr.employees");
    }
}
