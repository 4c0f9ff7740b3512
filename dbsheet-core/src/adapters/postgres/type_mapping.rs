//! Rendering of PostgreSQL column types for the documentation sheet.
//!
//! Names follow the SQL-standard uppercase spelling. Character lengths are
//! reported in their own sheet column, so `character varying(255)` renders
//! as plain `VARCHAR`.

/// Renders the type of a column from its information_schema description.
///
/// # Arguments
/// * `data_type` - `information_schema.columns.data_type`
/// * `udt_name` - underlying type name (`int4`, `_text`, enum names, ...)
/// * `numeric_precision` - declared or implied precision
/// * `numeric_scale` - declared or implied scale
///
/// # Example
/// ```rust
/// use dbsheet_core::adapters::postgres::render_type_name;
///
/// assert_eq!(render_type_name("character varying", "varchar", None, None), "VARCHAR");
/// assert_eq!(render_type_name("numeric", "numeric", Some(10), Some(2)), "NUMERIC(10, 2)");
/// assert_eq!(render_type_name("ARRAY", "_int4", None, None), "INTEGER[]");
/// ```
pub fn render_type_name(
    data_type: &str,
    udt_name: &str,
    numeric_precision: Option<i32>,
    numeric_scale: Option<i32>,
) -> String {
    match data_type.to_lowercase().as_str() {
        "numeric" | "decimal" => match (numeric_precision, numeric_scale) {
            (Some(precision), Some(scale)) => format!("NUMERIC({}, {})", precision, scale),
            (Some(precision), None) => format!("NUMERIC({})", precision),
            _ => "NUMERIC".to_string(),
        },
        "array" => {
            let element = udt_name.strip_prefix('_').unwrap_or(udt_name);
            format!("{}[]", render_udt_name(element))
        }
        "user-defined" => udt_name.to_uppercase(),
        other => standard_type_name(other)
            .map_or_else(|| other.to_uppercase(), str::to_string),
    }
}

/// Renders an internal type name such as `int4` or `timestamptz`.
fn render_udt_name(udt_name: &str) -> String {
    let spelled = match udt_name {
        "int2" => "smallint",
        "int4" => "integer",
        "int8" => "bigint",
        "float4" => "real",
        "float8" => "double precision",
        "bool" => "boolean",
        "varchar" => "character varying",
        "bpchar" => "character",
        "timestamp" => "timestamp without time zone",
        "timestamptz" => "timestamp with time zone",
        "time" => "time without time zone",
        "timetz" => "time with time zone",
        other => other,
    };
    standard_type_name(spelled).map_or_else(|| spelled.to_uppercase(), str::to_string)
}

/// Maps an information_schema `data_type` to its documented spelling.
fn standard_type_name(data_type: &str) -> Option<&'static str> {
    let name = match data_type {
        "smallint" => "SMALLINT",
        "integer" => "INTEGER",
        "bigint" => "BIGINT",
        "real" => "REAL",
        "double precision" => "DOUBLE PRECISION",
        "numeric" => "NUMERIC",
        "boolean" => "BOOLEAN",
        "character varying" => "VARCHAR",
        "character" => "CHAR",
        "text" => "TEXT",
        "date" => "DATE",
        "timestamp without time zone" => "TIMESTAMP",
        "timestamp with time zone" => "TIMESTAMP WITH TIME ZONE",
        "time without time zone" => "TIME",
        "time with time zone" => "TIME WITH TIME ZONE",
        "interval" => "INTERVAL",
        "bytea" => "BYTEA",
        "json" => "JSON",
        "jsonb" => "JSONB",
        "uuid" => "UUID",
        "inet" => "INET",
        "cidr" => "CIDR",
        "macaddr" => "MACADDR",
        _ => return None,
    };
    Some(name)
}
