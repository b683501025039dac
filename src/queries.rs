//! Introspection statements over `information_schema`.
//!
//! Every name is an [`Ident`], so it is spliced into the SQL text verbatim:
//! as a bare identifier for catalogs and tables, and inside a single-quoted
//! literal for the `table_schema` filter.
//!
//! Every statement is built [`Statement::uncached`]: drift detection must
//! see the engine's current state, never a cached listing.

use crate::{Ident, Statement};

/// Column listing of one schema, in table then ordinal order.
///
/// Result columns: `table_name, column_name, data_type, is_nullable,
/// column_default`.
pub fn list_columns(catalog: &Ident, schema: &Ident) -> Statement {
    Statement::new(format!(
        "SELECT table_name, column_name, data_type, is_nullable, column_default \
         FROM {catalog}.information_schema.columns \
         WHERE table_schema = '{schema}' \
         ORDER BY table_name, ordinal_position"
    ))
    .uncached()
}

/// Base tables of one schema. Result column: `table_name`.
pub fn list_tables(catalog: &Ident, schema: &Ident) -> Statement {
    Statement::new(format!(
        "SELECT DISTINCT table_name \
         FROM {catalog}.information_schema.tables \
         WHERE table_schema = '{schema}' AND table_type = 'BASE TABLE' \
         ORDER BY table_name"
    ))
    .uncached()
}

/// Row count of one table. Result column: `row_count`.
pub fn row_count(catalog: &Ident, schema: &Ident, table: &Ident) -> Statement {
    Statement::new(format!(
        "SELECT COUNT(*) AS row_count FROM {catalog}.{schema}.{table}"
    ))
    .uncached()
}

/// Full outer join of both catalogs' column metadata, keeping only
/// `(table, column)` pairs that differ.
///
/// Result columns: `table_name, column_name, source_column, target_column,
/// source_type, target_type, source_nullable, target_nullable`. A null
/// `source_column`/`target_column` marks the side the column is missing on.
pub fn column_diff(source: &Ident, target: &Ident, schema: &Ident) -> Statement {
    Statement::new(format!(
        "WITH source_cols AS ( \
             SELECT table_name, column_name, data_type, is_nullable \
             FROM {source}.information_schema.columns \
             WHERE table_schema = '{schema}' \
         ), \
         target_cols AS ( \
             SELECT table_name, column_name, data_type, is_nullable \
             FROM {target}.information_schema.columns \
             WHERE table_schema = '{schema}' \
         ) \
         SELECT \
             COALESCE(s.table_name, t.table_name) AS table_name, \
             COALESCE(s.column_name, t.column_name) AS column_name, \
             s.column_name AS source_column, \
             t.column_name AS target_column, \
             s.data_type AS source_type, \
             t.data_type AS target_type, \
             s.is_nullable AS source_nullable, \
             t.is_nullable AS target_nullable \
         FROM source_cols s \
         FULL OUTER JOIN target_cols t \
             ON s.table_name = t.table_name AND s.column_name = t.column_name \
         WHERE s.column_name IS NULL \
            OR t.column_name IS NULL \
            OR s.data_type != t.data_type \
            OR s.is_nullable != t.is_nullable \
         ORDER BY table_name, column_name"
    ))
    .uncached()
}

/// Base tables present on one side only.
///
/// Result columns: `table_name, drift_type`, where `drift_type` is
/// `Missing in Target` or `Extra in Target`.
pub fn missing_tables(source: &Ident, target: &Ident, schema: &Ident) -> Statement {
    let tables = |catalog: &Ident| {
        format!(
            "SELECT table_name FROM {catalog}.information_schema.tables \
             WHERE table_schema = '{schema}' AND table_type = 'BASE TABLE'"
        )
    };
    let (from_source, from_target) = (tables(source), tables(target));
    Statement::new(format!(
        "SELECT table_name, 'Missing in Target' AS drift_type \
         FROM ({from_source} EXCEPT {from_target}) missing \
         UNION ALL \
         SELECT table_name, 'Extra in Target' AS drift_type \
         FROM ({from_target} EXCEPT {from_source}) extra \
         ORDER BY drift_type, table_name"
    ))
    .uncached()
}

pub fn show_catalogs() -> Statement {
    Statement::new("SHOW CATALOGS").uncached()
}

pub fn show_schemas(catalog: &Ident) -> Statement {
    Statement::new(format!("SHOW SCHEMAS FROM {catalog}")).uncached()
}

pub fn show_tables(catalog: &Ident, schema: &Ident) -> Statement {
    Statement::new(format!("SHOW TABLES FROM {catalog}.{schema}")).uncached()
}

pub fn describe_table(catalog: &Ident, schema: &Ident, table: &Ident) -> Statement {
    Statement::new(format!("DESCRIBE {catalog}.{schema}.{table}")).uncached()
}
