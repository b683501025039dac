//! Pure comparison steps over normalized metadata rows.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::{
    drift::record::{ColumnChange, DriftRecord, TableDrift},
    QueryResult, Result, Row, TrinoDriftError,
};

/// `(table_name, column_name)`; unique within one column listing.
pub type ColumnKey = (String, String);

/// One row of a column listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnMeta {
    pub table_name: String,
    pub column_name: String,
    pub data_type: Option<String>,
    pub is_nullable: Option<String>,
}

impl ColumnMeta {
    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            table_name: required_str(row, "table_name")?,
            column_name: required_str(row, "column_name")?,
            data_type: optional_str(row, "data_type"),
            is_nullable: optional_str(row, "is_nullable"),
        })
    }

    pub fn key(&self) -> ColumnKey {
        (self.table_name.clone(), self.column_name.clone())
    }
}

/// Classifies one row of the column-diff join.
///
/// Missing on a side wins over type, and type wins over nullability.
/// Returns `None` for a row that shows no difference.
pub fn classify_column_diff(row: &Row) -> Result<Option<DriftRecord>> {
    let table_name = required_str(row, "table_name")?;
    let column_name = required_str(row, "column_name")?;
    let source_type = optional_str(row, "source_type");
    let target_type = optional_str(row, "target_type");
    let source_nullable = optional_str(row, "source_nullable");
    let target_nullable = optional_str(row, "target_nullable");

    let change = if row.is_null("source_column") {
        ColumnChange::MissingInSource {
            target_type,
            target_nullable,
        }
    } else if row.is_null("target_column") {
        ColumnChange::MissingInTarget {
            source_type,
            source_nullable,
        }
    } else if source_type != target_type {
        ColumnChange::TypeMismatch {
            source_type,
            target_type,
        }
    } else if source_nullable != target_nullable {
        ColumnChange::NullabilityMismatch {
            source_nullable,
            target_nullable,
        }
    } else {
        return Ok(None);
    };

    Ok(Some(DriftRecord {
        table_name,
        column_name,
        change,
        snapshot_date: None,
    }))
}

/// Classifies every row of the column-diff join, sorted by table then
/// column name.
pub fn schema_drifts(result: &QueryResult) -> Result<Vec<DriftRecord>> {
    let mut drifts = Vec::new();
    for row in &result.rows {
        if let Some(record) = classify_column_diff(row)? {
            drifts.push(record);
        }
    }
    drifts.sort_by(|a, b| {
        a.table_name
            .cmp(&b.table_name)
            .then_with(|| a.column_name.cmp(&b.column_name))
    });
    Ok(drifts)
}

/// Parses the rows of the missing-tables statement.
pub fn table_drifts(result: &QueryResult) -> Result<Vec<TableDrift>> {
    result
        .rows
        .iter()
        .map(|row| {
            Ok(TableDrift {
                table_name: required_str(row, "table_name")?,
                drift_type: required_str(row, "drift_type")?.parse()?,
            })
        })
        .collect()
}

/// Diffs a captured column listing against the current one.
///
/// Records come in two groups: first removed/changed columns in snapshot
/// order, then added columns in current order. Nullability is compared
/// only when the type is unchanged. Every record carries `captured_at`.
pub fn compare_columns(
    snapshot: &QueryResult,
    current: &QueryResult,
    captured_at: DateTime<Utc>,
) -> Result<Vec<DriftRecord>> {
    let (snapshot_order, snapshot_cols) = index_columns(snapshot)?;
    let (current_order, current_cols) = index_columns(current)?;

    let record = |meta: &ColumnMeta, change| DriftRecord {
        table_name: meta.table_name.clone(),
        column_name: meta.column_name.clone(),
        change,
        snapshot_date: Some(captured_at),
    };

    let mut drifts = Vec::new();
    for key in &snapshot_order {
        let previous = &snapshot_cols[key];
        match current_cols.get(key) {
            None => drifts.push(record(
                previous,
                ColumnChange::ColumnRemoved {
                    previous_type: previous.data_type.clone(),
                },
            )),
            Some(now) if now.data_type != previous.data_type => drifts.push(record(
                previous,
                ColumnChange::TypeChanged {
                    previous_type: previous.data_type.clone(),
                    current_type: now.data_type.clone(),
                },
            )),
            Some(now) if now.is_nullable != previous.is_nullable => drifts.push(record(
                previous,
                ColumnChange::NullabilityChanged {
                    previous_nullable: previous.is_nullable.clone(),
                    current_nullable: now.is_nullable.clone(),
                },
            )),
            Some(_) => {}
        }
    }

    for key in &current_order {
        if !snapshot_cols.contains_key(key) {
            let added = &current_cols[key];
            drifts.push(record(
                added,
                ColumnChange::ColumnAdded {
                    current_type: added.data_type.clone(),
                },
            ));
        }
    }

    Ok(drifts)
}

/// Keys in first-seen order plus a lookup; a repeated key keeps the last
/// row seen.
fn index_columns(result: &QueryResult) -> Result<(Vec<ColumnKey>, HashMap<ColumnKey, ColumnMeta>)> {
    let mut order = Vec::with_capacity(result.rows.len());
    let mut seen = HashSet::with_capacity(result.rows.len());
    let mut lookup = HashMap::with_capacity(result.rows.len());
    for row in &result.rows {
        let meta = ColumnMeta::from_row(row)?;
        let key = meta.key();
        if seen.insert(key.clone()) {
            order.push(key.clone());
        }
        lookup.insert(key, meta);
    }
    Ok((order, lookup))
}

pub(crate) fn required_str(row: &Row, name: &str) -> Result<String> {
    row.get_str(name)
        .map(str::to_owned)
        .ok_or_else(|| TrinoDriftError::Protocol(format!("metadata row is missing '{name}'")))
}

fn optional_str(row: &Row, name: &str) -> Option<String> {
    row.get_str(name).map(str::to_owned)
}
