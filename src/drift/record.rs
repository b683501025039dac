use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::TrinoDriftError;

/// One column-level difference.
///
/// Catalog-to-catalog comparisons produce the `Missing*`, `*Mismatch`
/// variants; snapshot comparisons produce the `Column*`, `*Changed`
/// variants and carry the snapshot capture time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftRecord {
    pub table_name: String,
    pub column_name: String,
    #[serde(flatten)]
    pub change: ColumnChange,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_date: Option<DateTime<Utc>>,
}

impl DriftRecord {
    pub fn kind(&self) -> DriftKind {
        self.change.kind()
    }

    /// Type mismatches and columns missing on either side are critical.
    pub fn is_critical(&self) -> bool {
        matches!(
            self.kind(),
            DriftKind::TypeMismatch | DriftKind::MissingInSource | DriftKind::MissingInTarget
        )
    }
}

/// What changed, with the old/new declared type or nullability.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "drift_type")]
pub enum ColumnChange {
    #[serde(rename = "Missing in Source")]
    MissingInSource {
        target_type: Option<String>,
        target_nullable: Option<String>,
    },
    #[serde(rename = "Missing in Target")]
    MissingInTarget {
        source_type: Option<String>,
        source_nullable: Option<String>,
    },
    #[serde(rename = "Type Mismatch")]
    TypeMismatch {
        source_type: Option<String>,
        target_type: Option<String>,
    },
    #[serde(rename = "Nullability Mismatch")]
    NullabilityMismatch {
        source_nullable: Option<String>,
        target_nullable: Option<String>,
    },
    #[serde(rename = "Column Added")]
    ColumnAdded { current_type: Option<String> },
    #[serde(rename = "Column Removed")]
    ColumnRemoved { previous_type: Option<String> },
    #[serde(rename = "Type Changed")]
    TypeChanged {
        previous_type: Option<String>,
        current_type: Option<String>,
    },
    #[serde(rename = "Nullability Changed")]
    NullabilityChanged {
        previous_nullable: Option<String>,
        current_nullable: Option<String>,
    },
}

impl ColumnChange {
    pub fn kind(&self) -> DriftKind {
        match self {
            Self::MissingInSource { .. } => DriftKind::MissingInSource,
            Self::MissingInTarget { .. } => DriftKind::MissingInTarget,
            Self::TypeMismatch { .. } => DriftKind::TypeMismatch,
            Self::NullabilityMismatch { .. } => DriftKind::NullabilityMismatch,
            Self::ColumnAdded { .. } => DriftKind::ColumnAdded,
            Self::ColumnRemoved { .. } => DriftKind::ColumnRemoved,
            Self::TypeChanged { .. } => DriftKind::TypeChanged,
            Self::NullabilityChanged { .. } => DriftKind::NullabilityChanged,
        }
    }
}

/// Payload-free tag of a [`ColumnChange`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DriftKind {
    MissingInSource,
    MissingInTarget,
    TypeMismatch,
    NullabilityMismatch,
    ColumnAdded,
    ColumnRemoved,
    TypeChanged,
    NullabilityChanged,
}

impl DriftKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::MissingInSource => "Missing in Source",
            Self::MissingInTarget => "Missing in Target",
            Self::TypeMismatch => "Type Mismatch",
            Self::NullabilityMismatch => "Nullability Mismatch",
            Self::ColumnAdded => "Column Added",
            Self::ColumnRemoved => "Column Removed",
            Self::TypeChanged => "Type Changed",
            Self::NullabilityChanged => "Nullability Changed",
        }
    }
}

impl fmt::Display for DriftKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A base table present in only one of the two catalogs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDrift {
    pub table_name: String,
    pub drift_type: TableDriftKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TableDriftKind {
    /// In the source catalog only.
    #[serde(rename = "Missing in Target")]
    MissingInTarget,
    /// In the target catalog only.
    #[serde(rename = "Extra in Target")]
    ExtraInTarget,
}

impl FromStr for TableDriftKind {
    type Err = TrinoDriftError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Missing in Target" => Ok(Self::MissingInTarget),
            "Extra in Target" => Ok(Self::ExtraInTarget),
            other => Err(TrinoDriftError::Protocol(format!(
                "unknown table drift type '{other}'"
            ))),
        }
    }
}

/// Row-count difference of one table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RowCountDrift {
    pub table_name: String,
    pub source_count: i64,
    pub target_count: i64,
    /// `source_count - target_count`.
    pub difference: i64,
    /// `difference / source_count * 100`, rounded to two decimals; zero
    /// when the source table is empty.
    pub drift_percentage: f64,
}

impl RowCountDrift {
    /// Returns `None` when both counts match.
    pub fn between(table_name: impl Into<String>, source_count: i64, target_count: i64) -> Option<Self> {
        let difference = source_count - target_count;
        if difference == 0 {
            return None;
        }
        let drift_percentage = if source_count > 0 {
            round2(difference as f64 / source_count as f64 * 100.0)
        } else {
            0.0
        };
        Some(Self {
            table_name: table_name.into(),
            source_count,
            target_count,
            difference,
            drift_percentage,
        })
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftSummary {
    /// `tables_missing + columns_different + row_count_drifts`.
    pub total_drifts: usize,
    pub critical_drifts: usize,
    pub tables_missing: usize,
    pub columns_different: usize,
    pub row_count_drifts: usize,
}

/// Combined result of all catalog-to-catalog detections.
///
/// When a detection fails, `error` is set and the sections after it stay
/// empty; the summary counts whatever was computed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DriftReport {
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub target: String,
    pub schema: String,
    pub missing_tables: Vec<TableDrift>,
    pub schema_drifts: Vec<DriftRecord>,
    pub data_drifts: Vec<RowCountDrift>,
    pub summary: DriftSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DriftReport {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// Recomputes `summary` from the current sections.
    pub(crate) fn tally(&mut self) {
        let tables_missing = self.missing_tables.len();
        let columns_different = self.schema_drifts.len();
        let row_count_drifts = self.data_drifts.len();
        self.summary = DriftSummary {
            total_drifts: tables_missing + columns_different + row_count_drifts,
            critical_drifts: self
                .schema_drifts
                .iter()
                .filter(|record| record.is_critical())
                .count(),
            tables_missing,
            columns_different,
            row_count_drifts,
        };
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ColumnChange, DriftKind, DriftRecord, RowCountDrift, TableDriftKind};

    #[test]
    fn row_count_drift_percentage() {
        let drift = RowCountDrift::between("orders", 100, 90).expect("must differ");
        assert_eq!(drift.difference, 10);
        assert_eq!(drift.drift_percentage, 10.0);

        let from_empty = RowCountDrift::between("orders", 0, 5).expect("must differ");
        assert_eq!(from_empty.difference, -5);
        assert_eq!(from_empty.drift_percentage, 0.0);

        assert!(RowCountDrift::between("orders", 7, 7).is_none());
    }

    #[test]
    fn row_count_drift_rounds_to_two_decimals() {
        let drift = RowCountDrift::between("t", 3, 2).expect("must differ");
        assert_eq!(drift.drift_percentage, 33.33);

        let negative = RowCountDrift::between("t", 3, 5).expect("must differ");
        assert_eq!(negative.drift_percentage, -66.67);
    }

    #[test]
    fn criticality_by_kind() {
        let record = |change| DriftRecord {
            table_name: "t".to_owned(),
            column_name: "c".to_owned(),
            change,
            snapshot_date: None,
        };
        assert!(record(ColumnChange::TypeMismatch {
            source_type: Some("integer".to_owned()),
            target_type: Some("bigint".to_owned()),
        })
        .is_critical());
        assert!(record(ColumnChange::MissingInSource {
            target_type: None,
            target_nullable: None,
        })
        .is_critical());
        assert!(!record(ColumnChange::NullabilityMismatch {
            source_nullable: Some("NO".to_owned()),
            target_nullable: Some("YES".to_owned()),
        })
        .is_critical());
        assert!(!record(ColumnChange::ColumnRemoved { previous_type: None }).is_critical());
    }

    #[test]
    fn serializes_with_flat_drift_type() {
        let record = DriftRecord {
            table_name: "users".to_owned(),
            column_name: "email".to_owned(),
            change: ColumnChange::TypeMismatch {
                source_type: Some("varchar(255)".to_owned()),
                target_type: Some("varchar(100)".to_owned()),
            },
            snapshot_date: None,
        };
        let value = serde_json::to_value(&record).expect("must serialize");
        assert_eq!(
            value,
            json!({
                "table_name": "users",
                "column_name": "email",
                "drift_type": "Type Mismatch",
                "source_type": "varchar(255)",
                "target_type": "varchar(100)"
            })
        );
        assert_eq!(record.kind().to_string(), DriftKind::TypeMismatch.label());
    }

    #[test]
    fn table_drift_kind_parses_labels() {
        assert_eq!(
            "Missing in Target".parse::<TableDriftKind>().unwrap(),
            TableDriftKind::MissingInTarget
        );
        assert_eq!(
            "Extra in Target".parse::<TableDriftKind>().unwrap(),
            TableDriftKind::ExtraInTarget
        );
        assert!("Other".parse::<TableDriftKind>().is_err());
    }
}
