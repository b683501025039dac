//! Drift detection between two catalogs, or between a catalog and a stored
//! snapshot of itself.

pub mod compare;
mod engine;
mod record;

pub use engine::DriftEngine;
pub use record::{
    ColumnChange, DriftKind, DriftRecord, DriftReport, DriftSummary, RowCountDrift, TableDrift,
    TableDriftKind,
};
