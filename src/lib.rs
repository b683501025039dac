//! `trino-drift` is an async client for the Trino statement protocol and a
//! drift detector built on top of it.
//!
//! The client submits a statement to `/v1/statement`, follows `nextUri`
//! links until the result is drained and hands back name-keyed rows:
//! - [`TrinoClient::execute`]
//! - [`TrinoClient::query`]
//!
//! The drift engine compares two catalogs, or a catalog with a stored
//! snapshot of itself:
//! - [`DriftEngine::detect_schema_drift`]
//! - [`DriftEngine::detect_row_count_drift`]
//! - [`DriftEngine::detect_missing_tables`]
//! - [`DriftEngine::capture_snapshot`]
//! - [`DriftEngine::compare_with_snapshot`]
//! - [`DriftEngine::get_drift_report`]

mod cache;
mod client;
mod config;
mod error;
mod executor;
mod ident;
mod normalize;
mod options;
mod row;
mod statement;
mod types;
mod wire;

pub mod drift;
pub mod queries;
pub mod snapshot;

pub use client::{TrinoClient, STATEMENT_PATH};
pub use config::EngineConfig;
pub use drift::{
    ColumnChange, DriftEngine, DriftKind, DriftRecord, DriftReport, DriftSummary, RowCountDrift,
    TableDrift, TableDriftKind,
};
pub use error::TrinoDriftError;
pub use executor::StatementExecutor;
pub use ident::Ident;
pub use options::ClientOptions;
pub use row::Row;
pub use snapshot::{MemorySnapshotStore, Snapshot, SnapshotFilter, SnapshotStore, SnapshotSummary};
pub use statement::Statement;
pub use types::{Col, ConnectionStatus, QueryResult};

pub type Result<T> = std::result::Result<T, TrinoDriftError>;
