//! Captured column metadata and the store that keeps it.
//!
//! The store is the only writer and reader of [`Snapshot`] values. Snapshots
//! are immutable once inserted; ids are unique per store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::{QueryResult, Result, TrinoDriftError};

/// Listing cap applied by [`SnapshotStore::list`].
pub const SNAPSHOT_LIST_LIMIT: usize = 50;

/// Column listing of one `(database, schema)` at a point in time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub snapshot_id: String,
    pub database: String,
    pub schema: String,
    pub captured_at: DateTime<Utc>,
    pub data: QueryResult,
}

impl Snapshot {
    pub fn columns_captured(&self) -> usize {
        self.data.row_count
    }

    pub fn summary(&self) -> SnapshotSummary {
        SnapshotSummary {
            snapshot_id: self.snapshot_id.clone(),
            database: self.database.clone(),
            schema: self.schema.clone(),
            columns_captured: self.columns_captured(),
            captured_at: self.captured_at,
        }
    }
}

/// Listing projection of a snapshot, without its captured rows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotSummary {
    pub snapshot_id: String,
    pub database: String,
    pub schema: String,
    pub columns_captured: usize,
    pub captured_at: DateTime<Utc>,
}

/// Optional equality filters for [`SnapshotStore::list`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SnapshotFilter {
    pub database: Option<String>,
    pub schema: Option<String>,
}

impl SnapshotFilter {
    pub fn matches(&self, snapshot: &Snapshot) -> bool {
        self.database
            .as_deref()
            .map_or(true, |database| snapshot.database == database)
            && self
                .schema
                .as_deref()
                .map_or(true, |schema| snapshot.schema == schema)
    }
}

/// Durable keyed storage for snapshots.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Persists a new snapshot. Fails with [`TrinoDriftError::Store`] when
    /// the id is already taken; nothing is written in that case.
    async fn insert(&self, snapshot: Snapshot) -> Result<()>;

    /// Loads a snapshot by id.
    async fn get(&self, snapshot_id: &str) -> Result<Option<Snapshot>>;

    /// Lists matching snapshots, newest first, capped at
    /// [`SNAPSHOT_LIST_LIMIT`].
    async fn list(&self, filter: &SnapshotFilter) -> Result<Vec<SnapshotSummary>>;
}

#[async_trait]
impl<T: SnapshotStore + ?Sized> SnapshotStore for Arc<T> {
    async fn insert(&self, snapshot: Snapshot) -> Result<()> {
        (**self).insert(snapshot).await
    }

    async fn get(&self, snapshot_id: &str) -> Result<Option<Snapshot>> {
        (**self).get(snapshot_id).await
    }

    async fn list(&self, filter: &SnapshotFilter) -> Result<Vec<SnapshotSummary>> {
        (**self).list(filter).await
    }
}

/// In-process store backed by a `HashMap`.
#[derive(Clone, Debug, Default)]
pub struct MemorySnapshotStore {
    snapshots: Arc<RwLock<HashMap<String, Snapshot>>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.snapshots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.snapshots.read().await.is_empty()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn insert(&self, snapshot: Snapshot) -> Result<()> {
        let mut snapshots = self.snapshots.write().await;
        if snapshots.contains_key(&snapshot.snapshot_id) {
            return Err(TrinoDriftError::Store(format!(
                "duplicate snapshot id '{}'",
                snapshot.snapshot_id
            )));
        }
        snapshots.insert(snapshot.snapshot_id.clone(), snapshot);
        Ok(())
    }

    async fn get(&self, snapshot_id: &str) -> Result<Option<Snapshot>> {
        Ok(self.snapshots.read().await.get(snapshot_id).cloned())
    }

    async fn list(&self, filter: &SnapshotFilter) -> Result<Vec<SnapshotSummary>> {
        let snapshots = self.snapshots.read().await;
        let mut matching: Vec<SnapshotSummary> = snapshots
            .values()
            .filter(|snapshot| filter.matches(snapshot))
            .map(Snapshot::summary)
            .collect();
        matching.sort_by(|a, b| {
            b.captured_at
                .cmp(&a.captured_at)
                .then_with(|| b.snapshot_id.cmp(&a.snapshot_id))
        });
        matching.truncate(SNAPSHOT_LIST_LIMIT);
        Ok(matching)
    }
}
