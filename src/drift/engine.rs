use chrono::Utc;

use crate::{
    drift::{
        compare::{self, required_str},
        record::{DriftRecord, DriftReport, RowCountDrift, TableDrift},
    },
    queries,
    snapshot::{Snapshot, SnapshotFilter, SnapshotStore, SnapshotSummary},
    Ident, Result, Row, StatementExecutor, TrinoDriftError,
};

/// Attempts at finding a free snapshot id before giving up.
const SNAPSHOT_ID_ATTEMPTS: usize = 3;

/// Compares catalogs with each other, or with stored snapshots.
///
/// Every operation issues its statements one after another through the
/// executor; nothing is shared between calls except the snapshot store.
#[derive(Clone, Debug)]
pub struct DriftEngine<E, S> {
    executor: E,
    store: S,
}

impl<E, S> DriftEngine<E, S>
where
    E: StatementExecutor,
    S: SnapshotStore,
{
    pub fn new(executor: E, store: S) -> Self {
        Self { executor, store }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Column-level differences between `source` and `target`, ordered by
    /// table then column name.
    pub async fn detect_schema_drift(
        &self,
        source: &Ident,
        target: &Ident,
        schema: &Ident,
    ) -> Result<Vec<DriftRecord>> {
        #[cfg(feature = "tracing")]
        tracing::info!(%source, %target, %schema, "detecting schema drift");

        let result = self
            .executor
            .execute(&queries::column_diff(source, target, schema))
            .await?;
        compare::schema_drifts(&result)
    }

    /// Base tables of `source` whose row count differs in `target`.
    ///
    /// A table whose counts cannot be read is logged and left out; only the
    /// initial table listing can fail the whole call.
    pub async fn detect_row_count_drift(
        &self,
        source: &Ident,
        target: &Ident,
        schema: &Ident,
    ) -> Result<Vec<RowCountDrift>> {
        let tables = self
            .executor
            .execute(&queries::list_tables(source, schema))
            .await?;

        let mut drifts = Vec::new();
        for row in &tables.rows {
            match self.compare_table_counts(row, source, target, schema).await {
                Ok(Some(drift)) => drifts.push(drift),
                Ok(None) => {}
                Err(err) => skip_table(row, &err),
            }
        }
        Ok(drifts)
    }

    async fn compare_table_counts(
        &self,
        row: &Row,
        source: &Ident,
        target: &Ident,
        schema: &Ident,
    ) -> Result<Option<RowCountDrift>> {
        let table = Ident::new(required_str(row, "table_name")?)?;
        let source_count = self.count_rows(source, schema, &table).await?;
        let target_count = self.count_rows(target, schema, &table).await?;
        Ok(RowCountDrift::between(
            table.as_str(),
            source_count,
            target_count,
        ))
    }

    async fn count_rows(&self, catalog: &Ident, schema: &Ident, table: &Ident) -> Result<i64> {
        let result = self
            .executor
            .execute(&queries::row_count(catalog, schema, table))
            .await?;
        result
            .rows
            .first()
            .and_then(|row| row.get_i64("row_count"))
            .ok_or_else(|| {
                TrinoDriftError::Protocol(format!(
                    "row count of {catalog}.{schema}.{table} returned no value"
                ))
            })
    }

    /// Base tables present in only one of the two catalogs.
    pub async fn detect_missing_tables(
        &self,
        source: &Ident,
        target: &Ident,
        schema: &Ident,
    ) -> Result<Vec<TableDrift>> {
        let result = self
            .executor
            .execute(&queries::missing_tables(source, target, schema))
            .await?;
        compare::table_drifts(&result)
    }

    /// Captures the column listing of `database.schema` and returns the new
    /// snapshot id. Nothing is stored unless the listing succeeded.
    pub async fn capture_snapshot(&self, database: &Ident, schema: &Ident) -> Result<String> {
        let data = self
            .executor
            .execute(&queries::list_columns(database, schema))
            .await?;
        let captured_at = Utc::now();
        let base_id = format!("SNAP_{}", captured_at.format("%Y%m%d%H%M%S%6f"));

        let mut snapshot = Snapshot {
            snapshot_id: base_id.clone(),
            database: database.to_string(),
            schema: schema.to_string(),
            captured_at,
            data,
        };

        for attempt in 1..=SNAPSHOT_ID_ATTEMPTS {
            match self.store.insert(snapshot.clone()).await {
                Ok(()) => {
                    #[cfg(feature = "tracing")]
                    tracing::info!(
                        snapshot_id = %snapshot.snapshot_id,
                        %database,
                        %schema,
                        columns_captured = snapshot.columns_captured(),
                        "schema snapshot captured"
                    );
                    return Ok(snapshot.snapshot_id);
                }
                Err(err @ TrinoDriftError::Store(_)) if attempt < SNAPSHOT_ID_ATTEMPTS => {
                    if self.store.get(&snapshot.snapshot_id).await?.is_none() {
                        return Err(err);
                    }
                    snapshot.snapshot_id = format!("{base_id}_{attempt}");
                }
                Err(err) => return Err(err),
            }
        }

        Err(TrinoDriftError::Store(format!(
            "no free snapshot id after {SNAPSHOT_ID_ATTEMPTS} attempts starting at '{base_id}'"
        )))
    }

    /// Diffs the current column listing of `database.schema` against a
    /// stored snapshot.
    ///
    /// Removed and changed columns come first, then added ones; no further
    /// ordering is promised.
    pub async fn compare_with_snapshot(
        &self,
        snapshot_id: &str,
        database: &Ident,
        schema: &Ident,
    ) -> Result<Vec<DriftRecord>> {
        let snapshot = self
            .store
            .get(snapshot_id)
            .await?
            .ok_or_else(|| TrinoDriftError::NotFound(format!("snapshot {snapshot_id}")))?;

        let current = self
            .executor
            .execute(&queries::list_columns(database, schema))
            .await?;
        let drifts = compare::compare_columns(&snapshot.data, &current, snapshot.captured_at)?;

        #[cfg(feature = "tracing")]
        tracing::info!(snapshot_id, drifts_found = drifts.len(), "compared with snapshot");

        Ok(drifts)
    }

    /// Stored snapshots, newest first, optionally filtered.
    pub async fn list_snapshots(
        &self,
        database: Option<&str>,
        schema: Option<&str>,
    ) -> Result<Vec<SnapshotSummary>> {
        let filter = SnapshotFilter {
            database: database.map(str::to_owned),
            schema: schema.map(str::to_owned),
        };
        self.store.list(&filter).await
    }

    /// Runs missing-table, schema and row-count detection in that order.
    ///
    /// Never fails: the first detection error stops the run and is recorded
    /// in `error`, keeping every section computed before it.
    pub async fn get_drift_report(
        &self,
        source: &Ident,
        target: &Ident,
        schema: &Ident,
    ) -> DriftReport {
        let mut report = DriftReport {
            timestamp: Utc::now(),
            source: source.to_string(),
            target: target.to_string(),
            schema: schema.to_string(),
            missing_tables: Vec::new(),
            schema_drifts: Vec::new(),
            data_drifts: Vec::new(),
            summary: Default::default(),
            error: None,
        };

        if let Err(err) = self.fill_report(&mut report, source, target, schema).await {
            #[cfg(feature = "tracing")]
            tracing::error!(error = %err, %source, %target, "error generating drift report");
            report.error = Some(err.to_string());
        }
        report.tally();

        #[cfg(feature = "tracing")]
        tracing::info!(
            %source,
            %target,
            total_drifts = report.summary.total_drifts,
            critical_drifts = report.summary.critical_drifts,
            "drift report generated"
        );

        report
    }

    async fn fill_report(
        &self,
        report: &mut DriftReport,
        source: &Ident,
        target: &Ident,
        schema: &Ident,
    ) -> Result<()> {
        report.missing_tables = self.detect_missing_tables(source, target, schema).await?;
        report.schema_drifts = self.detect_schema_drift(source, target, schema).await?;
        report.data_drifts = self.detect_row_count_drift(source, target, schema).await?;
        Ok(())
    }
}

fn skip_table(row: &Row, err: &TrinoDriftError) {
    #[cfg(feature = "tracing")]
    tracing::warn!(
        table = row.get_str("table_name").unwrap_or("<unnamed>"),
        error = %err,
        "could not compare table row counts"
    );
    #[cfg(not(feature = "tracing"))]
    let _ = (row, err);
}

