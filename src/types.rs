use serde::{Deserialize, Serialize};

use crate::Row;

/// Column descriptor as reported by the engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Col {
    pub name: String,
    #[serde(rename = "type", default)]
    pub data_type: Option<String>,
}

/// Row-oriented result of a fully drained statement.
///
/// `row_count` always equals `rows.len()`, and every row holds the names
/// listed in `cols`, in that order. Rows are keyed by name, so when the
/// engine reports the same column name twice the row holds it once, with
/// the value of the later column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub cols: Vec<Col>,
    pub rows: Vec<Row>,
    pub row_count: usize,
    /// Engine query id of the first fragment, when reported.
    #[serde(default)]
    pub query_id: Option<String>,
    /// Stats object of the last fragment that carried one; an empty object
    /// when the engine sent none.
    #[serde(default)]
    pub stats: serde_json::Value,
}

impl QueryResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column names in result order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.cols.iter().map(|col| col.name.as_str())
    }
}

/// Outcome of [`crate::TrinoClient::test_connection`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConnectionStatus {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<QueryResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
