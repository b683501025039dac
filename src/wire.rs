use serde::Deserialize;

/// One response of the statement protocol, either from the initial
/// `POST /v1/statement` or from following a `nextUri`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResults {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub next_uri: Option<String>,
    #[serde(default)]
    pub columns: Option<Vec<Column>>,
    #[serde(default)]
    pub data: Option<Vec<Vec<serde_json::Value>>>,
    #[serde(default)]
    pub stats: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<QueryError>,
}

#[derive(Debug, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type", default)]
    pub data_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryError {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub error_name: Option<String>,
}

/// Rows and descriptors accumulated over a full continuation chain.
#[derive(Debug, Default)]
pub struct Accumulated {
    pub query_id: Option<String>,
    pub columns: Vec<Column>,
    pub data: Vec<Vec<serde_json::Value>>,
    pub stats: Option<serde_json::Value>,
}

impl Accumulated {
    /// Folds one fragment in. Rows are appended in arrival order, the first
    /// fragment that carries columns fixes them, and the latest stats win.
    pub fn merge(&mut self, fragment: QueryResults) {
        if self.query_id.is_none() {
            self.query_id = fragment.id;
        }
        if self.columns.is_empty() {
            if let Some(columns) = fragment.columns {
                self.columns = columns;
            }
        }
        if let Some(rows) = fragment.data {
            self.data.extend(rows);
        }
        if fragment.stats.is_some() {
            self.stats = fragment.stats;
        }
    }
}
