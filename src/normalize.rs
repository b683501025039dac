use serde_json::Value;

use crate::{
    wire::{self, Accumulated},
    Col, QueryResult, Row,
};

/// Pairs positional row values with column descriptors.
///
/// Total over any input: short rows are padded with nulls, surplus values
/// beyond the last column are dropped, and `row_count` is the number of rows
/// produced regardless of what the engine stats claim.
pub(crate) fn normalize(result: Accumulated) -> QueryResult {
    let cols: Vec<Col> = result.columns.into_iter().map(decode_col).collect();

    let rows: Vec<Row> = result
        .data
        .into_iter()
        .map(|values| pair_row(&cols, values))
        .collect();

    QueryResult {
        row_count: rows.len(),
        cols,
        rows,
        query_id: result.query_id,
        stats: result
            .stats
            .unwrap_or_else(|| Value::Object(serde_json::Map::new())),
    }
}

fn decode_col(col: wire::Column) -> Col {
    Col {
        name: col.name,
        data_type: col.data_type,
    }
}

/// A repeated column name keeps the later value.
fn pair_row(cols: &[Col], values: Vec<Value>) -> Row {
    let mut values = values.into_iter();
    cols.iter()
        .map(|col| (col.name.clone(), values.next().unwrap_or(Value::Null)))
        .collect()
}
