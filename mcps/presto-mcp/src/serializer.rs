//! Output shapes for query results

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::error::QueryError;
use crate::executor::QueryResult;

/// Tabular value handed to pipeline hosts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TabularValue {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub row_count: usize,
}

impl TabularValue {
    /// One object per row, keyed by column name
    pub fn records(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }
}

/// Encode a result as a JSON array of row objects, e.g.
/// `[{"id":1,"name":"a"},{"id":2,"name":"b"}]`
///
/// Keys follow column order. Duplicate column names are rejected since a
/// record cannot hold them.
pub fn to_json_records(result: &QueryResult) -> Result<String, QueryError> {
    let mut seen = HashSet::with_capacity(result.columns.len());
    if let Some(duplicate) = result.columns.iter().find(|c| !seen.insert(c.as_str())) {
        return Err(QueryError::DuplicateColumn(duplicate.clone()));
    }

    let records: Vec<Value> = result
        .rows
        .iter()
        .map(|row| {
            let record: Map<String, Value> = result
                .columns
                .iter()
                .cloned()
                .zip(row.iter().cloned())
                .collect();
            Value::Object(record)
        })
        .collect();

    Ok(serde_json::to_string(&records)?)
}

/// Wrap a result for pipeline consumers without string encoding
pub fn to_tabular_value(result: QueryResult) -> TabularValue {
    TabularValue {
        row_count: result.rows.len(),
        columns: result.columns,
        rows: result.rows,
    }
}
