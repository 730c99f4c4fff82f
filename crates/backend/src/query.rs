/// A single result row: column name to JSON value, in the order the backend
/// returned the columns.
///
/// Rows are deliberately untyped. Their shape is whatever the analytics
/// table produces and may change without this service changing.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// A labelled, parameterless SQL statement.
///
/// The label names the request mode that produced the statement. BigQuery
/// receives it as a job label; the fixture backend uses it as its lookup key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub label: String,
    pub sql: String,
}

impl Query {
    pub fn new(label: impl Into<String>, sql: impl Into<String>) -> Self {
        Query {
            label: label.into(),
            sql: sql.into(),
        }
    }
}
