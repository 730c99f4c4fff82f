//! Fixture backend -- serves canned rows keyed by query label.
//!
//! Lets the service run end to end without a warehouse: local development,
//! demos, and the CLI integration tests. Fixture files look like
//!
//! ```json
//! {
//!   "rows": { "latest": [ {"query": "...", "total_impressions": 10} ] },
//!   "errors": { "trend": "Access Denied: Table keyword_ownership_summary" },
//!   "procedures": ["analytics.gsc_export.generate_keyword_actions"]
//! }
//! ```
//!
//! Lookup order for a query label:
//! 1. `errors` entry → [`BackendError::Fixture`]
//! 2. `rows` entry → those rows
//! 3. otherwise → [`BackendError::FixtureMissing`]
//!
//! Procedures succeed when listed in `procedures` (or when the list is
//! empty) and fail with the `errors` entry for their name if one exists.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::{AnalyticsBackend, BackendError, Query, Row};

#[derive(Debug, Default, Deserialize)]
struct FixtureFile {
    #[serde(default)]
    rows: HashMap<String, Vec<Row>>,
    #[serde(default)]
    errors: HashMap<String, String>,
    #[serde(default)]
    procedures: Vec<String>,
}

/// [`AnalyticsBackend`] that answers from in-memory fixtures.
#[derive(Debug, Default)]
pub struct FixtureBackend {
    rows: HashMap<String, Vec<Row>>,
    errors: HashMap<String, String>,
    procedures: Vec<String>,
    /// Procedure calls received, in order.
    calls: Mutex<Vec<String>>,
    /// Query labels received, in order.
    queries: Mutex<Vec<Query>>,
}

impl FixtureBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load fixtures from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self, BackendError> {
        let text = std::fs::read_to_string(path).map_err(|source| BackendError::FixtureRead {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text).map_err(|source| BackendError::FixtureParse {
            path: path.display().to_string(),
            source,
        })
    }

    fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        let file: FixtureFile = serde_json::from_str(text)?;
        Ok(FixtureBackend {
            rows: file.rows,
            errors: file.errors,
            procedures: file.procedures,
            ..Self::default()
        })
    }

    /// Register rows for a query label.
    pub fn with_rows(mut self, label: &str, rows: Vec<Row>) -> Self {
        self.rows.insert(label.to_string(), rows);
        self
    }

    /// Make queries with `label` (or calls to the procedure `label`) fail.
    pub fn with_error(mut self, label: &str, message: &str) -> Self {
        self.errors.insert(label.to_string(), message.to_string());
        self
    }

    /// Procedure names called so far.
    pub async fn procedure_calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    /// Queries run so far.
    pub async fn executed_queries(&self) -> Vec<Query> {
        self.queries.lock().await.clone()
    }

    fn fixture_error(&self, label: &str) -> Option<BackendError> {
        self.errors.get(label).map(|message| BackendError::Fixture {
            label: label.to_string(),
            message: message.clone(),
        })
    }
}

#[async_trait]
impl AnalyticsBackend for FixtureBackend {
    async fn run_query(&self, query: &Query) -> Result<Vec<Row>, BackendError> {
        self.queries.lock().await.push(query.clone());

        if let Some(err) = self.fixture_error(&query.label) {
            return Err(err);
        }
        self.rows
            .get(&query.label)
            .cloned()
            .ok_or_else(|| BackendError::FixtureMissing {
                label: query.label.clone(),
            })
    }

    async fn call_procedure(&self, procedure: &str) -> Result<(), BackendError> {
        self.calls.lock().await.push(procedure.to_string());

        if let Some(err) = self.fixture_error(procedure) {
            return Err(err);
        }
        if !self.procedures.is_empty() && !self.procedures.iter().any(|p| p == procedure) {
            return Err(BackendError::FixtureMissing {
                label: procedure.to_string(),
            });
        }
        Ok(())
    }

    fn backend_id(&self) -> &str {
        "fixture"
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: serde_json::Value) -> Row {
        match value {
            serde_json::Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[tokio::test]
    async fn returns_registered_rows() {
        let backend = FixtureBackend::new().with_rows(
            "latest",
            vec![row(json!({"query": "a", "total_impressions": 5}))],
        );
        let rows = backend
            .run_query(&Query::new("latest", "SELECT 1"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["query"], json!("a"));

        let executed = backend.executed_queries().await;
        assert_eq!(executed, vec![Query::new("latest", "SELECT 1")]);
    }

    #[tokio::test]
    async fn unknown_label_is_fixture_missing() {
        let backend = FixtureBackend::new();
        let result = backend.run_query(&Query::new("trend", "SELECT 1")).await;
        assert!(matches!(result, Err(BackendError::FixtureMissing { ref label }) if label == "trend"));
    }

    #[tokio::test]
    async fn declared_error_wins_over_rows() {
        let backend = FixtureBackend::new()
            .with_rows("trend", Vec::new())
            .with_error("trend", "Access Denied");
        let result = backend.run_query(&Query::new("trend", "SELECT 1")).await;
        match result {
            Err(BackendError::Fixture { message, .. }) => assert_eq!(message, "Access Denied"),
            other => panic!("expected fixture error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn procedures_are_recorded() {
        let backend = FixtureBackend::new();
        backend.call_procedure("p.ds.proc").await.unwrap();
        backend.call_procedure("p.ds.proc").await.unwrap();
        assert_eq!(backend.procedure_calls().await, vec!["p.ds.proc", "p.ds.proc"]);
    }

    #[tokio::test]
    async fn procedure_allow_list_is_enforced() {
        let backend =
            FixtureBackend::from_json_str(r#"{"procedures": ["p.ds.allowed"]}"#).unwrap();
        assert!(backend.call_procedure("p.ds.allowed").await.is_ok());
        let result = backend.call_procedure("p.ds.other").await;
        assert!(matches!(result, Err(BackendError::FixtureMissing { .. })));
    }

    #[test]
    fn loads_fixture_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixture.json");
        std::fs::write(
            &path,
            r#"{
                "rows": {"latest": [{"query": "q", "total_impressions": 1}]},
                "errors": {"metrics": "boom"}
            }"#,
        )
        .unwrap();

        let backend = FixtureBackend::from_path(&path).unwrap();
        assert_eq!(backend.rows["latest"].len(), 1);
        assert_eq!(backend.errors["metrics"], "boom");
        assert!(backend.procedures.is_empty());
    }

    #[test]
    fn invalid_fixture_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        let result = FixtureBackend::from_path(&path);
        assert!(matches!(result, Err(BackendError::FixtureParse { .. })));
    }

    #[test]
    fn missing_fixture_file_is_read_error() {
        let result = FixtureBackend::from_path(Path::new("/nonexistent/fixture.json"));
        assert!(matches!(result, Err(BackendError::FixtureRead { .. })));
    }
}
