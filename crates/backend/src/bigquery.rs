//! BigQuery backend -- runs statements through the BigQuery v2 REST API.
//!
//! Uses `ureq` (sync) wrapped in `tokio::task::spawn_blocking` to avoid
//! blocking the async runtime. A statement is submitted with `jobs.query`;
//! if the job has not finished inside the request timeout, the job's results
//! are polled with `jobs.getQueryResults` until it completes, then any
//! remaining result pages are fetched.
//!
//! Obtaining the OAuth access token is outside this crate: the token is
//! taken from [`BigQueryConfig`] or the `OWNERSHIP_ACCESS_TOKEN` env var.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{AnalyticsBackend, BackendError, Query, Row};

/// Root of the BigQuery v2 REST API.
pub const DEFAULT_API_ROOT: &str = "https://bigquery.googleapis.com/bigquery/v2";

/// Env var holding the OAuth bearer token.
const ACCESS_TOKEN_ENV: &str = "OWNERSHIP_ACCESS_TOKEN";

/// Server-side wait per request before BigQuery answers `jobComplete: false`.
const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Number of `getQueryResults` polls before giving up on a job.
const DEFAULT_MAX_POLLS: u32 = 60;

// ──────────────────────────────────────────────
// Configuration
// ──────────────────────────────────────────────

/// Connection settings for [`BigQueryBackend`].
#[derive(Debug, Clone)]
pub struct BigQueryConfig {
    /// Project that runs (and is billed for) the jobs.
    pub project: String,
    /// Optional job location, e.g. `US` or `europe-west2`.
    pub location: Option<String>,
    /// OAuth bearer token. `None` leaves the backend unconfigured.
    pub access_token: Option<String>,
    pub api_root: String,
    pub timeout_ms: u64,
    pub max_polls: u32,
}

impl BigQueryConfig {
    pub fn new(project: &str) -> Self {
        BigQueryConfig {
            project: project.to_string(),
            location: None,
            access_token: None,
            api_root: DEFAULT_API_ROOT.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_polls: DEFAULT_MAX_POLLS,
        }
    }

    /// Build a config for `project`, reading the access token from
    /// `OWNERSHIP_ACCESS_TOKEN`. Empty values count as unset.
    pub fn from_env(project: &str) -> Self {
        let access_token = std::env::var(ACCESS_TOKEN_ENV)
            .ok()
            .filter(|t| !t.is_empty());
        BigQueryConfig {
            access_token,
            ..Self::new(project)
        }
    }

    fn queries_url(&self) -> String {
        format!(
            "{}/projects/{}/queries",
            self.api_root.trim_end_matches('/'),
            self.project
        )
    }

    fn results_url(&self, job_id: &str) -> String {
        format!("{}/{}", self.queries_url(), job_id)
    }
}

// ──────────────────────────────────────────────
// Wire types
// ──────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    query: &'a str,
    use_legacy_sql: bool,
    timeout_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a str>,
    labels: BTreeMap<&'static str, String>,
}

/// Shared shape of `jobs.query` and `jobs.getQueryResults` responses.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    #[serde(default)]
    schema: Option<TableSchema>,
    #[serde(default)]
    job_reference: Option<JobReference>,
    #[serde(default)]
    rows: Vec<Value>,
    #[serde(default)]
    page_token: Option<String>,
    #[serde(default)]
    job_complete: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    job_id: String,
    #[serde(default)]
    location: Option<String>,
}

/// Result schema reported by BigQuery alongside the rows.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TableSchema {
    #[serde(default)]
    pub fields: Vec<TableField>,
}

/// One column of a [`TableSchema`]. `RECORD` columns carry nested fields.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TableField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub fields: Vec<TableField>,
}

impl TableField {
    fn is_repeated(&self) -> bool {
        self.mode.as_deref() == Some("REPEATED")
    }
}

// ──────────────────────────────────────────────
// Row decoding
// ──────────────────────────────────────────────

/// Decode BigQuery's `rows[].f[].v` cell encoding into named rows.
///
/// BigQuery sends every scalar as a string. Integers, finite floats and
/// booleans become JSON numbers and bools; `JSON` columns are parsed;
/// everything else (dates, timestamps, NUMERIC) stays a string so no
/// precision is lost. Unparseable scalars are kept as their original text.
pub fn decode_rows(schema: &TableSchema, rows: &[Value]) -> Result<Vec<Row>, BackendError> {
    rows.iter()
        .map(|row| decode_record(&schema.fields, row))
        .collect()
}

fn decode_record(fields: &[TableField], record: &Value) -> Result<Row, BackendError> {
    let cells = record
        .get("f")
        .and_then(Value::as_array)
        .ok_or_else(|| decode_error("row", "missing 'f' cell list"))?;

    if cells.len() != fields.len() {
        return Err(decode_error(
            "row",
            &format!(
                "schema has {} fields but row has {} cells",
                fields.len(),
                cells.len()
            ),
        ));
    }

    let mut row = Row::new();
    for (field, cell) in fields.iter().zip(cells) {
        let raw = cell.get("v").unwrap_or(&Value::Null);
        row.insert(field.name.clone(), decode_cell(field, raw)?);
    }
    Ok(row)
}

fn decode_cell(field: &TableField, raw: &Value) -> Result<Value, BackendError> {
    if raw.is_null() {
        return Ok(Value::Null);
    }
    if !field.is_repeated() {
        return decode_value(field, raw);
    }

    let items = raw
        .as_array()
        .ok_or_else(|| decode_error(&field.name, "repeated field is not an array"))?;
    items
        .iter()
        .map(|item| decode_value(field, item.get("v").unwrap_or(&Value::Null)))
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}

fn decode_value(field: &TableField, raw: &Value) -> Result<Value, BackendError> {
    if raw.is_null() {
        return Ok(Value::Null);
    }
    match field.field_type.as_str() {
        "RECORD" | "STRUCT" => decode_record(&field.fields, raw).map(Value::Object),
        other => {
            let text = raw
                .as_str()
                .ok_or_else(|| decode_error(&field.name, "expected a string cell"))?;
            Ok(decode_scalar(other, text))
        }
    }
}

fn decode_scalar(field_type: &str, text: &str) -> Value {
    let fallback = || Value::String(text.to_string());
    match field_type {
        "INTEGER" | "INT64" => text.parse::<i64>().map(Value::from).unwrap_or_else(|_| fallback()),
        "FLOAT" | "FLOAT64" => text
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(fallback),
        "BOOLEAN" | "BOOL" => match text {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => fallback(),
        },
        "JSON" => serde_json::from_str(text).unwrap_or_else(|_| fallback()),
        _ => fallback(),
    }
}

fn decode_error(what: &str, message: &str) -> BackendError {
    BackendError::Decode {
        what: what.to_string(),
        message: message.to_string(),
    }
}

// ──────────────────────────────────────────────
// HTTP plumbing
// ──────────────────────────────────────────────

/// Agent that hands back 4xx/5xx responses instead of erroring, so the
/// BigQuery error payload can be reported.
fn agent() -> ureq::Agent {
    ureq::Agent::config_builder()
        .http_status_as_error(false)
        .build()
        .into()
}

fn read_response<T: DeserializeOwned>(
    url: &str,
    result: Result<ureq::http::Response<ureq::Body>, ureq::Error>,
) -> Result<T, BackendError> {
    let response = result.map_err(|source| BackendError::Transport {
        url: url.to_string(),
        source,
    })?;
    let status = response.status().as_u16();
    let text = response
        .into_body()
        .read_to_string()
        .map_err(|source| BackendError::Transport {
            url: url.to_string(),
            source,
        })?;

    if !(200..300).contains(&status) {
        let (message, reason) = match serde_json::from_str::<Value>(&text) {
            Ok(body) => error_details(&body),
            Err(_) => (text, None),
        };
        return Err(BackendError::Status {
            status,
            message,
            reason,
        });
    }

    serde_json::from_str(&text).map_err(|e| decode_error("query response", &e.to_string()))
}

/// Pull `error.message` and the first `error.errors[].reason` out of a
/// Google API error payload.
fn error_details(body: &Value) -> (String, Option<String>) {
    let error = body.get("error");
    let message = error
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .map(|s| s.to_string())
        .unwrap_or_else(|| body.to_string());
    let reason = error
        .and_then(|e| e.get("errors"))
        .and_then(Value::as_array)
        .and_then(|errors| errors.first())
        .and_then(|e| e.get("reason"))
        .and_then(Value::as_str)
        .map(|s| s.to_string());
    (message, reason)
}

fn fetch_results(
    agent: &ureq::Agent,
    config: &BigQueryConfig,
    bearer: &str,
    job: &JobReference,
    page_token: Option<&str>,
) -> Result<QueryResponse, BackendError> {
    let url = config.results_url(&job.job_id);
    let mut request = agent
        .get(&url)
        .header("Authorization", bearer)
        .query("timeoutMs", config.timeout_ms.to_string());
    if let Some(location) = job.location.as_deref().or(config.location.as_deref()) {
        request = request.query("location", location);
    }
    if let Some(token) = page_token {
        request = request.query("pageToken", token);
    }
    read_response(&url, request.call())
}

/// Submit a statement and collect every result row. Blocking.
fn execute(config: &BigQueryConfig, token: &str, query: &Query) -> Result<Vec<Row>, BackendError> {
    let agent = agent();
    let bearer = format!("Bearer {}", token);
    let url = config.queries_url();

    let request = QueryRequest {
        query: &query.sql,
        use_legacy_sql: false,
        timeout_ms: config.timeout_ms,
        location: config.location.as_deref(),
        labels: [("mode", query.label.clone())].into_iter().collect(),
    };
    let mut response: QueryResponse = read_response(
        &url,
        agent
            .post(&url)
            .header("Authorization", &bearer)
            .send_json(&request),
    )?;

    let mut polls = 0;
    while !response.job_complete {
        let job = response
            .job_reference
            .clone()
            .ok_or_else(|| decode_error("query response", "incomplete job has no jobReference"))?;
        if polls >= config.max_polls {
            return Err(BackendError::JobTimeout {
                job_id: job.job_id,
                polls,
            });
        }
        polls += 1;
        tracing::debug!(job_id = %job.job_id, polls, "job still running");
        response = fetch_results(&agent, config, &bearer, &job, None)?;
    }

    let QueryResponse {
        schema,
        job_reference,
        rows: first_page,
        mut page_token,
        ..
    } = response;
    // Statements without a result set (CALL, DML) come back without a schema.
    let schema = schema.unwrap_or_default();
    let mut rows = decode_rows(&schema, &first_page)?;

    while let Some(token) = page_token {
        let job = job_reference
            .as_ref()
            .ok_or_else(|| decode_error("query response", "paged result has no jobReference"))?;
        let page = fetch_results(&agent, config, &bearer, job, Some(&token))?;
        rows.extend(decode_rows(&schema, &page.rows)?);
        page_token = page.page_token;
    }

    Ok(rows)
}

// ──────────────────────────────────────────────
// BigQueryBackend
// ──────────────────────────────────────────────

/// [`AnalyticsBackend`] backed by the BigQuery REST API.
pub struct BigQueryBackend {
    config: BigQueryConfig,
}

impl BigQueryBackend {
    pub fn new(config: BigQueryConfig) -> Self {
        BigQueryBackend { config }
    }

    /// Standard SQL statement invoking a zero-argument procedure.
    ///
    /// `analytics.dataset.proc` → ``CALL `analytics.dataset.proc`()``
    pub fn procedure_sql(procedure: &str) -> String {
        format!("CALL `{}`()", procedure)
    }

    fn access_token(&self) -> Result<String, BackendError> {
        self.config
            .access_token
            .clone()
            .ok_or_else(|| BackendError::NotConfigured {
                message: format!(
                    "no access token for project '{}' (set {})",
                    self.config.project, ACCESS_TOKEN_ENV
                ),
            })
    }
}

#[async_trait]
impl AnalyticsBackend for BigQueryBackend {
    async fn run_query(&self, query: &Query) -> Result<Vec<Row>, BackendError> {
        let token = self.access_token()?;
        let config = self.config.clone();
        let query = query.clone();

        tracing::debug!(label = %query.label, project = %config.project, "submitting query job");
        tokio::task::spawn_blocking(move || execute(&config, &token, &query))
            .await
            .map_err(|source| BackendError::Task { source })?
    }

    async fn call_procedure(&self, procedure: &str) -> Result<(), BackendError> {
        let query = Query::new("procedure", Self::procedure_sql(procedure));
        self.run_query(&query).await.map(|_| ())
    }

    fn backend_id(&self) -> &str {
        "bigquery"
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field(name: &str, field_type: &str) -> TableField {
        TableField {
            name: name.to_string(),
            field_type: field_type.to_string(),
            mode: None,
            fields: Vec::new(),
        }
    }

    #[test]
    fn queries_url_includes_project() {
        let config = BigQueryConfig::new("analytics-prod");
        assert_eq!(
            config.queries_url(),
            "https://bigquery.googleapis.com/bigquery/v2/projects/analytics-prod/queries"
        );
        assert_eq!(
            config.results_url("job_123"),
            "https://bigquery.googleapis.com/bigquery/v2/projects/analytics-prod/queries/job_123"
        );
    }

    #[test]
    fn api_root_trailing_slash_is_ignored() {
        let mut config = BigQueryConfig::new("p");
        config.api_root = "http://localhost:9050/bigquery/v2/".to_string();
        assert_eq!(
            config.queries_url(),
            "http://localhost:9050/bigquery/v2/projects/p/queries"
        );
    }

    #[test]
    fn procedure_sql_quotes_name() {
        assert_eq!(
            BigQueryBackend::procedure_sql("proj.ds.generate_keyword_actions"),
            "CALL `proj.ds.generate_keyword_actions`()"
        );
    }

    #[test]
    fn query_request_uses_camel_case() {
        let request = QueryRequest {
            query: "SELECT 1",
            use_legacy_sql: false,
            timeout_ms: 500,
            location: None,
            labels: [("mode", "latest".to_string())].into_iter().collect(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "query": "SELECT 1",
                "useLegacySql": false,
                "timeoutMs": 500,
                "labels": {"mode": "latest"}
            })
        );
    }

    #[tokio::test]
    async fn missing_token_returns_not_configured() {
        let backend = BigQueryBackend::new(BigQueryConfig::new("p"));
        let result = backend.run_query(&Query::new("latest", "SELECT 1")).await;
        assert!(matches!(result, Err(BackendError::NotConfigured { .. })));

        let result = backend.call_procedure("p.ds.proc").await;
        assert!(matches!(result, Err(BackendError::NotConfigured { .. })));
    }

    #[test]
    fn decodes_typed_scalars_in_schema_order() {
        let schema = TableSchema {
            fields: vec![
                field("query", "STRING"),
                field("total_impressions", "INTEGER"),
                field("shop_position", "FLOAT"),
                field("is_branded", "BOOLEAN"),
                field("snapshot_date", "DATE"),
            ],
        };
        let rows = vec![json!({"f": [
            {"v": "blue light glasses"},
            {"v": "1520"},
            {"v": "3.25"},
            {"v": "false"},
            {"v": "2024-05-01"}
        ]})];

        let decoded = decode_rows(&schema, &rows).unwrap();
        assert_eq!(decoded.len(), 1);
        let row = &decoded[0];
        assert_eq!(row["query"], json!("blue light glasses"));
        assert_eq!(row["total_impressions"], json!(1520));
        assert_eq!(row["shop_position"], json!(3.25));
        assert_eq!(row["is_branded"], json!(false));
        assert_eq!(row["snapshot_date"], json!("2024-05-01"));

        let keys: Vec<&str> = row.keys().map(|k| k.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "query",
                "total_impressions",
                "shop_position",
                "is_branded",
                "snapshot_date"
            ]
        );
    }

    #[test]
    fn null_cells_stay_null() {
        let schema = TableSchema {
            fields: vec![field("previous_impressions", "INTEGER")],
        };
        let rows = vec![json!({"f": [{"v": null}]})];
        let decoded = decode_rows(&schema, &rows).unwrap();
        assert_eq!(decoded[0]["previous_impressions"], Value::Null);
    }

    #[test]
    fn unparseable_integer_keeps_text() {
        assert_eq!(decode_scalar("INTEGER", "12x"), json!("12x"));
        assert_eq!(decode_scalar("FLOAT", "NaN"), json!("NaN"));
        assert_eq!(decode_scalar("NUMERIC", "12.3400"), json!("12.3400"));
    }

    #[test]
    fn json_columns_are_parsed() {
        assert_eq!(
            decode_scalar("JSON", r#"[{"priority":"high","actions":2}]"#),
            json!([{"priority": "high", "actions": 2}])
        );
    }

    #[test]
    fn decodes_repeated_records() {
        let schema = TableSchema {
            fields: vec![TableField {
                name: "by_priority".to_string(),
                field_type: "RECORD".to_string(),
                mode: Some("REPEATED".to_string()),
                fields: vec![field("priority", "STRING"), field("actions", "INT64")],
            }],
        };
        let rows = vec![json!({"f": [{"v": [
            {"v": {"f": [{"v": "high"}, {"v": "3"}]}},
            {"v": {"f": [{"v": "normal"}, {"v": "7"}]}}
        ]}]})];

        let decoded = decode_rows(&schema, &rows).unwrap();
        assert_eq!(
            decoded[0]["by_priority"],
            json!([
                {"priority": "high", "actions": 3},
                {"priority": "normal", "actions": 7}
            ])
        );
    }

    #[test]
    fn cell_count_mismatch_is_decode_error() {
        let schema = TableSchema {
            fields: vec![field("a", "STRING"), field("b", "STRING")],
        };
        let rows = vec![json!({"f": [{"v": "only one"}]})];
        let result = decode_rows(&schema, &rows);
        assert!(matches!(result, Err(BackendError::Decode { .. })));
    }

    #[test]
    fn response_deserializes_incomplete_job() {
        let response: QueryResponse = serde_json::from_value(json!({
            "kind": "bigquery#queryResponse",
            "jobReference": {"projectId": "p", "jobId": "job_abc", "location": "US"},
            "jobComplete": false
        }))
        .unwrap();
        assert!(!response.job_complete);
        assert!(response.rows.is_empty());
        let job = response.job_reference.unwrap();
        assert_eq!(job.job_id, "job_abc");
        assert_eq!(job.location.as_deref(), Some("US"));
    }

    #[test]
    fn error_details_reads_google_error_payload() {
        let body = json!({
            "error": {
                "code": 400,
                "message": "Unrecognized name: snapshot_dat at [3:9]",
                "errors": [{"reason": "invalidQuery", "message": "..."}]
            }
        });
        let (message, reason) = error_details(&body);
        assert_eq!(message, "Unrecognized name: snapshot_dat at [3:9]");
        assert_eq!(reason.as_deref(), Some("invalidQuery"));
    }

    #[test]
    fn error_details_falls_back_to_raw_body() {
        let body = json!({"unexpected": true});
        let (message, reason) = error_details(&body);
        assert_eq!(message, r#"{"unexpected":true}"#);
        assert!(reason.is_none());
    }
}
