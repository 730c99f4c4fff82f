use async_trait::async_trait;

use crate::error::BackendError;
use crate::query::{Query, Row};

/// The analytics database as seen by the request dispatcher.
///
/// Each method performs exactly one round trip and waits for it to finish.
/// Timeouts and retries, if any, are the implementation's business; callers
/// never retry.
///
/// ## Read semantics
///
/// Implementations are expected to give point-in-time reads per query, so a
/// statement that derives the latest snapshot date and then selects rows for
/// it sees a single consistent table version.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync + 'static` to be shared through axum
/// application state and across async task boundaries.
#[async_trait]
pub trait AnalyticsBackend: Send + Sync + 'static {
    /// Run a parameterless SQL statement and return every result row.
    async fn run_query(&self, query: &Query) -> Result<Vec<Row>, BackendError>;

    /// Invoke a zero-argument stored procedure by fully-qualified name and
    /// block until it completes.
    async fn call_procedure(&self, procedure: &str) -> Result<(), BackendError>;

    /// Short identifier for logs (e.g. "bigquery", "fixture").
    fn backend_id(&self) -> &str;
}
