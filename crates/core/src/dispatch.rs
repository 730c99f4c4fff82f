//! Mode dispatch: one request, one backend round trip, one envelope.

use std::sync::Arc;

use ownership_backend::{AnalyticsBackend, Row};
use tracing::Instrument;
use uuid::Uuid;

use crate::config::DatasetConfig;
use crate::envelope::Envelope;
use crate::error::DispatchError;
use crate::metrics::normalize_metrics_row;
use crate::mode::Mode;
use crate::queries;

/// Runs modes against an analytics backend.
///
/// Holds only immutable configuration and a shared backend handle, so one
/// dispatcher serves any number of concurrent requests.
#[derive(Clone)]
pub struct Dispatcher {
    backend: Arc<dyn AnalyticsBackend>,
    config: DatasetConfig,
}

impl Dispatcher {
    pub fn new(backend: Arc<dyn AnalyticsBackend>, config: DatasetConfig) -> Self {
        Dispatcher { backend, config }
    }

    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    pub fn backend_id(&self) -> &str {
        self.backend.backend_id()
    }

    /// Resolve the requested mode, run it, and produce an envelope.
    ///
    /// This is the top-level error boundary: every [`DispatchError`] becomes
    /// an error envelope. Each call runs in its own `dispatch` span with a
    /// fresh request id.
    pub async fn handle(&self, requested: Option<&str>) -> Envelope {
        let mode = Mode::resolve(requested);
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "dispatch",
            %request_id,
            mode = mode.as_str(),
            backend = self.backend.backend_id(),
        );

        async move {
            match self.dispatch(mode).await {
                Ok(envelope) => {
                    tracing::info!(status = envelope.status_code(), "request complete");
                    envelope
                }
                Err(err) => {
                    tracing::error!(
                        error = %err.message(),
                        error_type = err.error_type(),
                        "request failed"
                    );
                    Envelope::failed(&err)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Run a resolved mode.
    ///
    /// `generate_actions` is not rolled back if anything after the procedure
    /// call fails; the procedure's effects are already committed.
    pub async fn dispatch(&self, mode: Mode) -> Result<Envelope, DispatchError> {
        match mode {
            Mode::GenerateActions => {
                let procedure = self.config.procedure_name();
                tracing::debug!(%procedure, "calling procedure");
                self.backend
                    .call_procedure(&procedure)
                    .await
                    .map_err(|source| DispatchError::Procedure { procedure, source })?;
                Ok(Envelope::actions_generated())
            }
            Mode::ActionsSummary => {
                let rows = self.run_query(mode).await?;
                Ok(Envelope::summary(rows))
            }
            Mode::Metrics => {
                let rows = self.run_query(mode).await?;
                match rows.into_iter().next() {
                    Some(row) => Ok(Envelope::metrics(normalize_metrics_row(row))),
                    None => Ok(Envelope::no_data()),
                }
            }
            Mode::Latest | Mode::Trend => {
                let rows = self.run_query(mode).await?;
                Ok(Envelope::rows(mode, rows))
            }
        }
    }

    async fn run_query(&self, mode: Mode) -> Result<Vec<Row>, DispatchError> {
        let Some(query) = queries::for_mode(mode, &self.config) else {
            // Only generate_actions lacks a statement, and it never gets here.
            return Ok(Vec::new());
        };

        let rows = self
            .backend
            .run_query(&query)
            .await
            .map_err(|source| DispatchError::Query { mode, source })?;
        tracing::debug!(rows = rows.len(), "query returned");
        Ok(rows)
    }
}
