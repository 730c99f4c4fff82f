//! Backend selection from command-line flags.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use ownership_backend::{
    AnalyticsBackend, BackendError, BigQueryBackend, BigQueryConfig, FixtureBackend,
};
use ownership_core::config;
use ownership_core::{DatasetConfig, Dispatcher};

/// Flags shared by every subcommand that talks to the warehouse.
#[derive(Debug, Clone, Args)]
pub(crate) struct BackendArgs {
    /// Google Cloud project holding the dataset
    #[arg(long, default_value = config::PROJECT)]
    pub(crate) project: String,

    /// Dataset holding the ownership and actions tables
    #[arg(long, default_value = config::DATASET)]
    pub(crate) dataset: String,

    /// BigQuery job location (e.g. US, europe-west2)
    #[arg(long)]
    pub(crate) location: Option<String>,

    /// Answer from a JSON fixture file instead of BigQuery
    #[arg(long)]
    pub(crate) fixture: Option<PathBuf>,
}

impl BackendArgs {
    /// Build a dispatcher over the selected backend.
    ///
    /// Without `--fixture` the BigQuery backend is used. A missing access
    /// token is not fatal here: requests fail with a `NotConfigured` error
    /// envelope instead.
    pub(crate) fn dispatcher(&self) -> Result<Dispatcher, BackendError> {
        let dataset = DatasetConfig::default()
            .with_project(&self.project)
            .with_dataset(&self.dataset);

        let backend: Arc<dyn AnalyticsBackend> = match &self.fixture {
            Some(path) => {
                tracing::info!(path = %path.display(), "using fixture backend");
                Arc::new(FixtureBackend::from_path(path)?)
            }
            None => {
                let mut bigquery = BigQueryConfig::from_env(&self.project);
                bigquery.location = self.location.clone();
                if bigquery.access_token.is_none() {
                    tracing::warn!("OWNERSHIP_ACCESS_TOKEN is not set; queries will fail");
                }
                Arc::new(BigQueryBackend::new(bigquery))
            }
        };

        Ok(Dispatcher::new(backend, dataset))
    }
}
