//! Analytics backend seam for the keyword ownership service.
//!
//! [`AnalyticsBackend`] is the only capability the dispatcher needs: run a
//! parameterless SQL statement and get rows back, or call a zero-argument
//! stored procedure and wait for it. Two implementations ship here:
//!
//! - [`BigQueryBackend`] talks to the BigQuery v2 REST API (feature `bigquery`)
//! - [`FixtureBackend`] serves canned rows keyed by query label

#[cfg(feature = "bigquery")]
mod bigquery;
mod error;
mod fixture;
mod query;
mod traits;

#[cfg(feature = "bigquery")]
pub use bigquery::{decode_rows, BigQueryBackend, BigQueryConfig, TableField, TableSchema};
pub use error::BackendError;
pub use fixture::FixtureBackend;
pub use query::{Query, Row};
pub use traits::AnalyticsBackend;
