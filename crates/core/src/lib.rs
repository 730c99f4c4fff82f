//! ownership-core: request dispatcher for the keyword ownership service.
//!
//! A request names a [`Mode`]; the [`Dispatcher`] turns it into one SQL
//! statement (or one stored-procedure call) against the analytics dataset,
//! runs it through an [`ownership_backend::AnalyticsBackend`], and wraps the
//! rows in an [`Envelope`] ready to be written as a JSON response.
//!
//! # Public API
//!
//! - [`Dispatcher::handle`] -- resolve a requested mode and always produce an envelope
//! - [`Dispatcher::dispatch`] -- run a resolved mode, surfacing [`DispatchError`]
//! - [`request`] -- body and query-string parsing shared by HTTP and CLI callers
//! - [`queries`] -- the SQL templates, one per read mode

/// Service version reported by health checks.
pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod config;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod metrics;
pub mod mode;
pub mod queries;
pub mod request;

pub use config::DatasetConfig;
pub use dispatch::Dispatcher;
pub use envelope::{Envelope, Rendered, Status};
pub use error::DispatchError;
pub use mode::Mode;
pub use request::{Params, RequestError};
