/// All errors that can be returned by an `AnalyticsBackend` implementation.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The backend cannot issue requests (missing credentials, unknown project).
    #[error("backend not configured: {message}")]
    NotConfigured { message: String },

    /// The HTTP request never produced a usable response.
    #[cfg(feature = "bigquery")]
    #[error("request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: ureq::Error,
    },

    /// The backend answered with a non-success HTTP status.
    #[error("backend returned HTTP {status}: {message}")]
    Status {
        status: u16,
        message: String,
        /// Machine-readable reason from the error payload, e.g. `invalidQuery`.
        reason: Option<String>,
    },

    /// The job did not complete within the configured number of polls.
    #[error("job {job_id} did not complete after {polls} polls")]
    JobTimeout { job_id: String, polls: u32 },

    /// A response payload could not be decoded into rows.
    #[error("failed to decode {what}: {message}")]
    Decode { what: String, message: String },

    /// The blocking worker running the request panicked or was cancelled.
    #[error("backend worker task failed")]
    Task {
        #[source]
        source: tokio::task::JoinError,
    },

    /// The fixture backend has no rows registered for this label.
    #[error("no fixture registered for '{label}'")]
    FixtureMissing { label: String },

    /// The fixture declares an error for this label.
    #[error("fixture error for '{label}': {message}")]
    Fixture { label: String, message: String },

    /// The fixture file could not be read.
    #[error("failed to read fixture file {path}")]
    FixtureRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The fixture file is not valid fixture JSON.
    #[error("invalid fixture file {path}")]
    FixtureParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl BackendError {
    /// Variant name, reported to callers as the error type.
    pub fn kind(&self) -> &'static str {
        match self {
            BackendError::NotConfigured { .. } => "NotConfigured",
            #[cfg(feature = "bigquery")]
            BackendError::Transport { .. } => "Transport",
            BackendError::Status { .. } => "Status",
            BackendError::JobTimeout { .. } => "JobTimeout",
            BackendError::Decode { .. } => "Decode",
            BackendError::Task { .. } => "Task",
            BackendError::FixtureMissing { .. } => "FixtureMissing",
            BackendError::Fixture { .. } => "Fixture",
            BackendError::FixtureRead { .. } => "FixtureRead",
            BackendError::FixtureParse { .. } => "FixtureParse",
        }
    }
}
