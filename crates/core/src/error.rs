//! Failures raised while dispatching an accepted request.

use std::error::Error as StdError;
use std::fmt::Write as _;

use ownership_backend::BackendError;

use crate::mode::Mode;

/// Everything that can fail after a request has been accepted.
///
/// All variants end up in the same place: the top-level boundary in
/// [`crate::Dispatcher::handle`] turns them into an HTTP 500 error envelope.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// A read query failed in the backend.
    #[error("{mode} query failed")]
    Query {
        mode: Mode,
        #[source]
        source: BackendError,
    },

    /// The action-generation procedure failed.
    #[error("procedure {procedure} failed")]
    Procedure {
        procedure: String,
        #[source]
        source: BackendError,
    },

    /// The response envelope could not be serialized.
    #[error("failed to serialize response")]
    Serialize {
        #[source]
        source: serde_json::Error,
    },
}

impl DispatchError {
    /// Name of the underlying failure, e.g. `Status` for an HTTP error from
    /// the warehouse or `Serialize` for an encoding failure.
    pub fn error_type(&self) -> &'static str {
        match self {
            DispatchError::Query { source, .. } | DispatchError::Procedure { source, .. } => {
                source.kind()
            }
            DispatchError::Serialize { .. } => "Serialize",
        }
    }

    /// One-line message: this error followed by each cause, `: `-separated.
    pub fn message(&self) -> String {
        let mut message = self.to_string();
        for cause in self.causes() {
            let _ = write!(message, ": {}", cause);
        }
        message
    }

    /// Full failure detail: the debug representation, then every cause in
    /// the `source()` chain on its own numbered line.
    pub fn trace(&self) -> String {
        let mut trace = format!("{:?}", self);
        let causes: Vec<&(dyn StdError + 'static)> = self.causes().collect();
        if !causes.is_empty() {
            trace.push_str("\n\nCaused by:");
            for (i, cause) in causes.iter().enumerate() {
                let _ = write!(trace, "\n    {}: {}", i, cause);
            }
        }
        trace
    }

    fn causes(&self) -> impl Iterator<Item = &(dyn StdError + 'static)> {
        std::iter::successors(self.source(), |&e| e.source())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query_error() -> DispatchError {
        DispatchError::Query {
            mode: Mode::Trend,
            source: BackendError::Status {
                status: 403,
                message: "Access Denied: Table keyword_ownership_summary".to_string(),
                reason: Some("accessDenied".to_string()),
            },
        }
    }

    #[test]
    fn error_type_names_backend_failure() {
        assert_eq!(query_error().error_type(), "Status");
        let procedure = DispatchError::Procedure {
            procedure: "p.d.proc".to_string(),
            source: BackendError::NotConfigured {
                message: "no token".to_string(),
            },
        };
        assert_eq!(procedure.error_type(), "NotConfigured");
    }

    #[test]
    fn message_chains_causes() {
        assert_eq!(
            query_error().message(),
            "trend query failed: backend returned HTTP 403: Access Denied: Table keyword_ownership_summary"
        );
    }

    #[test]
    fn trace_includes_debug_detail_and_causes() {
        let trace = query_error().trace();
        assert!(trace.starts_with("Query {"));
        assert!(trace.contains("accessDenied"));
        assert!(trace.contains("Caused by:\n    0: backend returned HTTP 403"));
    }

    #[test]
    fn serialize_error_type() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = DispatchError::Serialize { source };
        assert_eq!(err.error_type(), "Serialize");
        assert!(err.message().starts_with("failed to serialize response: "));
    }
}
