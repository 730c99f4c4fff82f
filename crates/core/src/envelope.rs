//! JSON response envelopes.
//!
//! Modes do not share one envelope shape. `latest`, `trend` and
//! `generate_actions` report `status: "ok"`, while `actions_summary` and
//! `metrics` report `ok: true`. Existing callers read both shapes, so each
//! variant here reproduces its mode's shape exactly.

use ownership_backend::Row;
use serde::Serialize;

use crate::error::DispatchError;
use crate::mode::Mode;

/// Message returned after the action-generation procedure completes.
pub const ACTIONS_GENERATED: &str = "Actions generated";
/// Message returned by `metrics` when the actions table is empty.
pub const NO_DATA: &str = "No data found";

/// Body for a response whose serialization itself failed.
const SERIALIZE_FALLBACK: &[u8] =
    br#"{"status":"error","message":"failed to serialize response","error_type":"Serialize","trace":""}"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Error,
}

/// A complete response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Envelope {
    /// `latest` and `trend`.
    Rows {
        status: Status,
        mode: Mode,
        row_count: usize,
        rows: Vec<Row>,
    },
    /// `generate_actions`.
    Done { status: Status, message: String },
    /// `actions_summary`.
    Summary { ok: bool, summary: Vec<Row> },
    /// `metrics` with data.
    Metrics { ok: bool, metrics: Row },
    /// `metrics` on an empty table. Still HTTP 200.
    NoData { ok: bool, message: String },
    /// Request rejected before dispatch (HTTP 400).
    Rejected { ok: bool, error: String },
    /// Any failure after dispatch began (HTTP 500).
    Failed {
        status: Status,
        message: String,
        error_type: String,
        trace: String,
    },
}

/// A serialized envelope with its HTTP status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub status_code: u16,
    pub body: Vec<u8>,
}

impl Envelope {
    pub fn rows(mode: Mode, rows: Vec<Row>) -> Self {
        Envelope::Rows {
            status: Status::Ok,
            mode,
            row_count: rows.len(),
            rows,
        }
    }

    pub fn actions_generated() -> Self {
        Envelope::Done {
            status: Status::Ok,
            message: ACTIONS_GENERATED.to_string(),
        }
    }

    pub fn summary(summary: Vec<Row>) -> Self {
        Envelope::Summary { ok: true, summary }
    }

    pub fn metrics(metrics: Row) -> Self {
        Envelope::Metrics { ok: true, metrics }
    }

    pub fn no_data() -> Self {
        Envelope::NoData {
            ok: false,
            message: NO_DATA.to_string(),
        }
    }

    pub fn rejected(error: &str) -> Self {
        Envelope::Rejected {
            ok: false,
            error: error.to_string(),
        }
    }

    pub fn failed(err: &DispatchError) -> Self {
        Envelope::Failed {
            status: Status::Error,
            message: err.message(),
            error_type: err.error_type().to_string(),
            trace: err.trace(),
        }
    }

    /// HTTP status code for this envelope.
    pub fn status_code(&self) -> u16 {
        match self {
            Envelope::Rejected { .. } => 400,
            Envelope::Failed { .. } => 500,
            _ => 200,
        }
    }

    /// Whether this envelope reports a failure (400 or 500).
    pub fn is_error(&self) -> bool {
        self.status_code() >= 400
    }

    /// Serialize to JSON. A serialization failure is itself reported as a
    /// 500 error envelope.
    pub fn render(&self) -> Rendered {
        match serde_json::to_vec(self) {
            Ok(body) => Rendered {
                status_code: self.status_code(),
                body,
            },
            Err(source) => {
                let err = DispatchError::Serialize { source };
                tracing::error!(error = %err.message(), "response serialization failed");
                let body = serde_json::to_vec(&Envelope::failed(&err))
                    .unwrap_or_else(|_| SERIALIZE_FALLBACK.to_vec());
                Rendered {
                    status_code: 500,
                    body,
                }
            }
        }
    }
}
