//! Request modes and their resolution from caller input.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Mode used when the caller names none, or one that is not recognized.
pub const DEFAULT_MODE: Mode = Mode::Latest;

/// The single request parameter selecting which canned query or action runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Most recent snapshot, top keywords by impressions.
    Latest,
    /// Latest snapshot against the one before it.
    Trend,
    /// Run the action-generation procedure.
    GenerateActions,
    /// Action counts grouped by status and priority.
    ActionsSummary,
    /// Single-row action totals with a per-priority breakdown.
    Metrics,
}

/// Error from strict parsing via [`FromStr`]. [`Mode::resolve`] never fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mode '{0}'")]
pub struct UnknownMode(pub String);

impl Mode {
    pub const ALL: [Mode; 5] = [
        Mode::Latest,
        Mode::Trend,
        Mode::GenerateActions,
        Mode::ActionsSummary,
        Mode::Metrics,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Latest => "latest",
            Mode::Trend => "trend",
            Mode::GenerateActions => "generate_actions",
            Mode::ActionsSummary => "actions_summary",
            Mode::Metrics => "metrics",
        }
    }

    /// Resolve a caller-supplied mode name.
    ///
    /// Matching ignores case and surrounding whitespace. A missing name, or
    /// one that matches nothing, resolves to [`DEFAULT_MODE`].
    pub fn resolve(raw: Option<&str>) -> Mode {
        match raw {
            None => DEFAULT_MODE,
            Some(name) => name.parse().unwrap_or_else(|UnknownMode(name)| {
                tracing::debug!(requested = %name, "unrecognized mode, using {}", DEFAULT_MODE);
                DEFAULT_MODE
            }),
        }
    }
}

impl FromStr for Mode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Mode::ALL
            .into_iter()
            .find(|m| m.as_str() == normalized)
            .ok_or(UnknownMode(normalized))
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
