//! Application state.

use ownership_core::Dispatcher;

/// Application state shared across request handlers.
pub(crate) struct AppState {
    /// Mode dispatcher over the configured backend.
    pub(crate) dispatcher: Dispatcher,
    /// Optional API key for authentication. None = no auth required.
    pub(crate) api_key: Option<String>,
}
