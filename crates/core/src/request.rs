//! Request parameter extraction for POST bodies and GET query strings.

use serde_json::Value;

/// Request parameters: a JSON object body or the query-string pairs.
pub type Params = serde_json::Map<String, Value>;

/// Reasons a POST body is rejected before dispatch (HTTP 400).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    /// No body, whitespace only, `null`, or `{}`.
    #[error("Empty JSON payload")]
    Empty,
    /// Not JSON, or JSON that is not an object.
    #[error("Invalid JSON payload: {0}")]
    Invalid(String),
}

/// Parse a POST body into request parameters.
pub fn parse_json_body(body: &[u8]) -> Result<Params, RequestError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(RequestError::Empty);
    }

    let value: Value =
        serde_json::from_slice(body).map_err(|e| RequestError::Invalid(e.to_string()))?;

    match value {
        Value::Null => Err(RequestError::Empty),
        Value::Object(params) if params.is_empty() => Err(RequestError::Empty),
        Value::Object(params) => Ok(params),
        Value::Array(_) => Err(RequestError::Invalid("expected an object, got an array".to_string())),
        _ => Err(RequestError::Invalid("expected an object".to_string())),
    }
}

/// Collect query-string pairs into request parameters. A repeated key keeps
/// its last value.
pub fn params_from_query<I>(pairs: I) -> Params
where
    I: IntoIterator<Item = (String, String)>,
{
    pairs
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect()
}

/// Parameters for a POST: the JSON body when it carries an object, else the
/// query-string parameters. Only when both are empty is the request
/// rejected as [`RequestError::Empty`]. A malformed body is rejected even if
/// the query string is usable.
pub fn post_params(body: &[u8], query: Params) -> Result<Params, RequestError> {
    match parse_json_body(body) {
        Err(RequestError::Empty) if !query.is_empty() => Ok(query),
        other => other,
    }
}

/// The caller's `mode` parameter, as text.
///
/// Non-string values are rendered as JSON text (`5`, `true`, `null`), which
/// then resolves like any other unrecognized name.
pub fn requested_mode(params: &Params) -> Option<String> {
    params.get("mode").map(|value| match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Mode;

    #[test]
    fn empty_bodies_are_rejected() {
        assert_eq!(parse_json_body(b""), Err(RequestError::Empty));
        assert_eq!(parse_json_body(b"  \n"), Err(RequestError::Empty));
        assert_eq!(parse_json_body(b"null"), Err(RequestError::Empty));
        assert_eq!(parse_json_body(b"{}"), Err(RequestError::Empty));
    }

    #[test]
    fn malformed_bodies_are_invalid() {
        assert!(matches!(parse_json_body(b"mode=trend"), Err(RequestError::Invalid(_))));
        assert!(matches!(parse_json_body(b"[1]"), Err(RequestError::Invalid(_))));
        assert!(matches!(parse_json_body(b"\"trend\""), Err(RequestError::Invalid(_))));
    }

    #[test]
    fn object_body_is_accepted_and_extra_fields_ignored() {
        let params = parse_json_body(br#"{"mode": "Trend", "debug": true}"#).unwrap();
        let mode = requested_mode(&params);
        assert_eq!(mode.as_deref(), Some("Trend"));
        assert_eq!(Mode::resolve(mode.as_deref()), Mode::Trend);
    }

    #[test]
    fn body_without_mode_defaults_to_latest() {
        let params = parse_json_body(br#"{"other": 1}"#).unwrap();
        assert_eq!(requested_mode(&params), None);
        assert_eq!(Mode::resolve(None), Mode::Latest);
    }

    #[test]
    fn non_string_mode_falls_back() {
        let params = parse_json_body(br#"{"mode": 5}"#).unwrap();
        let mode = requested_mode(&params);
        assert_eq!(mode.as_deref(), Some("5"));
        assert_eq!(Mode::resolve(mode.as_deref()), Mode::Latest);
    }

    #[test]
    fn query_pairs_become_params() {
        let params = params_from_query(vec![
            ("mode".to_string(), "metrics".to_string()),
            ("mode".to_string(), "trend".to_string()),
        ]);
        assert_eq!(requested_mode(&params).as_deref(), Some("trend"));
    }

    #[test]
    fn post_with_empty_body_uses_query_string() {
        let query = params_from_query(vec![("mode".to_string(), "metrics".to_string())]);
        let params = post_params(b"", query).unwrap();
        assert_eq!(requested_mode(&params).as_deref(), Some("metrics"));
    }

    #[test]
    fn post_body_wins_over_query_string() {
        let query = params_from_query(vec![("mode".to_string(), "metrics".to_string())]);
        let params = post_params(br#"{"mode": "trend"}"#, query).unwrap();
        assert_eq!(requested_mode(&params).as_deref(), Some("trend"));
    }

    #[test]
    fn post_with_nothing_is_empty() {
        assert_eq!(post_params(b"{}", Params::new()), Err(RequestError::Empty));
    }

    #[test]
    fn post_with_malformed_body_ignores_query_string() {
        let query = params_from_query(vec![("mode".to_string(), "trend".to_string())]);
        assert!(matches!(post_params(b"{ mode", query), Err(RequestError::Invalid(_))));
    }

    #[test]
    fn error_messages_match_envelope_text() {
        assert_eq!(RequestError::Empty.to_string(), "Empty JSON payload");
        assert!(RequestError::Invalid("x".to_string())
            .to_string()
            .starts_with("Invalid JSON payload: "));
    }
}
