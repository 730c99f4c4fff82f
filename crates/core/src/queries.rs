//! SQL templates, one per read mode.
//!
//! Every statement is parameterless: the only interpolated values are the
//! configured table references, never caller input. Snapshot dates are
//! derived inside the statements, so a single statement always reads one
//! consistent pair of partitions.

use ownership_backend::Query;

use crate::config::DatasetConfig;
use crate::mode::Mode;

/// Row cap for `latest`.
pub const LATEST_LIMIT: usize = 50;
/// Row cap for `trend`.
pub const TREND_LIMIT: usize = 100;

/// Build the statement for a read mode. `generate_actions` has no statement.
pub fn for_mode(mode: Mode, config: &DatasetConfig) -> Option<Query> {
    let sql = match mode {
        Mode::Latest => latest_sql(config),
        Mode::Trend => trend_sql(config),
        Mode::ActionsSummary => actions_summary_sql(config),
        Mode::Metrics => metrics_sql(config),
        Mode::GenerateActions => return None,
    };
    Some(Query::new(mode.as_str(), sql))
}

/// Most recent snapshot, ordered by impressions.
pub fn latest_sql(config: &DatasetConfig) -> String {
    let table = config.ownership_table_ref();
    format!(
        "WITH latest AS (SELECT MAX(snapshot_date) AS d FROM {table})
SELECT
  query,
  ownership_recommendation,
  total_impressions,
  shop_position,
  wp_position
FROM {table}, latest
WHERE snapshot_date = latest.d
ORDER BY total_impressions DESC
LIMIT {LATEST_LIMIT}"
    )
}

/// Latest snapshot left-joined to the previous one on `query`.
///
/// `impression_change` uses `SAFE_CAST`, so it is NULL (not an error) when
/// either side is missing or not an integer. NULL changes sort last.
pub fn trend_sql(config: &DatasetConfig) -> String {
    let table = config.ownership_table_ref();
    format!(
        "WITH latest AS (
  SELECT *
  FROM {table}
  WHERE snapshot_date = (SELECT MAX(snapshot_date) FROM {table})
),
previous AS (
  SELECT *
  FROM {table}
  WHERE snapshot_date = (
    SELECT MAX(snapshot_date)
    FROM {table}
    WHERE snapshot_date < (SELECT MAX(snapshot_date) FROM {table})
  )
)
SELECT
  l.query,
  l.ownership_recommendation AS latest_recommendation,
  p.ownership_recommendation AS previous_recommendation,
  l.total_impressions AS latest_impressions,
  p.total_impressions AS previous_impressions,
  SAFE_CAST(l.total_impressions AS INT64)
    - SAFE_CAST(p.total_impressions AS INT64) AS impression_change
FROM latest l
LEFT JOIN previous p USING (query)
ORDER BY ABS(SAFE_CAST(l.total_impressions AS INT64)
    - SAFE_CAST(p.total_impressions AS INT64)) DESC
LIMIT {TREND_LIMIT}"
    )
}

/// Action counts and creation-date range per (status, priority).
pub fn actions_summary_sql(config: &DatasetConfig) -> String {
    let table = config.actions_table_ref();
    format!(
        "SELECT
  COALESCE(status, 'unknown') AS status,
  COALESCE(priority, 'normal') AS priority,
  COUNT(*) AS actions,
  MIN(created_at) AS first_created,
  MAX(created_at) AS last_created
FROM {table}
GROUP BY 1, 2
ORDER BY actions DESC, status, priority"
    )
}

/// One row of action totals, or no row at all when the table is empty.
///
/// `open` counts every status other than `completed`, NULL included, so
/// `total_actions = completed + open`. The per-priority breakdown comes back
/// as a JSON string and is decoded by [`crate::metrics`].
pub fn metrics_sql(config: &DatasetConfig) -> String {
    let table = config.actions_table_ref();
    format!(
        "WITH totals AS (
  SELECT
    COUNT(*) AS total_actions,
    COUNTIF(LOWER(IFNULL(status, '')) = 'completed') AS completed,
    COUNTIF(LOWER(IFNULL(status, '')) != 'completed') AS open,
    MIN(created_at) AS earliest_action,
    MAX(created_at) AS latest_action
  FROM {table}
),
breakdown AS (
  SELECT TO_JSON_STRING(ARRAY_AGG(STRUCT(priority, actions) ORDER BY actions DESC, priority)) AS priority_breakdown
  FROM (
    SELECT COALESCE(priority, 'normal') AS priority, COUNT(*) AS actions
    FROM {table}
    GROUP BY 1
  )
)
SELECT
  totals.total_actions,
  totals.completed,
  totals.open,
  totals.earliest_action,
  totals.latest_action,
  breakdown.priority_breakdown
FROM totals CROSS JOIN breakdown
WHERE totals.total_actions > 0"
    )
}
