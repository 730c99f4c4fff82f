//! Dataset coordinates compiled into the service.
//!
//! The entrypoint may swap the project or dataset (e.g. to point a staging
//! deployment at a copy of the export); table and procedure names are fixed.

/// Google Cloud project holding the Search Console export.
pub const PROJECT: &str = "shield-your-body";
/// Dataset the Search Console export lands in.
pub const DATASET: &str = "gsc_export";
/// Per-snapshot keyword ownership table, partitioned by `snapshot_date`.
pub const OWNERSHIP_TABLE: &str = "keyword_ownership_summary";
/// Actions derived from ownership recommendations.
pub const ACTIONS_TABLE: &str = "keyword_actions";
/// Stored procedure that (re)generates rows in [`ACTIONS_TABLE`].
pub const GENERATE_ACTIONS_PROCEDURE: &str = "generate_keyword_actions";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetConfig {
    pub project: String,
    pub dataset: String,
    pub ownership_table: String,
    pub actions_table: String,
    pub procedure: String,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        DatasetConfig {
            project: PROJECT.to_string(),
            dataset: DATASET.to_string(),
            ownership_table: OWNERSHIP_TABLE.to_string(),
            actions_table: ACTIONS_TABLE.to_string(),
            procedure: GENERATE_ACTIONS_PROCEDURE.to_string(),
        }
    }
}

impl DatasetConfig {
    pub fn with_project(mut self, project: &str) -> Self {
        self.project = project.to_string();
        self
    }

    pub fn with_dataset(mut self, dataset: &str) -> Self {
        self.dataset = dataset.to_string();
        self
    }

    /// Backtick-quoted reference to the ownership table, for use in SQL.
    pub fn ownership_table_ref(&self) -> String {
        self.table_ref(&self.ownership_table)
    }

    /// Backtick-quoted reference to the actions table, for use in SQL.
    pub fn actions_table_ref(&self) -> String {
        self.table_ref(&self.actions_table)
    }

    /// Unquoted `project.dataset.procedure` name.
    pub fn procedure_name(&self) -> String {
        format!("{}.{}.{}", self.project, self.dataset, self.procedure)
    }

    fn table_ref(&self, table: &str) -> String {
        format!("`{}.{}.{}`", self.project, self.dataset, table)
    }
}
