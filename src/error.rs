use thiserror::Error;

/// Conditions that abort a whole validation run before a [`crate::pipeline::BatchResult`]
/// exists. Row-level problems never surface here; they become
/// [`crate::diagnostics::Diagnostic`] values instead.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Schema for table '{table}' is unavailable: {reason}")]
    SchemaUnavailable { table: String, reason: String },

    #[error(
        "Upload failed: your file is missing one or more required column headers. Missing column(s): {}. Please update your file and try again.",
        missing.join(", ")
    )]
    MissingRequiredColumns { missing: Vec<String> },

    #[error("Data source query failed while loading {what}: {reason}")]
    Connectivity { what: String, reason: String },

    #[error("Failed to persist artifact '{name}': {reason}")]
    ArtifactPersistence { name: String, reason: String },

    #[error("Unknown entity '{label}'. Registered entities: {}", known.join(", "))]
    UnknownEntity { label: String, known: Vec<String> },
}

impl BatchError {
    pub(crate) fn schema_unavailable(table: &str, reason: impl Into<String>) -> Self {
        BatchError::SchemaUnavailable {
            table: table.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn connectivity(what: &str, err: &anyhow::Error) -> Self {
        BatchError::Connectivity {
            what: what.to_string(),
            reason: format!("{err:#}"),
        }
    }
}
