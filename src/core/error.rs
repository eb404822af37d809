use thiserror::Error;

/// Core error types for fwext
///
/// These cover hard failures on the decompiler's input: rows handed over by
/// the installer database that are structurally unusable. Authoring mistakes
/// never surface here; they go through the diagnostic sink so a single run
/// can report everything it finds.
#[derive(Debug, Error)]
pub enum Error {
    /// A stored row is missing required leading columns
    #[error(
        "row has {found} columns but the firewall exception table requires at least {expected}"
    )]
    RowTooShort { expected: usize, found: usize },

    /// A required column is empty
    #[error("row '{key}' has no value in required column {column} ({name})")]
    MissingColumn {
        key: String,
        column: usize,
        name: &'static str,
    },

    /// A column holds a value of the wrong type
    #[error("row '{key}' column {column} ({name}) does not hold {expected}")]
    ColumnType {
        key: String,
        column: usize,
        name: &'static str,
        expected: &'static str,
    },

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
