use thiserror::Error;

/// Fatal audit failures. Any of these aborts the whole run.
#[derive(Debug, Error)]
pub enum AuditError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),

    /// Config validation error (empty key, bad threshold, clashing columns, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),

    /// Zero input tables were supplied.
    #[error("no input tables to audit")]
    EmptyInput,

    /// An input's column set differs from the first input's column set.
    #[error("source '{source_id}': column set differs from '{expected_from}' (missing: {missing:?}, unexpected: {unexpected:?})")]
    Schema {
        source_id: String,
        expected_from: String,
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    /// An input already carries the column reserved for the origin tag.
    #[error("source '{source_id}': column '{column}' is reserved for the origin tag")]
    ReservedColumn { source_id: String, column: String },

    /// A configured required column is absent from the input schema.
    #[error("source '{source_id}': missing column '{column}'")]
    MissingColumn { source_id: String, column: String },

    /// A non-empty numeric cell could not be parsed.
    #[error("source '{source_id}', row {row}: cannot parse '{value}' in column '{column}' as a number")]
    InvalidNumber {
        source_id: String,
        row: usize,
        column: String,
        value: String,
    },
}

impl AuditError {
    /// Identifier of the input that caused the failure, when there is one.
    pub fn source_id(&self) -> Option<&str> {
        match self {
            Self::Schema { source_id, .. }
            | Self::ReservedColumn { source_id, .. }
            | Self::MissingColumn { source_id, .. }
            | Self::InvalidNumber { source_id, .. } => Some(source_id.as_str()),
            Self::ConfigParse(_) | Self::ConfigValidation(_) | Self::EmptyInput => None,
        }
    }
}
