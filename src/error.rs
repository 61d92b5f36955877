use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessingError>;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Date parsing error: {0}")]
    DateParse(#[from] chrono::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Parse error in {source_name}{}: {message}", row_suffix(.row))]
    Parse {
        source_name: String,
        row: Option<usize>,
        message: String,
    },

    #[error("Schema mismatch in {source_name}: expected column '{column}' is absent")]
    SchemaMismatch { source_name: String, column: String },

    #[error("Invalid series: {0}")]
    InvalidSeries(String),

    #[error("Data merge error: {0}")]
    DataMerge(String),
}

fn row_suffix(row: &Option<usize>) -> String {
    row.map(|r| format!(" (row {})", r)).unwrap_or_default()
}

impl ProcessingError {
    pub fn parse(source_name: impl Into<String>, row: Option<usize>, message: impl Into<String>) -> Self {
        ProcessingError::Parse {
            source_name: source_name.into(),
            row,
            message: message.into(),
        }
    }

    pub fn schema_mismatch(source_name: impl Into<String>, column: impl Into<String>) -> Self {
        ProcessingError::SchemaMismatch {
            source_name: source_name.into(),
            column: column.into(),
        }
    }

    /// Configuration problems fail fast; everything else depends on the input.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ProcessingError::Config(_)
                | ProcessingError::Settings(_)
                | ProcessingError::Validation(_)
        )
    }
}

/// A recoverable problem found while reading an input. The offending
/// row or file is skipped and the issue travels with the report.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ParseIssue {
    pub source_name: String,
    pub row: Option<usize>,
    pub message: String,
}

impl ParseIssue {
    pub fn new(source_name: impl Into<String>, row: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            row,
            message: message.into(),
        }
    }
}

impl From<ProcessingError> for ParseIssue {
    fn from(err: ProcessingError) -> Self {
        match err {
            ProcessingError::Parse {
                source_name,
                row,
                message,
            } => ParseIssue::new(source_name, row, message),
            ProcessingError::SchemaMismatch {
                source_name,
                column,
            } => ParseIssue::new(source_name, None, format!("missing column '{}'", column)),
            other => ParseIssue::new("<unknown>", None, other.to_string()),
        }
    }
}

impl std::fmt::Display for ParseIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.row {
            Some(row) => write!(f, "{} (row {}): {}", self.source_name, row, self.message),
            None => write!(f, "{}: {}", self.source_name, self.message),
        }
    }
}
