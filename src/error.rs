use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessingError>;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Parquet write error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("No column metadata for {frequency} normals over {period}")]
    MetadataNotFound { frequency: String, period: String },

    #[error("Column '{column}' in {source_href} is not part of the {dataset} schema")]
    UnexpectedColumn {
        column: String,
        source_href: String,
        dataset: String,
    },

    #[error("Cannot resolve a single type for column '{column}' (observed: {})", .kinds.join(", "))]
    UnresolvableColumnType { column: String, kinds: Vec<String> },

    #[error("Value '{value}' is not an allowed category for column '{column}'")]
    UnexpectedCategory { column: String, value: String },

    #[error("None of the {rows} rows has station coordinates; no spatial extent can be derived")]
    NoStationCoordinates { rows: usize },

    #[error("Missing required data: {0}")]
    MissingData(String),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Async task error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

/// Conditions that are logged and reported but never abort a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingWarning {
    DocumentationMissing {
        dataset: String,
        column: String,
    },
    PartitionCountAdjusted {
        requested: usize,
        applied: usize,
        rows: usize,
        sources: usize,
    },
}

impl fmt::Display for ProcessingWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessingWarning::DocumentationMissing { dataset, column } => {
                write!(f, "{}: column '{}' is missing documentation", dataset, column)
            }
            ProcessingWarning::PartitionCountAdjusted {
                requested,
                applied,
                rows,
                sources,
            } => write!(
                f,
                "partition count {} adjusted to {} ({} rows from {} sources)",
                requested, applied, rows, sources
            ),
        }
    }
}
