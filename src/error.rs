// Error types and their broad categories

/// Broad classes of failure. Every error is a caller mistake, none are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Type,
    UnsupportedComposition,
}

#[derive(Debug, thiserror::Error)]
pub enum ExpressError {
    #[error("Argument table is not of type Table")]
    InvalidTable,

    #[error("Column '{0}' not found")]
    MissingColumn(String),

    #[error("Column '{0}' is not numeric")]
    NonNumericColumn(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Cannot place a figure with subplots inside another composition")]
    UnsupportedComposition,

    #[error("Malformed table: {0}")]
    Table(String),

    #[error("Failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to encode figure: {0}")]
    Json(#[from] serde_json::Error),
}

impl ExpressError {
    pub fn config(msg: impl Into<String>) -> Self {
        ExpressError::Configuration(msg.into())
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ExpressError::InvalidTable | ExpressError::NonNumericColumn(_) => ErrorCategory::Type,
            ExpressError::UnsupportedComposition => ErrorCategory::UnsupportedComposition,
            ExpressError::MissingColumn(_)
            | ExpressError::Configuration(_)
            | ExpressError::Table(_)
            | ExpressError::Csv(_)
            | ExpressError::Json(_) => ErrorCategory::Configuration,
        }
    }
}

pub type Result<T> = std::result::Result<T, ExpressError>;
