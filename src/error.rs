//! Error types for the diagnostics engine

use thiserror::Error;

/// Errors that can occur while running meta-analysis diagnostics
#[derive(Debug, Error)]
pub enum DiagnosticError {
    /// The estimator or diagnostic is not set up for this operation
    /// (e.g. a pairwise estimator without a retained dataset)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Requested target map is absent from the result
    #[error(
        "Target image ('{requested}') not present in result. Available maps in result are: {}.",
        quote_names(.available)
    )]
    MissingMap {
        /// Name that was asked for
        requested: String,
        /// Names the result actually holds, in result order
        available: Vec<String>,
    },

    /// Invalid input parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Grid shapes, vector lengths or affines disagree
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A meta-analysis estimator failed to fit
    #[error("Estimator error: {0}")]
    Estimator(String),

    /// Processing error (worker pool, aggregation)
    #[error("Processing error: {0}")]
    Processing(String),

    /// Filesystem error while persisting tables
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Tabular serialization error
    #[error("Table error: {0}")]
    Table(#[from] csv::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, DiagnosticError>;

fn quote_names(names: &[String]) -> String {
    names
        .iter()
        .map(|n| format!("'{}'", n))
        .collect::<Vec<_>>()
        .join(", ")
}
