//! Error types for yass3d

use thiserror::Error;

use crate::point::Label;

/// Main error type for yass3d operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A point cloud file could not be loaded
    #[error("Failed to load {path}: {message}")]
    Load { path: String, message: String },

    /// Local geometry needs more points than the neighborhood holds
    #[error("Insufficient neighbors: found {found}, need at least {required}")]
    InsufficientNeighbors { found: usize, required: usize },

    #[error("Cloud {cloud} has no ground-truth label for point {point}")]
    MissingLabel { cloud: usize, point: usize },

    #[error("Cloud mixes labeled and unlabeled points (first mismatch at point {point})")]
    MixedLabels { point: usize },

    #[error("Empty dataset: {0}")]
    EmptyDataset(String),

    #[error("Invalid hyperparameter: {0}")]
    InvalidHyperparameter(String),

    #[error("Dimension mismatch in {context}: expected {expected}, found {found}")]
    DimensionMismatch {
        context: String,
        expected: usize,
        found: usize,
    },

    #[error("Label {0} is not covered by the color scheme")]
    UnknownLabel(Label),

    #[error("Feature extractors cannot be registered after the manager has computed features")]
    RegistrationFrozen,

    #[error("Model is incompatible with the feature layout: {0}")]
    IncompatibleModel(String),

    #[error("Solver error: {0}")]
    Solver(String),

    #[error("Training was cancelled")]
    Cancelled,

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

impl Error {
    /// Shorthand for a [`Error::DimensionMismatch`]
    pub fn dimension_mismatch(context: impl Into<String>, expected: usize, found: usize) -> Self {
        Error::DimensionMismatch {
            context: context.into(),
            expected,
            found,
        }
    }
}

/// Result type alias for yass3d operations
pub type Result<T> = std::result::Result<T, Error>;
