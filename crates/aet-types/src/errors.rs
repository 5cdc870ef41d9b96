use thiserror::Error;

/// Main error type for aetune
#[derive(Error, Debug)]
pub enum AetError {
    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Search-related errors
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Search space has no parameters")]
    EmptySearchSpace,

    #[error("Parameter {parameter} has no candidate values")]
    EmptyCandidates { parameter: String },

    #[error("Parameter {parameter} is defined more than once")]
    DuplicateParameter { parameter: String },

    #[error("Search grid is too large to enumerate")]
    GridTooLarge,

    #[error("Epoch count must be positive, got {epochs}")]
    InvalidEpochs { epochs: usize },

    #[error("Missing hyperparameter: {parameter}")]
    MissingParameter { parameter: String },

    #[error("Hyperparameter {parameter} has the wrong type: expected {expected}, got {actual}")]
    ParameterType {
        parameter: String,
        expected: String,
        actual: String,
    },

    #[error("Configuration {index}/{total} failed: {source}")]
    TrialFailed {
        index: usize,
        total: usize,
        #[source]
        source: Box<AetError>,
    },

    #[error("None of the {total} configurations completed successfully")]
    NoSuccessfulTrials { total: usize },

    #[error("None of the {total} configurations produced a finite score")]
    NoFiniteScore { total: usize },
}

/// Persistence-related errors
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Refusing to overwrite existing artifact: {path}")]
    AlreadyExists { path: String },

    #[error("Invalid record in {path}: {message}")]
    InvalidRecord { path: String, message: String },

    #[error("Unrecognized artifact file name: {name}")]
    InvalidFileName { name: String },
}

/// Result type alias for aetune operations
pub type AetResult<T> = Result<T, AetError>;

/// Macro for creating validation errors
#[macro_export]
macro_rules! validation_error {
    ($($arg:tt)*) => {
        $crate::AetError::Validation(format!($($arg)*))
    };
}

/// Macro for creating internal errors
#[macro_export]
macro_rules! internal_error {
    ($($arg:tt)*) => {
        $crate::AetError::Internal(format!($($arg)*))
    };
}

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::AetError::Config(format!($($arg)*))
    };
}
