//! Error types for the tsprofile library.
//!
//! All fallible operations in this crate return [`Result`], whose error type is
//! [`ProfileError`]. Structural problems with an input file are reported per file
//! by the profiler and never abort a whole run.

use thiserror::Error;

/// The main error type for the tsprofile library.
#[derive(Error, Debug)]
pub enum ProfileError {
    /// A file cannot be profiled at all: it lacks the timestamp axis, has no
    /// signal columns, or its columns disagree on length.
    #[error("Structural input error in '{file}': {message}")]
    StructuralInput {
        /// Identifier (prefix) of the offending file
        file: String,
        /// Detailed error message
        message: String,
    },

    /// Arguments handed to a core operation are inconsistent.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Error from DataFusion operations.
    #[error("DataFusion error: {0}")]
    DataFusion(#[from] datafusion::error::DataFusionError),

    /// Error from Arrow operations.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error from data source operations.
    #[error("Data source error: {message}")]
    DataSource {
        /// Type of data source (e.g., "Parquet")
        source_type: String,
        /// Detailed error message
        message: String,
        /// Optional underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Error from I/O operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error related to configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A type alias for `Result<T, ProfileError>`.
pub type Result<T> = std::result::Result<T, ProfileError>;

impl ProfileError {
    /// Creates a structural input error for the given file.
    pub fn structural(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StructuralInput {
            file: file.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Creates a new data source error.
    pub fn data_source(source_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DataSource {
            source_type: source_type.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new data source error with a source error.
    pub fn data_source_with_source(
        source_type: impl Into<String>,
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::DataSource {
            source_type: source_type.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    /// Returns true if this error only concerns the structure of one input file.
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::StructuralInput { .. })
    }
}

impl From<serde_json::Error> for ProfileError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<std::fmt::Error> for ProfileError {
    fn from(err: std::fmt::Error) -> Self {
        Self::Internal(format!("Failed to format output: {err}"))
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, msg: &str) -> Result<T>;

    /// Adds context with a lazy message.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<ProfileError>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| wrap(msg, e.into()))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| wrap(&f(), e.into()))
    }
}

fn wrap(msg: &str, base: ProfileError) -> ProfileError {
    match base {
        // keep structural errors intact so per-file failure reporting still sees them
        ProfileError::StructuralInput { file, message } => ProfileError::StructuralInput {
            file,
            message: format!("{msg}: {message}"),
        },
        ProfileError::Internal(inner) => ProfileError::Internal(format!("{msg}: {inner}")),
        other => ProfileError::Internal(format!("{msg}: {other}")),
    }
}
