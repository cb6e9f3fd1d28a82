//! Error types and path context for per-case pipeline operations

use std::fmt::Display;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Main error type for all fusion operations
#[derive(Debug, Error)]
pub enum FusionError {
    /// The case has no reference volume to borrow geometry from
    ///
    /// Cases failing this way are skipped rather than counted as failures.
    #[error("Missing reference geometry for case '{case}' at '{}'", path.display())]
    MissingReferenceGeometry {
        /// Case identifier
        case: String,
        /// Expected location of the reference volume
        path: PathBuf,
    },

    /// A probability archive or volume could not be read
    #[error("Failed to load '{}': {reason}", path.display())]
    LoadFailure {
        /// File being read
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// No supported axis permutation reconciles two shapes
    #[error("Shape mismatch: array {found:?} does not match reference {expected:?}")]
    ShapeMismatch {
        /// Shape of the array being reconciled
        found: Vec<usize>,
        /// Shape it was expected to have
        expected: Vec<usize>,
    },

    /// An output volume could not be persisted
    #[error("Failed to write '{}': {reason}", path.display())]
    WriteFailure {
        /// Destination path
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// Run parameter validation failed
    #[error("Invalid parameter '{parameter}' = '{value}': {reason}")]
    InvalidParameter {
        /// Name of the invalid parameter
        parameter: &'static str,
        /// Provided value that failed validation
        value: String,
        /// Explanation of why the value is invalid
        reason: String,
    },

    /// Directory scan or other file system operation failure
    #[error("File system error during {operation} on '{}': {source}", path.display())]
    FileSystem {
        /// Path involved in the operation
        path: PathBuf,
        /// Description of the operation that failed
        operation: &'static str,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The bounded worker pool could not be built
    #[error("Failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    /// A case panicked and was contained at its task boundary
    #[error("Worker panicked: {message}")]
    WorkerPanic {
        /// Panic payload, when it was a string
        message: String,
    },
}

impl FusionError {
    /// Whether this error means the case was skipped rather than failed
    pub const fn is_skip(&self) -> bool {
        matches!(self, Self::MissingReferenceGeometry { .. })
    }
}

/// Convenience type alias for fusion results
pub type Result<T> = std::result::Result<T, FusionError>;

/// Attaches the offending path to foreign errors
pub trait WithPath<T> {
    /// Convert an error raised while reading `path` into a load failure
    ///
    /// # Errors
    ///
    /// Propagates the original error as [`FusionError::LoadFailure`]
    fn load_context(self, path: &Path) -> Result<T>;

    /// Convert an error raised while writing `path` into a write failure
    ///
    /// # Errors
    ///
    /// Propagates the original error as [`FusionError::WriteFailure`]
    fn write_context(self, path: &Path) -> Result<T>;
}

impl<T, E> WithPath<T> for std::result::Result<T, E>
where
    E: Display,
{
    fn load_context(self, path: &Path) -> Result<T> {
        self.map_err(|e| FusionError::LoadFailure {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    fn write_context(self, path: &Path) -> Result<T> {
        self.map_err(|e| FusionError::WriteFailure {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

/// Create an invalid parameter error
pub fn invalid_parameter(
    parameter: &'static str,
    value: &impl ToString,
    reason: &impl ToString,
) -> FusionError {
    FusionError::InvalidParameter {
        parameter,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Create a load failure for `path`
pub fn load_failure(path: &Path, reason: &impl ToString) -> FusionError {
    FusionError::LoadFailure {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}
