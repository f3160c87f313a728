//! Centralized error handling for flatcorpus.
//!
//! Every fallible library call returns [`Result`], whose error side is the
//! [`PrepError`] enum. The variants mirror how the pipeline treats a failure:
//!
//! - [`PrepError::Config`] and [`PrepError::InvalidPath`] are raised before
//!   traversal starts and abort the run.
//! - [`PrepError::Decode`] and [`PrepError::Format`] are per-item: the driver
//!   drops the item and keeps going.
//! - [`PrepError::Io`] raised while flushing the ledger aborts the flush.
//!
//! ## Context Extension Trait
//!
//! [`ResultExt`] adds `.context()` to any `Result` whose error converts into
//! [`PrepError`]:
//!
//! ```no_run
//! use flatcorpus::error::ResultExt as _;
//! use std::fs;
//!
//! fn load_document() -> flatcorpus::error::Result<String> {
//!     let text = fs::read_to_string("notes/a.txt").context("Failed to read document")?;
//!     Ok(text)
//! }
//! ```

use std::fmt;

/// Main error type for flatcorpus operations.
#[derive(Debug)]
pub enum PrepError {
    /// I/O errors (directory preparation, record and metadata writes)
    Io(std::io::Error),

    /// Invalid or conflicting run configuration
    Config(String),

    /// Source, target or metadata directory is missing or unusable
    InvalidPath(String),

    /// The decode capability could not turn a file into a sample
    Decode(String),

    /// The sample has a channel layout the normalizer cannot handle
    Format(String),

    /// A flat sequence does not fit the requested shape
    Shape(String),

    /// A metadata line could not be parsed
    Metadata(String),

    /// Generic error with context
    Other(String),
}

impl fmt::Display for PrepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
            Self::InvalidPath(msg) => write!(f, "Invalid path: {msg}"),
            Self::Decode(msg) => write!(f, "Decode error: {msg}"),
            Self::Format(msg) => write!(f, "Unsupported sample format: {msg}"),
            Self::Shape(msg) => write!(f, "Shape error: {msg}"),
            Self::Metadata(msg) => write!(f, "Malformed metadata: {msg}"),
            Self::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for PrepError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PrepError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<image::ImageError> for PrepError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(e) => Self::Io(e),
            other => Self::Decode(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for PrepError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(format!("JSON error: {err}"))
    }
}

impl From<ndarray::ShapeError> for PrepError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::Shape(err.to_string())
    }
}

impl From<std::num::ParseIntError> for PrepError {
    fn from(err: std::num::ParseIntError) -> Self {
        Self::Metadata(err.to_string())
    }
}

impl From<std::num::ParseFloatError> for PrepError {
    fn from(err: std::num::ParseFloatError) -> Self {
        Self::Metadata(err.to_string())
    }
}

/// Result type alias for flatcorpus operations.
pub type Result<T> = std::result::Result<T, PrepError>;

/// Extension trait to add context to results.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, msg: impl Into<String>) -> Result<T>;

    /// Add context using a closure (lazy evaluation).
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<PrepError>,
{
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err: PrepError = e.into();
            PrepError::Other(format!("{}: {}", msg.into(), err))
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err: PrepError = e.into();
            PrepError::Other(format!("{}: {}", f(), err))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PrepError::Format("2 channels".to_owned());
        assert_eq!(err.to_string(), "Unsupported sample format: 2 channels");
    }

    #[test]
    fn test_io_error_keeps_source() {
        let err: PrepError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into();
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().starts_with("I/O error"));
    }

    #[test]
    fn test_result_context() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "0.csv",
        ));

        let result: Result<()> = result.context("Failed to write record");
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to write record")
        );
    }
}
