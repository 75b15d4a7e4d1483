use std::path::PathBuf;
use thiserror::Error;

/// Error type for the projection and localization stages.
///
/// None of these are retried. Each variant carries enough context (the year,
/// method, region or file involved) to diagnose a failed run without re-running it.
#[derive(Error, Debug)]
pub enum Ar5Error {
    #[error("{0}")]
    Error(String),
    /// Sample-count or method-count parameters that cannot be satisfied
    #[error("Invalid configuration: {0}")]
    Configuration(String),
    /// Year axes of two inputs do not line up after subsetting
    #[error("Misaligned {axis} axis: {reason}")]
    DataAlignment { axis: String, reason: String },
    #[error("Fingerprint for region '{region}' is unavailable ({path}): {reason}")]
    FingerprintNotFound {
        region: String,
        path: PathBuf,
        reason: String,
    },
    #[error("Failed to read or write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed {what} at line {line}: {reason}")]
    Parse {
        what: String,
        line: usize,
        reason: String,
    },
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

impl Ar5Error {
    /// Shorthand for a [`Ar5Error::DataAlignment`] error
    pub fn alignment(axis: &str, reason: impl Into<String>) -> Self {
        Ar5Error::DataAlignment {
            axis: axis.to_string(),
            reason: reason.into(),
        }
    }

    /// Wrap an I/O error with the path that produced it
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Ar5Error::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience type for `Result<T, Ar5Error>`.
pub type Ar5Result<T> = Result<T, Ar5Error>;
