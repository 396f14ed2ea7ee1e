//! Error types for feeder.

use thiserror::Error;

/// Common error type for feeder.
#[derive(Error, Debug)]
pub enum FeederError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Application settings could not be read or are inconsistent.
    #[error("configuration error: {0}")]
    Config(String),

    /// Persisted data (source list or article file) is corrupt.
    #[error("parse error: {0}")]
    Parse(String),

    /// Source list schema version cannot be migrated.
    #[error("migration error: {0}")]
    Migration(String),

    /// Caller broke a contract (mismatched lengths, bad index, bad URL).
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Feed could not be retrieved.
    #[error("fetch error: {0}")]
    Fetch(String),

    /// Save or backup step could not be completed.
    #[error("save error: {0}")]
    Save(String),

    /// A confirmation prompt was declined.
    #[error("cancelled: {0}")]
    Cancelled(String),
}

impl From<toml::de::Error> for FeederError {
    fn from(e: toml::de::Error) -> Self {
        FeederError::Parse(e.to_string())
    }
}

impl From<serde_json::Error> for FeederError {
    fn from(e: serde_json::Error) -> Self {
        FeederError::Parse(e.to_string())
    }
}

/// Result type alias for feeder operations.
pub type Result<T> = std::result::Result<T, FeederError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = FeederError::Validation("lengths differ".to_string());
        assert_eq!(err.to_string(), "validation error: lengths differ");
    }

    #[test]
    fn test_not_found_error_display() {
        let err = FeederError::NotFound("source list".to_string());
        assert_eq!(err.to_string(), "source list not found");
    }

    #[test]
    fn test_cancelled_error_display() {
        let err = FeederError::Cancelled("overwrite declined".to_string());
        assert_eq!(err.to_string(), "cancelled: overwrite declined");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: FeederError = io_err.into();
        assert!(matches!(err, FeederError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Table>("not [[ valid").unwrap_err();
        let err: FeederError = toml_err.into();
        assert!(matches!(err, FeederError::Parse(_)));
    }

    #[test]
    fn test_result_alias() {
        fn sample_ok() -> Result<i32> {
            Ok(42)
        }

        fn sample_err() -> Result<i32> {
            Err(FeederError::Fetch("timed out".to_string()))
        }

        assert_eq!(sample_ok().unwrap(), 42);
        assert!(sample_err().is_err());
    }
}
