use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the subscription tracker.
#[derive(Error, Debug)]
pub enum TrackerError {
    /// The user identifier was missing.
    #[error("user ID is empty")]
    EmptyUserId,

    /// The user identifier is not a valid UUID.
    #[error("invalid user ID: {0}")]
    InvalidUserId(String),

    /// The service name was missing or blank.
    #[error("service name must be provided")]
    InvalidServiceName,

    /// The service name exceeds the storage column width.
    #[error("service name must be at most {max} characters, got {len}")]
    ServiceNameTooLong { len: usize, max: usize },

    /// The monthly price was zero or negative.
    #[error("price must be positive integer, got {0}")]
    InvalidPrice(i64),

    /// A start date did not match `MM-YYYY`.
    #[error("invalid start_date format, expected MM-YYYY: {0}")]
    InvalidStartDate(String),

    /// An end date did not match `MM-YYYY`.
    #[error("invalid end_date format, expected MM-YYYY: {0}")]
    InvalidEndDate(String),

    /// The end of an interval precedes its start.
    #[error("end date {end} must not be before start date {start}")]
    EndDateBeforeStart { start: String, end: String },

    /// A subscription identifier was not a positive integer.
    #[error("invalid subscription ID: {0}")]
    InvalidSubscriptionId(String),

    /// A listing sort key is not one of the recognised fields.
    #[error("Invalid sort field: {0}")]
    InvalidSortField(String),

    /// No subscription exists with the requested identifier.
    #[error("subscription not found: {0}")]
    NotFound(u64),

    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file could not be written to disk.
    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TrackerError {
    /// `true` for errors caused by bad caller input rather than storage
    /// failures. The binary uses this to choose its exit code.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            TrackerError::EmptyUserId
                | TrackerError::InvalidUserId(_)
                | TrackerError::InvalidServiceName
                | TrackerError::ServiceNameTooLong { .. }
                | TrackerError::InvalidPrice(_)
                | TrackerError::InvalidStartDate(_)
                | TrackerError::InvalidEndDate(_)
                | TrackerError::EndDateBeforeStart { .. }
                | TrackerError::InvalidSubscriptionId(_)
                | TrackerError::InvalidSortField(_)
        )
    }
}

/// Convenience alias used throughout the tracker crates.
pub type Result<T> = std::result::Result<T, TrackerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_file_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = TrackerError::FileRead {
            path: PathBuf::from("/data/user.jsonl"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read file"));
        assert!(msg.contains("/data/user.jsonl"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_error_display_invalid_start_date() {
        let err = TrackerError::InvalidStartDate("2024-03".to_string());
        assert_eq!(
            err.to_string(),
            "invalid start_date format, expected MM-YYYY: 2024-03"
        );
    }

    #[test]
    fn test_error_display_end_before_start() {
        let err = TrackerError::EndDateBeforeStart {
            start: "05-2024".to_string(),
            end: "03-2024".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "end date 03-2024 must not be before start date 05-2024"
        );
    }

    #[test]
    fn test_error_display_not_found() {
        let err = TrackerError::NotFound(42);
        assert_eq!(err.to_string(), "subscription not found: 42");
    }

    #[test]
    fn test_error_display_invalid_price() {
        let err = TrackerError::InvalidPrice(-5);
        assert_eq!(err.to_string(), "price must be positive integer, got -5");
    }

    #[test]
    fn test_error_display_invalid_sort_field() {
        let err = TrackerError::InvalidSortField("name".to_string());
        assert_eq!(err.to_string(), "Invalid sort field: name");
    }

    #[test]
    fn test_is_validation() {
        assert!(TrackerError::EmptyUserId.is_validation());
        assert!(TrackerError::InvalidPrice(0).is_validation());
        assert!(!TrackerError::NotFound(1).is_validation());
        assert!(!TrackerError::Config("x".to_string()).is_validation());
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: TrackerError = io_err.into();
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid}").unwrap_err();
        let err: TrackerError = json_err.into();
        assert!(err.to_string().contains("Failed to parse JSON"));
    }
}
