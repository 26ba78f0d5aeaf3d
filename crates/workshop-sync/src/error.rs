//! Error types for workshop-sync.
//!
//! Variants are grouped by where the failure comes from: local storage, user
//! input, configuration, the remote service, file system I/O, and JSON
//! serialization. Callers at the operation boundary use the classification
//! helpers, or [`Error::notification`], to decide how to tell the user.

use std::path::PathBuf;
use thiserror::Error;

use crate::record::Collection;

/// The main error type for workshop-sync operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the local database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database statement or transaction failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// The local store could not be opened at startup.
    #[error("local store unavailable ({reason}); capture and sync are disabled")]
    StorageUnavailable {
        /// Why the store failed to open.
        reason: String,
    },

    // === Input Errors ===
    /// A collection name did not match any known collection.
    #[error("unknown collection '{name}'")]
    UnknownCollection {
        /// The name that was given.
        name: String,
    },

    /// A record was submitted without its primary key.
    #[error("{collection} records require a non-empty '{field}' field")]
    MissingPrimaryKey {
        /// Collection the record was meant for.
        collection: Collection,
        /// The primary key field name.
        field: &'static str,
    },

    /// A search was requested without a key.
    #[error("search key must not be empty")]
    EmptySearchKey,

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// The remote service base URL could not be parsed.
    #[error("invalid API base URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // === Remote Errors ===
    /// The request never produced a response.
    #[error("{operation} request failed: {source}")]
    Network {
        /// The remote operation being attempted.
        operation: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The remote service answered with a non-success status.
    #[error("remote service returned {status}: {body}")]
    Remote {
        /// HTTP status code.
        status: u16,
        /// Response body, extracted on a best-effort basis.
        body: String,
    },

    /// An operation timed out and was aborted.
    #[error("operation timed out: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for workshop-sync operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Classify a transport failure, separating timeouts from other errors.
    #[must_use]
    pub fn transport(operation: impl Into<String>, source: reqwest::Error) -> Self {
        let operation = operation.into();
        if source.is_timeout() {
            Self::Timeout { operation }
        } else {
            Self::Network { operation, source }
        }
    }

    /// Check if this error means the local store cannot be used at all.
    ///
    /// Callers degrade to view-only mode instead of failing outright.
    #[must_use]
    pub fn is_storage_unavailable(&self) -> bool {
        matches!(
            self,
            Self::DatabaseOpen { .. }
                | Self::DirectoryCreate { .. }
                | Self::DatabaseMigration { .. }
                | Self::StorageUnavailable { .. }
        )
    }

    /// Check if this error came from talking to the remote service.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::Remote { .. } | Self::Timeout { .. }
        )
    }

    /// Check if this error is a rejected user input.
    #[must_use]
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::UnknownCollection { .. } | Self::MissingPrimaryKey { .. } | Self::EmptySearchKey
        )
    }

    /// The message shown to the user when an operation fails with this error.
    #[must_use]
    pub fn notification(&self) -> String {
        if self.is_remote() {
            format!("Remote service unreachable ({self}). Nothing was lost; try again later.")
        } else if self.is_invalid_input() {
            format!("Invalid input: {self}. See `wsync help` for usage.")
        } else if self.is_storage_unavailable() {
            format!("Local store unavailable ({self}). Only online lookups work right now.")
        } else {
            format!("Error: {self}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::EmptySearchKey;
        assert_eq!(err.to_string(), "search key must not be empty");

        let err = Error::internal("test error");
        assert_eq!(err.to_string(), "internal error: test error");
    }

    #[test]
    fn test_missing_primary_key_display() {
        let err = Error::MissingPrimaryKey {
            collection: Collection::GenIssue,
            field: "code",
        };
        let msg = err.to_string();
        assert!(msg.contains("gen_issue"));
        assert!(msg.contains("'code'"));
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_unknown_collection_display() {
        let err = Error::UnknownCollection {
            name: "eng_paint".to_string(),
        };
        assert!(err.to_string().contains("eng_paint"));
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_remote_error_display() {
        let err = Error::Remote {
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "remote service returned 500: boom");
        assert!(err.is_remote());
        assert!(!err.is_storage_unavailable());
    }

    #[test]
    fn test_timeout_is_remote() {
        let err = Error::Timeout {
            operation: "sync batch".to_string(),
        };
        assert!(err.is_remote());
        assert!(err.to_string().contains("sync batch"));
    }

    #[test]
    fn test_notification_for_remote_failure() {
        let err = Error::Timeout {
            operation: "search".to_string(),
        };
        let msg = err.notification();
        assert!(msg.starts_with("Remote service unreachable"));
        assert!(msg.contains("Nothing was lost"));
    }

    #[test]
    fn test_notification_for_bad_input() {
        let msg = Error::EmptySearchKey.notification();
        assert!(msg.starts_with("Invalid input"));
        assert!(msg.contains("usage"));
    }

    #[test]
    fn test_notification_for_unavailable_store() {
        let err = Error::StorageUnavailable {
            reason: "disk full".to_string(),
        };
        let msg = err.notification();
        assert!(msg.starts_with("Local store unavailable"));
        assert!(msg.contains("disk full"));
    }

    #[test]
    fn test_notification_fallback() {
        let msg = Error::internal("boom").notification();
        assert_eq!(msg, "Error: internal error: boom");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_rusqlite_error() {
        let result = rusqlite::Connection::open_with_flags(
            "/nonexistent/path/db.sqlite",
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        );
        if let Err(sqlite_err) = result {
            let err: Error = sqlite_err.into();
            assert!(matches!(err, Error::DatabaseQuery(_)));
            assert!(!err.is_storage_unavailable());
        }
    }

    #[test]
    fn test_database_open_is_storage_unavailable() {
        let result = rusqlite::Connection::open_with_flags(
            "/nonexistent/path/db.sqlite",
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        );
        if let Err(sqlite_err) = result {
            let err = Error::DatabaseOpen {
                path: PathBuf::from("/nonexistent/path/db.sqlite"),
                source: sqlite_err,
            };
            assert!(err.is_storage_unavailable());
            assert!(err.to_string().contains("/nonexistent/path/db.sqlite"));
        }
    }

    #[test]
    fn test_directory_create_is_storage_unavailable() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::DirectoryCreate {
            path: PathBuf::from("/root/forbidden"),
            source: io_err,
        };
        assert!(err.is_storage_unavailable());
        assert!(err.to_string().contains("/root/forbidden"));
    }

    #[test]
    fn test_storage_unavailable_display() {
        let err = Error::StorageUnavailable {
            reason: "disk full".to_string(),
        };
        assert!(err.is_storage_unavailable());
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_from_json_error() {
        let json_result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        if let Err(json_err) = json_result {
            let err: Error = json_err.into();
            assert!(matches!(err, Error::Json(_)));
        }
    }

    #[test]
    fn test_from_url_error() {
        let err: Error = url::Url::parse("not a url").unwrap_err().into();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = Error::ConfigValidation {
            message: "query_timeout_secs must be greater than 0".to_string(),
        };
        assert!(err.to_string().contains("query_timeout_secs"));
    }
}
