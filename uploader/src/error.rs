//! Error types for the upload pipeline.
//!
//! - [`ValidationError`] - why a candidate batch was refused
//! - [`QueueError`] - refused queue mutations
//! - [`TransportError`] - failures reported by the upload transport
//! - [`ConfigError`] - invalid configuration values
//! - [`UploadError`] - top-level wrapper used by the CLI
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use serde::Serialize;
use thiserror::Error;

use crate::models::ItemId;
use crate::validation::format_megabytes;

/// Separator used when several reasons are reported as one message.
pub const REASON_SEPARATOR: &str = "; ";

// =============================================================================
// Validation Errors
// =============================================================================

/// A single reason for refusing a batch.
///
/// Per-file reasons carry the offending file name; the count reason is
/// batch-scoped.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum ValidationError {
    /// File is larger than the configured limit.
    #[error("\"{file}\" exceeds the maximum size of {}", format_megabytes(*limit))]
    SizeExceeded { file: String, size: u64, limit: u64 },

    /// File matches none of the accept patterns.
    #[error("\"{file}\" has an unsupported type ({})", display_mime(mime_type))]
    TypeRejected { file: String, mime_type: String },

    /// Queue plus batch would exceed the maximum number of files.
    #[error("Too many files: {queued} queued + {submitted} submitted exceeds the limit of {max}")]
    TooManyFiles {
        submitted: usize,
        queued: usize,
        max: usize,
    },
}

impl ValidationError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::SizeExceeded { .. } => "size_exceeded",
            ValidationError::TypeRejected { .. } => "type_rejected",
            ValidationError::TooManyFiles { .. } => "too_many_files",
        }
    }
}

fn display_mime(mime_type: &str) -> &str {
    if mime_type.is_empty() {
        "unknown type"
    } else {
        mime_type
    }
}

/// Joins reasons into the single message handed to `on_error`.
pub fn join_reasons(reasons: &[ValidationError]) -> String {
    reasons
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(REASON_SEPARATOR)
}

// =============================================================================
// Queue Errors
// =============================================================================

/// Refused queue mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The batch failed validation; the queue is unchanged.
    #[error("{}", join_reasons(.0))]
    Rejected(Vec<ValidationError>),

    /// The item is uploading and cannot be removed.
    #[error("Item {id} is uploading and cannot be removed")]
    Refused { id: ItemId },

    /// No item with this id.
    #[error("No queued item with id {0}")]
    NotFound(ItemId),
}

impl QueueError {
    /// Validation reasons, if this is a rejected batch.
    pub fn reasons(&self) -> &[ValidationError] {
        match self {
            QueueError::Rejected(reasons) => reasons,
            _ => &[],
        }
    }
}

// =============================================================================
// Transport Errors
// =============================================================================

/// Failures surfaced by a [`crate::transport::Transport`].
#[derive(Debug, Error)]
pub enum TransportError {
    /// The transport refused the upload with a message.
    #[error("{0}")]
    Rejected(String),

    /// HTTP request failed before a response arrived.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Server answered with a non-success status.
    #[error("Server error ({code}): {body}")]
    Status { code: u16, body: String },

    /// Reading or writing file contents failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        TransportError::Http(e.to_string())
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Invalid configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value could not be parsed.
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },

    /// An accept pattern could not be compiled.
    #[error("Invalid accept pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },

    /// Config file could not be read.
    #[error("Config IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid JSON.
    #[error("Config JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Top-level Errors
// =============================================================================

/// Errors returned by the CLI commands.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Batch rejected: {0}")]
    Queue(#[from] QueueError),

    #[error("Upload failed: {0}")]
    Transport(#[from] TransportError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Nothing to upload or no transport selected.
    #[error("{0}")]
    Usage(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for CLI commands.
pub type UploadResult<T> = Result<T, UploadError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        let queue_err = QueueError::Rejected(vec![ValidationError::TooManyFiles {
            submitted: 3,
            queued: 4,
            max: 5,
        }]);
        let top: UploadError = queue_err.into();
        assert!(top.to_string().contains("limit of 5"));

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let transport: TransportError = io.into();
        let top: UploadError = transport.into();
        assert!(top.to_string().contains("gone"));
    }

    #[test]
    fn test_size_message_renders_megabytes() {
        let err = ValidationError::SizeExceeded {
            file: "archive.pdf".into(),
            size: 6_000_000,
            limit: 5_000_000,
        };
        let msg = err.to_string();
        assert!(msg.contains("archive.pdf"));
        assert!(msg.contains("4.77 MB"));
        assert_eq!(err.code(), "size_exceeded");
    }

    #[test]
    fn test_rejected_joins_reasons() {
        let err = QueueError::Rejected(vec![
            ValidationError::TypeRejected {
                file: "notes.txt".into(),
                mime_type: "text/plain".into(),
            },
            ValidationError::TypeRejected {
                file: "blob".into(),
                mime_type: String::new(),
            },
        ]);
        let msg = err.to_string();
        assert_eq!(msg.matches(REASON_SEPARATOR).count(), 1);
        assert!(msg.contains("text/plain"));
        assert!(msg.contains("unknown type"));
        assert_eq!(err.reasons().len(), 2);
    }

    #[test]
    fn test_validation_error_serializes_code() {
        let err = ValidationError::TooManyFiles {
            submitted: 2,
            queued: 5,
            max: 5,
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "too_many_files");
    }
}
