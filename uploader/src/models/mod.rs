//! Domain models for the upload pipeline.
//!
//! - [`CandidateFile`] - unvalidated file reference from a drop or picker
//! - [`FileContents`] - opaque handle to the file's bytes
//! - [`UploadItem`] - queued, stateful record of one file
//! - [`UploadStatus`] - per-item lifecycle state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

// =============================================================================
// Candidate Files
// =============================================================================

/// Handle to the bytes of a candidate file.
///
/// The pipeline never reads contents itself; only transports do.
#[derive(Debug, Clone, Default)]
pub enum FileContents {
    /// No contents (zero-byte file or metadata-only reference).
    #[default]
    Empty,
    /// Bytes already in memory.
    Memory(Arc<[u8]>),
    /// File on the local filesystem.
    Path(PathBuf),
}

impl FileContents {
    /// Load the full contents.
    pub async fn read(&self) -> std::io::Result<Vec<u8>> {
        match self {
            FileContents::Empty => Ok(Vec::new()),
            FileContents::Memory(bytes) => Ok(bytes.to_vec()),
            FileContents::Path(path) => tokio::fs::read(path).await,
        }
    }
}

impl From<Vec<u8>> for FileContents {
    fn from(bytes: Vec<u8>) -> Self {
        FileContents::Memory(bytes.into())
    }
}

/// An unvalidated file submitted through drag-and-drop or a file picker.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateFile {
    pub name: String,
    pub size: u64,
    /// MIME type as reported by the platform; empty when unknown.
    pub mime_type: String,
    #[serde(skip)]
    pub contents: FileContents,
}

impl CandidateFile {
    pub fn new(name: impl Into<String>, size: u64, mime_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size,
            mime_type: mime_type.into(),
            contents: FileContents::Empty,
        }
    }

    /// In-memory file; the size is taken from the bytes.
    pub fn from_bytes(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            size: bytes.len() as u64,
            mime_type: mime_type.into(),
            contents: bytes.into(),
        }
    }

    pub fn with_contents(mut self, contents: FileContents) -> Self {
        self.contents = contents;
        self
    }
}

// =============================================================================
// Upload Items
// =============================================================================

/// Identifier of a queued item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(Uuid);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle of a queued item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Pending,
    Uploading,
    Succeeded,
    Failed,
}

impl UploadStatus {
    pub fn label(&self) -> &'static str {
        match self {
            UploadStatus::Pending => "pending",
            UploadStatus::Uploading => "uploading",
            UploadStatus::Succeeded => "succeeded",
            UploadStatus::Failed => "failed",
        }
    }
}

/// One file's admission-to-completion record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadItem {
    pub id: ItemId,
    pub file: CandidateFile,
    pub status: UploadStatus,
    /// 0 to 100.
    pub progress: u8,
    pub error: Option<String>,
    pub added_at: DateTime<Utc>,
}

impl UploadItem {
    /// Fresh pending item.
    pub(crate) fn pending(file: CandidateFile) -> Self {
        Self {
            id: ItemId::new(),
            file,
            status: UploadStatus::Pending,
            progress: 0,
            error: None,
            added_at: Utc::now(),
        }
    }

    pub fn is_removable(&self) -> bool {
        self.status != UploadStatus::Uploading
    }
}
