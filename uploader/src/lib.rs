//! # Dropload - validated, queued file uploads
//!
//! Dropload turns raw file selections (a drop onto a drop zone, or a file
//! picker) into a validated upload queue and uploads it sequentially through
//! a pluggable transport.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │  Drop/Picker │────▶│  Ingestion   │────▶│ UploadQueue  │────▶│ Orchestrator │──▶ Transport
//! │  file lists  │     │   Surface    │     │ (validation) │     │ (sequential) │
//! └──────────────┘     └──────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use dropload::{CandidateFile, NoopListener, UploadConfig, Uploader, DryRunTransport};
//!
//! #[tokio::main]
//! async fn main() {
//!     let uploader = Uploader::from_config(&UploadConfig::default(), Arc::new(NoopListener)).unwrap();
//!     uploader.ingest.on_browse(&[CandidateFile::new("report.pdf", 1024, "application/pdf")]).unwrap();
//!     let outcome = uploader.orchestrator.start(&DryRunTransport).await;
//!     println!("{:?}", outcome);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types
//! - [`config`] - Upload options and their sources
//! - [`models`] - Candidate files and upload items
//! - [`validation`] - Batch validation policy
//! - [`queue`] - Upload queue and listeners
//! - [`transport`] - Transports and progress reporting
//! - [`pipeline`] - Orchestrator and the [`Uploader`] bundle
//! - [`ingest`] - Drop and picker ingestion
//! - [`logs`] - Pipeline log stream

// Core modules
pub mod error;
pub mod models;
pub mod config;

// Validation and state
pub mod validation;
pub mod queue;

// Upload
pub mod transport;
pub mod pipeline;

// Input
pub mod ingest;

// Logging
pub mod logs;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError,
    QueueError,
    TransportError,
    UploadError,
    ValidationError,
    join_reasons,
};

// =============================================================================
// Re-exports - Models and config
// =============================================================================

pub use models::{CandidateFile, FileContents, ItemId, UploadItem, UploadStatus};
pub use config::UploadConfig;

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use validation::{AcceptPattern, ValidationPolicy, Verdict};
pub use queue::{NoopListener, SharedQueue, UploadListener, UploadQueue};
pub use transport::{
    DirectoryTransport,
    DryRunTransport,
    FnTransport,
    HttpTransport,
    ProgressReporter,
    Transport,
    transport_fn,
};
pub use pipeline::{
    AbortHandle,
    CompletionMode,
    OrchestratorOptions,
    RunOutcome,
    UploadOrchestrator,
    Uploader,
};
pub use ingest::{IngestionSurface, PathFile, PlatformFile};
