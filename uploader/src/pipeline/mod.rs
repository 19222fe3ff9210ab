//! Upload pipeline.
//!
//! - [`orchestrator`] - sequential runs over pending items
//! - [`Uploader`] - queue, ingestion surface and orchestrator wired from one config

pub mod orchestrator;

pub use orchestrator::*;

use std::sync::Arc;

use crate::config::UploadConfig;
use crate::error::ConfigResult;
use crate::ingest::IngestionSurface;
use crate::queue::{SharedQueue, UploadListener, UploadQueue};

/// The three stateful components sharing one queue.
pub struct Uploader {
    pub queue: SharedQueue,
    pub ingest: IngestionSurface,
    pub orchestrator: UploadOrchestrator,
}

impl Uploader {
    pub fn from_config(config: &UploadConfig, listener: Arc<dyn UploadListener>) -> ConfigResult<Self> {
        let queue = SharedQueue::new(UploadQueue::with_listener(config.policy()?, listener));
        Ok(Self {
            ingest: IngestionSurface::new(queue.clone(), config.allow_multiple),
            orchestrator: UploadOrchestrator::new(queue.clone(), config.orchestrator_options()),
            queue,
        })
    }
}
