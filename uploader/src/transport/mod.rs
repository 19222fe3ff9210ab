//! Upload transports.
//!
//! A [`Transport`] moves the files of one orchestrator run to their
//! destination. It is called exactly once per run with every file of the
//! run, in queue order.
//!
//! # Transports
//!
//! - [`FnTransport`] - wraps an async closure
//! - [`HttpTransport`] - multipart `POST` to an upload endpoint
//! - [`DirectoryTransport`] - copies files into a local directory
//! - [`DryRunTransport`] - accepts everything, moves nothing

use futures::future::{BoxFuture, FutureExt};
use reqwest::multipart::{Form, Part};
use std::future::Future;
use std::path::PathBuf;

use crate::error::{TransportError, TransportResult};
use crate::logs::log_info_indent;
use crate::models::CandidateFile;

/// Receives real progress from a transport.
pub trait ProgressReporter: Send + Sync {
    /// Progress of the file at `file_index` in the slice given to the
    /// transport, 0 to 100.
    fn report(&self, file_index: usize, percent: u8);
}

/// Reporter that drops every report.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _file_index: usize, _percent: u8) {}
}

/// Performs the actual upload of a run.
pub trait Transport: Send + Sync {
    fn upload<'a>(
        &'a self,
        files: &'a [CandidateFile],
        progress: &'a dyn ProgressReporter,
    ) -> BoxFuture<'a, TransportResult<()>>;

    /// Whether this transport calls its [`ProgressReporter`].
    fn reports_progress(&self) -> bool {
        false
    }
}

// =============================================================================
// Closure transport
// =============================================================================

/// Adapts an async function taking the run's files.
pub struct FnTransport<F> {
    func: F,
}

impl<F, Fut> FnTransport<F>
where
    F: Fn(Vec<CandidateFile>) -> Fut + Send + Sync,
    Fut: Future<Output = TransportResult<()>> + Send + 'static,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F, Fut> Transport for FnTransport<F>
where
    F: Fn(Vec<CandidateFile>) -> Fut + Send + Sync,
    Fut: Future<Output = TransportResult<()>> + Send + 'static,
{
    fn upload<'a>(
        &'a self,
        files: &'a [CandidateFile],
        _progress: &'a dyn ProgressReporter,
    ) -> BoxFuture<'a, TransportResult<()>> {
        (self.func)(files.to_vec()).boxed()
    }
}

/// Shorthand for [`FnTransport::new`].
pub fn transport_fn<F, Fut>(func: F) -> FnTransport<F>
where
    F: Fn(Vec<CandidateFile>) -> Fut + Send + Sync,
    Fut: Future<Output = TransportResult<()>> + Send + 'static,
{
    FnTransport::new(func)
}

// =============================================================================
// HTTP transport
// =============================================================================

/// Uploads each file as `multipart/form-data` to `{base_url}/api/upload`.
///
/// Files are sent one request at a time in run order; the first failure
/// aborts the rest.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/api/upload", base_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send_one(&self, file: &CandidateFile) -> TransportResult<()> {
        let bytes = file.contents.read().await?;
        let mut part = Part::bytes(bytes).file_name(file.name.clone());
        if !file.mime_type.is_empty() {
            part = part.mime_str(&file.mime_type)?;
        }
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(TransportError::Status {
                code: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

impl Transport for HttpTransport {
    fn upload<'a>(
        &'a self,
        files: &'a [CandidateFile],
        progress: &'a dyn ProgressReporter,
    ) -> BoxFuture<'a, TransportResult<()>> {
        async move {
            for (index, file) in files.iter().enumerate() {
                log_info_indent(format!("POST {} <- {}", self.endpoint, file.name), 1);
                self.send_one(file).await?;
                progress.report(index, 100);
            }
            Ok(())
        }
        .boxed()
    }

    fn reports_progress(&self) -> bool {
        true
    }
}

// =============================================================================
// Directory transport
// =============================================================================

/// Writes each file into a target directory, creating it if needed.
pub struct DirectoryTransport {
    dest: PathBuf,
}

impl DirectoryTransport {
    pub fn new(dest: impl Into<PathBuf>) -> Self {
        Self { dest: dest.into() }
    }
}

impl Transport for DirectoryTransport {
    fn upload<'a>(
        &'a self,
        files: &'a [CandidateFile],
        progress: &'a dyn ProgressReporter,
    ) -> BoxFuture<'a, TransportResult<()>> {
        async move {
            tokio::fs::create_dir_all(&self.dest).await?;
            for (index, file) in files.iter().enumerate() {
                let bytes = file.contents.read().await?;
                // Only the final path component is used as the target name
                let name = std::path::Path::new(&file.name)
                    .file_name()
                    .ok_or_else(|| {
                        TransportError::Rejected(format!("Invalid file name: {:?}", file.name))
                    })?;
                tokio::fs::write(self.dest.join(name), bytes).await?;
                progress.report(index, 100);
            }
            Ok(())
        }
        .boxed()
    }

    fn reports_progress(&self) -> bool {
        true
    }
}

// =============================================================================
// Dry run
// =============================================================================

/// Succeeds immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunTransport;

impl Transport for DryRunTransport {
    fn upload<'a>(
        &'a self,
        files: &'a [CandidateFile],
        _progress: &'a dyn ProgressReporter,
    ) -> BoxFuture<'a, TransportResult<()>> {
        async move {
            for file in files {
                log_info_indent(format!("(dry run) {}", file.name), 1);
            }
            Ok(())
        }
        .boxed()
    }
}
