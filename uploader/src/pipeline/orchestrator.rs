//! Sequential upload runs.
//!
//! A run takes the items that are pending when [`UploadOrchestrator::start`]
//! is called and walks them one at a time through
//! `Pending -> Uploading -> Succeeded`, ramping progress in steps of
//! [`PROGRESS_STEP`] with a fixed delay between steps. Once every item of the
//! run has been walked, the transport is called exactly once with all of the
//! run's files.
//!
//! With [`CompletionMode::Optimistic`] items are marked succeeded as soon as
//! their ramp ends, and a failing transport does not roll them back. With
//! [`CompletionMode::AwaitTransport`] items stay uploading until the
//! transport settles and end up succeeded or failed according to its result.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::logs::{log_error, log_info, log_success, log_success_indent, log_warning};
use crate::models::{ItemId, UploadStatus};
use crate::queue::SharedQueue;
use crate::transport::{ProgressReporter, Transport};

/// Progress increment of the synthetic ramp.
pub const PROGRESS_STEP: u8 = 10;

/// Default delay between ramp steps.
pub const DEFAULT_TICK: Duration = Duration::from_millis(200);

/// When items of a run become `Succeeded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompletionMode {
    /// At the end of each item's progress ramp, before the transport runs.
    #[default]
    Optimistic,
    /// After the transport resolves; a transport failure marks items failed.
    AwaitTransport,
}

impl std::str::FromStr for CompletionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "optimistic" => Ok(CompletionMode::Optimistic),
            "await-transport" | "await_transport" => Ok(CompletionMode::AwaitTransport),
            other => Err(format!("unknown completion mode: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    /// Delay between progress steps.
    pub tick: Duration,
    pub completion: CompletionMode,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            tick: DEFAULT_TICK,
            completion: CompletionMode::default(),
        }
    }
}

/// How a call to `start` ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Another run was in flight; nothing happened.
    AlreadyRunning,
    /// No pending items; the transport was not called.
    Idle,
    /// The transport resolved successfully.
    Completed { uploaded: usize },
    /// The transport failed with this message.
    TransportFailed { message: String },
    /// The run was aborted; `completed` items had already succeeded.
    Aborted { completed: usize },
}

/// Requests that the active abortable run stop.
#[derive(Clone)]
pub struct AbortHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl AbortHandle {
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }
}

/// Drives pending items through their lifecycle and calls the transport.
pub struct UploadOrchestrator {
    queue: SharedQueue,
    options: OrchestratorOptions,
    running: AtomicBool,
    abort_tx: Arc<watch::Sender<bool>>,
}

/// Ends a run, however it ends: items of the run still uploading go back to
/// pending, then the running flag is cleared. Covers a dropped `start` future.
struct RunGuard<'a> {
    running: &'a AtomicBool,
    queue: SharedQueue,
    started: Vec<ItemId>,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        let mut queue = self.queue.lock();
        for id in &self.started {
            queue.reset_to_pending(*id);
        }
        drop(queue);
        self.running.store(false, Ordering::Release);
    }
}

impl UploadOrchestrator {
    pub fn new(queue: SharedQueue, options: OrchestratorOptions) -> Self {
        let (abort_tx, _) = watch::channel(false);
        Self {
            queue,
            options,
            running: AtomicBool::new(false),
            abort_tx: Arc::new(abort_tx),
        }
    }

    pub fn queue(&self) -> &SharedQueue {
        &self.queue
    }

    pub fn options(&self) -> &OrchestratorOptions {
        &self.options
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Handle for aborting runs started with [`Self::start_abortable`].
    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle {
            tx: self.abort_tx.clone(),
        }
    }

    /// Upload every currently pending item. Cannot be interrupted.
    pub async fn start(&self, transport: &dyn Transport) -> RunOutcome {
        self.run(transport, false).await
    }

    /// Like [`Self::start`], but stops when the [`AbortHandle`] fires.
    ///
    /// Abort requests made before the run starts are discarded.
    pub async fn start_abortable(&self, transport: &dyn Transport) -> RunOutcome {
        self.run(transport, true).await
    }

    async fn run(&self, transport: &dyn Transport, abortable: bool) -> RunOutcome {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log_warning("Upload already in progress, ignoring start");
            return RunOutcome::AlreadyRunning;
        }
        let mut guard = RunGuard {
            running: &self.running,
            queue: self.queue.clone(),
            started: Vec::new(),
        };

        let mut abort = if abortable {
            self.abort_tx.send_replace(false);
            Some(self.abort_tx.subscribe())
        } else {
            None
        };

        let run_ids = self.queue.lock().pending_ids();
        if run_ids.is_empty() {
            log_info("No pending files to upload");
            return RunOutcome::Idle;
        }
        log_info(format!("📤 Uploading {} file(s)...", run_ids.len()));

        let await_transport = self.options.completion == CompletionMode::AwaitTransport;
        let synthetic_ramp = !await_transport || !transport.reports_progress();

        let mut files = Vec::with_capacity(run_ids.len());
        guard.started.reserve(run_ids.len());

        for id in run_ids {
            let file = self.queue.lock().mark_uploading(id);
            // Removed by the user before its turn
            let Some(file) = file else { continue };
            guard.started.push(id);

            if synthetic_ramp {
                let mut percent = 0u8;
                while percent < 100 {
                    if self.tick(abort.as_mut()).await {
                        return self.abort_run(&guard.started);
                    }
                    percent = percent.saturating_add(PROGRESS_STEP).min(100);
                    self.queue.lock().advance_progress(id, percent);
                }

                if !await_transport {
                    self.queue.lock().mark_succeeded(id);
                    log_success_indent(file.name.clone(), 1);
                }
            }
            files.push(file);
        }

        if files.is_empty() {
            log_info("No pending files to upload");
            return RunOutcome::Idle;
        }

        log_info(format!("Sending {} file(s) to transport...", files.len()));
        let reporter = RunProgress {
            queue: self.queue.clone(),
            ids: guard.started.clone(),
        };
        let mut upload = transport.upload(&files, &reporter);
        let result = match abort.as_mut() {
            None => upload.await,
            Some(rx) => tokio::select! {
                result = &mut upload => result,
                _ = rx.wait_for(|aborted| *aborted) => return self.abort_run(&guard.started),
            },
        };

        match result {
            Ok(()) => {
                if await_transport {
                    let mut queue = self.queue.lock();
                    for id in &guard.started {
                        queue.mark_succeeded(*id);
                    }
                }
                log_success(format!("Uploaded {} file(s)", files.len()));
                RunOutcome::Completed {
                    uploaded: files.len(),
                }
            }
            Err(e) => {
                let message = e.to_string();
                log_error(format!("Upload failed: {}", message));
                let listener = {
                    let mut queue = self.queue.lock();
                    if await_transport {
                        for id in &guard.started {
                            queue.mark_failed(*id, &message);
                        }
                    }
                    queue.listener().clone()
                };
                listener.on_error(&message);
                RunOutcome::TransportFailed { message }
            }
        }
    }

    /// Wait one ramp step. Returns `true` if the run was aborted meanwhile.
    async fn tick(&self, abort: Option<&mut watch::Receiver<bool>>) -> bool {
        match abort {
            None => {
                tokio::time::sleep(self.options.tick).await;
                false
            }
            Some(rx) => tokio::select! {
                _ = tokio::time::sleep(self.options.tick) => false,
                _ = rx.wait_for(|aborted| *aborted) => true,
            },
        }
    }

    fn abort_run(&self, started: &[ItemId]) -> RunOutcome {
        let mut queue = self.queue.lock();
        let mut completed = 0;
        for id in started {
            queue.reset_to_pending(*id);
            if queue
                .get(*id)
                .is_some_and(|item| item.status == UploadStatus::Succeeded)
            {
                completed += 1;
            }
        }
        log_warning(format!("Upload aborted after {} file(s)", completed));
        RunOutcome::Aborted { completed }
    }
}

/// Routes transport progress to the run's items by position.
struct RunProgress {
    queue: SharedQueue,
    ids: Vec<ItemId>,
}

impl ProgressReporter for RunProgress {
    fn report(&self, file_index: usize, percent: u8) {
        if let Some(id) = self.ids.get(file_index) {
            self.queue.lock().advance_progress(*id, percent);
        }
    }
}
