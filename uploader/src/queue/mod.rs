//! Ordered upload queue with atomic batch admission.
//!
//! [`UploadQueue`] owns every mutation of the item list. User actions go
//! through [`UploadQueue::add_batch`] and [`UploadQueue::remove`]; status and
//! progress changes are reserved for the orchestrator.
//!
//! Listeners are called synchronously from inside the mutating call. When the
//! queue is wrapped in a [`SharedQueue`] the lock is held at that point, so a
//! listener must not call back into the same queue.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{join_reasons, QueueError, QueueResult};
use crate::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::models::{CandidateFile, ItemId, UploadItem, UploadStatus};
use crate::validation::{ValidationPolicy, Verdict};

/// Receives queue notifications.
///
/// All methods default to no-ops.
pub trait UploadListener: Send + Sync {
    /// Called with the full ordered item list after a committed add or remove.
    fn on_selection_changed(&self, _items: &[UploadItem]) {}

    /// Called with one message for a rejected batch or a failed transport.
    fn on_error(&self, _message: &str) {}

    /// Called after the orchestrator changes an item's status or progress.
    fn on_item_updated(&self, _item: &UploadItem) {}
}

/// Listener that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl UploadListener for NoopListener {}

pub struct UploadQueue {
    items: Vec<UploadItem>,
    policy: ValidationPolicy,
    listener: Arc<dyn UploadListener>,
}

impl UploadQueue {
    pub fn new(policy: ValidationPolicy) -> Self {
        Self::with_listener(policy, Arc::new(NoopListener))
    }

    pub fn with_listener(policy: ValidationPolicy, listener: Arc<dyn UploadListener>) -> Self {
        Self {
            items: Vec::new(),
            policy,
            listener,
        }
    }

    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    pub fn listener(&self) -> &Arc<dyn UploadListener> {
        &self.listener
    }

    /// Validate and append a batch, all or nothing.
    ///
    /// Returns the ids of the new items in submission order. On rejection the
    /// queue is untouched and `on_error` receives the joined reasons.
    pub fn add_batch(&mut self, candidates: Vec<CandidateFile>) -> QueueResult<Vec<ItemId>> {
        match self.policy.evaluate(&candidates, self.items.len()) {
            Verdict::Accepted => {
                let ids: Vec<ItemId> = candidates
                    .into_iter()
                    .map(|file| {
                        let item = UploadItem::pending(file);
                        let id = item.id;
                        self.items.push(item);
                        id
                    })
                    .collect();

                log_success(format!(
                    "Queued {} file(s) ({} in queue)",
                    ids.len(),
                    self.items.len()
                ));
                self.listener.on_selection_changed(&self.items);
                Ok(ids)
            }
            Verdict::Rejected(reasons) => {
                log_warning(format!("Rejected batch of {} file(s)", candidates.len()));
                for reason in &reasons {
                    log_info_indent(reason.to_string(), 1);
                }
                self.listener.on_error(&join_reasons(&reasons));
                Err(QueueError::Rejected(reasons))
            }
        }
    }

    /// Remove an item unless it is uploading.
    pub fn remove(&mut self, id: ItemId) -> QueueResult<UploadItem> {
        let index = self
            .items
            .iter()
            .position(|item| item.id == id)
            .ok_or(QueueError::NotFound(id))?;

        if !self.items[index].is_removable() {
            log_warning(format!(
                "Cannot remove \"{}\" while it is uploading",
                self.items[index].file.name
            ));
            return Err(QueueError::Refused { id });
        }

        let removed = self.items.remove(index);
        log_info(format!("Removed \"{}\"", removed.file.name));
        self.listener.on_selection_changed(&self.items);
        Ok(removed)
    }

    /// Copy of the ordered item list.
    pub fn snapshot(&self) -> Vec<UploadItem> {
        self.items.clone()
    }

    pub fn items(&self) -> &[UploadItem] {
        &self.items
    }

    pub fn get(&self, id: ItemId) -> Option<&UploadItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Ids of pending items, in queue order.
    pub fn pending_ids(&self) -> Vec<ItemId> {
        self.items
            .iter()
            .filter(|item| item.status == UploadStatus::Pending)
            .map(|item| item.id)
            .collect()
    }

    // -------------------------------------------------------------------------
    // Orchestrator transitions
    // -------------------------------------------------------------------------

    /// Pending -> Uploading. Returns the file, or `None` if the item is gone
    /// or no longer pending.
    pub(crate) fn mark_uploading(&mut self, id: ItemId) -> Option<CandidateFile> {
        self.transition(id, |item| {
            if item.status != UploadStatus::Pending {
                return false;
            }
            item.status = UploadStatus::Uploading;
            item.progress = 0;
            item.error = None;
            true
        })
        .map(|item| item.file)
    }

    /// Raise the progress of an uploading item. Lower values are ignored.
    pub(crate) fn advance_progress(&mut self, id: ItemId, percent: u8) -> bool {
        let percent = percent.min(100);
        self.transition(id, |item| {
            if item.status != UploadStatus::Uploading || percent <= item.progress {
                return false;
            }
            item.progress = percent;
            true
        })
        .is_some()
    }

    /// Uploading -> Succeeded at 100 %.
    pub(crate) fn mark_succeeded(&mut self, id: ItemId) -> bool {
        self.transition(id, |item| {
            if item.status != UploadStatus::Uploading {
                return false;
            }
            item.status = UploadStatus::Succeeded;
            item.progress = 100;
            true
        })
        .is_some()
    }

    /// Uploading -> Failed with a message.
    pub(crate) fn mark_failed(&mut self, id: ItemId, message: &str) -> bool {
        self.transition(id, |item| {
            if item.status != UploadStatus::Uploading {
                return false;
            }
            item.status = UploadStatus::Failed;
            item.error = Some(message.to_string());
            true
        })
        .is_some()
    }

    /// Uploading -> Pending, progress cleared. Used when a run is aborted.
    pub(crate) fn reset_to_pending(&mut self, id: ItemId) -> bool {
        self.transition(id, |item| {
            if item.status != UploadStatus::Uploading {
                return false;
            }
            item.status = UploadStatus::Pending;
            item.progress = 0;
            true
        })
        .is_some()
    }

    fn transition<F>(&mut self, id: ItemId, apply: F) -> Option<UploadItem>
    where
        F: FnOnce(&mut UploadItem) -> bool,
    {
        let item = self.items.iter_mut().find(|item| item.id == id)?;
        if !apply(item) {
            return None;
        }
        let updated = item.clone();
        self.listener.on_item_updated(&updated);
        Some(updated)
    }
}

/// Cloneable handle to a queue shared by ingestion, orchestrator and callers.
#[derive(Clone)]
pub struct SharedQueue {
    inner: Arc<Mutex<UploadQueue>>,
}

impl SharedQueue {
    pub fn new(queue: UploadQueue) -> Self {
        Self {
            inner: Arc::new(Mutex::new(queue)),
        }
    }

    /// Lock the queue. A poisoned lock is recovered; every mutation leaves the
    /// item list consistent before any listener runs.
    pub fn lock(&self) -> MutexGuard<'_, UploadQueue> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_batch(&self, candidates: Vec<CandidateFile>) -> QueueResult<Vec<ItemId>> {
        self.lock().add_batch(candidates)
    }

    pub fn remove(&self, id: ItemId) -> QueueResult<UploadItem> {
        self.lock().remove(id)
    }

    pub fn snapshot(&self) -> Vec<UploadItem> {
        self.lock().snapshot()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl From<UploadQueue> for SharedQueue {
    fn from(queue: UploadQueue) -> Self {
        Self::new(queue)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Records every callback for assertions.
    #[derive(Default)]
    pub(crate) struct RecordingListener {
        pub selections: Mutex<Vec<Vec<UploadItem>>>,
        pub errors: Mutex<Vec<String>>,
        pub updates: Mutex<Vec<(ItemId, UploadStatus, u8)>>,
    }

    impl RecordingListener {
        pub fn selection_count(&self) -> usize {
            self.selections.lock().unwrap().len()
        }

        pub fn errors(&self) -> Vec<String> {
            self.errors.lock().unwrap().clone()
        }

        pub fn updates(&self) -> Vec<(ItemId, UploadStatus, u8)> {
            self.updates.lock().unwrap().clone()
        }
    }

    impl UploadListener for RecordingListener {
        fn on_selection_changed(&self, items: &[UploadItem]) {
            self.selections.lock().unwrap().push(items.to_vec());
        }

        fn on_error(&self, message: &str) {
            self.errors.lock().unwrap().push(message.to_string());
        }

        fn on_item_updated(&self, item: &UploadItem) {
            self.updates
                .lock()
                .unwrap()
                .push((item.id, item.status, item.progress));
        }
    }

    pub(crate) fn pdf(name: &str, size: u64) -> CandidateFile {
        CandidateFile::new(name, size, "application/pdf")
    }

    fn queue(accept: &[&str], max_size: u64, max_count: usize) -> (UploadQueue, Arc<RecordingListener>) {
        let listener = Arc::new(RecordingListener::default());
        let policy = ValidationPolicy::new(accept, max_size, max_count).unwrap();
        (UploadQueue::with_listener(policy, listener.clone()), listener)
    }

    #[test]
    fn test_valid_batch_appends_pending_items_in_order() {
        let (mut q, listener) = queue(&[".pdf"], 1000, 5);
        let ids = q
            .add_batch(vec![pdf("a.pdf", 1), pdf("b.pdf", 2), pdf("c.pdf", 3)])
            .unwrap();

        assert_eq!(ids.len(), 3);
        assert_eq!(q.len(), 3);
        let names: Vec<_> = q.items().iter().map(|i| i.file.name.as_str()).collect();
        assert_eq!(names, vec!["a.pdf", "b.pdf", "c.pdf"]);
        assert!(q
            .items()
            .iter()
            .all(|i| i.status == UploadStatus::Pending && i.progress == 0));
        assert_eq!(listener.selection_count(), 1);
        assert!(listener.errors().is_empty());
    }

    #[test]
    fn test_batch_with_invalid_middle_file_adds_nothing() {
        let (mut q, listener) = queue(&[".pdf"], 1000, 5);
        q.add_batch(vec![pdf("first.pdf", 1)]).unwrap();
        let before: Vec<_> = q.items().iter().map(|i| i.id).collect();

        let result = q.add_batch(vec![
            pdf("a.pdf", 1),
            CandidateFile::new("b.exe", 1, "application/octet-stream"),
            pdf("c.pdf", 1),
        ]);

        assert!(matches!(result, Err(QueueError::Rejected(_))));
        let after: Vec<_> = q.items().iter().map(|i| i.id).collect();
        assert_eq!(before, after);
        assert_eq!(listener.selection_count(), 1);
        assert_eq!(listener.errors().len(), 1);
        assert!(listener.errors()[0].contains("b.exe"));
    }

    #[test]
    fn test_scenario_a_rejection_reports_once() {
        let (mut q, listener) = queue(&[".pdf"], 5_000_000, 5);
        let result = q.add_batch(vec![pdf("report.pdf", 4_000_000), pdf("archive.pdf", 6_000_000)]);

        assert!(result.is_err());
        assert!(q.is_empty());
        let errors = listener.errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("archive.pdf"));
        assert!(errors[0].contains("4.77 MB"));
        assert!(!errors[0].contains("report.pdf"));
        assert_eq!(listener.selection_count(), 0);
    }

    #[test]
    fn test_scenario_b_mixed_types_rejected() {
        let (mut q, listener) = queue(&["image/*"], 10_000, 5);
        let result = q.add_batch(vec![
            CandidateFile::new("photo.png", 100, "image/png"),
            CandidateFile::new("notes.txt", 100, "text/plain"),
        ]);
        assert!(result.is_err());
        assert!(q.is_empty());
        assert_eq!(listener.errors().len(), 1);
    }

    #[test]
    fn test_count_limit_counts_existing_items() {
        let (mut q, listener) = queue(&[], 1000, 3);
        q.add_batch(vec![pdf("a.pdf", 1), pdf("b.pdf", 1)]).unwrap();

        let err = q.add_batch(vec![pdf("c.pdf", 1), pdf("d.pdf", 1)]).unwrap_err();
        assert_eq!(err.reasons()[0].code(), "too_many_files");
        assert_eq!(q.len(), 2);

        q.add_batch(vec![pdf("c.pdf", 1)]).unwrap();
        assert_eq!(q.len(), 3);
        assert_eq!(listener.selection_count(), 2);
    }

    #[test]
    fn test_remove_pending_item() {
        let (mut q, listener) = queue(&[], 1000, 5);
        let ids = q.add_batch(vec![pdf("a.pdf", 1), pdf("b.pdf", 1)]).unwrap();

        let removed = q.remove(ids[0]).unwrap();
        assert_eq!(removed.file.name, "a.pdf");
        assert_eq!(q.len(), 1);
        assert_eq!(listener.selection_count(), 2);
        let last = listener.selections.lock().unwrap().last().cloned().unwrap();
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].file.name, "b.pdf");
    }

    #[test]
    fn test_remove_uploading_item_is_refused() {
        let (mut q, listener) = queue(&[], 1000, 5);
        let ids = q.add_batch(vec![pdf("a.pdf", 1)]).unwrap();
        q.mark_uploading(ids[0]).unwrap();

        assert!(matches!(q.remove(ids[0]), Err(QueueError::Refused { id }) if id == ids[0]));
        assert_eq!(q.len(), 1);
        assert_eq!(listener.selection_count(), 1);
    }

    #[test]
    fn test_remove_finished_items() {
        let (mut q, _) = queue(&[], 1000, 5);
        let ids = q.add_batch(vec![pdf("a.pdf", 1), pdf("b.pdf", 1)]).unwrap();
        for id in &ids {
            q.mark_uploading(*id).unwrap();
        }
        q.mark_succeeded(ids[0]);
        q.mark_failed(ids[1], "boom");

        assert!(q.remove(ids[0]).is_ok());
        assert!(q.remove(ids[1]).is_ok());
        assert!(q.is_empty());
    }

    #[test]
    fn test_remove_unknown_id() {
        let (mut q, listener) = queue(&[], 1000, 5);
        let id = ItemId::new();
        assert!(matches!(q.remove(id), Err(QueueError::NotFound(missing)) if missing == id));
        assert_eq!(listener.selection_count(), 0);
    }

    #[test]
    fn test_progress_is_monotonic_while_uploading() {
        let (mut q, listener) = queue(&[], 1000, 5);
        let id = q.add_batch(vec![pdf("a.pdf", 1)]).unwrap()[0];

        assert!(!q.advance_progress(id, 10), "pending items do not move");
        q.mark_uploading(id).unwrap();
        assert!(q.advance_progress(id, 30));
        assert!(!q.advance_progress(id, 20));
        assert!(q.advance_progress(id, 250));
        assert_eq!(q.get(id).unwrap().progress, 100);

        let progress: Vec<u8> = listener.updates().iter().map(|u| u.2).collect();
        assert_eq!(progress, vec![0, 30, 100]);
    }

    #[test]
    fn test_reset_to_pending_clears_progress() {
        let (mut q, _) = queue(&[], 1000, 5);
        let id = q.add_batch(vec![pdf("a.pdf", 1)]).unwrap()[0];
        q.mark_uploading(id).unwrap();
        q.advance_progress(id, 40);

        assert!(q.reset_to_pending(id));
        let item = q.get(id).unwrap();
        assert_eq!(item.status, UploadStatus::Pending);
        assert_eq!(item.progress, 0);
        assert_eq!(q.pending_ids(), vec![id]);
    }

    #[test]
    fn test_shared_queue_delegates() {
        let (q, listener) = queue(&[], 1000, 5);
        let shared = SharedQueue::from(q);
        let other = shared.clone();

        let ids = shared.add_batch(vec![pdf("a.pdf", 1)]).unwrap();
        assert_eq!(other.len(), 1);
        other.remove(ids[0]).unwrap();
        assert!(shared.is_empty());
        assert!(shared.snapshot().is_empty());
        assert_eq!(listener.selection_count(), 2);
    }
}
