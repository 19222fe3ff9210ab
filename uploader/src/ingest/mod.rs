//! Ingestion of platform file lists.
//!
//! Drag-and-drop and the file picker both hand over an ordered list of
//! platform files. [`IngestionSurface`] turns either list into one batch of
//! [`CandidateFile`]s and submits it to the queue unchanged.

use std::path::{Path, PathBuf};

use crate::error::QueueResult;
use crate::logs::{log_info, log_warning};
use crate::models::{CandidateFile, FileContents, ItemId};
use crate::queue::SharedQueue;

/// One entry of a platform file list.
pub trait PlatformFile {
    fn name(&self) -> String;
    fn size(&self) -> u64;
    /// Empty when the platform does not know the type.
    fn mime_type(&self) -> String;
    fn contents(&self) -> FileContents;

    fn to_candidate(&self) -> CandidateFile {
        CandidateFile {
            name: self.name(),
            size: self.size(),
            mime_type: self.mime_type(),
            contents: self.contents(),
        }
    }
}

impl PlatformFile for CandidateFile {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn mime_type(&self) -> String {
        self.mime_type.clone()
    }

    fn contents(&self) -> FileContents {
        self.contents.clone()
    }

    fn to_candidate(&self) -> CandidateFile {
        self.clone()
    }
}

/// A regular file on the local filesystem.
#[derive(Debug, Clone)]
pub struct PathFile {
    path: PathBuf,
    size: u64,
}

impl PathFile {
    /// Read the file's metadata. Fails for missing paths and directories.
    pub fn open(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        let metadata = std::fs::metadata(&path)?;
        if !metadata.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }
        Ok(Self {
            path,
            size: metadata.len(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PlatformFile for PathFile {
    fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn mime_type(&self) -> String {
        guess_mime(&self.path).to_string()
    }

    fn contents(&self) -> FileContents {
        FileContents::Path(self.path.clone())
    }
}

/// MIME type from a file extension; empty for unknown extensions.
pub fn guess_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "pdf" => "application/pdf",
        "json" => "application/json",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "xml" => "application/xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "text/javascript",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "flac" => "audio/flac",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        _ => "",
    }
}

/// Unifies the drop and picker channels into one batch boundary.
#[derive(Clone)]
pub struct IngestionSurface {
    queue: SharedQueue,
    allow_multiple: bool,
}

impl IngestionSurface {
    pub fn new(queue: SharedQueue, allow_multiple: bool) -> Self {
        Self {
            queue,
            allow_multiple,
        }
    }

    /// Files dropped onto the drop zone.
    pub fn on_drop<F: PlatformFile>(&self, files: &[F]) -> QueueResult<Vec<ItemId>> {
        self.submit("drop", files)
    }

    /// Files chosen in the file picker.
    pub fn on_browse<F: PlatformFile>(&self, files: &[F]) -> QueueResult<Vec<ItemId>> {
        self.submit("picker", files)
    }

    fn submit<F: PlatformFile>(&self, source: &str, files: &[F]) -> QueueResult<Vec<ItemId>> {
        if files.is_empty() {
            return Ok(Vec::new());
        }

        let files = if !self.allow_multiple && files.len() > 1 {
            log_warning(format!(
                "Multiple files not allowed, keeping only \"{}\" of {}",
                files[0].name(),
                files.len()
            ));
            &files[..1]
        } else {
            files
        };

        log_info(format!("📥 {} file(s) from {}", files.len(), source));
        let batch: Vec<CandidateFile> = files.iter().map(PlatformFile::to_candidate).collect();
        self.queue.add_batch(batch)
    }

    /// Regular files directly inside `dir`, sorted by name.
    pub fn scan_dir(dir: &Path) -> std::io::Result<Vec<PathFile>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                files.push(PathFile::open(entry.path())?);
            }
        }
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::tests::RecordingListener;
    use crate::queue::UploadQueue;
    use crate::validation::ValidationPolicy;
    use std::sync::Arc;

    fn surface(accept: &[&str], allow_multiple: bool) -> (IngestionSurface, Arc<RecordingListener>) {
        let listener = Arc::new(RecordingListener::default());
        let policy = ValidationPolicy::new(accept, 1_000_000, 5).unwrap();
        let queue = SharedQueue::new(UploadQueue::with_listener(policy, listener.clone()));
        (IngestionSurface::new(queue, allow_multiple), listener)
    }

    #[test]
    fn test_drop_and_browse_feed_same_queue() {
        let (surface, listener) = surface(&[], true);
        surface
            .on_drop(&[CandidateFile::new("a.txt", 1, "text/plain")])
            .unwrap();
        surface
            .on_browse(&[
                CandidateFile::new("b.txt", 1, "text/plain"),
                CandidateFile::new("c.txt", 1, "text/plain"),
            ])
            .unwrap();

        let names: Vec<_> = surface
            .queue
            .snapshot()
            .into_iter()
            .map(|i| i.file.name)
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "c.txt"]);
        assert_eq!(listener.selection_count(), 2);
    }

    #[test]
    fn test_empty_list_is_ignored() {
        let (surface, listener) = surface(&[], true);
        let ids = surface.on_drop::<CandidateFile>(&[]).unwrap();
        assert!(ids.is_empty());
        assert_eq!(listener.selection_count(), 0);
        assert!(listener.errors().is_empty());
    }

    #[test]
    fn test_single_mode_keeps_first_file() {
        let (surface, _) = surface(&[], false);
        let ids = surface
            .on_browse(&[
                CandidateFile::new("first.txt", 1, "text/plain"),
                CandidateFile::new("second.txt", 1, "text/plain"),
            ])
            .unwrap();
        assert_eq!(ids.len(), 1);
        assert_eq!(surface.queue.snapshot()[0].file.name, "first.txt");
    }

    #[test]
    fn test_rejection_passes_through() {
        let (surface, listener) = surface(&["image/*"], true);
        let result = surface.on_drop(&[
            CandidateFile::new("photo.png", 10, "image/png"),
            CandidateFile::new("notes.txt", 10, "text/plain"),
        ]);
        assert!(result.is_err());
        assert!(surface.queue.is_empty());
        assert_eq!(listener.errors().len(), 1);
    }

    #[test]
    fn test_path_files_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.png"), [0u8; 4]).unwrap();
        std::fs::write(dir.path().join("a.pdf"), b"%PDF").unwrap();
        std::fs::write(dir.path().join("c.unknown"), b"").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let files = IngestionSurface::scan_dir(dir.path()).unwrap();
        let candidates: Vec<_> = files.iter().map(PlatformFile::to_candidate).collect();

        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].name, "a.pdf");
        assert_eq!(candidates[0].mime_type, "application/pdf");
        assert_eq!(candidates[0].size, 4);
        assert_eq!(candidates[1].mime_type, "image/png");
        assert_eq!(candidates[2].mime_type, "");
        assert!(matches!(candidates[2].contents, FileContents::Path(_)));
    }

    #[test]
    fn test_path_file_rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(PathFile::open(dir.path()).is_err());
        assert!(PathFile::open(dir.path().join("missing.txt")).is_err());
    }

    #[test]
    fn test_guess_mime_is_case_insensitive() {
        assert_eq!(guess_mime(Path::new("SCAN.JPEG")), "image/jpeg");
        assert_eq!(guess_mime(Path::new("Makefile")), "");
    }
}
