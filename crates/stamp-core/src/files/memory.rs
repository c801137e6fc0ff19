//! In-memory file manager.

use super::{BoxFuture, FileError, FileManager, FileResult, ImageSource, SelectedFile};
use crate::shapes::Shape;
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

/// In-memory file manager for testing and embedding.
///
/// Uploads are kept as bytes; downloads hand them back as
/// [`ImageSource::Bytes`].
#[derive(Default)]
pub struct MemoryFileManager {
    files: RwLock<HashMap<String, SelectedFile>>,
    downloads: AtomicUsize,
}

impl MemoryFileManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file under a known reference.
    pub fn insert(&self, reference: impl Into<String>, file: SelectedFile) -> FileResult<()> {
        let mut files = self
            .files
            .write()
            .map_err(|e| FileError::Other(format!("Lock error: {}", e)))?;
        files.insert(reference.into(), file);
        Ok(())
    }

    pub fn contains(&self, reference: &str) -> bool {
        self.files
            .read()
            .map(|files| files.contains_key(reference))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.files.read().map(|files| files.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of download calls served so far.
    pub fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

impl FileManager for MemoryFileManager {
    fn upload(&self, file: &SelectedFile, shape: &Shape) -> BoxFuture<'_, FileResult<String>> {
        let file = file.clone();
        let reference = format!("{}/{}", shape.id(), Uuid::new_v4());
        Box::pin(async move {
            self.insert(reference.clone(), file)?;
            Ok(reference)
        })
    }

    fn download(&self, reference: &str) -> BoxFuture<'_, FileResult<ImageSource>> {
        let reference = reference.to_string();
        Box::pin(async move {
            self.downloads.fetch_add(1, Ordering::SeqCst);
            let files = self
                .files
                .read()
                .map_err(|e| FileError::Other(format!("Lock error: {}", e)))?;
            files
                .get(&reference)
                .map(|file| ImageSource::Bytes(file.bytes.clone()))
                .ok_or(FileError::NotFound(reference))
        })
    }

    fn remove(&self, reference: &str) -> BoxFuture<'_, FileResult<()>> {
        let reference = reference.to_string();
        Box::pin(async move {
            let mut files = self
                .files
                .write()
                .map_err(|e| FileError::Other(format!("Lock error: {}", e)))?;
            files.remove(&reference);
            Ok(())
        })
    }
}
