//! Image source chooser.

use crate::files::{BlobStore, FileError, FileManager, SelectedFile};
use crate::shapes::Shape;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileEditorError {
    #[error("Upload failed: {0}")]
    Upload(#[from] FileError),
}

/// Result of choosing a file.
#[derive(Debug, Clone, PartialEq)]
pub enum FileEditOutcome {
    /// The file's type is not allowed. Nothing changed.
    Rejected { alert: String },
    /// The shape's new image reference. Empty clears the image.
    Accepted { reference: String },
}

/// Picks the file behind an image shape.
///
/// Accepted files are uploaded through the host's [`FileManager`] when one
/// is configured, otherwise kept as session-local blob references. Once the
/// caller knows whether the edit was applied, [`FileEditor::finish`]
/// releases whichever reference is no longer used.
pub struct FileEditor {
    accept: Vec<String>,
    files: Option<Arc<dyn FileManager>>,
    blobs: BlobStore,
}

impl FileEditor {
    pub fn new(accept: Vec<String>) -> Self {
        Self {
            accept,
            files: None,
            blobs: BlobStore::new(),
        }
    }

    pub fn with_file_manager(mut self, files: Arc<dyn FileManager>) -> Self {
        self.files = Some(files);
        self
    }

    /// Share a blob store, e.g. with the loader that renders the canvas.
    pub fn with_blob_store(mut self, blobs: BlobStore) -> Self {
        self.blobs = blobs;
        self
    }

    pub fn blob_store(&self) -> &BlobStore {
        &self.blobs
    }

    /// Whether `media_type` matches the allow-list. `type/*` entries match
    /// any subtype; an empty list accepts everything.
    pub fn accepts(&self, media_type: &str) -> bool {
        if self.accept.is_empty() {
            return true;
        }
        let media_type = media_type.trim().to_ascii_lowercase();
        self.accept.iter().any(|pattern| {
            let pattern = pattern.trim().to_ascii_lowercase();
            match pattern.strip_suffix("/*") {
                Some(family) => media_type
                    .split_once('/')
                    .is_some_and(|(kind, _)| kind == family),
                None => pattern == media_type,
            }
        })
    }

    /// Handle the user's choice for `shape`.
    ///
    /// `None` clears the image. Nothing is released here; see
    /// [`FileEditor::finish`].
    pub async fn choose(
        &self,
        file: Option<&SelectedFile>,
        shape: &Shape,
    ) -> Result<FileEditOutcome, FileEditorError> {
        let reference = match file {
            None => String::new(),
            Some(file) if !self.accepts(&file.media_type) => {
                log::info!("Rejected {} ({})", file.name, file.media_type);
                return Ok(FileEditOutcome::Rejected {
                    alert: format!(
                        "{} is not a supported file type. Allowed: {}",
                        file.name,
                        self.accept.join(", ")
                    ),
                });
            }
            Some(file) => match &self.files {
                Some(files) => files.upload(file, shape).await?,
                None => self.blobs.create(file.bytes.clone())?,
            },
        };

        Ok(FileEditOutcome::Accepted { reference })
    }

    /// Release the reference an accepted choice left unused: `previous`
    /// when the edit was applied, the new `reference` when it was not.
    pub async fn finish(&self, previous: Option<&str>, reference: &str, applied: bool) {
        let (unused, kept) = if applied {
            (previous, reference)
        } else {
            (Some(reference), previous.unwrap_or_default())
        };
        if let Some(unused) = unused.filter(|u| !u.is_empty() && *u != kept) {
            self.release(unused).await;
        }
    }

    async fn release(&self, reference: &str) {
        if BlobStore::is_blob_reference(reference) {
            self.blobs.revoke(reference);
            return;
        }
        if let Some(files) = &self.files {
            if let Err(e) = files.remove(reference).await {
                log::warn!("Failed to remove previous image {}: {}", reference, e);
            }
        }
    }
}

impl Default for FileEditor {
    fn default() -> Self {
        Self::new(vec!["image/*".to_string()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::{BoxFuture, FileResult, ImageSource, MemoryFileManager};
    use crate::shapes::ImageShape;
    use futures::executor::block_on;
    use kurbo::Point;
    use std::sync::Mutex;

    fn image_shape() -> Shape {
        Shape::Image(ImageShape::new(Point::ZERO))
    }

    fn png() -> SelectedFile {
        SelectedFile::new("logo.png", "image/png", vec![1, 2, 3])
    }

    /// Records the order of host callbacks.
    #[derive(Default)]
    struct RecordingFiles {
        calls: Mutex<Vec<String>>,
    }

    impl FileManager for RecordingFiles {
        fn upload(&self, file: &SelectedFile, _shape: &Shape) -> BoxFuture<'_, FileResult<String>> {
            let name = file.name.clone();
            Box::pin(async move {
                self.calls.lock().unwrap().push(format!("upload {name}"));
                Ok(format!("stored/{name}"))
            })
        }

        fn download(&self, reference: &str) -> BoxFuture<'_, FileResult<ImageSource>> {
            let reference = reference.to_string();
            Box::pin(async move { Err(FileError::NotFound(reference)) })
        }

        fn remove(&self, reference: &str) -> BoxFuture<'_, FileResult<()>> {
            let reference = reference.to_string();
            Box::pin(async move {
                self.calls.lock().unwrap().push(format!("remove {reference}"));
                Ok(())
            })
        }
    }

    #[test]
    fn test_accepts() {
        let editor = FileEditor::new(vec!["image/*".into(), "application/pdf".into()]);
        assert!(editor.accepts("image/png"));
        assert!(editor.accepts("IMAGE/JPEG"));
        assert!(editor.accepts("application/pdf"));
        assert!(!editor.accepts("text/plain"));
        assert!(!editor.accepts("imagepng"));
        assert!(FileEditor::new(Vec::new()).accepts("text/plain"));
    }

    #[test]
    fn test_rejected_type_changes_nothing() {
        let files = Arc::new(RecordingFiles::default());
        let editor = FileEditor::default().with_file_manager(files.clone());
        let text = SelectedFile::new("notes.txt", "text/plain", vec![0]);

        let outcome = block_on(editor.choose(Some(&text), &image_shape())).unwrap();
        match outcome {
            FileEditOutcome::Rejected { alert } => assert!(alert.contains("notes.txt")),
            other => panic!("unexpected {other:?}"),
        }
        assert!(files.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_upload_then_release_previous() {
        let files = Arc::new(RecordingFiles::default());
        let editor = FileEditor::default().with_file_manager(files.clone());

        let outcome = block_on(editor.choose(Some(&png()), &image_shape())).unwrap();
        assert_eq!(
            outcome,
            FileEditOutcome::Accepted {
                reference: "stored/logo.png".into()
            }
        );
        assert_eq!(*files.calls.lock().unwrap(), vec!["upload logo.png".to_string()]);

        block_on(editor.finish(Some("old"), "stored/logo.png", true));
        assert_eq!(
            *files.calls.lock().unwrap(),
            vec!["upload logo.png".to_string(), "remove old".to_string()]
        );
    }

    #[test]
    fn test_unapplied_upload_is_released() {
        let files = Arc::new(RecordingFiles::default());
        let editor = FileEditor::default().with_file_manager(files.clone());

        block_on(editor.choose(Some(&png()), &image_shape())).unwrap();
        block_on(editor.finish(Some("old"), "stored/logo.png", false));
        assert_eq!(
            *files.calls.lock().unwrap(),
            vec![
                "upload logo.png".to_string(),
                "remove stored/logo.png".to_string()
            ]
        );
    }

    #[test]
    fn test_finish_keeps_unchanged_reference() {
        let files = Arc::new(RecordingFiles::default());
        let editor = FileEditor::default().with_file_manager(files.clone());
        block_on(editor.finish(Some("same"), "same", true));
        block_on(editor.finish(Some("old"), "", false));
        assert!(files.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_blob_fallback_revokes_previous_blob() {
        let editor = FileEditor::default();
        let first = match block_on(editor.choose(Some(&png()), &image_shape())).unwrap() {
            FileEditOutcome::Accepted { reference } => reference,
            other => panic!("unexpected {other:?}"),
        };
        assert!(BlobStore::is_blob_reference(&first));
        assert!(editor.blob_store().get(&first).is_some());

        let second = match block_on(editor.choose(Some(&png()), &image_shape())).unwrap() {
            FileEditOutcome::Accepted { reference } => reference,
            other => panic!("unexpected {other:?}"),
        };
        assert_ne!(first, second);
        block_on(editor.finish(Some(first.as_str()), &second, true));
        assert!(editor.blob_store().get(&first).is_none());
        assert!(editor.blob_store().get(&second).is_some());
    }

    #[test]
    fn test_clearing_releases_previous() {
        let files = Arc::new(MemoryFileManager::new());
        files.insert("old", png()).unwrap();
        let editor = FileEditor::default().with_file_manager(files.clone());

        let outcome = block_on(editor.choose(None, &image_shape())).unwrap();
        assert_eq!(
            outcome,
            FileEditOutcome::Accepted {
                reference: String::new()
            }
        );
        assert!(files.contains("old"));
        block_on(editor.finish(Some("old"), "", true));
        assert!(!files.contains("old"));
    }
}
