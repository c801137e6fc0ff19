//! File-reference contract between the editor and its host.
//!
//! Image shapes never carry image bytes. They carry a reference string that
//! is either directly loadable (`https://…`, `blob:…`) or an opaque
//! identifier the host's [`FileManager`] knows how to upload, download and
//! remove.

mod blob;
mod memory;

#[cfg(not(target_arch = "wasm32"))]
mod directory;

pub use blob::BlobStore;
pub use memory::MemoryFileManager;

#[cfg(not(target_arch = "wasm32"))]
pub use directory::DirectoryFileManager;

use crate::shapes::Shape;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

/// File-reference errors.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("No file manager configured to download {0}")]
    NoFileManager(String),
    #[error("Unsupported image source: {0}")]
    Unsupported(String),
    #[error("Access denied: {0}")]
    Denied(String),
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("File error: {0}")]
    Other(String),
}

/// Result type for file operations.
pub type FileResult<T> = Result<T, FileError>;

/// Boxed future returned by the host callbacks.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A file picked by the user in a file editor.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedFile {
    pub name: String,
    /// Media type such as `image/png`.
    pub media_type: String,
    pub bytes: Arc<Vec<u8>>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes: Arc::new(bytes),
        }
    }
}

/// Something a renderer can load image bytes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    /// A URL (`https://`, `http://`, `blob:`, `data:`, `file://`).
    Url(String),
    /// Bytes already in memory.
    Bytes(Arc<Vec<u8>>),
}

impl ImageSource {
    pub fn url(&self) -> Option<&str> {
        match self {
            ImageSource::Url(url) => Some(url),
            ImageSource::Bytes(_) => None,
        }
    }
}

const DIRECT_SCHEMES: &[&str] = &["https://", "http://", "blob:", "data:", "file://"];

/// How an image reference must be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    /// No image: draw a placeholder.
    Empty,
    /// Loadable as-is.
    Direct(String),
    /// Host-managed identifier, resolved through [`FileManager::download`].
    Opaque(String),
}

impl ImageRef {
    pub fn classify(reference: &str) -> Self {
        if reference.is_empty() {
            ImageRef::Empty
        } else if DIRECT_SCHEMES.iter().any(|scheme| reference.starts_with(scheme)) {
            ImageRef::Direct(reference.to_string())
        } else {
            ImageRef::Opaque(reference.to_string())
        }
    }
}

/// Host-supplied file callbacks.
///
/// All three are optional for the host as a whole; a component that has
/// no manager falls back to session-local [`BlobStore`] references.
pub trait FileManager: Send + Sync {
    /// Persist `file` for `shape`, returning the reference to store on it.
    fn upload(&self, file: &SelectedFile, shape: &Shape) -> BoxFuture<'_, FileResult<String>>;

    /// Turn a stored reference into something loadable.
    fn download(&self, reference: &str) -> BoxFuture<'_, FileResult<ImageSource>>;

    /// Release a reference that is no longer used by any shape.
    fn remove(&self, reference: &str) -> BoxFuture<'_, FileResult<()>>;
}

/// Turns an [`ImageSource`] into encoded image bytes.
pub trait ImageLoader: Send + Sync {
    fn load(&self, source: &ImageSource) -> BoxFuture<'_, FileResult<Vec<u8>>>;
}
