//! Session-local `blob:` references.

use super::{BoxFuture, FileError, FileResult, ImageLoader, ImageSource};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

const BLOB_PREFIX: &str = "blob:stamp/";

/// Ephemeral image storage used when the host supplies no upload callback.
///
/// References are only meaningful inside the process that created them.
/// Cloning shares the same store.
#[derive(Clone, Default)]
pub struct BlobStore {
    blobs: Arc<RwLock<HashMap<String, Arc<Vec<u8>>>>>,
}

impl BlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `bytes` and return a fresh `blob:` reference for them.
    pub fn create(&self, bytes: Arc<Vec<u8>>) -> FileResult<String> {
        let reference = format!("{}{}", BLOB_PREFIX, Uuid::new_v4());
        let mut blobs = self
            .blobs
            .write()
            .map_err(|e| FileError::Other(format!("Lock error: {}", e)))?;
        blobs.insert(reference.clone(), bytes);
        Ok(reference)
    }

    pub fn get(&self, reference: &str) -> Option<Arc<Vec<u8>>> {
        self.blobs
            .read()
            .ok()
            .and_then(|blobs| blobs.get(reference).cloned())
    }

    /// Release a reference. Returns whether it was known.
    pub fn revoke(&self, reference: &str) -> bool {
        match self.blobs.write() {
            Ok(mut blobs) => blobs.remove(reference).is_some(),
            Err(e) => {
                log::warn!("Failed to revoke {}: {}", reference, e);
                false
            }
        }
    }

    /// Whether `reference` was minted by a blob store.
    pub fn is_blob_reference(reference: &str) -> bool {
        reference.starts_with(BLOB_PREFIX)
    }
}

impl ImageLoader for BlobStore {
    fn load(&self, source: &ImageSource) -> BoxFuture<'_, FileResult<Vec<u8>>> {
        let source = source.clone();
        Box::pin(async move {
            match source {
                ImageSource::Bytes(bytes) => Ok(bytes.as_ref().clone()),
                ImageSource::Url(url) if Self::is_blob_reference(&url) => self
                    .get(&url)
                    .map(|bytes| bytes.as_ref().clone())
                    .ok_or(FileError::NotFound(url)),
                ImageSource::Url(url) => Err(FileError::Unsupported(url)),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn test_create_get_revoke() {
        let store = BlobStore::new();
        let reference = store.create(Arc::new(vec![7, 8])).unwrap();
        assert!(BlobStore::is_blob_reference(&reference));
        assert_eq!(store.get(&reference).unwrap().as_slice(), &[7, 8]);

        assert!(store.revoke(&reference));
        assert!(store.get(&reference).is_none());
        assert!(!store.revoke(&reference));
    }

    #[test]
    fn test_clones_share_storage() {
        let store = BlobStore::new();
        let other = store.clone();
        let reference = store.create(Arc::new(vec![1])).unwrap();
        assert!(other.get(&reference).is_some());
    }

    #[test]
    fn test_load() {
        let store = BlobStore::new();
        let reference = store.create(Arc::new(vec![9])).unwrap();

        let bytes = block_on(store.load(&ImageSource::Url(reference))).unwrap();
        assert_eq!(bytes, vec![9]);

        let bytes = block_on(store.load(&ImageSource::Bytes(Arc::new(vec![3])))).unwrap();
        assert_eq!(bytes, vec![3]);

        let result = block_on(store.load(&ImageSource::Url("https://x/y.png".into())));
        assert!(matches!(result, Err(FileError::Unsupported(_))));
    }
}
