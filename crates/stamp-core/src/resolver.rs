//! Image reference resolution with a per-mount cache.
//!
//! Opaque references are downloaded through the host's [`FileManager`] at
//! most once per mount. Results that arrive after the owning component
//! has been unmounted are dropped.

use crate::files::{FileError, FileManager, FileResult, ImageRef, ImageSource};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Lifetime of a mounted component instance.
#[derive(Debug)]
pub struct Mount {
    active: Arc<AtomicBool>,
}

impl Mount {
    pub fn new() -> Self {
        Self {
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn token(&self) -> MountToken {
        MountToken {
            active: self.active.clone(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// End this mount. Every token handed out observes it.
    pub fn unmount(&self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

impl Default for Mount {
    fn default() -> Self {
        Self::new()
    }
}

/// Cheap handle observing whether a [`Mount`] is still live.
#[derive(Debug, Clone)]
pub struct MountToken {
    active: Arc<AtomicBool>,
}

impl MountToken {
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

/// Permission to download one reference, bound to the mount that issued it.
#[derive(Debug)]
pub struct DownloadTicket {
    reference: String,
    token: MountToken,
}

impl DownloadTicket {
    pub fn reference(&self) -> &str {
        &self.reference
    }
}

/// Outcome of asking the resolver for an image.
#[derive(Debug)]
pub enum ImageRequest {
    /// Placeholder: the shape has no image.
    Empty,
    /// Loadable now.
    Ready(ImageSource),
    /// First request for this reference: the caller must download it and
    /// hand the result back with [`ImageResolver::fulfil`].
    Download(DownloadTicket),
    /// A download is already outstanding.
    InFlight,
    /// The download failed earlier in this mount.
    Unavailable,
}

#[derive(Default)]
struct ResolverState {
    cache: HashMap<String, ImageSource>,
    in_flight: HashSet<String>,
    failed: HashSet<String>,
}

/// Per-instance image resolution cache.
pub struct ImageResolver {
    mount: Mutex<Mount>,
    state: Mutex<ResolverState>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ImageResolver {
    pub fn new() -> Self {
        Self {
            mount: Mutex::new(Mount::new()),
            state: Mutex::new(ResolverState::default()),
        }
    }

    pub fn is_mounted(&self) -> bool {
        lock(&self.mount).is_active()
    }

    /// Start a fresh mount if the previous one ended.
    pub fn remount(&self) {
        let mut mount = lock(&self.mount);
        if !mount.is_active() {
            *mount = Mount::new();
        }
    }

    pub fn request(&self, reference: &str) -> ImageRequest {
        match ImageRef::classify(reference) {
            ImageRef::Empty => ImageRequest::Empty,
            ImageRef::Direct(url) => ImageRequest::Ready(ImageSource::Url(url)),
            ImageRef::Opaque(reference) => {
                let token = lock(&self.mount).token();
                let mut state = lock(&self.state);
                if let Some(source) = state.cache.get(&reference) {
                    return ImageRequest::Ready(source.clone());
                }
                if state.failed.contains(&reference) {
                    return ImageRequest::Unavailable;
                }
                if !state.in_flight.insert(reference.clone()) {
                    return ImageRequest::InFlight;
                }
                ImageRequest::Download(DownloadTicket { reference, token })
            }
        }
    }

    /// Store a downloaded source. Returns `false` when the ticket's mount
    /// has ended and the result was discarded.
    pub fn fulfil(&self, ticket: DownloadTicket, source: ImageSource) -> bool {
        if !ticket.token.is_active() {
            log::debug!("Discarding late download of {}", ticket.reference);
            return false;
        }
        let mut state = lock(&self.state);
        state.in_flight.remove(&ticket.reference);
        state.cache.insert(ticket.reference, source);
        true
    }

    /// Record a failed download so it is not retried during this mount.
    pub fn fail(&self, ticket: DownloadTicket) {
        if !ticket.token.is_active() {
            return;
        }
        let mut state = lock(&self.state);
        state.in_flight.remove(&ticket.reference);
        state.failed.insert(ticket.reference);
    }

    pub fn cached(&self, reference: &str) -> Option<ImageSource> {
        lock(&self.state).cache.get(reference).cloned()
    }

    pub fn evict(&self, reference: &str) {
        let mut state = lock(&self.state);
        state.cache.remove(reference);
        state.failed.remove(reference);
    }

    /// Resolve a reference, downloading it through `files` when needed.
    ///
    /// `Ok(None)` means there is nothing to draw yet: the shape has no
    /// image, another request is already downloading it, or an earlier
    /// download failed.
    pub async fn resolve(
        &self,
        reference: &str,
        files: Option<&dyn FileManager>,
    ) -> FileResult<Option<ImageSource>> {
        let ticket = match self.request(reference) {
            ImageRequest::Ready(source) => return Ok(Some(source)),
            ImageRequest::Empty | ImageRequest::InFlight | ImageRequest::Unavailable => {
                return Ok(None);
            }
            ImageRequest::Download(ticket) => ticket,
        };
        let Some(files) = files else {
            self.fail(ticket);
            return Err(FileError::NoFileManager(reference.to_string()));
        };
        match files.download(reference).await {
            Ok(source) => {
                self.fulfil(ticket, source.clone());
                Ok(Some(source))
            }
            Err(e) => {
                self.fail(ticket);
                Err(e)
            }
        }
    }

    /// End the current mount and release the cache.
    pub fn unmount(&self) {
        lock(&self.mount).unmount();
        let mut state = lock(&self.state);
        state.cache.clear();
        state.in_flight.clear();
        state.failed.clear();
    }
}

impl Default for ImageResolver {
    fn default() -> Self {
        Self::new()
    }
}
