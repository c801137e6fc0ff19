//! Read-only stamp viewer and its readiness protocol.
//!
//! The viewer is what the export pipeline drives: it resolves and loads
//! every image, reports when they have all settled, and hands the canvas to
//! a renderer.

use crate::canvas::CanvasData;
use crate::files::{FileManager, ImageLoader};
use crate::resolver::ImageResolver;
use crate::shapes::ShapeId;
use crate::widget::TransformableShape;
use futures::future::join_all;
use kurbo::Size;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

/// Extra wait after the last image finished loading, for anything the
/// renderer still has pending. Best-effort.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerConfig {
    pub settle_delay: Duration,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

/// Counts image shapes that have finished loading.
///
/// Completions are keyed by shape id so a shape reported twice is counted
/// once. Readiness is signalled exactly once.
#[derive(Debug, Clone)]
pub struct ReadinessTracker {
    expected: HashSet<ShapeId>,
    completed: HashSet<ShapeId>,
    signalled: bool,
}

impl ReadinessTracker {
    pub fn new(canvas: &CanvasData) -> Self {
        Self {
            expected: canvas.image_shapes().map(|s| s.id().clone()).collect(),
            completed: HashSet::new(),
            signalled: false,
        }
    }

    pub fn expected(&self) -> usize {
        self.expected.len()
    }

    pub fn completed(&self) -> usize {
        self.completed.len()
    }

    pub fn is_complete(&self) -> bool {
        self.completed.len() >= self.expected.len()
    }

    /// Returns `true` the first time the tracker is found complete. With
    /// no image shapes this is the first call.
    pub fn take_ready(&mut self) -> bool {
        if self.signalled || !self.is_complete() {
            return false;
        }
        self.signalled = true;
        true
    }

    /// Record that the image of `id` finished (loaded or failed).
    /// Returns `true` when this completes the set.
    pub fn record(&mut self, id: &ShapeId) -> bool {
        if !self.expected.contains(id) {
            log::debug!("Ignoring completion for unexpected shape {}", id);
            return false;
        }
        self.completed.insert(id.clone());
        self.take_ready()
    }
}

/// Images loaded for a render, keyed by image reference.
#[derive(Debug, Clone, Default)]
pub struct Preloaded {
    pub images: HashMap<String, Arc<Vec<u8>>>,
    /// References that could not be resolved or loaded.
    pub failed: Vec<String>,
    pub settle_delay: Duration,
}

/// Read-only view of a stamp.
pub struct StampViewer {
    canvas: CanvasData,
    config: ViewerConfig,
    resolver: ImageResolver,
}

impl StampViewer {
    pub fn new(canvas: CanvasData, config: ViewerConfig) -> Self {
        Self {
            canvas,
            config,
            resolver: ImageResolver::new(),
        }
    }

    pub fn canvas(&self) -> &CanvasData {
        &self.canvas
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    /// Shapes as displayed: nothing is draggable or selected.
    pub fn shapes(&self) -> Vec<TransformableShape> {
        self.canvas
            .shapes
            .iter()
            .map(|shape| {
                let mut shape = shape.clone();
                shape.base_mut().draggable = false;
                TransformableShape::new(shape, false)
            })
            .collect()
    }

    /// The render target, or `None` when the canvas has no usable size.
    pub fn surface(&self) -> Option<Size> {
        let size = self.canvas.size()?;
        (size.width >= 1.0 && size.height >= 1.0).then_some(size)
    }

    pub fn tracker(&self) -> ReadinessTracker {
        ReadinessTracker::new(&self.canvas)
    }

    /// Resolve and load every image concurrently.
    ///
    /// Each distinct reference is fetched once. Shapes with no image, or
    /// whose image fails, still count as finished so readiness cannot
    /// hang on them. `on_ready` runs exactly once, when the tracker reports
    /// that the last image has settled.
    pub async fn preload<F>(
        &self,
        files: Option<&dyn FileManager>,
        loader: &dyn ImageLoader,
        on_ready: F,
    ) -> Preloaded
    where
        F: FnOnce() + Send,
    {
        let mut on_ready = Some(on_ready);
        let mut signal = |ready: bool| {
            if ready {
                if let Some(on_ready) = on_ready.take() {
                    on_ready();
                }
            }
        };

        let mut tracker = self.tracker();
        let mut by_reference: HashMap<&str, Vec<&ShapeId>> = HashMap::new();
        for shape in self.canvas.image_shapes() {
            match shape.image_reference() {
                Some(reference) => by_reference.entry(reference).or_default().push(shape.id()),
                None => signal(tracker.record(shape.id())),
            }
        }
        signal(tracker.take_ready());

        let loads = by_reference.keys().map(|&reference| async move {
            let result = match self.resolver.resolve(reference, files).await {
                Ok(Some(source)) => loader.load(&source).await.map(Some),
                Ok(None) => Ok(None),
                Err(e) => Err(e),
            };
            (reference, result)
        });

        let mut preloaded = Preloaded {
            settle_delay: self.config.settle_delay,
            ..Preloaded::default()
        };
        for (reference, result) in join_all(loads).await {
            match result {
                Ok(Some(bytes)) => {
                    preloaded
                        .images
                        .insert(reference.to_string(), Arc::new(bytes));
                }
                Ok(None) => preloaded.failed.push(reference.to_string()),
                Err(e) => {
                    log::warn!("Failed to load image {}: {}", reference, e);
                    preloaded.failed.push(reference.to_string());
                }
            }
            for id in by_reference.get(reference).into_iter().flatten() {
                signal(tracker.record(id));
            }
        }

        log::debug!(
            "{}/{} images settled, {} failed",
            tracker.completed(),
            tracker.expected(),
            preloaded.failed.len()
        );
        preloaded
    }

    pub fn unmount(&self) {
        self.resolver.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::{
        BlobStore, BoxFuture, FileError, FileResult, ImageSource, MemoryFileManager, SelectedFile,
    };
    use crate::shapes::{BasicShape, ImageShape, Shape};
    use futures::executor::block_on;
    use kurbo::Point;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn image(reference: &str) -> Shape {
        let mut image = ImageShape::new(Point::ZERO);
        image.image = reference.to_string();
        Shape::Image(image)
    }

    struct CountingLoader {
        loads: AtomicUsize,
    }

    impl ImageLoader for CountingLoader {
        fn load(&self, source: &ImageSource) -> BoxFuture<'_, FileResult<Vec<u8>>> {
            let source = source.clone();
            Box::pin(async move {
                self.loads.fetch_add(1, Ordering::SeqCst);
                match source {
                    ImageSource::Bytes(bytes) => Ok(bytes.as_ref().clone()),
                    ImageSource::Url(url) => Err(FileError::Unsupported(url)),
                }
            })
        }
    }

    #[test]
    fn test_tracker_with_no_images_is_ready_immediately() {
        let canvas = CanvasData::with_dimensions(10.0, 10.0)
            .with_shape_appended(Shape::Rect(BasicShape::new(Point::ZERO)));
        let mut tracker = ReadinessTracker::new(&canvas);
        assert!(tracker.take_ready());
        assert!(!tracker.take_ready());
    }

    #[test]
    fn test_tracker_counts_distinct_shapes_once() {
        let a = image("ref-a");
        let b = image("ref-b");
        let canvas = CanvasData::with_dimensions(10.0, 10.0)
            .with_shape_appended(a.clone())
            .with_shape_appended(b.clone());
        let mut tracker = ReadinessTracker::new(&canvas);
        assert!(!tracker.take_ready());

        assert!(!tracker.record(a.id()));
        assert!(!tracker.record(a.id()));
        assert_eq!(tracker.completed(), 1);
        assert!(tracker.record(b.id()));
        assert!(!tracker.record(b.id()));
        assert!(!tracker.record(&ShapeId::from("stranger")));
    }

    #[test]
    fn test_surface() {
        let viewer = StampViewer::new(CanvasData::default(), ViewerConfig::default());
        assert!(viewer.surface().is_none());

        let viewer = StampViewer::new(
            CanvasData::with_dimensions(0.5, 100.0),
            ViewerConfig::default(),
        );
        assert!(viewer.surface().is_none());

        let viewer = StampViewer::new(
            CanvasData::with_dimensions(200.0, 100.0),
            ViewerConfig::default(),
        );
        assert_eq!(viewer.surface(), Some(Size::new(200.0, 100.0)));
    }

    #[test]
    fn test_shapes_are_read_only() {
        let canvas = CanvasData::with_dimensions(10.0, 10.0)
            .with_shape_appended(Shape::Rect(BasicShape::new(Point::ZERO)));
        let viewer = StampViewer::new(canvas, ViewerConfig::default());
        let shapes = viewer.shapes();
        assert!(!shapes[0].is_draggable());
        assert!(!shapes[0].is_selected());
        assert!(viewer.canvas().shapes[0].base().draggable);
    }

    #[test]
    fn test_preload_dedupes_and_tolerates_failures() {
        let files = MemoryFileManager::new();
        files
            .insert("ref-a", SelectedFile::new("a.png", "image/png", vec![1, 2]))
            .unwrap();
        let canvas = CanvasData::with_dimensions(10.0, 10.0)
            .with_shape_appended(image("ref-a"))
            .with_shape_appended(image("ref-a"))
            .with_shape_appended(image(""))
            .with_shape_appended(image("ref-missing"));
        let viewer = StampViewer::new(
            canvas,
            ViewerConfig {
                settle_delay: Duration::from_millis(5),
            },
        );
        let loader = CountingLoader {
            loads: AtomicUsize::new(0),
        };

        let preloaded = block_on(viewer.preload(Some(&files), &loader, || {}));
        assert_eq!(preloaded.images.get("ref-a").unwrap().as_slice(), &[1, 2]);
        assert_eq!(preloaded.failed, vec!["ref-missing".to_string()]);
        assert_eq!(preloaded.settle_delay, Duration::from_millis(5));
        assert_eq!(files.download_count(), 2);
        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_preload_blob_images() {
        let blobs = BlobStore::new();
        let reference = blobs.create(Arc::new(vec![4])).unwrap();
        let canvas = CanvasData::with_dimensions(10.0, 10.0).with_shape_appended(image(&reference));
        let viewer = StampViewer::new(canvas, ViewerConfig::default());

        let preloaded = block_on(viewer.preload(None, &blobs, || {}));
        assert_eq!(preloaded.images.get(&reference).unwrap().as_slice(), &[4]);
        assert!(preloaded.failed.is_empty());
    }

    #[test]
    fn test_ready_fires_once_after_last_image() {
        let files = MemoryFileManager::new();
        files
            .insert("ref-a", SelectedFile::new("a.png", "image/png", vec![1]))
            .unwrap();
        let canvas = CanvasData::with_dimensions(10.0, 10.0)
            .with_shape_appended(image("ref-a"))
            .with_shape_appended(image("ref-a"))
            .with_shape_appended(image("ref-missing"))
            .with_shape_appended(image(""));
        let viewer = StampViewer::new(canvas, ViewerConfig::default());
        let loader = CountingLoader {
            loads: AtomicUsize::new(0),
        };

        let fired = AtomicUsize::new(0);
        let preloaded = block_on(viewer.preload(Some(&files), &loader, || {
            assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
            fired.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(preloaded.failed, vec!["ref-missing".to_string()]);
    }

    #[test]
    fn test_ready_fires_once_without_images() {
        let canvas = CanvasData::with_dimensions(10.0, 10.0)
            .with_shape_appended(Shape::Rect(BasicShape::new(Point::ZERO)));
        let viewer = StampViewer::new(canvas, ViewerConfig::default());
        let loader = CountingLoader {
            loads: AtomicUsize::new(0),
        };

        let fired = AtomicUsize::new(0);
        block_on(viewer.preload(None, &loader, || {
            fired.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_ready_fires_when_every_image_fails() {
        let files = MemoryFileManager::new();
        let canvas = CanvasData::with_dimensions(10.0, 10.0)
            .with_shape_appended(image("ref-a"))
            .with_shape_appended(image("ref-b"));
        let viewer = StampViewer::new(canvas, ViewerConfig::default());
        let loader = CountingLoader {
            loads: AtomicUsize::new(0),
        };

        let fired = AtomicUsize::new(0);
        let preloaded = block_on(viewer.preload(Some(&files), &loader, || {
            fired.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(preloaded.failed.len(), 2);
    }
}
