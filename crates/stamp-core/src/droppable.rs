//! The editing canvas: drop target, shape host and selection surface.
//!
//! [`DroppableCanvas`] owns no shape state. Every operation takes the
//! current [`CanvasData`] and answers with [`CanvasEvent`]s; the host
//! stores whatever `Changed` value it receives.

use crate::canvas::CanvasData;
use crate::files::{FileManager, FileResult, ImageSource};
use crate::geometry::{clamp, round_point};
use crate::resolver::ImageResolver;
use crate::shapes::{BasicShape, ImageShape, Shape, ShapeId, ShapeKind, TextShape};
use crate::widget::TransformableShape;
use kurbo::{Point, Size};
use std::sync::Arc;

/// Distance kept between a dropped shape and the canvas edge.
pub const DROP_MARGIN: f64 = 15.0;
/// Room reserved for a dropped shape at the far edges.
pub const DROP_SHAPE_EXTENT: f64 = 50.0;
/// Horizontal space left to the stencil when the width is derived from the
/// viewport.
pub const VIEWPORT_WIDTH_INSET: f64 = 50.0;

/// Builds the shape for a stencil drop.
pub trait ShapeFactory: Send + Sync {
    fn create(&self, kind: ShapeKind, position: Point) -> Shape;
}

impl<F> ShapeFactory for F
where
    F: Fn(ShapeKind, Point) -> Shape + Send + Sync,
{
    fn create(&self, kind: ShapeKind, position: Point) -> Shape {
        self(kind, position)
    }
}

/// Shape built for a drop when the host supplies no factory.
pub fn default_shape(kind: ShapeKind, position: Point) -> Shape {
    match kind {
        ShapeKind::Rect => Shape::Rect(BasicShape::new(position)),
        ShapeKind::Circle => Shape::Circle(BasicShape::new(position)),
        ShapeKind::Text => Shape::Text(TextShape::new(position)),
        ShapeKind::Image => Shape::Image(ImageShape::new(position)),
    }
}

/// Where a dropped shape is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropPolicy {
    /// Keep the shape inside the canvas: x in `[15, width - 50]`,
    /// y in `[15, height - 50]`.
    ClampToMargin,
    /// Use the drop point as-is.
    Unclamped,
}

/// Canvas configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasConfig {
    /// Size of the window hosting the editor. Used for default dimensions.
    pub viewport: Size,
    /// Drop placement. `None` picks [`DropPolicy::ClampToMargin`] for the
    /// built-in shapes and [`DropPolicy::Unclamped`] when a custom factory
    /// is configured.
    pub drop_policy: Option<DropPolicy>,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            viewport: Size::new(1024.0, 768.0),
            drop_policy: None,
        }
    }
}

/// Outward notification from the canvas.
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasEvent {
    /// New canvas data for the host to store.
    Changed(CanvasData),
    /// The selection changed.
    Selected(Option<Shape>),
}

/// Stateless (with respect to shapes) editing canvas.
pub struct DroppableCanvas {
    config: CanvasConfig,
    factory: Option<Arc<dyn ShapeFactory>>,
    files: Option<Arc<dyn FileManager>>,
    resolver: ImageResolver,
}

impl DroppableCanvas {
    pub fn new(config: CanvasConfig) -> Self {
        Self {
            config,
            factory: None,
            files: None,
            resolver: ImageResolver::new(),
        }
    }

    pub fn with_factory(mut self, factory: Arc<dyn ShapeFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn with_file_manager(mut self, files: Arc<dyn FileManager>) -> Self {
        self.files = Some(files);
        self
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn file_manager(&self) -> Option<&Arc<dyn FileManager>> {
        self.files.as_ref()
    }

    pub fn drop_policy(&self) -> DropPolicy {
        self.config.drop_policy.unwrap_or(match self.factory {
            Some(_) => DropPolicy::Unclamped,
            None => DropPolicy::ClampToMargin,
        })
    }

    /// Start a mount. Missing dimensions are filled from the viewport and
    /// reported; once set, the data's dimensions are authoritative.
    pub fn mount(&self, data: &CanvasData) -> Vec<CanvasEvent> {
        self.resolver.remount();
        if data.size().is_some() {
            return Vec::new();
        }
        let size = self.surface_size(data);
        log::debug!("Defaulting canvas size to {}x{}", size.width, size.height);
        vec![CanvasEvent::Changed(data.with_size(size.width, size.height))]
    }

    /// Canvas size, falling back to the viewport for unset dimensions.
    pub fn surface_size(&self, data: &CanvasData) -> Size {
        let viewport = self.config.viewport;
        Size::new(
            data.width.unwrap_or(viewport.width - VIEWPORT_WIDTH_INSET),
            data.height.unwrap_or(viewport.height),
        )
    }

    /// Drop a stencil item at `point` (canvas coordinates).
    pub fn drop_item(&self, data: &CanvasData, kind: ShapeKind, point: Point) -> Vec<CanvasEvent> {
        let mut shape = match &self.factory {
            Some(factory) => factory.create(kind, point),
            None => default_shape(kind, point),
        };
        if self.drop_policy() == DropPolicy::ClampToMargin {
            let placed = self.clamp_to_margin(data, point);
            let base = shape.base_mut();
            base.x = placed.x;
            base.y = placed.y;
        }
        log::debug!(
            "Dropped {} {} at ({}, {})",
            kind.as_str(),
            shape.id(),
            shape.base().x,
            shape.base().y
        );
        vec![CanvasEvent::Changed(data.with_shape_appended(shape))]
    }

    fn clamp_to_margin(&self, data: &CanvasData, point: Point) -> Point {
        let size = self.surface_size(data);
        let x = clamp(point.x, DROP_MARGIN, size.width - DROP_SHAPE_EXTENT);
        let y = clamp(point.y, DROP_MARGIN, size.height - DROP_SHAPE_EXTENT);
        match (x, y) {
            (Ok(x), Ok(y)) => Point::new(x, y),
            (Err(e), _) | (_, Err(e)) => {
                log::warn!(
                    "Canvas {}x{} too small to place a dropped shape: {}",
                    size.width,
                    size.height,
                    e
                );
                Point::new(DROP_MARGIN, DROP_MARGIN)
            }
        }
    }

    /// A shape was dragged to `point`; the position is rounded to whole
    /// units.
    pub fn drag_end(&self, data: &CanvasData, id: &ShapeId, point: Point) -> Vec<CanvasEvent> {
        let Some(shape) = data.find(id) else {
            log::debug!("Drag ended on unknown shape {}", id);
            return Vec::new();
        };
        let rounded = round_point(point);
        let mut moved = shape.clone();
        let base = moved.base_mut();
        base.x = rounded.x;
        base.y = rounded.y;
        vec![CanvasEvent::Changed(data.with_shape_replaced(moved))]
    }

    /// A transform was committed. The reported geometry is merged onto the
    /// stored shape so fields the widget does not track are preserved.
    pub fn transform_end(
        &self,
        data: &CanvasData,
        shape: &Shape,
        selected: Option<&Shape>,
    ) -> Vec<CanvasEvent> {
        let Some(stored) = data.find(shape.id()) else {
            log::debug!("Transform ended on unknown shape {}", shape.id());
            return Vec::new();
        };
        let updated = stored.with_geometry_of(shape);
        let mut events = vec![CanvasEvent::Changed(data.with_shape_replaced(updated.clone()))];
        if selected.is_some_and(|s| s.id() == updated.id()) {
            events.push(CanvasEvent::Selected(Some(updated)));
        }
        events
    }

    /// Delete a shape from its context menu. Image references are released
    /// through the file manager; a failure there is logged and does not
    /// undo the deletion.
    pub async fn context_menu(&self, data: &CanvasData, id: &ShapeId) -> Vec<CanvasEvent> {
        let Some(shape) = data.find(id) else {
            return Vec::new();
        };
        let events = vec![
            CanvasEvent::Changed(data.with_shape_removed(id)),
            CanvasEvent::Selected(None),
        ];
        if let Some(reference) = shape.image_reference() {
            if let Some(files) = &self.files {
                if let Err(e) = files.remove(reference).await {
                    log::warn!("Failed to remove image {}: {}", reference, e);
                }
            }
            self.resolver.evict(reference);
        }
        events
    }

    pub fn click_shape(&self, data: &CanvasData, id: &ShapeId) -> Vec<CanvasEvent> {
        vec![CanvasEvent::Selected(data.find(id).cloned())]
    }

    pub fn click_empty(&self) -> Vec<CanvasEvent> {
        vec![CanvasEvent::Selected(None)]
    }

    /// Widgets for every shape, in paint order.
    pub fn shapes(&self, data: &CanvasData, selected: Option<&Shape>) -> Vec<TransformableShape> {
        data.shapes
            .iter()
            .map(|shape| {
                let is_selected = selected.is_some_and(|s| s.id() == shape.id());
                TransformableShape::new(shape.clone(), is_selected)
            })
            .collect()
    }

    /// Resolve the image of an image shape for display.
    pub async fn resolve_image(&self, shape: &Shape) -> FileResult<Option<ImageSource>> {
        match shape.image_reference() {
            Some(reference) => self.resolver.resolve(reference, self.files.as_deref()).await,
            None => Ok(None),
        }
    }

    /// End the mount and release the resolution cache.
    pub fn unmount(&self) {
        self.resolver.unmount();
    }
}

impl Default for DroppableCanvas {
    fn default() -> Self {
        Self::new(CanvasConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::{MemoryFileManager, SelectedFile};
    use futures::executor::block_on;

    fn canvas_data() -> CanvasData {
        CanvasData::with_dimensions(400.0, 300.0)
    }

    fn changed(events: &[CanvasEvent]) -> &CanvasData {
        events
            .iter()
            .find_map(|e| match e {
                CanvasEvent::Changed(data) => Some(data),
                CanvasEvent::Selected(_) => None,
            })
            .expect("no Changed event")
    }

    #[test]
    fn test_mount_defaults_dimensions_from_viewport() {
        let canvas = DroppableCanvas::new(CanvasConfig {
            viewport: Size::new(1000.0, 700.0),
            drop_policy: None,
        });
        let events = canvas.mount(&CanvasData::default());
        let data = changed(&events);
        assert_eq!(data.width, Some(950.0));
        assert_eq!(data.height, Some(700.0));

        assert!(canvas.mount(&canvas_data()).is_empty());
    }

    #[test]
    fn test_drop_default_shapes() {
        let canvas = DroppableCanvas::default();
        let data = canvas_data();

        let events = canvas.drop_item(&data, ShapeKind::Rect, Point::new(100.0, 120.0));
        let next = changed(&events);
        assert_eq!(next.shapes.len(), 1);
        assert!(data.shapes.is_empty());
        match &next.shapes[0] {
            Shape::Rect(rect) => {
                assert_eq!(rect.base.position(), Point::new(100.0, 120.0));
                assert_eq!(rect.base.size(), Size::new(50.0, 50.0));
                assert_eq!(rect.fill.as_deref(), Some("transparent"));
                assert_eq!(rect.stroke.as_deref(), Some("black"));
                assert!((rect.stroke_width - 2.0).abs() < f64::EPSILON);
                assert!(rect.base.draggable);
            }
            other => panic!("unexpected {other:?}"),
        }

        let events = canvas.drop_item(&data, ShapeKind::Text, Point::new(100.0, 120.0));
        match &changed(&events).shapes[0] {
            Shape::Text(text) => {
                assert_eq!(text.text, "Text");
                assert!((text.font_size - 18.0).abs() < f64::EPSILON);
            }
            other => panic!("unexpected {other:?}"),
        }

        let events = canvas.drop_item(&data, ShapeKind::Image, Point::new(100.0, 120.0));
        match &changed(&events).shapes[0] {
            Shape::Image(image) => {
                assert!(image.image.is_empty());
                assert_eq!(image.stroke_width, Some(1.0));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_drop_clamps_to_margin() {
        let canvas = DroppableCanvas::default();
        let data = canvas_data();

        let events = canvas.drop_item(&data, ShapeKind::Circle, Point::new(2.0, 1000.0));
        let shape = &changed(&events).shapes[0];
        assert_eq!(shape.base().position(), Point::new(15.0, 250.0));

        let events = canvas.drop_item(&data, ShapeKind::Circle, Point::new(900.0, -5.0));
        let shape = &changed(&events).shapes[0];
        assert_eq!(shape.base().position(), Point::new(350.0, 15.0));
    }

    #[test]
    fn test_drop_on_tiny_canvas_falls_back_to_margin() {
        let canvas = DroppableCanvas::default();
        let data = CanvasData::with_dimensions(40.0, 40.0);
        let events = canvas.drop_item(&data, ShapeKind::Rect, Point::new(30.0, 30.0));
        let shape = &changed(&events).shapes[0];
        assert_eq!(shape.base().position(), Point::new(15.0, 15.0));
    }

    #[test]
    fn test_custom_factory_is_unclamped_by_default() {
        let factory = |kind: ShapeKind, position: Point| {
            let mut shape = default_shape(kind, position);
            shape.base_mut().width = 10.0;
            shape
        };
        let canvas = DroppableCanvas::default().with_factory(Arc::new(factory));
        assert_eq!(canvas.drop_policy(), DropPolicy::Unclamped);

        let events = canvas.drop_item(&canvas_data(), ShapeKind::Rect, Point::new(2.0, 2.0));
        let shape = &changed(&events).shapes[0];
        assert_eq!(shape.base().position(), Point::new(2.0, 2.0));
        assert!((shape.base().width - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_policy_override() {
        let canvas = DroppableCanvas::new(CanvasConfig {
            drop_policy: Some(DropPolicy::Unclamped),
            ..CanvasConfig::default()
        });
        let events = canvas.drop_item(&canvas_data(), ShapeKind::Rect, Point::new(1.0, 1.0));
        assert_eq!(changed(&events).shapes[0].base().position(), Point::new(1.0, 1.0));
    }

    #[test]
    fn test_drag_end_rounds() {
        let canvas = DroppableCanvas::default();
        let data = canvas_data().with_shape_appended(default_shape(ShapeKind::Rect, Point::ZERO));
        let id = data.shapes[0].id().clone();

        let events = canvas.drag_end(&data, &id, Point::new(10.4, 19.6));
        let shape = changed(&events).find(&id).unwrap();
        assert_eq!(shape.base().position(), Point::new(10.0, 20.0));
    }

    #[test]
    fn test_transform_end_merges_and_reselects() {
        let canvas = DroppableCanvas::default();
        let mut image = ImageShape::new(Point::ZERO);
        image.image = "ref-1".to_string();
        let stored = Shape::Image(image);
        let data = canvas_data().with_shape_appended(stored.clone());

        let mut reported = stored.clone();
        if let Shape::Image(img) = &mut reported {
            img.image = String::new();
        }
        reported.base_mut().width = 120.0;

        let events = canvas.transform_end(&data, &reported, Some(&stored));
        assert_eq!(events.len(), 2);
        let updated = changed(&events).find(stored.id()).unwrap().clone();
        assert_eq!(updated.image_reference(), Some("ref-1"));
        assert!((updated.base().width - 120.0).abs() < f64::EPSILON);
        assert_eq!(events[1], CanvasEvent::Selected(Some(updated)));

        let events = canvas.transform_end(&data, &reported, None);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_context_menu_removes_and_releases_file() {
        let files = Arc::new(MemoryFileManager::new());
        files
            .insert("ref-1", SelectedFile::new("a.png", "image/png", vec![1]))
            .unwrap();
        let canvas = DroppableCanvas::default().with_file_manager(files.clone());

        let mut image = ImageShape::new(Point::ZERO);
        image.image = "ref-1".to_string();
        let data = canvas_data().with_shape_appended(Shape::Image(image));
        let id = data.shapes[0].id().clone();

        let events = block_on(canvas.context_menu(&data, &id));
        assert!(changed(&events).shapes.is_empty());
        assert_eq!(events[1], CanvasEvent::Selected(None));
        assert!(!files.contains("ref-1"));
    }

    #[test]
    fn test_context_menu_without_file_manager() {
        let canvas = DroppableCanvas::default();
        let data = canvas_data().with_shape_appended(default_shape(ShapeKind::Text, Point::ZERO));
        let id = data.shapes[0].id().clone();
        let events = block_on(canvas.context_menu(&data, &id));
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_click_selection() {
        let canvas = DroppableCanvas::default();
        let data = canvas_data().with_shape_appended(default_shape(ShapeKind::Rect, Point::ZERO));
        let id = data.shapes[0].id().clone();

        assert_eq!(
            canvas.click_shape(&data, &id),
            vec![CanvasEvent::Selected(Some(data.shapes[0].clone()))]
        );
        assert_eq!(canvas.click_empty(), vec![CanvasEvent::Selected(None)]);

        let widgets = canvas.shapes(&data, Some(&data.shapes[0]));
        assert!(widgets[0].is_selected());
        assert!(!canvas.shapes(&data, None)[0].is_selected());
    }

    #[test]
    fn test_resolve_image_downloads_once_per_mount() {
        let files = Arc::new(MemoryFileManager::new());
        files
            .insert("ref-1", SelectedFile::new("a.png", "image/png", vec![1]))
            .unwrap();
        let canvas = DroppableCanvas::default().with_file_manager(files.clone());

        let mut image = ImageShape::new(Point::ZERO);
        image.image = "ref-1".to_string();
        let shape = Shape::Image(image);

        assert!(block_on(canvas.resolve_image(&shape)).unwrap().is_some());
        assert!(block_on(canvas.resolve_image(&shape)).unwrap().is_some());
        assert_eq!(files.download_count(), 1);

        canvas.unmount();
        canvas.mount(&canvas_data());
        assert!(block_on(canvas.resolve_image(&shape)).unwrap().is_some());
        assert_eq!(files.download_count(), 2);
    }
}
