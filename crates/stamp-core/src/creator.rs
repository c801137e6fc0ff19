//! The composed editor: stencil, canvas and properties panel around one
//! selection.

use crate::canvas::CanvasData;
use crate::droppable::{CanvasConfig, CanvasEvent, DroppableCanvas, ShapeFactory};
use crate::files::{FileManager, SelectedFile};
use crate::properties::{
    FileEditOutcome, FileEditor, FileEditorError, PropertiesEditor, PropertyEdit, PropertyPanel,
};
use crate::shapes::{Shape, ShapeId, ShapeKind};
use crate::stencil::Stencil;
use crate::widget::TransformableShape;
use kurbo::Point;
use std::sync::Arc;

/// Result of choosing a file for the selected image.
#[derive(Debug, Clone, PartialEq)]
pub enum FileChoice {
    /// New canvas data for the host to store.
    Changed(CanvasData),
    /// The file type is not allowed; show `alert` to the user.
    Rejected { alert: String },
    /// No image shape is selected.
    NothingSelected,
}

/// Stamp editor.
///
/// The only state kept here is the current selection. Canvas data always
/// comes from the host and every change goes back to it as a return value.
pub struct StampCreator {
    stencil: Stencil,
    canvas: DroppableCanvas,
    properties: PropertiesEditor,
    file_editor: FileEditor,
    selected: Option<Shape>,
}

impl StampCreator {
    pub fn new(config: CanvasConfig) -> Self {
        Self {
            stencil: Stencil,
            canvas: DroppableCanvas::new(config),
            properties: PropertiesEditor::default(),
            file_editor: FileEditor::default(),
            selected: None,
        }
    }

    /// Route uploads, downloads and removals through the host.
    pub fn with_file_manager(mut self, files: Arc<dyn FileManager>) -> Self {
        self.canvas = self.canvas.with_file_manager(files.clone());
        self.file_editor = self.file_editor.with_file_manager(files);
        self
    }

    pub fn with_factory(mut self, factory: Arc<dyn ShapeFactory>) -> Self {
        self.canvas = self.canvas.with_factory(factory);
        self
    }

    /// Media types accepted by the image file control.
    pub fn with_accept(mut self, accept: Vec<String>) -> Self {
        self.properties = PropertiesEditor::new(accept.clone());
        let blobs = self.file_editor.blob_store().clone();
        let mut file_editor = FileEditor::new(accept).with_blob_store(blobs);
        if let Some(files) = self.canvas.file_manager() {
            file_editor = file_editor.with_file_manager(files.clone());
        }
        self.file_editor = file_editor;
        self
    }

    pub fn stencil(&self) -> &Stencil {
        &self.stencil
    }

    pub fn canvas(&self) -> &DroppableCanvas {
        &self.canvas
    }

    pub fn file_editor(&self) -> &FileEditor {
        &self.file_editor
    }

    pub fn selected(&self) -> Option<&Shape> {
        self.selected.as_ref()
    }

    pub fn panel(&self) -> Option<PropertyPanel> {
        self.properties.panel(self.selected.as_ref())
    }

    pub fn shapes(&self, data: &CanvasData) -> Vec<TransformableShape> {
        self.canvas.shapes(data, self.selected.as_ref())
    }

    pub fn mount(&mut self, data: &CanvasData) -> Option<CanvasData> {
        let events = self.canvas.mount(data);
        self.apply(events)
    }

    pub fn unmount(&mut self) {
        self.selected = None;
        self.canvas.unmount();
    }

    /// The host stored new canvas data: re-resolve the selection by id so
    /// it reflects the stored shape, or clear it when the shape is gone.
    pub fn canvas_updated(&mut self, data: &CanvasData) {
        if let Some(selected) = &self.selected {
            self.selected = data.find(selected.id()).cloned();
        }
    }

    /// Apply canvas events. Returns the last changed canvas data, which
    /// the host must store.
    pub fn apply(&mut self, events: Vec<CanvasEvent>) -> Option<CanvasData> {
        let mut changed = None;
        for event in events {
            match event {
                CanvasEvent::Changed(data) => changed = Some(data),
                CanvasEvent::Selected(shape) => self.selected = shape,
            }
        }
        if let Some(data) = &changed {
            self.canvas_updated(data);
        }
        changed
    }

    /// Replace the edited shape at its index.
    pub fn properties_changed(&mut self, data: &CanvasData, shape: Shape) -> Option<CanvasData> {
        data.position(shape.id())?;
        let next = data.with_shape_replaced(shape);
        self.canvas_updated(&next);
        Some(next)
    }

    pub fn edit_properties(
        &mut self,
        data: &CanvasData,
        edits: &[PropertyEdit],
    ) -> Option<CanvasData> {
        let shape = self.properties.edit(self.selected.as_ref(), edits)?;
        self.properties_changed(data, shape)
    }

    pub fn drop_item(&mut self, data: &CanvasData, kind: ShapeKind, point: Point) -> Option<CanvasData> {
        let events = self.canvas.drop_item(data, kind, point);
        self.apply(events)
    }

    pub fn drag_end(&mut self, data: &CanvasData, id: &ShapeId, point: Point) -> Option<CanvasData> {
        let events = self.canvas.drag_end(data, id, point);
        self.apply(events)
    }

    pub fn transform_end(&mut self, data: &CanvasData, shape: &Shape) -> Option<CanvasData> {
        let events = self.canvas.transform_end(data, shape, self.selected.as_ref());
        self.apply(events)
    }

    pub fn click_shape(&mut self, data: &CanvasData, id: &ShapeId) {
        let events = self.canvas.click_shape(data, id);
        self.apply(events);
    }

    pub fn click_empty(&mut self) {
        let events = self.canvas.click_empty();
        self.apply(events);
    }

    pub async fn context_menu(&mut self, data: &CanvasData, id: &ShapeId) -> Option<CanvasData> {
        let events = self.canvas.context_menu(data, id).await;
        self.apply(events)
    }

    /// Choose (or clear, with `None`) the file behind the selected image.
    pub async fn choose_file(
        &mut self,
        data: &CanvasData,
        file: Option<&SelectedFile>,
    ) -> Result<FileChoice, FileEditorError> {
        let Some(shape) = self.selected.clone().filter(Shape::is_image) else {
            return Ok(FileChoice::NothingSelected);
        };
        let reference = match self.file_editor.choose(file, &shape).await? {
            FileEditOutcome::Rejected { alert } => return Ok(FileChoice::Rejected { alert }),
            FileEditOutcome::Accepted { reference } => reference,
        };
        let changed = self.edit_properties(data, &[PropertyEdit::Image(reference.clone())]);
        self.file_editor
            .finish(shape.image_reference(), &reference, changed.is_some())
            .await;
        Ok(changed.map_or(FileChoice::NothingSelected, FileChoice::Changed))
    }
}

impl Default for StampCreator {
    fn default() -> Self {
        Self::new(CanvasConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::MemoryFileManager;
    use crate::properties::PropertyField;

    fn empty() -> CanvasData {
        CanvasData::with_dimensions(400.0, 300.0)
    }

    #[test]
    fn test_drop_then_select_then_edit() {
        let mut creator = StampCreator::default();
        let data = creator
            .drop_item(&empty(), ShapeKind::Rect, Point::new(100.0, 100.0))
            .unwrap();
        assert!(creator.selected().is_none());
        assert!(creator.panel().is_none());

        let id = data.shapes[0].id().clone();
        creator.click_shape(&data, &id);
        assert_eq!(creator.selected().map(Shape::id), Some(&id));
        assert!(creator.panel().unwrap().control(PropertyField::Fill).is_some());

        let next = creator
            .edit_properties(&data, &[PropertyEdit::Width(80.0)])
            .unwrap();
        assert!((next.shapes[0].base().width - 80.0).abs() < f64::EPSILON);
        assert!((creator.selected().unwrap().base().width - 80.0).abs() < f64::EPSILON);
        assert!((data.shapes[0].base().width - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_selection_follows_canvas_updates() {
        let mut creator = StampCreator::default();
        let data = creator
            .drop_item(&empty(), ShapeKind::Circle, Point::new(100.0, 100.0))
            .unwrap();
        let id = data.shapes[0].id().clone();
        creator.click_shape(&data, &id);

        let mut moved = data.shapes[0].clone();
        moved.base_mut().x = 5.0;
        let updated = data.with_shape_replaced(moved);
        creator.canvas_updated(&updated);
        assert!((creator.selected().unwrap().base().x - 5.0).abs() < f64::EPSILON);

        creator.canvas_updated(&updated.with_shape_removed(&id));
        assert!(creator.selected().is_none());
    }

    #[test]
    fn test_properties_changed_unknown_shape() {
        let mut creator = StampCreator::default();
        let stranger = crate::droppable::default_shape(ShapeKind::Rect, Point::ZERO);
        assert!(creator.properties_changed(&empty(), stranger).is_none());
    }

    #[test]
    fn test_transform_end_updates_selection() {
        let mut creator = StampCreator::default();
        let data = creator
            .drop_item(&empty(), ShapeKind::Rect, Point::new(100.0, 100.0))
            .unwrap();
        let id = data.shapes[0].id().clone();
        creator.click_shape(&data, &id);

        let mut widget = creator
            .shapes(&data)
            .into_iter()
            .find(|w| w.is_selected())
            .unwrap();
        widget.begin_transform();
        widget.drag_handle(crate::widget::HandleKind::BottomRight, kurbo::Vec2::new(10.0, 0.0));
        let transformed = widget.end_transform().unwrap();

        let next = creator.transform_end(&data, &transformed).unwrap();
        assert!((next.shapes[0].base().width - 60.0).abs() < 1e-9);
        assert!((creator.selected().unwrap().base().width - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_context_menu_clears_selection() {
        let mut creator = StampCreator::default();
        let data = creator
            .drop_item(&empty(), ShapeKind::Text, Point::new(100.0, 100.0))
            .unwrap();
        let id = data.shapes[0].id().clone();
        creator.click_shape(&data, &id);

        let next = futures::executor::block_on(creator.context_menu(&data, &id)).unwrap();
        assert!(next.shapes.is_empty());
        assert!(creator.selected().is_none());
    }

    #[test]
    fn test_choose_file_for_selected_image() {
        let files = Arc::new(MemoryFileManager::new());
        let mut creator = StampCreator::default().with_file_manager(files.clone());
        let data = creator
            .drop_item(&empty(), ShapeKind::Image, Point::new(100.0, 100.0))
            .unwrap();

        let png = SelectedFile::new("a.png", "image/png", vec![1]);
        let outcome = futures::executor::block_on(creator.choose_file(&data, Some(&png))).unwrap();
        assert_eq!(outcome, FileChoice::NothingSelected);

        let id = data.shapes[0].id().clone();
        creator.click_shape(&data, &id);
        let outcome = futures::executor::block_on(creator.choose_file(&data, Some(&png))).unwrap();
        let next = match outcome {
            FileChoice::Changed(next) => next,
            other => panic!("unexpected {other:?}"),
        };
        let reference = next.shapes[0].image_reference().unwrap().to_string();
        assert!(files.contains(&reference));

        let txt = SelectedFile::new("a.txt", "text/plain", vec![1]);
        let outcome = futures::executor::block_on(creator.choose_file(&next, Some(&txt))).unwrap();
        assert!(matches!(outcome, FileChoice::Rejected { .. }));
    }

    #[test]
    fn test_choose_file_on_stale_canvas_keeps_previous_file() {
        let files = Arc::new(MemoryFileManager::new());
        let mut creator = StampCreator::default().with_file_manager(files.clone());
        let data = creator
            .drop_item(&empty(), ShapeKind::Image, Point::new(100.0, 100.0))
            .unwrap();
        let id = data.shapes[0].id().clone();
        creator.click_shape(&data, &id);

        let first = SelectedFile::new("a.png", "image/png", vec![1]);
        let next = match futures::executor::block_on(creator.choose_file(&data, Some(&first))) {
            Ok(FileChoice::Changed(next)) => next,
            other => panic!("unexpected {other:?}"),
        };
        let reference = next.shapes[0].image_reference().unwrap().to_string();

        let second = SelectedFile::new("b.png", "image/png", vec![2]);
        let outcome =
            futures::executor::block_on(creator.choose_file(&empty(), Some(&second))).unwrap();
        assert_eq!(outcome, FileChoice::NothingSelected);
        assert!(files.contains(&reference));
        assert_eq!(files.len(), 1);
    }
}
