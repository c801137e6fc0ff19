//! Stamp Core Library
//!
//! Platform-agnostic data model and editor state for the stamp creator:
//! canvas data, shapes, the file-reference contract, and the controllers
//! behind the stencil, canvas, properties panel and export viewer.

pub mod canvas;
pub mod colors;
pub mod creator;
pub mod droppable;
pub mod files;
pub mod geometry;
pub mod properties;
pub mod resolver;
pub mod shapes;
pub mod stencil;
pub mod viewer;
pub mod widget;

pub use canvas::CanvasData;
pub use creator::{FileChoice, StampCreator};
pub use droppable::{CanvasConfig, CanvasEvent, DropPolicy, DroppableCanvas, ShapeFactory};
pub use files::{
    BlobStore, FileError, FileManager, FileResult, ImageLoader, ImageRef, ImageSource,
    MemoryFileManager, SelectedFile,
};
pub use geometry::{GeometryError, absolute_rotation, clamp};
pub use properties::{
    FileEditOutcome, FileEditor, FileEditorError, PropertiesEditor, PropertyEdit, PropertyPanel,
};
pub use resolver::{DownloadTicket, ImageRequest, ImageResolver, Mount, MountToken};
pub use shapes::{BasicShape, ImageShape, Shape, ShapeBase, ShapeId, ShapeKind, TextShape};
pub use stencil::{Stencil, StencilItem};
pub use viewer::{Preloaded, ReadinessTracker, StampViewer, ViewerConfig};
pub use widget::{Handle, HandleKind, TransformBox, TransformableShape};
