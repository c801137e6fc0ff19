//! The palette of draggable shape kinds.

use crate::shapes::ShapeKind;

/// One entry in the stencil. Dragging it onto the canvas carries `kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StencilItem {
    pub kind: ShapeKind,
    pub name: &'static str,
    /// Icon identifier for the host's icon set.
    pub icon: &'static str,
}

const ITEMS: &[StencilItem] = &[
    StencilItem {
        kind: ShapeKind::Rect,
        name: "Rectangle",
        icon: "rectangle",
    },
    StencilItem {
        kind: ShapeKind::Circle,
        name: "Circle",
        icon: "circle",
    },
    StencilItem {
        kind: ShapeKind::Text,
        name: "Text",
        icon: "text",
    },
    StencilItem {
        kind: ShapeKind::Image,
        name: "Image",
        icon: "image",
    },
];

/// Static list of shapes the user can drag onto the canvas.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stencil;

impl Stencil {
    pub fn items(&self) -> &'static [StencilItem] {
        ITEMS
    }

    pub fn item(&self, kind: ShapeKind) -> Option<&'static StencilItem> {
        ITEMS.iter().find(|item| item.kind == kind)
    }

    /// Drag payload for an item.
    pub fn drag_payload(&self, item: &StencilItem) -> ShapeKind {
        item.kind
    }
}
