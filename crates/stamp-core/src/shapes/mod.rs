//! Shape definitions for the stamp canvas.
//!
//! A [`Shape`] is a tagged union over the four primitives. In the exchange
//! format every shape is a flat JSON object whose `"type"` field selects
//! the variant:
//!
//! ```json
//! { "id": "…", "type": "Rect", "x": 15, "y": 15, "width": 50, "height": 50,
//!   "rotation": 0, "opacity": 1, "draggable": true,
//!   "fill": "transparent", "stroke": "black", "strokeWidth": 2 }
//! ```

mod basic;
mod image;
mod text;

pub use basic::BasicShape;
pub use image::ImageShape;
pub use text::TextShape;

use kurbo::{Affine, Point, Rect, Size};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for shapes.
///
/// Assigned once when a shape is created and never reassigned. It is the
/// only key correlating a shape with its on-canvas widget and selection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShapeId(String);

impl ShapeId {
    /// Generate a fresh identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Placeholder for a shape read without an id. [`CanvasData`] replaces
    /// it with one derived from the shape's index.
    ///
    /// [`CanvasData`]: crate::canvas::CanvasData
    pub fn unassigned() -> Self {
        Self(String::new())
    }

    pub fn is_unassigned(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ShapeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ShapeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ShapeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// The variant tag of a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    Rect,
    Circle,
    Text,
    Image,
}

impl ShapeKind {
    /// All shape kinds, in stencil order.
    pub fn all() -> &'static [ShapeKind] {
        &[ShapeKind::Rect, ShapeKind::Circle, ShapeKind::Text, ShapeKind::Image]
    }

    /// Tag as written in the exchange format.
    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeKind::Rect => "Rect",
            ShapeKind::Circle => "Circle",
            ShapeKind::Text => "Text",
            ShapeKind::Image => "Image",
        }
    }
}

fn default_opacity() -> f64 {
    1.0
}

fn default_draggable() -> bool {
    true
}

pub(crate) fn default_stroke_width() -> f64 {
    2.0
}

/// Fields shared by every shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeBase {
    #[serde(default = "ShapeId::unassigned")]
    pub id: ShapeId,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    /// Rotation in degrees around the shape origin.
    #[serde(default)]
    pub rotation: f64,
    /// Overall opacity (0.0 = fully transparent, 1.0 = fully opaque).
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    #[serde(default = "default_draggable")]
    pub draggable: bool,
}

impl ShapeBase {
    /// Create a base with a fresh id at `position` with the given size.
    pub fn new(position: Point, size: Size) -> Self {
        Self {
            id: ShapeId::new(),
            x: position.x,
            y: position.y,
            width: size.width,
            height: size.height,
            rotation: 0.0,
            opacity: default_opacity(),
            draggable: default_draggable(),
        }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Transform from shape-local coordinates to canvas coordinates:
    /// translate to `(x, y)` then rotate about that origin.
    pub fn local_transform(&self) -> Affine {
        Affine::translate((self.x, self.y)) * Affine::rotate(self.rotation.to_radians())
    }
}

/// A shape placed on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Shape {
    Rect(BasicShape),
    Circle(BasicShape),
    Text(TextShape),
    Image(ImageShape),
}

impl Shape {
    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Rect(_) => ShapeKind::Rect,
            Shape::Circle(_) => ShapeKind::Circle,
            Shape::Text(_) => ShapeKind::Text,
            Shape::Image(_) => ShapeKind::Image,
        }
    }

    pub fn base(&self) -> &ShapeBase {
        match self {
            Shape::Rect(s) | Shape::Circle(s) => &s.base,
            Shape::Text(s) => &s.base,
            Shape::Image(s) => &s.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut ShapeBase {
        match self {
            Shape::Rect(s) | Shape::Circle(s) => &mut s.base,
            Shape::Text(s) => &mut s.base,
            Shape::Image(s) => &mut s.base,
        }
    }

    pub fn id(&self) -> &ShapeId {
        &self.base().id
    }

    /// Bounding box in the shape's own (unrotated) frame, relative to the
    /// canvas. Circles are centered on their position.
    pub fn local_bounds(&self) -> Rect {
        let base = self.base();
        match self {
            Shape::Circle(_) => Rect::from_center_size(base.position(), base.size()),
            Shape::Rect(_) | Shape::Text(_) | Shape::Image(_) => {
                Rect::from_origin_size(base.position(), base.size())
            }
        }
    }

    /// Axis-aligned bounds after rotation.
    pub fn bounds(&self) -> Rect {
        let base = self.base();
        let local = self.local_bounds();
        if base.rotation.abs() < f64::EPSILON {
            return local;
        }
        let rot = Affine::rotate_about(base.rotation.to_radians(), base.position());
        let corners = [
            Point::new(local.x0, local.y0),
            Point::new(local.x1, local.y0),
            Point::new(local.x1, local.y1),
            Point::new(local.x0, local.y1),
        ];
        let rotated: Vec<Point> = corners.iter().map(|&p| rot * p).collect();
        let min_x = rotated.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
        let max_x = rotated.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
        let min_y = rotated.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
        let max_y = rotated.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);
        Rect::new(min_x, min_y, max_x, max_y)
    }

    /// Check if a point (in canvas coordinates) hits this shape.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let base = self.base();
        let inverse = Affine::rotate_about(-base.rotation.to_radians(), base.position());
        let local = inverse * point;
        let bounds = self.local_bounds().inflate(tolerance, tolerance);
        match self {
            Shape::Circle(_) => {
                let center = bounds.center();
                let rx = bounds.width() / 2.0;
                let ry = bounds.height() / 2.0;
                if rx <= 0.0 || ry <= 0.0 {
                    return false;
                }
                let dx = (local.x - center.x) / rx;
                let dy = (local.y - center.y) / ry;
                dx * dx + dy * dy <= 1.0
            }
            Shape::Rect(_) | Shape::Text(_) | Shape::Image(_) => bounds.contains(local),
        }
    }

    /// The image reference of an image shape, if non-empty.
    pub fn image_reference(&self) -> Option<&str> {
        match self {
            Shape::Image(img) if !img.image.is_empty() => Some(&img.image),
            _ => None,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Shape::Image(_))
    }

    /// Copy the geometry (position, size, rotation) of `other` onto this
    /// shape, leaving every other field untouched.
    pub fn with_geometry_of(&self, other: &Shape) -> Shape {
        let mut shape = self.clone();
        let src = other.base();
        let dst = shape.base_mut();
        dst.x = src.x;
        dst.y = src.y;
        dst.width = src.width;
        dst.height = src.height;
        dst.rotation = src.rotation;
        shape
    }
}
