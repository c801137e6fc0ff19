//! Handle definitions for shape transformation.

use super::TransformBox;
use kurbo::{Point, Vec2};

/// Distance from the top edge to the rotation handle (in canvas units).
pub const ROTATE_HANDLE_OFFSET: f64 = 25.0;
/// Handle hit tolerance in canvas units.
pub const HANDLE_HIT_TOLERANCE: f64 = 8.0;

/// A manipulation handle on a selected shape.
#[derive(Debug, Clone)]
pub struct Handle {
    /// The kind of handle (determines behavior).
    pub kind: HandleKind,
    /// Position in canvas coordinates.
    pub position: Point,
    /// Visual shape of the handle.
    pub shape: HandleShape,
}

/// The kind of handle - determines what manipulation it performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Rotate,
}

impl HandleKind {
    pub fn is_corner(&self) -> bool {
        !matches!(self, HandleKind::Rotate)
    }
}

/// Visual shape of a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandleShape {
    #[default]
    Square,
    Circle,
}

impl Handle {
    pub fn new(kind: HandleKind, position: Point) -> Self {
        Self {
            kind,
            position,
            shape: HandleShape::default(),
        }
    }

    pub fn with_shape(mut self, shape: HandleShape) -> Self {
        self.shape = shape;
        self
    }

    /// Check if a point (in canvas coordinates) hits this handle.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let dx = point.x - self.position.x;
        let dy = point.y - self.position.y;
        dx * dx + dy * dy <= tolerance * tolerance
    }
}

/// Rotate a local offset by `degrees`.
pub(crate) fn rotate_vec(v: Vec2, degrees: f64) -> Vec2 {
    let (sin_r, cos_r) = degrees.to_radians().sin_cos();
    Vec2::new(v.x * cos_r - v.y * sin_r, v.x * sin_r + v.y * cos_r)
}

/// Corner handles plus a rotation handle for a transform box.
/// Positions follow the box rotation; the rotation handle sits above the
/// top-center.
pub fn corner_and_rotate_handles(bounds: &TransformBox) -> Vec<Handle> {
    let origin = bounds.origin();
    let at = |dx: f64, dy: f64| origin + rotate_vec(Vec2::new(dx, dy), bounds.rotation);
    let (w, h) = (bounds.width, bounds.height);

    vec![
        Handle::new(HandleKind::TopLeft, at(0.0, 0.0)),
        Handle::new(HandleKind::TopRight, at(w, 0.0)),
        Handle::new(HandleKind::BottomLeft, at(0.0, h)),
        Handle::new(HandleKind::BottomRight, at(w, h)),
        Handle::new(HandleKind::Rotate, at(w / 2.0, -ROTATE_HANDLE_OFFSET))
            .with_shape(HandleShape::Circle),
    ]
}
