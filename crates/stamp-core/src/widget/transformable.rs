//! A shape together with its selection and transform session.

use super::WidgetState;
use super::handles::{
    HANDLE_HIT_TOLERANCE, Handle, HandleKind, ROTATE_HANDLE_OFFSET, corner_and_rotate_handles,
    rotate_vec,
};
use crate::geometry::absolute_rotation;
use crate::shapes::Shape;
use kurbo::{Point, Vec2};

/// Smallest width or height a transform may produce.
pub const MIN_TRANSFORM_SIZE: f64 = 5.0;

/// Oriented box being transformed.
///
/// `(x, y)` is the top-left corner in canvas coordinates; `rotation` is in
/// degrees about that corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub rotation: f64,
}

impl TransformBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64, rotation: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            rotation,
        }
    }

    /// The box occupied by `shape`. Circles are stored by their center, so
    /// their top-left corner is derived.
    pub fn of_shape(shape: &Shape) -> Self {
        let base = shape.base();
        let origin = match shape {
            Shape::Circle(_) => {
                base.position()
                    - rotate_vec(Vec2::new(base.width / 2.0, base.height / 2.0), base.rotation)
            }
            Shape::Rect(_) | Shape::Text(_) | Shape::Image(_) => base.position(),
        };
        Self::new(origin.x, origin.y, base.width, base.height, base.rotation)
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn center(&self) -> Point {
        self.origin() + rotate_vec(Vec2::new(self.width / 2.0, self.height / 2.0), self.rotation)
    }

    /// Whether the box is large enough to be accepted.
    pub fn is_valid(&self) -> bool {
        self.width >= MIN_TRANSFORM_SIZE && self.height >= MIN_TRANSFORM_SIZE
    }

    /// Drag one corner by `delta` (canvas coordinates), keeping the
    /// opposite corner fixed.
    fn resized(&self, corner: HandleKind, delta: Vec2) -> Self {
        let local = rotate_vec(delta, -self.rotation);
        let (shift, dw, dh) = match corner {
            HandleKind::TopLeft => (Vec2::new(local.x, local.y), -local.x, -local.y),
            HandleKind::TopRight => (Vec2::new(0.0, local.y), local.x, -local.y),
            HandleKind::BottomLeft => (Vec2::new(local.x, 0.0), -local.x, local.y),
            HandleKind::BottomRight | HandleKind::Rotate => (Vec2::ZERO, local.x, local.y),
        };
        let origin = self.origin() + rotate_vec(shift, self.rotation);
        Self::new(
            origin.x,
            origin.y,
            self.width + dw,
            self.height + dh,
            self.rotation,
        )
    }

    /// Rotate about the box center so its top-center faces `cursor`.
    fn rotated_towards(&self, cursor: Point) -> Self {
        let center = self.center();
        let angle = (cursor.y - center.y).atan2(cursor.x - center.x).to_degrees() + 90.0;
        let rotation = absolute_rotation(angle);
        let origin =
            center - rotate_vec(Vec2::new(self.width / 2.0, self.height / 2.0), rotation);
        Self::new(origin.x, origin.y, self.width, self.height, rotation)
    }
}

#[derive(Debug, Clone)]
struct TransformSession {
    original: TransformBox,
    current: TransformBox,
}

impl TransformSession {
    fn scale(&self) -> (f64, f64) {
        let ratio = |now: f64, then: f64| if then > 0.0 { now / then } else { 1.0 };
        (
            ratio(self.current.width, self.original.width),
            ratio(self.current.height, self.original.height),
        )
    }
}

/// One shape as displayed on the editing canvas.
#[derive(Debug, Clone)]
pub struct TransformableShape {
    shape: Shape,
    state: WidgetState,
    session: Option<TransformSession>,
}

impl TransformableShape {
    pub fn new(shape: Shape, selected: bool) -> Self {
        Self {
            shape,
            state: if selected {
                WidgetState::Selected
            } else {
                WidgetState::Normal
            },
            session: None,
        }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn state(&self) -> WidgetState {
        self.state
    }

    pub fn is_selected(&self) -> bool {
        self.state.is_selected()
    }

    pub fn is_draggable(&self) -> bool {
        self.shape.base().draggable
    }

    /// The box currently shown: the live session box while transforming,
    /// otherwise the shape's own.
    pub fn current_box(&self) -> TransformBox {
        match &self.session {
            Some(session) => session.current,
            None => TransformBox::of_shape(&self.shape),
        }
    }

    /// Handles to draw. Empty unless selected.
    pub fn handles(&self) -> Vec<Handle> {
        if !self.is_selected() {
            return Vec::new();
        }
        corner_and_rotate_handles(&self.current_box())
    }

    pub fn hit_test_handles(&self, point: Point) -> Option<HandleKind> {
        self.handles()
            .into_iter()
            .find(|h| h.hit_test(point, HANDLE_HIT_TOLERANCE))
            .map(|h| h.kind)
    }

    /// Start a transform. Only selected shapes can be transformed.
    pub fn begin_transform(&mut self) -> bool {
        if !self.is_selected() {
            return false;
        }
        let original = TransformBox::of_shape(&self.shape);
        self.session = Some(TransformSession {
            original,
            current: original,
        });
        self.state = WidgetState::Transforming;
        true
    }

    /// Drag a handle by `delta`, measured from where the transform began.
    /// Returns whether the resulting box was accepted.
    pub fn drag_handle(&mut self, kind: HandleKind, delta: Vec2) -> bool {
        let Some(session) = &self.session else {
            return false;
        };
        let original = session.original;
        let proposed = match kind {
            HandleKind::Rotate => {
                let start = original.origin()
                    + rotate_vec(
                        Vec2::new(original.width / 2.0, -ROTATE_HANDLE_OFFSET),
                        original.rotation,
                    );
                original.rotated_towards(start + delta)
            }
            HandleKind::TopLeft
            | HandleKind::TopRight
            | HandleKind::BottomLeft
            | HandleKind::BottomRight => original.resized(kind, delta),
        };
        self.propose(proposed)
    }

    /// Bound-box check: a box smaller than [`MIN_TRANSFORM_SIZE`] in either
    /// dimension is refused and the previous box stays in place.
    pub fn propose(&mut self, proposed: TransformBox) -> bool {
        let Some(session) = &mut self.session else {
            return false;
        };
        if !proposed.is_valid() {
            log::trace!(
                "Rejecting {}x{} box for {}",
                proposed.width,
                proposed.height,
                self.shape.id()
            );
            return false;
        }
        session.current = proposed;
        true
    }

    /// Live scale factors relative to the dimensions at transform start.
    pub fn scale(&self) -> Option<(f64, f64)> {
        self.session.as_ref().map(TransformSession::scale)
    }

    /// Commit the transform: dimensions absorb the scale factors and the
    /// scale returns to 1:1. Every non-geometry field is left untouched.
    pub fn end_transform(&mut self) -> Option<Shape> {
        let session = self.session.take()?;
        self.state = WidgetState::Selected;

        let (scale_x, scale_y) = session.scale();
        let current = session.current;
        let width = if session.original.width > 0.0 {
            session.original.width * scale_x
        } else {
            current.width
        };
        let height = if session.original.height > 0.0 {
            session.original.height * scale_y
        } else {
            current.height
        };

        let position = match &self.shape {
            Shape::Circle(_) => {
                current.origin() + rotate_vec(Vec2::new(width / 2.0, height / 2.0), current.rotation)
            }
            Shape::Rect(_) | Shape::Text(_) | Shape::Image(_) => current.origin(),
        };

        let mut shape = self.shape.clone();
        let base = shape.base_mut();
        base.x = position.x;
        base.y = position.y;
        base.width = width;
        base.height = height;
        base.rotation = current.rotation;
        self.shape = shape.clone();
        Some(shape)
    }

    /// Abandon the transform and keep the shape as it was.
    pub fn cancel_transform(&mut self) {
        if self.session.take().is_some() {
            self.state = WidgetState::Selected;
        }
    }
}
