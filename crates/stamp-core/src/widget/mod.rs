//! Widget layer wrapping shapes with interaction state.
//!
//! Shapes remain pure data. A [`TransformableShape`] pairs one shape with
//! its selection state and, while the user drags a handle, a transform
//! session that is committed back as a new shape value.

mod handles;
mod state;
mod transformable;

pub use handles::{
    HANDLE_HIT_TOLERANCE, Handle, HandleKind, HandleShape, ROTATE_HANDLE_OFFSET,
    corner_and_rotate_handles,
};
pub use state::WidgetState;
pub use transformable::{MIN_TRANSFORM_SIZE, TransformBox, TransformableShape};
