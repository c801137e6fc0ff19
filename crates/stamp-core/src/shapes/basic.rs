//! Rectangle and circle shapes.

use super::{ShapeBase, default_stroke_width};
use crate::colors;
use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};

/// Default edge length of a freshly dropped shape.
pub const DEFAULT_SIZE: f64 = 50.0;

/// Geometry and paint for a rectangle or a circle.
///
/// The same payload backs both variants; the [`super::Shape`] tag decides
/// whether it is drawn as a box anchored at its top-left corner or as an
/// ellipse centered on its position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicShape {
    #[serde(flatten)]
    pub base: ShapeBase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<String>,
    #[serde(default = "default_stroke_width")]
    pub stroke_width: f64,
}

impl BasicShape {
    /// A 50x50 shape at `position` with a transparent fill and a black
    /// 2px outline.
    pub fn new(position: Point) -> Self {
        Self {
            base: ShapeBase::new(position, Size::new(DEFAULT_SIZE, DEFAULT_SIZE)),
            fill: Some(colors::TRANSPARENT.to_string()),
            stroke: Some(colors::BLACK.to_string()),
            stroke_width: default_stroke_width(),
        }
    }
}
