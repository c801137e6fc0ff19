//! Image shape.

use super::ShapeBase;
use super::basic::DEFAULT_SIZE;
use crate::colors;
use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};

/// Stroke width of a freshly dropped image.
pub const DEFAULT_IMAGE_STROKE_WIDTH: f64 = 1.0;

/// A raster image drawn into the shape's box.
///
/// `image` is an opaque reference understood by the host's file manager,
/// or a directly loadable URL. An empty string means "no image yet".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageShape {
    #[serde(flatten)]
    pub base: ShapeBase,
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
}

impl ImageShape {
    pub fn new(position: Point) -> Self {
        Self {
            base: ShapeBase::new(position, Size::new(DEFAULT_SIZE, DEFAULT_SIZE)),
            image: String::new(),
            alt: None,
            stroke: Some(colors::BLACK.to_string()),
            stroke_width: Some(DEFAULT_IMAGE_STROKE_WIDTH),
        }
    }
}
