//! Text shape.

use super::ShapeBase;
use super::basic::DEFAULT_SIZE;
use crate::colors;
use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TEXT: &str = "Text";
pub const DEFAULT_FONT_SIZE: f64 = 18.0;

fn default_font_size() -> f64 {
    DEFAULT_FONT_SIZE
}

/// A block of text laid out inside the shape's box.
///
/// An absent `fill` paints the glyphs black.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextShape {
    #[serde(flatten)]
    pub base: ShapeBase,
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
}

impl TextShape {
    pub fn new(position: Point) -> Self {
        Self {
            base: ShapeBase::new(position, Size::new(DEFAULT_SIZE, DEFAULT_SIZE)),
            text: DEFAULT_TEXT.to_string(),
            font_size: DEFAULT_FONT_SIZE,
            fill: None,
            stroke: None,
            stroke_width: None,
        }
    }

    /// Colour used for the glyphs.
    pub fn fill_or_default(&self) -> &str {
        self.fill.as_deref().unwrap_or(colors::BLACK)
    }
}
