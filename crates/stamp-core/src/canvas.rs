//! Canvas data: the document exchanged with the host application.

use crate::shapes::{Shape, ShapeId};
use kurbo::Size;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// A canvas dimension: a JSON number, or a string holding one.
fn dimension(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

fn deserialize_dimension<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => dimension(&value)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid dimension {}", value))),
    }
}

/// Shapes stored without an id get one derived from their index, so the
/// same document always yields the same ids.
fn deserialize_shapes<'de, D>(deserializer: D) -> Result<Vec<Shape>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut shapes = Vec::<Shape>::deserialize(deserializer)?;
    let mut taken: HashSet<ShapeId> = shapes
        .iter()
        .map(|s| s.id().clone())
        .filter(|id| !id.is_unassigned())
        .collect();
    for (index, shape) in shapes.iter_mut().enumerate() {
        if !shape.id().is_unassigned() {
            continue;
        }
        let mut id = ShapeId::from(format!("shape-{}", index));
        let mut suffix = 1;
        while taken.contains(&id) {
            id = ShapeId::from(format!("shape-{}-{}", index, suffix));
            suffix += 1;
        }
        taken.insert(id.clone());
        shape.base_mut().id = id;
    }
    Ok(shapes)
}

/// The full stamp document.
///
/// `shapes` is in paint order. Every editing operation here is
/// copy-on-write: the receiver is left untouched and a new value is
/// returned for the host to store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanvasData {
    #[serde(
        default,
        deserialize_with = "deserialize_dimension",
        skip_serializing_if = "Option::is_none"
    )]
    pub height: Option<f64>,
    #[serde(
        default,
        deserialize_with = "deserialize_dimension",
        skip_serializing_if = "Option::is_none"
    )]
    pub width: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_shapes")]
    pub shapes: Vec<Shape>,
}

impl CanvasData {
    /// Create empty canvas data with a fixed size.
    pub fn with_dimensions(width: f64, height: f64) -> Self {
        Self {
            height: Some(height),
            width: Some(width),
            shapes: Vec::new(),
        }
    }

    /// Both dimensions, if set.
    pub fn size(&self) -> Option<Size> {
        match (self.width, self.height) {
            (Some(w), Some(h)) => Some(Size::new(w, h)),
            _ => None,
        }
    }

    pub fn find(&self, id: &ShapeId) -> Option<&Shape> {
        self.shapes.iter().find(|s| s.id() == id)
    }

    pub fn position(&self, id: &ShapeId) -> Option<usize> {
        self.shapes.iter().position(|s| s.id() == id)
    }

    /// Image shapes in paint order.
    pub fn image_shapes(&self) -> impl Iterator<Item = &Shape> {
        self.shapes.iter().filter(|s| s.is_image())
    }

    pub fn with_shape_appended(&self, shape: Shape) -> Self {
        let mut next = self.clone();
        next.shapes.push(shape);
        next
    }

    /// Replace the shape with the same id, keeping its index.
    ///
    /// An unknown id yields an unchanged copy.
    pub fn with_shape_replaced(&self, shape: Shape) -> Self {
        let mut next = self.clone();
        match next.position(shape.id()) {
            Some(index) => next.shapes[index] = shape,
            None => log::debug!("No shape with id {} to replace", shape.id()),
        }
        next
    }

    pub fn with_shape_removed(&self, id: &ShapeId) -> Self {
        let mut next = self.clone();
        next.shapes.retain(|s| s.id() != id);
        next
    }

    pub fn with_size(&self, width: f64, height: f64) -> Self {
        let mut next = self.clone();
        next.width = Some(width);
        next.height = Some(height);
        next
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Check the shape of an export request body before it is decoded:
    /// `height` and `width` must be numbers (or numeric strings) and
    /// `shapes` an array.
    pub fn validate_export_payload(value: &Value) -> bool {
        let is_number = |key: &str| value.get(key).and_then(dimension).is_some();
        is_number("height")
            && is_number("width")
            && value.get("shapes").is_some_and(Value::is_array)
    }
}
