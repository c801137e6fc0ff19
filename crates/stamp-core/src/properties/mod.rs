//! Properties panel for the selected shape.
//!
//! [`PropertiesEditor::panel`] describes which controls to show for a
//! shape; [`PropertiesEditor::edit`] applies a batch of typed edits to a
//! copy of it. Neither touches canvas state.

mod editors;
mod file_editor;

pub use editors::{
    EditorKind, fraction_to_percent, parse_percent, parse_unit, percent_to_fraction,
};
pub use file_editor::{FileEditOutcome, FileEditor, FileEditorError};

use crate::colors;
use crate::geometry::absolute_rotation;
use crate::shapes::{Shape, ShapeId, ShapeKind};

/// Font size range offered by the text editor.
pub const FONT_SIZE_RANGE: (f64, f64) = (8.0, 88.0);
/// Alt text used when the field is cleared.
pub const DEFAULT_ALT: &str = "image";

/// Property addressed by a control or an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyField {
    X,
    Y,
    Width,
    Height,
    Rotation,
    Opacity,
    Fill,
    Stroke,
    StrokeWidth,
    Text,
    FontSize,
    Alt,
    Image,
}

/// Current value shown by a control.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Number(f64),
    Colour(Option<String>),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyControl {
    pub label: &'static str,
    pub field: PropertyField,
    pub editor: EditorKind,
    pub value: PropertyValue,
}

impl PropertyControl {
    fn new(
        label: &'static str,
        field: PropertyField,
        editor: EditorKind,
        value: PropertyValue,
    ) -> Self {
        Self {
            label,
            field,
            editor,
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyGroup {
    pub title: &'static str,
    pub controls: Vec<PropertyControl>,
}

/// Everything the properties panel shows for one shape.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyPanel {
    pub shape_id: ShapeId,
    pub kind: ShapeKind,
    pub groups: Vec<PropertyGroup>,
}

impl PropertyPanel {
    pub fn group(&self, title: &str) -> Option<&PropertyGroup> {
        self.groups.iter().find(|g| g.title == title)
    }

    pub fn control(&self, field: PropertyField) -> Option<&PropertyControl> {
        self.groups
            .iter()
            .flat_map(|g| g.controls.iter())
            .find(|c| c.field == field)
    }
}

/// A single typed property change.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyEdit {
    X(f64),
    Y(f64),
    Width(f64),
    Height(f64),
    /// Degrees; normalized into `[0, 360)`.
    Rotation(f64),
    /// Percentage; truncated, clamped into `[0, 100]`, stored as a fraction.
    Opacity(f64),
    /// `None` resets to black.
    Fill(Option<String>),
    /// `None` resets to black.
    Stroke(Option<String>),
    StrokeWidth(f64),
    Text(String),
    FontSize(f64),
    /// `None` resets to the default alt text.
    Alt(Option<String>),
    Image(String),
}

impl PropertyEdit {
    pub fn field(&self) -> PropertyField {
        match self {
            PropertyEdit::X(_) => PropertyField::X,
            PropertyEdit::Y(_) => PropertyField::Y,
            PropertyEdit::Width(_) => PropertyField::Width,
            PropertyEdit::Height(_) => PropertyField::Height,
            PropertyEdit::Rotation(_) => PropertyField::Rotation,
            PropertyEdit::Opacity(_) => PropertyField::Opacity,
            PropertyEdit::Fill(_) => PropertyField::Fill,
            PropertyEdit::Stroke(_) => PropertyField::Stroke,
            PropertyEdit::StrokeWidth(_) => PropertyField::StrokeWidth,
            PropertyEdit::Text(_) => PropertyField::Text,
            PropertyEdit::FontSize(_) => PropertyField::FontSize,
            PropertyEdit::Alt(_) => PropertyField::Alt,
            PropertyEdit::Image(_) => PropertyField::Image,
        }
    }
}

/// Builds the properties panel and applies its edits.
#[derive(Debug, Clone)]
pub struct PropertiesEditor {
    accept: Vec<String>,
}

impl Default for PropertiesEditor {
    fn default() -> Self {
        Self::new(vec!["image/*".to_string()])
    }
}

impl PropertiesEditor {
    /// `accept` is the media-type allow-list of the image file control.
    pub fn new(accept: Vec<String>) -> Self {
        Self { accept }
    }

    /// Panel for the selected shape, or `None` when nothing is selected.
    pub fn panel(&self, selected: Option<&Shape>) -> Option<PropertyPanel> {
        let shape = selected?;
        let mut groups = vec![layout_group(shape), appearance_group(shape)];
        match shape {
            Shape::Rect(_) | Shape::Circle(_) => {}
            Shape::Text(text) => groups.push(PropertyGroup {
                title: "Text",
                controls: vec![
                    PropertyControl::new(
                        "Content",
                        PropertyField::Text,
                        EditorKind::Text,
                        PropertyValue::Text(text.text.clone()),
                    ),
                    PropertyControl::new(
                        "aA",
                        PropertyField::FontSize,
                        EditorKind::unit_range("px", FONT_SIZE_RANGE.0, FONT_SIZE_RANGE.1),
                        PropertyValue::Number(text.font_size),
                    ),
                ],
            }),
            Shape::Image(image) => groups.push(PropertyGroup {
                title: "Image",
                controls: vec![
                    PropertyControl::new(
                        "Alt",
                        PropertyField::Alt,
                        EditorKind::Text,
                        PropertyValue::Text(image.alt.clone().unwrap_or_default()),
                    ),
                    PropertyControl::new(
                        "Source",
                        PropertyField::Image,
                        EditorKind::File {
                            accept: self.accept.clone(),
                        },
                        PropertyValue::Text(image.image.clone()),
                    ),
                ],
            }),
        }
        Some(PropertyPanel {
            shape_id: shape.id().clone(),
            kind: shape.kind(),
            groups,
        })
    }

    /// Apply `edits` in order to a copy of the selected shape.
    ///
    /// Edits that do not apply to the shape's variant are skipped.
    pub fn edit(&self, selected: Option<&Shape>, edits: &[PropertyEdit]) -> Option<Shape> {
        let mut shape = selected?.clone();
        for edit in edits {
            if !apply_edit(&mut shape, edit) {
                log::debug!(
                    "Ignoring {:?} edit on {} shape {}",
                    edit.field(),
                    shape.kind().as_str(),
                    shape.id()
                );
            }
        }
        Some(shape)
    }
}

fn layout_group(shape: &Shape) -> PropertyGroup {
    let base = shape.base();
    let number = PropertyValue::Number;
    PropertyGroup {
        title: "Layout",
        controls: vec![
            PropertyControl::new("X", PropertyField::X, EditorKind::unit("px"), number(base.x)),
            PropertyControl::new("Y", PropertyField::Y, EditorKind::unit("px"), number(base.y)),
            PropertyControl::new(
                "w",
                PropertyField::Width,
                EditorKind::unit("px"),
                number(base.width),
            ),
            PropertyControl::new(
                "h",
                PropertyField::Height,
                EditorKind::unit("px"),
                number(base.height),
            ),
            PropertyControl::new(
                "r",
                PropertyField::Rotation,
                EditorKind::unit_range("°", 0.0, 360.0),
                number(base.rotation),
            ),
        ],
    }
}

fn appearance_group(shape: &Shape) -> PropertyGroup {
    let opacity = PropertyControl::new(
        "Opacity",
        PropertyField::Opacity,
        EditorKind::Percent,
        PropertyValue::Number(fraction_to_percent(shape.base().opacity)),
    );
    let colour = |label, field, value: Option<&String>| {
        PropertyControl::new(
            label,
            field,
            EditorKind::Colour,
            PropertyValue::Colour(value.cloned()),
        )
    };
    let border_width = |value: f64| {
        PropertyControl::new(
            "Border width",
            PropertyField::StrokeWidth,
            EditorKind::unit("px"),
            PropertyValue::Number(value),
        )
    };

    let controls = match shape {
        Shape::Rect(basic) | Shape::Circle(basic) => vec![
            opacity,
            colour("Fill", PropertyField::Fill, basic.fill.as_ref()),
            colour("Border", PropertyField::Stroke, basic.stroke.as_ref()),
            border_width(basic.stroke_width),
        ],
        Shape::Text(text) => vec![
            opacity,
            colour("Fill", PropertyField::Fill, text.fill.as_ref()),
            colour("Border", PropertyField::Stroke, text.stroke.as_ref()),
            border_width(text.stroke_width.unwrap_or(0.0)),
        ],
        Shape::Image(image) => vec![
            opacity,
            colour("Border", PropertyField::Stroke, image.stroke.as_ref()),
            border_width(image.stroke_width.unwrap_or(0.0)),
        ],
    };
    PropertyGroup {
        title: "Appearance",
        controls,
    }
}

fn colour_or_black(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| colors::BLACK.to_string())
}

/// Apply one edit. Returns `false` when it does not apply to the variant.
fn apply_edit(shape: &mut Shape, edit: &PropertyEdit) -> bool {
    match edit {
        PropertyEdit::X(v) => shape.base_mut().x = *v,
        PropertyEdit::Y(v) => shape.base_mut().y = *v,
        PropertyEdit::Width(v) => shape.base_mut().width = *v,
        PropertyEdit::Height(v) => shape.base_mut().height = *v,
        PropertyEdit::Rotation(v) => shape.base_mut().rotation = absolute_rotation(*v),
        PropertyEdit::Opacity(percent) => {
            shape.base_mut().opacity = percent_to_fraction(*percent)
        }
        PropertyEdit::Fill(value) => match shape {
            Shape::Rect(s) | Shape::Circle(s) => s.fill = Some(colour_or_black(value)),
            Shape::Text(s) => s.fill = Some(colour_or_black(value)),
            Shape::Image(_) => return false,
        },
        PropertyEdit::Stroke(value) => match shape {
            Shape::Rect(s) | Shape::Circle(s) => s.stroke = Some(colour_or_black(value)),
            Shape::Text(s) => s.stroke = Some(colour_or_black(value)),
            Shape::Image(s) => s.stroke = Some(colour_or_black(value)),
        },
        PropertyEdit::StrokeWidth(v) => match shape {
            Shape::Rect(s) | Shape::Circle(s) => s.stroke_width = *v,
            Shape::Text(s) => s.stroke_width = Some(*v),
            Shape::Image(s) => s.stroke_width = Some(*v),
        },
        PropertyEdit::Text(value) => match shape {
            Shape::Text(s) => s.text = value.clone(),
            Shape::Rect(_) | Shape::Circle(_) | Shape::Image(_) => return false,
        },
        PropertyEdit::FontSize(v) => match shape {
            Shape::Text(s) => s.font_size = *v,
            Shape::Rect(_) | Shape::Circle(_) | Shape::Image(_) => return false,
        },
        PropertyEdit::Alt(value) => match shape {
            Shape::Image(s) => {
                s.alt = Some(value.clone().unwrap_or_else(|| DEFAULT_ALT.to_string()))
            }
            Shape::Rect(_) | Shape::Circle(_) | Shape::Text(_) => return false,
        },
        PropertyEdit::Image(reference) => match shape {
            Shape::Image(s) => s.image = reference.clone(),
            Shape::Rect(_) | Shape::Circle(_) | Shape::Text(_) => return false,
        },
    }
    true
}
