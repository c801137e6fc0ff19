//! Colour values as they appear in canvas data.
//!
//! Shapes carry CSS colour strings so the exchange format stays readable
//! by the host application. Renderers convert them with [`parse`].

use peniko::Color;

pub const BLACK: &str = "black";
pub const WHITE: &str = "white";
pub const TRANSPARENT: &str = "transparent";

/// Parse a CSS colour string (`"black"`, `"#ff000080"`, `"rgb(0 0 0)"`, ...).
///
/// Returns `None` for empty or unparseable input.
pub fn parse(value: &str) -> Option<Color> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    match peniko::color::parse_color(value) {
        Ok(dynamic) => Some(dynamic.to_alpha_color()),
        Err(e) => {
            log::debug!("Ignoring unparseable colour {:?}: {:?}", value, e);
            None
        }
    }
}

/// Parse a colour and scale its alpha by `opacity` (clamped to `[0, 1]`).
///
/// Returns `None` when the result would be fully transparent.
pub fn parse_with_opacity(value: &str, opacity: f64) -> Option<[u8; 4]> {
    let color = parse(value)?;
    let rgba = color.to_rgba8();
    let alpha = (rgba.a as f64 * opacity.clamp(0.0, 1.0)).round() as u8;
    if alpha == 0 {
        return None;
    }
    Some([rgba.r, rgba.g, rgba.b, alpha])
}
