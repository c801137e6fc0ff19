//! Parsing of command-line input.

use crate::error::{ExportError, ExportResult};
use stamp_core::CanvasData;
use std::path::Path;

/// Parse `--input`: inline canvas JSON, or the path of a file holding it.
///
/// Inline JSON wins when the value parses; otherwise the value is tried as
/// a path.
pub fn parse_input(raw: &str) -> ExportResult<CanvasData> {
    if let Ok(canvas) = CanvasData::from_json(raw) {
        return Ok(canvas);
    }
    let path = Path::new(raw);
    if path.is_file() {
        let contents = std::fs::read_to_string(path)?;
        if let Ok(canvas) = CanvasData::from_json(&contents) {
            log::debug!("Read canvas data from {}", path.display());
            return Ok(canvas);
        }
    }
    Err(ExportError::InvalidInput(raw.to_string()))
}

/// Parse `--scale-factor`. Must be a finite number greater than zero.
pub fn parse_scale_factor(raw: &str) -> ExportResult<f64> {
    match raw.trim().parse::<f64>() {
        Ok(scale) if scale.is_finite() && scale > 0.0 => Ok(scale),
        _ => Err(ExportError::InvalidScaleFactor(raw.to_string())),
    }
}
