//! Small numeric helpers shared by the editor and the renderer.

use kurbo::Point;
use thiserror::Error;

/// Misuse of a geometry helper. These are programmer errors and are
/// reported instead of being coerced into a value.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum GeometryError {
    #[error("value, min and max must all be numbers")]
    NotANumber,
    #[error("min ({min}) must be less than max ({max})")]
    EmptyRange { min: f64, max: f64 },
}

/// Normalize an angle in degrees into `[0, 360)`.
///
/// Negative remainders are wrapped by adding 360, so `-10` becomes `350`
/// and `360` becomes `0`.
pub fn absolute_rotation(rotation: f64) -> f64 {
    let val = rotation % 360.0;
    if val < 0.0 {
        let wrapped = 360.0 + val;
        // Tiny negative remainders round up to exactly 360.
        if wrapped >= 360.0 { 0.0 } else { wrapped }
    } else {
        // Adding +0.0 turns a -0.0 remainder into 0.0.
        val + 0.0
    }
}

/// Clamp `value` into `[min, max]`, returning the nearest bound when it
/// falls outside.
pub fn clamp(value: f64, min: f64, max: f64) -> Result<f64, GeometryError> {
    if value.is_nan() || min.is_nan() || max.is_nan() {
        return Err(GeometryError::NotANumber);
    }
    if min >= max {
        return Err(GeometryError::EmptyRange { min, max });
    }
    if value < min {
        return Ok(min);
    }
    if value > max {
        return Ok(max);
    }
    Ok(value)
}

/// Round both coordinates of a point to the nearest integer.
pub fn round_point(point: Point) -> Point {
    Point::new(point.x.round(), point.y.round())
}
