//! Renderer trait abstraction.

use peniko::Color;
use stamp_core::CanvasData;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Initialization failed: {0}")]
    InitFailed(String),
    #[error("Render failed: {0}")]
    RenderFailed(String),
    #[error("Surface error: {0}")]
    Surface(String),
    #[error("Encoding failed: {0}")]
    Encode(String),
}

/// Largest surface a render may allocate, in pixels.
pub const MAX_SURFACE_PIXELS: u64 = 64 * 1024 * 1024;

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Result of rendering: straight-alpha RGBA pixels and their dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    /// RGBA pixel data (4 bytes per pixel).
    pub rgba_data: Vec<u8>,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
}

impl RenderedImage {
    /// RGBA value of the pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y * self.width + x) * 4) as usize;
        let px = self.rgba_data.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Encode as PNG bytes.
    pub fn to_png(&self) -> RenderResult<Vec<u8>> {
        let mut png_data = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut png_data, self.width, self.height);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);

            let mut writer = encoder
                .write_header()
                .map_err(|e| RendererError::Encode(format!("PNG header: {}", e)))?;
            writer
                .write_image_data(&self.rgba_data)
                .map_err(|e| RendererError::Encode(format!("PNG data: {}", e)))?;
        }
        Ok(png_data)
    }
}

/// Context for rendering one stamp.
pub struct RenderContext<'a> {
    /// The canvas to render.
    pub canvas: &'a CanvasData,
    /// Loaded image bytes keyed by image reference.
    pub images: &'a HashMap<String, Arc<Vec<u8>>>,
    /// Output pixels per canvas unit.
    pub scale_factor: f64,
    /// Background color. Transparent by default.
    pub background_color: Color,
}

impl<'a> RenderContext<'a> {
    /// Create a new render context.
    pub fn new(canvas: &'a CanvasData, images: &'a HashMap<String, Arc<Vec<u8>>>) -> Self {
        Self {
            canvas,
            images,
            scale_factor: 1.0,
            background_color: Color::TRANSPARENT,
        }
    }

    /// Set the scale factor.
    pub fn with_scale_factor(mut self, scale_factor: f64) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    /// Set the background color.
    pub fn with_background(mut self, color: Color) -> Self {
        self.background_color = color;
        self
    }

    /// Output size in pixels, or an error when the canvas has no usable
    /// size, the scale factor is not positive, or the result would exceed
    /// [`MAX_SURFACE_PIXELS`].
    pub fn pixel_size(&self) -> RenderResult<(u32, u32)> {
        if !self.scale_factor.is_finite() || self.scale_factor <= 0.0 {
            return Err(RendererError::Surface(format!(
                "Invalid scale factor {}",
                self.scale_factor
            )));
        }
        let size = self
            .canvas
            .size()
            .ok_or_else(|| RendererError::Surface("Canvas has no dimensions".to_string()))?;
        if size.width < 1.0 || size.height < 1.0 {
            return Err(RendererError::Surface(format!(
                "Canvas too small: {}x{}",
                size.width, size.height
            )));
        }
        let width = (size.width * self.scale_factor).ceil();
        let height = (size.height * self.scale_factor).ceil();
        if width * height > MAX_SURFACE_PIXELS as f64 {
            return Err(RendererError::Surface(format!(
                "Surface too large: {}x{} pixels",
                width, height
            )));
        }
        Ok((width as u32, height as u32))
    }
}

/// Trait for rendering backends.
pub trait Renderer: Send {
    /// Rasterize the canvas described by `ctx`.
    fn render(&mut self, ctx: &RenderContext) -> RenderResult<RenderedImage>;

    /// Get the background color (for clearing).
    fn background_color(&self, ctx: &RenderContext) -> Color {
        ctx.background_color
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_size_scales_up() {
        let canvas = CanvasData::with_dimensions(200.5, 100.0);
        let images = HashMap::new();
        let ctx = RenderContext::new(&canvas, &images).with_scale_factor(2.0);
        assert_eq!(ctx.pixel_size().unwrap(), (401, 200));
    }

    #[test]
    fn test_pixel_size_rejects_bad_input() {
        let images = HashMap::new();
        let missing = CanvasData::default();
        assert!(RenderContext::new(&missing, &images).pixel_size().is_err());

        let canvas = CanvasData::with_dimensions(10.0, 10.0);
        let ctx = RenderContext::new(&canvas, &images).with_scale_factor(0.0);
        assert!(matches!(ctx.pixel_size(), Err(RendererError::Surface(_))));
    }

    #[test]
    fn test_pixel_size_rejects_huge_surface() {
        let images = HashMap::new();
        let canvas = CanvasData::with_dimensions(40000.0, 40000.0);
        let ctx = RenderContext::new(&canvas, &images).with_scale_factor(1.0);
        assert!(matches!(ctx.pixel_size(), Err(RendererError::Surface(_))));

        let canvas = CanvasData::with_dimensions(4096.0, 4096.0);
        let ctx = RenderContext::new(&canvas, &images).with_scale_factor(2.0);
        assert_eq!(ctx.pixel_size().unwrap(), (8192, 8192));
        assert!(ctx.with_scale_factor(3.0).pixel_size().is_err());
    }

    #[test]
    fn test_png_signature() {
        let image = RenderedImage {
            rgba_data: vec![255; 2 * 2 * 4],
            width: 2,
            height: 2,
        };
        let png = image.to_png().unwrap();
        assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a]);
        assert_eq!(image.pixel(1, 1), Some([255, 255, 255, 255]));
        assert_eq!(image.pixel(2, 0), None);
    }
}
