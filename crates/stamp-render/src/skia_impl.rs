//! tiny-skia based renderer implementation.

use crate::renderer::{RenderContext, RenderResult, RenderedImage, Renderer, RendererError};
use cosmic_text::{Attrs, Buffer, Family, FontSystem, Metrics, Shaping, SwashCache};
use stamp_core::colors;
use stamp_core::{BasicShape, ImageShape, Shape, ShapeBase, TextShape};
use std::collections::HashMap;
use tiny_skia::{
    FillRule, FilterQuality, Paint, PathBuilder, Pixmap, PixmapPaint, Rect, Stroke, Transform,
};

/// Line height as a multiple of the font size.
const LINE_HEIGHT: f32 = 1.0;

/// CPU renderer producing straight-alpha RGBA pixels.
pub struct SkiaRenderer {
    /// Font system for text rendering (system fonts, loaded once).
    font_system: FontSystem,
    /// Glyph rasterization cache.
    swash_cache: SwashCache,
    /// Decoded images keyed by image reference. `None` marks bytes that
    /// failed to decode.
    image_cache: HashMap<String, Option<Pixmap>>,
}

impl Default for SkiaRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl SkiaRenderer {
    pub fn new() -> Self {
        Self {
            font_system: FontSystem::new(),
            swash_cache: SwashCache::new(),
            image_cache: HashMap::new(),
        }
    }

    /// Transform from a shape's local space into output pixels: translate
    /// to the shape's position, then rotate about it.
    fn shape_transform(base: &ShapeBase, scale: f32) -> Transform {
        Transform::from_scale(scale, scale)
            .pre_translate(base.x as f32, base.y as f32)
            .pre_rotate(base.rotation as f32)
    }

    fn paint(color: &str, opacity: f64) -> Option<Paint<'static>> {
        let [r, g, b, a] = colors::parse_with_opacity(color, opacity)?;
        let mut paint = Paint::default();
        paint.set_color_rgba8(r, g, b, a);
        paint.anti_alias = true;
        Some(paint)
    }

    fn fill_and_stroke(
        pixmap: &mut Pixmap,
        path: &tiny_skia::Path,
        fill: Option<&str>,
        stroke: Option<&str>,
        stroke_width: f64,
        opacity: f64,
        transform: Transform,
    ) {
        if let Some(paint) = fill.and_then(|c| Self::paint(c, opacity)) {
            pixmap.fill_path(path, &paint, FillRule::Winding, transform, None);
        }
        if stroke_width <= 0.0 {
            return;
        }
        if let Some(paint) = stroke.and_then(|c| Self::paint(c, opacity)) {
            let stroke = Stroke {
                width: stroke_width as f32,
                ..Default::default()
            };
            pixmap.stroke_path(path, &paint, &stroke, transform, None);
        }
    }

    fn render_rect(&self, pixmap: &mut Pixmap, rect: &BasicShape, transform: Transform) {
        let base = &rect.base;
        let Some(bounds) = Rect::from_xywh(0.0, 0.0, base.width as f32, base.height as f32) else {
            log::debug!("Skipping degenerate rect {}", base.id);
            return;
        };
        let path = PathBuilder::from_rect(bounds);
        Self::fill_and_stroke(
            pixmap,
            &path,
            rect.fill.as_deref(),
            rect.stroke.as_deref(),
            rect.stroke_width,
            base.opacity,
            transform,
        );
    }

    fn render_circle(&self, pixmap: &mut Pixmap, circle: &BasicShape, transform: Transform) {
        let base = &circle.base;
        let (w, h) = (base.width as f32, base.height as f32);
        let Some(path) = Rect::from_xywh(-w / 2.0, -h / 2.0, w, h).and_then(PathBuilder::from_oval)
        else {
            log::debug!("Skipping degenerate circle {}", base.id);
            return;
        };
        Self::fill_and_stroke(
            pixmap,
            &path,
            circle.fill.as_deref(),
            circle.stroke.as_deref(),
            circle.stroke_width,
            base.opacity,
            transform,
        );
    }

    /// Lay the text out at output resolution and fill each glyph run.
    fn render_text(&mut self, pixmap: &mut Pixmap, text: &TextShape, scale: f32) {
        let base = &text.base;
        if text.text.is_empty() || text.font_size <= 0.0 {
            return;
        }
        let Some([r, g, b, a]) = colors::parse_with_opacity(text.fill_or_default(), base.opacity)
        else {
            return;
        };

        let size = text.font_size as f32 * scale;
        let metrics = Metrics::new(size, size * LINE_HEIGHT);
        let Self {
            font_system,
            swash_cache,
            ..
        } = self;
        let mut buffer = Buffer::new(font_system, metrics);
        let width = (base.width > 0.0).then(|| base.width as f32 * scale);
        buffer.set_size(font_system, width, None);
        let attrs = Attrs::new().family(Family::SansSerif);
        buffer.set_text(font_system, &text.text, &attrs, Shaping::Advanced);
        buffer.shape_until_scroll(font_system, false);

        // Glyph coordinates are already in output pixels.
        let transform = Self::shape_transform(base, scale).pre_scale(1.0 / scale, 1.0 / scale);
        let color = cosmic_text::Color::rgba(r, g, b, a);
        buffer.draw(font_system, swash_cache, color, |x, y, w, h, color| {
            if color.a() == 0 {
                return;
            }
            let Some(rect) = Rect::from_xywh(x as f32, y as f32, w as f32, h as f32) else {
                return;
            };
            let mut paint = Paint::default();
            paint.set_color_rgba8(color.r(), color.g(), color.b(), color.a());
            pixmap.fill_rect(rect, &paint, transform, None);
        });
    }

    fn decoded_image(&mut self, reference: &str, ctx: &RenderContext) -> Option<&Pixmap> {
        if !self.image_cache.contains_key(reference) {
            let decoded = ctx.images.get(reference).and_then(|bytes| decode(reference, bytes));
            self.image_cache.insert(reference.to_string(), decoded);
        }
        self.image_cache.get(reference).and_then(Option::as_ref)
    }

    fn render_image(
        &mut self,
        pixmap: &mut Pixmap,
        image: &ImageShape,
        ctx: &RenderContext,
        transform: Transform,
    ) {
        let base = &image.base;
        let Some(bounds) = Rect::from_xywh(0.0, 0.0, base.width as f32, base.height as f32) else {
            log::debug!("Skipping degenerate image {}", base.id);
            return;
        };

        // A missing or undecodable bitmap leaves only the border.
        if let Some(decoded) = self.decoded_image(&image.image, ctx) {
            let sx = base.width as f32 / decoded.width() as f32;
            let sy = base.height as f32 / decoded.height() as f32;
            let paint = PixmapPaint {
                opacity: base.opacity.clamp(0.0, 1.0) as f32,
                quality: FilterQuality::Bilinear,
                ..Default::default()
            };
            pixmap.draw_pixmap(0, 0, decoded.as_ref(), &paint, transform.pre_scale(sx, sy), None);
        }

        let path = PathBuilder::from_rect(bounds);
        Self::fill_and_stroke(
            pixmap,
            &path,
            None,
            image.stroke.as_deref(),
            image.stroke_width.unwrap_or_default(),
            base.opacity,
            transform,
        );
    }
}

impl Renderer for SkiaRenderer {
    fn render(&mut self, ctx: &RenderContext) -> RenderResult<RenderedImage> {
        let (width, height) = ctx.pixel_size()?;
        let mut pixmap = Pixmap::new(width, height).ok_or_else(|| {
            RendererError::Surface(format!("Cannot allocate {}x{} pixmap", width, height))
        })?;

        let bg = self.background_color(ctx).to_rgba8();
        pixmap.fill(tiny_skia::Color::from_rgba8(bg.r, bg.g, bg.b, bg.a));

        let scale = ctx.scale_factor as f32;
        for shape in &ctx.canvas.shapes {
            let transform = Self::shape_transform(shape.base(), scale);
            match shape {
                Shape::Rect(rect) => self.render_rect(&mut pixmap, rect, transform),
                Shape::Circle(circle) => self.render_circle(&mut pixmap, circle, transform),
                Shape::Text(text) => self.render_text(&mut pixmap, text, scale),
                Shape::Image(image) => self.render_image(&mut pixmap, image, ctx, transform),
            }
        }

        log::debug!(
            "Rendered {} shapes at {}x{}",
            ctx.canvas.shapes.len(),
            width,
            height
        );
        Ok(RenderedImage {
            rgba_data: demultiply(&pixmap),
            width,
            height,
        })
    }
}

/// Decode image bytes into a premultiplied pixmap.
fn decode(reference: &str, bytes: &[u8]) -> Option<Pixmap> {
    let decoded = match ::image::load_from_memory(bytes) {
        Ok(decoded) => decoded,
        Err(e) => {
            log::warn!("Failed to decode image {}: {}", reference, e);
            return None;
        }
    };
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut pixmap = Pixmap::new(width, height)?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(rgba.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = tiny_skia::ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Some(pixmap)
}

/// Convert premultiplied pixels to straight alpha for PNG.
fn demultiply(pixmap: &Pixmap) -> Vec<u8> {
    let mut data = Vec::with_capacity(pixmap.pixels().len() * 4);
    for pixel in pixmap.pixels() {
        let c = pixel.demultiply();
        data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    data
}
