//! Stamp Render Library
//!
//! Renderer abstraction and implementations for stamps.
//! The default implementation rasterizes on the CPU with tiny-skia.

mod renderer;
mod skia_impl;

pub use renderer::{
    MAX_SURFACE_PIXELS, RenderContext, RenderResult, RenderedImage, Renderer, RendererError,
};
pub use skia_impl::SkiaRenderer;
