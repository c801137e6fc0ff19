//! Stamp Export Library
//!
//! Renders stored canvas data to a PNG file without a browser. The
//! pipeline mirrors a screen grab: prepare a render bundle, let the viewer
//! load every image, wait for its ready flag, then rasterize the render
//! target.

mod bundle;
mod error;
mod fetch;
mod input;
mod pipeline;

pub use bundle::RenderBundle;
pub use error::{ExportError, ExportResult};
pub use fetch::SourceFetcher;
pub use input::{parse_input, parse_scale_factor};
pub use pipeline::{
    DEFAULT_READY_TIMEOUT, DEFAULT_SCALE_FACTOR, ExportOptions, ExportReport, READY_POLL_INTERVAL,
    export, run,
};
