//! The export protocol.
//!
//! Strictly sequential: validate, prepare the bundle, start the viewer,
//! poll its ready flag, locate the render target, rasterize, write. Cleanup
//! happens once, in [`run`], whatever the outcome.

use crate::bundle::RenderBundle;
use crate::error::{ExportError, ExportResult};
use crate::fetch::SourceFetcher;
use crate::input::parse_input;
use stamp_core::files::{DirectoryFileManager, FileManager};
use stamp_core::{Preloaded, StampViewer, ViewerConfig};
use stamp_render::{RenderContext, Renderer, SkiaRenderer};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

pub const DEFAULT_SCALE_FACTOR: f64 = 2.0;
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(30);
pub const READY_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Export configuration.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// PNG file to create. Must not exist yet.
    pub output: PathBuf,
    /// Canvas JSON, or the path of a file holding it.
    pub input: String,
    /// Reuse an existing render bundle.
    pub skip_build: bool,
    pub debug: bool,
    /// Accepted for compatibility. There is no browser to show.
    pub browser: bool,
    /// Restrict `file://` image sources to the bundle and files directories.
    pub sandbox: bool,
    pub scale_factor: f64,
    /// Remove the render bundle when done.
    pub cleanup: bool,
    /// Directory resolving opaque image references.
    pub files_dir: Option<PathBuf>,
    /// Where the render bundle is staged.
    pub work_dir: PathBuf,
    pub ready_timeout: Duration,
    pub settle_delay: Duration,
}

impl ExportOptions {
    pub fn new(output: impl Into<PathBuf>, input: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            input: input.into(),
            skip_build: false,
            debug: false,
            browser: false,
            sandbox: true,
            scale_factor: DEFAULT_SCALE_FACTOR,
            cleanup: true,
            files_dir: None,
            work_dir: std::env::temp_dir().join("stamp-export"),
            ready_timeout: DEFAULT_READY_TIMEOUT,
            settle_delay: ViewerConfig::default().settle_delay,
        }
    }

    pub fn with_work_dir(mut self, work_dir: PathBuf) -> Self {
        self.work_dir = work_dir;
        self
    }

    pub fn with_scale_factor(mut self, scale_factor: f64) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    fn validate(&self) -> ExportResult<()> {
        if !self.scale_factor.is_finite() || self.scale_factor <= 0.0 {
            return Err(ExportError::InvalidScaleFactor(self.scale_factor.to_string()));
        }
        if self.output.exists() {
            return Err(ExportError::OutputExists(self.output.clone()));
        }
        Ok(())
    }
}

/// What a successful export produced.
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    /// Image references that could not be loaded.
    pub missing_images: Vec<String>,
    pub elapsed: Duration,
}

/// Run one export and clean up afterwards. Returns the process exit code.
pub async fn run(options: &ExportOptions) -> i32 {
    let code = match export(options).await {
        Ok(report) => {
            log::info!(
                "Wrote {} ({}x{}) in {:.3}s",
                report.output.display(),
                report.width,
                report.height,
                report.elapsed.as_secs_f64()
            );
            0
        }
        Err(e) => {
            log::error!("Failed to create image: {}", e);
            e.exit_code()
        }
    };
    cleanup(options);
    code
}

fn cleanup(options: &ExportOptions) {
    if !options.cleanup {
        log::info!("Skipping cleanup");
        return;
    }
    if let Err(e) = RenderBundle::discard(&options.work_dir) {
        log::warn!("Failed to remove render bundle: {}", e);
    }
}

/// Render `options.input` into `options.output`. Leaves the bundle in
/// place; see [`run`].
pub async fn export(options: &ExportOptions) -> ExportResult<ExportReport> {
    let start = Instant::now();
    options.validate()?;
    if options.browser {
        log::warn!("--browser has no effect: rendering does not use a browser");
    }
    let canvas = parse_input(&options.input)?;
    if let Some(parent) = options.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let bundle = RenderBundle::prepare(&options.work_dir, &canvas, options.skip_build)?;
    let files = match &options.files_dir {
        Some(dir) => Some(Arc::new(DirectoryFileManager::new(dir.clone())?)),
        None => None,
    };
    let mut fetcher = SourceFetcher::new().with_cache_dir(bundle.images_dir());
    if options.sandbox {
        let mut roots = vec![bundle.dir().to_path_buf()];
        roots.extend(files.as_ref().map(|f| f.base_path().to_path_buf()));
        fetcher = fetcher.with_sandbox(roots);
    } else if options.debug {
        log::debug!("Sandbox disabled, file:// sources are unrestricted");
    }

    log::info!("Using scale factor {}", options.scale_factor);
    let viewer = StampViewer::new(
        bundle.read_canvas()?,
        ViewerConfig {
            settle_delay: options.settle_delay,
        },
    );
    let ready = Arc::new(AtomicBool::new(false));
    let task = {
        let ready = ready.clone();
        tokio::spawn(async move {
            let files = files.as_deref().map(|f| f as &dyn FileManager);
            let settled = AtomicBool::new(false);
            let preloaded = viewer
                .preload(files, &fetcher, || {
                    log::debug!("All images settled");
                    settled.store(true, Ordering::SeqCst);
                })
                .await;
            if settled.load(Ordering::SeqCst) {
                tokio::time::sleep(preloaded.settle_delay).await;
                ready.store(true, Ordering::SeqCst);
            }
            (viewer, preloaded)
        })
    };

    log::info!("Waiting for ready flag...");
    let waited = Instant::now();
    while !ready.load(Ordering::SeqCst) {
        if waited.elapsed() >= options.ready_timeout {
            task.abort();
            return Err(ExportError::Timeout(options.ready_timeout));
        }
        tokio::time::sleep(READY_POLL_INTERVAL).await;
    }
    let (viewer, preloaded) = task
        .await
        .map_err(|e| ExportError::Setup(format!("Viewer task failed: {}", e)))?;

    let Some(surface) = viewer.surface() else {
        return Err(ExportError::NoRenderTarget);
    };
    log::info!("Found render target {}x{}", surface.width, surface.height);

    let Preloaded { images, failed, .. } = preloaded;
    if !failed.is_empty() {
        log::warn!("{} image(s) could not be loaded", failed.len());
    }
    let scale_factor = options.scale_factor;
    if let Err(e) = RenderContext::new(viewer.canvas(), &images)
        .with_scale_factor(scale_factor)
        .pixel_size()
    {
        log::warn!("Unusable render target: {}", e);
        return Err(ExportError::NoRenderTarget);
    }
    let rendered = tokio::task::spawn_blocking(move || {
        let ctx = RenderContext::new(viewer.canvas(), &images).with_scale_factor(scale_factor);
        let image = SkiaRenderer::new().render(&ctx)?;
        let png = image.to_png()?;
        Ok::<_, ExportError>((image.width, image.height, png))
    })
    .await
    .map_err(|e| ExportError::Setup(format!("Render task failed: {}", e)))??;
    let (width, height, png) = rendered;

    tokio::fs::write(&options.output, png).await?;
    Ok(ExportReport {
        output: options.output.clone(),
        width,
        height,
        missing_images: failed,
        elapsed: start.elapsed(),
    })
}
