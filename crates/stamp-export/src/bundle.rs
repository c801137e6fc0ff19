//! The staging directory a render works from.

use crate::error::{ExportError, ExportResult};
use stamp_core::CanvasData;
use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

/// Directory name of the bundle inside the work directory.
pub const BUNDLE_DIR: &str = "build";
const CANVAS_FILE: &str = "canvas.json";
const IMAGES_DIR: &str = "images";

/// Prepared render bundle: the canvas to render plus a cache of fetched
/// image sources.
#[derive(Debug, Clone)]
pub struct RenderBundle {
    dir: PathBuf,
}

impl RenderBundle {
    /// Stage `canvas` under `work_dir`.
    ///
    /// An existing bundle is rebuilt from scratch unless `reuse` is set, in
    /// which case its image cache is kept and only the canvas is replaced.
    pub fn prepare(work_dir: &Path, canvas: &CanvasData, reuse: bool) -> ExportResult<Self> {
        let dir = work_dir.join(BUNDLE_DIR);
        if dir.exists() && reuse {
            log::info!("Render bundle already exists, skipping build");
        } else {
            if dir.exists() {
                fs::remove_dir_all(&dir)
                    .map_err(|e| ExportError::Setup(format!("{}: {}", dir.display(), e)))?;
            }
            log::info!("Preparing render bundle in {}", dir.display());
        }
        fs::create_dir_all(dir.join(IMAGES_DIR))
            .map_err(|e| ExportError::Setup(format!("{}: {}", dir.display(), e)))?;
        let dir = dir
            .canonicalize()
            .map_err(|e| ExportError::Setup(format!("{}: {}", dir.display(), e)))?;

        let bundle = Self { dir };
        let json = canvas
            .to_json()
            .map_err(|e| ExportError::Setup(format!("Failed to serialize canvas: {}", e)))?;
        fs::write(bundle.canvas_path(), json)?;
        log::info!("Render bundle is ready");
        Ok(bundle)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn canvas_path(&self) -> PathBuf {
        self.dir.join(CANVAS_FILE)
    }

    pub fn images_dir(&self) -> PathBuf {
        self.dir.join(IMAGES_DIR)
    }

    /// Canvas staged for the viewer.
    pub fn read_canvas(&self) -> ExportResult<CanvasData> {
        let json = fs::read_to_string(self.canvas_path())?;
        CanvasData::from_json(&json)
            .map_err(|e| ExportError::Setup(format!("Staged canvas is unreadable: {}", e)))
    }

    /// Cache file for an image source URL.
    pub fn cache_path(&self, source: &str) -> PathBuf {
        cache_path(&self.images_dir(), source)
    }

    /// Remove the bundle staged under `work_dir`, if any.
    pub fn discard(work_dir: &Path) -> ExportResult<()> {
        let dir = work_dir.join(BUNDLE_DIR);
        if dir.exists() {
            log::info!("Cleaning up...");
            fs::remove_dir_all(&dir)?;
        }
        Ok(())
    }
}

pub(crate) fn cache_path(images_dir: &Path, source: &str) -> PathBuf {
    let mut hasher = DefaultHasher::new();
    source.hash(&mut hasher);
    images_dir.join(format!("{:016x}", hasher.finish()))
}
