//! Loading image bytes from the URLs found in canvas data.

use crate::bundle::cache_path;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use stamp_core::files::{BoxFuture, FileError, FileResult, ImageLoader, ImageSource};
use std::path::{Path, PathBuf};

/// Fetches image sources for the export pipeline.
///
/// `http(s)` URLs are downloaded, `data:` URLs decoded and `file://` URLs
/// read from disk, limited to the sandbox roots when a sandbox is set.
/// `blob:` URLs only exist inside the editing session that created them
/// and are rejected. Remote and inline sources are cached on disk when a
/// cache directory is configured.
pub struct SourceFetcher {
    client: reqwest::Client,
    sandbox: Option<Vec<PathBuf>>,
    cache_dir: Option<PathBuf>,
}

impl SourceFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            sandbox: None,
            cache_dir: None,
        }
    }

    /// Only allow `file://` sources below `roots`.
    pub fn with_sandbox(mut self, roots: Vec<PathBuf>) -> Self {
        let roots = roots
            .into_iter()
            .filter_map(|root| match root.canonicalize() {
                Ok(root) => Some(root),
                Err(e) => {
                    log::warn!("Ignoring sandbox root {}: {}", root.display(), e);
                    None
                }
            })
            .collect();
        self.sandbox = Some(roots);
        self
    }

    pub fn with_cache_dir(mut self, dir: PathBuf) -> Self {
        self.cache_dir = Some(dir);
        self
    }

    pub fn is_sandboxed(&self) -> bool {
        self.sandbox.is_some()
    }

    async fn fetch_url(&self, url: &str) -> FileResult<Vec<u8>> {
        if let Some(path) = url.strip_prefix("file://") {
            return self.read_file(Path::new(path)).await;
        }
        if url.starts_with("blob:") {
            return Err(FileError::Unsupported(format!(
                "{} belongs to an editing session",
                url
            )));
        }
        if !(url.starts_with("data:") || url.starts_with("http://") || url.starts_with("https://"))
        {
            return Err(FileError::Unsupported(url.to_string()));
        }

        let cached = self.cache_dir.as_deref().map(|dir| cache_path(dir, url));
        if let Some(path) = &cached {
            if let Ok(bytes) = tokio::fs::read(path).await {
                log::debug!("Image cache hit for {}", path.display());
                return Ok(bytes);
            }
        }

        let bytes = match url.strip_prefix("data:") {
            Some(data) => decode_data_url(data)?,
            None => self.download(url).await?,
        };

        if let Some(path) = &cached {
            if let Err(e) = tokio::fs::write(path, &bytes).await {
                log::warn!("Failed to cache image {}: {}", path.display(), e);
            }
        }
        Ok(bytes)
    }

    async fn download(&self, url: &str) -> FileResult<Vec<u8>> {
        log::debug!("Downloading {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| FileError::Network(format!("{}: {}", url, e)))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| FileError::Network(format!("{}: {}", url, e)))?;
        Ok(bytes.to_vec())
    }

    async fn read_file(&self, path: &Path) -> FileResult<Vec<u8>> {
        let path = path
            .canonicalize()
            .map_err(|_| FileError::NotFound(path.display().to_string()))?;
        if let Some(roots) = &self.sandbox {
            if !roots.iter().any(|root| path.starts_with(root)) {
                return Err(FileError::Denied(format!(
                    "{} is outside the sandbox",
                    path.display()
                )));
            }
        }
        tokio::fs::read(&path)
            .await
            .map_err(|e| FileError::Io(format!("{}: {}", path.display(), e)))
    }
}

impl Default for SourceFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageLoader for SourceFetcher {
    fn load(&self, source: &ImageSource) -> BoxFuture<'_, FileResult<Vec<u8>>> {
        let source = source.clone();
        Box::pin(async move {
            match source {
                ImageSource::Bytes(bytes) => Ok(bytes.as_ref().clone()),
                ImageSource::Url(url) => self.fetch_url(&url).await,
            }
        })
    }
}

/// Decode the part of a `data:` URL after the scheme.
fn decode_data_url(data: &str) -> FileResult<Vec<u8>> {
    let (meta, payload) = data
        .split_once(',')
        .ok_or_else(|| FileError::Decode("data URL without payload".to_string()))?;
    if meta.ends_with(";base64") {
        STANDARD
            .decode(payload.trim())
            .map_err(|e| FileError::Decode(format!("Invalid base64 in data URL: {}", e)))
    } else {
        Ok(payload.as_bytes().to_vec())
    }
}
