//! Directory-backed file manager for native platforms.

use super::{BoxFuture, FileError, FileManager, FileResult, ImageSource, SelectedFile};
use crate::shapes::Shape;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Stores uploads as files in a base directory.
///
/// References are plain file names relative to the base directory;
/// downloads yield `file://` URLs.
pub struct DirectoryFileManager {
    base_path: PathBuf,
}

impl DirectoryFileManager {
    /// Create a manager rooted at `base_path`, creating the directory if
    /// needed.
    pub fn new(base_path: PathBuf) -> FileResult<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                FileError::Io(format!("Failed to create files directory: {}", e))
            })?;
        }
        let base_path = base_path
            .canonicalize()
            .map_err(|e| FileError::Io(format!("Failed to resolve {}: {}", base_path.display(), e)))?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Path of a stored reference. The reference is percent-encoded into a
    /// single file name, so distinct references never share a file and none
    /// can escape the base directory.
    fn file_path(&self, reference: &str) -> PathBuf {
        self.base_path.join(file_name(reference))
    }
}

/// Bytes kept as-is in stored file names.
const FILE_NAME: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

fn file_name(reference: &str) -> String {
    let encoded = utf8_percent_encode(reference, FILE_NAME).to_string();
    match encoded.strip_prefix('.') {
        Some(rest) => format!("%2E{}", rest),
        None => encoded,
    }
}

/// Readable, path-safe form of an uploaded file's name.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect::<String>()
        .trim_start_matches('.')
        .to_string()
}

impl FileManager for DirectoryFileManager {
    fn upload(&self, file: &SelectedFile, _shape: &Shape) -> BoxFuture<'_, FileResult<String>> {
        let reference = format!("{}-{}", Uuid::new_v4(), sanitize(&file.name));
        let path = self.file_path(&reference);
        let bytes = file.bytes.clone();
        Box::pin(async move {
            fs::write(&path, bytes.as_slice()).map_err(|e| {
                FileError::Io(format!("Failed to write {}: {}", path.display(), e))
            })?;
            log::debug!("Stored upload at {}", path.display());
            Ok(reference)
        })
    }

    fn download(&self, reference: &str) -> BoxFuture<'_, FileResult<ImageSource>> {
        let path = self.file_path(reference);
        let reference = reference.to_string();
        Box::pin(async move {
            if !path.exists() {
                return Err(FileError::NotFound(reference));
            }
            Ok(ImageSource::Url(format!("file://{}", path.display())))
        })
    }

    fn remove(&self, reference: &str) -> BoxFuture<'_, FileResult<()>> {
        let path = self.file_path(reference);
        Box::pin(async move {
            if path.exists() {
                fs::remove_file(&path).map_err(|e| {
                    FileError::Io(format!("Failed to delete {}: {}", path.display(), e))
                })?;
            }
            Ok(())
        })
    }
}
