use crate::formats::is_supported_image;
use std::path::{Path, PathBuf};

/// An image selected for the output document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub path: PathBuf,
    pub display_name: String,
}

impl ImageReference {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let display_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self { path, display_name }
    }
}

/// Turn a list of paths into image references, in input order.
///
/// Empty paths, missing files, and files without a supported image extension
/// are logged and left out.
pub async fn load_image_references(paths: &[impl AsRef<Path>]) -> Vec<ImageReference> {
    let mut images = Vec::new();
    for path in paths {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            continue;
        }

        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => {
                log::warn!("Not a file: {}", path.display());
                continue;
            }
            Err(e) => {
                log::error!("Cannot access {}: {}", path.display(), e);
                continue;
            }
        }

        if !is_supported_image(path) {
            log::warn!("Unsupported image format: {}", path.display());
            continue;
        }

        images.push(ImageReference::new(path));
    }
    log::info!("Loaded {} of {} image path(s)", images.len(), paths.len());
    images
}
