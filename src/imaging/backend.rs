//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait is the opaque image capability the pipeline
//! runs against: load, identify, read, resize-and-encode, pad-and-flatten,
//! and posterize.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), pure Rust on top of
//! the `image` crate and `resvg`.

use super::params::{PadParams, ResizeParams};
use image::DynamicImage;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A decoded source image, shared read-only between derivations.
///
/// Cloning is cheap (reference counted). Operations never mutate the
/// pixels; every derivation produces a new buffer.
#[derive(Clone)]
pub struct SourceImage {
    path: PathBuf,
    pixels: Arc<DynamicImage>,
}

impl SourceImage {
    pub fn new(path: impl Into<PathBuf>, pixels: DynamicImage) -> Self {
        Self {
            path: path.into(),
            pixels: Arc::new(pixels),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn pixels(&self) -> &DynamicImage {
        &self.pixels
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.pixels.width(),
            height: self.pixels.height(),
        }
    }
}

impl fmt::Debug for SourceImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceImage")
            .field("path", &self.path)
            .field("dimensions", &self.dimensions())
            .finish()
    }
}

/// Trait for image processing backends.
///
/// Every backend implements all operations so the pipeline stays
/// backend-agnostic. `Sync` because stages fan encodes out over rayon.
pub trait ImageBackend: Sync {
    /// Decode an image file into a shareable source (alpha channel ensured).
    fn load(&self, path: &Path) -> Result<SourceImage, BackendError>;

    /// Get image dimensions without keeping the decoded pixels.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Raw file bytes, for artifacts passed through without re-encoding.
    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, BackendError>;

    /// Resize with the requested fit, then encode.
    fn resize(&self, source: &SourceImage, params: &ResizeParams) -> Result<Vec<u8>, BackendError>;

    /// Resize, pad with transparency, flatten against a color, PNG-encode.
    fn pad_and_flatten(
        &self,
        source: &SourceImage,
        params: &PadParams,
    ) -> Result<Vec<u8>, BackendError>;

    /// Trace the source into a monochrome SVG document.
    fn posterize(&self, source: &SourceImage) -> Result<String, BackendError>;
}
