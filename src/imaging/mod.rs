//! Image processing, pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Load** | `image::ImageReader`, `resvg` for SVG sources |
//! | **Identify** | `image::image_dimensions` |
//! | **Resize + encode** | Lanczos3 + PNG/JPEG/WebP/TIFF encoders |
//! | **Pad + flatten** | transparent inset, alpha blend over a CSS color |
//! | **Posterize** | run-length tracer emitting a single SVG path |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Trace**: bitmap to vector conversion for pinned-tab masks

pub mod backend;
mod calculations;
mod params;
pub mod rust_backend;
mod trace;

pub use backend::{BackendError, Dimensions, ImageBackend, SourceImage};
pub use params::{
    EncodeFormat, Encoding, JpegOptions, PadParams, PngOptions, ResizeFit, ResizeParams, Rgba,
    TiffOptions, WebpOptions,
};
pub use rust_backend::RustBackend;
