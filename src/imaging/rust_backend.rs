//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (PNG, JPEG, TIFF, WebP) | `image` crate, format sniffed from content |
//! | Decode (SVG) | `resvg` rasterized to a 1024 px long edge |
//! | Resize | `resize_to_fill` / `resize_exact` with `Lanczos3` |
//! | Encode PNG | `image::codecs::png::PngEncoder` |
//! | Encode JPEG | `image::codecs::jpeg::JpegEncoder` |
//! | Encode WebP | `webp::Encoder` (libwebp), lossy or lossless per options |
//! | Encode TIFF | `image::codecs::tiff::TiffEncoder` |
//! | Posterize | [`trace`](super::trace) on a 512 px working copy |

use super::backend::{BackendError, Dimensions, ImageBackend, SourceImage};
use super::calculations::{
    blend_channel, calculate_contain_dimensions, centered_offset, padded_inner_size,
    scale_to_long_edge,
};
use super::params::{Encoding, PadParams, PngOptions, ResizeFit, ResizeParams, WebpOptions};
use super::trace;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::codecs::tiff::TiffEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageReader, RgbImage, RgbaImage};
use resvg::{tiny_skia, usvg};
use std::io::Cursor;
use std::path::Path;

/// Long edge SVG sources are rasterized to before any derivation.
const SVG_RASTER_EDGE: u32 = 1024;

/// Long edge of the working copy handed to the tracer.
const POSTERIZE_EDGE: u32 = 512;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn is_svg(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("svg"))
}

fn parse_svg(path: &Path) -> Result<usvg::Tree, BackendError> {
    let data = std::fs::read(path)?;
    usvg::Tree::from_data(&data, &usvg::Options::default()).map_err(|e| {
        BackendError::ProcessingFailed(format!("Failed to parse SVG {}: {}", path.display(), e))
    })
}

/// Rasterize an SVG so its long edge is [`SVG_RASTER_EDGE`] pixels.
fn rasterize_svg(path: &Path) -> Result<DynamicImage, BackendError> {
    let tree = parse_svg(path)?;
    let size = tree.size();
    let (width, height) = scale_to_long_edge((size.width(), size.height()), SVG_RASTER_EDGE);

    let mut pixmap = tiny_skia::Pixmap::new(width, height).ok_or_else(|| {
        BackendError::ProcessingFailed(format!("Cannot allocate {width}x{height} canvas"))
    })?;
    let transform = tiny_skia::Transform::from_scale(
        width as f32 / size.width(),
        height as f32 / size.height(),
    );
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    // tiny-skia stores premultiplied alpha.
    let raw: Vec<u8> = pixmap
        .pixels()
        .iter()
        .flat_map(|p| {
            let c = p.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
        .collect();
    RgbaImage::from_raw(width, height, raw)
        .map(DynamicImage::ImageRgba8)
        .ok_or_else(|| BackendError::ProcessingFailed("SVG raster buffer size mismatch".into()))
}

/// Load and decode an image from disk, always with an alpha channel.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    if is_svg(path) {
        return rasterize_svg(path);
    }
    let decoded = ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
        })?;
    Ok(DynamicImage::ImageRgba8(decoded.to_rgba8()))
}

/// Resize into a `width`×`height` box according to `fit`.
fn fit_image(img: &DynamicImage, width: u32, height: u32, fit: ResizeFit) -> RgbaImage {
    match fit {
        ResizeFit::Cover => img.resize_to_fill(width, height, FilterType::Lanczos3).to_rgba8(),
        ResizeFit::Fill => img.resize_exact(width, height, FilterType::Lanczos3).to_rgba8(),
        ResizeFit::Contain => {
            let (w, h) = calculate_contain_dimensions((img.width(), img.height()), (width, height));
            let inner = img.resize_exact(w, h, FilterType::Lanczos3).to_rgba8();
            let mut canvas = RgbaImage::new(width, height);
            let (x, y) = centered_offset((w, h), (width, height));
            image::imageops::overlay(&mut canvas, &inner, x, y);
            canvas
        }
    }
}

fn encode_failed(format: &str, e: image::ImageError) -> BackendError {
    BackendError::ProcessingFailed(format!("{format} encode failed: {e}"))
}

/// RGBA8 to WebP. `effort` maps onto libwebp's `method` (0-6).
fn encode_webp(
    raw: &[u8],
    width: u32,
    height: u32,
    options: &WebpOptions,
) -> Result<Vec<u8>, BackendError> {
    let mut config = webp::WebPConfig::new().map_err(|_| {
        BackendError::ProcessingFailed("WebP encoder configuration failed".to_string())
    })?;
    config.lossless = i32::from(options.lossless);
    config.quality = f32::from(options.quality);
    config.method = i32::from(options.effort);

    let encoded = webp::Encoder::from_rgba(raw, width, height)
        .encode_advanced(&config)
        .map_err(|e| BackendError::ProcessingFailed(format!("WebP encode failed: {e:?}")))?;
    Ok(encoded.to_vec())
}

fn encode_png_raw(
    raw: &[u8],
    width: u32,
    height: u32,
    color: ExtendedColorType,
    options: &PngOptions,
) -> Result<Vec<u8>, BackendError> {
    let compression = match options.compression_level {
        0..=3 => CompressionType::Fast,
        4..=6 => CompressionType::Default,
        _ => CompressionType::Best,
    };
    let filter = if options.adaptive_filtering {
        PngFilter::Adaptive
    } else {
        PngFilter::Sub
    };
    let mut out = Vec::new();
    PngEncoder::new_with_quality(&mut out, compression, filter)
        .write_image(raw, width, height, color)
        .map_err(|e| encode_failed("PNG", e))?;
    Ok(out)
}

/// Encode an RGBA image with the requested codec.
fn encode(img: &RgbaImage, encoding: &Encoding) -> Result<Vec<u8>, BackendError> {
    let (width, height) = img.dimensions();
    match encoding {
        Encoding::Png(options) => {
            encode_png_raw(img.as_raw(), width, height, ExtendedColorType::Rgba8, options)
        }
        Encoding::Jpeg(options) => {
            let rgb = DynamicImage::ImageRgba8(img.clone()).to_rgb8();
            let mut out = Vec::new();
            JpegEncoder::new_with_quality(&mut out, options.quality)
                .write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
                .map_err(|e| encode_failed("JPEG", e))?;
            Ok(out)
        }
        Encoding::Webp(options) => encode_webp(img.as_raw(), width, height, options),
        Encoding::Tiff(_) => {
            let mut cursor = Cursor::new(Vec::new());
            TiffEncoder::new(&mut cursor)
                .write_image(img.as_raw(), width, height, ExtendedColorType::Rgba8)
                .map_err(|e| encode_failed("TIFF", e))?;
            Ok(cursor.into_inner())
        }
    }
}

impl ImageBackend for RustBackend {
    fn load(&self, path: &Path) -> Result<SourceImage, BackendError> {
        Ok(SourceImage::new(path, load_image(path)?))
    }

    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        if is_svg(path) {
            let size = parse_svg(path)?.size();
            return Ok(Dimensions {
                width: size.width().round() as u32,
                height: size.height().round() as u32,
            });
        }
        let (width, height) = image::image_dimensions(path).map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to read dimensions: {}", e))
        })?;
        Ok(Dimensions { width, height })
    }

    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, BackendError> {
        Ok(std::fs::read(path)?)
    }

    fn resize(&self, source: &SourceImage, params: &ResizeParams) -> Result<Vec<u8>, BackendError> {
        let fitted = fit_image(source.pixels(), params.width, params.height, params.fit);
        encode(&fitted, &params.encoding)
    }

    fn pad_and_flatten(
        &self,
        source: &SourceImage,
        params: &PadParams,
    ) -> Result<Vec<u8>, BackendError> {
        let inner = padded_inner_size(params.size, params.padding).ok_or_else(|| {
            BackendError::ProcessingFailed(format!(
                "Padding {} leaves no room in a {}px square",
                params.padding, params.size
            ))
        })?;
        let fitted = fit_image(source.pixels(), inner, inner, params.fit);
        let mut canvas = RgbaImage::new(params.size, params.size);
        image::imageops::overlay(
            &mut canvas,
            &fitted,
            params.padding as i64,
            params.padding as i64,
        );

        let bg = params.background;
        let flat = RgbImage::from_fn(params.size, params.size, |x, y| {
            let [r, g, b, a] = canvas.get_pixel(x, y).0;
            image::Rgb([
                blend_channel(r, a, bg.r),
                blend_channel(g, a, bg.g),
                blend_channel(b, a, bg.b),
            ])
        });
        encode_png_raw(
            flat.as_raw(),
            params.size,
            params.size,
            ExtendedColorType::Rgb8,
            &params.png,
        )
    }

    fn posterize(&self, source: &SourceImage) -> Result<String, BackendError> {
        let img = source.pixels();
        let working = if img.width().max(img.height()) > POSTERIZE_EDGE {
            let (w, h) = scale_to_long_edge((img.width() as f32, img.height() as f32), POSTERIZE_EDGE);
            img.resize_exact(w, h, FilterType::Lanczos3).to_rgba8()
        } else {
            img.to_rgba8()
        };
        let (width, height) = working.dimensions();
        Ok(trace::posterize(working.as_raw(), width, height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::params::{JpegOptions, Rgba, TiffOptions, WebpOptions};
    use image::ImageFormat;

    /// Write a PNG whose pixels are all `color`.
    fn create_test_png(path: &Path, width: u32, height: u32, color: [u8; 4]) {
        RgbaImage::from_pixel(width, height, image::Rgba(color))
            .save(path)
            .unwrap();
    }

    fn load(path: &Path) -> SourceImage {
        RustBackend::new().load(path).unwrap()
    }

    fn png_params(width: u32, height: u32, fit: ResizeFit) -> ResizeParams {
        ResizeParams {
            width,
            height,
            fit,
            encoding: Encoding::Png(PngOptions::default()),
        }
    }

    #[test]
    fn load_png_adds_alpha() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("icon.png");
        RgbImage::from_pixel(30, 20, image::Rgb([1, 2, 3]))
            .save(&path)
            .unwrap();

        let source = load(&path);
        assert_eq!(source.dimensions(), Dimensions { width: 30, height: 20 });
        assert!(source.pixels().color().has_alpha());
    }

    #[test]
    fn load_svg_rasterizes_to_long_edge() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("logo.svg");
        std::fs::write(
            &path,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="24" height="12"><rect width="24" height="12" fill="red"/></svg>"#,
        )
        .unwrap();

        let backend = RustBackend::new();
        let source = backend.load(&path).unwrap();
        assert_eq!(source.dimensions(), Dimensions { width: 1024, height: 512 });
        let center = source.pixels().to_rgba8().get_pixel(512, 256).0;
        assert_eq!(center, [255, 0, 0, 255]);

        let dims = backend.identify(&path).unwrap();
        assert_eq!(dims, Dimensions { width: 24, height: 12 });
    }

    #[test]
    fn identify_nonexistent_file_errors() {
        let backend = RustBackend::new();
        assert!(backend.identify(Path::new("/nonexistent/image.png")).is_err());
        assert!(backend.load(Path::new("/nonexistent/image.png")).is_err());
    }

    #[test]
    fn resize_cover_exact_dimensions() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("wide.png");
        create_test_png(&path, 200, 100, [0, 0, 255, 255]);

        let bytes = RustBackend::new()
            .resize(&load(&path), &png_params(48, 48, ResizeFit::Cover))
            .unwrap();
        let out = image::load_from_memory(&bytes).unwrap();
        assert_eq!((out.width(), out.height()), (48, 48));
        assert_eq!(out.to_rgba8().get_pixel(0, 0).0[3], 255);
    }

    #[test]
    fn resize_contain_letterboxes_with_transparency() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("wide.png");
        create_test_png(&path, 40, 20, [255, 0, 0, 255]);

        let bytes = RustBackend::new()
            .resize(&load(&path), &png_params(20, 20, ResizeFit::Contain))
            .unwrap();
        let out = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(out.dimensions(), (20, 20));
        assert_eq!(out.get_pixel(10, 0).0[3], 0);
        assert_eq!(out.get_pixel(10, 10).0, [255, 0, 0, 255]);
    }

    #[test]
    fn resize_fill_stretches() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("square.png");
        create_test_png(&path, 50, 50, [0, 255, 0, 255]);

        let bytes = RustBackend::new()
            .resize(&load(&path), &png_params(310, 150, ResizeFit::Fill))
            .unwrap();
        let out = image::load_from_memory(&bytes).unwrap();
        assert_eq!((out.width(), out.height()), (310, 150));
    }

    #[test]
    fn every_encoding_produces_its_format() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("icon.png");
        create_test_png(&path, 64, 64, [10, 20, 30, 255]);
        let source = load(&path);
        let backend = RustBackend::new();

        let cases = [
            (Encoding::Png(PngOptions::baseline()), ImageFormat::Png),
            (Encoding::Jpeg(JpegOptions::default()), ImageFormat::Jpeg),
            (Encoding::Webp(WebpOptions::default()), ImageFormat::WebP),
            (Encoding::Tiff(TiffOptions::default()), ImageFormat::Tiff),
        ];
        for (encoding, expected) in cases {
            let bytes = backend
                .resize(
                    &source,
                    &ResizeParams {
                        width: 16,
                        height: 16,
                        fit: ResizeFit::Cover,
                        encoding,
                    },
                )
                .unwrap();
            assert_eq!(image::guess_format(&bytes).unwrap(), expected);
            let decoded = image::load_from_memory(&bytes).unwrap();
            assert_eq!((decoded.width(), decoded.height()), (16, 16));
        }
    }

    fn has_chunk(bytes: &[u8], fourcc: &[u8; 4]) -> bool {
        bytes.windows(4).any(|w| w == fourcc)
    }

    #[test]
    fn webp_options_reach_the_encoder() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("gradient.png");
        RgbaImage::from_fn(96, 96, |x, y| {
            image::Rgba([(x * 2) as u8, (y * 2) as u8, ((x * y) % 256) as u8, 255])
        })
        .save(&path)
        .unwrap();
        let source = load(&path);
        let backend = RustBackend::new();
        let encode = |options: WebpOptions| {
            backend
                .resize(
                    &source,
                    &ResizeParams {
                        width: 96,
                        height: 96,
                        fit: ResizeFit::Cover,
                        encoding: Encoding::Webp(options),
                    },
                )
                .unwrap()
        };

        let low = encode(WebpOptions {
            quality: 5,
            lossless: false,
            effort: 4,
        });
        let high = encode(WebpOptions {
            quality: 100,
            lossless: false,
            effort: 4,
        });
        let lossless = encode(WebpOptions {
            lossless: true,
            ..WebpOptions::default()
        });

        assert_ne!(low, high);
        assert!(low.len() < high.len());
        assert!(has_chunk(&low, b"VP8 "));
        assert!(!has_chunk(&low, b"VP8L"));
        assert!(has_chunk(&lossless, b"VP8L"));
        assert_eq!(image::load_from_memory(&low).unwrap().width(), 96);
    }

    #[test]
    fn pad_and_flatten_fills_border_with_background() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("icon.png");
        create_test_png(&path, 64, 64, [255, 0, 0, 255]);

        let bytes = RustBackend::new()
            .pad_and_flatten(
                &load(&path),
                &PadParams {
                    size: 180,
                    padding: 12,
                    fit: ResizeFit::Cover,
                    background: Rgba {
                        r: 255,
                        g: 255,
                        b: 255,
                        a: 255,
                    },
                    png: PngOptions::default(),
                },
            )
            .unwrap();
        let out = image::load_from_memory(&bytes).unwrap();
        assert!(!out.color().has_alpha());
        let rgb = out.to_rgb8();
        assert_eq!(rgb.dimensions(), (180, 180));
        assert_eq!(rgb.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(rgb.get_pixel(90, 90).0, [255, 0, 0]);
    }

    #[test]
    fn pad_and_flatten_rejects_excess_padding() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("icon.png");
        create_test_png(&path, 8, 8, [0, 0, 0, 255]);

        let result = RustBackend::new().pad_and_flatten(
            &load(&path),
            &PadParams {
                size: 180,
                padding: 90,
                fit: ResizeFit::Cover,
                background: Rgba::TRANSPARENT,
                png: PngOptions::default(),
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn posterize_traces_opaque_shape() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("shape.png");
        let mut img = RgbaImage::new(600, 600);
        for y in 150..450 {
            for x in 150..450 {
                img.put_pixel(x, y, image::Rgba([0, 0, 0, 255]));
            }
        }
        img.save(&path).unwrap();

        let svg = RustBackend::new().posterize(&load(&path)).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(r#"viewBox="0 0 512 512""#), "{svg}");
        assert!(svg.contains("<path"));
    }
}
