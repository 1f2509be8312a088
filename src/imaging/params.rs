//! Parameter types for image operations.
//!
//! These structs describe *what* to produce, not *how*. They are the
//! interface between the [`process`](crate::process) stages (which decide
//! which artifacts exist) and the [`backend`](super::backend) (which does the
//! pixel work), so stages can run against a mock in tests.
//!
//! ## Types
//!
//! - [`ResizeFit`] : how a source is mapped onto the target box.
//! - [`EncodeFormat`] / [`Encoding`] : output codec plus its options.
//! - [`Rgba`] : a parsed CSS color, used for flattening.
//! - [`ResizeParams`] : resize + encode.
//! - [`PadParams`] : resize, pad back to a square, flatten, PNG encode.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the source image is fitted into the target dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeFit {
    /// Fill the box, cropping the overflow (centered).
    #[default]
    Cover,
    /// Fit inside the box, letterboxing with transparency.
    Contain,
    /// Stretch to the exact box, ignoring aspect ratio.
    Fill,
}

/// Output encodings an icon can be produced in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodeFormat {
    Png,
    Jpeg,
    Webp,
    Tiff,
}

impl EncodeFormat {
    pub const ALL: [EncodeFormat; 4] = [Self::Png, Self::Jpeg, Self::Webp, Self::Tiff];

    /// File extension, also the key used in format option maps.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Webp => "webp",
            Self::Tiff => "tiff",
        }
    }

    pub fn mime_type(self) -> String {
        format!("image/{}", self.extension())
    }
}

impl FromStr for EncodeFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.extension() == s)
            .ok_or_else(|| format!("unsupported output format '{s}'"))
    }
}

impl fmt::Display for EncodeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// PNG encoder options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PngOptions {
    /// zlib effort, 0 (fastest) to 9 (smallest).
    pub compression_level: u8,
    pub adaptive_filtering: bool,
}

impl PngOptions {
    /// Options injected when a format map omits PNG.
    pub fn baseline() -> Self {
        Self {
            compression_level: 9,
            ..Self::default()
        }
    }
}

impl Default for PngOptions {
    fn default() -> Self {
        Self {
            compression_level: 6,
            adaptive_filtering: false,
        }
    }
}

/// JPEG encoder options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JpegOptions {
    pub quality: u8,
}

impl Default for JpegOptions {
    fn default() -> Self {
        Self { quality: 80 }
    }
}

/// WebP encoder options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WebpOptions {
    pub quality: u8,
    pub lossless: bool,
    /// Encoder effort, 0 (fastest) to 6 (smallest).
    pub effort: u8,
}

impl Default for WebpOptions {
    fn default() -> Self {
        Self {
            quality: 80,
            lossless: false,
            effort: 4,
        }
    }
}

/// TIFF encoder options. The encoder has no tunables; the struct exists so
/// every format key carries an options object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TiffOptions {}

/// An output codec together with its options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Png(PngOptions),
    Jpeg(JpegOptions),
    Webp(WebpOptions),
    Tiff(TiffOptions),
}

impl Encoding {
    pub fn format(&self) -> EncodeFormat {
        match self {
            Self::Png(_) => EncodeFormat::Png,
            Self::Jpeg(_) => EncodeFormat::Jpeg,
            Self::Webp(_) => EncodeFormat::Webp,
            Self::Tiff(_) => EncodeFormat::Tiff,
        }
    }

    /// Parse encoder options for `format` from a JSON options object.
    pub fn from_json(format: EncodeFormat, value: &serde_json::Value) -> Result<Self, String> {
        if !value.is_object() {
            return Err(format!("the {format} options must be an object"));
        }
        let parsed = match format {
            EncodeFormat::Png => serde_json::from_value(value.clone()).map(Self::Png),
            EncodeFormat::Jpeg => serde_json::from_value(value.clone()).map(Self::Jpeg),
            EncodeFormat::Webp => serde_json::from_value(value.clone()).map(Self::Webp),
            EncodeFormat::Tiff => serde_json::from_value(value.clone()).map(Self::Tiff),
        }
        .map_err(|e| format!("invalid {format} options: {e}"))?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// Range-check option values the type system does not cover.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::Png(o) if o.compression_level > 9 => {
                Err("png compressionLevel must be 0-9".into())
            }
            Self::Jpeg(o) if !(1..=100).contains(&o.quality) => {
                Err("jpeg quality must be 1-100".into())
            }
            Self::Webp(o) if !(1..=100).contains(&o.quality) => {
                Err("webp quality must be 1-100".into())
            }
            Self::Webp(o) if o.effort > 6 => Err("webp effort must be 0-6".into()),
            _ => Ok(()),
        }
    }
}

/// An 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba {
        r: 0,
        g: 0,
        b: 0,
        a: 0,
    };

    /// Parse any CSS color (`white`, `#fa0`, `rgb(…)`, `rgba(…)`, `hsl(…)`).
    pub fn parse_css(value: &str) -> Option<Self> {
        let color = svgtypes::Color::from_str(value.trim()).ok()?;
        Some(Self {
            r: color.red,
            g: color.green,
            b: color.blue,
            a: color.alpha,
        })
    }
}

/// Resize the source into a `width`×`height` box, then encode.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeParams {
    pub width: u32,
    pub height: u32,
    pub fit: ResizeFit,
    pub encoding: Encoding,
}

/// Resize into a square inset by `padding` on every side, extend back to
/// `size`×`size` with transparency, flatten against `background`, and
/// PNG-encode.
#[derive(Debug, Clone, PartialEq)]
pub struct PadParams {
    pub size: u32,
    pub padding: u32,
    pub fit: ResizeFit,
    pub background: Rgba,
    pub png: PngOptions,
}
