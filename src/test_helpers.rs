//! Shared test utilities.
//!
//! Builds throwaway icon directories and options objects so each test
//! states only the options it cares about.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let fx = IconFixture::new();
//! let options = options_with_icon(json!({"name": "Demo"}))
//!     .with_icon_opt("genFavicons", json!(true));
//! let config = ManifestConfig::resolve(&options, &fx.meta(), &Value::Null).unwrap();
//! ```

use image::{ImageFormat, RgbaImage};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::config::MetaConfig;

// =========================================================================
// Fixture setup
// =========================================================================

/// A temp directory holding a synthetic `icon.png` (64×64, opaque
/// gradient with a transparent border).
pub struct IconFixture {
    tmp: TempDir,
}

impl IconFixture {
    pub fn new() -> Self {
        let fx = Self {
            tmp: TempDir::new().unwrap(),
        };
        fx.write_png("icon.png", 64, 64);
        fx
    }

    pub fn dir(&self) -> &Path {
        self.tmp.path()
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.tmp.path().join(name)
    }

    /// Meta config rooted at the fixture directory, base URL `/`, no
    /// environment overlay.
    pub fn meta(&self) -> MetaConfig {
        MetaConfig::new("/", self.dir()).with_environment(None)
    }

    /// Write PNG data under `name`, whatever its extension.
    pub fn write_png(&self, name: &str, width: u32, height: u32) -> PathBuf {
        let path = self.path(name);
        let img = RgbaImage::from_fn(width, height, |x, y| {
            let border = x == 0 || y == 0 || x == width - 1 || y == height - 1;
            let alpha = if border { 0 } else { 255 };
            image::Rgba([(x * 4 % 256) as u8, (y * 4 % 256) as u8, 128, alpha])
        });
        img.save_with_format(&path, ImageFormat::Png).unwrap();
        path
    }
}

// =========================================================================
// Option builders
// =========================================================================

/// `base` plus `"icons": {"baseIcon": "icon.png"}`.
pub fn options_with_icon(base: Value) -> Value {
    let mut options = base;
    options
        .as_object_mut()
        .unwrap()
        .insert("icons".into(), json!({"baseIcon": "icon.png"}));
    options
}

pub trait OptionsExt {
    /// Set a key inside the `icons` object.
    fn with_icon_opt(self, key: &str, value: Value) -> Value;
}

impl OptionsExt for Value {
    fn with_icon_opt(mut self, key: &str, value: Value) -> Value {
        self["icons"]
            .as_object_mut()
            .unwrap()
            .insert(key.to_string(), value);
        self
    }
}
