//! Option resolution.
//!
//! Turns the loosely typed options object a host passes in (usually the
//! `pwaManifest` key of a `package.json`) into a fully validated
//! [`ManifestConfig`]. Every check happens here, when the generator is
//! constructed; generation itself never fails on configuration.
//!
//! ## Aliases
//!
//! Every option accepts several spellings. The first alias present wins:
//!
//! ```json
//! {
//!   "name": "Example",
//!   "theme-color": "#1a1a2e",
//!   "icons": {
//!     "baseIcon": "./icon.png",
//!     "sizes": [96, 128],
//!     "formats": { "webp": { "quality": 80 }, "png": {} },
//!     "genFavicons": true
//!   }
//! }
//! ```
//!
//! At the top level only, an option with no alias present is looked up in
//! the *fallback* object under its canonical (first) alias. Hosts use this
//! to inherit `name` and `description` from the package metadata.
//!
//! ## Defined vs. truthy
//!
//! Most options use the first alias whose value is present, even when that
//! value is `false`, `0`, or `""`. A handful treat falsy values as unset
//! so that an empty string falls back to the default (`shortName`, `desc`,
//! `startURL`, `scope`, `theme`, `msTileColor`, `resizeMethod`,
//! `appleTouchIconBG`, `disable`).
//!
//! ## Environment overlay
//!
//! When [`MetaConfig::environment`] names a key of the options (lower-cased,
//! so `NODE_ENV=Production` selects `"production"`), that object's keys
//! shallowly replace the top-level ones:
//!
//! ```json
//! { "name": "App", "production": { "startURL": "/app/" }, "icons": { ... } }
//! ```

use crate::imaging::{EncodeFormat, Encoding, PngOptions, ResizeFit, Rgba, WebpOptions};
use crate::types::{HtmlInsert, ScreenshotEntry};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Where an option was being read when validation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    Options,
    IconGeneration,
    Shortcut(usize),
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Options => f.write_str("options"),
            Self::IconGeneration => f.write_str("icon generation options"),
            Self::Shortcut(i) => write!(f, "options for shortcut #{i}"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("The PWA Manifest options must be an object containing the desired parameters.")]
    NotAnObject,
    #[error(
        "The specific options for environment \"{environment}\" must be an object containing the desired parameters."
    )]
    EnvironmentNotObject { environment: String },
    #[error("No {option} was found in the {context}.")]
    Missing {
        context: Context,
        option: &'static str,
    },
    #[error("The {option} provided in the {context} must be {expected}.")]
    Invalid {
        context: Context,
        option: &'static str,
        expected: &'static str,
    },
    #[error("The {format} options in the icon generation options are invalid: {reason}")]
    InvalidEncoderOptions {
        format: EncodeFormat,
        reason: String,
    },
    #[error(
        "Parameter \"{option}\" provided in the options is invalid. Please check the official MDN documentation on the Web App Manifest."
    )]
    InvalidExtra { option: &'static str },
    #[error("No icon was found at the base icon path {path}.")]
    BaseIconNotFound { path: String },
    #[error("No icon was found at the path {path} for shortcut #{index}.")]
    ShortcutIconNotFound { index: usize, path: String },
    #[error(
        "Each screenshot in the screenshots must be of type PNG, WebP, or JPEG. Ensure that the filenames have the correct extensions. Got \"{src}\"."
    )]
    InvalidScreenshotType { src: String },
    #[error(
        "Every screenshot in the screenshots array must include a valid filepath or absolute URL to a screenshot image. Got \"{src}\"."
    )]
    ScreenshotNotFound { src: String },
    #[error(
        "The purposes parameter in the options for shortcut #{index} can only exist if the shortcut has an icon."
    )]
    PurposesWithoutIcon { index: usize },
    #[error(
        "The pinned tab color cannot be specified without enabling pinned tab generation in the icon generation options."
    )]
    PinnedTabColorWithoutGeneration,
    #[error("The {option} \"{value}\" is not a valid CSS color.")]
    InvalidColor { option: &'static str, value: String },
}

// =============================================================================
// Meta configuration
// =============================================================================

/// Host-supplied settings that are not part of the user's options.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaConfig {
    /// URL prefix for every generated reference. Gains a trailing `/`.
    pub base_url: String,
    /// Directory relative paths in the options resolve against.
    pub resolve_dir: PathBuf,
    /// Deployment environment selecting an option overlay.
    pub environment: Option<String>,
}

impl Default for MetaConfig {
    /// `/`, the current directory, and `NODE_ENV` from the process environment.
    fn default() -> Self {
        Self {
            base_url: "/".to_string(),
            resolve_dir: PathBuf::from("."),
            environment: std::env::var("NODE_ENV").ok().filter(|e| !e.is_empty()),
        }
    }
}

impl MetaConfig {
    pub fn new(base_url: impl Into<String>, resolve_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_url: base_url.into(),
            resolve_dir: resolve_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_environment(mut self, environment: Option<&str>) -> Self {
        self.environment = environment.map(str::to_string);
        self
    }

    /// The base URL with exactly the trailing slash guaranteed.
    pub fn normalized_base_url(&self) -> String {
        if self.base_url.ends_with('/') {
            self.base_url.clone()
        } else {
            format!("{}/", self.base_url)
        }
    }
}

// =============================================================================
// Option tables
// =============================================================================

/// A user-facing option: the label used in error messages and every
/// accepted spelling, canonical first.
#[derive(Debug, Clone, Copy)]
pub struct OptionKey {
    pub label: &'static str,
    pub aliases: &'static [&'static str],
}

const fn key(label: &'static str, aliases: &'static [&'static str]) -> OptionKey {
    OptionKey { label, aliases }
}

pub mod keys {
    //! Alias tables for every option.
    use super::{OptionKey, key};

    pub const DISABLED: OptionKey = key("disable option", &["disable", "disabled"]);
    pub const NAME: OptionKey = key("name", &["name", "appName", "app-name"]);
    pub const SHORT_NAME: OptionKey = key(
        "short name",
        &["shortName", "short-name", "short_name", "appShortName", "app-short-name"],
    );
    pub const DESCRIPTION: OptionKey = key("description", &["desc", "description"]);
    pub const START_URL: OptionKey =
        key("start URL", &["startURL", "startUrl", "start-url", "start_url"]);
    pub const SCOPE: OptionKey = key("scope", &["scope"]);
    pub const THEME: OptionKey = key(
        "theme color",
        &["themeColor", "theme-color", "theme_color", "theme"],
    );
    pub const SCREENSHOTS: OptionKey = key("screenshots", &["screenshots", "images"]);
    pub const SHORTCUTS: OptionKey = key("shortcuts", &["shortcuts", "pages", "links"]);
    pub const ICON_GEN: OptionKey = key(
        "icon generation options",
        &[
            "genIcon",
            "gen-icon",
            "iconGen",
            "icon-gen",
            "genIconOpts",
            "gen-icon-opts",
            "iconGenOpts",
            "icon-gen-opts",
            "generateIconOptions",
            "generate-icon-options",
            "iconGenerationOptions",
            "icon-generation-options",
            "icons",
        ],
    );
    pub const INCLUDE: OptionKey = key("include parameter", &["include", "includeParams", "include-params"]);

    pub const MS_TILE_COLOR: OptionKey = key(
        "Microsoft tile color",
        &["msTileColor", "ms-tile-color", "microsoftTileColor", "microsoft-tile-color"],
    );
    pub const BASE_ICON: OptionKey = key(
        "base icon",
        &["baseIcon", "base-icon", "base_icon", "fromIcon", "from-icon", "from_icon", "icon"],
    );
    pub const SIZES: OptionKey = key("sizes", &["sizes", "sizeList", "size-list", "size_list"]);
    pub const SHORTCUT_SIZES: OptionKey = key(
        "shortcut sizes",
        &[
            "shortcutSizes",
            "shortcut-sizes",
            "shortcut_sizes",
            "shortcutSizeList",
            "shortcut-size-list",
            "shortcut_size_list",
        ],
    );
    pub const FORMATS: OptionKey = key("formats", &["formats", "formatList", "format-list"]);
    pub const RESIZE_METHOD: OptionKey =
        key("resize method", &["resizeMethod", "resize-method", "resize"]);
    pub const PURPOSES: OptionKey = key("purposes", &["purpose", "purposes"]);
    pub const APPLE_TOUCH_ICON_BG: OptionKey = key(
        "Apple Touch Icon background color",
        &[
            "appleTouchIconBG",
            "appleTouchIconBg",
            "apple-touch-icon-bg",
            "appleTouchIconBackground",
            "apple-touch-icon-background",
            "atib",
        ],
    );
    pub const APPLE_TOUCH_ICON_PADDING: OptionKey = key(
        "Apple Touch Icon padding",
        &["appleTouchIconPadding", "apple-touch-icon-padding", "atip"],
    );
    pub const GEN_FAVICONS: OptionKey = key(
        "favicon generation option",
        &["genFavicons", "gen-favicons", "generateFavicons", "generate-favicons"],
    );
    pub const GEN_PINNED_TAB: OptionKey = key(
        "pinned tab generation option",
        &[
            "genSafariPinnedTab",
            "gen-safari-pinned-tab",
            "genPinnedTab",
            "gen-pinned-tab",
            "generateSafariPinnedTab",
            "generate-safari-pinned-tab",
            "gpt",
            "gspt",
        ],
    );
    pub const PINNED_TAB_COLOR: OptionKey = key(
        "pinned tab color",
        &[
            "safariPinnedTabColor",
            "safari-pinned-tab-color",
            "pinnedTabColor",
            "pinned-tab-color",
            "sptc",
        ],
    );

    pub const SHORTCUT_NAME: OptionKey = key("name", &["name"]);
    pub const SHORTCUT_SHORT_NAME: OptionKey =
        key("short name", &["shortName", "short-name", "short_name"]);
    pub const SHORTCUT_URL: OptionKey = key("URL", &["url", "page", "link"]);
    pub const SHORTCUT_ICON: OptionKey = key("icon", &["icon"]);
}

const DEFAULT_SIZES: [u32; 5] = [96, 152, 192, 384, 512];
const BASELINE_SIZES: [u32; 2] = [192, 512];
const DEFAULT_SHORTCUT_SIZES: [u32; 2] = [96, 192];
const BASELINE_SHORTCUT_SIZES: [u32; 1] = [96];
const DEFAULT_THEME: &str = "white";
const DEFAULT_APPLE_TOUCH_ICON_PADDING: u32 = 12;
/// Apple Touch Icons are 180 px; padding must leave at least one pixel.
const MAX_APPLE_TOUCH_ICON_PADDING: u64 = 89;

// =============================================================================
// Enumerations
// =============================================================================

/// Icon purpose, as in the manifest `purpose` member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Purpose {
    Badge,
    Maskable,
    Monochrome,
    Any,
}

impl Purpose {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Badge => "badge",
            Self::Maskable => "maskable",
            Self::Monochrome => "monochrome",
            Self::Any => "any",
        }
    }
}

/// Space-separated purposes, `None` when the list is empty.
pub fn join_purposes(purposes: &[Purpose]) -> Option<String> {
    if purposes.is_empty() {
        return None;
    }
    Some(
        purposes
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(" "),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DisplayMode {
    #[default]
    Standalone,
    MinimalUi,
    Fullscreen,
    Browser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Orientation {
    Any,
    Natural,
    Landscape,
    LandscapePrimary,
    LandscapeSecondary,
    Portrait,
    PortraitPrimary,
    PortraitSecondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextDirection {
    Rtl,
    Ltr,
    Auto,
}

// =============================================================================
// Manifest extras
// =============================================================================

/// Standard manifest members copied through after validation, in manifest
/// order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ManifestExtras {
    pub background_color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<TextDirection>,
    #[serde(default)]
    pub display: DisplayMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iarc_rating_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<Orientation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefer_related_applications: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Copied as given once each entry passes [`is_related_application`].
    pub related_applications: Option<Vec<Map<String, Value>>>,
}

enum ExtraDefault {
    ThemeColor,
    Literal(&'static str),
}

/// One row of the extras table.
struct ExtraOption {
    /// Canonical manifest member first.
    aliases: &'static [&'static str],
    check: fn(&Value) -> bool,
    default: Option<ExtraDefault>,
}

fn is_string(v: &Value) -> bool {
    v.is_string()
}

fn is_bool(v: &Value) -> bool {
    v.is_boolean()
}

fn is_string_array(v: &Value) -> bool {
    v.as_array().is_some_and(|a| a.iter().all(Value::is_string))
}

fn parses_as<T: serde::de::DeserializeOwned>(v: &Value) -> bool {
    serde_json::from_value::<T>(v.clone()).is_ok()
}

fn is_absolute_url(s: &str) -> bool {
    url::Url::parse(s).is_ok()
}

/// Either an `id` (optionally with a valid `url`) or a valid `url` alone.
fn is_related_application(v: &Value) -> bool {
    let Some(obj) = v.as_object() else {
        return false;
    };
    if !obj.get("platform").is_some_and(Value::is_string) {
        return false;
    }
    let url_valid = obj.get("url").and_then(Value::as_str).is_some_and(is_absolute_url);
    match obj.get("id") {
        Some(Value::String(_)) => !obj.contains_key("url") || url_valid,
        None => url_valid,
        Some(_) => false,
    }
}

fn is_related_applications(v: &Value) -> bool {
    v.as_array().is_some_and(|a| a.iter().all(is_related_application))
}

const EXTRA_OPTIONS: &[ExtraOption] = &[
    ExtraOption {
        aliases: &["background_color", "backgroundColor", "background-color", "bgColor", "bg-color", "bg"],
        check: is_string,
        default: Some(ExtraDefault::ThemeColor),
    },
    ExtraOption {
        aliases: &["categories", "ctgs"],
        check: is_string_array,
        default: None,
    },
    ExtraOption {
        aliases: &["dir", "direction", "textDirection", "text-direction"],
        check: parses_as::<TextDirection>,
        default: None,
    },
    ExtraOption {
        aliases: &["display", "displayMode", "display-mode"],
        check: parses_as::<DisplayMode>,
        default: Some(ExtraDefault::Literal("standalone")),
    },
    ExtraOption {
        aliases: &[
            "iarc_rating_id",
            "iarc",
            "iarcId",
            "iarcID",
            "iarc-id",
            "iarcRatingId",
            "iarcRatingID",
            "iarc-rating-id",
            "iarcRating",
            "iarc-rating",
        ],
        check: is_string,
        default: None,
    },
    ExtraOption {
        aliases: &["lang", "language"],
        check: is_string,
        default: None,
    },
    ExtraOption {
        aliases: &["orientation", "rotated", "screenOrientation", "screen-orientation"],
        check: parses_as::<Orientation>,
        default: None,
    },
    ExtraOption {
        aliases: &[
            "prefer_related_applications",
            "preferRelated",
            "prefer-related",
            "preferRelatedApplications",
            "prefer-related-applications",
        ],
        check: is_bool,
        default: None,
    },
    ExtraOption {
        aliases: &["related_applications", "related", "relatedApplications", "related-applications"],
        check: is_related_applications,
        default: None,
    },
];

// =============================================================================
// Resolved configuration
// =============================================================================

/// A shortcut as configured. Generated icons are attached separately by the
/// shortcut stage.
#[derive(Debug, Clone, PartialEq)]
pub struct ShortcutConfig {
    pub name: String,
    pub short_name: String,
    pub description: String,
    pub url: String,
    /// Resolved path of the shortcut's own icon.
    pub icon_source: Option<PathBuf>,
    pub purposes: Vec<Purpose>,
}

/// A screenshot on disk, queued for the screenshots stage.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalScreenshot {
    pub path: PathBuf,
    /// Literal `WxH` from the options; read from the image when absent.
    pub size: Option<String>,
}

/// Icon generation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct IconGenConfig {
    pub base_icon: PathBuf,
    /// File stem of the base icon, used in default icon filenames.
    pub base_icon_name: String,
    pub sizes: Vec<u32>,
    pub shortcut_sizes: Vec<u32>,
    /// Output encodings in output order. Always contains PNG.
    pub formats: Vec<Encoding>,
    pub resize_fit: ResizeFit,
    pub purposes: Vec<Purpose>,
    pub apple_touch_icon_bg: String,
    pub apple_touch_icon_bg_rgba: Rgba,
    pub apple_touch_icon_padding: u32,
    pub ms_tile_color: String,
    pub gen_favicons: bool,
    pub gen_pinned_tab: bool,
    pub pinned_tab_color: String,
}

impl IconGenConfig {
    /// PNG options used for every auxiliary (PNG-only) icon.
    pub fn png_options(&self) -> PngOptions {
        self.formats
            .iter()
            .find_map(|e| match e {
                Encoding::Png(o) => Some(*o),
                _ => None,
            })
            .unwrap_or_else(PngOptions::baseline)
    }
}

/// Fully resolved generator configuration. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestConfig {
    pub disabled: bool,
    pub name: String,
    pub short_name: String,
    pub description: String,
    pub start_url: String,
    pub scope: String,
    pub theme_color: String,
    /// Normalized, always ends with `/`.
    pub base_url: String,
    pub extras: ManifestExtras,
    /// Arbitrary members copied verbatim into the manifest, last.
    pub include: Map<String, Value>,
    /// Screenshots given as absolute URLs, already in manifest form.
    pub screenshots: Vec<ScreenshotEntry>,
    pub local_screenshots: Vec<LocalScreenshot>,
    pub shortcuts: Vec<ShortcutConfig>,
    pub icons: IconGenConfig,
    /// HTML inserts known before any artifact is generated.
    pub html: Vec<HtmlInsert>,
}

// =============================================================================
// Lookup helpers
// =============================================================================

/// JavaScript-style truthiness of a JSON value.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// An options object being read in one [`Context`].
struct OptionSource<'a> {
    map: &'a Map<String, Value>,
    fallback: Option<&'a Map<String, Value>>,
    context: Context,
}

impl<'a> OptionSource<'a> {
    fn new(map: &'a Map<String, Value>, context: Context) -> Self {
        Self {
            map,
            fallback: None,
            context,
        }
    }

    fn with_fallback(mut self, fallback: Option<&'a Map<String, Value>>) -> Self {
        self.fallback = fallback;
        self
    }

    /// First alias present, then the fallback under the canonical alias.
    fn defined(&self, key: &OptionKey) -> Option<&'a Value> {
        key.aliases
            .iter()
            .find_map(|alias| self.map.get(*alias))
            .or_else(|| {
                self.fallback
                    .and_then(|fallback| fallback.get(key.aliases[0]))
            })
    }

    /// Like [`defined`](Self::defined), but falsy values count as unset.
    fn truthy(&self, key: &OptionKey) -> Option<&'a Value> {
        self.defined(key).filter(|v| is_truthy(v))
    }

    fn invalid(&self, key: &OptionKey, expected: &'static str) -> ConfigError {
        ConfigError::Invalid {
            context: self.context,
            option: key.label,
            expected,
        }
    }

    fn missing(&self, key: &OptionKey) -> ConfigError {
        ConfigError::Missing {
            context: self.context,
            option: key.label,
        }
    }

    fn as_string(&self, key: &OptionKey, value: Option<&Value>) -> Result<Option<String>, ConfigError> {
        match value {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(self.invalid(key, "a string")),
        }
    }

    fn string(&self, key: &OptionKey) -> Result<Option<String>, ConfigError> {
        self.as_string(key, self.defined(key))
    }

    fn truthy_string(&self, key: &OptionKey) -> Result<Option<String>, ConfigError> {
        self.as_string(key, self.truthy(key))
    }

    fn required_string(&self, key: &OptionKey) -> Result<String, ConfigError> {
        self.string(key)?.ok_or_else(|| self.missing(key))
    }

    fn as_bool(&self, key: &OptionKey, value: Option<&Value>) -> Result<Option<bool>, ConfigError> {
        match value {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(_) => Err(self.invalid(key, "a boolean")),
        }
    }

    fn bool(&self, key: &OptionKey) -> Result<Option<bool>, ConfigError> {
        self.as_bool(key, self.defined(key))
    }

    /// A list of positive pixel sizes. Keeps order, drops duplicates, and
    /// appends any missing `baseline` size.
    fn size_list(&self, key: &OptionKey, baseline: &[u32]) -> Result<Option<Vec<u32>>, ConfigError> {
        let Some(value) = self.defined(key) else {
            return Ok(None);
        };
        let expected = "an array of positive integer pixel sizes";
        let items = value.as_array().ok_or_else(|| self.invalid(key, expected))?;
        let mut sizes: Vec<u32> = Vec::with_capacity(items.len() + baseline.len());
        for item in items {
            let size = item
                .as_u64()
                .filter(|n| *n > 0)
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| self.invalid(key, expected))?;
            if !sizes.contains(&size) {
                sizes.push(size);
            }
        }
        for size in baseline {
            if !sizes.contains(size) {
                sizes.push(*size);
            }
        }
        Ok(Some(sizes))
    }

    fn purposes(&self, key: &OptionKey) -> Result<Option<Vec<Purpose>>, ConfigError> {
        self.defined(key)
            .map(|v| {
                serde_json::from_value::<Vec<Purpose>>(v.clone()).map_err(|_| {
                    self.invalid(
                        key,
                        "an array of 'badge', 'maskable', 'monochrome', or 'any'",
                    )
                })
            })
            .transpose()
    }

    fn object(&self, key: &OptionKey) -> Result<Option<&'a Map<String, Value>>, ConfigError> {
        match self.defined(key) {
            None => Ok(None),
            Some(Value::Object(map)) => Ok(Some(map)),
            Some(_) => Err(self.invalid(key, "an object containing the desired parameters")),
        }
    }
}

/// Apply the environment overlay, if any.
fn overlay_environment(
    options: &Map<String, Value>,
    environment: Option<&str>,
) -> Result<Map<String, Value>, ConfigError> {
    let Some(env) = environment.map(str::to_lowercase) else {
        return Ok(options.clone());
    };
    match options.get(&env) {
        Some(value) if is_truthy(value) => {
            let overlay = value
                .as_object()
                .ok_or_else(|| ConfigError::EnvironmentNotObject {
                    environment: env.clone(),
                })?;
            let mut merged: Map<String, Value> = options
                .iter()
                .filter(|(k, _)| **k != env)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            for (k, v) in overlay {
                merged.insert(k.clone(), v.clone());
            }
            Ok(merged)
        }
        _ => Ok(options.clone()),
    }
}

fn resolve_path(meta: &MetaConfig, path: &str) -> PathBuf {
    meta.resolve_dir.join(path)
}

/// Text after the last `.`, with `jpg` normalized to `jpeg`.
pub(crate) fn image_extension(name: &str) -> Option<String> {
    let ext = &name[name.rfind('.')? + 1..];
    match ext {
        "jpg" => Some("jpeg".to_string()),
        "png" | "jpeg" | "webp" => Some(ext.to_string()),
        _ => None,
    }
}

// =============================================================================
// Resolution
// =============================================================================

impl ManifestConfig {
    /// Resolve raw options into a validated configuration.
    ///
    /// `fallback` supplies top-level values under their canonical alias
    /// when the options omit them; pass `Value::Null` for none.
    pub fn resolve(options: &Value, meta: &MetaConfig, fallback: &Value) -> Result<Self, ConfigError> {
        let raw = options.as_object().ok_or(ConfigError::NotAnObject)?;
        let opts = overlay_environment(raw, meta.environment.as_deref())?;
        let base_url = meta.normalized_base_url();
        let top = OptionSource::new(&opts, Context::Options).with_fallback(fallback.as_object());

        let disabled = top
            .as_bool(&keys::DISABLED, top.truthy(&keys::DISABLED))?
            .unwrap_or(false);
        let name = top.required_string(&keys::NAME)?;
        let short_name = top
            .truthy_string(&keys::SHORT_NAME)?
            .unwrap_or_else(|| name.clone());
        let description = top.truthy_string(&keys::DESCRIPTION)?.unwrap_or_default();
        let start_url = top
            .truthy_string(&keys::START_URL)?
            .unwrap_or_else(|| base_url.clone());
        let scope = top
            .truthy_string(&keys::SCOPE)?
            .unwrap_or_else(|| base_url.clone());
        let theme_color = top
            .truthy_string(&keys::THEME)?
            .unwrap_or_else(|| DEFAULT_THEME.to_string());

        let (screenshots, local_screenshots) = resolve_screenshots(&top, meta)?;
        let shortcuts = resolve_shortcuts(&top, meta)?;

        let icon_opts = top
            .object(&keys::ICON_GEN)?
            .ok_or_else(|| top.missing(&keys::ICON_GEN))?;
        let icons = resolve_icon_gen(
            &OptionSource::new(icon_opts, Context::IconGeneration),
            meta,
            &theme_color,
        )?;

        let html = vec![
            HtmlInsert::new(
                "meta",
                [
                    ("name", "msapplication-config".to_string()),
                    ("content", format!("{base_url}browserconfig.xml")),
                ],
            ),
            HtmlInsert::new("meta", [("name", "theme-color"), ("content", theme_color.as_str())]),
        ];

        let extras = resolve_extras(&opts, &theme_color)?;
        let include = resolve_include(&top, &opts)?;

        Ok(Self {
            disabled,
            name,
            short_name,
            description,
            start_url,
            scope,
            theme_color,
            base_url,
            extras,
            include,
            screenshots,
            local_screenshots,
            shortcuts,
            icons,
            html,
        })
    }
}

fn resolve_screenshots(
    top: &OptionSource<'_>,
    meta: &MetaConfig,
) -> Result<(Vec<ScreenshotEntry>, Vec<LocalScreenshot>), ConfigError> {
    let mut remote = Vec::new();
    let mut local = Vec::new();
    let Some(value) = top.defined(&keys::SCREENSHOTS) else {
        return Ok((remote, local));
    };
    let expected = "an array of screenshot filepaths, absolute URLs, or objects with a 'src' and a 'size'";
    let items = value
        .as_array()
        .ok_or_else(|| top.invalid(&keys::SCREENSHOTS, expected))?;

    let mut parsed = Vec::with_capacity(items.len());
    for item in items {
        let entry = match item {
            Value::String(src) => (src.as_str(), None),
            Value::Object(obj) => {
                let src = obj
                    .get("src")
                    .and_then(Value::as_str)
                    .ok_or_else(|| top.invalid(&keys::SCREENSHOTS, expected))?;
                let size = match obj.get("size") {
                    None => None,
                    Some(Value::String(s)) => Some(s.clone()),
                    Some(_) => return Err(top.invalid(&keys::SCREENSHOTS, expected)),
                };
                (src, size)
            }
            _ => return Err(top.invalid(&keys::SCREENSHOTS, expected)),
        };
        parsed.push(entry);
    }

    for (src, size) in parsed {
        let ext = image_extension(src).ok_or_else(|| ConfigError::InvalidScreenshotType {
            src: src.to_string(),
        })?;
        if is_absolute_url(src) {
            remote.push(ScreenshotEntry {
                src: src.to_string(),
                mime_type: format!("image/{ext}"),
                sizes: size.filter(|s| !s.is_empty()),
            });
            continue;
        }
        let path = resolve_path(meta, src);
        if !path.exists() {
            return Err(ConfigError::ScreenshotNotFound {
                src: src.to_string(),
            });
        }
        local.push(LocalScreenshot {
            path,
            size: size.filter(|s| !s.is_empty()),
        });
    }
    Ok((remote, local))
}

fn resolve_shortcuts(top: &OptionSource<'_>, meta: &MetaConfig) -> Result<Vec<ShortcutConfig>, ConfigError> {
    let Some(value) = top.defined(&keys::SHORTCUTS) else {
        return Ok(Vec::new());
    };
    let expected = "an array of shortcut options with names, URLs, and an optional icon, short name, and description";
    let items = value
        .as_array()
        .filter(|a| a.iter().all(Value::is_object))
        .ok_or_else(|| top.invalid(&keys::SHORTCUTS, expected))?;

    let mut shortcuts = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let Some(map) = item.as_object() else {
            return Err(top.invalid(&keys::SHORTCUTS, expected));
        };
        let src = OptionSource::new(map, Context::Shortcut(index));
        let name = src.required_string(&keys::SHORTCUT_NAME)?;
        let short_name = src
            .truthy_string(&keys::SHORTCUT_SHORT_NAME)?
            .unwrap_or_else(|| name.clone());
        let url = src.required_string(&keys::SHORTCUT_URL)?;
        let description = src.truthy_string(&keys::DESCRIPTION)?.unwrap_or_default();

        let icon_source = match src.string(&keys::SHORTCUT_ICON)? {
            None => None,
            Some(icon) => {
                let path = resolve_path(meta, &icon);
                if !path.exists() {
                    return Err(ConfigError::ShortcutIconNotFound { index, path: icon });
                }
                Some(path)
            }
        };

        let purposes = match src.defined(&keys::PURPOSES) {
            None => Vec::new(),
            Some(_) if icon_source.is_none() => {
                return Err(ConfigError::PurposesWithoutIcon { index });
            }
            Some(_) => src.purposes(&keys::PURPOSES)?.unwrap_or_default(),
        };

        shortcuts.push(ShortcutConfig {
            name,
            short_name,
            description,
            url,
            icon_source,
            purposes,
        });
    }
    Ok(shortcuts)
}

fn default_formats() -> Vec<Encoding> {
    vec![
        Encoding::Webp(WebpOptions {
            quality: 85,
            effort: 6,
            ..WebpOptions::default()
        }),
        Encoding::Png(PngOptions::baseline()),
    ]
}

fn resolve_formats(src: &OptionSource<'_>) -> Result<Vec<Encoding>, ConfigError> {
    let Some(map) = src.object(&keys::FORMATS)? else {
        return Ok(default_formats());
    };
    let expected = "an object keyed by supported output types (png, webp, jpeg, or tiff)";
    let mut formats = Vec::with_capacity(map.len() + 1);
    for (name, options) in map {
        let format: EncodeFormat = name
            .parse()
            .map_err(|_| src.invalid(&keys::FORMATS, expected))?;
        let encoding = Encoding::from_json(format, options)
            .map_err(|reason| ConfigError::InvalidEncoderOptions { format, reason })?;
        formats.push(encoding);
    }
    if !formats.iter().any(|e| e.format() == EncodeFormat::Png) {
        formats.push(Encoding::Png(PngOptions::baseline()));
    }
    Ok(formats)
}

fn resolve_icon_gen(
    src: &OptionSource<'_>,
    meta: &MetaConfig,
    theme: &str,
) -> Result<IconGenConfig, ConfigError> {
    let ms_tile_color = src
        .truthy_string(&keys::MS_TILE_COLOR)?
        .unwrap_or_else(|| theme.to_string());

    let base_icon_option = src.required_string(&keys::BASE_ICON)?;
    let base_icon = resolve_path(meta, &base_icon_option);
    if !base_icon.exists() {
        return Err(ConfigError::BaseIconNotFound {
            path: base_icon_option,
        });
    }
    let base_icon_name = file_stem(&base_icon);

    let sizes = src
        .size_list(&keys::SIZES, &BASELINE_SIZES)?
        .unwrap_or_else(|| DEFAULT_SIZES.to_vec());
    let shortcut_sizes = src
        .size_list(&keys::SHORTCUT_SIZES, &BASELINE_SHORTCUT_SIZES)?
        .unwrap_or_else(|| DEFAULT_SHORTCUT_SIZES.to_vec());
    let formats = resolve_formats(src)?;

    let resize_fit = match src.truthy(&keys::RESIZE_METHOD) {
        None => ResizeFit::default(),
        Some(v) => serde_json::from_value(v.clone()).map_err(|_| {
            src.invalid(&keys::RESIZE_METHOD, "one of 'cover', 'contain', or 'fill'")
        })?,
    };
    let purposes = src.purposes(&keys::PURPOSES)?.unwrap_or_default();

    let apple_touch_icon_bg = src
        .truthy_string(&keys::APPLE_TOUCH_ICON_BG)?
        .unwrap_or_else(|| theme.to_string());
    let apple_touch_icon_bg_rgba =
        Rgba::parse_css(&apple_touch_icon_bg).ok_or_else(|| ConfigError::InvalidColor {
            option: keys::APPLE_TOUCH_ICON_BG.label,
            value: apple_touch_icon_bg.clone(),
        })?;
    let apple_touch_icon_padding = match src.defined(&keys::APPLE_TOUCH_ICON_PADDING) {
        None => DEFAULT_APPLE_TOUCH_ICON_PADDING,
        Some(v) => v
            .as_u64()
            .filter(|n| *n <= MAX_APPLE_TOUCH_ICON_PADDING)
            .map(|n| n as u32)
            .ok_or_else(|| {
                src.invalid(
                    &keys::APPLE_TOUCH_ICON_PADDING,
                    "a whole number of pixels between 0 and 89",
                )
            })?,
    };

    let gen_favicons = src.bool(&keys::GEN_FAVICONS)?.unwrap_or(false);
    let gen_pinned_tab = src.bool(&keys::GEN_PINNED_TAB)?.unwrap_or(false);
    let pinned_tab_color = match src.string(&keys::PINNED_TAB_COLOR)? {
        Some(_) if !gen_pinned_tab => return Err(ConfigError::PinnedTabColorWithoutGeneration),
        Some(color) => color,
        None if theme == DEFAULT_THEME => "black".to_string(),
        None => theme.to_string(),
    };

    Ok(IconGenConfig {
        base_icon,
        base_icon_name,
        sizes,
        shortcut_sizes,
        formats,
        resize_fit,
        purposes,
        apple_touch_icon_bg,
        apple_touch_icon_bg_rgba,
        apple_touch_icon_padding,
        ms_tile_color,
        gen_favicons,
        gen_pinned_tab,
        pinned_tab_color,
    })
}

pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn resolve_extras(opts: &Map<String, Value>, theme: &str) -> Result<ManifestExtras, ConfigError> {
    let mut members = Map::new();
    for extra in EXTRA_OPTIONS {
        let canonical = extra.aliases[0];
        match extra.aliases.iter().find_map(|a| opts.get(*a)) {
            Some(value) => {
                if !(extra.check)(value) {
                    return Err(ConfigError::InvalidExtra { option: canonical });
                }
                members.insert(canonical.to_string(), value.clone());
            }
            None => match &extra.default {
                Some(ExtraDefault::ThemeColor) => {
                    members.insert(canonical.to_string(), Value::String(theme.to_string()));
                }
                Some(ExtraDefault::Literal(v)) => {
                    members.insert(canonical.to_string(), Value::String(v.to_string()));
                }
                None => {}
            },
        }
    }
    serde_json::from_value(Value::Object(members)).map_err(|_| ConfigError::Invalid {
        context: Context::Options,
        option: "manifest members",
        expected: "valid Web App Manifest members",
    })
}

fn resolve_include(
    top: &OptionSource<'_>,
    opts: &Map<String, Value>,
) -> Result<Map<String, Value>, ConfigError> {
    let mut include = Map::new();
    let Some(value) = top.defined(&keys::INCLUDE) else {
        return Ok(include);
    };
    let names = value
        .as_array()
        .filter(|a| a.iter().all(Value::is_string))
        .ok_or_else(|| {
            top.invalid(
                &keys::INCLUDE,
                "an array of extra parameter names to include in the final manifest",
            )
        })?;
    for name in names.iter().filter_map(Value::as_str) {
        if let Some(v) = opts.get(name) {
            include.insert(name.to_string(), v.clone());
        }
    }
    Ok(include)
}
