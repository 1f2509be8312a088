//! Image derivation pipeline.
//!
//! Runs the artifact stages against the configured source images, in a
//! fixed order:
//!
//! | # | Stage | Artifacts | References |
//! |---|---|---|---|
//! | 1 | Default icons | `{stem}-{S}x{S}.{fmt}` per size × format | manifest `icons` |
//! | 2 | Shortcut icons | `shortcut-{stem}{i}-{S}x{S}.{fmt}` | shortcut `icons` |
//! | 3 | Favicons (opt-in) | `favicon-32x32.png`, `favicon-16x16.png` | `<link rel="icon">` |
//! | 4 | Safari pinned tab (opt-in) | `safari-pinned-tab.svg` | `<link rel="mask-icon">` |
//! | 5 | Screenshots | source basename, bytes verbatim | manifest `screenshots` |
//! | 6 | Apple Touch Icon | `apple-touch-icon.png` | `<link rel="apple-touch-icon">` |
//! | 7 | Microsoft tiles | `mstile-{W}x{H}.png` | `browserconfig.xml` |
//!
//! ## Output Naming
//!
//! Every artifact goes through the [`EventBus`] before it is stored: the
//! stage proposes a logical filename, hooks may rewrite content or name, and
//! unless a hook picked the name, the final content is fingerprinted with
//! the [`naming`](crate::naming) rules.
//!
//! ## Parallel Processing
//!
//! Within a stage, all resize/encode jobs run in parallel using
//! [rayon](https://docs.rs/rayon). Results are collected in job order and
//! published sequentially, so events and filenames are reproducible.

use crate::config::{ManifestConfig, ShortcutConfig, file_stem, image_extension, join_purposes};
use crate::events::{Event, EventBus, PendingArtifact, Stage};
use crate::imaging::{
    BackendError, Encoding, ImageBackend, PadParams, ResizeFit, ResizeParams, SourceImage,
};
use crate::naming::{HashFunction, HashMethod, fingerprint, split_filename};
use crate::types::{HtmlInsert, IconEntry, ScreenshotEntry, escape_markup};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("Failed to load {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: BackendError,
    },
    #[error("An error occurred during the {stage} creation process: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: BackendError,
    },
    #[error("Failed to serialize the manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}

const FAVICON_SIZES: [u32; 2] = [32, 16];
const APPLE_TOUCH_ICON_SIZE: u32 = 180;
const MS_TILE_SQUARES: [u32; 3] = [70, 150, 310];
const MS_TILE_WIDE: (u32, u32) = (310, 150);

/// A shortcut with the icons generated for it, if it declared one.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedShortcut {
    pub config: ShortcutConfig,
    pub icons: Option<Vec<IconEntry>>,
}

/// Everything the stages produced, ready for manifest assembly.
#[derive(Debug, Default)]
pub struct StageOutputs {
    pub files: BTreeMap<String, Vec<u8>>,
    pub icons: Vec<IconEntry>,
    pub shortcuts: Vec<ResolvedShortcut>,
    /// Remote screenshots from the options followed by processed local ones.
    pub screenshots: Vec<ScreenshotEntry>,
    /// Configured inserts followed by per-stage inserts.
    pub html: Vec<HtmlInsert>,
    /// Contents of the browserconfig `<tile>` element.
    pub tile_body: String,
}

/// One resize/encode job: target box and codec.
#[derive(Debug, Clone, Copy)]
struct Job {
    width: u32,
    height: u32,
    encoding: Encoding,
}

/// Run every job against `source` in parallel, keeping job order.
fn encode_all(
    backend: &impl ImageBackend,
    source: &SourceImage,
    fit: ResizeFit,
    jobs: &[Job],
) -> Result<Vec<Vec<u8>>, BackendError> {
    jobs.par_iter()
        .map(|job| {
            backend.resize(
                source,
                &ResizeParams {
                    width: job.width,
                    height: job.height,
                    fit,
                    encoding: job.encoding,
                },
            )
        })
        .collect()
}

/// Square jobs for each size × format, size-major.
fn matrix(sizes: &[u32], formats: &[Encoding]) -> Vec<Job> {
    sizes
        .iter()
        .flat_map(|&size| {
            formats.iter().map(move |&encoding| Job {
                width: size,
                height: size,
                encoding,
            })
        })
        .collect()
}

/// MIME type of an output filename, `jpg` normalized to `jpeg`.
fn mime_from_filename(name: &str) -> String {
    let ext = image_extension(name)
        .or_else(|| split_filename(name).ext.map(str::to_string))
        .unwrap_or_default();
    format!("image/{ext}")
}

/// Drives the stages for one generation run.
pub struct Pipeline<'a, B: ImageBackend> {
    backend: &'a B,
    config: &'a ManifestConfig,
    bus: &'a mut EventBus,
    hash_method: HashMethod,
    hash: &'a HashFunction,
    out: StageOutputs,
}

impl<'a, B: ImageBackend> Pipeline<'a, B> {
    pub fn new(
        backend: &'a B,
        config: &'a ManifestConfig,
        bus: &'a mut EventBus,
        hash_method: HashMethod,
        hash: &'a HashFunction,
    ) -> Self {
        let out = StageOutputs {
            screenshots: config.screenshots.clone(),
            html: config.html.clone(),
            tile_body: format!(
                "<TileColor>{}</TileColor>",
                escape_markup(&config.icons.ms_tile_color)
            ),
            ..StageOutputs::default()
        };
        Self {
            backend,
            config,
            bus,
            hash_method,
            hash,
            out,
        }
    }

    /// Run stages 1-7 and hand back what they produced.
    pub fn run(mut self) -> Result<StageOutputs, GenerateError> {
        let base = self.load(&self.config.icons.base_icon)?;

        self.default_icons(&base)?;
        self.shortcut_icons()?;
        if self.config.icons.gen_favicons {
            self.favicons(&base)?;
        }
        if self.config.icons.gen_pinned_tab {
            self.safari_pinned_tab(&base)?;
        }
        self.screenshots()?;
        self.apple_touch_icon(&base)?;
        self.ms_tiles(&base)?;
        Ok(self.out)
    }

    fn load(&self, path: &Path) -> Result<SourceImage, GenerateError> {
        self.backend.load(path).map_err(|source| GenerateError::Load {
            path: path.to_path_buf(),
            source,
        })
    }

    fn begin(&mut self, stage: Stage, message: &str) {
        self.bus.emit(&Event::StageStart { stage, message });
    }

    fn finish(&mut self, stage: Stage) {
        self.bus.emit(&Event::StageEnd { stage });
    }

    /// Publish an artifact, settle its output name, and store it.
    fn store(&mut self, stage: Stage, logical: String, content: Vec<u8>) -> String {
        let published = self.bus.publish(PendingArtifact {
            stage,
            filename: logical,
            content,
        });
        let filename = if published.renamed {
            published.filename
        } else {
            fingerprint(
                &published.filename,
                &published.content,
                self.hash_method,
                self.hash,
            )
        };
        self.out.files.insert(filename.clone(), published.content);
        filename
    }

    fn url(&self, filename: &str) -> String {
        format!("{}{}", self.config.base_url, filename)
    }

    /// Encode a size × format matrix and publish it as icon entries.
    fn icon_set(
        &mut self,
        stage: Stage,
        source: &SourceImage,
        sizes: &[u32],
        name_prefix: &str,
        purpose: Option<String>,
    ) -> Result<Vec<IconEntry>, GenerateError> {
        let jobs = matrix(sizes, &self.config.icons.formats);
        let encoded = encode_all(self.backend, source, self.config.icons.resize_fit, &jobs)
            .map_err(|source| GenerateError::Stage { stage, source })?;

        let mut entries = Vec::with_capacity(jobs.len());
        for (job, content) in jobs.iter().zip(encoded) {
            let sizes = format!("{}x{}", job.width, job.height);
            let format = job.encoding.format();
            let filename = self.store(stage, format!("{name_prefix}-{sizes}.{format}"), content);
            entries.push(IconEntry {
                src: self.url(&filename),
                sizes,
                mime_type: format.mime_type(),
                purpose: purpose.clone(),
            });
        }
        Ok(entries)
    }

    fn default_icons(&mut self, base: &SourceImage) -> Result<(), GenerateError> {
        let stage = Stage::DefaultIcons;
        let config = self.config;
        self.begin(stage, &format!("Generating icons for {}...", config.name));
        let icons = &config.icons;
        let icons = self.icon_set(
            stage,
            base,
            &icons.sizes,
            &icons.base_icon_name,
            join_purposes(&icons.purposes),
        )?;
        self.out.icons = icons;
        self.finish(stage);
        Ok(())
    }

    fn shortcut_icons(&mut self) -> Result<(), GenerateError> {
        let stage = Stage::ShortcutIcons;
        let config = self.config;
        self.begin(stage, "Generating shortcut icons...");
        for (index, shortcut) in config.shortcuts.iter().enumerate() {
            let icons = match &shortcut.icon_source {
                None => None,
                Some(path) => {
                    let source = self.load(path)?;
                    let prefix = format!("shortcut-{}{index}", file_stem(path));
                    Some(self.icon_set(
                        stage,
                        &source,
                        &config.icons.shortcut_sizes,
                        &prefix,
                        join_purposes(&shortcut.purposes),
                    )?)
                }
            };
            self.out.shortcuts.push(ResolvedShortcut {
                config: shortcut.clone(),
                icons,
            });
        }
        self.finish(stage);
        Ok(())
    }

    fn favicons(&mut self, base: &SourceImage) -> Result<(), GenerateError> {
        let stage = Stage::Favicon;
        self.begin(stage, "Generating favicons...");
        let png = Encoding::Png(self.config.icons.png_options());
        let jobs: Vec<Job> = FAVICON_SIZES
            .iter()
            .map(|&size| Job {
                width: size,
                height: size,
                encoding: png,
            })
            .collect();
        let encoded = encode_all(self.backend, base, self.config.icons.resize_fit, &jobs)
            .map_err(|source| GenerateError::Stage { stage, source })?;

        for (job, content) in jobs.iter().zip(encoded) {
            let sizes = format!("{}x{}", job.width, job.height);
            let filename = self.store(stage, format!("favicon-{sizes}.png"), content);
            let href = self.url(&filename);
            self.out.html.push(HtmlInsert::new(
                "link",
                [("rel", "icon".to_string()), ("sizes", sizes), ("href", href)],
            ));
        }
        self.finish(stage);
        Ok(())
    }

    fn safari_pinned_tab(&mut self, base: &SourceImage) -> Result<(), GenerateError> {
        let stage = Stage::SafariPinnedTab;
        self.begin(stage, "Generating Safari Pinned Tab...");
        let svg = self
            .backend
            .posterize(base)
            .map_err(|source| GenerateError::Stage { stage, source })?;
        let filename = self.store(stage, "safari-pinned-tab.svg".to_string(), svg.into_bytes());
        let href = self.url(&filename);
        self.out.html.push(HtmlInsert::new(
            "link",
            [
                ("rel", "mask-icon".to_string()),
                ("href", href),
                ("color", self.config.icons.pinned_tab_color.clone()),
            ],
        ));
        self.finish(stage);
        Ok(())
    }

    fn screenshots(&mut self) -> Result<(), GenerateError> {
        let stage = Stage::Screenshots;
        let config = self.config;
        self.begin(stage, "Generating screenshots...");
        for shot in &config.local_screenshots {
            let stage_err = |source: BackendError| GenerateError::Stage { stage, source };
            let sizes = match &shot.size {
                Some(size) => size.clone(),
                None => self.backend.identify(&shot.path).map_err(stage_err)?.to_string(),
            };
            let content = self.backend.read_bytes(&shot.path).map_err(stage_err)?;
            let logical = shot
                .path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let filename = self.store(stage, logical, content);
            self.out.screenshots.push(ScreenshotEntry {
                src: self.url(&filename),
                mime_type: mime_from_filename(&filename),
                sizes: Some(sizes),
            });
        }
        self.finish(stage);
        Ok(())
    }

    fn apple_touch_icon(&mut self, base: &SourceImage) -> Result<(), GenerateError> {
        let stage = Stage::AppleTouchIcon;
        self.begin(stage, "Generating Apple Touch Icon...");
        let icons = &self.config.icons;
        let content = self
            .backend
            .pad_and_flatten(
                base,
                &PadParams {
                    size: APPLE_TOUCH_ICON_SIZE,
                    padding: icons.apple_touch_icon_padding,
                    fit: icons.resize_fit,
                    background: icons.apple_touch_icon_bg_rgba,
                    png: icons.png_options(),
                },
            )
            .map_err(|source| GenerateError::Stage { stage, source })?;
        let filename = self.store(stage, "apple-touch-icon.png".to_string(), content);
        let href = self.url(&filename);
        self.out.html.push(HtmlInsert::new(
            "link",
            [
                ("rel", "apple-touch-icon".to_string()),
                ("sizes", format!("{APPLE_TOUCH_ICON_SIZE}x{APPLE_TOUCH_ICON_SIZE}")),
                ("href", href),
            ],
        ));
        self.finish(stage);
        Ok(())
    }

    fn ms_tiles(&mut self, base: &SourceImage) -> Result<(), GenerateError> {
        let stage = Stage::MsTile;
        self.begin(stage, "Generating Microsoft Tile Icons...");
        let png = Encoding::Png(self.config.icons.png_options());
        let mut jobs: Vec<Job> = MS_TILE_SQUARES
            .iter()
            .map(|&size| Job {
                width: size,
                height: size,
                encoding: png,
            })
            .collect();
        jobs.push(Job {
            width: MS_TILE_WIDE.0,
            height: MS_TILE_WIDE.1,
            encoding: png,
        });
        let encoded = encode_all(self.backend, base, self.config.icons.resize_fit, &jobs)
            .map_err(|source| GenerateError::Stage { stage, source })?;

        for (job, content) in jobs.iter().zip(encoded) {
            let sizes = format!("{}x{}", job.width, job.height);
            let filename = self.store(stage, format!("mstile-{sizes}.png"), content);
            let element = if job.width == job.height {
                format!("square{sizes}logo")
            } else {
                format!("wide{sizes}logo")
            };
            let src = self.url(&filename);
            self.out
                .tile_body
                .push_str(&format!("<{element} src=\"{}\"/>", escape_markup(&src)));
        }
        self.finish(stage);
        Ok(())
    }
}
