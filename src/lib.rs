//! # PWA Manifest
//!
//! Generates everything a web page needs to be installable as a Progressive
//! Web App from a single high-resolution icon: the `manifest.webmanifest`
//! document, resized icons in several formats, favicons, an Apple Touch
//! Icon, Microsoft tile images with their `browserconfig.xml`, an optional
//! Safari pinned-tab mask, and the `<head>` elements that reference them.
//!
//! The crate is the framework-agnostic core. Bundler adapters construct a
//! [`Generator`] from the user's options, call [`Generator::generate`], then
//! write the files and patch the HTML themselves.
//!
//! # Architecture: Resolve, Derive, Assemble
//!
//! ```text
//! 1. Resolve   options (JSON)   →  ManifestConfig   (aliases, defaults, validation)
//! 2. Derive    base icon        →  artifacts        (seven stages, hooks, fingerprints)
//! 3. Assemble  stage outputs    →  Generation       (manifest, browserconfig, <head> list)
//! ```
//!
//! All configuration errors surface in step 1, when the generator is
//! built. Steps 2 and 3 only fail when an image cannot be decoded or
//! encoded.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | Option aliases, fallback and environment overlay, validation into [`ManifestConfig`] |
//! | [`naming`] | Output filename fingerprinting (`name`, `content`, `none`) |
//! | [`events`] | Progress events and generation hooks that may replace artifacts |
//! | [`process`] | The seven artifact stages, parallel encoding with rayon |
//! | [`generate`] | Manifest document, browserconfig and final [`Generation`] record |
//! | [`generator`] | Public entry point tying the above together |
//! | [`imaging`] | [`ImageBackend`] trait and the pure-Rust [`RustBackend`] |
//! | [`types`] | Manifest entries and HTML insert descriptors, rendered with Maud |
//! | [`output`] | Console formatting for progress events |
//!
//! # Design Decisions
//!
//! ## Pluggable Image Backend
//!
//! Stages talk to an [`ImageBackend`] trait rather than the `image` crate
//! directly. Tests use a recording mock to check stage logic without
//! decoding pixels; hosts can supply their own implementation.
//!
//! ## Hooks Return Overrides
//!
//! A generation hook sees each artifact before it is stored and returns an
//! [`Override`]: new content, a new filename, both, or nothing. A filename
//! chosen by a hook is used verbatim; every other name is fingerprinted.
//!
//! ## Synchronous With Data Parallelism
//!
//! [`Generator::generate`] blocks. Inside each stage the resize and encode
//! jobs run on the rayon pool, while events, hooks and naming run in job
//! order on the calling thread, so two runs over the same input produce
//! identical records.

pub mod config;
pub mod events;
pub mod generate;
pub mod generator;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod process;
pub mod types;

pub use config::{ConfigError, ManifestConfig, MetaConfig};
pub use events::{Event, EventName, Override, PendingArtifact, Stage};
pub use generate::{BROWSER_CONFIG_FILENAME, Generation, MANIFEST_FILENAME};
pub use generator::Generator;
pub use imaging::{ImageBackend, RustBackend};
pub use naming::{HashFunction, HashMethod};
pub use process::GenerateError;
pub use types::{HtmlInsert, html_insert_to_string, html_inserts_to_markup};

#[cfg(test)]
pub(crate) mod test_helpers;
