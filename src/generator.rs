//! The public entry point.
//!
//! A [`Generator`] owns a validated configuration, an image backend, the
//! naming settings and the event subscribers. Construction does all option
//! checking; [`Generator::generate`] only fails when an image cannot be
//! processed.
//!
//! ```no_run
//! use pwa_manifest::{Generator, HashMethod, MetaConfig};
//! use serde_json::json;
//!
//! let options = json!({
//!     "name": "Weather",
//!     "icons": { "baseIcon": "./icon.png", "genFavicons": true }
//! });
//! let mut generator = Generator::new(&options, &MetaConfig::default(), &json!({}))?;
//! generator.set_hash_method(HashMethod::Content);
//! generator.on_any(pwa_manifest::output::print_event);
//!
//! let generation = generator.generate()?;
//! for (filename, bytes) in &generation.generated_files {
//!     println!("{filename}: {} bytes", bytes.len());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::config::{ConfigError, ManifestConfig, MetaConfig};
use crate::events::{Event, EventBus, EventName, Override, PendingArtifact, Stage};
use crate::generate::{Generation, assemble};
use crate::imaging::{ImageBackend, RustBackend};
use crate::naming::{HashFunction, HashMethod, default_hash_function};
use crate::process::{GenerateError, Pipeline};
use serde_json::Value;

pub struct Generator<B: ImageBackend = RustBackend> {
    config: ManifestConfig,
    backend: B,
    bus: EventBus,
    hash_method: HashMethod,
    hash: HashFunction,
}

impl Generator<RustBackend> {
    /// Resolve `options` and pair them with the built-in backend.
    ///
    /// `fallback` supplies top-level options the host already knows (such
    /// as package name and description); pass `Value::Null` for none.
    pub fn new(options: &Value, meta: &MetaConfig, fallback: &Value) -> Result<Self, ConfigError> {
        Self::with_backend(RustBackend::new(), options, meta, fallback)
    }
}

impl<B: ImageBackend> Generator<B> {
    pub fn with_backend(
        backend: B,
        options: &Value,
        meta: &MetaConfig,
        fallback: &Value,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            config: ManifestConfig::resolve(options, meta, fallback)?,
            backend,
            bus: EventBus::new(),
            hash_method: HashMethod::default(),
            hash: default_hash_function(),
        })
    }

    pub fn config(&self) -> &ManifestConfig {
        &self.config
    }

    /// Stem of the base icon, used to name the default icons.
    pub fn base_icon_name(&self) -> &str {
        &self.config.icons.base_icon_name
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn set_hash_method(&mut self, method: HashMethod) {
        self.hash_method = method;
    }

    pub fn set_hash_function(&mut self, hash: HashFunction) {
        self.hash = hash;
    }

    /// Subscribe to one event.
    pub fn on(&mut self, name: EventName, observer: impl FnMut(&Event<'_>) + Send + 'static) {
        self.bus.on(name, observer);
    }

    /// Subscribe to every event.
    pub fn on_any(&mut self, observer: impl FnMut(EventName, &Event<'_>) + Send + 'static) {
        self.bus.on_any(observer);
    }

    /// Register a hook that may replace artifacts of `stage`.
    pub fn on_generated(
        &mut self,
        stage: Stage,
        hook: impl FnMut(&PendingArtifact) -> Override + Send + 'static,
    ) {
        self.bus.on_generated(stage, hook);
    }

    /// Run every stage and assemble the manifest.
    ///
    /// A disabled configuration yields [`Generation::empty`] without
    /// emitting any event.
    pub fn generate(&mut self) -> Result<Generation, GenerateError> {
        if self.config.disabled {
            return Ok(Generation::empty());
        }

        self.bus.emit(&Event::Start);
        let outputs = Pipeline::new(
            &self.backend,
            &self.config,
            &mut self.bus,
            self.hash_method,
            &self.hash,
        )
        .run()?;
        let generation = assemble(&self.config, outputs)?;
        self.bus.emit(&Event::End);
        Ok(generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::MockBackend;
    use crate::test_helpers::{IconFixture, options_with_icon};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn generator(fx: &IconFixture, options: Value) -> Generator<MockBackend> {
        Generator::with_backend(MockBackend::new(), &options, &fx.meta(), &Value::Null).unwrap()
    }

    #[test]
    fn start_and_end_wrap_stage_events() {
        let fx = IconFixture::new();
        let mut generator = generator(&fx, options_with_icon(json!({"name": "A"})));
        let log = Arc::new(Mutex::new(Vec::new()));
        let l = Arc::clone(&log);
        generator.on_any(move |name, _| l.lock().unwrap().push(name));

        generator.generate().unwrap();
        let log = log.lock().unwrap();
        assert_eq!(log.first(), Some(&EventName::Start));
        assert_eq!(log.get(1), Some(&EventName::StageStart(Stage::DefaultIcons)));
        assert_eq!(log.last(), Some(&EventName::End));
    }

    #[test]
    fn disabled_generates_nothing() {
        let fx = IconFixture::new();
        let mut generator = generator(&fx, options_with_icon(json!({"name": "A", "disable": true})));
        let count = Arc::new(Mutex::new(0));
        let c = Arc::clone(&count);
        generator.on_any(move |_, _| *c.lock().unwrap() += 1);

        let generation = generator.generate().unwrap();
        assert_eq!(generation, Generation::empty());
        assert_eq!(*count.lock().unwrap(), 0);
        assert!(generator.backend().get_operations().is_empty());
    }

    #[test]
    fn repeated_runs_are_equal() {
        let fx = IconFixture::new();
        let mut generator = generator(&fx, options_with_icon(json!({"name": "A"})));
        generator.set_hash_method(HashMethod::Content);
        let first = generator.generate().unwrap();
        let second = generator.generate().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn custom_hash_function() {
        let fx = IconFixture::new();
        let mut generator = generator(&fx, options_with_icon(json!({"name": "A"})));
        generator.set_hash_function(Arc::new(|_: &[u8]| "0123456789abcdef".to_string()));
        let generation = generator.generate().unwrap();
        assert!(generation.generated_files.contains_key("icon-96x96.89abcdef.webp"));
        assert!(generation.generated_files.contains_key("apple-touch-icon.89abcdef.png"));
    }

    #[test]
    fn manifest_references_every_icon_file() {
        let fx = IconFixture::new();
        let mut generator = generator(&fx, options_with_icon(json!({"name": "A"})));
        generator.set_hash_method(HashMethod::Content);
        let generation = generator.generate().unwrap();

        for icon in generation.manifest["icons"].as_array().unwrap() {
            let src = icon["src"].as_str().unwrap();
            let name = src.strip_prefix('/').unwrap();
            assert!(generation.generated_files.contains_key(name), "{name}");
        }
    }

    #[test]
    fn base_icon_name_from_path() {
        let fx = IconFixture::new();
        let generator = generator(&fx, options_with_icon(json!({"name": "A"})));
        assert_eq!(generator.base_icon_name(), "icon");
        assert_eq!(generator.config().name, "A");
    }
}
