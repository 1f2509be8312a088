//! Manifest assembly.
//!
//! Final step of a generation run. Takes the stage outputs and the resolved
//! configuration and produces the [`Generation`] record hosts consume.
//!
//! ## Manifest Document
//!
//! Keys are emitted in a fixed order:
//!
//! ```json
//! {
//!   "name": "...", "short_name": "...", "start_url": "/", "scope": "/",
//!   "description": "...",
//!   "icons": [ ... ],
//!   "theme_color": "white",
//!   "screenshots": [ ... ],
//!   "shortcuts": [ ... ],
//!   "background_color": "white", "display": "standalone", ...
//! }
//! ```
//!
//! `description`, `screenshots` and `shortcuts` are left out when empty.
//! The include bag is applied last; its keys overwrite earlier ones in
//! place.
//!
//! ## Browser Config
//!
//! Microsoft tiles are described by a `browserconfig.xml` whose `<tile>`
//! element was filled in by the tile stage.

use crate::config::{ManifestConfig, ManifestExtras};
use crate::process::{GenerateError, StageOutputs};
use crate::types::{
    HtmlInsert, IconEntry, ScreenshotEntry, ShortcutEntry, html_inserts_to_markup,
};
use maud::Markup;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Name hosts write the manifest document under.
pub const MANIFEST_FILENAME: &str = "manifest.webmanifest";
/// Name hosts write the browser config under.
pub const BROWSER_CONFIG_FILENAME: &str = "browserconfig.xml";

/// Everything one run produced.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Generation {
    /// The manifest document, a JSON object.
    pub manifest: Value,
    pub browser_config: String,
    /// Generated artifacts keyed by output filename. Does not include the
    /// manifest or the browser config.
    pub generated_files: BTreeMap<String, Vec<u8>>,
    /// Head elements in document insertion order.
    pub html: Vec<HtmlInsert>,
}

impl Generation {
    /// The record returned for a disabled configuration.
    pub fn empty() -> Self {
        Self {
            manifest: Value::Object(Map::new()),
            ..Self::default()
        }
    }

    pub fn manifest_json(&self) -> String {
        self.manifest.to_string()
    }

    /// The HTML inserts rendered as one fragment.
    pub fn head_markup(&self) -> Markup {
        html_inserts_to_markup(&self.html)
    }
}

#[derive(Serialize)]
struct ManifestDocument<'a> {
    name: &'a str,
    short_name: &'a str,
    start_url: &'a str,
    scope: &'a str,
    #[serde(skip_serializing_if = "String::is_empty")]
    description: String,
    icons: Vec<IconEntry>,
    theme_color: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    screenshots: Vec<ScreenshotEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    shortcuts: Vec<ShortcutEntry>,
    #[serde(flatten)]
    extras: &'a ManifestExtras,
}

fn browser_config(tile_body: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\
         <browserconfig><msapplication><tile>{tile_body}</tile></msapplication></browserconfig>"
    )
}

/// Build the manifest, browser config and final HTML list.
pub fn assemble(config: &ManifestConfig, outputs: StageOutputs) -> Result<Generation, GenerateError> {
    let shortcuts = outputs
        .shortcuts
        .into_iter()
        .map(|s| ShortcutEntry {
            name: s.config.name,
            short_name: s.config.short_name,
            description: s.config.description,
            url: s.config.url,
            icons: s.icons,
        })
        .collect();

    let document = ManifestDocument {
        name: &config.name,
        short_name: &config.short_name,
        start_url: &config.start_url,
        scope: &config.scope,
        description: config.description.clone(),
        icons: outputs.icons,
        theme_color: &config.theme_color,
        screenshots: outputs.screenshots,
        shortcuts,
        extras: &config.extras,
    };
    let mut manifest = serde_json::to_value(&document)?;
    if let Value::Object(map) = &mut manifest {
        for (key, value) in &config.include {
            map.insert(key.clone(), value.clone());
        }
    }

    let mut html = outputs.html;
    html.push(HtmlInsert::new(
        "link",
        [
            ("rel", "manifest".to_string()),
            ("href", format!("{}{MANIFEST_FILENAME}", config.base_url)),
        ],
    ));

    Ok(Generation {
        manifest,
        browser_config: browser_config(&outputs.tile_body),
        generated_files: outputs.files,
        html,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ResolvedShortcut;
    use crate::test_helpers::{IconFixture, options_with_icon};
    use serde_json::json;

    fn config(options: Value) -> ManifestConfig {
        let fx = IconFixture::new();
        ManifestConfig::resolve(&options, &fx.meta(), &Value::Null).unwrap()
    }

    fn icon(src: &str) -> IconEntry {
        IconEntry {
            src: src.into(),
            sizes: "96x96".into(),
            mime_type: "image/png".into(),
            purpose: None,
        }
    }

    fn keys(value: &Value) -> Vec<&str> {
        value.as_object().unwrap().keys().map(String::as_str).collect()
    }

    #[test]
    fn minimal_manifest_key_order() {
        let cfg = config(options_with_icon(json!({"name": "Demo"})));
        let outputs = StageOutputs {
            icons: vec![icon("/icon-96x96.png")],
            ..StageOutputs::default()
        };
        let generation = assemble(&cfg, outputs).unwrap();
        assert_eq!(
            keys(&generation.manifest),
            [
                "name",
                "short_name",
                "start_url",
                "scope",
                "icons",
                "theme_color",
                "background_color",
                "display"
            ]
        );
        assert_eq!(generation.manifest["short_name"], "Demo");
        assert_eq!(generation.manifest["display"], "standalone");
        assert_eq!(generation.manifest["background_color"], "white");
    }

    #[test]
    fn optional_sections_in_order() {
        let cfg = config(options_with_icon(json!({
            "name": "Demo",
            "desc": "A demo",
            "lang": "en",
            "shortcuts": [{"name": "Home", "url": "/"}]
        })));
        let outputs = StageOutputs {
            icons: vec![icon("/icon-96x96.png")],
            screenshots: vec![ScreenshotEntry {
                src: "/s.png".into(),
                mime_type: "image/png".into(),
                sizes: Some("1x1".into()),
            }],
            shortcuts: vec![ResolvedShortcut {
                config: cfg.shortcuts[0].clone(),
                icons: None,
            }],
            ..StageOutputs::default()
        };
        let generation = assemble(&cfg, outputs).unwrap();
        assert_eq!(
            keys(&generation.manifest),
            [
                "name",
                "short_name",
                "start_url",
                "scope",
                "description",
                "icons",
                "theme_color",
                "screenshots",
                "shortcuts",
                "background_color",
                "display",
                "lang"
            ]
        );
        assert_eq!(
            generation.manifest["shortcuts"],
            json!([{"name": "Home", "short_name": "Home", "url": "/"}])
        );
    }

    #[test]
    fn include_overwrites_in_place() {
        let cfg = config(options_with_icon(json!({
            "name": "Demo",
            "include": ["name", "custom"],
            "custom": 42
        })));
        let generation = assemble(&cfg, StageOutputs::default()).unwrap();
        let keys = keys(&generation.manifest);
        assert_eq!(keys.first(), Some(&"name"));
        assert_eq!(keys.last(), Some(&"custom"));
        assert_eq!(keys.iter().filter(|k| **k == "name").count(), 1);
        assert_eq!(generation.manifest["custom"], 42);
    }

    #[test]
    fn browser_config_wraps_tile_body() {
        let cfg = config(options_with_icon(json!({"name": "Demo"})));
        let outputs = StageOutputs {
            tile_body: "<TileColor>white</TileColor>".into(),
            ..StageOutputs::default()
        };
        let generation = assemble(&cfg, outputs).unwrap();
        assert_eq!(
            generation.browser_config,
            "<?xml version=\"1.0\" encoding=\"utf-8\"?><browserconfig><msapplication>\
             <tile><TileColor>white</TileColor></tile></msapplication></browserconfig>"
        );
    }

    #[test]
    fn manifest_link_appended_last() {
        let cfg = config(options_with_icon(json!({"name": "Demo"})));
        let outputs = StageOutputs {
            html: cfg.html.clone(),
            ..StageOutputs::default()
        };
        let generation = assemble(&cfg, outputs).unwrap();
        let last = generation.html.last().unwrap();
        assert_eq!(last.attribute("rel"), Some("manifest"));
        assert_eq!(last.attribute("href"), Some("/manifest.webmanifest"));
        assert_eq!(generation.html.len(), 3);
        assert!(
            generation
                .head_markup()
                .into_string()
                .starts_with(r#"<meta name="msapplication-config" content="/browserconfig.xml">"#)
        );
    }

    #[test]
    fn empty_generation() {
        let generation = Generation::empty();
        assert_eq!(generation.manifest_json(), "{}");
        assert!(generation.browser_config.is_empty());
        assert!(generation.generated_files.is_empty());
        assert!(generation.html.is_empty());
    }
}
