//! Shared types produced by the pipeline stages and consumed by the
//! manifest assembler and host adapters.
//!
//! Manifest-facing types serialize to the exact Web App Manifest shape
//! (`src`, `sizes`, `type`, `purpose`), so they can be dropped into the
//! manifest document with `serde_json::to_value`.

use maud::{Markup, PreEscaped, html};
use serde::{Deserialize, Serialize};

/// One entry of a manifest `icons` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconEntry {
    /// Base URL joined with the output filename.
    pub src: String,
    /// `WxH`.
    pub sizes: String,
    /// MIME type, `image/<format>`.
    #[serde(rename = "type")]
    pub mime_type: String,
    /// Space-separated purposes, omitted when none were configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
}

/// One entry of a manifest `screenshots` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenshotEntry {
    pub src: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sizes: Option<String>,
}

/// One entry of a manifest `shortcuts` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortcutEntry {
    pub name: String,
    pub short_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icons: Option<Vec<IconEntry>>,
}

/// An element to insert into the page `<head>`: a tag name and its
/// attributes in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HtmlInsert {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
}

impl HtmlInsert {
    pub fn new<K, V>(tag: &str, attributes: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            tag: tag.to_string(),
            attributes: attributes
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Value of the first attribute named `name`.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Escape text for use in markup content or a quoted attribute.
pub(crate) fn escape_markup(text: &str) -> String {
    html! { (text) }.into_string()
}

/// Render an insert as a void HTML element, `<tag k="v" ...>`.
///
/// Attribute values are HTML-escaped. Tag and attribute names are emitted
/// as given.
pub fn html_insert_to_string(insert: &HtmlInsert) -> String {
    let mut out = format!("<{}", insert.tag);
    for (key, value) in &insert.attributes {
        let escaped = escape_markup(value);
        out.push_str(&format!(" {key}=\"{escaped}\""));
    }
    out.push('>');
    out
}

/// Render a list of inserts, in order, as one markup fragment.
pub fn html_inserts_to_markup(inserts: &[HtmlInsert]) -> Markup {
    html! {
        @for insert in inserts {
            (PreEscaped(html_insert_to_string(insert)))
        }
    }
}
