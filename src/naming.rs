//! Output filename fingerprinting.
//!
//! Every generated artifact has a *logical* filename (`icon-192x192.png`,
//! `favicon-32x32.png`, ...) and an *output* filename under which it is
//! stored and referenced. The output name carries an optional 8-character
//! fingerprint between the stem and the extension:
//!
//! ```text
//! icon-192x192.png  →  icon-192x192.3f9a01bc.png
//! ```
//!
//! ## Hash Methods
//!
//! | Method | Suffix derived from | Use |
//! |---|---|---|
//! | [`HashMethod::Content`] | the artifact bytes | production builds, long-lived caching |
//! | [`HashMethod::Name`] | `_pwa-manifest-` + logical name | development, stable across edits |
//! | [`HashMethod::None`] | nothing | hosts that fingerprint on their own |
//!
//! The digest is pluggable through [`HashFunction`]. The default is SHA-256,
//! hex encoded; only the last 8 characters of whatever the function returns
//! are used. Fingerprints deduplicate identical rebuilds and bust caches;
//! they carry no security meaning.

use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Number of digest characters kept in a fingerprint.
pub const FINGERPRINT_LEN: usize = 8;

/// Namespace prepended to the logical filename for [`HashMethod::Name`].
const NAME_NAMESPACE: &str = "_pwa-manifest-";

/// Digest used to derive fingerprints. Receives raw bytes, returns any
/// string at least [`FINGERPRINT_LEN`] characters long.
pub type HashFunction = Arc<dyn Fn(&[u8]) -> String + Send + Sync>;

/// How the fingerprint of an output filename is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashMethod {
    /// Hash of the namespaced logical filename.
    #[default]
    Name,
    /// Hash of the artifact content.
    Content,
    /// No fingerprint.
    None,
}

impl FromStr for HashMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(Self::Name),
            "content" => Ok(Self::Content),
            "none" => Ok(Self::None),
            other => Err(format!(
                "unknown hash method '{other}' (expected name, content, or none)"
            )),
        }
    }
}

impl fmt::Display for HashMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Name => "name",
            Self::Content => "content",
            Self::None => "none",
        })
    }
}

/// SHA-256 of the input, lower-case hex.
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// The default [`HashFunction`].
pub fn default_hash_function() -> HashFunction {
    Arc::new(sha256_hex)
}

/// A logical filename split at its last dot.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitName<'a> {
    pub base: &'a str,
    /// Extension without the dot. `None` when the name has no dot.
    pub ext: Option<&'a str>,
}

/// Split a filename at its last `.`.
///
/// - `"icon-96x96.png"` → base=`"icon-96x96"`, ext=`Some("png")`
/// - `"archive.tar.gz"` → base=`"archive.tar"`, ext=`Some("gz")`
/// - `"LICENSE"` → base=`"LICENSE"`, ext=`None`
pub fn split_filename(name: &str) -> SplitName<'_> {
    match name.rfind('.') {
        Some(dot) => SplitName {
            base: &name[..dot],
            ext: Some(&name[dot + 1..]),
        },
        None => SplitName {
            base: name,
            ext: None,
        },
    }
}

/// Last [`FINGERPRINT_LEN`] characters of a digest string.
fn tail(digest: &str) -> &str {
    let start = digest
        .char_indices()
        .rev()
        .nth(FINGERPRINT_LEN - 1)
        .map(|(i, _)| i)
        .unwrap_or(0);
    &digest[start..]
}

/// Derive the output filename for an artifact.
///
/// Reassembles `base.[fingerprint.]ext`. Names without an extension become
/// `base[.fingerprint]`.
pub fn fingerprint(
    logical: &str,
    content: &[u8],
    method: HashMethod,
    hash: &HashFunction,
) -> String {
    let suffix = match method {
        HashMethod::Content => Some(hash(content)),
        HashMethod::Name => Some(hash(format!("{NAME_NAMESPACE}{logical}").as_bytes())),
        HashMethod::None => None,
    };
    let SplitName { base, ext } = split_filename(logical);
    let mut out = String::with_capacity(logical.len() + FINGERPRINT_LEN + 1);
    out.push_str(base);
    if let Some(digest) = &suffix {
        out.push('.');
        out.push_str(tail(digest));
    }
    if let Some(ext) = ext {
        out.push('.');
        out.push_str(ext);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sha() -> HashFunction {
        default_hash_function()
    }

    #[test]
    fn split_simple_name() {
        let s = split_filename("icon-96x96.png");
        assert_eq!(s.base, "icon-96x96");
        assert_eq!(s.ext, Some("png"));
    }

    #[test]
    fn split_uses_last_dot() {
        let s = split_filename("archive.tar.gz");
        assert_eq!(s.base, "archive.tar");
        assert_eq!(s.ext, Some("gz"));
    }

    #[test]
    fn split_without_extension() {
        let s = split_filename("LICENSE");
        assert_eq!(s.base, "LICENSE");
        assert_eq!(s.ext, None);
    }

    #[test]
    fn none_method_keeps_logical_name() {
        let out = fingerprint("favicon-32x32.png", b"abc", HashMethod::None, &sha());
        assert_eq!(out, "favicon-32x32.png");
    }

    #[test]
    fn content_method_inserts_eight_chars() {
        let out = fingerprint("icon-192x192.png", b"pixels", HashMethod::Content, &sha());
        let digest = sha256_hex(b"pixels");
        assert_eq!(out, format!("icon-192x192.{}.png", &digest[digest.len() - 8..]));
    }

    #[test]
    fn content_method_depends_only_on_bytes() {
        let a = fingerprint("a.png", b"same", HashMethod::Content, &sha());
        let b = fingerprint("a.png", b"same", HashMethod::Content, &sha());
        let c = fingerprint("a.png", b"diff", HashMethod::Content, &sha());
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn name_method_ignores_content() {
        let a = fingerprint("mstile-70x70.png", b"one", HashMethod::Name, &sha());
        let b = fingerprint("mstile-70x70.png", b"two", HashMethod::Name, &sha());
        assert_eq!(a, b);
        let digest = sha256_hex(b"_pwa-manifest-mstile-70x70.png");
        assert_eq!(a, format!("mstile-70x70.{}.png", &digest[digest.len() - 8..]));
    }

    #[test]
    fn name_method_differs_per_name() {
        let a = fingerprint("favicon-16x16.png", b"", HashMethod::Name, &sha());
        let b = fingerprint("favicon-32x32.png", b"", HashMethod::Name, &sha());
        assert_ne!(a, b);
    }

    #[test]
    fn custom_hash_function_is_used() {
        let custom: HashFunction = Arc::new(|_: &[u8]| "0123456789abcdef".to_string());
        let out = fingerprint("x.webp", b"", HashMethod::Content, &custom);
        assert_eq!(out, "x.89abcdef.webp");
    }

    #[test]
    fn short_digest_is_used_whole() {
        let custom: HashFunction = Arc::new(|_: &[u8]| "abc".to_string());
        let out = fingerprint("x.webp", b"", HashMethod::Content, &custom);
        assert_eq!(out, "x.abc.webp");
    }

    #[test]
    fn extensionless_name_gets_trailing_fingerprint() {
        let custom: HashFunction = Arc::new(|_: &[u8]| "ffffffff".to_string());
        let out = fingerprint("README", b"", HashMethod::Content, &custom);
        assert_eq!(out, "README.ffffffff");
    }

    #[test]
    fn hash_method_parses_and_displays() {
        for m in [HashMethod::Name, HashMethod::Content, HashMethod::None] {
            assert_eq!(m.to_string().parse::<HashMethod>().unwrap(), m);
        }
        assert!("md5".parse::<HashMethod>().is_err());
        assert_eq!(HashMethod::default(), HashMethod::Name);
    }
}
