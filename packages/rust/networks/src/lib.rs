//! Affiliate network plugins and registry.
//!
//! Each supported affiliate program implements the [`Network`] trait:
//! URL detection, canonical conversion, product-id extraction, and a slug
//! hint. A network's URL grammar dictates all four, which is why they are
//! bundled per plugin instead of spread across the core.

mod amazon;
mod shareasale;

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use linkforge_shared::NetworkSettings;
use linkforge_shared::slug::{fallback_token, slugify};

pub use amazon::AmazonNetwork;
pub use shareasale::ShareASaleNetwork;

/// Query parameters recognized as tracking noise and stripped by the
/// clean-params conversion fallback.
const TRACKING_PARAMS: &[&str] = &[
    "ref",
    "ref_",
    "tag",
    "linkCode",
    "linkId",
    "camp",
    "creative",
    "creativeASIN",
    "ascsubtag",
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
];

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Conversion options for a single network, taken from its
/// `[networks.<id>]` config section.
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    /// Affiliate tag to embed in converted URLs.
    pub tag: Option<String>,
    /// Strip known tracking query parameters in the fallback path.
    pub clean_params: bool,
}

impl From<&NetworkSettings> for ConvertOptions {
    fn from(settings: &NetworkSettings) -> Self {
        Self {
            tag: settings.tag.clone(),
            clean_params: settings.clean_params,
        }
    }
}

/// Trait for affiliate-network URL handling.
///
/// All methods are pure and must never panic; a malformed URL degrades to
/// `false`/`None`/the input unchanged.
pub trait Network: Send + Sync {
    /// Unique network identifier (lowercase, stable).
    fn id(&self) -> &'static str;

    /// Whether the URL belongs to this network.
    fn detect(&self, url: &str) -> bool;

    /// Produce the canonical, tag-bearing form of the URL.
    ///
    /// When no network-specific product identifier is extractable this
    /// falls back to stripping tracking parameters and setting the tag
    /// parameter; when the URL does not parse at all, to literal regex
    /// substitution on the raw string.
    fn convert(&self, url: &str, opts: &ConvertOptions) -> String;

    /// Stable per-product identifier, when derivable. Short/redirect-style
    /// URLs yield `None`.
    fn extract_product_id(&self, url: &str) -> Option<String>;

    /// Default slug for a URL of this network.
    ///
    /// Prefers normalized display text when it differs from the raw URL,
    /// then `<network>-<product-id>`, then a time-based token.
    fn generate_slug(&self, url: &str, display_text: &str) -> String {
        if display_text != url {
            let slug = slugify(display_text);
            if !slug.is_empty() {
                return slug;
            }
        }
        if let Some(id) = self.extract_product_id(url) {
            return slugify(&format!("{} {}", self.id(), id));
        }
        fallback_token()
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Holds registered network plugins, tried in order.
pub struct NetworkRegistry {
    networks: Vec<Box<dyn Network>>,
}

impl NetworkRegistry {
    /// Create a registry with all built-in networks.
    pub fn new() -> Self {
        Self {
            networks: vec![
                Box::new(AmazonNetwork),
                Box::new(ShareASaleNetwork),
            ],
        }
    }

    /// Find the network whose detection pattern matches the URL, if any.
    pub fn classify(&self, url: &str) -> Option<&dyn Network> {
        self.networks
            .iter()
            .find(|n| n.detect(url))
            .map(|n| n.as_ref())
    }

    /// Look up a network by id.
    pub fn get(&self, id: &str) -> Option<&dyn Network> {
        self.networks
            .iter()
            .find(|n| n.id() == id)
            .map(|n| n.as_ref())
    }
}

impl Default for NetworkRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Shared conversion helpers
// ---------------------------------------------------------------------------

/// Strip known tracking parameters from a parsed URL.
pub(crate) fn strip_tracking_params(url: &mut Url) {
    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !TRACKING_PARAMS.contains(&k.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if retained.is_empty() {
        url.set_query(None);
    } else {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        for (k, v) in &retained {
            pairs.append_pair(k, v);
        }
    }
}

/// Set (or overwrite) a single query parameter on a parsed URL.
pub(crate) fn set_query_param(url: &mut Url, key: &str, value: &str) {
    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != key)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut pairs = url.query_pairs_mut();
    pairs.clear();
    for (k, v) in &retained {
        pairs.append_pair(k, v);
    }
    pairs.append_pair(key, value);
}

/// Conversion path used when no product id is extractable: strip tracking
/// parameters (if configured) and set the network's tag parameter. When the
/// URL cannot be parsed at all, substitute the tag parameter literally on
/// the raw string instead.
pub(crate) fn fallback_convert(raw: &str, opts: &ConvertOptions, tag_param: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) => {
            if opts.clean_params {
                strip_tracking_params(&mut url);
            }
            if let Some(tag) = &opts.tag {
                set_query_param(&mut url, tag_param, tag);
            }
            url.to_string()
        }
        Err(_) => substitute_tag_literal(raw, opts.tag.as_deref(), tag_param),
    }
}

/// Literal tag substitution for strings that do not parse as URLs.
fn substitute_tag_literal(raw: &str, tag: Option<&str>, tag_param: &str) -> String {
    let Some(tag) = tag else {
        return raw.to_string();
    };

    static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"([?&](?:tag|afftrack)=)[^&]*").expect("valid regex")
    });

    if TAG_RE.is_match(raw) {
        TAG_RE.replace_all(raw, format!("${{1}}{tag}")).to_string()
    } else if raw.contains('?') {
        format!("{raw}&{tag_param}={tag}")
    } else {
        format!("{raw}?{tag_param}={tag}")
    }
}
