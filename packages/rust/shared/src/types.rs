//! Core domain types for LinkForge link tracking.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// LinkOccurrence
// ---------------------------------------------------------------------------

/// One observed reference to a URL inside a document.
///
/// Produced by the scanner once per scan pass, then consumed by the slug
/// assignment engine. Never persisted directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOccurrence {
    /// Raw URL string exactly as it appears in the source document.
    pub url: String,
    /// Link display text (may equal the URL for bare links).
    pub display_text: String,
    /// Source document the occurrence was found in.
    pub source_file: PathBuf,
    /// 1-based line number.
    pub line: usize,
    /// 1-based column of the link within its line.
    pub column: usize,
    /// Whether the link leaves the configured site (not same-site, not
    /// relative, not an anchor/mailto/tel).
    pub is_external: bool,
    /// Matching affiliate network, stamped by the classifier.
    pub network_id: Option<String>,
}

impl LinkOccurrence {
    /// Whether this occurrence qualifies for slug assignment: external and
    /// an absolute http(s) URL.
    pub fn qualifies(&self) -> bool {
        self.is_external && is_http_url(&self.url)
    }
}

/// Whether a raw string looks like an absolute http(s) URL.
pub fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

// ---------------------------------------------------------------------------
// AffiliateLink
// ---------------------------------------------------------------------------

/// The canonical, deduplicated representation of one distinct URL.
///
/// Exactly one `AffiliateLink` exists per distinct raw URL within a single
/// assignment run, and its `slug` is unique across the whole table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffiliateLink {
    /// Unique, stable, URL-safe identifier.
    pub slug: String,
    /// First-seen display text, or the URL itself.
    pub display_name: String,
    /// Network-converted form if a network matched and is enabled, else the
    /// original URL unchanged.
    pub canonical_url: String,
    /// A network's detection pattern matched this URL, whether or not that
    /// network is enabled.
    pub is_affiliate: bool,
    /// The matched network was enabled and actually rewrote the URL.
    pub is_converted: bool,
    /// Identifier of the matched network, if any.
    pub network_id: Option<String>,
}

impl AffiliateLink {
    /// Project into the persisted wire format.
    pub fn to_persisted(&self) -> PersistedLink {
        PersistedLink {
            slug: self.slug.clone(),
            name: self.display_name.clone(),
            url: self.canonical_url.clone(),
            is_affiliate: self.is_affiliate,
            network: self.network_id.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// PersistedLink
// ---------------------------------------------------------------------------

/// Wire/file record shape shared by the remote table store, the flat-file
/// store, and the SQL export schema.
///
/// Field names are part of the on-disk/remote contract (`slug` unique key,
/// `name`, `url`, `is_affiliate` boolean, `network` nullable text) and must
/// not be renamed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedLink {
    pub slug: String,
    pub name: String,
    pub url: String,
    pub is_affiliate: bool,
    #[serde(default)]
    pub network: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn occurrence_qualification() {
        let occ = LinkOccurrence {
            url: "https://example.com/page".into(),
            display_text: "Example".into(),
            source_file: "posts/a.md".into(),
            line: 3,
            column: 10,
            is_external: true,
            network_id: None,
        };
        assert!(occ.qualifies());

        let internal = LinkOccurrence {
            is_external: false,
            ..occ.clone()
        };
        assert!(!internal.qualifies());

        let relative = LinkOccurrence {
            url: "/about".into(),
            is_external: true,
            ..occ
        };
        assert!(!relative.qualifies());
    }

    #[test]
    fn persisted_wire_field_names() {
        let link = AffiliateLink {
            slug: "best-blender".into(),
            display_name: "Best Blender".into(),
            canonical_url: "https://www.amazon.com/dp/B000A6PPOK?tag=x-20".into(),
            is_affiliate: true,
            is_converted: true,
            network_id: Some("amazon".into()),
        };

        let json = serde_json::to_value(link.to_persisted()).expect("serialize");
        assert_eq!(json["slug"], "best-blender");
        assert_eq!(json["name"], "Best Blender");
        assert_eq!(json["is_affiliate"], true);
        assert_eq!(json["network"], "amazon");
        // The recognized/converted distinction is in-memory only.
        assert!(json.get("is_converted").is_none());
    }

    #[test]
    fn persisted_roundtrip_without_network() {
        let record = PersistedLink {
            slug: "some-tool".into(),
            name: "Some Tool".into(),
            url: "https://example.org/tool".into(),
            is_affiliate: false,
            network: None,
        };
        let json = serde_json::to_string(&record).expect("serialize");
        let parsed: PersistedLink = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, record);

        // `network` may be absent entirely in older files.
        let parsed: PersistedLink = serde_json::from_str(
            r#"{"slug":"s","name":"n","url":"https://e.com","is_affiliate":false}"#,
        )
        .expect("deserialize legacy record");
        assert!(parsed.network.is_none());
    }
}
