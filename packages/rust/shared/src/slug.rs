//! Slug normalization helpers.
//!
//! Shared by the network plugins (display-text slug hints) and the core
//! assignment engine (URL-derived base slugs, collision suffixes).

use url::Url;
use uuid::Uuid;

/// Maximum length of a normalized slug before suffixes are applied.
pub const MAX_SLUG_LEN: usize = 50;

/// Normalize free text into a URL-safe slug.
///
/// Lowercases, maps any non-alphanumeric run to a single dash, trims leading
/// and trailing dashes, and truncates to [`MAX_SLUG_LEN`] (re-trimming a
/// dash the cut may expose). Returns an empty string when nothing survives.
pub fn slugify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_dash = true; // suppress leading dashes

    for c in text.chars().flat_map(|c| c.to_lowercase()) {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }

    while out.ends_with('-') {
        out.pop();
    }

    if out.len() > MAX_SLUG_LEN {
        out.truncate(MAX_SLUG_LEN);
        while out.ends_with('-') {
            out.pop();
        }
    }

    out
}

/// Derive a slug from a URL's host (minus a leading `www.`) plus its first
/// path segment. Returns `None` when the URL does not parse or has no host.
pub fn url_slug(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host);

    let first_segment = parsed
        .path_segments()
        .and_then(|mut segments| segments.find(|s| !s.is_empty()))
        .map(str::to_string);

    let combined = match first_segment {
        Some(segment) => format!("{host} {segment}"),
        None => host.to_string(),
    };

    let slug = slugify(&combined);
    if slug.is_empty() { None } else { Some(slug) }
}

/// First label of the URL's host, minus a leading `www.` (e.g. `amazon` for
/// `https://www.amazon.com/...`). Used as the first collision suffix.
pub fn host_label(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host);
    let label = host.split('.').next()?;
    let label = slugify(label);
    if label.is_empty() { None } else { Some(label) }
}

/// Last-resort time-based slug token for unparsable URLs.
///
/// Uses the UUID v7 millisecond timestamp prefix, so tokens are
/// time-ordered but not collision-free by construction. The assignment
/// engine's suffix resolution covers the rare same-instant case.
pub fn fallback_token() -> String {
    let id = Uuid::now_v7().simple().to_string();
    format!("link-{}", &id[..12])
}
