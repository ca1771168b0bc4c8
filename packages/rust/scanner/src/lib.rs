//! Markdown link extraction.
//!
//! Turns raw document text into an ordered list of [`LinkOccurrence`]
//! records with 1-based line/column positions. The primary pass walks
//! markdown `[text](url)` links outside fenced code blocks; documents that
//! defeat it still yield positionally usable occurrences through a
//! permissive bare-URL pass, so scanning never fails on malformed input.

mod corpus;

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};
use url::Url;

use linkforge_networks::NetworkRegistry;
use linkforge_shared::{LinkForgeError, LinkOccurrence, Result, is_http_url};

pub use corpus::collect_files;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Result of scanning one document.
#[derive(Debug, Clone)]
pub struct DocumentScan {
    /// Scanned file path.
    pub file: PathBuf,
    /// SHA-256 hash of the document content (hex).
    pub content_hash: String,
    /// Link occurrences in document order.
    pub occurrences: Vec<LinkOccurrence>,
}

// ---------------------------------------------------------------------------
// Regex patterns (compiled once)
// ---------------------------------------------------------------------------

/// Matches `[text](target)` markdown links.
static MD_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\(([^)\s]+)(?:\s+[^)]*)?\)").expect("valid regex"));

/// Permissive bare-URL pattern for the fallback pass.
static BARE_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s)\]>"']+"#).expect("valid regex"));

// ---------------------------------------------------------------------------
// Scanning
// ---------------------------------------------------------------------------

/// Scan a document file for link occurrences.
#[instrument(skip(registry), fields(path = %path.display()))]
pub fn scan_file(
    path: &Path,
    origin: Option<&Url>,
    registry: &NetworkRegistry,
) -> Result<DocumentScan> {
    let content =
        std::fs::read_to_string(path).map_err(|e| LinkForgeError::io(path, e))?;
    Ok(scan_content(&content, path, origin, registry))
}

/// Scan in-memory document text for link occurrences.
///
/// Infallible by design: a document the markdown pass cannot make sense of
/// degrades to the bare-URL pass rather than erroring, because corpus-wide
/// processing must not abort on one bad file.
pub fn scan_content(
    content: &str,
    file: &Path,
    origin: Option<&Url>,
    registry: &NetworkRegistry,
) -> DocumentScan {
    let content_hash = {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        format!("{:x}", hasher.finalize())
    };

    let mut occurrences = markdown_pass(content, file, origin, registry);

    if occurrences.is_empty() && content.contains("http") {
        debug!(file = %file.display(), "markdown pass found nothing, trying bare-URL pass");
        occurrences = bare_url_pass(content, file, origin, registry);
    }

    DocumentScan {
        file: file.to_path_buf(),
        content_hash,
        occurrences,
    }
}

/// Primary extraction: markdown links outside fenced code blocks.
fn markdown_pass(
    content: &str,
    file: &Path,
    origin: Option<&Url>,
    registry: &NetworkRegistry,
) -> Vec<LinkOccurrence> {
    let mut occurrences = Vec::new();
    let mut in_code_block = false;

    for (line_idx, line) in content.lines().enumerate() {
        if line.trim_start().starts_with("```") {
            in_code_block = !in_code_block;
            continue;
        }
        if in_code_block {
            continue;
        }

        for caps in MD_LINK_RE.captures_iter(line) {
            let full = caps.get(0).expect("match");

            // Image links (`![alt](src)`) are not hyperlinks.
            let start = full.start();
            if start > 0 && line.as_bytes()[start - 1] == b'!' {
                continue;
            }

            let display_text = caps[1].trim().to_string();
            let target = caps[2].trim().to_string();
            occurrences.push(make_occurrence(
                target,
                display_text,
                file,
                line_idx + 1,
                start + 1,
                origin,
                registry,
            ));
        }
    }

    occurrences
}

/// Fallback extraction: any http(s) URL in the text.
fn bare_url_pass(
    content: &str,
    file: &Path,
    origin: Option<&Url>,
    registry: &NetworkRegistry,
) -> Vec<LinkOccurrence> {
    let mut occurrences = Vec::new();

    for (line_idx, line) in content.lines().enumerate() {
        for m in BARE_URL_RE.find_iter(line) {
            let url = m.as_str().trim_end_matches(['.', ',', ';']).to_string();
            occurrences.push(make_occurrence(
                url.clone(),
                url,
                file,
                line_idx + 1,
                m.start() + 1,
                origin,
                registry,
            ));
        }
    }

    occurrences
}

fn make_occurrence(
    url: String,
    display_text: String,
    file: &Path,
    line: usize,
    column: usize,
    origin: Option<&Url>,
    registry: &NetworkRegistry,
) -> LinkOccurrence {
    let display_text = if display_text.is_empty() {
        url.clone()
    } else {
        display_text
    };

    let is_external = is_external(&url, origin);
    let network_id = if is_external {
        registry.classify(&url).map(|n| n.id().to_string())
    } else {
        None
    };

    LinkOccurrence {
        url,
        display_text,
        source_file: file.to_path_buf(),
        line,
        column,
        is_external,
        network_id,
    }
}

/// Whether a link target leaves the configured site.
///
/// Anchors, `mailto:`/`tel:`, relative paths, and same-host URLs are
/// internal. An http(s)-prefixed string that fails to parse is still
/// treated as external so downstream slug assignment can apply its
/// fallback instead of the link being silently dropped.
fn is_external(url: &str, origin: Option<&Url>) -> bool {
    if url.starts_with('#') || url.starts_with("mailto:") || url.starts_with("tel:") {
        return false;
    }
    if !is_http_url(url) {
        return false;
    }

    let Some(origin) = origin else {
        return true;
    };

    match Url::parse(url) {
        Ok(parsed) => parsed.host_str() != origin.host_str(),
        Err(_) => true,
    }
}
