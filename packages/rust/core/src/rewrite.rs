//! Content rewrite engine.
//!
//! Substitutes tracking URLs into source documents without corrupting
//! unrelated content. Replacement proceeds from the end of the document
//! toward the start so earlier substitutions never invalidate the
//! positions of occurrences not yet processed.

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::{debug, instrument};

use linkforge_networks::NetworkRegistry;
use linkforge_scanner::DocumentScan;
use linkforge_shared::{LinkForgeError, LinkOccurrence, Result};

use crate::assign::{LinkMap, compute_base_slug, resolve_slug};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One applied substitution within a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkChange {
    /// URL as it appeared in the source.
    pub original_url: String,
    /// Slug the occurrence resolved to.
    pub slug: String,
    /// Tracking URL substituted into the document.
    pub tracking_url: String,
}

/// Per-document outcome of the rewrite pass. Ephemeral: either discarded
/// (dry run) or used to overwrite the file on disk via
/// [`apply_transforms`].
#[derive(Debug, Clone)]
pub struct TransformResult {
    pub file: PathBuf,
    pub original_content: String,
    pub rewritten_content: String,
    pub change_count: usize,
    pub changes: Vec<LinkChange>,
}

// ---------------------------------------------------------------------------
// Rewrite
// ---------------------------------------------------------------------------

/// Rewrite one document's external links to tracking URLs.
///
/// Occurrences outside the assignment table still resolve: the same
/// base/collision logic runs ad hoc against the table's reserved slugs, so
/// a rewrite over unassigned occurrences degrades gracefully instead of
/// failing. Internal and relative links are never touched.
#[instrument(skip_all, fields(file = %scan.file.display()))]
pub fn transform_document(
    scan: &DocumentScan,
    content: &str,
    links: &LinkMap,
    tracking_base: &str,
    registry: &NetworkRegistry,
) -> TransformResult {
    // End of document first: line descending, then column descending.
    let mut occurrences: Vec<&LinkOccurrence> = scan.occurrences.iter().collect();
    occurrences.sort_by(|a, b| b.line.cmp(&a.line).then(b.column.cmp(&a.column)));

    let mut rewritten = content.to_string();
    let mut changes = Vec::new();

    // Slugs minted outside the assignment table, per URL, reserved against
    // both the table and each other.
    let mut extra_used = links.used_slugs().clone();
    let mut ad_hoc: HashMap<String, String> = HashMap::new();

    for occ in occurrences {
        if !occ.qualifies() {
            continue;
        }

        let slug = match links.get(&occ.url) {
            Some(link) => link.slug.clone(),
            None => match ad_hoc.get(&occ.url) {
                Some(slug) => slug.clone(),
                None => {
                    let base = compute_base_slug(occ, registry);
                    let slug = resolve_slug(&base, &occ.url, &extra_used);
                    extra_used.insert(slug.clone());
                    ad_hoc.insert(occ.url.clone(), slug.clone());
                    slug
                }
            },
        };

        let tracking_url = format!("{tracking_base}{slug}");

        // Only the exact markdown form is substituted. A URL appearing some
        // other way (raw HTML attribute, reference-style link) matches
        // nothing and is skipped without error.
        let needle = format!("]({})", occ.url);
        if !rewritten.contains(&needle) {
            continue;
        }

        let replacement = format!("]({tracking_url})");
        rewritten = rewritten.replace(&needle, &replacement);
        changes.push(LinkChange {
            original_url: occ.url.clone(),
            slug,
            tracking_url,
        });
    }

    debug!(changes = changes.len(), "document transformed");

    TransformResult {
        file: scan.file.clone(),
        original_content: content.to_string(),
        rewritten_content: rewritten,
        change_count: changes.len(),
        changes,
    }
}

/// Rewrite a batch of documents, dropping results with zero changes: a file
/// scanned but unaffected is not "transformed".
pub fn transform_batch(
    documents: &[(DocumentScan, String)],
    links: &LinkMap,
    tracking_base: &str,
    registry: &NetworkRegistry,
) -> Vec<TransformResult> {
    documents
        .iter()
        .map(|(scan, content)| transform_document(scan, content, links, tracking_base, registry))
        .filter(|result| result.change_count > 0)
        .collect()
}

/// Write rewritten content back to disk.
///
/// Separate from computing the transforms so dry runs stay free. A failed
/// write aborts the rest of the batch immediately; files already written
/// stay written.
pub fn apply_transforms(results: &[TransformResult]) -> Result<usize> {
    for result in results {
        std::fs::write(&result.file, &result.rewritten_content)
            .map_err(|e| LinkForgeError::io(&result.file, e))?;
    }
    Ok(results.len())
}
