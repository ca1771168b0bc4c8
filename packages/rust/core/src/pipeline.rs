//! End-to-end pipeline: collect files → scan → assign → rewrite → sync.
//!
//! The whole corpus is scanned and slug assignment completes as one
//! sequential reduction before any per-file rewrite begins, so collision
//! resolution stays deterministic. Storage calls are the only await
//! points.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::{info, instrument};
use url::Url;

use linkforge_networks::NetworkRegistry;
use linkforge_scanner::{DocumentScan, collect_files, scan_content};
use linkforge_shared::{AppConfig, LinkForgeError, NetworkSettings, Result};
use linkforge_storage::LinkStore;

use crate::assign::{LinkMap, assign_slugs};
use crate::rewrite::{TransformResult, transform_batch};
use crate::sync::{SyncReport, sync_links};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Immutable pipeline configuration, resolved from the app config plus CLI
/// overrides.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root directory of the document corpus.
    pub content_dir: PathBuf,
    /// Site origin for external-link detection (`None` treats every
    /// absolute URL as external).
    pub origin: Option<Url>,
    /// Tracking path prefix the slug is appended to.
    pub tracking_base: String,
    /// File include patterns.
    pub include_patterns: Vec<String>,
    /// File exclude patterns.
    pub exclude_patterns: Vec<String>,
    /// Per-network settings.
    pub networks: BTreeMap<String, NetworkSettings>,
}

impl PipelineConfig {
    /// Resolve from the loaded app config, with an optional content-dir
    /// override from the CLI.
    pub fn from_app_config(config: &AppConfig, content_dir: Option<PathBuf>) -> Result<Self> {
        let origin = if config.site.origin.is_empty() {
            None
        } else {
            Some(Url::parse(&config.site.origin).map_err(|e| {
                LinkForgeError::config(format!(
                    "invalid site origin '{}': {e}",
                    config.site.origin
                ))
            })?)
        };

        Ok(Self {
            content_dir: content_dir.unwrap_or_else(|| PathBuf::from(&config.site.content_dir)),
            origin,
            tracking_base: config.site.tracking_base.clone(),
            include_patterns: config.scan.include_patterns.clone(),
            exclude_patterns: config.scan.exclude_patterns.clone(),
            networks: config.networks.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Progress callback for long corpus scans.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each file is scanned.
    fn file_scanned(&self, path: &str, current: usize, total: usize);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn file_scanned(&self, _path: &str, _current: usize, _total: usize) {}
}

// ---------------------------------------------------------------------------
// Corpus scan
// ---------------------------------------------------------------------------

/// A scanned corpus: per-document scans with their content, plus the
/// corpus-wide slug assignment table.
pub struct CorpusScan {
    pub documents: Vec<(DocumentScan, String)>,
    pub links: LinkMap,
}

/// Walk the content directory, scan every selected document, and assign
/// slugs over the combined occurrence list.
#[instrument(skip_all, fields(dir = %config.content_dir.display()))]
pub fn scan_corpus(
    config: &PipelineConfig,
    registry: &NetworkRegistry,
    progress: &dyn ProgressReporter,
) -> Result<CorpusScan> {
    progress.phase("Collecting files");
    let files = collect_files(
        &config.content_dir,
        &config.include_patterns,
        &config.exclude_patterns,
    )?;

    progress.phase("Scanning documents");
    let total = files.len();
    let mut documents = Vec::with_capacity(total);

    for (i, file) in files.iter().enumerate() {
        let content =
            std::fs::read_to_string(file).map_err(|e| LinkForgeError::io(file, e))?;
        let scan = scan_content(&content, file, config.origin.as_ref(), registry);
        progress.file_scanned(&file.display().to_string(), i + 1, total);
        documents.push((scan, content));
    }

    progress.phase("Assigning slugs");
    let occurrences: Vec<_> = documents
        .iter()
        .flat_map(|(scan, _)| scan.occurrences.iter().cloned())
        .collect();
    let links = assign_slugs(&occurrences, registry, &config.networks);

    info!(
        files = documents.len(),
        occurrences = occurrences.len(),
        distinct_links = links.len(),
        "corpus scan complete"
    );

    Ok(CorpusScan { documents, links })
}

/// Rewrite every scanned document against the corpus assignment table.
/// Zero-change documents are excluded; nothing is written to disk.
pub fn rewrite_corpus(
    corpus: &CorpusScan,
    config: &PipelineConfig,
    registry: &NetworkRegistry,
) -> Vec<TransformResult> {
    transform_batch(
        &corpus.documents,
        &corpus.links,
        &config.tracking_base,
        registry,
    )
}

/// Push the corpus assignment table to a store.
pub async fn sync_corpus(corpus: &CorpusScan, store: &dyn LinkStore) -> Result<SyncReport> {
    sync_links(&corpus.links, store).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use crate::rewrite::apply_transforms;

    fn scratch_corpus() -> PathBuf {
        let root = std::env::temp_dir().join(format!(
            "lf_pipeline_{}_{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::create_dir_all(root.join("posts")).unwrap();

        std::fs::write(
            root.join("posts/review.md"),
            "# Review\n\nBuy the [Best Blender](https://www.amazon.com/dp/B000A6PPOK)!\n",
        )
        .unwrap();
        std::fs::write(
            root.join("posts/plain.md"),
            "# Plain\n\nNothing external, just [the archive](/archive).\n",
        )
        .unwrap();
        root
    }

    fn pipeline_config(root: &Path) -> PipelineConfig {
        let mut networks = BTreeMap::new();
        networks.insert(
            "amazon".to_string(),
            NetworkSettings {
                enabled: true,
                tag: Some("donkitchencom-20".into()),
                clean_params: true,
            },
        );

        PipelineConfig {
            content_dir: root.to_path_buf(),
            origin: Some(Url::parse("https://donkitchen.com").unwrap()),
            tracking_base: "/link/".into(),
            include_patterns: vec![],
            exclude_patterns: vec![],
            networks,
        }
    }

    #[test]
    fn scan_rewrite_apply_roundtrip() {
        let root = scratch_corpus();
        let config = pipeline_config(&root);
        let registry = NetworkRegistry::new();

        let corpus = scan_corpus(&config, &registry, &SilentProgress).unwrap();
        assert_eq!(corpus.documents.len(), 2);
        assert_eq!(corpus.links.len(), 1);

        let link = corpus
            .links
            .get("https://www.amazon.com/dp/B000A6PPOK")
            .unwrap();
        assert_eq!(link.slug, "best-blender");
        assert_eq!(
            link.canonical_url,
            "https://www.amazon.com/dp/B000A6PPOK?tag=donkitchencom-20"
        );

        let results = rewrite_corpus(&corpus, &config, &registry);
        // The zero-change document is excluded from the batch.
        assert_eq!(results.len(), 1);

        apply_transforms(&results).unwrap();
        let on_disk = std::fs::read_to_string(root.join("posts/review.md")).unwrap();
        assert!(on_disk.contains("[Best Blender](/link/best-blender)"));
        // The untouched file keeps its internal link.
        let plain = std::fs::read_to_string(root.join("posts/plain.md")).unwrap();
        assert!(plain.contains("[the archive](/archive)"));
    }

    #[test]
    fn missing_content_dir_fails_loudly() {
        let config = pipeline_config(Path::new("/nonexistent/lf_content_dir"));
        let registry = NetworkRegistry::new();
        let result = scan_corpus(&config, &registry, &SilentProgress);
        assert!(result.is_err());
    }

    #[test]
    fn config_resolution_rejects_bad_origin() {
        let mut app = AppConfig::default();
        app.site.origin = "not a url".into();
        let result = PipelineConfig::from_app_config(&app, None);
        assert!(result.is_err());

        app.site.origin = String::new();
        let resolved = PipelineConfig::from_app_config(&app, None).unwrap();
        assert!(resolved.origin.is_none());
        assert_eq!(resolved.tracking_base, "/link/");
    }
}
