//! Sync reconciliation between a fresh assignment table and the persisted
//! store.
//!
//! Thin by design: partition the table's records by slug presence in the
//! store snapshot, then hand the whole batch to the gateway's bulk upsert.
//! Merge policy is "new value wins", per full record, keyed by slug.

use std::collections::HashSet;

use tracing::{info, instrument};

use linkforge_shared::{PersistedLink, Result};
use linkforge_storage::LinkStore;

use crate::assign::LinkMap;

/// Records partitioned against a store snapshot.
#[derive(Debug, Default)]
pub struct SyncPlan {
    /// Slug absent from the snapshot.
    pub new: Vec<PersistedLink>,
    /// Slug already present; the new record overwrites it wholesale.
    pub updated: Vec<PersistedLink>,
}

impl SyncPlan {
    /// All records in plan order (new first), for the bulk upsert.
    pub fn records(&self) -> Vec<PersistedLink> {
        self.new.iter().chain(&self.updated).cloned().collect()
    }
}

/// Outcome counts of a completed sync.
#[derive(Debug, Clone, Copy)]
pub struct SyncReport {
    pub created: usize,
    pub updated: usize,
}

/// Partition the assignment table against a snapshot of persisted records.
pub fn partition(links: &LinkMap, snapshot: &[PersistedLink]) -> SyncPlan {
    let known: HashSet<&str> = snapshot.iter().map(|r| r.slug.as_str()).collect();

    let mut plan = SyncPlan::default();
    for link in links.links() {
        let record = link.to_persisted();
        if known.contains(record.slug.as_str()) {
            plan.updated.push(record);
        } else {
            plan.new.push(record);
        }
    }
    plan
}

/// Push a fresh assignment table to the store.
///
/// A store failure is fatal for the whole operation; the batch is not
/// partially retried.
#[instrument(skip_all, fields(links = links.len()))]
pub async fn sync_links(links: &LinkMap, store: &dyn LinkStore) -> Result<SyncReport> {
    let snapshot = store.list().await?;
    let plan = partition(links, &snapshot);

    store.upsert(&plan.records()).await?;

    let report = SyncReport {
        created: plan.new.len(),
        updated: plan.updated.len(),
    };
    info!(created = report.created, updated = report.updated, "sync complete");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::Path;

    use linkforge_networks::NetworkRegistry;
    use linkforge_scanner::scan_content;
    use linkforge_storage::FileStore;

    use crate::assign::assign_slugs;

    fn table_for(content: &str) -> LinkMap {
        let registry = NetworkRegistry::new();
        let scan = scan_content(content, Path::new("posts/test.md"), None, &registry);
        assign_slugs(&scan.occurrences, &registry, &BTreeMap::new())
    }

    fn scratch_store() -> FileStore {
        FileStore::new(std::env::temp_dir().join(format!(
            "lf_sync_{}_{}.json",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        )))
    }

    #[test]
    fn partition_splits_by_snapshot_slug() {
        let links = table_for(
            "[Known Tool](https://example.com/known) [Fresh Tool](https://example.com/fresh)",
        );
        let snapshot = vec![PersistedLink {
            slug: "known-tool".into(),
            name: "Known Tool".into(),
            url: "https://example.com/old-url".into(),
            is_affiliate: false,
            network: None,
        }];

        let plan = partition(&links, &snapshot);
        assert_eq!(plan.updated.len(), 1);
        assert_eq!(plan.updated[0].slug, "known-tool");
        assert_eq!(plan.new.len(), 1);
        assert_eq!(plan.new[0].slug, "fresh-tool");
    }

    #[tokio::test]
    async fn sync_upserts_with_new_value_winning() {
        let store = scratch_store();
        store
            .upsert(&[PersistedLink {
                slug: "best-blender".into(),
                name: "Best Blender".into(),
                url: "https://url-a.example.com".into(),
                is_affiliate: false,
                network: None,
            }])
            .await
            .unwrap();

        // Fresh assignment computes a different URL for the same slug.
        let links = table_for("[Best Blender](https://url-b.example.com)");
        let report = sync_links(&links, &store).await.unwrap();

        assert_eq!(report.created, 0);
        assert_eq!(report.updated, 1);

        let stored = store.get_by_slug("best-blender").await.unwrap().unwrap();
        assert_eq!(stored.url, "https://url-b.example.com");
    }

    #[tokio::test]
    async fn sync_of_empty_table_touches_nothing() {
        let store = scratch_store();
        let links = table_for("no links in here");
        let report = sync_links(&links, &store).await.unwrap();

        assert_eq!(report.created, 0);
        assert_eq!(report.updated, 0);
        assert!(store.list().await.unwrap().is_empty());
    }
}
