//! Slug assignment engine.
//!
//! Consumes the full ordered occurrence sequence for a corpus, deduplicates
//! by raw URL, and assigns a globally unique slug per distinct URL with
//! deterministic, order-dependent collision resolution. The whole pass is a
//! single fold over the occurrence list; the `seen`/`used` working set is
//! never shared.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{debug, instrument};

use linkforge_networks::{ConvertOptions, NetworkRegistry};
use linkforge_shared::slug::{fallback_token, host_label, slugify, url_slug};
use linkforge_shared::{AffiliateLink, LinkOccurrence, NetworkSettings};

// ---------------------------------------------------------------------------
// LinkMap
// ---------------------------------------------------------------------------

/// The assignment result: raw URL → [`AffiliateLink`], preserving
/// first-encounter order for iteration, with slug uniqueness across the
/// whole table.
#[derive(Debug, Default)]
pub struct LinkMap {
    entries: Vec<(String, AffiliateLink)>,
    by_url: HashMap<String, usize>,
    used_slugs: HashSet<String>,
}

impl LinkMap {
    /// Look up the assigned link for a raw URL.
    pub fn get(&self, url: &str) -> Option<&AffiliateLink> {
        self.by_url.get(url).map(|&i| &self.entries[i].1)
    }

    /// Whether a raw URL already has an entry.
    pub fn contains_url(&self, url: &str) -> bool {
        self.by_url.contains_key(url)
    }

    /// Iterate `(raw_url, link)` pairs in first-encounter order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AffiliateLink)> {
        self.entries.iter().map(|(url, link)| (url.as_str(), link))
    }

    /// Iterate assigned links in first-encounter order.
    pub fn links(&self) -> impl Iterator<Item = &AffiliateLink> {
        self.entries.iter().map(|(_, link)| link)
    }

    /// The set of slugs reserved by this table.
    pub fn used_slugs(&self) -> &HashSet<String> {
        &self.used_slugs
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, url: String, link: AffiliateLink) {
        self.used_slugs.insert(link.slug.clone());
        self.by_url.insert(url.clone(), self.entries.len());
        self.entries.push((url, link));
    }
}

// ---------------------------------------------------------------------------
// Assignment
// ---------------------------------------------------------------------------

/// Assign slugs for every distinct qualifying URL in the occurrence
/// sequence.
///
/// First occurrence of a URL wins for display text and slug derivation.
/// A network is considered enabled only when its `[networks.<id>]` config
/// section exists with `enabled = true`; detection alone never converts.
/// A single malformed URL degrades to a time-based token rather than
/// aborting the run.
#[instrument(skip_all, fields(occurrences = occurrences.len()))]
pub fn assign_slugs(
    occurrences: &[LinkOccurrence],
    registry: &NetworkRegistry,
    networks: &BTreeMap<String, NetworkSettings>,
) -> LinkMap {
    let mut map = LinkMap::default();

    for occ in occurrences.iter().filter(|o| o.qualifies()) {
        if map.contains_url(&occ.url) {
            continue;
        }

        let base = compute_base_slug(occ, registry);
        let slug = resolve_slug(&base, &occ.url, map.used_slugs());

        let (canonical_url, is_converted) = canonicalize(occ, registry, networks);

        debug!(url = %occ.url, %slug, is_converted, "assigned");
        map.insert(
            occ.url.clone(),
            AffiliateLink {
                slug,
                display_name: occ.display_text.clone(),
                canonical_url,
                is_affiliate: occ.network_id.is_some(),
                is_converted,
                network_id: occ.network_id.clone(),
            },
        );
    }

    map
}

/// Derive the base slug for an occurrence, before collision resolution.
///
/// Preference order: the matched network's slug hint, then normalized
/// display text (when it differs from the URL), then host + first path
/// segment, then a time-based token for URLs nothing can parse.
pub(crate) fn compute_base_slug(occ: &LinkOccurrence, registry: &NetworkRegistry) -> String {
    if let Some(id) = &occ.network_id {
        if let Some(network) = registry.get(id) {
            return network.generate_slug(&occ.url, &occ.display_text);
        }
    }

    if occ.display_text != occ.url {
        let slug = slugify(&occ.display_text);
        if !slug.is_empty() {
            return slug;
        }
    }

    if let Some(slug) = url_slug(&occ.url) {
        return slug;
    }

    fallback_token()
}

/// Resolve a base slug against the set of already-reserved slugs.
///
/// Deterministic and order-dependent: a taken base first tries
/// `<base>-<host-label>` once, then numeric suffixes from 2 upward, each
/// re-checked against the set.
pub(crate) fn resolve_slug(base: &str, url: &str, used: &HashSet<String>) -> String {
    if !used.contains(base) {
        return base.to_string();
    }

    if let Some(label) = host_label(url) {
        let candidate = format!("{base}-{label}");
        if !used.contains(&candidate) {
            return candidate;
        }
    }

    let mut n = 2usize;
    loop {
        let candidate = format!("{base}-{n}");
        if !used.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Convert through the matched network only when that network is enabled in
/// configuration; detection and conversion are independent steps.
fn canonicalize(
    occ: &LinkOccurrence,
    registry: &NetworkRegistry,
    networks: &BTreeMap<String, NetworkSettings>,
) -> (String, bool) {
    let Some(id) = &occ.network_id else {
        return (occ.url.clone(), false);
    };

    let enabled = networks.get(id).is_some_and(|s| s.enabled);
    if !enabled {
        return (occ.url.clone(), false);
    }

    match registry.get(id) {
        Some(network) => {
            let opts = networks
                .get(id)
                .map(ConvertOptions::from)
                .unwrap_or_default();
            (network.convert(&occ.url, &opts), true)
        }
        None => (occ.url.clone(), false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn occ(url: &str, text: &str) -> LinkOccurrence {
        LinkOccurrence {
            url: url.into(),
            display_text: text.into(),
            source_file: PathBuf::from("posts/test.md"),
            line: 1,
            column: 1,
            is_external: true,
            network_id: NetworkRegistry::new()
                .classify(url)
                .map(|n| n.id().to_string()),
        }
    }

    fn amazon_enabled() -> BTreeMap<String, NetworkSettings> {
        let mut networks = BTreeMap::new();
        networks.insert(
            "amazon".to_string(),
            NetworkSettings {
                enabled: true,
                tag: Some("donkitchencom-20".into()),
                clean_params: true,
            },
        );
        networks
    }

    fn assign(occurrences: &[LinkOccurrence]) -> LinkMap {
        assign_slugs(occurrences, &NetworkRegistry::new(), &amazon_enabled())
    }

    #[test]
    fn every_distinct_url_gets_exactly_one_slug() {
        let occurrences = vec![
            occ("https://example.com/a", "First Tool"),
            occ("https://example.com/b", "Second Tool"),
            occ("https://example.com/a", "Repeat Of First"),
        ];
        let map = assign(&occurrences);

        assert_eq!(map.len(), 2);
        // First occurrence wins for display text.
        assert_eq!(
            map.get("https://example.com/a").unwrap().display_name,
            "First Tool"
        );

        let slugs: HashSet<&str> = map.links().map(|l| l.slug.as_str()).collect();
        assert_eq!(slugs.len(), 2);
    }

    #[test]
    fn assignment_is_deterministic() {
        let occurrences = vec![
            occ("https://example.com/a", "Best Blender"),
            occ("https://shop.example.org/b", "Best Blender"),
            occ("https://example.net/c", "Best Blender"),
        ];
        let first = assign(&occurrences);
        let second = assign(&occurrences);

        let a: Vec<String> = first.links().map(|l| l.slug.clone()).collect();
        let b: Vec<String> = second.links().map(|l| l.slug.clone()).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn collision_tries_host_label_then_numbers() {
        let occurrences = vec![
            occ("https://example.com/a", "Best Blender"),
            occ("https://shop.example.org/b", "Best Blender"),
            occ("https://shop.other.org/c", "Best Blender"),
            occ("https://shop.third.org/d", "Best Blender"),
        ];
        let map = assign(&occurrences);

        assert_eq!(map.get("https://example.com/a").unwrap().slug, "best-blender");
        // Second collides: host label suffix.
        assert_eq!(
            map.get("https://shop.example.org/b").unwrap().slug,
            "best-blender-shop"
        );
        // Third collides and its host label is taken too: first numeric try.
        assert_eq!(
            map.get("https://shop.other.org/c").unwrap().slug,
            "best-blender-2"
        );
        // Fourth: numeric counter keeps walking.
        assert_eq!(
            map.get("https://shop.third.org/d").unwrap().slug,
            "best-blender-3"
        );
    }

    #[test]
    fn numeric_suffix_skips_reserved_values() {
        let mut used = HashSet::new();
        used.insert("gadget".to_string());
        used.insert("gadget-shop".to_string());
        used.insert("gadget-2".to_string());
        used.insert("gadget-3".to_string());

        let resolved = resolve_slug("gadget", "https://shop.example.com/x", &used);
        assert_eq!(resolved, "gadget-4");
    }

    #[test]
    fn enabled_network_converts_url() {
        let occurrences = vec![occ(
            "https://www.amazon.com/gp/product/B000A6PPOK/ref=as_li_ss_tl?camp=1789&creative=390957&tag=donkitchencom-20",
            "Best Blender",
        )];
        let map = assign(&occurrences);
        let link = map.links().next().unwrap();

        assert_eq!(link.slug, "best-blender");
        assert_eq!(
            link.canonical_url,
            "https://www.amazon.com/dp/B000A6PPOK?tag=donkitchencom-20"
        );
        assert!(link.is_affiliate);
        assert!(link.is_converted);
        assert_eq!(link.network_id.as_deref(), Some("amazon"));
    }

    #[test]
    fn disabled_network_still_detects_but_never_converts() {
        let url = "https://shareasale.com/r.cfm?b=1&u=2&m=3";
        let occurrences = vec![occ(url, "Partner Offer")];

        // shareasale has no config section at all: not enabled.
        let map = assign(&occurrences);
        let link = map.get(url).unwrap();

        assert!(link.is_affiliate);
        assert!(!link.is_converted);
        assert_eq!(link.canonical_url, url);
        assert_eq!(link.network_id.as_deref(), Some("shareasale"));
    }

    #[test]
    fn bare_link_derives_slug_from_host_and_path() {
        let url = "https://example.org/kitchen-tools/whisk?ref=x";
        let occurrences = vec![occ(url, url)];
        let map = assign(&occurrences);

        assert_eq!(map.get(url).unwrap().slug, "example-org-kitchen-tools");
        assert!(!map.get(url).unwrap().is_affiliate);
    }

    #[test]
    fn unparsable_url_falls_back_to_time_token() {
        let url = "https://exa mple.com/broken";
        let occurrences = vec![occ(url, url)];
        let map = assign(&occurrences);

        let link = map.get(url).unwrap();
        assert!(link.slug.starts_with("link-"));
        assert_eq!(link.canonical_url, url);
    }

    #[test]
    fn non_qualifying_occurrences_are_ignored() {
        let mut internal = occ("https://example.com/a", "A");
        internal.is_external = false;
        let relative = LinkOccurrence {
            url: "/about".into(),
            display_text: "About".into(),
            source_file: PathBuf::from("posts/test.md"),
            line: 1,
            column: 1,
            is_external: false,
            network_id: None,
        };

        let map = assign(&[internal, relative]);
        assert!(map.is_empty());
    }

    #[test]
    fn iteration_preserves_first_encounter_order() {
        let occurrences = vec![
            occ("https://z.example.com/1", "Zed"),
            occ("https://a.example.com/2", "Aye"),
            occ("https://m.example.com/3", "Em"),
        ];
        let map = assign(&occurrences);

        let urls: Vec<&str> = map.iter().map(|(url, _)| url).collect();
        assert_eq!(
            urls,
            vec![
                "https://z.example.com/1",
                "https://a.example.com/2",
                "https://m.example.com/3"
            ]
        );
    }
}
