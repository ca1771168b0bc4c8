//! Amazon Associates network plugin.

use url::Url;

use super::{ConvertOptions, Network, fallback_convert};

/// Query parameter carrying the Associates tag.
const TAG_PARAM: &str = "tag";

/// Detects and converts Amazon product URLs (`amazon.<tld>` storefronts and
/// `amzn.to` short links).
pub struct AmazonNetwork;

impl AmazonNetwork {
    /// ASIN from the URL path, for the `/dp/<ASIN>`, `/gp/product/<ASIN>`,
    /// and `/exec/obidos/ASIN/<ASIN>` forms.
    fn asin_from_path(url: &Url) -> Option<String> {
        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();

        for (i, segment) in segments.iter().enumerate() {
            let marker = matches!(*segment, "dp" | "product" | "ASIN");
            if marker {
                if let Some(candidate) = segments.get(i + 1) {
                    if is_asin(candidate) {
                        return Some(candidate.to_ascii_uppercase());
                    }
                }
            }
        }
        None
    }
}

/// ASINs are exactly 10 ASCII alphanumerics.
fn is_asin(s: &str) -> bool {
    s.len() == 10 && s.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Host belongs to an Amazon storefront (`amazon.<tld...>`, optionally with
/// a `www.` or country subdomain) or is the `amzn.to` shortener.
fn is_amazon_host(host: &str) -> bool {
    let host = host.strip_prefix("www.").unwrap_or(host);
    if host == "amzn.to" {
        return true;
    }
    host == "amazon.com" || host.starts_with("amazon.")
}

impl Network for AmazonNetwork {
    fn id(&self) -> &'static str {
        "amazon"
    }

    fn detect(&self, url: &str) -> bool {
        match Url::parse(url) {
            Ok(parsed) => parsed
                .host_str()
                .map(is_amazon_host)
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    fn convert(&self, url: &str, opts: &ConvertOptions) -> String {
        let Ok(parsed) = Url::parse(url) else {
            return fallback_convert(url, opts, TAG_PARAM);
        };

        let Some(asin) = Self::asin_from_path(&parsed) else {
            // Short links and search/browse URLs carry no ASIN; clean what
            // we can and tag the result.
            return fallback_convert(url, opts, TAG_PARAM);
        };

        let host = parsed.host_str().unwrap_or("amazon.com");
        let host = host.strip_prefix("www.").unwrap_or(host);

        match &opts.tag {
            Some(tag) => format!("https://www.{host}/dp/{asin}?tag={tag}"),
            None => format!("https://www.{host}/dp/{asin}"),
        }
    }

    fn extract_product_id(&self, url: &str) -> Option<String> {
        let parsed = Url::parse(url).ok()?;
        Self::asin_from_path(&parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(tag: &str) -> ConvertOptions {
        ConvertOptions {
            tag: Some(tag.into()),
            clean_params: true,
        }
    }

    #[test]
    fn detects_storefronts_and_short_links() {
        let n = AmazonNetwork;
        assert!(n.detect("https://www.amazon.com/dp/B000A6PPOK"));
        assert!(n.detect("https://amazon.co.uk/gp/product/B07FZ8S74R"));
        assert!(n.detect("https://amzn.to/3xYzAbC"));
        assert!(!n.detect("https://example.com/amazon"));
        assert!(!n.detect("https://notamazon.com/dp/B000A6PPOK"));
        assert!(!n.detect("garbage"));
    }

    #[test]
    fn extracts_asin_from_known_path_forms() {
        let n = AmazonNetwork;
        assert_eq!(
            n.extract_product_id("https://www.amazon.com/dp/B000A6PPOK"),
            Some("B000A6PPOK".into())
        );
        assert_eq!(
            n.extract_product_id(
                "https://www.amazon.com/gp/product/b07fz8s74r/ref=ppx_yo_dt"
            ),
            Some("B07FZ8S74R".into())
        );
        assert_eq!(
            n.extract_product_id("https://www.amazon.com/exec/obidos/ASIN/B000A6PPOK/x"),
            Some("B000A6PPOK".into())
        );
        // Short links carry no embedded identifier.
        assert_eq!(n.extract_product_id("https://amzn.to/3xYzAbC"), None);
        // Segment after /dp/ that is not ASIN-shaped.
        assert_eq!(
            n.extract_product_id("https://www.amazon.com/dp/too-long-to-be-an-asin"),
            None
        );
    }

    #[test]
    fn converts_product_url_to_canonical_form() {
        let n = AmazonNetwork;
        let converted = n.convert(
            "https://www.amazon.com/gp/product/B000A6PPOK/ref=as_li_ss_tl?camp=1789&creative=390957&tag=donkitchencom-20",
            &opts("donkitchencom-20"),
        );
        assert_eq!(
            converted,
            "https://www.amazon.com/dp/B000A6PPOK?tag=donkitchencom-20"
        );
    }

    #[test]
    fn convert_preserves_storefront_tld() {
        let n = AmazonNetwork;
        let converted = n.convert(
            "https://amazon.co.uk/dp/B07FZ8S74R?ref=nav",
            &opts("mytag-21"),
        );
        assert_eq!(converted, "https://www.amazon.co.uk/dp/B07FZ8S74R?tag=mytag-21");
    }

    #[test]
    fn convert_without_tag_omits_query() {
        let n = AmazonNetwork;
        let converted = n.convert(
            "https://www.amazon.com/dp/B000A6PPOK?ref=x",
            &ConvertOptions::default(),
        );
        assert_eq!(converted, "https://www.amazon.com/dp/B000A6PPOK");
    }

    #[test]
    fn convert_short_link_cleans_and_tags() {
        let n = AmazonNetwork;
        let converted = n.convert(
            "https://amzn.to/3xYzAbC?utm_source=newsletter",
            &opts("mytag-20"),
        );
        assert_eq!(converted, "https://amzn.to/3xYzAbC?tag=mytag-20");
    }

    #[test]
    fn convert_never_fails_on_garbage() {
        let n = AmazonNetwork;
        let converted = n.convert("amazon.com/dp/B000A6PPOK?tag=old", &opts("new-20"));
        assert_eq!(converted, "amazon.com/dp/B000A6PPOK?tag=new-20");
    }
}
