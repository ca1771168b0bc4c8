//! ShareASale network plugin.

use url::Url;

use super::{ConvertOptions, Network, fallback_convert, set_query_param, strip_tracking_params};

/// Query parameter carrying the affiliate click tag.
const TAG_PARAM: &str = "afftrack";

/// Detects and converts ShareASale redirect URLs
/// (`shareasale.com/r.cfm` and `shareasale.com/m-pr.cfm`).
pub struct ShareASaleNetwork;

impl Network for ShareASaleNetwork {
    fn id(&self) -> &'static str {
        "shareasale"
    }

    fn detect(&self, url: &str) -> bool {
        match Url::parse(url) {
            Ok(parsed) => {
                let host = parsed.host_str().unwrap_or("");
                let host = host.strip_prefix("www.").unwrap_or(host);
                host == "shareasale.com"
                    && matches!(parsed.path(), "/r.cfm" | "/m-pr.cfm")
            }
            Err(_) => false,
        }
    }

    fn convert(&self, url: &str, opts: &ConvertOptions) -> String {
        // ShareASale URLs *are* the redirect; conversion only adjusts query
        // parameters, never the path.
        let Ok(mut parsed) = Url::parse(url) else {
            return fallback_convert(url, opts, TAG_PARAM);
        };

        if opts.clean_params {
            strip_tracking_params(&mut parsed);
        }
        if let Some(tag) = &opts.tag {
            set_query_param(&mut parsed, TAG_PARAM, tag);
        }
        parsed.to_string()
    }

    fn extract_product_id(&self, url: &str) -> Option<String> {
        let parsed = Url::parse(url).ok()?;
        parsed
            .query_pairs()
            .find(|(k, _)| k == "m")
            .map(|(_, v)| format!("m{v}"))
    }
}
