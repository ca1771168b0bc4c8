//! Remote tabular store backend.
//!
//! Speaks the v2 records API of table-store services: rows live in a named
//! table, authentication is an `xc-token` header, and bulk create/update
//! take JSON arrays. Addressed by a (base URL, API token, table) triple.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use linkforge_shared::{LinkForgeError, PersistedLink, Result};

use crate::LinkStore;

/// Page size for list pagination.
const PAGE_LIMIT: usize = 200;

/// Remote table-store client.
pub struct RemoteStore {
    client: reqwest::Client,
    base_url: String,
    token: String,
    table: String,
}

/// One remote row: the wire record plus the store's own row id, needed for
/// bulk updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RemoteRecord {
    #[serde(rename = "Id", skip_serializing_if = "Option::is_none")]
    id: Option<i64>,
    #[serde(flatten)]
    link: PersistedLink,
}

/// Paginated list response shape.
#[derive(Debug, Deserialize)]
struct ListResponse {
    list: Vec<RemoteRecord>,
    #[serde(rename = "pageInfo", default)]
    page_info: PageInfo,
}

#[derive(Debug, Default, Deserialize)]
struct PageInfo {
    #[serde(rename = "isLastPage", default)]
    is_last_page: bool,
}

impl RemoteStore {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            table: table.into(),
        }
    }

    fn records_url(&self) -> String {
        format!("{}/api/v2/tables/{}/records", self.base_url, self.table)
    }

    /// Fetch all rows including their row ids.
    async fn fetch_rows(&self) -> Result<Vec<RemoteRecord>> {
        let mut rows = Vec::new();
        let mut offset = 0usize;

        loop {
            let response = self
                .client
                .get(self.records_url())
                .header("xc-token", &self.token)
                .query(&[("limit", PAGE_LIMIT.to_string()), ("offset", offset.to_string())])
                .send()
                .await
                .map_err(|e| LinkForgeError::Network(format!("list records: {e}")))?;

            let response = check_status(response, "list records").await?;
            let page: ListResponse = response
                .json()
                .await
                .map_err(|e| LinkForgeError::Storage(format!("bad list response: {e}")))?;

            let fetched = page.list.len();
            rows.extend(page.list);

            if page.page_info.is_last_page || fetched < PAGE_LIMIT {
                break;
            }
            offset += PAGE_LIMIT;
        }

        Ok(rows)
    }
}

/// Split an upsert batch into creates and id-bearing updates, based on the
/// slugs already present remotely. New values win wholesale; no field-level
/// merge.
fn split_batch(
    records: &[PersistedLink],
    existing: &HashMap<String, i64>,
) -> (Vec<PersistedLink>, Vec<RemoteRecord>) {
    let mut creates = Vec::new();
    let mut updates = Vec::new();

    for record in records {
        match existing.get(&record.slug) {
            Some(id) => updates.push(RemoteRecord {
                id: Some(*id),
                link: record.clone(),
            }),
            None => creates.push(record.clone()),
        }
    }

    (creates, updates)
}

async fn check_status(response: reqwest::Response, context: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(LinkForgeError::Storage(format!(
        "{context}: HTTP {status}: {body}"
    )))
}

#[async_trait]
impl LinkStore for RemoteStore {
    async fn list(&self) -> Result<Vec<PersistedLink>> {
        Ok(self
            .fetch_rows()
            .await?
            .into_iter()
            .map(|r| r.link)
            .collect())
    }

    #[instrument(skip_all, fields(count = records.len()))]
    async fn upsert(&self, records: &[PersistedLink]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let existing: HashMap<String, i64> = self
            .fetch_rows()
            .await?
            .into_iter()
            .filter_map(|r| r.id.map(|id| (r.link.slug, id)))
            .collect();

        let (creates, updates) = split_batch(records, &existing);
        debug!(creates = creates.len(), updates = updates.len(), "pushing records");

        if !creates.is_empty() {
            let response = self
                .client
                .post(self.records_url())
                .header("xc-token", &self.token)
                .json(&creates)
                .send()
                .await
                .map_err(|e| LinkForgeError::Network(format!("create records: {e}")))?;
            check_status(response, "create records").await?;
        }

        if !updates.is_empty() {
            let response = self
                .client
                .patch(self.records_url())
                .header("xc-token", &self.token)
                .json(&updates)
                .send()
                .await
                .map_err(|e| LinkForgeError::Network(format!("update records: {e}")))?;
            check_status(response, "update records").await?;
        }

        Ok(())
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<PersistedLink>> {
        let response = self
            .client
            .get(self.records_url())
            .header("xc-token", &self.token)
            .query(&[
                ("where", format!("(slug,eq,{slug})")),
                ("limit", "1".to_string()),
            ])
            .send()
            .await
            .map_err(|e| LinkForgeError::Network(format!("get by slug: {e}")))?;

        let response = check_status(response, "get by slug").await?;
        let page: ListResponse = response
            .json()
            .await
            .map_err(|e| LinkForgeError::Storage(format!("bad record response: {e}")))?;

        Ok(page.list.into_iter().next().map(|r| r.link))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(slug: &str) -> PersistedLink {
        PersistedLink {
            slug: slug.into(),
            name: slug.into(),
            url: format!("https://example.com/{slug}"),
            is_affiliate: false,
            network: None,
        }
    }

    #[test]
    fn records_url_normalizes_trailing_slash() {
        let store = RemoteStore::new("https://tables.example.com/", "t0ken", "affiliate_links");
        assert_eq!(
            store.records_url(),
            "https://tables.example.com/api/v2/tables/affiliate_links/records"
        );
    }

    #[test]
    fn split_batch_partitions_by_existing_slug() {
        let existing: HashMap<String, i64> =
            [("old".to_string(), 7)].into_iter().collect();
        let batch = vec![record("old"), record("new")];

        let (creates, updates) = split_batch(&batch, &existing);
        assert_eq!(creates.len(), 1);
        assert_eq!(creates[0].slug, "new");
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].id, Some(7));
        assert_eq!(updates[0].link.slug, "old");
    }

    #[test]
    fn remote_record_serde_is_flat() {
        let row = RemoteRecord {
            id: Some(3),
            link: record("the-slug"),
        };
        let json = serde_json::to_value(&row).expect("serialize");
        assert_eq!(json["Id"], 3);
        assert_eq!(json["slug"], "the-slug");
        assert!(json.get("link").is_none());

        // List rows parse with or without pageInfo.
        let parsed: ListResponse = serde_json::from_str(
            r#"{"list":[{"Id":1,"slug":"s","name":"n","url":"https://e.com","is_affiliate":true}]}"#,
        )
        .expect("parse");
        assert_eq!(parsed.list.len(), 1);
        assert!(!parsed.page_info.is_last_page);
        assert_eq!(parsed.list[0].id, Some(1));
    }

    #[test]
    fn create_payload_omits_row_id() {
        let row = RemoteRecord {
            id: None,
            link: record("fresh"),
        };
        let json = serde_json::to_value(&row).expect("serialize");
        assert!(json.get("Id").is_none());
    }
}
