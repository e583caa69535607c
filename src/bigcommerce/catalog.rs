use crate::bigcommerce::config::StoreConfig;
use crate::metrics;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_MAX_ITEMS: usize = 2000;
pub const DEFAULT_PAGE_SIZE: usize = 250;

/// Brand listings always page at the API maximum.
const BRAND_PAGE_SIZE: usize = 250;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("BigCommerce API error ({status}): {body}")]
    Upstream { status: u16, body: String },
    #[error("invalid response: {0}")]
    Deserialize(String),
}

#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    pub max_items: usize,
    pub page_size: usize,
    pub include_variants: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            max_items: DEFAULT_MAX_ITEMS,
            page_size: DEFAULT_PAGE_SIZE,
            include_variants: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListingPage {
    #[serde(default)]
    data: Vec<Value>,
}

/// Client for the BigCommerce catalog listing endpoints. Products keep
/// whatever shape the API returns (`serde_json::Value`); no local schema
/// is enforced.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: Client,
    config: StoreConfig,
}

impl CatalogClient {
    pub fn new(http: Client, config: StoreConfig) -> Self {
        Self { http, config }
    }

    /// Fetch up to `max_items` products, one page at a time. Any page
    /// failure aborts the whole fetch; no partial results are returned.
    pub async fn fetch_products(&self, options: &FetchOptions) -> Result<Vec<Value>, CatalogError> {
        let endpoint = format!("{}/catalog/products", self.config.base_url());
        let include = include_params(options.include_variants);
        let mut all: Vec<Value> = Vec::new();
        let mut page = 1usize;
        while all.len() < options.max_items {
            let data = self
                .fetch_page(&endpoint, page, options.page_size, Some(&include))
                .await?;
            metrics::page_fetched("catalog/products", data.len());
            debug!(
                target = "bcexport.catalog",
                page,
                records = data.len(),
                "product page fetched"
            );
            if !absorb_page(&mut all, data, options.page_size) {
                break;
            }
            page += 1;
        }
        all.truncate(options.max_items);
        Ok(all)
    }

    /// Fetch every brand into an id → name map; duplicate ids resolve
    /// last-write-wins, entries without an integer id are skipped.
    pub async fn fetch_brand_map(&self) -> Result<HashMap<i64, String>, CatalogError> {
        let endpoint = format!("{}/catalog/brands", self.config.base_url());
        let mut brands: HashMap<i64, String> = HashMap::new();
        let mut page = 1usize;
        loop {
            let data = self
                .fetch_page(&endpoint, page, BRAND_PAGE_SIZE, None)
                .await?;
            metrics::page_fetched("catalog/brands", data.len());
            absorb_brand_page(&mut brands, &data);
            if data.is_empty() || data.len() < BRAND_PAGE_SIZE {
                break;
            }
            page += 1;
        }
        Ok(brands)
    }

    async fn fetch_page(
        &self,
        endpoint: &str,
        page: usize,
        limit: usize,
        include: Option<&str>,
    ) -> Result<Vec<Value>, CatalogError> {
        let mut params = vec![("limit", limit.to_string()), ("page", page.to_string())];
        if let Some(include) = include {
            params.push(("include", include.to_string()));
        }
        let response = self
            .http
            .get(endpoint)
            .header("X-Auth-Client", &self.config.client_id)
            .header("X-Auth-Token", &self.config.access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&params)
            .send()
            .await
            .map_err(|err| CatalogError::Request(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let payload: ListingPage = response
            .json()
            .await
            .map_err(|err| CatalogError::Deserialize(err.to_string()))?;
        Ok(payload.data)
    }
}

/// Categories ride on the base product payload; requesting them as a
/// sub-resource makes some stores answer 422, so they never appear here.
fn include_params(include_variants: bool) -> String {
    let mut parts = vec!["images", "primary_image", "custom_fields"];
    if include_variants {
        parts.extend(["variants", "options", "modifiers"]);
    }
    parts.join(",")
}

/// Append one page and report whether another page should be fetched.
/// A short or empty page signals the end of the listing.
fn absorb_page(all: &mut Vec<Value>, page: Vec<Value>, page_size: usize) -> bool {
    let received = page.len();
    all.extend(page);
    received == page_size
}

fn absorb_brand_page(map: &mut HashMap<i64, String>, page: &[Value]) {
    for brand in page {
        let Some(id) = brand.get("id").and_then(Value::as_i64) else {
            continue;
        };
        let name = brand.get("name").and_then(Value::as_str).unwrap_or_default();
        map.insert(id, name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page_of(count: usize) -> Vec<Value> {
        (0..count).map(|i| json!({"id": i})).collect()
    }

    /// Drives the same accumulation loop as `fetch_products`, feeding
    /// pre-built pages instead of the network.
    fn paginate(pages: Vec<Vec<Value>>, max_items: usize, page_size: usize) -> Vec<Value> {
        let mut all = Vec::new();
        let mut source = pages.into_iter();
        while all.len() < max_items {
            let page = source.next().unwrap_or_default();
            if !absorb_page(&mut all, page, page_size) {
                break;
            }
        }
        all.truncate(max_items);
        all
    }

    #[test]
    fn include_params_never_request_categories() {
        let base = include_params(false);
        assert_eq!(base, "images,primary_image,custom_fields");
        let with_variants = include_params(true);
        assert_eq!(
            with_variants,
            "images,primary_image,custom_fields,variants,options,modifiers"
        );
        assert!(!with_variants.contains("categories"));
    }

    #[test]
    fn short_page_stops_pagination() {
        let result = paginate(vec![page_of(3), page_of(2)], 100, 3);
        assert_eq!(result.len(), 5);
    }

    #[test]
    fn empty_first_page_yields_nothing() {
        let result = paginate(vec![vec![]], 100, 3);
        assert!(result.is_empty());
    }

    #[test]
    fn max_items_truncates_exactly() {
        // Third full page would push past the cap; it is never requested.
        let result = paginate(vec![page_of(3), page_of(3), page_of(3)], 5, 3);
        assert_eq!(result.len(), 5);
    }

    #[test]
    fn max_items_on_page_boundary() {
        let result = paginate(vec![page_of(3), page_of(3)], 6, 3);
        assert_eq!(result.len(), 6);
    }

    #[test]
    fn brand_pages_accumulate_last_write_wins() {
        let mut map = HashMap::new();
        absorb_brand_page(
            &mut map,
            &[json!({"id": 7, "name": "Acme"}), json!({"id": 9})],
        );
        absorb_brand_page(
            &mut map,
            &[
                json!({"id": 7, "name": "Acme Renamed"}),
                json!({"name": "no id, skipped"}),
            ],
        );
        assert_eq!(map.len(), 2);
        assert_eq!(map[&7], "Acme Renamed");
        assert_eq!(map[&9], "");
    }
}
