pub mod fields;
pub mod filter;
pub mod rows;

pub use fields::{BrandMap, FIELD_OPTIONS, friendly_label};
pub use filter::filter_products;
pub use rows::{build_csv, parse_rows};

use crate::bigcommerce::catalog::{DEFAULT_MAX_ITEMS, DEFAULT_PAGE_SIZE};
use crate::bigcommerce::{CatalogClient, CatalogError, FetchOptions, StoreConfig};
use crate::http::build_client;
use crate::metrics;
use rows::RowError;
use std::time::Instant;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Rows(#[from] RowError),
}

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub fields: Vec<String>,
    pub include_variants: bool,
    pub include_unavailable: bool,
    pub include_hidden: bool,
    pub custom_domain: String,
    pub max_items: usize,
    pub page_size: usize,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            fields: Vec::new(),
            include_variants: false,
            include_unavailable: false,
            include_hidden: false,
            custom_domain: String::new(),
            max_items: DEFAULT_MAX_ITEMS,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CsvExport {
    pub csv: String,
    /// Products fetched before filtering.
    pub product_count: usize,
    /// Rows in the document, header excluded.
    pub row_count: usize,
}

/// Runs one export end to end: fetch → filter → brand lookup → CSV.
/// One sequential chain of blocking calls per request; any upstream
/// failure aborts the run with no partial document.
#[derive(Clone)]
pub struct Exporter {
    http: reqwest::Client,
}

impl Exporter {
    pub fn new() -> Self {
        Self {
            http: build_client(),
        }
    }

    pub async fn run(
        &self,
        config: &StoreConfig,
        options: &ExportOptions,
    ) -> Result<CsvExport, ExportError> {
        let started = Instant::now();
        let catalog = CatalogClient::new(self.http.clone(), config.clone());
        let fetch = FetchOptions {
            max_items: options.max_items,
            page_size: options.page_size,
            include_variants: options.include_variants,
        };

        let products = catalog.fetch_products(&fetch).await?;
        let product_count = products.len();
        let products = filter_products(
            products,
            options.include_unavailable,
            options.include_hidden,
        );
        let brands = catalog.fetch_brand_map().await?;
        let csv = build_csv(&products, &options.fields, &brands, &options.custom_domain)?;

        let row_count = products.len();
        metrics::export_finished(row_count, started.elapsed().as_millis());
        info!(
            target = "bcexport.api",
            fetched = product_count,
            rows = row_count,
            fields = options.fields.len(),
            "export built"
        );
        Ok(CsvExport {
            csv,
            product_count,
            row_count,
        })
    }
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new()
    }
}
