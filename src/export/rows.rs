use crate::export::fields::{BrandMap, extract_field, friendly_label};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RowError {
    #[error("csv serialization failed: {0}")]
    Csv(String),
}

/// Serialize the surviving products into CSV text: one header row of
/// friendly labels, then one row per product in the order given. The
/// requested field order drives column order; duplicates stay duplicated.
pub fn build_csv(
    products: &[Value],
    fields: &[String],
    brands: &BrandMap,
    custom_domain: &str,
) -> Result<String, RowError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let header: Vec<&str> = fields.iter().map(|field| friendly_label(field)).collect();
    writer
        .write_record(&header)
        .map_err(|err| RowError::Csv(err.to_string()))?;

    for product in products {
        let row: Vec<String> = fields
            .iter()
            .map(|field| extract_field(product, field, brands, custom_domain))
            .collect();
        writer
            .write_record(&row)
            .map_err(|err| RowError::Csv(err.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| RowError::Csv(err.to_string()))?;
    String::from_utf8(bytes).map_err(|err| RowError::Csv(err.to_string()))
}

/// Re-parse generated CSV into rows for the preview response.
pub fn parse_rows(csv_text: &str) -> Vec<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(csv_text.as_bytes());
    reader
        .records()
        .filter_map(|record| record.ok())
        .map(|record| record.iter().map(str::to_string).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(keys: &[&str]) -> Vec<String> {
        keys.iter().map(|key| key.to_string()).collect()
    }

    #[test]
    fn header_uses_friendly_labels_and_keeps_duplicates() {
        let requested = fields(&["sku", "name", "sku", "unregistered"]);
        let csv_text = build_csv(&[], &requested, &BrandMap::new(), "").expect("csv");
        assert_eq!(csv_text.trim_end(), "SKU,Name,SKU,unregistered");
    }

    #[test]
    fn rows_follow_requested_field_order() {
        let products = vec![json!({"id": 9, "name": "Widget", "sku": "W-9"})];
        let csv_text =
            build_csv(&products, &fields(&["name", "id", "sku"]), &BrandMap::new(), "")
                .expect("csv");
        let mut lines = csv_text.lines();
        assert_eq!(lines.next(), Some("Name,Product ID,SKU"));
        assert_eq!(lines.next(), Some("Widget,9,W-9"));
    }

    #[test]
    fn missing_attributes_become_empty_cells() {
        let products = vec![json!({"name": "Sparse"})];
        let csv_text = build_csv(
            &products,
            &fields(&["name", "sku", "price", "brand_name"]),
            &BrandMap::new(),
            "",
        )
        .expect("csv");
        assert_eq!(csv_text.lines().nth(1), Some("Sparse,,,"));
    }

    #[test]
    fn cells_with_delimiters_are_quoted() {
        let products = vec![json!({"name": "Widget, large", "description": "says \"hi\""})];
        let csv_text = build_csv(
            &products,
            &fields(&["name", "description"]),
            &BrandMap::new(),
            "",
        )
        .expect("csv");
        let row = csv_text.lines().nth(1).expect("row");
        assert_eq!(row, "\"Widget, large\",\"says \"\"hi\"\"\"");
        // And it round-trips through the preview parser.
        let parsed = parse_rows(&csv_text);
        assert_eq!(parsed[1][0], "Widget, large");
        assert_eq!(parsed[1][1], "says \"hi\"");
    }

    #[test]
    fn end_to_end_three_product_scenario() {
        use crate::export::filter::filter_products;

        let raw = vec![
            json!({"id": 1, "name": "hidden", "is_visible": false}),
            json!({"id": 2, "name": "off", "availability": "disabled"}),
            json!({"id": 3, "name": "live", "availability": "available", "brand_id": 7}),
        ];
        let survivors = filter_products(raw, false, false);
        let mut brands = BrandMap::new();
        brands.insert(7, "Acme".to_string());
        let csv_text = build_csv(
            &survivors,
            &fields(&["id", "name", "brand_name"]),
            &brands,
            "",
        )
        .expect("csv");
        let rows = parse_rows(&csv_text);
        assert_eq!(rows.len(), 2); // header + one survivor
        assert_eq!(rows[1], vec!["3", "live", "Acme"]);
    }
}
