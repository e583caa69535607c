use serde_json::Value;
use std::collections::HashMap;

pub type BrandMap = HashMap<i64, String>;

/// Friendly column labels for every exportable product field, in the order
/// the field picker presents them. Unknown keys fall back to the raw key.
pub const FIELD_OPTIONS: &[(&str, &str)] = &[
    ("id", "Product ID"),
    ("name", "Name"),
    ("sku", "SKU"),
    ("price", "Price"),
    ("sale_price", "Sale Price"),
    ("retail_price", "Retail Price"),
    ("map_price", "MAP Price"),
    ("cost_price", "Cost Price"),
    ("msrp", "MSRP"),
    ("tax_class_id", "Tax Class ID"),
    ("inventory_level", "Inventory"),
    ("type", "Type"),
    ("weight", "Weight"),
    ("width", "Width"),
    ("height", "Height"),
    ("depth", "Depth"),
    ("brand_id", "Brand ID"),
    ("brand_name", "Brand Name"),
    ("upc", "UPC"),
    ("mpn", "MPN"),
    ("gtin", "GTIN"),
    ("bin_picking_number", "Bin Picking Number"),
    ("categories", "Categories"),
    ("category_ids", "Category IDs"),
    ("primary_image_url", "Primary Image URL"),
    ("thumbnail_url", "Thumbnail URL"),
    ("image_urls", "Image URLs"),
    ("is_visible", "Is Visible"),
    ("is_featured", "Is Featured"),
    ("is_free_shipping", "Is Free Shipping"),
    ("availability", "Availability"),
    ("availability_description", "Availability Description"),
    ("condition", "Condition"),
    ("description", "Description"),
    ("warranty", "Warranty"),
    ("search_keywords", "Search Keywords"),
    ("custom_fields", "Custom Fields"),
    ("date_created", "Date Created"),
    ("date_modified", "Date Modified"),
    ("date_last_imported", "Date Last Imported"),
    ("total_sold", "Total Sold"),
    ("reviews_rating_sum", "Reviews Rating Sum"),
    ("reviews_count", "Reviews Count"),
    ("variant_skus", "Variant SKUs"),
    ("variant_prices", "Variant Prices"),
    ("variants", "Variants (JSON)"),
    ("custom_url", "Custom URL"),
];

pub fn friendly_label(key: &str) -> &str {
    FIELD_OPTIONS
        .iter()
        .find(|(field, _)| *field == key)
        .map(|(_, label)| *label)
        .unwrap_or(key)
}

/// Resolve one requested field against one product record. Missing or
/// malformed attributes always flatten to an empty string; heterogeneous
/// upstream data is never an error at this layer.
pub fn extract_field(
    product: &Value,
    field: &str,
    brands: &BrandMap,
    custom_domain: &str,
) -> String {
    match field {
        "primary_image_url" => nested_text(product, "primary_image", "url_standard"),
        "thumbnail_url" => nested_text(product, "primary_image", "url_thumbnail"),
        "image_urls" => image_urls(product),
        "brand_name" => brand_name(product, brands),
        "category_ids" => joined_list(product, "categories"),
        "custom_fields" => custom_fields(product),
        "variant_skus" => variant_attr(product, "sku"),
        "variant_prices" => variant_attr(product, "price"),
        "variants" => variants_raw(product),
        "custom_url" => apply_domain(custom_domain, &custom_url(product)),
        _ => product.get(field).map(text_value).unwrap_or_default(),
    }
}

/// Prefix a relative path with the configured storefront domain. Absolute
/// URLs pass through untouched.
pub fn apply_domain(domain: &str, url_value: &str) -> String {
    if domain.is_empty() || url_value.is_empty() {
        return url_value.to_string();
    }
    if url_value.starts_with("http://") || url_value.starts_with("https://") {
        return url_value.to_string();
    }
    let domain_clean = domain.trim_end_matches('/');
    if url_value.starts_with('/') {
        format!("{domain_clean}{url_value}")
    } else {
        format!("{domain_clean}/{url_value}")
    }
}

/// Flatten an arbitrary JSON value to one cell: lists join with `", "`,
/// mappings stringify as JSON, null becomes empty.
pub fn text_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::Array(items) => items
            .iter()
            .map(text_value)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

/// The loose truthiness convention the upstream API relies on:
/// null, false, zero, and empty collections all count as false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(entries) => !entries.is_empty(),
    }
}

fn nested_text(product: &Value, outer: &str, inner: &str) -> String {
    product
        .get(outer)
        .and_then(|nested| nested.get(inner))
        .map(text_value)
        .unwrap_or_default()
}

fn items_of<'a>(product: &'a Value, key: &str) -> &'a [Value] {
    product
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn image_urls(product: &Value) -> String {
    items_of(product, "images")
        .iter()
        .filter(|image| !image.is_null())
        .map(|image| nested_str(image, "url_standard"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn brand_name(product: &Value, brands: &BrandMap) -> String {
    product
        .get("brand_id")
        .and_then(Value::as_i64)
        .and_then(|id| brands.get(&id).cloned())
        .unwrap_or_default()
}

fn joined_list(product: &Value, key: &str) -> String {
    items_of(product, key)
        .iter()
        .map(text_value)
        .collect::<Vec<_>>()
        .join(", ")
}

fn custom_fields(product: &Value) -> String {
    items_of(product, "custom_fields")
        .iter()
        .map(|entry| {
            let name = nested_str(entry, "name");
            let value = nested_str(entry, "value");
            if name.is_empty() {
                value
            } else {
                format!("{name}: {value}")
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn variant_attr(product: &Value, attr: &str) -> String {
    items_of(product, "variants")
        .iter()
        .filter(|variant| is_truthy(variant))
        .map(|variant| variant.get(attr).map(text_value).unwrap_or_default())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Raw passthrough for debugging: the full variants list as JSON.
fn variants_raw(product: &Value) -> String {
    let variants = product
        .get("variants")
        .filter(|value| value.is_array())
        .cloned()
        .unwrap_or_else(|| Value::Array(Vec::new()));
    serde_json::to_string(&variants).unwrap_or_default()
}

fn custom_url(product: &Value) -> String {
    match product.get("custom_url") {
        Some(Value::Object(entries)) => {
            let url = entries.get("url").map(text_value).unwrap_or_default();
            if !url.is_empty() {
                url
            } else {
                entries.get("path").map(text_value).unwrap_or_default()
            }
        }
        Some(other) => text_value(other),
        None => String::new(),
    }
}

fn nested_str(value: &Value, key: &str) -> String {
    value.get(key).map(text_value).unwrap_or_default()
}
