use crate::export::fields::{is_truthy, text_value};
use serde_json::Value;

/// Availability strings that mark a product as not purchasable.
const UNAVAILABLE_VALUES: &[&str] = &["disabled", "unavailable", "no", "false", "0"];

/// Drop unavailable and hidden products unless the caller opted in to
/// keeping them. Survivor order matches input order, and filtering an
/// already-filtered list is a no-op.
pub fn filter_products(
    products: Vec<Value>,
    include_unavailable: bool,
    include_hidden: bool,
) -> Vec<Value> {
    products
        .into_iter()
        .filter(|product| keep(product, include_unavailable, include_hidden))
        .collect()
}

fn keep(product: &Value, include_unavailable: bool, include_hidden: bool) -> bool {
    // Null or non-object records behave as empty records here.
    let availability = product
        .get("availability")
        .map(text_value)
        .unwrap_or_default()
        .to_lowercase();
    if !include_unavailable && UNAVAILABLE_VALUES.contains(&availability.as_str()) {
        return false;
    }
    let visible = product.get("is_visible").map(is_truthy).unwrap_or(true);
    if !include_hidden && !visible {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_products() -> Vec<Value> {
        vec![
            json!({"id": 1, "name": "hidden", "is_visible": false}),
            json!({"id": 2, "name": "disabled", "availability": "disabled"}),
            json!({"id": 3, "name": "normal", "availability": "available", "is_visible": true}),
        ]
    }

    #[test]
    fn drops_hidden_and_unavailable_by_default() {
        let survivors = filter_products(sample_products(), false, false);
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0]["id"], 3);
    }

    #[test]
    fn include_flags_keep_everything() {
        let survivors = filter_products(sample_products(), true, true);
        assert_eq!(survivors.len(), 3);
    }

    #[test]
    fn availability_matching_is_case_insensitive() {
        let products = vec![json!({"availability": "Disabled"})];
        assert!(filter_products(products, false, true).is_empty());
    }

    #[test]
    fn missing_attributes_default_to_kept() {
        let products = vec![json!({}), Value::Null, json!({"name": "bare"})];
        let survivors = filter_products(products, false, false);
        assert_eq!(survivors.len(), 3);
    }

    #[test]
    fn filtering_is_idempotent_and_order_preserving() {
        let once = filter_products(sample_products(), false, true);
        let twice = filter_products(once.clone(), false, true);
        assert_eq!(once, twice);
        let ids: Vec<i64> = once.iter().filter_map(|p| p["id"].as_i64()).collect();
        assert_eq!(ids, vec![1, 3]);
    }
}
