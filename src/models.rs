use crate::bigcommerce::Credentials;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Field picker entry for `GET /fields`.
#[derive(Debug, Serialize)]
pub struct FieldOption {
    pub key: &'static str,
    pub label: &'static str,
}

/// Export form submitted from the field picker. Checkbox values arrive as
/// `"on"`; the download link re-encodes them as `"1"`.
#[derive(Debug, Default, Deserialize)]
pub struct ExportForm {
    #[serde(default)]
    pub ordered_fields: String,
    #[serde(default)]
    pub include_variants: Option<String>,
    #[serde(default)]
    pub include_unavailable: Option<String>,
    #[serde(default)]
    pub include_hidden: Option<String>,
    #[serde(default)]
    pub custom_domain: Option<String>,
    #[serde(default)]
    pub store_hash: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DownloadQuery {
    #[serde(default)]
    pub fields: String,
    #[serde(default)]
    pub include_variants: Option<String>,
    #[serde(default)]
    pub include_unavailable: Option<String>,
    #[serde(default)]
    pub include_hidden: Option<String>,
    #[serde(default)]
    pub custom_domain: Option<String>,
    #[serde(default)]
    pub store_hash: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
}

impl ExportForm {
    pub fn field_list(&self) -> Vec<String> {
        split_fields(&self.ordered_fields)
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            store_hash: trimmed(&self.store_hash),
            client_id: trimmed(&self.client_id),
            access_token: trimmed(&self.access_token),
        }
    }
}

impl DownloadQuery {
    pub fn field_list(&self) -> Vec<String> {
        split_fields(&self.fields)
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            store_hash: trimmed(&self.store_hash),
            client_id: trimmed(&self.client_id),
            access_token: trimmed(&self.access_token),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExportPreviewResponse {
    pub fields: String,
    pub product_count: usize,
    pub row_count: usize,
    pub generated_at: DateTime<Utc>,
    pub preview_rows: Vec<Vec<String>>,
    pub csv: String,
}

#[derive(Debug, Deserialize)]
pub struct SaveCredsRequest {
    #[serde(default)]
    pub id_token: String,
    #[serde(default)]
    pub store_hash: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub access_token: String,
}

#[derive(Debug, Deserialize)]
pub struct LoadCredsRequest {
    #[serde(default)]
    pub id_token: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoadCredsResponse {
    Found {
        store_hash: String,
        client_id: String,
        access_token: String,
    },
    NotFound,
}

/// Loose checkbox parsing shared by the form and the download link.
pub fn checkbox(value: &Option<String>) -> bool {
    matches!(
        value.as_deref().map(str::trim),
        Some("on") | Some("1") | Some("true")
    )
}

pub fn split_fields(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter(|field| !field.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn trimmed(value: &Option<String>) -> String {
    value.as_deref().unwrap_or_default().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkbox_accepts_form_and_query_encodings() {
        assert!(checkbox(&Some("on".to_string())));
        assert!(checkbox(&Some("1".to_string())));
        assert!(checkbox(&Some(" true ".to_string())));
        assert!(!checkbox(&Some("0".to_string())));
        assert!(!checkbox(&Some("".to_string())));
        assert!(!checkbox(&None));
    }

    #[test]
    fn split_fields_drops_empty_segments() {
        assert_eq!(split_fields("sku,,name,"), vec!["sku", "name"]);
        assert!(split_fields("").is_empty());
    }

    #[test]
    fn form_credentials_are_trimmed() {
        let form = ExportForm {
            store_hash: Some("  abc123  ".to_string()),
            client_id: Some(String::new()),
            ..ExportForm::default()
        };
        let credentials = form.credentials();
        assert_eq!(credentials.store_hash, "abc123");
        assert!(credentials.client_id.is_empty());
        assert!(credentials.access_token.is_empty());
    }
}
