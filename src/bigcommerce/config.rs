use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use urlencoding::encode;

pub static DEFAULT_STORE_HASH: Lazy<String> =
    Lazy::new(|| env::var("BIGCOMMERCE_STORE_HASH").unwrap_or_default());

pub static DEFAULT_CLIENT_ID: Lazy<String> =
    Lazy::new(|| env::var("BIGCOMMERCE_CLIENT_ID").unwrap_or_default());

pub static DEFAULT_ACCESS_TOKEN: Lazy<String> =
    Lazy::new(|| env::var("BIGCOMMERCE_ACCESS_TOKEN").unwrap_or_default());

pub static API_ROOT: Lazy<String> = Lazy::new(|| {
    env::var("BIGCOMMERCE_API_ROOT").unwrap_or_else(|_| "https://api.bigcommerce.com".to_string())
});

/// One store's API credential triple. All fields optional at this layer;
/// validation happens when the effective [`StoreConfig`] is assembled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub store_hash: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub access_token: String,
}

impl Credentials {
    pub fn is_empty(&self) -> bool {
        self.store_hash.is_empty() && self.client_id.is_empty() && self.access_token.is_empty()
    }
}

#[derive(Debug, Error)]
#[error(
    "missing BigCommerce configuration: {}. Set BIGCOMMERCE_STORE_HASH, BIGCOMMERCE_CLIENT_ID, and BIGCOMMERCE_ACCESS_TOKEN.",
    .missing.join(", ")
)]
pub struct ConfigError {
    pub missing: Vec<&'static str>,
}

/// Effective, validated configuration for one export run.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub store_hash: String,
    pub client_id: String,
    pub access_token: String,
}

impl StoreConfig {
    /// Merge request overrides over environment defaults and validate.
    pub fn resolve(overrides: &Credentials) -> Result<Self, ConfigError> {
        let defaults = Credentials {
            store_hash: DEFAULT_STORE_HASH.clone(),
            client_id: DEFAULT_CLIENT_ID.clone(),
            access_token: DEFAULT_ACCESS_TOKEN.clone(),
        };
        Self::merge(&defaults, overrides)
    }

    /// A present, non-empty override field replaces the default for that
    /// key. Every key must be non-empty in the merged result.
    pub fn merge(defaults: &Credentials, overrides: &Credentials) -> Result<Self, ConfigError> {
        fn pick<'a>(over: &'a str, default: &'a str) -> &'a str {
            if over.is_empty() { default } else { over }
        }

        let store_hash = pick(&overrides.store_hash, &defaults.store_hash);
        let client_id = pick(&overrides.client_id, &defaults.client_id);
        let access_token = pick(&overrides.access_token, &defaults.access_token);

        let mut missing = Vec::new();
        if store_hash.is_empty() {
            missing.push("store_hash");
        }
        if client_id.is_empty() {
            missing.push("client_id");
        }
        if access_token.is_empty() {
            missing.push("access_token");
        }
        if !missing.is_empty() {
            return Err(ConfigError { missing });
        }

        Ok(Self {
            store_hash: store_hash.to_string(),
            client_id: client_id.to_string(),
            access_token: access_token.to_string(),
        })
    }

    pub fn base_url(&self) -> String {
        format!("{}/stores/{}/v3", *API_ROOT, encode(&self.store_hash))
    }
}

/// Pick the credential override for one request: explicit request-supplied
/// credentials win wholesale over session-cached ones. Environment defaults
/// apply later, during [`StoreConfig::merge`].
pub fn resolve_override(explicit: Credentials, session: Option<Credentials>) -> Credentials {
    if !explicit.is_empty() {
        explicit
    } else {
        session.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full(tag: &str) -> Credentials {
        Credentials {
            store_hash: format!("{tag}-hash"),
            client_id: format!("{tag}-client"),
            access_token: format!("{tag}-token"),
        }
    }

    #[test]
    fn merge_prefers_non_empty_overrides() {
        let defaults = full("env");
        let overrides = Credentials {
            store_hash: "req-hash".to_string(),
            ..Credentials::default()
        };
        let config = StoreConfig::merge(&defaults, &overrides).expect("merge");
        assert_eq!(config.store_hash, "req-hash");
        assert_eq!(config.client_id, "env-client");
        assert_eq!(config.access_token, "env-token");
    }

    #[test]
    fn merge_reports_all_missing_keys() {
        let defaults = Credentials {
            client_id: "env-client".to_string(),
            ..Credentials::default()
        };
        let err = StoreConfig::merge(&defaults, &Credentials::default()).expect_err("missing");
        assert_eq!(err.missing, vec!["store_hash", "access_token"]);
        let rendered = err.to_string();
        assert!(rendered.contains("store_hash, access_token"));
        assert!(rendered.contains("BIGCOMMERCE_STORE_HASH"));
    }

    #[test]
    fn override_precedence_explicit_then_session() {
        let explicit = Credentials {
            access_token: "req-token".to_string(),
            ..Credentials::default()
        };
        let session = full("session");

        // Any explicit field wins wholesale over the session cache.
        let picked = resolve_override(explicit.clone(), Some(session.clone()));
        assert_eq!(picked, explicit);

        // No explicit fields: the session cache applies.
        let picked = resolve_override(Credentials::default(), Some(session.clone()));
        assert_eq!(picked, session);

        // Neither: empty override, environment defaults decide at merge.
        let picked = resolve_override(Credentials::default(), None);
        assert!(picked.is_empty());
    }

    #[test]
    fn base_url_encodes_store_hash() {
        let config = StoreConfig::merge(&full("env"), &Credentials::default()).expect("merge");
        assert!(config.base_url().ends_with("/stores/env-hash/v3"));
    }
}
