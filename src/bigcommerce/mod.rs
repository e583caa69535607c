pub mod catalog;
pub mod config;

pub use catalog::{CatalogClient, CatalogError, FetchOptions};
pub use config::{ConfigError, Credentials, StoreConfig, resolve_override};
