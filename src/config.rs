//! Configuration loader and validator for the sync daemon.
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::platform::normalize_domain;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    #[serde(default)]
    pub stores: Vec<StoreCredential>,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub api_version: String,
    pub sync_interval_secs: u64,
    /// Shared secret for the webhook signature check; empty disables it.
    #[serde(default)]
    pub webhook_secret: String,
}

/// One configured store. Immutable for the lifetime of an engine
/// instance; reconfiguration requires constructing a new engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreCredential {
    pub name: String,
    pub domain: String,
    pub access_token: String,
}

impl Config {
    /// The first configured store is the primary: it wins quantity
    /// tie-breaks during reconciliation.
    pub fn primary(&self) -> Option<&StoreCredential> {
        self.stores.first()
    }
}

static DOMAIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9-]*(\.[a-z0-9-]+)+$").expect("valid domain regex"));

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.api_version.trim().is_empty() {
        return Err(ConfigError::Invalid("app.api_version must be non-empty"));
    }
    if cfg.app.sync_interval_secs == 0 {
        return Err(ConfigError::Invalid("app.sync_interval_secs must be > 0"));
    }

    let mut seen_names = std::collections::HashSet::new();
    for store in &cfg.stores {
        if store.name.trim().is_empty() {
            return Err(ConfigError::Invalid("stores[].name must be non-empty"));
        }
        if store.access_token.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "stores[].access_token must be non-empty",
            ));
        }
        if store.domain.trim().is_empty() {
            return Err(ConfigError::Invalid("stores[].domain must be non-empty"));
        }
        if !DOMAIN_RE.is_match(&normalize_domain(&store.domain)) {
            return Err(ConfigError::Invalid(
                "stores[].domain is not a valid hostname",
            ));
        }
        if !seen_names.insert(store.name.trim().to_string()) {
            return Err(ConfigError::Invalid("store names must be unique"));
        }
    }

    Ok(())
}

/// Example YAML document, also used by the config tests.
pub fn example() -> &'static str {
    r#"app:
  api_version: "2024-04"
  sync_interval_secs: 30
  webhook_secret: ""

stores:
  - name: "Primary"
    domain: "primary-shop.myshopify.com"
    access_token: "YOUR_PRIMARY_ACCESS_TOKEN"
  - name: "Outlet"
    domain: "outlet-shop.myshopify.com"
    access_token: "YOUR_OUTLET_ACCESS_TOKEN"
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parse_example_ok() {
        let cfg: Config = serde_yaml::from_str(example()).unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.stores.len(), 2);
        assert_eq!(cfg.primary().unwrap().name, "Primary");
    }

    #[test]
    fn zero_stores_is_valid() {
        let cfg: Config = serde_yaml::from_str(
            "app:\n  api_version: \"2024-04\"\n  sync_interval_secs: 30\n",
        )
        .unwrap();
        validate(&cfg).unwrap();
        assert!(cfg.primary().is_none());
    }

    #[test]
    fn invalid_api_version() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.api_version = "".into();
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("api_version")),
            _ => panic!("wrong error"),
        }
    }

    #[test]
    fn invalid_sync_interval() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.sync_interval_secs = 0;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn invalid_store_fields() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.stores[0].access_token = "".into();
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("access_token")),
            _ => panic!("wrong error"),
        }

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.stores[1].domain = "not a domain!".into();
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn duplicate_store_names_rejected() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.stores[1].name = "Primary".into();
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("unique")),
            _ => panic!("wrong error"),
        }
    }

    #[test]
    fn bare_store_handle_passes_via_normalization() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.stores[0].domain = "https://primary-shop".into();
        validate(&cfg).unwrap();
    }

    #[test]
    fn load_from_file_ok() {
        let td = tempdir().unwrap();
        let p = td.path().join("config.yaml");
        fs::write(&p, example()).unwrap();
        let cfg = load(Some(&p)).unwrap();
        assert_eq!(cfg.app.sync_interval_secs, 30);
        assert_eq!(cfg.stores[1].name, "Outlet");
    }
}
