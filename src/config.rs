//! Environment-driven settings. `.env` is loaded first when present.

use std::path::PathBuf;
use thiserror::Error;

use crate::domain::value_objects::MaxLevels;
use crate::domain::OrphanPolicy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    JsonDir(PathBuf),
    Postgres { url: String },
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub store: StoreBackend,
    pub nats_url: Option<String>,
    pub orphan_policy: OrphanPolicy,
    pub max_levels: MaxLevels,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} is required when {context}")]
    Missing { key: &'static str, context: &'static str },

    #[error("invalid value `{value}` for {key}: {reason}")]
    Invalid { key: &'static str, value: String, reason: String },
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`, so tests need not touch the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match lookup("PORT") {
            Some(v) => v.parse::<u16>().map_err(|e| invalid("PORT", &v, e.to_string()))?,
            None => 8083,
        };

        let store = match lookup("CATALOG_STORE").as_deref().map(str::trim) {
            None | Some("memory") => StoreBackend::Memory,
            Some("json") => StoreBackend::JsonDir(lookup("CATALOG_DATA_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("data"))),
            Some("postgres") => StoreBackend::Postgres {
                url: lookup("DATABASE_URL").ok_or(ConfigError::Missing { key: "DATABASE_URL", context: "CATALOG_STORE=postgres" })?,
            },
            Some(other) => return Err(invalid("CATALOG_STORE", other, "expected memory, json or postgres".into())),
        };

        let orphan_policy = match lookup("CATALOG_ORPHAN_POLICY") {
            Some(v) => v.parse::<OrphanPolicy>().map_err(|reason| invalid("CATALOG_ORPHAN_POLICY", &v, reason))?,
            None => OrphanPolicy::default(),
        };

        let max_levels = match lookup("CATALOG_MAX_LEVELS") {
            Some(v) => v.parse::<u32>().ok().and_then(MaxLevels::new).ok_or_else(|| invalid("CATALOG_MAX_LEVELS", &v, "expected a positive integer".into()))?,
            None => MaxLevels::default(),
        };

        Ok(Self { port, store, nats_url: lookup("NATS_URL").filter(|u| !u.is_empty()), orphan_policy, max_levels })
    }
}

fn invalid(key: &'static str, value: &str, reason: String) -> ConfigError {
    ConfigError::Invalid { key, value: value.to_string(), reason }
}
