//! CatalogConfig - tunables for the catalog sync layer.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::mutation::CreateReconcile;

const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 500;
const DEFAULT_PAGE_LIMIT: u32 = 100;

#[derive(Debug)]
pub enum ConfigError {
    Parse(serde_json::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Parse(err) => write!(f, "config parse error: {}", err),
            ConfigError::Invalid(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Parse(err) => Some(err),
            ConfigError::Invalid(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err)
    }
}

/// Unset fields take their defaults when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Quiet period before a typed search term is applied.
    pub search_debounce_ms: u64,
    /// Page size requested for every list query.
    pub page_limit: u32,
    /// Age after which a cached list is refetched on read. `None` keeps
    /// entries until invalidated.
    pub stale_time_ms: Option<u64>,
    pub create_reconcile: CreateReconcile,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        CatalogConfig {
            search_debounce_ms: DEFAULT_SEARCH_DEBOUNCE_MS,
            page_limit: DEFAULT_PAGE_LIMIT,
            stale_time_ms: None,
            create_reconcile: CreateReconcile::default(),
        }
    }
}

impl CatalogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: CatalogConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_limit == 0 {
            return Err(ConfigError::Invalid("page_limit must be at least 1".into()));
        }
        Ok(())
    }

    pub fn with_search_debounce(mut self, delay: Duration) -> Self {
        self.search_debounce_ms = delay.as_millis() as u64;
        self
    }

    pub fn with_page_limit(mut self, limit: u32) -> Self {
        self.page_limit = limit;
        self
    }

    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time_ms = Some(stale_time.as_millis() as u64);
        self
    }

    pub fn with_create_reconcile(mut self, policy: CreateReconcile) -> Self {
        self.create_reconcile = policy;
        self
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn stale_time(&self) -> Option<Duration> {
        self.stale_time_ms.map(Duration::from_millis)
    }
}
