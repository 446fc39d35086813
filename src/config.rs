//! Runtime configuration.
//!
//! Sources, later ones winning:
//! - built-in defaults
//! - `config.json` in the user config directory (`<config_dir>/neighbourhood-map/`)
//! - environment variables:
//!   - `NEIGHBOURHOOD_MAP_PLACES_KEY` - Places API key
//!   - `NEIGHBOURHOOD_MAP_PLACES_URL` - Places API base URL
//!   - `NEIGHBOURHOOD_MAP_WIKI_URL` - MediaWiki API endpoint
//!   - `NEIGHBOURHOOD_MAP_RETRY_DELAY_MS` - delay before retrying a rate-limited lookup
//!   - `NEIGHBOURHOOD_MAP_MAX_ATTEMPTS` - rate-limited attempts before giving up (0 = never)
//!   - `NEIGHBOURHOOD_MAP_STAGGER_MS` - start delay per list position

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::enrich::EnrichmentPolicy;
use crate::services::{DEFAULT_ENCYCLOPEDIA_URL, DEFAULT_PLACES_URL};

const APP_NAME: &str = "neighbourhood-map";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub places_api_key: Option<String>,
    pub places_url: String,
    pub encyclopedia_url: String,
    pub retry_delay_ms: u64,
    /// 0 retries rate-limited lookups forever.
    pub max_attempts: u32,
    pub stagger_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            places_api_key: None,
            places_url: DEFAULT_PLACES_URL.to_string(),
            encyclopedia_url: DEFAULT_ENCYCLOPEDIA_URL.to_string(),
            retry_delay_ms: 2000,
            max_attempts: 10,
            stagger_ms: 100,
        }
    }
}

impl Config {
    /// Load the config file (if any) and apply environment overrides.
    /// Falls back to defaults if the file can't be read.
    pub fn load() -> Self {
        let config = match Self::try_load_file() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config, using defaults: {:#}", e);
                Self::default()
            }
        };
        config.with_overrides(|key| std::env::var(key).ok())
    }

    fn try_load_file() -> Result<Self> {
        let Some(path) = config_path() else {
            return Ok(Self::default());
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config = serde_json::from_str(&content).context("Failed to parse config file")?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply `NEIGHBOURHOOD_MAP_*` overrides fetched through `var`.
    /// Unparseable numbers are ignored.
    pub fn with_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(key) = var("NEIGHBOURHOOD_MAP_PLACES_KEY") {
            self.places_api_key = Some(key);
        }
        if let Some(url) = var("NEIGHBOURHOOD_MAP_PLACES_URL") {
            self.places_url = url;
        }
        if let Some(url) = var("NEIGHBOURHOOD_MAP_WIKI_URL") {
            self.encyclopedia_url = url;
        }
        if let Some(ms) = var("NEIGHBOURHOOD_MAP_RETRY_DELAY_MS").and_then(|s| s.parse().ok()) {
            self.retry_delay_ms = ms;
        }
        if let Some(n) = var("NEIGHBOURHOOD_MAP_MAX_ATTEMPTS").and_then(|s| s.parse().ok()) {
            self.max_attempts = n;
        }
        if let Some(ms) = var("NEIGHBOURHOOD_MAP_STAGGER_MS").and_then(|s| s.parse().ok()) {
            self.stagger_ms = ms;
        }
        self
    }

    pub fn policy(&self) -> EnrichmentPolicy {
        EnrichmentPolicy {
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            max_attempts: (self.max_attempts > 0).then_some(self.max_attempts),
            stagger: Duration::from_millis(self.stagger_ms),
        }
    }
}

fn config_path() -> Option<PathBuf> {
    let mut path = dirs::config_dir()?;
    path.push(APP_NAME);
    path.push(CONFIG_FILE);
    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_produce_default_policy() {
        assert_eq!(Config::default().policy(), EnrichmentPolicy::default());
    }

    #[test]
    fn env_overrides_file_values() {
        let config = Config::default().with_overrides(env(&[
            ("NEIGHBOURHOOD_MAP_PLACES_KEY", "secret"),
            ("NEIGHBOURHOOD_MAP_PLACES_URL", "http://localhost:9000"),
            ("NEIGHBOURHOOD_MAP_RETRY_DELAY_MS", "500"),
        ]));

        assert_eq!(config.places_api_key.as_deref(), Some("secret"));
        assert_eq!(config.places_url, "http://localhost:9000");
        assert_eq!(config.retry_delay_ms, 500);
        assert_eq!(config.encyclopedia_url, DEFAULT_ENCYCLOPEDIA_URL);
    }

    #[test]
    fn bad_numbers_are_ignored() {
        let config =
            Config::default().with_overrides(env(&[("NEIGHBOURHOOD_MAP_STAGGER_MS", "soon")]));
        assert_eq!(config.stagger_ms, 100);
    }

    #[test]
    fn zero_max_attempts_means_unbounded() {
        let config =
            Config::default().with_overrides(env(&[("NEIGHBOURHOOD_MAP_MAX_ATTEMPTS", "0")]));
        assert_eq!(config.policy().max_attempts, None);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config: Config = serde_json::from_str(r#"{"stagger_ms": 250}"#).unwrap();
        assert_eq!(config.stagger_ms, 250);
        assert_eq!(config.retry_delay_ms, 2000);
    }
}
