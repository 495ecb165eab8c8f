//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `GBG_API_BASE_URL` - Base URL of the REST API (e.g., `https://api.example.com/api/`)
//!
//! ## Optional
//! - `GBG_SESSION_DIR` - Directory for the persisted session (default: `.gb-green-guide`)
//! - `GBG_CATALOG_CACHE_TTL_SECS` - Catalog cache lifetime in seconds (default: 300)
//! - `GBG_DEFAULT_COUNTRY` - Country prefilled at checkout (default: Pakistan)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_SESSION_DIR: &str = ".gb-green-guide";
const DEFAULT_CACHE_TTL_SECS: &str = "300";
const DEFAULT_COUNTRY: &str = "Pakistan";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// REST API base URL
    pub api_base_url: Url,
    /// Directory holding the persisted session record
    pub session_dir: PathBuf,
    /// Lifetime of cached catalog reads
    pub catalog_cache_ttl: Duration,
    /// Country used when the checkout form leaves it blank
    pub default_country: String,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_base_url = Url::parse(&get_required(&lookup, "GBG_API_BASE_URL")?)
            .map_err(|e| ConfigError::InvalidEnvVar("GBG_API_BASE_URL".to_string(), e.to_string()))?;

        if !matches!(api_base_url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEnvVar(
                "GBG_API_BASE_URL".to_string(),
                format!("unsupported scheme '{}'", api_base_url.scheme()),
            ));
        }

        let catalog_cache_ttl = get_or_default(
            &lookup,
            "GBG_CATALOG_CACHE_TTL_SECS",
            DEFAULT_CACHE_TTL_SECS,
        )
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| {
            ConfigError::InvalidEnvVar("GBG_CATALOG_CACHE_TTL_SECS".to_string(), e.to_string())
        })?;

        Ok(Self {
            api_base_url,
            session_dir: PathBuf::from(get_or_default(
                &lookup,
                "GBG_SESSION_DIR",
                DEFAULT_SESSION_DIR,
            )),
            catalog_cache_ttl,
            default_country: get_or_default(&lookup, "GBG_DEFAULT_COUNTRY", DEFAULT_COUNTRY),
            sentry_dsn: get_optional(&lookup, "SENTRY_DSN"),
            sentry_environment: get_optional(&lookup, "SENTRY_ENVIRONMENT"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required variable.
fn get_required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String, ConfigError> {
    get_optional(lookup, key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional variable. Blank values count as unset.
fn get_optional(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Get a variable with a default value.
fn get_or_default(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    get_optional(lookup, key).unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<ClientConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ClientConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("GBG_API_BASE_URL", "https://api.example.com/api/")]).unwrap();
        assert_eq!(config.api_base_url.as_str(), "https://api.example.com/api/");
        assert_eq!(config.session_dir, PathBuf::from(".gb-green-guide"));
        assert_eq!(config.catalog_cache_ttl, Duration::from_secs(300));
        assert_eq!(config.default_country, "Pakistan");
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_missing_base_url() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "GBG_API_BASE_URL"));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            load(&[("GBG_API_BASE_URL", "not a url")]),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
        assert!(matches!(
            load(&[("GBG_API_BASE_URL", "ftp://files.example.com/")]),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
        assert!(matches!(
            load(&[
                ("GBG_API_BASE_URL", "https://api.example.com/"),
                ("GBG_CATALOG_CACHE_TTL_SECS", "soon"),
            ]),
            Err(ConfigError::InvalidEnvVar(ref k, _)) if k == "GBG_CATALOG_CACHE_TTL_SECS"
        ));
    }

    #[test]
    fn test_overrides_and_blank_values() {
        let config = load(&[
            ("GBG_API_BASE_URL", "http://localhost:8000/api/"),
            ("GBG_SESSION_DIR", "/tmp/gbg"),
            ("GBG_CATALOG_CACHE_TTL_SECS", "30"),
            ("GBG_DEFAULT_COUNTRY", "  "),
            ("SENTRY_DSN", "https://key@sentry.example.com/1"),
        ])
        .unwrap();
        assert_eq!(config.session_dir, PathBuf::from("/tmp/gbg"));
        assert_eq!(config.catalog_cache_ttl, Duration::from_secs(30));
        assert_eq!(config.default_country, "Pakistan");
        assert_eq!(
            config.sentry_dsn.as_deref(),
            Some("https://key@sentry.example.com/1")
        );
    }
}
