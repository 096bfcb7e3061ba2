//! Configuration for the Euterpe feed service
//!
//! Settings come from literal defaults, an optional `euterpe.toml`, and a
//! small set of environment overrides, in that order. Validation runs after
//! loading so a bad file or override fails fast.

use crate::error::{EuterpeError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable holding the HTTP bind address
const ENV_ADDR: &str = "EUTERPE_ADDR";
/// Environment variable holding the remote feed store base URL
const ENV_STORE_URL: &str = "EUTERPE_STORE_URL";
/// Environment variable holding the engagement ledger path
const ENV_LEDGER: &str = "EUTERPE_LEDGER";
/// Environment variable holding the oracle API key
const ENV_API_KEY: &str = "ANTHROPIC_API_KEY";

/// Top-level service settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    /// HTTP API settings
    pub api: ApiSettings,

    /// Feed store settings
    pub store: StoreSettings,

    /// Relevance oracle settings
    pub oracle: OracleSettings,

    /// Rebuild pipeline settings
    pub rebuild: RebuildSettings,

    /// Engagement ledger settings
    pub ledger: LedgerSettings,
}

/// HTTP API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Socket address the server binds to
    pub addr: SocketAddr,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 5001)),
        }
    }
}

/// Feed store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Base URL of a remote feed store; unset means the in-process store
    pub base_url: Option<String>,

    /// Request timeout for store calls (in seconds)
    pub timeout_secs: u64,

    /// Retry attempts for feed reads
    pub read_retries: u32,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: 30,
            read_retries: 3,
        }
    }
}

/// Relevance oracle settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleSettings {
    /// Anthropic API key; empty selects the offline popularity fallback
    pub api_key: String,

    /// Model to use for scoring
    pub model: String,

    /// Max tokens for responses (a score reply is one short decimal)
    pub max_tokens: usize,

    /// Temperature for sampling; scoring wants determinism
    pub temperature: f32,

    /// Request timeout for oracle calls (in seconds)
    pub timeout_secs: u64,
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            api_key: env::var(ENV_API_KEY).unwrap_or_default(),
            model: "claude-3-5-haiku-20241022".to_string(),
            max_tokens: 16,
            temperature: 0.0,
            timeout_secs: 30,
        }
    }
}

/// Rebuild pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RebuildSettings {
    /// Strict lower bound a score must exceed to enter the feed
    pub relevance_threshold: f32,

    /// How many global activities one rebuild considers
    pub candidate_page_size: usize,

    /// How many existing personalized entries the remove phase covers
    pub replace_page_size: usize,

    /// Page size for feed read endpoints
    pub view_page_size: usize,

    /// Concurrent oracle calls per rebuild
    pub concurrency: usize,
}

impl Default for RebuildSettings {
    fn default() -> Self {
        Self {
            relevance_threshold: 0.7,
            candidate_page_size: 100,
            replace_page_size: 100,
            view_page_size: 10,
            concurrency: 4,
        }
    }
}

/// Engagement ledger settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LedgerSettings {
    /// Ledger file path; unset falls back to the platform data directory
    pub path: Option<PathBuf>,
}

impl Settings {
    /// Load settings from defaults, an optional TOML file, and environment
    /// overrides
    ///
    /// An explicit `path` must exist; without one, `euterpe.toml` in the
    /// working directory is used when present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(p) => {
                debug!("Loading settings from {}", p.display());
                Self::from_file(p)?
            }
            None => {
                let default_path = Path::new("euterpe.toml");
                if default_path.exists() {
                    debug!("Loading settings from ./euterpe.toml");
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };

        settings.apply_env_overrides()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Load settings from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| {
            EuterpeError::Config(config::ConfigError::Message(format!(
                "Failed to parse settings: {}",
                e
            )))
        })
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(addr) = env::var(ENV_ADDR) {
            self.api.addr = addr.parse().map_err(|_| {
                EuterpeError::Config(config::ConfigError::Message(format!(
                    "{} is not a valid socket address: {}",
                    ENV_ADDR, addr
                )))
            })?;
        }

        if let Ok(url) = env::var(ENV_STORE_URL) {
            if !url.is_empty() {
                self.store.base_url = Some(url);
            }
        }

        if let Ok(path) = env::var(ENV_LEDGER) {
            if !path.is_empty() {
                self.ledger.path = Some(PathBuf::from(path));
            }
        }

        // The file may leave the key empty while the environment has one
        if self.oracle.api_key.is_empty() {
            if let Ok(key) = env::var(ENV_API_KEY) {
                self.oracle.api_key = key;
            }
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let threshold = self.rebuild.relevance_threshold;
        if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
            return Err(EuterpeError::Config(config::ConfigError::Message(
                format!(
                    "rebuild.relevance_threshold must be in [0.0, 1.0], got {}",
                    threshold
                ),
            )));
        }

        if self.rebuild.concurrency == 0 {
            return Err(EuterpeError::Config(config::ConfigError::Message(
                "rebuild.concurrency must be at least 1".to_string(),
            )));
        }

        for (name, size) in [
            ("rebuild.candidate_page_size", self.rebuild.candidate_page_size),
            ("rebuild.replace_page_size", self.rebuild.replace_page_size),
            ("rebuild.view_page_size", self.rebuild.view_page_size),
        ] {
            if size == 0 || size > 1000 {
                return Err(EuterpeError::Config(config::ConfigError::Message(
                    format!("{} must be between 1 and 1000, got {}", name, size),
                )));
            }
        }

        if self.oracle.max_tokens == 0 {
            return Err(EuterpeError::Config(config::ConfigError::Message(
                "oracle.max_tokens must be at least 1".to_string(),
            )));
        }

        Ok(())
    }

    /// Resolve the engagement ledger path
    ///
    /// Order: explicit setting, then the platform data directory
    /// (`<data_local_dir>/euterpe/engagements.json`).
    pub fn ledger_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.ledger.path {
            return Ok(path.clone());
        }

        let data_dir = dirs::data_local_dir().ok_or_else(|| {
            EuterpeError::Config(config::ConfigError::Message(
                "Could not determine the platform data directory; set ledger.path".to_string(),
            ))
        })?;
        Ok(data_dir.join("euterpe").join("engagements.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.rebuild.relevance_threshold, 0.7);
        assert_eq!(settings.rebuild.candidate_page_size, 100);
        assert_eq!(settings.rebuild.view_page_size, 10);
    }

    #[test]
    fn test_from_toml() {
        let toml_str = r#"
            [api]
            addr = "0.0.0.0:8080"

            [store]
            base_url = "http://feeds.internal:9000"
            timeout_secs = 10

            [rebuild]
            relevance_threshold = 0.5
            concurrency = 8
        "#;

        let settings = Settings::from_toml(toml_str).unwrap();
        assert_eq!(settings.api.addr.port(), 8080);
        assert_eq!(
            settings.store.base_url.as_deref(),
            Some("http://feeds.internal:9000")
        );
        assert_eq!(settings.store.timeout_secs, 10);
        assert_eq!(settings.rebuild.relevance_threshold, 0.5);
        assert_eq!(settings.rebuild.concurrency, 8);
        // untouched sections keep their defaults
        assert_eq!(settings.rebuild.view_page_size, 10);
    }

    #[test]
    fn test_validate_threshold_out_of_range() {
        let mut settings = Settings::default();
        settings.rebuild.relevance_threshold = 1.5;

        let result = settings.validate();
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("relevance_threshold"));
    }

    #[test]
    fn test_validate_zero_concurrency() {
        let mut settings = Settings::default();
        settings.rebuild.concurrency = 0;

        let result = settings.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("concurrency"));
    }

    #[test]
    fn test_validate_page_size_bounds() {
        let mut settings = Settings::default();
        settings.rebuild.candidate_page_size = 0;
        assert!(settings.validate().is_err());

        settings.rebuild.candidate_page_size = 5000;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_explicit_ledger_path_wins() {
        let mut settings = Settings::default();
        settings.ledger.path = Some(PathBuf::from("/tmp/euterpe-test/ledger.json"));
        assert_eq!(
            settings.ledger_path().unwrap(),
            PathBuf::from("/tmp/euterpe-test/ledger.json")
        );
    }
}
