use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Base URL of the engine
    #[serde(default = "default_url")]
    pub url: String,

    #[serde(default)]
    pub transport: TransportConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    /// Page size used when a search asks for a page without a size
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// One shared HTTP client
    #[default]
    Http,
    /// Fixed set of connection handles checked out per call
    Pooled,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransportConfig {
    #[serde(default)]
    pub kind: TransportKind,

    /// Number of connection handles for the pooled transport
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// How long a caller waits for a free pooled connection
    #[serde(default = "default_checkout_timeout_ms")]
    pub checkout_timeout_ms: u64,

    /// Per-request timeout applied when the request sets none
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub insecure_skip_verify: bool,
}

fn default_url() -> String {
    "http://localhost:9200".to_string()
}

fn default_per_page() -> u64 {
    crate::search::DEFAULT_PER_PAGE
}

fn default_pool_size() -> usize {
    5
}

fn default_checkout_timeout_ms() -> u64 {
    5_000
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl TransportConfig {
    pub fn checkout_timeout(&self) -> Duration {
        Duration::from_millis(self.checkout_timeout_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: TransportKind::default(),
            pool_size: default_pool_size(),
            checkout_timeout_ms: default_checkout_timeout_ms(),
            timeout_ms: default_timeout_ms(),
            insecure_skip_verify: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
    /// Wrap GET requests in the retrying transport
    #[serde(default)]
    pub enabled: bool,

    /// Total attempts, including the first one
    #[serde(default = "default_attempts")]
    pub attempts: usize,

    /// Fixed pause before every attempt after the first
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_attempts() -> usize {
    3
}

fn default_backoff_ms() -> u64 {
    100
}

impl RetryConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            attempts: default_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(crate::Error::Configuration(format!(
                "url must start with http:// or https://, got '{}'",
                self.url
            )));
        }
        if self.transport.kind == TransportKind::Pooled && self.transport.pool_size == 0 {
            return Err(crate::Error::Configuration(
                "pool_size must be at least 1".to_string(),
            ));
        }
        if self.retry.enabled && self.retry.attempts == 0 {
            return Err(crate::Error::Configuration(
                "retry attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: default_url(),
            transport: TransportConfig::default(),
            retry: RetryConfig::default(),
            per_page: default_per_page(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.url, "http://localhost:9200");
        assert_eq!(config.transport.kind, TransportKind::Http);
        assert_eq!(config.transport.pool_size, 5);
        assert_eq!(config.transport.checkout_timeout(), Duration::from_secs(5));
        assert_eq!(config.retry.attempts, 3);
        assert_eq!(config.retry.backoff(), Duration::from_millis(100));
        assert_eq!(config.per_page, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_pooled_section() {
        let config: Config = serde_json::from_str(
            r#"{"url":"http://search:9200/","transport":{"kind":"pooled","pool_size":2},"retry":{"enabled":true}}"#,
        )
        .unwrap();
        assert_eq!(config.transport.kind, TransportKind::Pooled);
        assert_eq!(config.transport.pool_size, 2);
        assert!(config.retry.enabled);
        assert_eq!(config.base_url(), "http://search:9200");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.url = "localhost:9200".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.transport.kind = TransportKind::Pooled;
        config.transport.pool_size = 0;
        assert!(matches!(config.validate(), Err(crate::Error::Configuration(_))));
    }
}
