//! Backend client configuration.

use std::time::Duration;

use crate::retry::RetryConfig;

/// Default backend base URL.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Configuration for [`crate::BackendClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the capture backend (no trailing slash)
    pub base_url: String,
    /// Timeout for ordinary requests
    pub timeout: Duration,
    /// Timeout for capture requests, which wait on camera hardware
    pub capture_timeout: Duration,
    /// TCP connect timeout
    pub connect_timeout: Duration,
    /// Retry policy for idempotent reads
    pub retry: RetryConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BACKEND_URL.to_string(),
            timeout: Duration::from_secs(30),
            capture_timeout: Duration::from_secs(120),
            connect_timeout: Duration::from_secs(5),
            retry: RetryConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Create config for a specific backend URL with default timeouts.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: trim_base(base_url.into()),
            ..Default::default()
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: trim_base(
                std::env::var("CAMRIG_BACKEND_URL").unwrap_or(defaults.base_url),
            ),
            timeout: env_secs("CAMRIG_TIMEOUT_SECS").unwrap_or(defaults.timeout),
            capture_timeout: env_secs("CAMRIG_CAPTURE_TIMEOUT_SECS")
                .unwrap_or(defaults.capture_timeout),
            connect_timeout: env_secs("CAMRIG_CONNECT_TIMEOUT_SECS")
                .unwrap_or(defaults.connect_timeout),
            retry: RetryConfig::from_env(),
        }
    }

    /// WebSocket URL derived from the HTTP base URL.
    pub fn ws_url(&self) -> Result<url::Url, url::ParseError> {
        let mut url = url::Url::parse(&self.base_url)?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        // http -> ws and https -> wss are always accepted
        let _ = url.set_scheme(scheme);
        url.set_path("/ws");
        url.set_query(None);
        Ok(url)
    }
}

fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

fn env_secs(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.capture_timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_base_url_trimmed() {
        let config = ClientConfig::with_base_url("http://cam-host:8000/");
        assert_eq!(config.base_url, "http://cam-host:8000");
    }

    #[test]
    fn test_ws_url() {
        let config = ClientConfig::with_base_url("http://cam-host:8000");
        assert_eq!(config.ws_url().unwrap().as_str(), "ws://cam-host:8000/ws");

        let config = ClientConfig::with_base_url("https://rig.example.org");
        assert_eq!(config.ws_url().unwrap().as_str(), "wss://rig.example.org/ws");
    }
}
