//! Session configuration.

use std::time::Duration;

/// Timing and sizing knobs for a capture session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Reconnect delay of the live event channel
    pub ws_backoff: Duration,
    /// Reconnect delay of the status-only WebSocket observer
    pub status_ws_backoff: Duration,
    /// Gallery fallback poll; `None` disables it
    pub gallery_poll: Option<Duration>,
    pub status_poll: Duration,
    pub stats_poll: Duration,
    /// Slows statistics polling on constrained hosts
    pub low_performance: bool,
    /// Number of recent captures kept in the gallery
    pub gallery_limit: usize,
    /// Length of one countdown step
    pub countdown_tick: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ws_backoff: Duration::from_millis(2000),
            status_ws_backoff: Duration::from_millis(5000),
            gallery_poll: Some(Duration::from_secs(5)),
            status_poll: Duration::from_secs(5),
            stats_poll: Duration::from_secs(2),
            low_performance: false,
            gallery_limit: 20,
            countdown_tick: Duration::from_secs(1),
        }
    }
}

impl SessionConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let gallery_poll = match env_parse::<u64>("CAMRIG_GALLERY_POLL_SECS") {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => defaults.gallery_poll,
        };

        Self {
            ws_backoff: env_parse("CAMRIG_WS_BACKOFF_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.ws_backoff),
            status_ws_backoff: env_parse("CAMRIG_STATUS_WS_BACKOFF_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.status_ws_backoff),
            gallery_poll,
            status_poll: env_parse("CAMRIG_STATUS_POLL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.status_poll),
            stats_poll: env_parse("CAMRIG_STATS_POLL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.stats_poll),
            low_performance: std::env::var("CAMRIG_LOW_PERF")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            gallery_limit: env_parse("CAMRIG_GALLERY_LIMIT").unwrap_or(defaults.gallery_limit),
            countdown_tick: defaults.countdown_tick,
        }
    }

    /// Effective statistics poll interval.
    pub fn stats_interval(&self) -> Duration {
        if self.low_performance {
            self.stats_poll.max(Duration::from_secs(5))
        } else {
            self.stats_poll
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.ws_backoff, Duration::from_secs(2));
        assert_eq!(config.status_ws_backoff, Duration::from_secs(5));
        assert_eq!(config.gallery_limit, 20);
        assert_eq!(config.stats_interval(), Duration::from_secs(2));
    }

    #[test]
    fn test_low_performance_slows_stats() {
        let config = SessionConfig {
            low_performance: true,
            ..Default::default()
        };
        assert_eq!(config.stats_interval(), Duration::from_secs(5));
    }
}
