//! Client configuration loaded from environment variables.
//!
//! The auth token is request-scoped state carried here and applied per
//! request by the API layer. It is never attached to a process-global
//! client default.

use std::time::Duration;

/// Default delay between successful status polls.
const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

/// Default delay before retrying after a poll transport error.
const DEFAULT_POLL_ERROR_BACKOFF_MS: u64 = 3000;

/// Default interval between health polls.
const DEFAULT_HEALTH_INTERVAL_MS: u64 = 5000;

/// Default per-request HTTP timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Configuration for the scrapedeck client.
///
/// All fields have defaults suitable for a locally running service.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base HTTP URL of the scraping service (default: `http://localhost:8000`).
    pub api_url: String,
    /// Base WebSocket URL of the push channel (default: `ws://localhost:8000`).
    pub ws_url: String,
    /// Optional bearer token attached to every HTTP request.
    pub auth_token: Option<String>,
    /// Delay between successful status polls (default: 2000 ms).
    pub poll_interval: Duration,
    /// Delay before retrying after a failed status request (default: 3000 ms).
    pub poll_error_backoff: Duration,
    /// Interval between health polls (default: 5000 ms).
    pub health_interval: Duration,
    /// Per-request HTTP timeout (default: 30 s).
    pub request_timeout: Duration,
    /// Number of log events retained for display (default: 100).
    pub log_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".to_string(),
            ws_url: "ws://localhost:8000".to_string(),
            auth_token: None,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            poll_error_backoff: Duration::from_millis(DEFAULT_POLL_ERROR_BACKOFF_MS),
            health_interval: Duration::from_millis(DEFAULT_HEALTH_INTERVAL_MS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            log_capacity: scrapedeck_core::log::DEFAULT_LOG_CAPACITY,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                            | Default                 |
    /// |------------------------------------|-------------------------|
    /// | `SCRAPEDECK_API_URL`               | `http://localhost:8000` |
    /// | `SCRAPEDECK_WS_URL`                | `ws://localhost:8000`   |
    /// | `SCRAPEDECK_AUTH_TOKEN`            | (none)                  |
    /// | `SCRAPEDECK_POLL_INTERVAL_MS`      | `2000`                  |
    /// | `SCRAPEDECK_POLL_ERROR_BACKOFF_MS` | `3000`                  |
    /// | `SCRAPEDECK_HEALTH_INTERVAL_MS`    | `5000`                  |
    /// | `SCRAPEDECK_REQUEST_TIMEOUT_SECS`  | `30`                    |
    /// | `SCRAPEDECK_LOG_CAPACITY`          | `100`                   |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let api_url = std::env::var("SCRAPEDECK_API_URL").unwrap_or(defaults.api_url);
        let ws_url = std::env::var("SCRAPEDECK_WS_URL").unwrap_or(defaults.ws_url);
        let auth_token = std::env::var("SCRAPEDECK_AUTH_TOKEN").ok().filter(|t| !t.is_empty());

        let poll_interval = Duration::from_millis(env_u64(
            "SCRAPEDECK_POLL_INTERVAL_MS",
            DEFAULT_POLL_INTERVAL_MS,
        ));
        let poll_error_backoff = Duration::from_millis(env_u64(
            "SCRAPEDECK_POLL_ERROR_BACKOFF_MS",
            DEFAULT_POLL_ERROR_BACKOFF_MS,
        ));
        let health_interval = Duration::from_millis(env_u64(
            "SCRAPEDECK_HEALTH_INTERVAL_MS",
            DEFAULT_HEALTH_INTERVAL_MS,
        ));
        let request_timeout = Duration::from_secs(env_u64(
            "SCRAPEDECK_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        ));
        let log_capacity = env_u64(
            "SCRAPEDECK_LOG_CAPACITY",
            scrapedeck_core::log::DEFAULT_LOG_CAPACITY as u64,
        ) as usize;

        Self {
            api_url,
            ws_url,
            auth_token,
            poll_interval,
            poll_error_backoff,
            health_interval,
            request_timeout,
            log_capacity,
        }
    }
}

/// Read a numeric env var, falling back to `default` when unset.
fn env_u64(name: &str, default: u64) -> u64 {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("{name} must be a valid integer, got {raw:?}")),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_intervals() {
        let config = ClientConfig::default();
        assert_eq!(config.poll_interval, Duration::from_millis(2000));
        assert_eq!(config.poll_error_backoff, Duration::from_millis(3000));
        assert_eq!(config.health_interval, Duration::from_millis(5000));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.log_capacity, 100);
        assert!(config.auth_token.is_none());
    }

    #[test]
    fn error_backoff_is_longer_than_the_poll_interval() {
        let config = ClientConfig::default();
        assert!(config.poll_error_backoff > config.poll_interval);
    }
}
