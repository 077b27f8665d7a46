//! Exponential-backoff reconnection for the push channel.
//!
//! When the connection drops, the live feed calls [`reconnect_loop`] to
//! keep retrying with increasing delays until the connection is
//! restored, the [`CancellationToken`] fires, or the configured attempt
//! limit is reached.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::client::{FeedClient, FeedConnection};

/// Tunable parameters for the exponential-backoff strategy.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
    /// Give up after this many failed attempts; `None` retries forever,
    /// leaving cancellation as the only way out.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            max_attempts: None,
        }
    }
}

/// Why [`reconnect_loop`] stopped without producing a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectAbort {
    /// The cancellation token fired.
    Cancelled,
    /// The configured attempt limit was reached.
    AttemptsExhausted,
}

/// Calculate the next backoff delay from the current delay and config.
///
/// The result is clamped to [`ReconnectConfig::max_delay`].
pub fn next_delay(current: Duration, config: &ReconnectConfig) -> Duration {
    let next_ms = (current.as_millis() as f64 * config.multiplier) as u64;
    Duration::from_millis(next_ms).min(config.max_delay)
}

/// Attempt to reconnect to the push channel with exponential backoff.
///
/// Returns the new connection once an attempt succeeds, or a
/// [`ReconnectAbort`] describing why the loop gave up.
pub async fn reconnect_loop(
    client: &FeedClient,
    config: &ReconnectConfig,
    cancel: &CancellationToken,
) -> Result<FeedConnection, ReconnectAbort> {
    let mut delay = config.initial_delay;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        tracing::info!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            "Reconnecting to push channel",
        );

        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Reconnect cancelled");
                return Err(ReconnectAbort::Cancelled);
            }
            result = client.connect() => {
                match result {
                    Ok(conn) => {
                        tracing::info!(attempt, "Reconnected to push channel");
                        return Ok(conn);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Reconnect attempt {attempt} failed");
                    }
                }
            }
        }

        if let Some(max) = config.max_attempts {
            if attempt >= max {
                tracing::error!(attempt, "Giving up on push channel reconnection");
                return Err(ReconnectAbort::AttemptsExhausted);
            }
        }

        // Wait before the next attempt, respecting cancellation.
        tokio::select! {
            _ = cancel.cancelled() => return Err(ReconnectAbort::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }

        delay = next_delay(delay, config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_delay_doubles() {
        let config = ReconnectConfig::default();
        let d = next_delay(Duration::from_secs(1), &config);
        assert_eq!(d, Duration::from_secs(2));
    }

    #[test]
    fn next_delay_clamps_at_max() {
        let config = ReconnectConfig {
            max_delay: Duration::from_secs(10),
            ..Default::default()
        };
        let d = next_delay(Duration::from_secs(8), &config);
        assert_eq!(d, Duration::from_secs(10));
    }

    #[test]
    fn next_delay_already_at_max() {
        let config = ReconnectConfig {
            max_delay: Duration::from_secs(30),
            ..Default::default()
        };
        let d = next_delay(Duration::from_secs(30), &config);
        assert_eq!(d, Duration::from_secs(30));
    }

    #[test]
    fn custom_multiplier() {
        let config = ReconnectConfig {
            multiplier: 3.0,
            max_delay: Duration::from_secs(60),
            ..Default::default()
        };
        let d = next_delay(Duration::from_secs(2), &config);
        assert_eq!(d, Duration::from_secs(6));
    }

    #[test]
    fn full_backoff_sequence() {
        let config = ReconnectConfig::default();
        let mut delay = config.initial_delay;
        let expected = [1, 2, 4, 8, 16, 30, 30, 30];

        for &expected_secs in &expected {
            assert_eq!(delay.as_secs(), expected_secs);
            delay = next_delay(delay, &config);
        }
    }

    #[tokio::test]
    async fn cancellation_token_stops_reconnect() {
        let cancel = CancellationToken::new();
        // Cancel up front; the loop should return without connecting.
        cancel.cancel();

        let client = FeedClient::new("ws://localhost:9999".into());
        let config = ReconnectConfig::default();

        let result = reconnect_loop(&client, &config, &cancel).await;
        assert_eq!(result.unwrap_err(), ReconnectAbort::Cancelled);
    }

    #[tokio::test]
    async fn attempt_limit_is_honoured() {
        let cancel = CancellationToken::new();
        // Nothing listens on port 1; every attempt fails fast.
        let client = FeedClient::new("ws://127.0.0.1:1".into());
        let config = ReconnectConfig {
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(20),
            multiplier: 2.0,
            max_attempts: Some(2),
        };

        let result = reconnect_loop(&client, &config, &cancel).await;
        assert_eq!(result.unwrap_err(), ReconnectAbort::AttemptsExhausted);
    }
}
