//! Typed push-channel events and the dashboard state reducer.
//!
//! The socket layer emits a [`FeedEvent`] for everything that happens
//! on the channel; a single pure reducer folds events into
//! [`DashboardState`]. Nothing here touches the network or any UI
//! lifecycle.

use scrapedeck_core::health::HealthSample;
use scrapedeck_core::log::LogBuffer;

use crate::messages::FeedMessage;

/// A connection-level or message-level event from the push channel.
#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// The connection was established (or re-established).
    Open,
    /// An inbound frame parsed successfully.
    Message(FeedMessage),
    /// The connection closed.
    Close,
    /// A transport error, described for logging/display.
    Error(String),
}

/// Everything the operational dashboard displays.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// Most recent log events (bounded FIFO).
    pub logs: LogBuffer,
    /// Latest health sample, replaced wholesale on every update.
    pub health: HealthSample,
    /// Whether the push channel is currently connected.
    pub connected: bool,
}

impl DashboardState {
    /// Empty state retaining at most `log_capacity` log events.
    pub fn new(log_capacity: usize) -> Self {
        Self {
            logs: LogBuffer::new(log_capacity),
            health: HealthSample::default(),
            connected: false,
        }
    }
}

/// Fold one event into the dashboard state.
///
/// Unrecognized topics and error events leave the state untouched; the
/// caller is responsible for logging them. Health samples fold the same
/// way whether they arrived over the push channel or from a poll.
pub fn apply(state: &mut DashboardState, event: FeedEvent) {
    match event {
        FeedEvent::Open => state.connected = true,
        FeedEvent::Close => state.connected = false,
        FeedEvent::Message(FeedMessage::Log(log)) => state.logs.push(log),
        FeedEvent::Message(FeedMessage::Health(sample)) => state.health = sample,
        FeedEvent::Message(FeedMessage::Other { .. }) => {}
        FeedEvent::Error(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use scrapedeck_core::log::{LogEvent, LogLevel};

    fn log(message: &str, level: LogLevel) -> FeedEvent {
        FeedEvent::Message(FeedMessage::Log(LogEvent {
            timestamp: "t".to_string(),
            level,
            message: message.to_string(),
            user_id: None,
            received_at: Utc::now(),
        }))
    }

    #[test]
    fn open_and_close_toggle_connected() {
        let mut state = DashboardState::new(10);
        assert!(!state.connected);

        apply(&mut state, FeedEvent::Open);
        assert!(state.connected);

        apply(&mut state, FeedEvent::Close);
        assert!(!state.connected);
    }

    #[test]
    fn log_messages_append_to_the_buffer() {
        let mut state = DashboardState::new(10);
        apply(&mut state, log("one", LogLevel::Info));
        apply(&mut state, log("two", LogLevel::Error));
        let messages: Vec<_> = state.logs.events().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, ["one", "two"]);
    }

    #[test]
    fn buffer_eviction_applies_through_the_reducer() {
        let mut state = DashboardState::new(2);
        apply(&mut state, log("one", LogLevel::Info));
        apply(&mut state, log("two", LogLevel::Info));
        apply(&mut state, log("three", LogLevel::Info));
        let messages: Vec<_> = state.logs.events().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, ["two", "three"]);
    }

    #[test]
    fn health_sample_is_replaced_wholesale() {
        let mut state = DashboardState::new(10);
        apply(
            &mut state,
            FeedEvent::Message(FeedMessage::Health(HealthSample {
                cpu: 80.0,
                memory: 90.0,
            })),
        );
        apply(
            &mut state,
            FeedEvent::Message(FeedMessage::Health(HealthSample {
                cpu: 10.0,
                memory: 0.0,
            })),
        );
        assert_eq!(state.health, HealthSample { cpu: 10.0, memory: 0.0 });
    }

    #[test]
    fn unrecognized_topics_mutate_nothing() {
        let mut state = DashboardState::new(10);
        apply(&mut state, log("one", LogLevel::Info));
        let before_health = state.health;

        apply(
            &mut state,
            FeedEvent::Message(FeedMessage::Other {
                topic: "metrics_v2".to_string(),
            }),
        );
        assert_eq!(state.logs.len(), 1);
        assert_eq!(state.health, before_health);
    }

    #[test]
    fn error_events_mutate_nothing() {
        let mut state = DashboardState::new(10);
        apply(&mut state, FeedEvent::Open);
        apply(&mut state, FeedEvent::Error("io error".to_string()));
        assert!(state.connected);
        assert!(state.logs.is_empty());
    }
}
