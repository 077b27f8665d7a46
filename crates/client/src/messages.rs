//! Push-channel message types and parser.
//!
//! The service sends JSON envelopes of the shape
//! `{"topic": "<name>", "data": {...}}`. The envelope is split by hand
//! so that an unrecognized topic parses to [`FeedMessage::Other`]
//! instead of failing: new server-side topics are ignored, not fatal.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use scrapedeck_core::health::HealthSample;
use scrapedeck_core::log::{LogEvent, LogLevel};

/// Topic under which log lines are pushed.
pub const TOPIC_LOGS: &str = "logs";

/// Topic under which health samples are pushed.
pub const TOPIC_HEALTH: &str = "health";

/// Client -> server subscription declaration.
#[derive(Debug, Serialize)]
struct SubscribeAction<'a> {
    action: &'static str,
    topic: &'a str,
}

/// Serialize the subscribe frame for one topic.
pub fn subscribe_message(topic: &str) -> String {
    serde_json::to_string(&SubscribeAction {
        action: "subscribe",
        topic,
    })
    .expect("SubscribeAction is always serialisable")
}

/// Raw envelope shared by every inbound frame.
#[derive(Debug, Deserialize)]
struct Envelope {
    topic: String,
    #[serde(default)]
    data: Value,
}

/// Wire payload of a `logs` message (Python logging record fields).
#[derive(Debug, Clone, Deserialize)]
pub struct LogPayload {
    /// Server-side formatted timestamp.
    #[serde(default)]
    pub asctime: String,
    /// Level name (`INFO`, `ERROR`, ...).
    #[serde(default)]
    pub levelname: String,
    /// Message text. Records without one fall back to the raw payload.
    pub msg: Option<String>,
    /// Originating user. The service sends either a string or a number.
    pub user_id: Option<Value>,
}

impl LogPayload {
    /// Convert into the client-side event, stamping the arrival time.
    pub fn into_event(self, raw: &Value) -> LogEvent {
        let message = match self.msg {
            Some(msg) => msg,
            // No msg field: render the whole record, as the original
            // dashboard did.
            None => raw.to_string(),
        };
        LogEvent {
            timestamp: self.asctime,
            level: LogLevel::from_wire(&self.levelname),
            message,
            user_id: self.user_id.map(|value| match value {
                Value::String(s) => s,
                other => other.to_string(),
            }),
            received_at: chrono::Utc::now(),
        }
    }
}

/// A parsed inbound frame.
#[derive(Debug, Clone)]
pub enum FeedMessage {
    /// A log line on the `logs` topic.
    Log(LogEvent),
    /// A health sample on the `health` topic.
    Health(HealthSample),
    /// A topic this client does not consume. Dropped downstream.
    Other {
        /// The unrecognized topic name, for debug logging.
        topic: String,
    },
}

/// Parse one inbound text frame.
///
/// Unknown topics succeed as [`FeedMessage::Other`]. Malformed JSON, a
/// missing envelope, or a payload that does not match its topic's shape
/// is an error the processing loop logs and skips.
pub fn parse_message(text: &str) -> Result<FeedMessage, serde_json::Error> {
    let envelope: Envelope = serde_json::from_str(text)?;
    match envelope.topic.as_str() {
        TOPIC_LOGS => {
            let payload: LogPayload = serde_json::from_value(envelope.data.clone())?;
            Ok(FeedMessage::Log(payload.into_event(&envelope.data)))
        }
        TOPIC_HEALTH => {
            let sample: HealthSample = serde_json::from_value(envelope.data)?;
            Ok(FeedMessage::Health(sample))
        }
        _ => Ok(FeedMessage::Other {
            topic: envelope.topic,
        }),
    }
}
