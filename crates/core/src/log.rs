//! Log events pushed by the service and the bounded buffer that retains
//! the most recent ones for display.

use std::collections::VecDeque;

use serde::Serialize;

use crate::types::Timestamp;

/// Default number of log events retained for display.
pub const DEFAULT_LOG_CAPACITY: usize = 100;

/// Severity of a log event.
///
/// Parsed case-insensitively from the wire `levelname`. Unknown levels
/// are preserved verbatim rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
    Other(String),
}

impl LogLevel {
    /// Parse a Python-logging style level name (`INFO`, `ERROR`, ...).
    pub fn from_wire(levelname: &str) -> Self {
        match levelname.to_ascii_uppercase().as_str() {
            "INFO" => Self::Info,
            "WARNING" => Self::Warning,
            "ERROR" => Self::Error,
            _ => Self::Other(levelname.to_string()),
        }
    }

    /// Whether this event belongs in the error-reports view.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
            Self::Other(level) => write!(f, "{level}"),
        }
    }
}

/// A single log line delivered over the push channel.
#[derive(Debug, Clone, Serialize)]
pub struct LogEvent {
    /// Server-side formatted timestamp (`asctime`), kept opaque.
    pub timestamp: String,
    /// Severity level.
    pub level: LogLevel,
    /// Message text.
    pub message: String,
    /// Originating user, when the service attributes one.
    pub user_id: Option<String>,
    /// When this client received the event (UTC).
    pub received_at: Timestamp,
}

/// Fixed-capacity FIFO over the most recent log events.
///
/// Appending beyond capacity evicts the oldest entry, so the buffer
/// always holds the last `capacity` events in arrival order.
#[derive(Debug, Clone)]
pub struct LogBuffer {
    events: VecDeque<LogEvent>,
    capacity: usize,
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

impl LogBuffer {
    /// Create a buffer holding at most `capacity` events (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an event, evicting the oldest one when at capacity.
    pub fn push(&mut self, event: LogEvent) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    /// All retained events, oldest first.
    pub fn events(&self) -> impl Iterator<Item = &LogEvent> {
        self.events.iter()
    }

    /// The error-reports view: events with `level == Error`, oldest first.
    ///
    /// Recomputed on demand from the current buffer, never stored
    /// separately, so it always reflects the latest evictions.
    pub fn errors(&self) -> impl Iterator<Item = &LogEvent> {
        self.events.iter().filter(|event| event.level.is_error())
    }

    /// Number of retained events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether no events are retained.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Maximum number of retained events.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
