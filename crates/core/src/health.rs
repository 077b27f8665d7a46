//! System health sample reported by the service.

use serde::{Deserialize, Serialize};

/// Most recent health reading (processor and memory load percentages).
///
/// Only the latest sample is ever retained, and a new sample always
/// replaces the previous one wholesale. A field the server omits
/// deserializes to `0.0`; it is never back-filled from the previous
/// sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthSample {
    /// Processor load percentage (0-100).
    #[serde(default)]
    pub cpu: f64,
    /// Memory load percentage (0-100).
    #[serde(default)]
    pub memory: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_sample() {
        let sample: HealthSample = serde_json::from_str(r#"{"cpu": 42.5, "memory": 63.0}"#).unwrap();
        assert_eq!(sample.cpu, 42.5);
        assert_eq!(sample.memory, 63.0);
    }

    #[test]
    fn missing_field_defaults_to_zero() {
        let sample: HealthSample = serde_json::from_str(r#"{"cpu": 10.0}"#).unwrap();
        assert_eq!(sample.cpu, 10.0);
        assert_eq!(sample.memory, 0.0);
    }

    #[test]
    fn replacement_is_wholesale() {
        let mut current = HealthSample { cpu: 80.0, memory: 90.0 };
        let incoming: HealthSample = serde_json::from_str(r#"{"cpu": 10.0}"#).unwrap();
        current = incoming;
        // The old memory reading must not survive the replacement.
        assert_eq!(current.memory, 0.0);
    }
}
