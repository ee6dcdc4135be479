use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    BYTES_PER_RECORD_FACTOR, COMPARISON_CAPACITY, RECORDS_PER_FLOAT, RESPONSE_LATENCY_MS,
};

/// Per-deployment tunables for one engine instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum floats held by the comparison selection.
    pub selection_capacity: usize,
    pub estimator: EstimatorConfig,
    pub conversation: ConversationConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            selection_capacity: COMPARISON_CAPACITY,
            estimator: EstimatorConfig::default(),
            conversation: ConversationConfig::default(),
        }
    }
}

/// Constants behind the export size estimate.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Profile rows assumed per float. A real backend supplies actual counts.
    pub records_per_float: u64,
    /// Kilobytes per record.
    pub bytes_per_record_factor: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            records_per_float: RECORDS_PER_FLOAT,
            bytes_per_record_factor: BYTES_PER_RECORD_FACTOR,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// Delay between a user message and its scheduled reply.
    pub response_latency_ms: u64,
    /// Seed new sessions with the assistant greeting.
    pub greeting: bool,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            response_latency_ms: RESPONSE_LATENCY_MS,
            greeting: false,
        }
    }
}

impl ConversationConfig {
    pub fn response_latency(&self) -> Duration {
        Duration::from_millis(self.response_latency_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_values() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.selection_capacity, 5);
        assert_eq!(cfg.estimator.records_per_float, 50);
        assert_eq!(cfg.estimator.bytes_per_record_factor, 0.1);
        assert_eq!(cfg.conversation.response_latency(), Duration::from_secs(1));
        assert!(!cfg.conversation.greeting);
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let cfg: EngineConfig =
            serde_json::from_str(r#"{"estimator": {"records_per_float": 80}}"#).unwrap();
        assert_eq!(cfg.estimator.records_per_float, 80);
        assert_eq!(cfg.estimator.bytes_per_record_factor, 0.1);
        assert_eq!(cfg.selection_capacity, 5);
    }
}
