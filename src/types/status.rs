//! Read-only stream introspection types

use serde::{Deserialize, Serialize};

/// Lifecycle state of a stream controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamState {
    /// Frames are discarded without touching any counter
    #[default]
    Inactive,
    /// Frames run through the full pipeline
    Active,
}

impl StreamState {
    pub fn is_active(self) -> bool {
        self == StreamState::Active
    }
}

/// Snapshot returned by `get_status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferStatus {
    pub size: usize,
    pub capacity: usize,
    pub is_active: bool,
    pub frame_drop_count: u64,
    pub target_frame_rate: u32,
    /// Instantaneous rate derived from the last admission, one decimal
    pub current_frame_rate: f64,
}

/// Snapshot returned by `get_performance_metrics`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub frame_drop_count: u64,
    /// Buffer fill as a percentage of capacity
    pub buffer_utilization: f64,
    pub target_frame_rate: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_camel_case() {
        let status = BufferStatus {
            size: 2,
            capacity: 5,
            is_active: true,
            frame_drop_count: 4,
            target_frame_rate: 10,
            current_frame_rate: 9.5,
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["isActive"], true);
        assert_eq!(json["frameDropCount"], 4);
        assert_eq!(json["currentFrameRate"], 9.5);
    }

    #[test]
    fn default_state_is_inactive() {
        assert!(!StreamState::default().is_active());
    }
}
