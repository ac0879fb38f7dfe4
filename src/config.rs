//! Stream configuration.
//!
//! Configuration can be built in code or loaded from YAML:
//!
//! ```rust
//! use dronestream::StreamConfig;
//!
//! let config = StreamConfig::from_yaml_str("buffer_capacity: 8\ntarget_frame_rate: 30\n").unwrap();
//! assert_eq!(config.buffer_capacity, 8);
//! assert_eq!(config.target_frame_rate.fps(), 30);
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::types::TargetFrameRate;
use crate::{Result, StreamError};

/// Default number of admitted frames retained by the buffer.
pub const DEFAULT_BUFFER_CAPACITY: usize = 5;

/// Configuration for a stream controller and its driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Capacity of the bounded frame buffer
    pub buffer_capacity: usize,

    /// Target admitted frame rate (clamped to 10..=60)
    pub target_frame_rate: TargetFrameRate,

    /// Frames with larger payloads fail transcoding and are dropped
    pub max_frame_bytes: Option<usize>,

    /// Consecutive source errors after which the source is considered dead
    pub max_source_errors: u32,

    /// Base backoff after a source error, doubled per consecutive error
    pub error_backoff_ms: u64,

    /// Capacity of the queue between a frame sender and the driver
    pub source_queue: usize,

    /// Capacity of the driver command queue
    pub command_queue: usize,

    /// Capacity of each async subscription queue
    pub subscription_queue: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            target_frame_rate: TargetFrameRate::default(),
            max_frame_bytes: None,
            max_source_errors: 10,
            error_backoff_ms: 50,
            source_queue: 64,
            command_queue: 32,
            subscription_queue: 16,
        }
    }
}

impl StreamConfig {
    /// Parse and validate a YAML configuration document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: StreamConfig = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| StreamError::file_error(path.to_path_buf(), e))?;
        Self::from_yaml_str(&yaml)
    }

    /// Set the buffer capacity.
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Set the target frame rate; out-of-range values are clamped.
    pub fn target_frame_rate(mut self, fps: u32) -> Self {
        self.target_frame_rate = TargetFrameRate::new(fps);
        self
    }

    /// Set the payload size limit.
    pub fn max_frame_bytes(mut self, limit: usize) -> Self {
        self.max_frame_bytes = Some(limit);
        self
    }

    /// Set the consecutive source error limit.
    pub fn max_source_errors(mut self, limit: u32) -> Self {
        self.max_source_errors = limit;
        self
    }

    /// Set the base error backoff.
    pub fn error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff_ms = backoff.as_millis() as u64;
        self
    }

    /// Backoff to wait after `consecutive_errors` source errors.
    pub fn backoff_for(&self, consecutive_errors: u32) -> Duration {
        Duration::from_millis(self.error_backoff_ms.saturating_mul(1 << consecutive_errors.min(5)))
    }

    /// Check that every field is usable.
    pub fn validate(&self) -> Result<()> {
        if self.buffer_capacity == 0 {
            return Err(StreamError::invalid_config("buffer_capacity", "must be at least 1"));
        }
        if self.max_source_errors == 0 {
            return Err(StreamError::invalid_config("max_source_errors", "must be at least 1"));
        }
        if self.source_queue == 0 {
            return Err(StreamError::invalid_config("source_queue", "must be at least 1"));
        }
        if self.command_queue == 0 {
            return Err(StreamError::invalid_config("command_queue", "must be at least 1"));
        }
        if self.subscription_queue == 0 {
            return Err(StreamError::invalid_config("subscription_queue", "must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_bridge() {
        let config = StreamConfig::default();
        assert_eq!(config.buffer_capacity, 5);
        assert_eq!(config.target_frame_rate.fps(), 10);
        assert!(config.max_frame_bytes.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn yaml_fields_are_optional() {
        let config = StreamConfig::from_yaml_str("max_frame_bytes: 65536\n").unwrap();
        assert_eq!(config.max_frame_bytes, Some(65536));
        assert_eq!(config.buffer_capacity, DEFAULT_BUFFER_CAPACITY);
    }

    #[test]
    fn yaml_frame_rate_is_clamped() {
        let config = StreamConfig::from_yaml_str("target_frame_rate: 240\n").unwrap();
        assert_eq!(config.target_frame_rate.fps(), 60);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let result = StreamConfig::from_yaml_str("buffer_capacity: 0\n");
        assert!(matches!(result, Err(StreamError::InvalidConfig { ref field, .. }) if field == "buffer_capacity"));
    }

    #[test]
    fn malformed_yaml_is_a_config_error() {
        let result = StreamConfig::from_yaml_str("buffer_capacity: [");
        assert!(matches!(result, Err(StreamError::Config { .. })));
    }

    #[test]
    fn missing_file_reports_path() {
        let result = StreamConfig::from_file("/definitely/not/here.yaml");
        match result {
            Err(StreamError::File { path, .. }) => assert!(path.ends_with("here.yaml")),
            other => panic!("Expected File error, got {:?}", other),
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let config = StreamConfig::default().error_backoff(Duration::from_millis(10));
        assert_eq!(config.backoff_for(1), Duration::from_millis(20));
        assert_eq!(config.backoff_for(2), Duration::from_millis(40));
        assert_eq!(config.backoff_for(9), Duration::from_millis(320));
    }
}
