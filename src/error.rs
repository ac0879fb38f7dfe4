//! Error types for video stream processing.
//!
//! Errors in this crate fall into two groups:
//!
//! - **Construction errors** (invalid configuration, unreadable replay
//!   directories) are returned to the caller.
//! - **Per-frame errors** (transcoding failures, subscriber failures, source
//!   hiccups) never cross the ingestion boundary. They are built here so that
//!   they can be reported to an [`ObservabilitySink`](crate::ObservabilitySink)
//!   with full context, then counted and discarded.
//!
//! ```rust
//! use dronestream::StreamError;
//!
//! let error = StreamError::source_failed("video socket reset");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for stream operations.
pub type Result<T, E = StreamError> = std::result::Result<T, E>;

/// Boxed error returned by subscriber callbacks.
pub type SubscriberError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for stream operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StreamError {
    #[error("Invalid configuration for '{field}': {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("Failed to transcode frame {sequence_number}: {reason}")]
    Transcode { sequence_number: u64, reason: String },

    #[error("Subscriber failed: {reason}")]
    Subscriber {
        reason: String,
        #[source]
        source: Option<SubscriberError>,
    },

    #[error("Frame source error: {reason}")]
    Source {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Frame file error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config parse error in {context}: {details}")]
    Config { context: String, details: String },

    #[error("Stream driver is no longer running ({context})")]
    ChannelClosed { context: String },
}

impl StreamError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            StreamError::Source { .. } => true,
            StreamError::Subscriber { .. } => true,
            StreamError::Transcode { .. } => true,
            StreamError::InvalidConfig { .. } => false,
            StreamError::File { .. } => false,
            StreamError::Config { .. } => false,
            StreamError::ChannelClosed { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            StreamError::InvalidConfig { .. } => vec![
                "Use a buffer capacity of at least 1",
                "Check queue sizes in the stream configuration",
            ],
            StreamError::Transcode { .. } => vec![
                "Check the frame payload size limit",
                "Verify the drone is emitting complete frames",
            ],
            StreamError::Subscriber { .. } => vec![
                "Check the transport connection of the failing client",
                "Move slow work out of the delivery callback",
            ],
            StreamError::Source { .. } => vec![
                "Check the video link to the drone",
                "Verify the drone is powered and in range",
                "Reconnect the drone adapter",
            ],
            StreamError::File { .. } => vec![
                "Check the replay directory exists and is readable",
                "Check file permissions",
            ],
            StreamError::Config { .. } => vec![
                "Check the YAML syntax of the configuration file",
                "Compare field names against the documented configuration",
            ],
            StreamError::ChannelClosed { .. } => vec![
                "Spawn a new stream driver",
                "Keep a handle alive for as long as the stream is needed",
            ],
        }
    }

    /// Helper constructor for configuration validation errors.
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        StreamError::InvalidConfig { field: field.into(), reason: reason.into() }
    }

    /// Helper constructor for transcoding errors.
    pub fn transcode_failed(sequence_number: u64, reason: impl Into<String>) -> Self {
        StreamError::Transcode { sequence_number, reason: reason.into() }
    }

    /// Helper constructor for subscriber failures.
    pub fn subscriber_failed(reason: impl Into<String>, source: Option<SubscriberError>) -> Self {
        StreamError::Subscriber { reason: reason.into(), source }
    }

    /// Helper constructor for frame source errors.
    pub fn source_failed(reason: impl Into<String>) -> Self {
        StreamError::Source { reason: reason.into(), source: None }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        StreamError::File { path, source }
    }

    /// Helper constructor for a driver that has shut down.
    pub fn channel_closed(context: impl Into<String>) -> Self {
        StreamError::ChannelClosed { context: context.into() }
    }
}

impl From<std::io::Error> for StreamError {
    fn from(err: std::io::Error) -> Self {
        StreamError::File { path: PathBuf::from("<unknown>"), source: err }
    }
}

impl From<serde_yaml_ng::Error> for StreamError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        StreamError::Config { context: "stream configuration".to_string(), details: err.to_string() }
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for StreamError {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        StreamError::channel_closed("driver dropped the reply")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn error_messages_carry_their_context(
            reason in ".*",
            field in "\\w+",
            sequence_number in any::<u64>(),
        ) {
            let config_msg = StreamError::invalid_config(field.clone(), reason.clone()).to_string();
            prop_assert!(config_msg.contains(&field));
            prop_assert!(config_msg.contains(&reason));

            let transcode_msg = StreamError::transcode_failed(sequence_number, reason.clone()).to_string();
            prop_assert!(transcode_msg.contains(&sequence_number.to_string()));

            let source_msg = StreamError::source_failed(reason.clone()).to_string();
            prop_assert!(source_msg.contains(&reason));
        }
    }

    #[test]
    fn subscriber_error_chains_its_source() {
        let inner: SubscriberError = Box::new(std::io::Error::other("socket closed"));
        let error = StreamError::subscriber_failed("client 7", Some(inner));

        let source = std::error::Error::source(&error).expect("source should be preserved");
        assert_eq!(source.to_string(), "socket closed");
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<StreamError>();

        let error = StreamError::channel_closed("test");
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn recovery_methods_work() {
        let source_error = StreamError::source_failed("link down");
        let config_error = StreamError::invalid_config("buffer_capacity", "must be at least 1");

        assert!(source_error.is_retryable());
        assert!(!config_error.is_retryable());
        assert!(!StreamError::file_error("frames".into(), std::io::Error::other("gone")).is_retryable());

        for suggestion in source_error.recovery_suggestions() {
            assert!(suggestion.len() > 5);
        }
        assert!(!config_error.recovery_suggestions().is_empty());
    }

    #[test]
    fn yaml_errors_convert_to_config_errors() {
        let yaml_err = serde_yaml_ng::from_str::<u32>("not: [a number").unwrap_err();
        let error: StreamError = yaml_err.into();
        assert!(matches!(error, StreamError::Config { .. }));
    }
}
