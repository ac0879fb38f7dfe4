//! Video stream processing for AR.Drone control bridges.
//!
//! Dronestream sits between a drone's video feed and the clients watching
//! it. Raw frames are rate limited, kept in a small bounded buffer,
//! base64-encoded and fanned out to every subscriber.
//!
//! # Features
//!
//! - **Rate governing**: target frame rate clamped to 10..=60 fps
//! - **Bounded memory**: oldest frames are evicted in bulk under pressure
//! - **Failure isolation**: a failing subscriber or frame never stops the stream
//! - **Async driver**: control and subscribe from any task through a [`StreamHandle`]
//!
//! # Synchronous use
//!
//! [`StreamController`] is the pipeline itself and can be driven directly:
//!
//! ```rust
//! use dronestream::{RawFrame, StreamConfig, StreamController, Subscriber};
//!
//! let mut controller = StreamController::new(StreamConfig::default())?;
//! controller.subscribe(Subscriber::new(|frame| {
//!     println!("frame {}", frame.sequence_number);
//!     Ok(())
//! }));
//! controller.start();
//! controller.process_incoming_frame(RawFrame::new(vec![1, 2, 3], 0, 0));
//! # Ok::<(), dronestream::StreamError>(())
//! ```
//!
//! # Async use
//!
//! ```rust,no_run
//! use dronestream::{StreamConfig, VideoBridge};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> dronestream::Result<()> {
//!     let (sender, handle) = VideoBridge::channel(StreamConfig::default()).await?;
//!     let mut frames = handle.subscribe_stream();
//!     handle.start().await?;
//!
//!     // Called from the drone adapter's video callback
//!     sender.push(vec![0x89, b'P', b'N', b'G']);
//!
//!     while let Some(frame) = frames.next().await {
//!         println!("frame {} ({} chars)", frame.sequence_number, frame.encoded_chunk.len());
//!     }
//!     Ok(())
//! }
//! ```

// Core types and error handling
pub mod clock;
pub mod config;
mod error;
pub mod logging;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Frame pipeline
pub mod controller;
pub mod pipeline;

// Async architecture
pub mod driver;
pub mod handle;
pub mod source;
pub mod sources;
pub mod subscription;

// Core exports
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use config::StreamConfig;
pub use error::*;
pub use logging::{ObservabilitySink, TracingSink, init_tracing};
pub use types::*;

// Pipeline exports
pub use controller::{FrameOutcome, PerformanceCounters, StreamController};
pub use pipeline::{
    Base64Transcoder, BoundedFrameBuffer, BroadcastRegistry, DeliveryReport, FrameRateGovernor,
    FrameTranscoder, Subscriber,
};

// Async exports
pub use driver::StreamDriver;
pub use handle::{StreamEvent, StreamHandle};
pub use source::FrameSource;
pub use sources::{ChannelSource, FrameSender, ReplaySource};
pub use subscription::FrameSubscription;

use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Unified entry point for spawning video streams.
///
/// Each method builds a [`StreamController`] from the configuration, spawns
/// its driver on the current Tokio runtime and returns the handle. Streams
/// start inactive; call [`StreamHandle::start`] to begin delivering frames.
///
/// # Examples
///
/// ## Live drone feed
/// ```rust,no_run
/// use dronestream::{StreamConfig, VideoBridge};
///
/// #[tokio::main]
/// async fn main() -> dronestream::Result<()> {
///     let (sender, handle) = VideoBridge::channel(StreamConfig::default()).await?;
///     // Hand `sender` to the drone adapter, `handle` to the transport layer
///     Ok(())
/// }
/// ```
///
/// ## Recorded frames
/// ```rust,no_run
/// use dronestream::{StreamConfig, VideoBridge};
///
/// #[tokio::main]
/// async fn main() -> dronestream::Result<()> {
///     let handle = VideoBridge::replay_dir("recordings/flight-01", 15.0, StreamConfig::default()).await?;
///     handle.start().await?;
///     Ok(())
/// }
/// ```
pub struct VideoBridge;

impl VideoBridge {
    /// Spawn a stream fed by an arbitrary [`FrameSource`].
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::InvalidConfig`] if `config` fails validation.
    pub async fn spawn<S: FrameSource>(source: S, config: StreamConfig) -> Result<StreamHandle> {
        let controller = StreamController::new(config.clone())?;
        info!(source = source.name(), target_fps = config.target_frame_rate.fps(), "Spawning video stream");
        Ok(StreamDriver::spawn(source, controller, &config))
    }

    /// Spawn a stream fed by a [`FrameSender`], for push-based drone adapters.
    pub async fn channel(config: StreamConfig) -> Result<(FrameSender, StreamHandle)> {
        config.validate()?;
        let (sender, source) = ChannelSource::channel(Arc::new(SystemClock), config.source_queue);
        let handle = Self::spawn(source, config).await?;
        Ok((sender, handle))
    }

    /// Spawn a stream replaying every file in `dir` at `fps` frames per second.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::File`] if the directory or one of its files
    /// cannot be read.
    pub async fn replay_dir<P: AsRef<Path>>(dir: P, fps: f64, config: StreamConfig) -> Result<StreamHandle> {
        let source = ReplaySource::from_dir(dir, fps, Arc::new(SystemClock))?;
        Self::spawn(source, config).await
    }
}
