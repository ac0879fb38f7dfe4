//! Stream controller: lifecycle, counters and the synchronous frame pipeline.
//!
//! ```rust
//! use dronestream::{RawFrame, StreamConfig, StreamController, Subscriber};
//!
//! let mut controller = StreamController::new(StreamConfig::default()).unwrap();
//! controller.subscribe(Subscriber::new(|frame| {
//!     println!("frame {} ({} base64 chars)", frame.sequence_number, frame.encoded_chunk.len());
//!     Ok(())
//! }));
//!
//! controller.start();
//! controller.process_incoming_frame(RawFrame::new(vec![0x89, b'P', b'N', b'G'], 0, 0));
//! controller.stop();
//! ```

use std::sync::Arc;
use tracing::{debug, info, trace};

use crate::clock::{SharedClock, SystemClock};
use crate::logging::{ObservabilitySink, TracingSink};
use crate::pipeline::{
    Admission, Base64Transcoder, BoundedFrameBuffer, BroadcastRegistry, DeliveryReport,
    FrameRateGovernor, FrameTranscoder, Subscriber,
};
use crate::types::{
    AdmittedFrame, BufferStatus, PerformanceMetrics, RawFrame, StreamState, TargetFrameRate,
};
use crate::{Result, StreamConfig, StreamError};

/// What happened to a frame handed to [`StreamController::process_incoming_frame`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Stream inactive, frame discarded without touching counters
    Ignored,
    /// Dropped by the rate governor
    RateLimited,
    /// Dropped because its sequence number did not advance within the activation
    OutOfOrder,
    /// Admitted but failed to transcode
    TranscodeFailed { evicted: usize },
    /// Admitted, transcoded and fanned out
    Delivered { evicted: usize, report: DeliveryReport },
}

/// Counters scoped to one controller, reset on `start` and `clear_buffer`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PerformanceCounters {
    pub frame_drop_count: u64,
    pub last_processed_time: u64,
}

/// Orchestrates the frame pipeline for one drone connection.
///
/// All mutation goes through `&mut self`, so a controller is driven by a
/// single owner. [`StreamDriver`](crate::StreamDriver) provides that owner
/// when frames and commands arrive from different tasks.
pub struct StreamController {
    state: StreamState,
    governor: FrameRateGovernor,
    buffer: BoundedFrameBuffer,
    transcoder: Box<dyn FrameTranscoder>,
    registry: Arc<BroadcastRegistry>,
    counters: PerformanceCounters,
    admissions: u64,
    last_sequence: Option<u64>,
    clock: SharedClock,
    sink: Arc<dyn ObservabilitySink>,
}

impl StreamController {
    /// Create an inactive controller.
    ///
    /// Fails only if the configuration is invalid.
    pub fn new(config: StreamConfig) -> Result<Self> {
        config.validate()?;
        let clock: SharedClock = Arc::new(SystemClock);
        let now = clock.now_ms();

        Ok(Self {
            state: StreamState::Inactive,
            governor: FrameRateGovernor::new(config.target_frame_rate),
            buffer: BoundedFrameBuffer::new(config.buffer_capacity)?,
            transcoder: Box::new(Base64Transcoder::with_max_payload(config.max_frame_bytes)),
            registry: Arc::new(BroadcastRegistry::new()),
            counters: PerformanceCounters { frame_drop_count: 0, last_processed_time: now },
            admissions: 0,
            last_sequence: None,
            clock,
            sink: Arc::new(TracingSink),
        })
    }

    /// Replace the clock used for admission and status.
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.counters.last_processed_time = clock.now_ms();
        self.clock = clock;
        self
    }

    /// Replace the sink receiving per-frame failures.
    pub fn with_sink(mut self, sink: Arc<dyn ObservabilitySink>) -> Self {
        self.sink = sink;
        self
    }

    /// Replace the transcoder.
    pub fn with_transcoder(mut self, transcoder: impl FrameTranscoder) -> Self {
        self.transcoder = Box::new(transcoder);
        self
    }

    /// Share a registry with other owners (for example a transport layer).
    pub fn with_registry(mut self, registry: Arc<BroadcastRegistry>) -> Self {
        self.registry = registry;
        self
    }

    fn reset_performance_counters(&mut self) {
        self.counters =
            PerformanceCounters { frame_drop_count: 0, last_processed_time: self.clock.now_ms() };
    }

    /// Begin an activation. Idempotent; always resets the counters.
    pub fn start(&mut self) {
        self.state = StreamState::Active;
        self.reset_performance_counters();
        self.governor.reset();
        self.admissions = 0;
        self.last_sequence = None;
        info!(target_fps = self.governor.target().fps(), "Video stream processor started");
    }

    /// End the activation. Idempotent; buffered frames are discarded.
    pub fn stop(&mut self) {
        self.state = StreamState::Inactive;
        self.buffer.clear();
        info!(
            frame_drop_count = self.counters.frame_drop_count,
            "Video stream processor stopped"
        );
    }

    /// Mark the stream inactive because its source is gone for good.
    ///
    /// Recovery is left to whoever owns the source.
    pub fn source_terminated(&mut self, cause: Option<&StreamError>) {
        match cause {
            Some(err) => self.sink.report("Frame source failed, stream deactivated", Some(err)),
            None => self.sink.report("Frame source ended, stream deactivated", None),
        }
        self.stop();
    }

    /// Report a non-fatal source error.
    pub fn report_source_error(&self, err: &StreamError) {
        self.sink.report("Frame source error", Some(err));
    }

    /// Run one frame through the pipeline.
    ///
    /// Returns once every current subscriber has been called. No per-frame
    /// failure escapes; failures are counted as drops and reported.
    ///
    /// Within one activation admitted sequence numbers strictly increase: a
    /// frame numbered at or below the last admitted one is dropped, for
    /// example after the source restarted its numbering mid-activation.
    /// Admission is decided on the controller clock at processing time,
    /// not on the frame's capture timestamp.
    pub fn process_incoming_frame(&mut self, frame: RawFrame) -> FrameOutcome {
        if !self.state.is_active() {
            return FrameOutcome::Ignored;
        }

        let sequence_number = frame.sequence_number;
        if let Some(last) = self.last_sequence {
            if sequence_number <= last {
                self.counters.frame_drop_count += 1;
                let err = StreamError::source_failed(format!(
                    "sequence number {} does not follow {}",
                    sequence_number, last
                ));
                self.sink.report("Out-of-order video frame dropped", Some(&err));
                return FrameOutcome::OutOfOrder;
            }
        }

        let now = self.clock.now_ms();
        if self.governor.check(now) == Admission::Dropped {
            self.counters.frame_drop_count += 1;
            return FrameOutcome::RateLimited;
        }

        self.last_sequence = Some(sequence_number);
        let admitted = AdmittedFrame { frame, admission_index: self.admissions, admitted_at: now };
        self.admissions += 1;

        let evicted = self.buffer.enqueue(admitted);
        self.counters.frame_drop_count += evicted as u64;
        self.counters.last_processed_time = now;

        let transcoded = match self.buffer.latest() {
            Some(latest) => self.transcoder.transcode(latest),
            None => Err(StreamError::transcode_failed(sequence_number, "frame missing from buffer")),
        };

        match transcoded {
            Ok(transport) => {
                let report = self.registry.deliver(&transport, self.sink.as_ref());
                trace!(sequence_number, evicted, delivered = report.delivered, "Frame processed");
                FrameOutcome::Delivered { evicted, report }
            }
            Err(err) => {
                self.counters.frame_drop_count += 1;
                self.sink.report("Error processing video data", Some(&err));
                FrameOutcome::TranscodeFailed { evicted }
            }
        }
    }

    /// Register a frame subscriber
    pub fn subscribe(&self, subscriber: Subscriber) {
        self.registry.subscribe(subscriber);
    }

    /// Remove the first registration of `subscriber`
    pub fn unsubscribe(&self, subscriber: &Subscriber) -> bool {
        self.registry.unsubscribe(subscriber)
    }

    /// Shared handle to the subscriber registry
    pub fn registry(&self) -> Arc<BroadcastRegistry> {
        Arc::clone(&self.registry)
    }

    /// Set the target rate, clamped to 10..=60 fps. Returns the applied rate.
    pub fn set_target_frame_rate(&mut self, fps: u32) -> TargetFrameRate {
        let rate = TargetFrameRate::new(fps);
        self.governor.set_target(rate);
        info!(requested = fps, applied = rate.fps(), "Target frame rate adjusted");
        rate
    }

    /// Empty the buffer and reset counters without changing the state.
    pub fn clear_buffer(&mut self) {
        let cleared = self.buffer.clear();
        self.reset_performance_counters();
        self.governor.anchor(self.counters.last_processed_time);
        debug!(cleared, "Video buffer cleared");
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    pub fn counters(&self) -> PerformanceCounters {
        self.counters
    }

    pub fn get_status(&self) -> BufferStatus {
        let elapsed = self.clock.now_ms().saturating_sub(self.counters.last_processed_time);
        let current_frame_rate = if elapsed > 0 { 1000.0 / elapsed as f64 } else { 0.0 };

        BufferStatus {
            size: self.buffer.len(),
            capacity: self.buffer.capacity(),
            is_active: self.state.is_active(),
            frame_drop_count: self.counters.frame_drop_count,
            target_frame_rate: self.governor.target().fps(),
            current_frame_rate: (current_frame_rate * 10.0).round() / 10.0,
        }
    }

    pub fn get_performance_metrics(&self) -> PerformanceMetrics {
        PerformanceMetrics {
            frame_drop_count: self.counters.frame_drop_count,
            buffer_utilization: self.buffer.len() as f64 * 100.0 / self.buffer.capacity() as f64,
            target_frame_rate: self.governor.target().fps(),
        }
    }
}
