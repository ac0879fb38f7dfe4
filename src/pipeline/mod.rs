//! Pipeline stages: admission, buffering, transcoding and fan-out.
//!
//! Each stage is a plain synchronous type; [`StreamController`](crate::StreamController)
//! wires them together and owns their state.

pub mod buffer;
pub mod governor;
pub mod registry;
pub mod transcoder;

pub use buffer::BoundedFrameBuffer;
pub use governor::{Admission, FrameRateGovernor};
pub use registry::{BroadcastRegistry, DeliveryReport, FrameCallback, Subscriber};
pub use transcoder::{Base64Transcoder, FrameTranscoder};
