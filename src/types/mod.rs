//! Core types for the video pipeline.
//!
//! - [`RawFrame`] is what a frame source emits: a shared binary payload, a
//!   source-assigned sequence number and a capture timestamp
//! - [`AdmittedFrame`] is a raw frame that passed the rate governor
//! - [`TransportFrame`] is the base64 form delivered to subscribers
//! - [`BufferStatus`] and [`PerformanceMetrics`] are read-only snapshots
//! - [`TransportMessage`] is the JSON envelope sent to browser clients

mod frame;
mod frame_rate;
mod message;
mod status;

pub use frame::{AdmittedFrame, RawFrame, TransportFrame};
pub use frame_rate::TargetFrameRate;
pub use message::{DroneTelemetry, FlightState, TransportMessage};
pub use status::{BufferStatus, PerformanceMetrics, StreamState};
