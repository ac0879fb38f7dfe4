//! Test utilities shared by unit tests, integration tests and benchmarks
//!
//! Provides a recording [`ObservabilitySink`], recording and failing
//! subscribers, and raw frame builders.

#![cfg(any(test, feature = "benchmark"))]

use std::error::Error;
use std::sync::{Arc, Mutex};

use crate::logging::ObservabilitySink;
use crate::pipeline::Subscriber;
use crate::types::{RawFrame, TransportFrame};

/// One report captured by [`RecordingSink`]
#[derive(Debug, Clone)]
pub struct Report {
    pub message: String,
    /// The error followed by its `source()` chain, joined with `": "`
    pub error: Option<String>,
}

/// Sink that keeps every report in memory.
///
/// Clones share the same storage, so a clone can be handed to a controller
/// and inspected afterwards.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    reports: Arc<Mutex<Vec<Report>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of reports received
    pub fn count(&self) -> usize {
        self.reports.lock().unwrap().len()
    }

    pub fn reports(&self) -> Vec<Report> {
        self.reports.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.reports.lock().unwrap().iter().map(|r| r.message.clone()).collect()
    }

    /// Rendered errors of the reports that carried one
    pub fn errors(&self) -> Vec<String> {
        self.reports.lock().unwrap().iter().filter_map(|r| r.error.clone()).collect()
    }
}

impl ObservabilitySink for RecordingSink {
    fn report(&self, message: &str, error: Option<&(dyn Error + 'static)>) {
        let error = error.map(|err| {
            let mut rendered = err.to_string();
            let mut source = err.source();
            while let Some(cause) = source {
                rendered.push_str(": ");
                rendered.push_str(&cause.to_string());
                source = cause.source();
            }
            rendered
        });
        self.reports.lock().unwrap().push(Report { message: message.to_string(), error });
    }
}

/// Subscriber that records every frame it receives
pub fn recording_subscriber() -> (Subscriber, Arc<Mutex<Vec<TransportFrame>>>) {
    let frames = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&frames);
    let subscriber = Subscriber::named("recorder", move |frame: &TransportFrame| {
        sink.lock().unwrap().push(frame.clone());
        Ok(())
    });
    (subscriber, frames)
}

/// Subscriber whose callback always fails with `message`
pub fn failing_subscriber(message: &'static str) -> Subscriber {
    Subscriber::named("failing", move |_: &TransportFrame| Err(message.into()))
}

/// Raw frame with a capture timestamp derived from its sequence number
pub fn frame(sequence_number: u64, payload: &[u8]) -> RawFrame {
    RawFrame::new(payload.to_vec(), sequence_number, sequence_number * 100)
}

/// Payload of `len` bytes shaped like the start of a PNG image
pub fn png_like_payload(len: usize) -> Vec<u8> {
    const SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    SIGNATURE.iter().copied().chain((0..).map(|i: usize| (i % 251) as u8)).take(len).collect()
}
