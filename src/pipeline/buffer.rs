//! Fixed-capacity buffer of admitted frames

use std::collections::VecDeque;
use tracing::debug;

use crate::types::AdmittedFrame;
use crate::{Result, StreamError};

/// Bounded queue of admitted frames with bulk eviction.
///
/// When an enqueue finds the buffer full, the oldest `ceil(len / 2)` frames
/// are evicted at once before the new frame is appended, so sustained
/// overload costs one eviction every few frames instead of one per frame.
#[derive(Debug)]
pub struct BoundedFrameBuffer {
    frames: VecDeque<AdmittedFrame>,
    capacity: usize,
}

impl BoundedFrameBuffer {
    /// Create a buffer; a capacity of zero is rejected.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(StreamError::invalid_config("buffer_capacity", "must be at least 1"));
        }
        Ok(Self { frames: VecDeque::with_capacity(capacity), capacity })
    }

    /// Append a frame, evicting first if full.
    ///
    /// Returns the number of evicted frames.
    pub fn enqueue(&mut self, frame: AdmittedFrame) -> usize {
        let mut evicted = 0;
        if self.frames.len() >= self.capacity {
            evicted = self.frames.len().div_ceil(2);
            self.frames.drain(..evicted);
            debug!(evicted, capacity = self.capacity, "Buffer full, evicted oldest frames");
        }
        self.frames.push_back(frame);
        evicted
    }

    /// Most recently enqueued frame
    pub fn latest(&self) -> Option<&AdmittedFrame> {
        self.frames.back()
    }

    /// Remove every buffered frame, returning how many there were.
    pub fn clear(&mut self) -> usize {
        let count = self.frames.len();
        self.frames.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Buffered frames, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &AdmittedFrame> {
        self.frames.iter()
    }
}
