//! Push-based frame source fed by a drone adapter
//!
//! The adapter calls [`FrameSender::push`] from its video callback; the
//! sender stamps each payload with the next sequence number and the capture
//! time before queueing it for the driver.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::clock::SharedClock;
use crate::source::FrameSource;
use crate::types::RawFrame;
use crate::{Result, StreamError};

enum SourceEvent {
    Frame(RawFrame),
    Error(StreamError),
    End,
}

struct SenderState {
    next_sequence: AtomicU64,
    enabled: AtomicBool,
    clock: SharedClock,
}

/// Producer half of a [`ChannelSource`].
///
/// Sequence numbers are owned here, not by the stream controller: they keep
/// increasing across stream activations and only restart on
/// [`reset_sequence`](Self::reset_sequence).
#[derive(Clone)]
pub struct FrameSender {
    tx: mpsc::Sender<SourceEvent>,
    state: Arc<SenderState>,
}

impl FrameSender {
    /// Queue a captured payload.
    ///
    /// Returns `false` if the sender is disabled, the queue is full or the
    /// source was dropped. A full queue still consumes a sequence number, so
    /// the loss shows up downstream as a gap.
    pub fn push(&self, payload: impl Into<Arc<[u8]>>) -> bool {
        if !self.is_enabled() {
            return false;
        }

        let sequence_number = self.state.next_sequence.fetch_add(1, Ordering::SeqCst);
        let frame = RawFrame::new(payload, sequence_number, self.state.clock.now_ms());

        match self.tx.try_send(SourceEvent::Frame(frame)) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(sequence_number, "Frame source queue full, frame lost");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Report a source error; the stream keeps going unless errors persist.
    pub fn error(&self, err: StreamError) -> bool {
        self.tx.try_send(SourceEvent::Error(err)).is_ok()
    }

    /// Signal end of stream.
    pub async fn end(&self) {
        let _ = self.tx.send(SourceEvent::End).await;
    }

    /// Gate pushes without closing the source.
    pub fn set_enabled(&self, enabled: bool) {
        self.state.enabled.store(enabled, Ordering::SeqCst);
        info!(enabled, "Video source gate changed");
    }

    pub fn is_enabled(&self) -> bool {
        self.state.enabled.load(Ordering::SeqCst)
    }

    /// Whether the consuming source has gone away
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Sequence number the next pushed frame will carry
    pub fn next_sequence(&self) -> u64 {
        self.state.next_sequence.load(Ordering::SeqCst)
    }

    /// Restart numbering at 0, for a fresh drone connection.
    ///
    /// While the stream stays active, frames numbered at or below the last
    /// delivered one are dropped, so reset between activations.
    pub fn reset_sequence(&self) {
        self.state.next_sequence.store(0, Ordering::SeqCst);
        debug!("Video sequence counter reset");
    }
}

/// Consumer half, handed to the stream driver.
///
/// The source ends on an explicit [`FrameSender::end`] or once every sender
/// has been dropped.
pub struct ChannelSource {
    rx: mpsc::Receiver<SourceEvent>,
    ended: bool,
}

impl ChannelSource {
    /// Create a connected sender/source pair holding at most `capacity`
    /// undelivered events.
    pub fn channel(clock: SharedClock, capacity: usize) -> (FrameSender, ChannelSource) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let state = Arc::new(SenderState {
            next_sequence: AtomicU64::new(0),
            enabled: AtomicBool::new(true),
            clock,
        });
        (FrameSender { tx, state }, ChannelSource { rx, ended: false })
    }
}

#[async_trait::async_trait]
impl FrameSource for ChannelSource {
    async fn next_frame(&mut self) -> Result<Option<RawFrame>> {
        if self.ended {
            return Ok(None);
        }
        match self.rx.recv().await {
            Some(SourceEvent::Frame(frame)) => Ok(Some(frame)),
            Some(SourceEvent::Error(err)) => Err(err),
            Some(SourceEvent::End) | None => {
                self.ended = true;
                self.rx.close();
                Ok(None)
            }
        }
    }

    fn name(&self) -> &str {
        "drone video channel"
    }
}
