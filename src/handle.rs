//! Async handle to a running stream driver

use futures::Stream;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::driver::Command;
use crate::pipeline::{BroadcastRegistry, Subscriber};
use crate::subscription::FrameSubscription;
use crate::types::{BufferStatus, PerformanceMetrics, StreamState, TargetFrameRate};
use crate::{Result, StreamError};

/// Lifecycle notifications published by the driver
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// The stream was started or stopped
    StateChanged(StreamState),
    /// The frame source reported end of stream; the stream is inactive
    SourceEnded,
    /// The frame source failed too many times in a row; the stream is inactive
    SourceFailed { reason: String },
}

/// Cloneable handle for controlling a stream from any task.
///
/// Control calls are queued to the driver task and resolve once it has
/// applied them. The driver shuts down when [`shutdown`](Self::shutdown) is
/// called or the last handle is dropped.
#[derive(Clone)]
pub struct StreamHandle {
    commands: mpsc::Sender<Command>,
    registry: Arc<BroadcastRegistry>,
    events: watch::Receiver<StreamEvent>,
    cancel: CancellationToken,
    subscription_queue: usize,
}

impl StreamHandle {
    pub(crate) fn new(
        commands: mpsc::Sender<Command>,
        registry: Arc<BroadcastRegistry>,
        events: watch::Receiver<StreamEvent>,
        cancel: CancellationToken,
        subscription_queue: usize,
    ) -> Self {
        Self { commands, registry, events, cancel, subscription_queue }
    }

    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(command(reply_tx))
            .await
            .map_err(|_| StreamError::channel_closed("command queue closed"))?;
        Ok(reply_rx.await?)
    }

    /// Begin an activation.
    pub async fn start(&self) -> Result<()> {
        self.request(Command::Start).await
    }

    /// End the activation and discard buffered frames.
    pub async fn stop(&self) -> Result<()> {
        self.request(Command::Stop).await
    }

    pub async fn clear_buffer(&self) -> Result<()> {
        self.request(Command::ClearBuffer).await
    }

    /// Change the target rate. Returns the rate actually applied after clamping.
    pub async fn set_target_frame_rate(&self, fps: u32) -> Result<TargetFrameRate> {
        self.request(|reply| Command::SetTargetFrameRate(fps, reply)).await
    }

    pub async fn status(&self) -> Result<BufferStatus> {
        self.request(Command::Status).await
    }

    pub async fn metrics(&self) -> Result<PerformanceMetrics> {
        self.request(Command::Metrics).await
    }

    /// Register a callback subscriber.
    ///
    /// Callbacks run on the driver task, so they should hand work off
    /// rather than block. [`subscribe_stream`](Self::subscribe_stream) does
    /// that for you.
    pub fn subscribe(&self, subscriber: Subscriber) {
        self.registry.subscribe(subscriber);
    }

    pub fn unsubscribe(&self, subscriber: &Subscriber) -> bool {
        self.registry.unsubscribe(subscriber)
    }

    /// Subscribe through a bounded queue, consumed as a `Stream`.
    pub fn subscribe_stream(&self) -> FrameSubscription {
        FrameSubscription::new(&self.registry, self.subscription_queue)
    }

    /// Shared subscriber registry
    pub fn registry(&self) -> &Arc<BroadcastRegistry> {
        &self.registry
    }

    /// Lifecycle events, starting with the most recent one.
    pub fn events(&self) -> impl Stream<Item = StreamEvent> + 'static {
        WatchStream::new(self.events.clone())
    }

    pub fn current_event(&self) -> StreamEvent {
        self.events.borrow().clone()
    }

    /// Wait until the latest event matches `predicate`.
    pub async fn wait_for_event(
        &self,
        mut predicate: impl FnMut(&StreamEvent) -> bool,
    ) -> Result<StreamEvent> {
        let mut events = self.events.clone();
        let event = events
            .wait_for(|event| predicate(event))
            .await
            .map_err(|_| StreamError::channel_closed("driver stopped publishing events"))?
            .clone();
        Ok(event)
    }

    /// Stop the driver task. Pending and later control calls fail with
    /// [`StreamError::ChannelClosed`].
    pub fn shutdown(&self) {
        debug!("Stream shutdown requested");
        self.cancel.cancel();
    }

    /// Whether the driver task has gone away
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}
