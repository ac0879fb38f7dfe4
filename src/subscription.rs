//! Async frame subscription backed by a bounded queue

use futures::Stream;
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use crate::pipeline::{BroadcastRegistry, Subscriber};
use crate::types::TransportFrame;

/// Removes the subscriber from its registry when dropped
struct Registration {
    registry: Weak<BroadcastRegistry>,
    subscriber: Subscriber,
}

impl Drop for Registration {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.unsubscribe(&self.subscriber);
            debug!("Frame subscription dropped");
        }
    }
}

pin_project! {
    /// Stream of transport frames for consumers that live on another task.
    ///
    /// Delivery never waits on the consumer: when the queue is full the
    /// frame is skipped for this subscription and counted in
    /// [`dropped_frames`](Self::dropped_frames). Dropping the stream
    /// unsubscribes it.
    pub struct FrameSubscription {
        // Declared before `frames` so the callback is gone before the receiver closes
        registration: Registration,
        #[pin]
        frames: ReceiverStream<TransportFrame>,
        dropped: Arc<AtomicU64>,
    }
}

impl FrameSubscription {
    /// Register a new subscription on `registry` holding up to `capacity`
    /// undelivered frames.
    pub fn new(registry: &Arc<BroadcastRegistry>, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let dropped = Arc::new(AtomicU64::new(0));

        let counter = Arc::clone(&dropped);
        let subscriber = Subscriber::named("frame subscription", move |frame| {
            match tx.try_send(frame.clone()) {
                Ok(()) => Ok(()),
                Err(mpsc::error::TrySendError::Full(_)) => {
                    counter.fetch_add(1, Ordering::Relaxed);
                    Ok(())
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    Err("frame subscription receiver closed".into())
                }
            }
        });
        registry.subscribe(subscriber.clone());

        Self {
            registration: Registration { registry: Arc::downgrade(registry), subscriber },
            frames: ReceiverStream::new(rx),
            dropped,
        }
    }

    /// Frames skipped because this subscription's queue was full
    pub fn dropped_frames(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// The subscriber registered on behalf of this stream
    pub fn subscriber(&self) -> &Subscriber {
        &self.registration.subscriber
    }
}

impl Stream for FrameSubscription {
    type Item = TransportFrame;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.project().frames.poll_next(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.frames.size_hint()
    }
}
