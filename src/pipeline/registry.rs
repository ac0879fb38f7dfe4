//! Subscriber registry and frame fan-out

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, trace};

use crate::error::SubscriberError;
use crate::logging::ObservabilitySink;
use crate::types::TransportFrame;
use crate::StreamError;

/// Callback signature for frame subscribers
pub type FrameCallback =
    dyn Fn(&TransportFrame) -> std::result::Result<(), SubscriberError> + Send + Sync;

/// Handle to a registered frame callback.
///
/// Identity is the callback allocation: clones of a `Subscriber` are the same
/// subscriber, while two `Subscriber::new` calls with equal closures are not.
#[derive(Clone)]
pub struct Subscriber {
    name: Arc<str>,
    callback: Arc<FrameCallback>,
}

impl Subscriber {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&TransportFrame) -> std::result::Result<(), SubscriberError> + Send + Sync + 'static,
    {
        Self::named("subscriber", callback)
    }

    /// Create a subscriber with a name used in failure reports
    pub fn named<F>(name: impl Into<Arc<str>>, callback: F) -> Self
    where
        F: Fn(&TransportFrame) -> std::result::Result<(), SubscriberError> + Send + Sync + 'static,
    {
        Self { name: name.into(), callback: Arc::new(callback) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether `other` refers to the same callback
    pub fn same_as(&self, other: &Subscriber) -> bool {
        Arc::ptr_eq(&self.callback, &other.callback)
    }

    fn call(&self, frame: &TransportFrame) -> std::result::Result<(), StreamError> {
        match catch_unwind(AssertUnwindSafe(|| (self.callback)(frame))) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(StreamError::subscriber_failed(self.name.to_string(), Some(err))),
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "panic with non-string payload".to_string());
                Err(StreamError::subscriber_failed(
                    format!("{} panicked: {}", self.name, message),
                    None,
                ))
            }
        }
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Result of delivering one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Ordered set of subscribers.
///
/// Registering the same subscriber twice delivers every frame to it twice.
/// Delivery iterates a snapshot taken when it starts, so subscribers added
/// or removed from inside a callback only affect later frames.
#[derive(Default)]
pub struct BroadcastRegistry {
    subscribers: Mutex<Vec<Subscriber>>,
}

impl BroadcastRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Subscriber>> {
        // Callbacks never run under this lock, so a poisoned list is still consistent
        self.subscribers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append a subscriber
    pub fn subscribe(&self, subscriber: Subscriber) {
        let mut subscribers = self.lock();
        subscribers.push(subscriber);
        debug!(count = subscribers.len(), "Subscriber added");
    }

    /// Remove the first registration of `subscriber`.
    ///
    /// Returns whether anything was removed.
    pub fn unsubscribe(&self, subscriber: &Subscriber) -> bool {
        let mut subscribers = self.lock();
        match subscribers.iter().position(|s| s.same_as(subscriber)) {
            Some(index) => {
                subscribers.remove(index);
                debug!(count = subscribers.len(), "Subscriber removed");
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Remove every subscriber
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Point-in-time copy of the subscriber list
    pub fn snapshot(&self) -> Vec<Subscriber> {
        self.lock().clone()
    }

    /// Invoke every current subscriber with `frame`, in subscription order.
    ///
    /// Failures (returned errors and panics) are reported to `sink` and do
    /// not stop delivery to the remaining subscribers.
    pub fn deliver(&self, frame: &TransportFrame, sink: &dyn ObservabilitySink) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        for subscriber in self.snapshot() {
            match subscriber.call(frame) {
                Ok(()) => report.delivered += 1,
                Err(err) => {
                    report.failed += 1;
                    sink.report("Error in video stream callback", Some(&err));
                }
            }
        }
        trace!(
            sequence_number = frame.sequence_number,
            delivered = report.delivered,
            failed = report.failed,
            "Frame delivered"
        );
        report
    }
}

impl fmt::Debug for BroadcastRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BroadcastRegistry").field("subscribers", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{RecordingSink, recording_subscriber};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn frame(sequence_number: u64) -> TransportFrame {
        TransportFrame { encoded_chunk: "AA==".to_string(), timestamp: 0, sequence_number }
    }

    #[test]
    fn delivers_in_subscription_order() {
        let registry = BroadcastRegistry::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for name in ["a", "b", "c"] {
            let order = Arc::clone(&order);
            registry.subscribe(Subscriber::named(name, move |_| {
                order.lock().unwrap().push(name);
                Ok(())
            }));
        }

        let report = registry.deliver(&frame(0), &RecordingSink::new());
        assert_eq!(report, DeliveryReport { delivered: 3, failed: 0 });
        assert_eq!(*order.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn failing_subscriber_does_not_block_others() {
        let registry = BroadcastRegistry::new();
        let sink = RecordingSink::new();
        registry.subscribe(Subscriber::named("broken", |_| Err("boom".into())));
        let (good, frames) = recording_subscriber();
        registry.subscribe(good);

        let report = registry.deliver(&frame(1), &sink);

        assert_eq!(report, DeliveryReport { delivered: 1, failed: 1 });
        assert_eq!(frames.lock().unwrap().len(), 1);
        let reports = sink.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].message, "Error in video stream callback");
        assert!(reports[0].error.as_deref().is_some_and(|e| e.contains("broken") && e.contains("boom")));
    }

    #[test]
    fn panicking_subscriber_is_isolated() {
        let registry = BroadcastRegistry::new();
        let sink = RecordingSink::new();
        registry.subscribe(Subscriber::named("panicky", |_| panic!("kaboom")));
        let (good, frames) = recording_subscriber();
        registry.subscribe(good);

        let report = registry.deliver(&frame(2), &sink);

        assert_eq!(report.failed, 1);
        assert_eq!(frames.lock().unwrap().len(), 1);
        assert!(sink.errors()[0].contains("kaboom"));
    }

    #[test]
    fn double_registration_delivers_twice() {
        let registry = BroadcastRegistry::new();
        let (subscriber, frames) = recording_subscriber();
        registry.subscribe(subscriber.clone());
        registry.subscribe(subscriber.clone());

        registry.deliver(&frame(3), &RecordingSink::new());
        assert_eq!(frames.lock().unwrap().len(), 2);

        // Removes one registration at a time
        assert!(registry.unsubscribe(&subscriber));
        assert_eq!(registry.len(), 1);
        assert!(registry.unsubscribe(&subscriber));
        assert!(!registry.unsubscribe(&subscriber));
        assert!(registry.is_empty());
    }

    #[test]
    fn identical_closures_are_distinct_subscribers() {
        let registry = BroadcastRegistry::new();
        let first = Subscriber::new(|_| Ok(()));
        let second = Subscriber::new(|_| Ok(()));
        registry.subscribe(first.clone());

        assert!(!registry.unsubscribe(&second));
        assert!(registry.unsubscribe(&first));
    }

    #[test]
    fn membership_changes_during_delivery_apply_to_next_frame() {
        let registry = Arc::new(BroadcastRegistry::new());
        let late_calls = Arc::new(AtomicUsize::new(0));

        let late = {
            let late_calls = Arc::clone(&late_calls);
            Subscriber::named("late", move |_| {
                late_calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        };

        let adder = {
            let registry = Arc::downgrade(&registry);
            let late = late.clone();
            Subscriber::named("adder", move |_| {
                if let Some(registry) = registry.upgrade() {
                    registry.subscribe(late.clone());
                }
                Ok(())
            })
        };
        registry.subscribe(adder.clone());

        registry.deliver(&frame(0), &RecordingSink::new());
        assert_eq!(late_calls.load(Ordering::SeqCst), 0);

        registry.unsubscribe(&adder);
        registry.deliver(&frame(1), &RecordingSink::new());
        assert_eq!(late_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_during_delivery_does_not_skip_others() {
        let registry = Arc::new(BroadcastRegistry::new());
        let (tail, frames) = recording_subscriber();

        let quitter = Arc::new(Mutex::new(None::<Subscriber>));
        let this = {
            let registry = Arc::downgrade(&registry);
            let quitter = Arc::clone(&quitter);
            Subscriber::named("quitter", move |_| {
                if let (Some(registry), Some(me)) = (registry.upgrade(), quitter.lock().unwrap().clone()) {
                    registry.unsubscribe(&me);
                }
                Ok(())
            })
        };
        *quitter.lock().unwrap() = Some(this.clone());

        registry.subscribe(this);
        registry.subscribe(tail);

        registry.deliver(&frame(0), &RecordingSink::new());
        assert_eq!(frames.lock().unwrap().len(), 1);
        assert_eq!(registry.len(), 1);
    }
}
