//! Subscriber registry and fan-out.
//!
//! Every subscriber owns an unbounded channel. Publishing only pushes onto
//! those channels while holding the registry lock, which keeps one global
//! order without ever waiting on a consumer. Callbacks run on their own tokio
//! task, outside every service lock.

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use chrono::Utc;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::update::{Update, UpdatePayload, UpdatePriority};
use crate::metrics;

#[derive(Debug, Default)]
struct Registry {
    next_id: u64,
    next_sequence: u64,
    senders: BTreeMap<u64, UnboundedSender<Arc<Update>>>,
}

#[derive(Debug)]
pub(crate) struct Subscribers {
    registry: Arc<Mutex<Registry>>,
    failures: Arc<AtomicU64>,
    runtime: Handle,
}

impl Subscribers {
    pub(crate) fn new(runtime: Handle) -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry::default())),
            failures: Arc::new(AtomicU64::new(0)),
            runtime,
        }
    }

    fn register(&self) -> (Subscription, UnboundedReceiver<Arc<Update>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut registry = self.registry.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.senders.insert(id, tx);
        let subscription = Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        };
        (subscription, rx)
    }

    pub(crate) fn subscribe_channel(&self) -> (Subscription, UnboundedReceiver<Arc<Update>>) {
        self.register()
    }

    pub(crate) fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Update) + Send + 'static,
    {
        let (subscription, mut rx) = self.register();
        let id = subscription.id;
        let failures = Arc::clone(&self.failures);

        self.runtime.spawn(async move {
            while let Some(update) = rx.recv().await {
                let delivered = catch_unwind(AssertUnwindSafe(|| callback(update.as_ref())));
                if delivered.is_err() {
                    failures.fetch_add(1, Ordering::Relaxed);
                    metrics::record_subscriber_failure();
                    tracing::warn!(
                        subscriber = id,
                        sequence = update.sequence,
                        kind = %update.kind(),
                        "subscriber callback panicked; continuing delivery"
                    );
                }
            }
            tracing::debug!(subscriber = id, "subscriber delivery task finished");
        });

        subscription
    }

    /// Stamp and fan out an update. Subscribers whose receiver is gone are
    /// dropped from the registry.
    pub(crate) fn publish(
        &self,
        priority: UpdatePriority,
        action_required: bool,
        payload: UpdatePayload,
    ) -> Arc<Update> {
        let mut registry = self.registry.lock();
        let update = Arc::new(Update {
            sequence: registry.next_sequence,
            timestamp: Utc::now(),
            priority,
            action_required,
            payload,
        });
        registry.next_sequence += 1;
        registry
            .senders
            .retain(|_, tx| tx.send(Arc::clone(&update)).is_ok());
        update
    }

    pub(crate) fn count(&self) -> usize {
        self.registry.lock().senders.len()
    }

    pub(crate) fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Release every registration. Delivery tasks drain what is already
    /// queued and then exit.
    pub(crate) fn clear(&self) -> usize {
        let mut registry = self.registry.lock();
        let count = registry.senders.len();
        registry.senders.clear();
        count
    }
}

/// Handle to one registration.
///
/// Dropping the handle keeps the subscription alive; call
/// [`Subscription::unsubscribe`] to end it.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Remove this registration. Returns `false` when it was already gone,
    /// e.g. because the service was stopped.
    pub fn unsubscribe(self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.lock().senders.remove(&self.id).is_some(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::realtime::update::RouteUpdate;

    fn cleared(removed: usize) -> UpdatePayload {
        UpdatePayload::Route(RouteUpdate::CacheCleared { removed })
    }

    #[tokio::test]
    async fn sequences_are_assigned_in_publish_order() {
        let subs = Subscribers::new(Handle::current());
        let (_sub, mut rx) = subs.subscribe_channel();
        for n in 0..3 {
            subs.publish(UpdatePriority::Low, false, cleared(n));
        }
        for expected in 0..3 {
            assert_eq!(rx.recv().await.unwrap().sequence, expected);
        }
    }

    #[tokio::test]
    async fn unsubscribe_removes_only_its_own_registration() {
        let subs = Subscribers::new(Handle::current());
        let (first, _rx1) = subs.subscribe_channel();
        let (second, mut rx2) = subs.subscribe_channel();
        assert_eq!(subs.count(), 2);

        assert!(first.unsubscribe());
        assert_eq!(subs.count(), 1);
        subs.publish(UpdatePriority::Low, false, cleared(0));
        assert!(rx2.recv().await.is_some());

        assert!(second.unsubscribe());
        assert_eq!(subs.count(), 0);
    }

    #[tokio::test]
    async fn unsubscribe_after_clear_reports_false() {
        let subs = Subscribers::new(Handle::current());
        let (sub, _rx) = subs.subscribe_channel();
        assert_eq!(subs.clear(), 1);
        assert!(!sub.unsubscribe());
    }

    #[tokio::test]
    async fn dropped_receivers_are_pruned_on_publish() {
        let subs = Subscribers::new(Handle::current());
        let (_sub, rx) = subs.subscribe_channel();
        drop(rx);
        subs.publish(UpdatePriority::Low, false, cleared(0));
        assert_eq!(subs.count(), 0);
    }

    #[tokio::test]
    async fn panicking_callback_is_isolated_and_counted() {
        let subs = Subscribers::new(Handle::current());
        let _bad = subs.subscribe(|_update| panic!("subscriber bug"));
        let (_good, mut rx) = subs.subscribe_channel();

        subs.publish(UpdatePriority::Low, false, cleared(1));
        subs.publish(UpdatePriority::Low, false, cleared(2));

        assert_eq!(rx.recv().await.unwrap().sequence, 0);
        assert_eq!(rx.recv().await.unwrap().sequence, 1);

        tokio::time::timeout(Duration::from_secs(5), async {
            while subs.failures() < 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("both panics should be counted");
        assert_eq!(subs.count(), 2);
    }
}
