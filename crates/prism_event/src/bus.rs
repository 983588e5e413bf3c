//! Event bus
//!
//! One typed channel per event type. Publishing delivers to all current
//! subscribers, in subscription order, before returning; the reconciler
//! relies on this to interleave notifications with evaluation order.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

/// Trait for events
pub trait Event: Send + Sync + 'static {}

// Blanket implementation
impl<T: Send + Sync + 'static> Event for T {}

/// Unsubscribe handle returned by [`EventBus::subscribe`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(pub u64);

type DynHandler = Arc<dyn Fn(&dyn Any) + Send + Sync>;

/// Event bus for publishing and subscribing to typed events
pub struct EventBus {
    /// Typed handlers, in subscription order per event type
    handlers: RwLock<HashMap<TypeId, Vec<(SubscriberId, DynHandler)>>>,
    /// Next subscriber ID
    next_subscriber_id: AtomicU64,
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            next_subscriber_id: AtomicU64::new(1),
        }
    }

    /// Subscribe to an event type
    pub fn subscribe<E: Event, F>(&self, handler: F) -> SubscriberId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = SubscriberId(self.next_subscriber_id.fetch_add(1, Ordering::Relaxed));

        let wrapped: DynHandler = Arc::new(move |any: &dyn Any| {
            if let Some(event) = any.downcast_ref::<E>() {
                handler(event);
            }
        });

        self.handlers
            .write()
            .entry(TypeId::of::<E>())
            .or_default()
            .push((id, wrapped));

        id
    }

    /// Unsubscribe a handler
    pub fn unsubscribe(&self, id: SubscriberId) {
        for handlers in self.handlers.write().values_mut() {
            handlers.retain(|(sub_id, _)| *sub_id != id);
        }
    }

    /// Publish an event, delivering to all current subscribers before
    /// returning
    pub fn publish<E: Event>(&self, event: E) {
        // Handlers are cloned out so a subscriber may itself subscribe or
        // unsubscribe without deadlocking on the table lock.
        let handlers: Vec<DynHandler> = self
            .handlers
            .read()
            .get(&TypeId::of::<E>())
            .map(|hs| hs.iter().map(|(_, h)| h.clone()).collect())
            .unwrap_or_default();

        for handler in handlers {
            handler(&event);
        }
    }

    /// Number of subscribers for an event type
    pub fn subscriber_count<E: Event>(&self) -> usize {
        self.handlers
            .read()
            .get(&TypeId::of::<E>())
            .map(Vec::len)
            .unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct TestEvent(i32);

    #[test]
    fn test_publish_is_synchronous() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();

        bus.subscribe(move |e: &TestEvent| {
            seen_clone.lock().push(e.0);
        });

        bus.publish(TestEvent(42));
        assert_eq!(*seen.lock(), vec![42]);
    }

    #[test]
    fn test_subscription_order() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        let first = order.clone();
        let second = order.clone();

        bus.subscribe(move |_: &TestEvent| first.lock().push("first"));
        bus.subscribe(move |_: &TestEvent| second.lock().push("second"));

        bus.publish(TestEvent(0));
        assert_eq!(*order.lock(), vec!["first", "second"]);
    }

    #[test]
    fn test_unsubscribe() {
        let bus = EventBus::new();
        let count = Arc::new(Mutex::new(0));
        let count_clone = count.clone();

        let id = bus.subscribe(move |_: &TestEvent| *count_clone.lock() += 1);
        bus.publish(TestEvent(1));
        bus.unsubscribe(id);
        bus.publish(TestEvent(2));

        assert_eq!(*count.lock(), 1);
        assert_eq!(bus.subscriber_count::<TestEvent>(), 0);
    }

    #[test]
    fn test_typed_channels_are_independent() {
        struct Other(u8);

        let bus = EventBus::new();
        let count = Arc::new(Mutex::new(0));
        let count_clone = count.clone();

        bus.subscribe(move |_: &TestEvent| *count_clone.lock() += 1);
        bus.publish(Other(0));
        assert_eq!(*count.lock(), 0);
    }
}
