//! Behavior lifecycle hook
//!
//! Subscribes to the reconciler's lifecycle events and drives behavior
//! registration: register on creation, unregister on removal, and on a
//! recreate unregister the old object's behavior before registering the new
//! one. Hook failures are logged and never abort the surrounding update.
//!
//! In-place updates keep the existing registration; an evaluator on that
//! path receives the previous object and is expected to return it updated.

use std::sync::Arc;

use prism_event::{EventBus, SubscriberId};
use prism_state::NodeRef;
use prism_transform::Object;

use crate::events::{ObjectCreated, ObjectRemoved, ObjectUpdated, UpdateAction};

/// Event-bus subscriber tying behavior lifecycles to cell lifecycles
pub struct BehaviorTracker {
    bus: Arc<EventBus>,
    subscriptions: Vec<SubscriberId>,
}

impl BehaviorTracker {
    /// Subscribe to lifecycle events on the given bus
    pub fn attach(bus: Arc<EventBus>) -> Self {
        let mut subscriptions = Vec::new();

        subscriptions.push(bus.subscribe(|e: &ObjectCreated| {
            register(&e.object, &e.reference);
        }));

        subscriptions.push(bus.subscribe(|e: &ObjectRemoved| {
            if let Some(object) = &e.object {
                unregister(object, &e.reference);
            }
        }));

        subscriptions.push(bus.subscribe(|e: &ObjectUpdated| {
            if e.action != UpdateAction::Recreate {
                return;
            }
            if let Some(old) = &e.old {
                unregister(old, &e.reference);
            }
            if let Some(new) = &e.new {
                register(new, &e.reference);
            }
        }));

        Self {
            bus,
            subscriptions,
        }
    }

    /// Remove all subscriptions
    pub fn detach(self) {}
}

impl Drop for BehaviorTracker {
    fn drop(&mut self) {
        for id in self.subscriptions.drain(..) {
            self.bus.unsubscribe(id);
        }
    }
}

fn register(object: &Arc<Object>, reference: &NodeRef) {
    if let Some(behavior) = object.as_behavior() {
        if let Err(err) = behavior.register(reference) {
            log::warn!("behavior registration for {} failed: {}", reference, err);
        }
    }
}

fn unregister(object: &Arc<Object>, reference: &NodeRef) {
    if let Some(behavior) = object.as_behavior() {
        if let Err(err) = behavior.unregister() {
            log::warn!("behavior unregistration for {} failed: {}", reference, err);
        }
    }
}
