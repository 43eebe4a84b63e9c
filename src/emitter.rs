//! Convenience surfaces over the registry: an embeddable [`Emitter`] and a
//! single-channel [`Event`].

use crate::error::Result;
use crate::subscriptions::{Listener, Registry, Selector, Subscribable};
use crate::types::{Channel, SubscriptionId};
use serde_json::Value;
use std::sync::Arc;

/// Channel used by [`Event`].
pub const EVENT_CHANNEL: &str = "ev";

/// Event capability for a host type.
///
/// Embed an `Emitter` in a struct to give it `on`/`off`/`emit` style methods.
/// Every method forwards to the registry with this emitter's target.
#[derive(Clone, Debug)]
pub struct Emitter {
    target: Subscribable,
    registry: Arc<Registry>,
}

impl Emitter {
    /// Emitter with a fresh target, dispatching through `registry`.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self::with_target(Subscribable::new(), registry)
    }

    /// Emitter over an existing target.
    ///
    /// Several emitters may wrap one target with different registries; each
    /// only sees the subscriptions made through its own registry.
    pub fn with_target(target: Subscribable, registry: Arc<Registry>) -> Self {
        Self { target, registry }
    }

    /// Emitter backed by [`Registry::global`].
    pub fn global() -> Self {
        Self::new(Registry::global())
    }

    /// The target handed to listeners.
    pub fn target(&self) -> &Subscribable {
        &self.target
    }

    /// Registry this emitter subscribes and dispatches through.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Subscribe `listener` to `channel`. See [`Registry::subscribe`].
    pub fn add_listener(
        &self,
        channel: impl Into<Channel>,
        listener: Listener,
        meta: Value,
    ) -> SubscriptionId {
        self.registry.subscribe(&self.target, channel, listener, meta)
    }

    /// Alias of [`add_listener`](Self::add_listener).
    pub fn add_event_listener(
        &self,
        channel: impl Into<Channel>,
        listener: Listener,
        meta: Value,
    ) -> SubscriptionId {
        self.add_listener(channel, listener, meta)
    }

    /// Alias of [`add_listener`](Self::add_listener).
    pub fn on(&self, channel: impl Into<Channel>, listener: Listener, meta: Value) -> SubscriptionId {
        self.add_listener(channel, listener, meta)
    }

    /// Subscribe for a single invocation.
    pub fn once(
        &self,
        channel: impl Into<Channel>,
        listener: Listener,
        meta: Value,
    ) -> SubscriptionId {
        self.registry
            .subscribe_once(&self.target, channel, listener, meta)
    }

    /// Remove a subscription from `channel` by listener or id. Returns
    /// whether one was removed.
    pub fn remove_listener(&self, channel: impl Into<Channel>, selector: impl Into<Selector>) -> bool {
        self.registry
            .unsubscribe_by_target(&self.target, channel, selector)
    }

    /// Alias of [`remove_listener`](Self::remove_listener).
    pub fn remove_event_listener(
        &self,
        channel: impl Into<Channel>,
        selector: impl Into<Selector>,
    ) -> bool {
        self.remove_listener(channel, selector)
    }

    /// Alias of [`remove_listener`](Self::remove_listener).
    pub fn off(&self, channel: impl Into<Channel>, selector: impl Into<Selector>) -> bool {
        self.remove_listener(channel, selector)
    }

    /// Dispatch `args` on `channel`. Returns the number of listeners invoked.
    pub fn emit(&self, channel: impl Into<Channel>, args: &Value) -> Result<usize> {
        self.registry.dispatch(&self.target, channel, args)
    }

    /// Alias of [`emit`](Self::emit).
    pub fn dispatch_event(&self, channel: impl Into<Channel>, args: &Value) -> Result<usize> {
        self.emit(channel, args)
    }

    /// Live subscriptions on `channel`, across every registry.
    pub fn listener_count(&self, channel: impl Into<Channel>) -> usize {
        self.target.listener_count(channel)
    }
}

/// A standalone event: one target with a single fixed channel.
#[derive(Clone, Debug)]
pub struct Event {
    emitter: Emitter,
}

impl Event {
    /// Event with its own target, dispatching through `registry`.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            emitter: Emitter::new(registry),
        }
    }

    /// Event backed by [`Registry::global`].
    pub fn global() -> Self {
        Self::new(Registry::global())
    }

    /// Fire the event.
    pub fn call(&self, args: &Value) -> Result<usize> {
        self.emitter.emit(EVENT_CHANNEL, args)
    }

    /// Subscribe to the event.
    pub fn add(&self, listener: Listener, meta: Value) -> SubscriptionId {
        self.emitter.add_listener(EVENT_CHANNEL, listener, meta)
    }

    /// Remove a subscription by listener or id.
    pub fn remove(&self, selector: impl Into<Selector>) -> bool {
        self.emitter.remove_listener(EVENT_CHANNEL, selector)
    }

    /// Live subscriptions on the event.
    pub fn listener_count(&self) -> usize {
        self.emitter.listener_count(EVENT_CHANNEL)
    }

    /// The target listeners receive when this event fires.
    pub fn target(&self) -> &Subscribable {
        self.emitter.target()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    #[test]
    fn test_aliases_share_one_channel_map() {
        let emitter = Emitter::new(Arc::new(Registry::new()));
        let hits = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&hits);
        let listener = Listener::new(move |_, _, _| {
            *counter.lock() += 1;
            Ok(())
        });

        emitter.add_listener("x", listener.clone(), Value::Null);
        emitter.add_event_listener("x", listener.clone(), Value::Null);
        emitter.on("x", listener.clone(), Value::Null);
        assert_eq!(emitter.dispatch_event("x", &Value::Null).unwrap(), 3);

        assert!(emitter.remove_event_listener("x", &listener));
        assert!(emitter.off("x", &listener));
        assert_eq!(emitter.emit("x", &Value::Null).unwrap(), 1);
        assert_eq!(*hits.lock(), 4);
    }

    #[test]
    fn test_global_emitters_share_registry() {
        let a = Emitter::global();
        let b = Event::global();
        assert!(Arc::ptr_eq(a.registry(), &Registry::global()));

        let id = a.once(1, Listener::new(|_, _, _| Ok(())), Value::Null);
        assert!(a.target().has_listeners(1));
        assert!(Registry::global().contains(id));
        assert_eq!(b.listener_count(), 0);

        assert_eq!(a.emit(1, &Value::Null).unwrap(), 1);
        assert!(!a.target().has_listeners(1));
        assert!(!Registry::global().contains(id));
    }

    #[test]
    fn test_with_target_wraps_existing_target() {
        let target = Subscribable::new();
        let first = Emitter::with_target(target.clone(), Arc::new(Registry::new()));
        let second = Emitter::with_target(target.clone(), Arc::new(Registry::new()));

        first.on("x", Listener::new(|_, _, _| Ok(())), Value::Null);
        assert_eq!(second.target(), &target);
        assert_eq!(second.listener_count("x"), 1);
        assert_eq!(second.emit("x", &Value::Null).unwrap(), 0);
        assert_eq!(first.emit("x", &Value::Null).unwrap(), 1);
    }

    #[test]
    fn test_event_fixed_channel() {
        let registry = Arc::new(Registry::new());
        let event = Event::new(Arc::clone(&registry));
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);

        let id = event.add(
            Listener::new(move |_, args, meta| {
                sink.lock().push((args.clone(), meta.clone()));
                Ok(())
            }),
            json!("tag"),
        );
        assert_eq!(event.target().listener_count(EVENT_CHANNEL), 1);

        event.call(&json!(5)).unwrap();
        assert!(event.remove(id));
        event.call(&json!(6)).unwrap();

        assert_eq!(*received.lock(), vec![(json!(5), json!("tag"))]);
        assert_eq!(event.listener_count(), 0);
        assert_eq!(registry.subscription_count(), 0);
    }
}
