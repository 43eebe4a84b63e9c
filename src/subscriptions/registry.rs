//! Subscription registry and synchronous dispatcher.

use crate::error::{EventError, ListenerFailure, Result};
use crate::types::{Channel, SubscriptionId};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};
use tracing::{debug, trace, warn};

use super::target::{ChannelMap, Subscribable};
use super::types::{
    ErrorPolicy, Listener, RegistryConfig, Selector, Subscription, SubscriptionInfo,
};

static GLOBAL_REGISTRY: LazyLock<Arc<Registry>> = LazyLock::new(|| Arc::new(Registry::new()));

/// Id map shared between a registry and the subscriptions it issued.
///
/// Subscriptions hold it weakly, so a dropped target can clear its records
/// and slot operations can tell which registry a slot belongs to.
#[derive(Default)]
pub(crate) struct RegistryState {
    subscriptions: RwLock<HashMap<SubscriptionId, Arc<Subscription>>>,
}

impl RegistryState {
    /// Remove the record for `id`. The record is handed back so it is dropped
    /// outside the lock: dropping a listener may drop other targets.
    pub fn forget(&self, id: SubscriptionId) -> Option<Arc<Subscription>> {
        self.subscriptions.write().remove(&id)
    }
}

/// Owns subscription ids and dispatches channel events to listeners.
///
/// Listeners run on the caller's thread with no registry lock held, so a
/// listener may subscribe, unsubscribe or dispatch re-entrantly.
///
/// Several registries may share one target. Each one only sees, removes and
/// dispatches the subscriptions it issued.
pub struct Registry {
    /// Live subscriptions by ID.
    state: Arc<RegistryState>,
    /// Counter for generating subscription IDs.
    next_id: AtomicU64,
    config: RegistryConfig,
}

impl Registry {
    /// Create a new registry with default configuration.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a new registry with the given configuration.
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            state: Arc::new(RegistryState::default()),
            next_id: AtomicU64::new(0),
            config,
        }
    }

    /// Process-wide registry, created on first use and never torn down.
    pub fn global() -> Arc<Registry> {
        Arc::clone(&GLOBAL_REGISTRY)
    }

    /// Configuration this registry was created with.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // --- Subscribing ---

    /// Append `listener` to `target`'s `channel`. `meta` is handed back to the
    /// listener on every invocation.
    pub fn subscribe(
        &self,
        target: &Subscribable,
        channel: impl Into<Channel>,
        listener: Listener,
        meta: Value,
    ) -> SubscriptionId {
        self.subscribe_with(target, channel, listener, meta, false)
    }

    /// Like [`subscribe`](Self::subscribe), but the subscription is removed
    /// right before its first invocation.
    pub fn subscribe_once(
        &self,
        target: &Subscribable,
        channel: impl Into<Channel>,
        listener: Listener,
        meta: Value,
    ) -> SubscriptionId {
        self.subscribe_with(target, channel, listener, meta, true)
    }

    /// Subscribe with an explicit one-shot flag.
    pub fn subscribe_with(
        &self,
        target: &Subscribable,
        channel: impl Into<Channel>,
        listener: Listener,
        meta: Value,
        once: bool,
    ) -> SubscriptionId {
        let channel = channel.into();
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));

        let subscription = Arc::new(Subscription {
            id,
            registry: Arc::downgrade(&self.state),
            target: target.downgrade(),
            channel: channel.clone(),
            listener,
            meta,
            once,
        });

        // Registry first: a concurrent pass may claim a one-shot as soon as
        // it is in the slot list, and must find it here to forget it.
        self.state
            .subscriptions
            .write()
            .insert(id, Arc::clone(&subscription));
        target.inner.push(&channel, subscription);

        debug!(%id, %channel, once, "subscribed");
        id
    }

    // --- Unsubscribing ---

    /// Remove a subscription knowing only its id.
    ///
    /// Returns `false` for unknown ids, including one-shots that already fired
    /// and ids removed earlier.
    pub fn unsubscribe_by_id(&self, id: SubscriptionId) -> bool {
        let Some(subscription) = self.state.subscriptions.read().get(&id).cloned() else {
            return false;
        };

        match subscription.target.upgrade() {
            // Whoever tombstones the slot owns the removal.
            Some(map) => {
                if map
                    .remove_id(&self.state, &subscription.channel, id)
                    .is_none()
                {
                    return false;
                }
            }
            // Target is mid-drop; its own cleanup races with this one.
            None => {
                if self.state.forget(id).is_none() {
                    return false;
                }
                debug!(%id, "unsubscribed from dropped target");
                return true;
            }
        }

        self.forget(&subscription);
        true
    }

    /// Remove a subscription on a known target and channel.
    ///
    /// A listener selector removes the first live subscription made with that
    /// listener; an id selector removes that subscription only if it lives on
    /// this target and channel. Subscriptions issued by other registries are
    /// never matched.
    pub fn unsubscribe_by_target(
        &self,
        target: &Subscribable,
        channel: impl Into<Channel>,
        selector: impl Into<Selector>,
    ) -> bool {
        let channel = channel.into();
        let removed = match selector.into() {
            Selector::Listener(listener) => {
                target
                    .inner
                    .remove_listener(&self.state, &channel, &listener)
            }
            Selector::Id(id) => target.inner.remove_id(&self.state, &channel, id),
        };

        match removed {
            Some(subscription) => {
                self.forget(&subscription);
                true
            }
            None => false,
        }
    }

    fn forget(&self, subscription: &Subscription) {
        self.state.forget(subscription.id);
        debug!(id = %subscription.id, channel = %subscription.channel, "unsubscribed");
    }

    // --- Dispatch ---

    /// Invoke every live listener this registry issued on `target`'s
    /// `channel`, in subscription order.
    ///
    /// Only slots present when the call starts are visited. Returns the number
    /// of listeners invoked; a channel with no subscriptions is a no-op.
    pub fn dispatch(
        &self,
        target: &Subscribable,
        channel: impl Into<Channel>,
        args: &Value,
    ) -> Result<usize> {
        let channel = channel.into();
        let Some(len) = target.inner.begin_pass(&channel) else {
            return Ok(0);
        };

        let mut pass = Pass {
            map: &target.inner,
            channel: &channel,
            completed: false,
        };
        let mut invoked = 0;
        let mut failures = Vec::new();

        for index in 0..len {
            let Some(subscription) = target.inner.claim(&self.state, &channel, index) else {
                continue;
            };
            if subscription.once {
                self.forget(&subscription);
            }

            invoked += 1;
            if let Err(error) = subscription
                .listener
                .call(target, args, &subscription.meta)
            {
                match self.config.error_policy {
                    ErrorPolicy::FailFast => {
                        return Err(EventError::Listener {
                            id: subscription.id,
                            channel: channel.clone(),
                            source: error,
                        });
                    }
                    ErrorPolicy::Isolate => {
                        warn!(id = %subscription.id, %channel, %error, "listener failed");
                        failures.push(ListenerFailure {
                            id: subscription.id,
                            error,
                        });
                    }
                }
            }
        }

        pass.completed = true;
        drop(pass);
        trace!(%channel, slots = len, invoked, "dispatched");

        if failures.is_empty() {
            Ok(invoked)
        } else {
            Err(EventError::ListenersFailed { channel, failures })
        }
    }

    // --- Introspection ---

    /// Number of live subscriptions this registry issued, across all targets.
    pub fn subscription_count(&self) -> usize {
        self.state.subscriptions.read().len()
    }

    /// Whether `id` is a live subscription of this registry.
    pub fn contains(&self, id: SubscriptionId) -> bool {
        self.state.subscriptions.read().contains_key(&id)
    }

    /// Channel, flags and metadata of a live subscription.
    pub fn subscription_info(&self, id: SubscriptionId) -> Option<SubscriptionInfo> {
        self.state.subscriptions.read().get(&id).map(|s| s.info())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Registry {
    /// Take this registry's slots off targets that outlive it.
    fn drop(&mut self) {
        let records: Vec<_> = self
            .state
            .subscriptions
            .write()
            .drain()
            .map(|(_, sub)| sub)
            .collect();

        for sub in &records {
            if let Some(map) = sub.target.upgrade() {
                map.remove_id(&self.state, &sub.channel, sub.id);
            }
        }
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("subscriptions", &self.subscription_count())
            .field("next_id", &self.next_id.load(Ordering::SeqCst))
            .field("config", &self.config)
            .finish()
    }
}

/// Ends a dispatch pass on drop, including when a listener error or panic
/// unwinds out of `dispatch`.
struct Pass<'a> {
    map: &'a ChannelMap,
    channel: &'a Channel,
    completed: bool,
}

impl Drop for Pass<'_> {
    fn drop(&mut self) {
        let compacted = self.map.end_pass(self.channel, self.completed);
        if compacted > 0 {
            trace!(channel = %self.channel, compacted, "compacted slot list");
        }
    }
}
