//! Subscription types shared by the registry and its targets.

use crate::error::ListenerResult;
use crate::types::{Channel, SubscriptionId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Weak};

use super::registry::RegistryState;
use super::target::{ChannelMap, Subscribable};

/// Configuration for a [`Registry`](super::Registry).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// What dispatch does when a listener returns an error.
    /// Default: `FailFast`
    #[serde(default)]
    pub error_policy: ErrorPolicy,
}

/// How dispatch reacts to a failing listener.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Abort the pass and return the first error. Later listeners do not run.
    #[default]
    FailFast,
    /// Run every listener, then report all failures together.
    Isolate,
}

type ListenerFn = dyn Fn(&Subscribable, &Value, &Value) -> ListenerResult + Send + Sync;

/// A callable invoked on dispatch with `(target, args, meta)`.
///
/// Clones share identity: removing by listener matches any subscription
/// registered with a clone of the same `Listener`.
#[derive(Clone)]
pub struct Listener(Arc<ListenerFn>);

impl Listener {
    /// Wrap a closure. Each call creates a listener with a new identity.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Subscribable, &Value, &Value) -> ListenerResult + Send + Sync + 'static,
    {
        Listener(Arc::new(f))
    }

    /// Whether both handles refer to the same underlying callable.
    pub fn same_as(&self, other: &Listener) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }

    pub(crate) fn call(&self, target: &Subscribable, args: &Value, meta: &Value) -> ListenerResult {
        (self.0)(target, args, meta)
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Listener({:p})", Arc::as_ptr(&self.0) as *const ())
    }
}

/// Selects a subscription on a known target and channel.
#[derive(Clone, Debug)]
pub enum Selector {
    /// First live subscription registered with this listener.
    Listener(Listener),
    /// The subscription with this id.
    Id(SubscriptionId),
}

impl From<Listener> for Selector {
    fn from(listener: Listener) -> Self {
        Selector::Listener(listener)
    }
}

impl From<&Listener> for Selector {
    fn from(listener: &Listener) -> Self {
        Selector::Listener(listener.clone())
    }
}

impl From<SubscriptionId> for Selector {
    fn from(id: SubscriptionId) -> Self {
        Selector::Id(id)
    }
}

/// Internal subscription record. Immutable once created.
pub(crate) struct Subscription {
    pub id: SubscriptionId,
    /// Registry that issued `id`. Ids are only unique per registry.
    pub registry: Weak<RegistryState>,
    /// Back-reference only; the registry never keeps a target alive.
    pub target: Weak<ChannelMap>,
    pub channel: Channel,
    pub listener: Listener,
    pub meta: Value,
    pub once: bool,
}

impl Subscription {
    pub fn owned_by(&self, registry: &Arc<RegistryState>) -> bool {
        std::ptr::eq(self.registry.as_ptr(), Arc::as_ptr(registry))
    }

    pub fn info(&self) -> SubscriptionInfo {
        SubscriptionInfo {
            id: self.id,
            channel: self.channel.clone(),
            once: self.once,
            meta: self.meta.clone(),
        }
    }
}

/// Snapshot of a live subscription, as reported by the registry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionInfo {
    pub id: SubscriptionId,
    pub channel: Channel,
    pub once: bool,
    pub meta: Value,
}
