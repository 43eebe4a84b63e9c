//! Event-capable targets.

use crate::types::{Channel, SubscriptionId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use super::registry::RegistryState;
use super::slots::SlotList;
use super::types::{Listener, Subscription};

/// Per-target storage: channel key to ordered slot list.
///
/// Slot lists are created lazily on first subscribe.
#[derive(Default)]
pub(crate) struct ChannelMap {
    channels: Mutex<HashMap<Channel, SlotList>>,
}

impl ChannelMap {
    pub fn push(&self, channel: &Channel, sub: Arc<Subscription>) {
        self.channels
            .lock()
            .entry(channel.clone())
            .or_default()
            .push(sub);
    }

    pub fn remove_id(
        &self,
        owner: &Arc<RegistryState>,
        channel: &Channel,
        id: SubscriptionId,
    ) -> Option<Arc<Subscription>> {
        self.channels.lock().get_mut(channel)?.remove_id(owner, id)
    }

    pub fn remove_listener(
        &self,
        owner: &Arc<RegistryState>,
        channel: &Channel,
        listener: &Listener,
    ) -> Option<Arc<Subscription>> {
        self.channels
            .lock()
            .get_mut(channel)?
            .remove_listener(owner, listener)
    }

    /// Returns `None` when the channel has never been subscribed to.
    pub fn begin_pass(&self, channel: &Channel) -> Option<usize> {
        Some(self.channels.lock().get_mut(channel)?.begin_pass())
    }

    pub fn claim(
        &self,
        owner: &Arc<RegistryState>,
        channel: &Channel,
        index: usize,
    ) -> Option<Arc<Subscription>> {
        self.channels.lock().get_mut(channel)?.claim(owner, index)
    }

    pub fn end_pass(&self, channel: &Channel, completed: bool) -> usize {
        self.channels
            .lock()
            .get_mut(channel)
            .map_or(0, |list| list.end_pass(completed))
    }
}

impl Drop for ChannelMap {
    /// Remove this target's live subscriptions from the registries that issued them.
    fn drop(&mut self) {
        let live: Vec<_> = self
            .channels
            .get_mut()
            .values_mut()
            .flat_map(SlotList::drain_live)
            .collect();

        for sub in live {
            if let Some(registry) = sub.registry.upgrade() {
                registry.forget(sub.id);
            }
        }
    }
}

/// A value that can own event channels.
///
/// Cloning yields another handle to the same target; equality is identity.
/// Embed it in a host type (or use [`Emitter`](crate::Emitter)) to give that
/// type event capability.
#[derive(Clone, Default)]
pub struct Subscribable {
    pub(crate) inner: Arc<ChannelMap>,
}

impl Subscribable {
    /// A fresh target with no channels.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live subscriptions on `channel`.
    pub fn listener_count(&self, channel: impl Into<Channel>) -> usize {
        self.inner
            .channels
            .lock()
            .get(&channel.into())
            .map_or(0, SlotList::live_count)
    }

    /// Whether `channel` has any live subscription.
    pub fn has_listeners(&self, channel: impl Into<Channel>) -> bool {
        self.listener_count(channel) > 0
    }

    /// Channels that currently have at least one live subscription.
    pub fn channels(&self) -> Vec<Channel> {
        self.inner
            .channels
            .lock()
            .iter()
            .filter(|(_, list)| list.live_count() > 0)
            .map(|(channel, _)| channel.clone())
            .collect()
    }

    pub(crate) fn downgrade(&self) -> Weak<ChannelMap> {
        Arc::downgrade(&self.inner)
    }
}

impl PartialEq for Subscribable {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Subscribable {}

impl fmt::Debug for Subscribable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Subscribable({:p})", Arc::as_ptr(&self.inner))
    }
}
