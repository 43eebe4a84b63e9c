//! Ordered slot list for one (target, channel) pair.

use std::sync::Arc;

use super::registry::RegistryState;
use super::types::{Listener, Subscription};
use crate::types::SubscriptionId;

/// One position in a channel's subscription sequence.
pub(crate) enum Slot {
    Live(Arc<Subscription>),
    /// Removed while a dispatch pass may still be indexing the list.
    Removed,
}

impl Slot {
    fn live(&self) -> Option<&Arc<Subscription>> {
        match self {
            Slot::Live(sub) => Some(sub),
            Slot::Removed => None,
        }
    }
}

/// Insertion-ordered slots plus the bookkeeping needed to remove entries
/// while dispatch passes are iterating by index.
///
/// Compaction only happens when no pass is active, so indices stay stable for
/// every pass (including nested ones) that snapshotted the length earlier.
#[derive(Default)]
pub(crate) struct SlotList {
    slots: Vec<Slot>,
    /// Number of dispatch passes currently iterating this list.
    active_passes: usize,
    /// Number of `Slot::Removed` entries awaiting compaction.
    tombstones: usize,
}

impl SlotList {
    pub fn push(&mut self, sub: Arc<Subscription>) {
        self.slots.push(Slot::Live(sub));
    }

    pub fn live_count(&self) -> usize {
        self.slots.len() - self.tombstones
    }

    #[cfg(test)]
    pub fn len_with_tombstones(&self) -> usize {
        self.slots.len()
    }

    /// Tombstone `owner`'s live slot holding `id`.
    pub fn remove_id(
        &mut self,
        owner: &Arc<RegistryState>,
        id: SubscriptionId,
    ) -> Option<Arc<Subscription>> {
        let index = self.slots.iter().position(|slot| {
            slot.live()
                .is_some_and(|sub| sub.owned_by(owner) && sub.id == id)
        })?;
        self.tombstone(index)
    }

    /// Tombstone `owner`'s first live slot (in insertion order) registered
    /// with `listener`.
    pub fn remove_listener(
        &mut self,
        owner: &Arc<RegistryState>,
        listener: &Listener,
    ) -> Option<Arc<Subscription>> {
        let index = self.slots.iter().position(|slot| {
            slot.live()
                .is_some_and(|sub| sub.owned_by(owner) && sub.listener.same_as(listener))
        })?;
        self.tombstone(index)
    }

    /// Take every live subscription out of the list, leaving it empty.
    pub fn drain_live(&mut self) -> Vec<Arc<Subscription>> {
        self.tombstones = 0;
        self.slots
            .drain(..)
            .filter_map(|slot| match slot {
                Slot::Live(sub) => Some(sub),
                Slot::Removed => None,
            })
            .collect()
    }

    fn tombstone(&mut self, index: usize) -> Option<Arc<Subscription>> {
        let slot = std::mem::replace(self.slots.get_mut(index)?, Slot::Removed);
        match slot {
            Slot::Live(sub) => {
                self.tombstones += 1;
                if self.active_passes == 0 {
                    self.compact();
                }
                Some(sub)
            }
            Slot::Removed => None,
        }
    }

    /// Start a dispatch pass. Returns the number of slots the pass may visit.
    pub fn begin_pass(&mut self) -> usize {
        self.active_passes += 1;
        self.slots.len()
    }

    /// Fetch `owner`'s subscription at `index` for the current pass.
    ///
    /// One-shot subscriptions are tombstoned here, before their listener runs,
    /// so only one pass can ever claim them. Slots of other registries are
    /// skipped.
    pub fn claim(
        &mut self,
        owner: &Arc<RegistryState>,
        index: usize,
    ) -> Option<Arc<Subscription>> {
        let sub = Arc::clone(self.slots.get(index)?.live()?);
        if !sub.owned_by(owner) {
            return None;
        }
        if sub.once {
            self.tombstone(index);
        }
        Some(sub)
    }

    /// Finish a dispatch pass. Tombstones are dropped once the outermost pass
    /// completes; returns how many were dropped.
    pub fn end_pass(&mut self, completed: bool) -> usize {
        self.active_passes = self.active_passes.saturating_sub(1);
        if completed && self.active_passes == 0 {
            self.compact()
        } else {
            0
        }
    }

    fn compact(&mut self) -> usize {
        let dropped = self.tombstones;
        if dropped > 0 {
            self.slots.retain(|slot| matches!(slot, Slot::Live(_)));
            self.tombstones = 0;
        }
        dropped
    }
}
