//! Channel binding table
//!
//! Tracks `(category, chanId) → subscription` over the subscribe /
//! unsubscribe lifecycle. Data frames carry only a channel id, so this
//! table is how they find their symbol.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use types::frame::{ChannelId, EventFrame};
use types::kind::{Category, Scope};

/// An active channel subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct Subscription {
    pub category: Category,
    pub chan_id: ChannelId,
    /// `symbol` from the event, falling back to `pair`
    pub symbol: Option<String>,
    /// The full `subscribed` event
    pub meta: EventFrame,
}

impl Subscription {
    /// Build from a `subscribed` event. `None` when it lacks a channel or
    /// channel id.
    pub fn from_event(event: &EventFrame) -> Option<Self> {
        let channel = event.channel.as_deref()?;
        let chan_id = event.chan_id?;

        Some(Self {
            category: Category::from_name(channel),
            chan_id,
            symbol: event.symbol_or_pair().map(str::to_string),
            meta: event.clone(),
        })
    }

    /// Scope owning this subscription's state.
    pub fn scope(&self) -> Scope {
        Scope::from_filter(self.symbol.as_deref())
    }
}

/// Active bindings, by category then channel id.
#[derive(Debug, Clone, Default)]
pub struct ChannelTable {
    bindings: HashMap<Category, HashMap<ChannelId, Subscription>>,
}

impl ChannelTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a subscription, replacing any previous binding of the same
    /// `(category, chanId)`.
    pub fn bind(&mut self, subscription: Subscription) -> &Subscription {
        let channels = self
            .bindings
            .entry(subscription.category.clone())
            .or_default();

        match channels.entry(subscription.chan_id) {
            Entry::Occupied(mut slot) => {
                slot.insert(subscription);
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(subscription),
        }
    }

    /// Remove a binding. Without a category, every category is searched.
    pub fn unbind(&mut self, category: Option<&Category>, chan_id: ChannelId) -> Option<Subscription> {
        match category {
            Some(category) => self
                .bindings
                .get_mut(category)
                .and_then(|channels| channels.remove(&chan_id)),
            None => self
                .bindings
                .values_mut()
                .find_map(|channels| channels.remove(&chan_id)),
        }
    }

    /// Binding for a channel id in any category.
    pub fn find(&self, chan_id: ChannelId) -> Option<&Subscription> {
        self.bindings
            .values()
            .find_map(|channels| channels.get(&chan_id))
    }

    pub fn len(&self) -> usize {
        self.bindings.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
