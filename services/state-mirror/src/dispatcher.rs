//! Inbound frame dispatcher
//!
//! Classifies raw frames, tracks channel bindings, routes frames to the
//! owning `(kind, scope)` model and invokes consumer callbacks with the
//! parsed frame and the model's new state.
//!
//! Routing rules:
//! - `subscribed` / `unsubscribed` events bind and unbind channels; an
//!   unsubscribe resets the bound kind at the subscription's scope
//! - heartbeats are dropped
//! - data frames on a bound `book` channel update the order book for the
//!   bound symbol; frames on unbound channels are dropped
//! - trade ticks (`te`/`tu`) and `trades` channel frames reach public trade
//!   callbacks at `default` and at the bound symbol
//! - info frames on channel 0 go to the kind named by their type tag in the
//!   `default` scope; orders are also mirrored per trading pair
//!
//! Processing is synchronous: one frame is handled to completion before the
//! next.

use serde_json::Value;
use tracing::{debug, info, trace, warn};
use types::errors::MirrorError;
use types::frame::{decode_frame, ChannelId, EventFrame, Frame, FrameBody};
use types::kind::{Category, EntityKind, Scope};
use types::order::OrderEntry;

use crate::callbacks::{CallbackClass, CallbackKey, CallbackTable};
use crate::channels::{ChannelTable, Subscription};
use crate::config::MirrorConfig;
use crate::model::{Parsed, StateRef};
use crate::orders::ORDERS_SNAPSHOT;
use crate::registry::ComponentRegistry;

/// Hook that may claim a frame before classification. Returning `true`
/// skips default processing.
pub type OverrideHook = Box<dyn FnMut(&Value) -> bool>;

/// Trade execution tag
pub const TRADE_EXECUTED: &str = "te";
/// Trade update tag
pub const TRADE_UPDATED: &str = "tu";

fn is_trade_tag(tag: &str) -> bool {
    tag == TRADE_EXECUTED || tag == TRADE_UPDATED
}

/// Dispatch counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Frames handed to `handle_frame`
    pub frames: u64,
    /// Event frames
    pub events: u64,
    pub heartbeats: u64,
    /// Data frames on channels with no binding
    pub dropped_unbound: u64,
    /// Frames claimed by the override hook
    pub overridden: u64,
    /// Frames with no consumer (unmapped info tags, checksums, ticker, ...)
    pub ignored: u64,
    /// Text that failed to decode
    pub decode_errors: u64,
}

/// Routes inbound frames to models and consumer callbacks.
pub struct FrameDispatcher {
    registry: ComponentRegistry,
    channels: ChannelTable,
    callbacks: CallbackTable,
    override_hook: Option<OverrideHook>,
    stats: DispatchStats,
}

impl FrameDispatcher {
    pub fn new(registry: ComponentRegistry) -> Self {
        Self {
            registry,
            channels: ChannelTable::new(),
            callbacks: CallbackTable::new(),
            override_hook: None,
            stats: DispatchStats::default(),
        }
    }

    /// Dispatcher over the standard models with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ComponentRegistry::with_defaults())
    }

    pub fn from_config(config: &MirrorConfig) -> Self {
        Self::new(ComponentRegistry::from_config(config))
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ComponentRegistry {
        &mut self.registry
    }

    pub fn channels(&self) -> &ChannelTable {
        &self.channels
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    /// Current state of `(kind, filter)` without creating a model.
    pub fn state(&self, kind: EntityKind, filter: Option<&str>) -> Option<StateRef<'_>> {
        self.registry.state(kind, &Scope::from_filter(filter))
    }

    /// Install the override hook, replacing any previous one.
    pub fn set_override<F>(&mut self, hook: F)
    where
        F: FnMut(&Value) -> bool + 'static,
    {
        self.override_hook = Some(Box::new(hook));
    }

    pub fn clear_override(&mut self) {
        self.override_hook = None;
    }

    // ----- Callback registration -----

    /// Register a plain callback for `(kind, filter)`. `filter` is a symbol;
    /// `None` or `"default"` selects the default scope.
    pub fn on<F>(&mut self, kind: EntityKind, filter: Option<&str>, callback: F)
    where
        F: FnMut(&Parsed) + 'static,
    {
        let key = CallbackKey::new(kind, Scope::from_filter(filter));
        self.callbacks.set_plain(key, Box::new(callback));
    }

    /// Register a managed callback for `(kind, filter)`. Managed callbacks
    /// receive the model's state after the frame is applied.
    pub fn on_managed<F>(&mut self, kind: EntityKind, filter: Option<&str>, callback: F)
    where
        F: FnMut(&Parsed, StateRef<'_>) + 'static,
    {
        let key = CallbackKey::new(kind, Scope::from_filter(filter));
        self.callbacks.set_managed(key, Box::new(callback));
    }

    /// Drop the `class` callback of `(kind, filter)`. Returns whether one
    /// was registered.
    pub fn off(&mut self, class: CallbackClass, kind: EntityKind, filter: Option<&str>) -> bool {
        let key = CallbackKey::new(kind, Scope::from_filter(filter));
        self.callbacks.remove(class, &key)
    }

    pub fn on_orderbook<F>(&mut self, filter: Option<&str>, callback: F)
    where
        F: FnMut(&Parsed) + 'static,
    {
        self.on(EntityKind::Orderbook, filter, callback);
    }

    pub fn on_managed_orderbook<F>(&mut self, filter: Option<&str>, callback: F)
    where
        F: FnMut(&Parsed, StateRef<'_>) + 'static,
    {
        self.on_managed(EntityKind::Orderbook, filter, callback);
    }

    pub fn on_wallet<F>(&mut self, callback: F)
    where
        F: FnMut(&Parsed) + 'static,
    {
        self.on(EntityKind::Wallet, None, callback);
    }

    pub fn on_managed_wallet<F>(&mut self, callback: F)
    where
        F: FnMut(&Parsed, StateRef<'_>) + 'static,
    {
        self.on_managed(EntityKind::Wallet, None, callback);
    }

    pub fn on_orders<F>(&mut self, filter: Option<&str>, callback: F)
    where
        F: FnMut(&Parsed) + 'static,
    {
        self.on(EntityKind::Orders, filter, callback);
    }

    pub fn on_managed_orders<F>(&mut self, filter: Option<&str>, callback: F)
    where
        F: FnMut(&Parsed, StateRef<'_>) + 'static,
    {
        self.on_managed(EntityKind::Orders, filter, callback);
    }

    pub fn on_managed_positions<F>(&mut self, callback: F)
    where
        F: FnMut(&Parsed, StateRef<'_>) + 'static,
    {
        self.on_managed(EntityKind::Positions, None, callback);
    }

    pub fn on_public_trades<F>(&mut self, filter: Option<&str>, callback: F)
    where
        F: FnMut(&Parsed) + 'static,
    {
        self.on(EntityKind::PublicTrades, filter, callback);
    }

    pub fn on_private_trades<F>(&mut self, callback: F)
    where
        F: FnMut(&Parsed) + 'static,
    {
        self.on(EntityKind::PrivateTrades, None, callback);
    }

    // ----- Frame handling -----

    /// Decode and handle one text frame. Decode failures carry the raw text
    /// and leave all state untouched.
    pub fn handle_text(&mut self, raw: &str) -> Result<(), MirrorError> {
        let frame = decode_frame(raw).map_err(|e| {
            self.stats.decode_errors += 1;
            warn!(error = %e, "Undecodable frame");
            e
        })?;

        self.handle_frame(&frame)
    }

    /// Handle one decoded frame.
    pub fn handle_frame(&mut self, frame: &Value) -> Result<(), MirrorError> {
        self.stats.frames += 1;

        if let Some(hook) = self.override_hook.as_mut() {
            if hook(frame) {
                self.stats.overridden += 1;
                trace!("Frame handled by override hook");
                return Ok(());
            }
        }

        match Frame::classify(frame)? {
            Frame::Event(event) => {
                self.handle_event(&event);
                Ok(())
            }
            Frame::Heartbeat { chan_id } => {
                self.stats.heartbeats += 1;
                trace!(chan_id, "Heartbeat");
                Ok(())
            }
            Frame::Info { tag, payload } => self.handle_info(frame, tag, payload),
            Frame::Data {
                chan_id,
                tag,
                payload,
            } => self.handle_data(frame, chan_id, tag, payload),
            Frame::Unrecognized => {
                self.stats.ignored += 1;
                trace!(frame = %frame, "Unrecognized frame ignored");
                Ok(())
            }
        }
    }

    fn handle_event(&mut self, event: &EventFrame) {
        self.stats.events += 1;

        match event.event.as_str() {
            "subscribed" => match Subscription::from_event(event) {
                Some(subscription) => {
                    let subscription = self.channels.bind(subscription);
                    info!(
                        channel = %subscription.category,
                        chan_id = subscription.chan_id,
                        symbol = ?subscription.symbol,
                        "Channel subscribed"
                    );
                }
                None => warn!(event = ?event, "Subscribed event without channel or chanId"),
            },
            "unsubscribed" => self.handle_unsubscribed(event),
            "error" => warn!(
                code = ?event.extra.get("code"),
                msg = ?event.meta_str("msg"),
                "Venue error event"
            ),
            other => debug!(event = other, "Event ignored"),
        }
    }

    fn handle_unsubscribed(&mut self, event: &EventFrame) {
        let Some(chan_id) = event.chan_id else {
            warn!(event = ?event, "Unsubscribed event without chanId");
            return;
        };

        let category = event.channel.as_deref().map(Category::from_name);

        let Some(subscription) = self.channels.unbind(category.as_ref(), chan_id) else {
            debug!(chan_id, "Unsubscribed from untracked channel");
            return;
        };

        let scope = subscription.scope();
        info!(
            channel = %subscription.category,
            chan_id,
            scope = %scope,
            "Channel unsubscribed"
        );

        if let Some(kind) = subscription.category.entity_kind() {
            self.registry.reset(kind, &scope);
        }
    }

    fn handle_data(
        &mut self,
        frame: &Value,
        chan_id: ChannelId,
        tag: Option<&str>,
        payload: &Value,
    ) -> Result<(), MirrorError> {
        if let Some(tag) = tag {
            if is_trade_tag(tag) {
                self.dispatch_public_trades(frame, chan_id);
            } else {
                self.stats.ignored += 1;
                trace!(chan_id, tag, "Tagged data frame ignored");
            }
            return Ok(());
        }

        let Some(subscription) = self.channels.find(chan_id) else {
            self.stats.dropped_unbound += 1;
            debug!(chan_id, "Frame for unbound channel dropped");
            return Ok(());
        };

        let category = subscription.category.clone();
        let scope = subscription.scope();

        match category {
            Category::Book => apply(
                &mut self.registry,
                &mut self.callbacks,
                EntityKind::Orderbook,
                &scope,
                FrameBody::untagged(payload),
            ),
            Category::Trades => {
                self.dispatch_public_trades(frame, chan_id);
                Ok(())
            }
            other => {
                self.stats.ignored += 1;
                trace!(chan_id, channel = %other, "No model for channel");
                Ok(())
            }
        }
    }

    /// Public trades reach callbacks at `default` and at the bound symbol.
    fn dispatch_public_trades(&mut self, frame: &Value, chan_id: ChannelId) {
        let parsed = Parsed::Raw(frame.clone());

        self.callbacks
            .dispatch(EntityKind::PublicTrades, &Scope::Default, &parsed, None);

        if let Some(scope) = self.channels.find(chan_id).map(Subscription::scope) {
            if !scope.is_default() {
                self.callbacks
                    .dispatch(EntityKind::PublicTrades, &scope, &parsed, None);
            }
        }
    }

    fn handle_info(&mut self, frame: &Value, tag: &str, payload: &Value) -> Result<(), MirrorError> {
        let Some(kind) = EntityKind::from_id(tag) else {
            self.stats.ignored += 1;
            trace!(tag, "Info frame ignored");
            return Ok(());
        };

        let body = FrameBody::tagged(tag, payload);

        match kind {
            EntityKind::Trades => {
                let parsed = Parsed::Raw(frame.clone());
                self.callbacks
                    .dispatch(EntityKind::PrivateTrades, &Scope::Default, &parsed, None);
                Ok(())
            }
            EntityKind::Orders => self.handle_orders(body),
            kind if self.registry.has_factory(kind) => apply(
                &mut self.registry,
                &mut self.callbacks,
                kind,
                &Scope::Default,
                body,
            ),
            kind => {
                let parsed = Parsed::Raw(frame.clone());
                self.callbacks.dispatch(kind, &Scope::Default, &parsed, None);
                Ok(())
            }
        }
    }

    /// Orders are mirrored in the `default` scope and per trading pair.
    ///
    /// The pair comes from the first record of a snapshot or from the
    /// record itself. An empty snapshot clears every known pair scope.
    fn handle_orders(&mut self, body: FrameBody<'_>) -> Result<(), MirrorError> {
        apply(
            &mut self.registry,
            &mut self.callbacks,
            EntityKind::Orders,
            &Scope::Default,
            body,
        )?;

        let pair_scopes: Vec<Scope> = if body.tag == Some(ORDERS_SNAPSHOT) {
            match body.items().first() {
                Some(first) => OrderEntry::symbol_of(first)
                    .map(Scope::symbol)
                    .into_iter()
                    .collect(),
                None => self
                    .registry
                    .scopes(EntityKind::Orders)
                    .into_iter()
                    .filter(|scope| !scope.is_default())
                    .collect(),
            }
        } else {
            OrderEntry::symbol_of(body.payload)
                .map(Scope::symbol)
                .into_iter()
                .collect()
        };

        for scope in &pair_scopes {
            apply(
                &mut self.registry,
                &mut self.callbacks,
                EntityKind::Orders,
                scope,
                body,
            )?;
        }

        Ok(())
    }
}

/// Update the model for `(kind, scope)` and notify its callbacks.
fn apply(
    registry: &mut ComponentRegistry,
    callbacks: &mut CallbackTable,
    kind: EntityKind,
    scope: &Scope,
    body: FrameBody<'_>,
) -> Result<(), MirrorError> {
    let (parsed, state) = registry.update(kind, scope, body).map_err(|e| {
        warn!(kind = %kind, scope = %scope, error = %e, "Frame rejected");
        e
    })?;

    callbacks.dispatch(kind, scope, &parsed, Some(state));
    Ok(())
}

impl Default for FrameDispatcher {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for FrameDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameDispatcher")
            .field("registry", &self.registry)
            .field("channels", &self.channels)
            .field("callbacks", &self.callbacks)
            .field("override_hook", &self.override_hook.is_some())
            .field("stats", &self.stats)
            .finish()
    }
}
