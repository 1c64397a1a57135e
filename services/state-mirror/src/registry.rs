//! Component registry
//!
//! Owns one reconciliation model per `(EntityKind, Scope)` pair. Models are
//! created lazily on first resolve from the kind's factory and the kind's
//! configuration, and discarded on reset (recreated empty on next use).

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, info};
use types::errors::MirrorError;
use types::frame::FrameBody;
use types::kind::{EntityKind, Scope};

use crate::config::{BookVariant, MirrorConfig, WalletFeed};
use crate::indexed_book::IndexedOrderBook;
use crate::level_book::PriceLevelOrderBook;
use crate::model::{ModelConfig, Parsed, Reconcile, StateRef};
use crate::orders::OrdersModel;
use crate::positions::PositionsModel;
use crate::wallet::{HiveWalletModel, WalletModel};

/// Builds a fresh, empty model from its configuration.
pub type ModelFactory = Box<dyn Fn(ModelConfig) -> Box<dyn Reconcile>>;

/// Lazily populated table of model instances.
pub struct ComponentRegistry {
    factories: HashMap<EntityKind, ModelFactory>,
    /// Per-kind options keyed by lower-cased kind name
    configs: HashMap<String, ModelConfig>,
    components: HashMap<EntityKind, HashMap<Scope, Box<dyn Reconcile>>>,
}

impl ComponentRegistry {
    /// Empty registry with no factories.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
            configs: HashMap::new(),
            components: HashMap::new(),
        }
    }

    /// Registry with the standard factories selected by `config`.
    pub fn from_config(config: &MirrorConfig) -> Self {
        let mut registry = Self::new();

        match config.book {
            BookVariant::Indexed => registry.register(EntityKind::Orderbook, IndexedOrderBook::boxed),
            BookVariant::PriceLevel => {
                registry.register(EntityKind::Orderbook, PriceLevelOrderBook::boxed)
            }
        }

        match config.wallet_feed {
            WalletFeed::Array => registry.register(EntityKind::Wallet, WalletModel::boxed),
            WalletFeed::Keyed => registry.register(EntityKind::Wallet, HiveWalletModel::boxed),
        }

        registry.register(EntityKind::Orders, OrdersModel::boxed);
        registry.register(EntityKind::Positions, PositionsModel::boxed);

        for (name, model_config) in &config.components {
            registry.configure(name, *model_config);
        }

        info!(
            book = config.book.precision(),
            wallet_feed = ?config.wallet_feed,
            configured = config.components.len(),
            "ComponentRegistry initialized"
        );

        registry
    }

    /// Registry with default configuration (raw P0 books, array wallets).
    pub fn with_defaults() -> Self {
        Self::from_config(&MirrorConfig::default())
    }

    /// Register (or replace) the factory for a kind.
    pub fn register<F>(&mut self, kind: EntityKind, factory: F)
    where
        F: Fn(ModelConfig) -> Box<dyn Reconcile> + 'static,
    {
        self.factories.insert(kind, Box::new(factory));
    }

    /// Set options for a kind by name. Names are case-insensitive.
    pub fn configure(&mut self, name: &str, config: ModelConfig) {
        self.configs.insert(name.to_lowercase(), config);
    }

    pub fn has_factory(&self, kind: EntityKind) -> bool {
        self.factories.contains_key(&kind)
    }

    /// Existing model for `(kind, scope)`, or a new one from the kind's
    /// factory.
    pub fn resolve(&mut self, kind: EntityKind, scope: &Scope) -> Result<&mut dyn Reconcile, MirrorError> {
        let factory = self
            .factories
            .get(&kind)
            .ok_or_else(|| MirrorError::UnknownComponent {
                kind: kind.to_string(),
            })?;

        let config = self
            .configs
            .get(&kind.config_key())
            .copied()
            .unwrap_or_default();

        let model = self
            .components
            .entry(kind)
            .or_default()
            .entry(scope.clone())
            .or_insert_with(|| {
                debug!(kind = %kind, scope = %scope, keyed = config.keyed, "Creating model");
                factory(config)
            });

        Ok(&mut **model)
    }

    /// Run a frame through the model for `(kind, scope)`.
    pub fn update(
        &mut self,
        kind: EntityKind,
        scope: &Scope,
        body: FrameBody<'_>,
    ) -> Result<(Parsed, StateRef<'_>), MirrorError> {
        let model = self.resolve(kind, scope)?;
        let parsed = model.update(body)?;
        Ok((parsed, model.state()))
    }

    /// Discard the model for `(kind, scope)`. No-op if absent.
    pub fn reset(&mut self, kind: EntityKind, scope: &Scope) {
        let removed = self
            .components
            .get_mut(&kind)
            .and_then(|models| models.remove(scope));

        if removed.is_some() {
            info!(kind = %kind, scope = %scope, "Component reset");
        }
    }

    /// Current state without creating a model.
    pub fn state(&self, kind: EntityKind, scope: &Scope) -> Option<StateRef<'_>> {
        self.components
            .get(&kind)
            .and_then(|models| models.get(scope))
            .map(|model| model.state())
    }

    /// Live scopes for a kind, sorted.
    pub fn scopes(&self, kind: EntityKind) -> Vec<Scope> {
        let mut scopes: Vec<Scope> = self
            .components
            .get(&kind)
            .map(|models| models.keys().cloned().collect())
            .unwrap_or_default();
        scopes.sort();
        scopes
    }

    /// Total live model instances.
    pub fn len(&self) -> usize {
        self.components.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&EntityKind> = self.factories.keys().collect();
        kinds.sort_by_key(|kind| kind.name());

        f.debug_struct("ComponentRegistry")
            .field("factories", &kinds)
            .field("configs", &self.configs)
            .field("components", &self.len())
            .finish()
    }
}
