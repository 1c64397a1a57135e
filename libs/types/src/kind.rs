//! Entity kinds, scopes and channel categories
//!
//! A reconciliation model instance is addressed by `(EntityKind, Scope)`.
//! Channel categories and info-frame type tags map onto entity kinds through
//! one fixed table (`EntityKind::from_id`).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of mirrored entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Orderbook,
    Wallet,
    Orders,
    Positions,
    /// Account trade executions, before being routed as `PrivateTrades`
    Trades,
    /// Public trade ticks on a data channel
    PublicTrades,
    /// Trade executions on the account channel
    PrivateTrades,
}

impl EntityKind {
    pub const ALL: [EntityKind; 7] = [
        EntityKind::Orderbook,
        EntityKind::Wallet,
        EntityKind::Orders,
        EntityKind::Positions,
        EntityKind::Trades,
        EntityKind::PublicTrades,
        EntityKind::PrivateTrades,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Orderbook => "Orderbook",
            EntityKind::Wallet => "Wallet",
            EntityKind::Orders => "Orders",
            EntityKind::Positions => "Positions",
            EntityKind::Trades => "Trades",
            EntityKind::PublicTrades => "PublicTrades",
            EntityKind::PrivateTrades => "PrivateTrades",
        }
    }

    /// Lower-cased name, used to look up per-kind configuration.
    pub fn config_key(&self) -> String {
        self.name().to_lowercase()
    }

    /// Kind owning a channel category or an info-frame type tag.
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "book" => Some(EntityKind::Orderbook),
            "reports" => Some(EntityKind::PublicTrades),
            "wallets" | "ws" | "wu" => Some(EntityKind::Wallet),
            "os" | "on" | "ou" | "oc" => Some(EntityKind::Orders),
            "tu" | "te" | "trades" => Some(EntityKind::Trades),
            "ps" | "pn" | "pu" | "pc" => Some(EntityKind::Positions),
            _ => None,
        }
    }

    /// Reverse of `name`, case-insensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Scope of a model instance: the shared `default` scope or one symbol
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    Default,
    Symbol(String),
}

impl Scope {
    pub const DEFAULT_NAME: &'static str = "default";

    pub fn symbol(symbol: impl Into<String>) -> Self {
        Scope::Symbol(symbol.into())
    }

    /// Scope for a callback filter: a symbol, or `default` when absent.
    /// The literal `"default"` also selects the default scope.
    pub fn from_filter(filter: Option<&str>) -> Self {
        match filter {
            None => Scope::Default,
            Some(s) if s == Self::DEFAULT_NAME => Scope::Default,
            Some(s) => Scope::Symbol(s.to_string()),
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Scope::Default)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Default => f.write_str(Self::DEFAULT_NAME),
            Scope::Symbol(s) => f.write_str(s),
        }
    }
}

/// Channel category named in a `subscribed` event
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Category {
    Book,
    Trades,
    Ticker,
    Candles,
    Status,
    Other(String),
}

impl Category {
    pub fn from_name(name: &str) -> Self {
        match name {
            "book" => Category::Book,
            "trades" => Category::Trades,
            "ticker" => Category::Ticker,
            "candles" => Category::Candles,
            "status" => Category::Status,
            other => Category::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Category::Book => "book",
            Category::Trades => "trades",
            Category::Ticker => "ticker",
            Category::Candles => "candles",
            Category::Status => "status",
            Category::Other(name) => name,
        }
    }

    /// Kind that owns this category's state, if any.
    pub fn entity_kind(&self) -> Option<EntityKind> {
        EntityKind::from_id(self.as_str())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
