//! Mirror configuration
//!
//! JSON configuration selecting the order book wire variant, the wallet feed
//! variant and per-kind model options:
//!
//! ```json
//! {
//!   "book": "R0",
//!   "wallet_feed": "array",
//!   "components": { "orderbook": { "keyed": true }, "orders": { "keyed": false } }
//! }
//! ```
//!
//! Component names are matched case-insensitively.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use types::kind::EntityKind;

use crate::model::ModelConfig;

/// Errors loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Order book wire variant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum BookVariant {
    /// Identifier-indexed rows `[id, price, amount]`
    #[serde(rename = "R0")]
    Indexed,
    /// Aggregated levels `[price, count, amount]`
    #[default]
    #[serde(rename = "P0")]
    PriceLevel,
}

impl BookVariant {
    /// Precision value sent in a book subscribe request.
    pub fn precision(&self) -> &'static str {
        match self {
            BookVariant::Indexed => "R0",
            BookVariant::PriceLevel => "P0",
        }
    }
}

/// Wallet feed variant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletFeed {
    /// `ws` snapshot rows and `wu` single-row updates
    #[default]
    Array,
    /// Keyed mapping of wallet records, snapshots only
    Keyed,
}

/// Top-level mirror configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MirrorConfig {
    #[serde(default)]
    pub book: BookVariant,
    #[serde(default)]
    pub wallet_feed: WalletFeed,
    /// Per-kind model options keyed by lower-cased kind name
    #[serde(default)]
    pub components: HashMap<String, ModelConfig>,
}

impl MirrorConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: MirrorConfig = serde_json::from_str(json)?;
        Ok(config.normalized())
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Options for a kind, defaults when not configured.
    pub fn model_config(&self, kind: EntityKind) -> ModelConfig {
        self.components
            .get(&kind.config_key())
            .copied()
            .unwrap_or_default()
    }

    /// Set options for one kind.
    pub fn with_component(mut self, kind: EntityKind, config: ModelConfig) -> Self {
        self.components.insert(kind.config_key(), config);
        self
    }

    pub fn with_book(mut self, book: BookVariant) -> Self {
        self.book = book;
        self
    }

    fn normalized(self) -> Self {
        let components = self
            .components
            .into_iter()
            .map(|(name, config)| (name.to_lowercase(), config))
            .collect();

        Self { components, ..self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MirrorConfig::from_json_str("{}").unwrap();
        assert_eq!(config.book, BookVariant::PriceLevel);
        assert_eq!(config.wallet_feed, WalletFeed::Array);
        assert!(!config.model_config(EntityKind::Orderbook).keyed);
    }

    #[test]
    fn test_component_names_are_case_insensitive() {
        let config = MirrorConfig::from_json_str(
            r#"{"book": "R0", "wallet_feed": "keyed", "components": {"Orderbook": {"keyed": true}}}"#,
        )
        .unwrap();

        assert_eq!(config.book, BookVariant::Indexed);
        assert_eq!(config.wallet_feed, WalletFeed::Keyed);
        assert!(config.model_config(EntityKind::Orderbook).keyed);
        assert!(!config.model_config(EntityKind::Orders).keyed);
    }

    #[test]
    fn test_unknown_book_variant_rejected() {
        let err = MirrorConfig::from_json_str(r#"{"book": "P9"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = MirrorConfig::from_path("/nonexistent/mirror.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_builders() {
        let config = MirrorConfig::default()
            .with_book(BookVariant::Indexed)
            .with_component(EntityKind::Orders, ModelConfig::keyed());
        assert_eq!(config.book.precision(), "R0");
        assert!(config.model_config(EntityKind::Orders).keyed);
    }
}
