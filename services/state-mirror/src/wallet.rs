//! Wallet reconciliation
//!
//! Two feed variants:
//! - `WalletModel`: array feed (`ws` snapshot rows, `wu` single-row updates)
//! - `HiveWalletModel`: keyed-mapping feed, every frame a full snapshot
//!
//! Wallets are never deleted; updates upsert by `(walletType, currency)`.

use serde_json::Value;
use tracing::debug;
use types::errors::MirrorError;
use types::frame::FrameBody;
use types::wallet::WalletEntry;

use crate::model::{FrameClass, ModelConfig, Parsed, Reconcile, StateRef, Update};

/// Wallet mirror for the array feed.
#[derive(Debug, Clone, Default)]
pub struct WalletModel {
    state: Vec<WalletEntry>,
}

impl WalletModel {
    /// Wallets have a single representation; the config is accepted for
    /// factory uniformity.
    pub fn new(_config: ModelConfig) -> Self {
        Self::default()
    }

    pub fn boxed(config: ModelConfig) -> Box<dyn Reconcile> {
        Box::new(Self::new(config))
    }

    pub fn wallets(&self) -> &[WalletEntry] {
        &self.state
    }

    fn parse_snapshot(&self, body: FrameBody<'_>) -> Result<Vec<WalletEntry>, MirrorError> {
        let rows = body.payload.as_array().ok_or_else(|| {
            MirrorError::malformed("wallet snapshot", format!("expected an array of rows, got {}", body.payload))
        })?;

        rows.iter().map(WalletEntry::from_row).collect()
    }

    /// A null available balance is replaced with the balance.
    fn parse_delta(&self, body: FrameBody<'_>) -> Result<WalletEntry, MirrorError> {
        let mut entry = WalletEntry::from_row(body.payload)?;

        if entry.available_balance.is_none() {
            entry.available_balance = Some(entry.balance.clone());
        }

        Ok(entry)
    }
}

impl Reconcile for WalletModel {
    fn name(&self) -> &'static str {
        "WalletModel"
    }

    fn classify(&self, body: FrameBody<'_>) -> FrameClass {
        match body.payload.as_array().and_then(|items| items.first()) {
            None | Some(Value::Array(_)) => FrameClass::Snapshot,
            Some(_) => FrameClass::Delta,
        }
    }

    fn parse(&self, body: FrameBody<'_>) -> Result<Parsed, MirrorError> {
        let update = match self.classify(body) {
            FrameClass::Snapshot => Update::Snapshot(self.parse_snapshot(body)?),
            FrameClass::Delta => Update::Delta(self.parse_delta(body)?),
        };
        Ok(Parsed::Wallets(update))
    }

    fn apply_snapshot(&mut self, body: FrameBody<'_>) -> Result<(), MirrorError> {
        self.state = self.parse_snapshot(body)?;
        debug!(wallets = self.state.len(), "Wallet snapshot applied");
        Ok(())
    }

    fn apply_delta(&mut self, body: FrameBody<'_>) -> Result<(), MirrorError> {
        let entry = self.parse_delta(body)?;

        match self.state.iter_mut().find(|w| w.same_key(&entry)) {
            Some(existing) => *existing = entry,
            None => self.state.push(entry),
        }

        Ok(())
    }

    fn state(&self) -> StateRef<'_> {
        StateRef::Wallets(&self.state)
    }
}

/// Wallet mirror for the keyed-mapping feed.
///
/// Each frame is a mapping of wallet records
/// `{wallettype, currency, balance, unsettled_interest}`, projected to rows
/// in mapping order with a null available balance.
#[derive(Debug, Clone, Default)]
pub struct HiveWalletModel {
    state: Vec<WalletEntry>,
}

impl HiveWalletModel {
    pub fn new(_config: ModelConfig) -> Self {
        Self::default()
    }

    pub fn boxed(config: ModelConfig) -> Box<dyn Reconcile> {
        Box::new(Self::new(config))
    }

    fn parse_snapshot(&self, body: FrameBody<'_>) -> Result<Vec<WalletEntry>, MirrorError> {
        match body.payload {
            Value::Object(map) => map.values().map(WalletEntry::from_hive_record).collect(),
            Value::Array(items) => items.iter().map(WalletEntry::from_hive_record).collect(),
            other => Err(MirrorError::malformed(
                "wallet mapping",
                format!("expected an object, got {}", other),
            )),
        }
    }
}

impl Reconcile for HiveWalletModel {
    fn name(&self) -> &'static str {
        "HiveWalletModel"
    }

    fn classify(&self, _body: FrameBody<'_>) -> FrameClass {
        FrameClass::Snapshot
    }

    fn parse(&self, body: FrameBody<'_>) -> Result<Parsed, MirrorError> {
        Ok(Parsed::Wallets(Update::Snapshot(self.parse_snapshot(body)?)))
    }

    fn apply_snapshot(&mut self, body: FrameBody<'_>) -> Result<(), MirrorError> {
        self.state = self.parse_snapshot(body)?;
        debug!(wallets = self.state.len(), "Wallet mapping applied");
        Ok(())
    }

    fn apply_delta(&mut self, _body: FrameBody<'_>) -> Result<(), MirrorError> {
        Err(MirrorError::NotImplemented {
            model: "HiveWalletModel",
            operation: "apply_delta",
        })
    }

    fn state(&self) -> StateRef<'_> {
        StateRef::Wallets(&self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot() -> Value {
        json!([["exchange", "USD", 98.999, 0, 98.999], ["exchange", "ETH", 100, 0, 100]])
    }

    fn model_with_snapshot() -> WalletModel {
        let mut model = WalletModel::default();
        model.apply_snapshot(FrameBody::tagged("ws", &snapshot())).unwrap();
        model
    }

    #[test]
    fn test_takes_snapshots() {
        let model = model_with_snapshot();
        assert_eq!(model.state().to_value(), snapshot());
    }

    #[test]
    fn test_applies_updates() {
        let mut model = model_with_snapshot();
        model
            .apply_delta(FrameBody::tagged("wu", &json!(["exchange", "ETH", 93.994, 0, null])))
            .unwrap();

        assert_eq!(
            model.state().to_value(),
            json!([["exchange", "USD", 98.999, 0, 98.999], ["exchange", "ETH", 93.994, 0, 93.994]])
        );
    }

    #[test]
    fn test_adds_new_wallet_types() {
        let mut model = model_with_snapshot();
        model
            .apply_delta(FrameBody::tagged("wu", &json!(["trade", "EOS", 99, 0, null])))
            .unwrap();

        assert_eq!(model.wallets().len(), 3);
        assert_eq!(model.state().to_value()[2], json!(["trade", "EOS", 99, 0, 99]));
    }

    #[test]
    fn test_adds_new_currencies() {
        let mut model = model_with_snapshot();
        model
            .apply_delta(FrameBody::tagged("wu", &json!(["exchange", "EOS", 99, 0, null])))
            .unwrap();

        assert_eq!(
            model.state().to_value(),
            json!([
                ["exchange", "USD", 98.999, 0, 98.999],
                ["exchange", "ETH", 100, 0, 100],
                ["exchange", "EOS", 99, 0, 99]
            ])
        );
    }

    #[test]
    fn test_parse_does_not_affect_state() {
        let mut model = WalletModel::default();
        let snap = json!([["exchange", "USD", 97, 0, 97], ["exchange", "ETH", 100, 0, 100]]);
        model.update(FrameBody::tagged("ws", &snap)).unwrap();

        let update = json!(["exchange", "ETH", 70, 0, null]);
        let parsed = model.parse(FrameBody::tagged("wu", &update)).unwrap();
        assert_eq!(parsed.to_value(), json!(["exchange", "ETH", 70, 0, 70]));
        assert_eq!(model.state().to_value(), snap);

        model.update(FrameBody::tagged("wu", &update)).unwrap();
        assert_eq!(
            model.state().to_value(),
            json!([["exchange", "USD", 97, 0, 97], ["exchange", "ETH", 70, 0, 70]])
        );
    }

    #[test]
    fn test_explicit_available_balance_kept() {
        let mut model = model_with_snapshot();
        model
            .update(FrameBody::tagged("wu", &json!(["exchange", "USD", 50, 0, 40])))
            .unwrap();
        assert_eq!(model.state().to_value()[0], json!(["exchange", "USD", 50, 0, 40]));
    }

    #[test]
    fn test_empty_payload_is_empty_snapshot() {
        let mut model = model_with_snapshot();
        let parsed = model.update(FrameBody::tagged("ws", &json!([]))).unwrap();
        assert!(parsed.is_snapshot());
        assert!(model.state().is_empty());
    }

    #[test]
    fn test_hive_projects_mapping_in_order() {
        let mut model = HiveWalletModel::default();
        let mapping = json!({
            "exchange:USD": { "wallettype": "exchange", "currency": "USD", "balance": 10, "unsettled_interest": 0 },
            "margin:BTC": { "wallettype": "margin", "currency": "BTC", "balance": "0.5", "unsettled_interest": null }
        });

        let parsed = model.update(FrameBody::untagged(&mapping)).unwrap();
        assert!(parsed.is_snapshot());
        assert_eq!(
            model.state().to_value(),
            json!([["exchange", "USD", 10, 0, null], ["margin", "BTC", "0.5", null, null]])
        );
    }

    #[test]
    fn test_hive_delta_not_implemented() {
        let mut model = HiveWalletModel::default();
        let err = model
            .apply_delta(FrameBody::untagged(&json!(["exchange", "USD", 1, 0, null])))
            .unwrap_err();
        assert!(matches!(err, MirrorError::NotImplemented { .. }));
    }

    #[test]
    fn test_hive_rejects_scalar_payload() {
        let mut model = HiveWalletModel::default();
        assert!(model.update(FrameBody::untagged(&json!("nope"))).is_err());
        assert!(model.state().is_empty());
    }
}
