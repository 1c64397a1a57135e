//! Account wallet types
//!
//! Wallet rows arrive as `[walletType, currency, balance, unsettledInterest,
//! availableBalance, ...]`. The pair `(walletType, currency)` is the key.

use serde_json::{Map, Value};

use crate::book::scalar_field;
use crate::errors::MirrorError;
use crate::scalar::Scalar;

const WHAT: &str = "wallet row";

/// A single wallet balance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletEntry {
    pub wallet_type: String,
    pub currency: String,
    pub balance: Scalar,
    /// `None` when the venue sent null
    pub unsettled_interest: Option<Scalar>,
    /// `None` when the venue sent null (the venue has not computed it yet)
    pub available_balance: Option<Scalar>,
    /// Trailing fields beyond the first five, kept verbatim
    pub extra: Vec<Value>,
}

impl WalletEntry {
    /// Parse a positional wallet row. Missing optional fields read as null.
    pub fn from_row(row: &Value) -> Result<Self, MirrorError> {
        let fields = row
            .as_array()
            .ok_or_else(|| MirrorError::malformed(WHAT, format!("expected an array, got {}", row)))?;

        if fields.len() < 3 {
            return Err(MirrorError::malformed(
                WHAT,
                format!("expected at least 3 fields, got {}", fields.len()),
            ));
        }

        Ok(Self {
            wallet_type: text_field(&fields[0], "walletType")?,
            currency: text_field(&fields[1], "currency")?,
            balance: scalar_field(fields, 2, WHAT, "balance")?,
            unsettled_interest: fields.get(3).and_then(Scalar::from_value),
            available_balance: fields.get(4).and_then(Scalar::from_value),
            extra: fields.iter().skip(5).cloned().collect(),
        })
    }

    /// Parse one value of the keyed-mapping ("hive") feed:
    /// `{wallettype, currency, balance, unsettled_interest}`.
    pub fn from_hive_record(record: &Value) -> Result<Self, MirrorError> {
        let map: &Map<String, Value> = record.as_object().ok_or_else(|| {
            MirrorError::malformed("wallet record", format!("expected an object, got {}", record))
        })?;

        let get = |key: &str| map.get(key).unwrap_or(&Value::Null);

        Ok(Self {
            wallet_type: text_field(get("wallettype"), "wallettype")?,
            currency: text_field(get("currency"), "currency")?,
            balance: Scalar::from_value(get("balance")).ok_or_else(|| {
                MirrorError::malformed("wallet record", format!("balance is not a scalar: {}", get("balance")))
            })?,
            unsettled_interest: Scalar::from_value(get("unsettled_interest")),
            available_balance: None,
            extra: Vec::new(),
        })
    }

    /// True when this entry has the same `(walletType, currency)` key.
    pub fn same_key(&self, other: &WalletEntry) -> bool {
        self.wallet_type == other.wallet_type && self.currency == other.currency
    }

    /// Positional wire form, always at least five fields.
    pub fn to_row(&self) -> Value {
        let opt = |s: &Option<Scalar>| s.as_ref().map(Scalar::to_value).unwrap_or(Value::Null);

        let mut row = vec![
            Value::String(self.wallet_type.clone()),
            Value::String(self.currency.clone()),
            self.balance.to_value(),
            opt(&self.unsettled_interest),
            opt(&self.available_balance),
        ];
        row.extend(self.extra.iter().cloned());
        Value::Array(row)
    }
}

fn text_field(value: &Value, name: &str) -> Result<String, MirrorError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| MirrorError::malformed(WHAT, format!("{} is not a string: {}", name, value)))
}
