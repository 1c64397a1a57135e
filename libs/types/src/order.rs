//! Working order types
//!
//! Order rows are positional arrays. Keyed representations label them with
//! `ORDER_FIELDS` and split them by amount sign.

use serde_json::Value;

use crate::book::{scalar_field, Side, Sides};
use crate::errors::MirrorError;
use crate::record::{project, FieldMap};
use crate::scalar::Scalar;

const WHAT: &str = "order row";

/// Labels and wire indexes of the projected order fields
pub const ORDER_FIELDS: &FieldMap = &[
    ("id", 0),
    ("gid", 1),
    ("cid", 2),
    ("symbol", 3),
    ("mtsCreate", 4),
    ("mtsUpdate", 5),
    ("amount", 6),
    ("amountOrig", 7),
    ("type", 8),
    ("typePrev", 9),
    ("flags", 12),
    ("status", 13),
    ("price", 16),
    ("priceAvg", 17),
];

const ID: usize = 0;
const SYMBOL: usize = 3;
const AMOUNT: usize = 6;

/// A working order
#[derive(Debug, Clone, PartialEq)]
pub struct OrderEntry {
    pub id: Scalar,
    /// Trading pair, e.g. `tBTCUSD`
    pub symbol: Option<String>,
    pub amount: Scalar,
    row: Vec<Value>,
}

impl OrderEntry {
    pub fn from_row(row: &Value) -> Result<Self, MirrorError> {
        let fields = order_fields(row)?;

        Ok(Self {
            id: scalar_field(fields, ID, WHAT, "id")?,
            symbol: fields.get(SYMBOL).and_then(Value::as_str).map(str::to_string),
            amount: scalar_field(fields, AMOUNT, WHAT, "amount")?,
            row: fields.to_vec(),
        })
    }

    /// Order id of a raw row, without projecting it.
    pub fn id_of(row: &Value) -> Result<Scalar, MirrorError> {
        scalar_field(order_fields(row)?, ID, WHAT, "id")
    }

    /// Trading pair of a raw row, if present.
    pub fn symbol_of(row: &Value) -> Option<&str> {
        row.get(SYMBOL).and_then(Value::as_str)
    }

    pub fn side(&self) -> Side {
        Side::of_amount(&self.amount)
    }

    /// Labeled record through `ORDER_FIELDS`.
    pub fn to_record(&self) -> Value {
        project(&self.row, ORDER_FIELDS)
    }

    /// The row as received.
    pub fn to_row(&self) -> Value {
        Value::Array(self.row.clone())
    }
}

fn order_fields(row: &Value) -> Result<&[Value], MirrorError> {
    row.as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| MirrorError::malformed(WHAT, format!("expected an array, got {}", row)))
}

/// Orders state in the scope's representation mode
#[derive(Debug, Clone, PartialEq)]
pub enum OrdersState {
    /// Rows as received
    Raw(Vec<Value>),
    /// Labeled records split by amount sign
    Keyed(Sides<OrderEntry>),
}

impl OrdersState {
    pub fn empty(keyed: bool) -> Self {
        if keyed {
            OrdersState::Keyed(Sides::default())
        } else {
            OrdersState::Raw(Vec::new())
        }
    }

    pub fn len(&self) -> usize {
        match self {
            OrdersState::Raw(rows) => rows.len(),
            OrdersState::Keyed(sides) => sides.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_value(&self) -> Value {
        match self {
            OrdersState::Raw(rows) => Value::Array(rows.clone()),
            OrdersState::Keyed(sides) => sides.to_value_with(OrderEntry::to_record),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn order_row(id: u64, symbol: &str, amount: f64) -> Value {
        json!([
            id, null, 1234, symbol, 1573000000000u64, 1573000000001u64, amount, amount,
            "EXCHANGE LIMIT", null, null, null, 0, "ACTIVE", null, null, 7200.5, 0,
            0, 0, null, null, null, 0, 0, null, null, null, "API>BFX", null, null, null
        ])
    }

    #[test]
    fn test_projection_labels_fields() {
        let entry = OrderEntry::from_row(&order_row(42, "tBTCUSD", -0.5)).unwrap();
        let record = entry.to_record();

        assert_eq!(record["id"], json!(42));
        assert_eq!(record["symbol"], json!("tBTCUSD"));
        assert_eq!(record["amount"], json!(-0.5));
        assert_eq!(record["type"], json!("EXCHANGE LIMIT"));
        assert_eq!(record["status"], json!("ACTIVE"));
        assert_eq!(record["price"], json!(7200.5));
        assert_eq!(record.as_object().unwrap().len(), ORDER_FIELDS.len());
        assert_eq!(entry.side(), Side::Ask);
    }

    #[test]
    fn test_symbol_of_raw_row() {
        assert_eq!(OrderEntry::symbol_of(&order_row(1, "tETHUSD", 1.0)), Some("tETHUSD"));
        assert_eq!(OrderEntry::symbol_of(&json!([1])), None);
    }

    #[test]
    fn test_missing_amount_is_malformed() {
        let err = OrderEntry::from_row(&json!([1, null, 2, "tBTCUSD"])).unwrap_err();
        assert!(err.to_string().contains("amount"));
    }

    #[test]
    fn test_id_of() {
        assert_eq!(OrderEntry::id_of(&json!([9])).unwrap(), Scalar::from(9));
        assert!(OrderEntry::id_of(&json!({"id": 9})).is_err());
    }
}
