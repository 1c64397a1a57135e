//! Margin position types
//!
//! Positions are keyed by symbol, one per trading pair.

use serde_json::Value;

use crate::errors::MirrorError;
use crate::record::{project, FieldMap};

const WHAT: &str = "position row";

/// Labels and wire indexes of the projected position fields
pub const POSITION_FIELDS: &FieldMap = &[
    ("symbol", 0),
    ("status", 1),
    ("amount", 2),
    ("basePrice", 3),
    ("marginFunding", 4),
    ("marginFundingType", 5),
    ("pl", 6),
    ("plPerc", 7),
    ("priceLiq", 8),
    ("leverage", 9),
];

/// An open margin position
#[derive(Debug, Clone, PartialEq)]
pub struct PositionEntry {
    pub symbol: String,
    row: Vec<Value>,
}

impl PositionEntry {
    pub fn from_row(row: &Value) -> Result<Self, MirrorError> {
        let fields = row
            .as_array()
            .ok_or_else(|| MirrorError::malformed(WHAT, format!("expected an array, got {}", row)))?;

        Ok(Self {
            symbol: Self::symbol_of(row)?.to_string(),
            row: fields.clone(),
        })
    }

    /// Symbol of a raw row, without projecting it.
    pub fn symbol_of(row: &Value) -> Result<&str, MirrorError> {
        row.get(0)
            .and_then(Value::as_str)
            .ok_or_else(|| MirrorError::malformed(WHAT, format!("missing symbol in {}", row)))
    }

    /// Labeled record through `POSITION_FIELDS`.
    pub fn to_record(&self) -> Value {
        project(&self.row, POSITION_FIELDS)
    }
}

/// Positions state in the scope's representation mode
#[derive(Debug, Clone, PartialEq)]
pub enum PositionsState {
    Raw(Vec<Value>),
    Keyed(Vec<PositionEntry>),
}

impl PositionsState {
    pub fn empty(keyed: bool) -> Self {
        if keyed {
            PositionsState::Keyed(Vec::new())
        } else {
            PositionsState::Raw(Vec::new())
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PositionsState::Raw(rows) => rows.len(),
            PositionsState::Keyed(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_value(&self) -> Value {
        match self {
            PositionsState::Raw(rows) => Value::Array(rows.clone()),
            PositionsState::Keyed(entries) => {
                Value::Array(entries.iter().map(PositionEntry::to_record).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_projection() {
        let row = json!(["tBTCUSD", "ACTIVE", 0.5, 7000, 0.001, 0, 12.5, 0.35, 4000, 2.1]);
        let entry = PositionEntry::from_row(&row).unwrap();
        let record = entry.to_record();
        assert_eq!(record["symbol"], json!("tBTCUSD"));
        assert_eq!(record["basePrice"], json!(7000));
        assert_eq!(record["leverage"], json!(2.1));
    }

    #[test]
    fn test_missing_symbol() {
        assert!(PositionEntry::from_row(&json!([null, "ACTIVE"])).is_err());
        assert!(PositionEntry::symbol_of(&json!("tBTCUSD")).is_err());
    }
}
