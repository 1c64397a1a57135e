//! Order book entry types
//!
//! Two wire variants exist and are never mixed within one scope:
//! - `IdEntry`: identifier-indexed rows `[id, price, amount]` (raw books, R0)
//! - `LevelEntry`: aggregated price levels `[price, count, amount]` (P0)
//!
//! Side is never stored on the wire. A negative amount is an ask, anything
//! else is a bid.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::errors::MirrorError;
use crate::scalar::Scalar;

/// Book side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Bid (amount >= 0)
    Bid,
    /// Ask (amount < 0)
    Ask,
}

impl Side {
    /// Side implied by an amount's sign.
    pub fn of_amount(amount: &Scalar) -> Self {
        if amount.has_negative_sign() {
            Side::Ask
        } else {
            Side::Bid
        }
    }

    /// Key used in keyed representations.
    pub fn key(&self) -> &'static str {
        match self {
            Side::Bid => "bids",
            Side::Ask => "asks",
        }
    }
}

/// Split a row into exactly `n` fields.
pub(crate) fn row_fields<'a>(
    row: &'a Value,
    what: &'static str,
    n: usize,
) -> Result<&'a [Value], MirrorError> {
    let fields = row
        .as_array()
        .ok_or_else(|| MirrorError::malformed(what, format!("expected an array, got {}", row)))?;

    if fields.len() != n {
        return Err(MirrorError::malformed(
            what,
            format!("expected {} fields, got {}", n, fields.len()),
        ));
    }

    Ok(fields)
}

/// Read a scalar field, failing on null or structured values.
pub(crate) fn scalar_field(
    fields: &[Value],
    idx: usize,
    what: &'static str,
    name: &str,
) -> Result<Scalar, MirrorError> {
    let value = fields.get(idx).unwrap_or(&Value::Null);
    Scalar::from_value(value)
        .ok_or_else(|| MirrorError::malformed(what, format!("{} is not a scalar: {}", name, value)))
}

/// A single order book entry, in either wire variant.
pub trait BookEntry: Clone + std::fmt::Debug + PartialEq {
    /// Used in error messages.
    const WHAT: &'static str;

    /// Parse a wire row.
    fn from_row(row: &Value) -> Result<Self, MirrorError>;

    /// Back to the positional wire form.
    fn to_row(&self) -> Value;

    /// Labeled record used by keyed representations.
    fn to_record(&self) -> Value;

    fn price(&self) -> &Scalar;

    fn amount(&self) -> &Scalar;

    fn side(&self) -> Side {
        Side::of_amount(self.amount())
    }
}

/// Identifier-indexed order `[id, price, amount]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdEntry {
    pub id: Scalar,
    pub price: Scalar,
    pub amount: Scalar,
}

impl BookEntry for IdEntry {
    const WHAT: &'static str = "raw book row";

    fn from_row(row: &Value) -> Result<Self, MirrorError> {
        let fields = row_fields(row, Self::WHAT, 3)?;
        Ok(Self {
            id: scalar_field(fields, 0, Self::WHAT, "id")?,
            price: scalar_field(fields, 1, Self::WHAT, "price")?,
            amount: scalar_field(fields, 2, Self::WHAT, "amount")?,
        })
    }

    fn to_row(&self) -> Value {
        json!([self.id, self.price, self.amount])
    }

    fn to_record(&self) -> Value {
        json!({ "id": self.id, "price": self.price, "amount": self.amount })
    }

    fn price(&self) -> &Scalar {
        &self.price
    }

    fn amount(&self) -> &Scalar {
        &self.amount
    }
}

/// Aggregated price level `[price, count, amount]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelEntry {
    pub price: Scalar,
    pub count: Scalar,
    pub amount: Scalar,
}

impl BookEntry for LevelEntry {
    const WHAT: &'static str = "book level";

    fn from_row(row: &Value) -> Result<Self, MirrorError> {
        let fields = row_fields(row, Self::WHAT, 3)?;
        Ok(Self {
            price: scalar_field(fields, 0, Self::WHAT, "price")?,
            count: scalar_field(fields, 1, Self::WHAT, "count")?,
            amount: scalar_field(fields, 2, Self::WHAT, "amount")?,
        })
    }

    fn to_row(&self) -> Value {
        json!([self.price, self.count, self.amount])
    }

    fn to_record(&self) -> Value {
        json!({ "price": self.price, "count": self.count, "amount": self.amount })
    }

    fn price(&self) -> &Scalar {
        &self.price
    }

    fn amount(&self) -> &Scalar {
        &self.amount
    }
}

/// Keyed representation: exactly two members, `bids` and `asks`.
#[derive(Debug, Clone, PartialEq)]
pub struct Sides<T> {
    pub bids: Vec<T>,
    pub asks: Vec<T>,
}

impl<T> Default for Sides<T> {
    fn default() -> Self {
        Self {
            bids: Vec::new(),
            asks: Vec::new(),
        }
    }
}

impl<T> Sides<T> {
    pub fn side(&self, side: Side) -> &[T] {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    pub fn side_mut(&mut self, side: Side) -> &mut Vec<T> {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }

    /// Total records on both sides.
    pub fn len(&self) -> usize {
        self.bids.len() + self.asks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render as `{"bids": [...], "asks": [...]}` using `record` per entry.
    pub fn to_value_with(&self, record: impl Fn(&T) -> Value) -> Value {
        let mut map = Map::new();
        map.insert("bids".to_string(), Value::Array(self.bids.iter().map(&record).collect()));
        map.insert("asks".to_string(), Value::Array(self.asks.iter().map(&record).collect()));
        Value::Object(map)
    }
}

/// Order book state in the scope's representation mode.
#[derive(Debug, Clone, PartialEq)]
pub enum BookState<E> {
    /// Ordered rows, arrival order
    Raw(Vec<E>),
    /// Records split by side, sorted per variant on snapshot
    Keyed(Sides<E>),
}

impl<E: BookEntry> BookState<E> {
    /// Empty state for the given mode.
    pub fn empty(keyed: bool) -> Self {
        if keyed {
            BookState::Keyed(Sides::default())
        } else {
            BookState::Raw(Vec::new())
        }
    }

    pub fn len(&self) -> usize {
        match self {
            BookState::Raw(rows) => rows.len(),
            BookState::Keyed(sides) => sides.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// JSON view: rows in raw mode, `{bids, asks}` of records in keyed mode.
    pub fn to_value(&self) -> Value {
        match self {
            BookState::Raw(rows) => Value::Array(rows.iter().map(E::to_row).collect()),
            BookState::Keyed(sides) => sides.to_value_with(E::to_record),
        }
    }
}
