//! Shared order book reconciliation helpers
//!
//! Both book variants classify frames the same way and build keyed
//! snapshots the same way, differing only in sort direction per side:
//!
//! | Variant       | bids       | asks       |
//! |---------------|------------|------------|
//! | R0 (indexed)  | ascending  | descending |
//! | P0 (levels)   | descending | ascending  |
//!
//! Top-of-book lookups ignore those conventions and scan by price.

use std::cmp::Ordering;

use serde_json::Value;
use types::book::{BookEntry, BookState, Sides};
use types::errors::MirrorError;
use types::frame::FrameBody;

use crate::model::{FrameClass, StateRef};

/// Price sort direction within one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    fn apply(self, ord: Ordering) -> Ordering {
        match self {
            SortOrder::Ascending => ord,
            SortOrder::Descending => ord.reverse(),
        }
    }
}

/// A book frame is a snapshot when its payload is empty, is not a row, or
/// starts with a row.
pub fn classify_book(body: FrameBody<'_>) -> FrameClass {
    match body.payload.as_array().and_then(|items| items.first()) {
        None => FrameClass::Snapshot,
        Some(Value::Array(_)) => FrameClass::Snapshot,
        Some(_) => FrameClass::Delta,
    }
}

/// Parse every row of a snapshot payload.
pub fn parse_rows<E: BookEntry>(payload: &Value) -> Result<Vec<E>, MirrorError> {
    let rows = payload.as_array().ok_or_else(|| {
        MirrorError::malformed("book snapshot", format!("expected an array of rows, got {}", payload))
    })?;

    rows.iter().map(E::from_row).collect()
}

/// Partition rows by amount sign and sort each side by price.
///
/// Positive amounts are bids, negative amounts asks. Zero and non-numeric
/// amounts are dropped. Sorting is stable, so equal prices keep arrival
/// order.
pub fn keyed_snapshot<E: BookEntry>(rows: Vec<E>, bids: SortOrder, asks: SortOrder) -> Sides<E> {
    let mut sides = Sides::default();

    for row in rows {
        if row.amount().is_positive() {
            sides.bids.push(row);
        } else if row.amount().is_negative() {
            sides.asks.push(row);
        }
    }

    sides
        .bids
        .sort_by(|a, b| bids.apply(a.price().numeric_cmp(b.price())));
    sides
        .asks
        .sort_by(|a, b| asks.apply(a.price().numeric_cmp(b.price())));

    sides
}

/// Highest-priced bid and lowest-priced ask of a book.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BestLevels<'a, E> {
    pub bid: Option<&'a E>,
    pub ask: Option<&'a E>,
}

impl<E: BookEntry> BestLevels<'_, E> {
    /// Both levels as positional wire rows, `null` for an empty side.
    pub fn to_rows(&self) -> (Value, Value) {
        let row = |level: Option<&E>| level.map(E::to_row).unwrap_or(Value::Null);
        (row(self.bid), row(self.ask))
    }
}

/// Best levels of either book layout.
///
/// Raw rows are split by amount sign, positive for bids. Prices compare
/// numerically and the earliest row wins a tie.
pub fn best_levels<E: BookEntry>(state: &BookState<E>) -> BestLevels<'_, E> {
    match state {
        BookState::Raw(rows) => BestLevels {
            bid: pick(rows.iter().filter(|row| row.amount().is_positive()), Ordering::Greater),
            ask: pick(rows.iter().filter(|row| row.amount().is_negative()), Ordering::Less),
        },
        BookState::Keyed(sides) => BestLevels {
            bid: pick(sides.bids.iter(), Ordering::Greater),
            ask: pick(sides.asks.iter(), Ordering::Less),
        },
    }
}

/// Best bid and ask rows of a mirrored book; `None` for other components.
pub fn top_of_book(state: StateRef<'_>) -> Option<(Value, Value)> {
    match state {
        StateRef::IndexedBook(book) => Some(best_levels(book).to_rows()),
        StateRef::LevelBook(book) => Some(best_levels(book).to_rows()),
        _ => None,
    }
}

fn pick<'a, E: BookEntry + 'a>(rows: impl Iterator<Item = &'a E>, wins: Ordering) -> Option<&'a E> {
    rows.fold(None, |best, row| match best {
        Some(current) if row.price().numeric_cmp(current.price()) != wins => Some(current),
        _ => Some(row),
    })
}
