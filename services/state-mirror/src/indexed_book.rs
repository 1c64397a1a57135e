//! Identifier-indexed order book (R0 precision)
//!
//! Rows are individual orders `[id, price, amount]`, keyed by `id`.
//! A delta with price equal to the number zero deletes the order.
//!
//! In keyed mode an upsert only searches the side named by the incoming
//! amount's sign. An order whose amount flips sign is therefore appended to
//! the other side and its old row stays where it was, unlike the orders
//! mirror which searches both sides.

use tracing::{debug, trace};
use types::book::{BookEntry, BookState, IdEntry};
use types::errors::MirrorError;
use types::frame::FrameBody;

use crate::model::{BookDelta, FrameClass, ModelConfig, Parsed, Reconcile, StateRef, Update};
use crate::order_book::{classify_book, keyed_snapshot, parse_rows, SortOrder};

/// Order book mirror for raw (R0) book channels.
#[derive(Debug, Clone)]
pub struct IndexedOrderBook {
    config: ModelConfig,
    state: BookState<IdEntry>,
}

impl IndexedOrderBook {
    /// Empty book, raw or keyed per `config`.
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            state: BookState::empty(config.keyed),
        }
    }

    /// Factory entry for the component registry.
    pub fn boxed(config: ModelConfig) -> Box<dyn Reconcile> {
        Box::new(Self::new(config))
    }

    /// Current rows, without the `StateRef` wrapper.
    pub fn book(&self) -> &BookState<IdEntry> {
        &self.state
    }

    fn parse_snapshot(&self, body: FrameBody<'_>) -> Result<BookState<IdEntry>, MirrorError> {
        let rows = parse_rows::<IdEntry>(body.payload)?;

        if !self.config.keyed {
            return Ok(BookState::Raw(rows));
        }

        Ok(BookState::Keyed(keyed_snapshot(
            rows,
            SortOrder::Ascending,
            SortOrder::Descending,
        )))
    }

    fn parse_delta(&self, body: FrameBody<'_>) -> Result<BookDelta<IdEntry>, MirrorError> {
        let entry = IdEntry::from_row(body.payload)?;
        let side = self.config.keyed.then(|| entry.side());
        Ok(BookDelta { entry, side })
    }

    fn delete(&mut self, entry: &IdEntry) {
        let before = self.state.len();

        match &mut self.state {
            BookState::Raw(rows) => rows.retain(|row| row.id != entry.id),
            BookState::Keyed(sides) => {
                sides.bids.retain(|row| row.id != entry.id);
                sides.asks.retain(|row| row.id != entry.id);
            }
        }

        if self.state.len() == before {
            trace!(id = %entry.id, "Delete for unknown order id");
        }
    }

    fn upsert(&mut self, entry: IdEntry) {
        let rows = match &mut self.state {
            BookState::Raw(rows) => rows,
            BookState::Keyed(sides) => sides.side_mut(entry.side()),
        };

        match rows.iter().position(|row| row.id == entry.id) {
            Some(idx) => rows[idx] = entry,
            None => rows.push(entry),
        }
    }
}

impl Reconcile for IndexedOrderBook {
    fn name(&self) -> &'static str {
        "IndexedOrderBook"
    }

    fn classify(&self, body: FrameBody<'_>) -> FrameClass {
        classify_book(body)
    }

    fn parse(&self, body: FrameBody<'_>) -> Result<Parsed, MirrorError> {
        let update = match self.classify(body) {
            FrameClass::Snapshot => Update::Snapshot(self.parse_snapshot(body)?),
            FrameClass::Delta => Update::Delta(self.parse_delta(body)?),
        };
        Ok(Parsed::IndexedBook(update))
    }

    fn apply_snapshot(&mut self, body: FrameBody<'_>) -> Result<(), MirrorError> {
        self.state = self.parse_snapshot(body)?;
        debug!(orders = self.state.len(), keyed = self.config.keyed, "R0 snapshot applied");
        Ok(())
    }

    fn apply_delta(&mut self, body: FrameBody<'_>) -> Result<(), MirrorError> {
        let delta = self.parse_delta(body)?;

        if delta.entry.price.is_zero_number() {
            self.delete(&delta.entry);
        } else {
            self.upsert(delta.entry);
        }

        Ok(())
    }

    fn state(&self) -> StateRef<'_> {
        StateRef::IndexedBook(&self.state)
    }
}
