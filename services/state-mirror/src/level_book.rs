//! Price-level order book (P0..P4 precision)
//!
//! Rows are aggregated levels `[price, count, amount]`. A delta with count
//! equal to the number zero removes the level.
//!
//! Raw mode reproduces the venue reference client exactly:
//! - delete keeps a row only when both its price and its amount differ from
//!   the delta's, so a coincidental amount match on another level also
//!   removes that level
//! - upsert merges only when prices match and both amounts are negative;
//!   bid-side updates always append
//!
//! Keyed mode searches only the side named by the delta amount's sign, for
//! deletes and upserts alike. A level whose amount flips sign is added to
//! the other side and its old row is left in place.

use tracing::debug;
use types::book::{BookEntry, BookState, LevelEntry};
use types::errors::MirrorError;
use types::frame::FrameBody;

use crate::model::{BookDelta, FrameClass, ModelConfig, Parsed, Reconcile, StateRef, Update};
use crate::order_book::{classify_book, keyed_snapshot, parse_rows, SortOrder};

/// Order book mirror for aggregated (P0) book channels.
#[derive(Debug, Clone)]
pub struct PriceLevelOrderBook {
    config: ModelConfig,
    state: BookState<LevelEntry>,
}

impl PriceLevelOrderBook {
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

    /// Current levels, without the `StateRef` wrapper.
    pub fn book(&self) -> &BookState<LevelEntry> {
        &self.state
    }

    fn parse_snapshot(&self, body: FrameBody<'_>) -> Result<BookState<LevelEntry>, MirrorError> {
        let rows = parse_rows::<LevelEntry>(body.payload)?;

        if !self.config.keyed {
            return Ok(BookState::Raw(rows));
        }

        Ok(BookState::Keyed(keyed_snapshot(
            rows,
            SortOrder::Descending,
            SortOrder::Ascending,
        )))
    }

    fn parse_delta(&self, body: FrameBody<'_>) -> Result<BookDelta<LevelEntry>, MirrorError> {
        let entry = LevelEntry::from_row(body.payload)?;
        let side = self.config.keyed.then(|| entry.side());
        Ok(BookDelta { entry, side })
    }

    fn delete(&mut self, entry: &LevelEntry) {
        match &mut self.state {
            BookState::Raw(rows) => {
                rows.retain(|row| row.price != entry.price && row.amount != entry.amount)
            }
            BookState::Keyed(sides) => sides
                .side_mut(entry.side())
                .retain(|row| row.price != entry.price),
        }
    }

    fn upsert(&mut self, entry: LevelEntry) {
        match &mut self.state {
            BookState::Raw(rows) => {
                let ask = entry.amount.has_negative_sign();
                let idx = rows.iter().position(|row| {
                    row.price == entry.price && ask && row.amount.has_negative_sign()
                });

                match idx {
                    Some(idx) => rows[idx] = entry,
                    None => rows.push(entry),
                }
            }
            BookState::Keyed(sides) => {
                let rows = sides.side_mut(entry.side());

                match rows.iter().position(|row| row.price == entry.price) {
                    Some(idx) => rows[idx] = entry,
                    None => rows.push(entry),
                }
            }
        }
    }
}

impl Reconcile for PriceLevelOrderBook {
    fn name(&self) -> &'static str {
        "PriceLevelOrderBook"
    }

    fn classify(&self, body: FrameBody<'_>) -> FrameClass {
        classify_book(body)
    }

    fn parse(&self, body: FrameBody<'_>) -> Result<Parsed, MirrorError> {
        let update = match self.classify(body) {
            FrameClass::Snapshot => Update::Snapshot(self.parse_snapshot(body)?),
            FrameClass::Delta => Update::Delta(self.parse_delta(body)?),
        };
        Ok(Parsed::LevelBook(update))
    }

    fn apply_snapshot(&mut self, body: FrameBody<'_>) -> Result<(), MirrorError> {
        self.state = self.parse_snapshot(body)?;
        debug!(levels = self.state.len(), keyed = self.config.keyed, "P0 snapshot applied");
        Ok(())
    }

    fn apply_delta(&mut self, body: FrameBody<'_>) -> Result<(), MirrorError> {
        let delta = self.parse_delta(body)?;

        if delta.entry.count.is_zero_number() {
            self.delete(&delta.entry);
        } else {
            self.upsert(delta.entry);
        }

        Ok(())
    }

    fn state(&self) -> StateRef<'_> {
        StateRef::LevelBook(&self.state)
    }
}
