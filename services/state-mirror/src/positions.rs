//! Margin positions reconciliation
//!
//! `ps` snapshot, `pn`/`pu` upsert by symbol, `pc` remove by symbol.
//! Held in the `default` scope only.

use tracing::debug;
use types::errors::MirrorError;
use types::frame::FrameBody;
use types::position::{PositionEntry, PositionsState};
use types::record::Record;

use crate::model::{FrameClass, ModelConfig, Parsed, Reconcile, StateRef, Update};

/// Snapshot tag
pub const POSITIONS_SNAPSHOT: &str = "ps";
/// Close tag; the position's symbol is removed
pub const POSITIONS_CLOSE: &str = "pc";

/// Margin positions mirror, one entry per symbol.
#[derive(Debug, Clone)]
pub struct PositionsModel {
    config: ModelConfig,
    state: PositionsState,
}

impl PositionsModel {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            state: PositionsState::empty(config.keyed),
        }
    }

    pub fn boxed(config: ModelConfig) -> Box<dyn Reconcile> {
        Box::new(Self::new(config))
    }

    fn parse_snapshot(&self, body: FrameBody<'_>) -> Result<PositionsState, MirrorError> {
        let rows = body.payload.as_array().ok_or_else(|| {
            MirrorError::malformed(
                "positions snapshot",
                format!("expected an array of rows, got {}", body.payload),
            )
        })?;

        if self.config.keyed {
            let entries = rows
                .iter()
                .map(PositionEntry::from_row)
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(PositionsState::Keyed(entries));
        }

        for row in rows {
            PositionEntry::symbol_of(row)?;
        }
        Ok(PositionsState::Raw(rows.clone()))
    }

    fn parse_delta(&self, body: FrameBody<'_>) -> Result<Record<PositionEntry>, MirrorError> {
        if self.config.keyed {
            return Ok(Record::Keyed(PositionEntry::from_row(body.payload)?));
        }

        PositionEntry::symbol_of(body.payload)?;
        Ok(Record::Raw(body.payload.clone()))
    }
}

impl Reconcile for PositionsModel {
    fn name(&self) -> &'static str {
        "PositionsModel"
    }

    fn classify(&self, body: FrameBody<'_>) -> FrameClass {
        if body.tag == Some(POSITIONS_SNAPSHOT) {
            FrameClass::Snapshot
        } else {
            FrameClass::Delta
        }
    }

    fn parse(&self, body: FrameBody<'_>) -> Result<Parsed, MirrorError> {
        let update = match self.classify(body) {
            FrameClass::Snapshot => Update::Snapshot(self.parse_snapshot(body)?),
            FrameClass::Delta => Update::Delta(self.parse_delta(body)?),
        };
        Ok(Parsed::Positions(update))
    }

    fn apply_snapshot(&mut self, body: FrameBody<'_>) -> Result<(), MirrorError> {
        self.state = self.parse_snapshot(body)?;
        debug!(positions = self.state.len(), "Positions snapshot applied");
        Ok(())
    }

    fn apply_delta(&mut self, body: FrameBody<'_>) -> Result<(), MirrorError> {
        let close = body.tag == Some(POSITIONS_CLOSE);

        match &mut self.state {
            PositionsState::Raw(rows) => {
                let symbol = PositionEntry::symbol_of(body.payload)?;
                let idx = rows
                    .iter()
                    .position(|r| PositionEntry::symbol_of(r).ok() == Some(symbol));
                match (idx, close) {
                    (Some(idx), true) => {
                        rows.remove(idx);
                    }
                    (Some(idx), false) => rows[idx] = body.payload.clone(),
                    (None, false) => rows.push(body.payload.clone()),
                    (None, true) => {}
                }
            }
            PositionsState::Keyed(entries) => {
                let entry = PositionEntry::from_row(body.payload)?;
                let idx = entries.iter().position(|e| e.symbol == entry.symbol);
                match (idx, close) {
                    (Some(idx), true) => {
                        entries.remove(idx);
                    }
                    (Some(idx), false) => entries[idx] = entry,
                    (None, false) => entries.push(entry),
                    (None, true) => {}
                }
            }
        }

        Ok(())
    }

    fn state(&self) -> StateRef<'_> {
        StateRef::Positions(&self.state)
    }
}
