//! Reconciliation model contract
//!
//! Every entity kind is reconciled by a model implementing [`Reconcile`]:
//! - `classify` decides snapshot vs delta on every frame (never cached)
//! - `parse` is pure and returns the frame in the model's representation
//! - `apply_snapshot` replaces state wholesale
//! - `apply_delta` upserts one record or removes records per the kind's rule
//!
//! Models parse a frame completely before mutating state, so a malformed
//! frame leaves state untouched. Frames are borrowed, never copied or
//! mutated.

use std::fmt;

use serde::Deserialize;
use serde_json::Value;
use types::book::{BookEntry, BookState, IdEntry, LevelEntry, Side};
use types::errors::MirrorError;
use types::frame::FrameBody;
use types::order::{OrderEntry, OrdersState};
use types::position::{PositionEntry, PositionsState};
use types::record::Record;
use types::wallet::WalletEntry;

/// Outcome of classifying a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameClass {
    Snapshot,
    Delta,
}

/// Per-kind model configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ModelConfig {
    /// Keyed representation (`{bids, asks}` of labeled records) instead of
    /// raw rows. Fixed for the model's lifetime.
    #[serde(default)]
    pub keyed: bool,
}

impl ModelConfig {
    pub fn keyed() -> Self {
        Self { keyed: true }
    }
}

/// A parsed snapshot or delta
#[derive(Debug, Clone, PartialEq)]
pub enum Update<S, D> {
    Snapshot(S),
    Delta(D),
}

impl<S, D> Update<S, D> {
    pub fn is_snapshot(&self) -> bool {
        matches!(self, Update::Snapshot(_))
    }
}

/// One order book delta. `side` is set in keyed mode.
#[derive(Debug, Clone, PartialEq)]
pub struct BookDelta<E> {
    pub entry: E,
    pub side: Option<Side>,
}

impl<E: BookEntry> BookDelta<E> {
    pub fn to_value(&self) -> Value {
        match self.side {
            Some(_) => self.entry.to_record(),
            None => self.entry.to_row(),
        }
    }
}

/// Frame as parsed by a model, handed to consumer callbacks
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed {
    IndexedBook(Update<BookState<IdEntry>, BookDelta<IdEntry>>),
    LevelBook(Update<BookState<LevelEntry>, BookDelta<LevelEntry>>),
    Wallets(Update<Vec<WalletEntry>, WalletEntry>),
    Orders(Update<OrdersState, Record<OrderEntry>>),
    Positions(Update<PositionsState, Record<PositionEntry>>),
    /// Whole frame for kinds without a model (trades)
    Raw(Value),
}

impl Parsed {
    pub fn is_snapshot(&self) -> bool {
        match self {
            Parsed::IndexedBook(u) => u.is_snapshot(),
            Parsed::LevelBook(u) => u.is_snapshot(),
            Parsed::Wallets(u) => u.is_snapshot(),
            Parsed::Orders(u) => u.is_snapshot(),
            Parsed::Positions(u) => u.is_snapshot(),
            Parsed::Raw(_) => false,
        }
    }

    /// JSON view in the same shape the venue sent (raw) or as labeled
    /// records (keyed).
    pub fn to_value(&self) -> Value {
        match self {
            Parsed::IndexedBook(Update::Snapshot(s)) => s.to_value(),
            Parsed::IndexedBook(Update::Delta(d)) => d.to_value(),
            Parsed::LevelBook(Update::Snapshot(s)) => s.to_value(),
            Parsed::LevelBook(Update::Delta(d)) => d.to_value(),
            Parsed::Wallets(Update::Snapshot(rows)) => {
                Value::Array(rows.iter().map(WalletEntry::to_row).collect())
            }
            Parsed::Wallets(Update::Delta(entry)) => entry.to_row(),
            Parsed::Orders(Update::Snapshot(s)) => s.to_value(),
            Parsed::Orders(Update::Delta(Record::Raw(row))) => row.clone(),
            Parsed::Orders(Update::Delta(Record::Keyed(order))) => order.to_record(),
            Parsed::Positions(Update::Snapshot(s)) => s.to_value(),
            Parsed::Positions(Update::Delta(Record::Raw(row))) => row.clone(),
            Parsed::Positions(Update::Delta(Record::Keyed(position))) => position.to_record(),
            Parsed::Raw(frame) => frame.clone(),
        }
    }
}

/// Read-only view of a model's current state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StateRef<'a> {
    IndexedBook(&'a BookState<IdEntry>),
    LevelBook(&'a BookState<LevelEntry>),
    Wallets(&'a [WalletEntry]),
    Orders(&'a OrdersState),
    Positions(&'a PositionsState),
}

impl<'a> StateRef<'a> {
    pub fn len(&self) -> usize {
        match self {
            StateRef::IndexedBook(s) => s.len(),
            StateRef::LevelBook(s) => s.len(),
            StateRef::Wallets(rows) => rows.len(),
            StateRef::Orders(s) => s.len(),
            StateRef::Positions(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_value(&self) -> Value {
        match self {
            StateRef::IndexedBook(s) => s.to_value(),
            StateRef::LevelBook(s) => s.to_value(),
            StateRef::Wallets(rows) => Value::Array(rows.iter().map(WalletEntry::to_row).collect()),
            StateRef::Orders(s) => s.to_value(),
            StateRef::Positions(s) => s.to_value(),
        }
    }
}

/// Reconciliation model for one entity kind in one scope.
pub trait Reconcile: fmt::Debug {
    /// Model name, used in logs and errors.
    fn name(&self) -> &'static str;

    fn classify(&self, body: FrameBody<'_>) -> FrameClass;

    /// Parse without touching state.
    fn parse(&self, body: FrameBody<'_>) -> Result<Parsed, MirrorError>;

    fn apply_snapshot(&mut self, body: FrameBody<'_>) -> Result<(), MirrorError>;

    fn apply_delta(&mut self, body: FrameBody<'_>) -> Result<(), MirrorError>;

    fn state(&self) -> StateRef<'_>;

    /// Parse, classify, apply. Returns the parsed frame.
    fn update(&mut self, body: FrameBody<'_>) -> Result<Parsed, MirrorError> {
        let parsed = self.parse(body)?;

        match self.classify(body) {
            FrameClass::Snapshot => self.apply_snapshot(body)?,
            FrameClass::Delta => self.apply_delta(body)?,
        }

        Ok(parsed)
    }
}
