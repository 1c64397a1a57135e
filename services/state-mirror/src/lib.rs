//! State Mirror Service
//!
//! Keeps a local, continuously reconciled copy of exchange state from a
//! websocket feed:
//! - Order books in two wire variants (identifier-indexed R0, price-level P0)
//! - Wallet balances (array rows or keyed records)
//! - Open orders, mirrored globally and per trading pair
//! - Open positions
//! - Public and private trade pass-through to consumer callbacks
//!
//! Each entity kind is mirrored per scope (`default` or one symbol), in raw
//! (venue row) or keyed (labeled, split by side) representation.
//!
//! # Architecture
//!
//! ```text
//!   Websocket feed
//!        │
//!  ┌─────▼─────┐
//!  │ WsConnect │  ← Decodes frames, tracks subscriptions
//!  └─────┬─────┘
//!        │
//! ┌──────▼──────────┐
//! │ FrameDispatcher │  ← Classifies, binds channels, routes by (kind, scope)
//! └──────┬──────────┘
//!        │
//! ┌──────▼────────────┐
//! │ ComponentRegistry │  ← One model per (kind, scope), created lazily
//! └──────┬────────────┘
//!        │
//!   ┌────┴─────┬─────────┬─────────┐
//!   │          │         │         │
//! ┌─▼──┐  ┌────▼───┐  ┌──▼───┐  ┌──▼──────┐
//! │Book│  │Wallets │  │Orders│  │Positions│
//! └─┬──┘  └────┬───┘  └──┬───┘  └──┬──────┘
//!   │          │         │         │
//! ┌─▼──────────▼─────────▼─────────▼──┐
//! │  Callbacks (parsed frame, state)  │
//! └───────────────────────────────────┘
//! ```

pub mod callbacks;
pub mod channels;
pub mod config;
pub mod dispatcher;
pub mod indexed_book;
pub mod level_book;
pub mod model;
pub mod order_book;
pub mod orders;
pub mod positions;
pub mod registry;
pub mod transport;
pub mod wallet;

// Library version
pub const SERVICE_VERSION: &str = "0.1.0";
