//! Types library for the exchange state mirror
//!
//! This library provides the wire and entity type definitions shared by the
//! reconciliation models, the component registry and the frame dispatcher.
//! Numeric wire fields keep their original JSON form so that mirrored state
//! re-serialises exactly as it was received.
//!
//! # Modules
//! - `scalar`: Wire scalars (number or decimal text) with decimal ordering
//! - `book`: Order book entries (identifier-indexed, price-level) and sides
//! - `wallet`: Wallet balance rows
//! - `order`: Working order rows and the order field map
//! - `position`: Margin position rows and the position field map
//! - `record`: Field-map projection and raw/keyed delta records
//! - `kind`: Entity kinds, scopes and channel categories
//! - `frame`: Inbound frame classification
//! - `errors`: Error taxonomy

// Public modules
pub mod scalar;
pub mod book;
pub mod wallet;
pub mod order;
pub mod position;
pub mod record;
pub mod kind;
pub mod frame;
pub mod errors;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::scalar::*;
    pub use crate::book::*;
    pub use crate::wallet::*;
    pub use crate::order::*;
    pub use crate::position::*;
    pub use crate::record::*;
    pub use crate::kind::*;
    pub use crate::frame::*;
    pub use crate::errors::*;
}
