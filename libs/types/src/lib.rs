//! Shared market data types for Feedhub
//!
//! Defines the normalized event model produced by the connector hub and
//! consumed by downstream collectors, plus the symbol configuration used to
//! route subscription requests. Venue-specific wire formats never appear
//! here; adapters translate into these types at the boundary.

pub mod events;
pub mod symbol;
pub mod time;

pub use events::{
    AggressorSide, BookSide, DepthEvent, DepthOperation, TopOfBookEvent, TradeEvent,
};
pub use symbol::{SubscriptionKind, SymbolConfig};
