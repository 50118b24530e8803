//! Normalized market data events
//!
//! All timestamps are nanoseconds since the Unix epoch. Prices and sizes use
//! `rust_decimal::Decimal` to preserve exchange precision end to end.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Trade side from the aggressor (taker) perspective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggressorSide {
    /// Taker bought (lifted the offer)
    Buy,
    /// Taker sold (hit the bid)
    Sell,
    /// Venue did not report the aggressor
    Unknown,
}

/// Order book side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookSide {
    /// Bid (buy) side
    Bid,
    /// Ask (sell) side
    Ask,
}

/// Depth level mutation reported by a venue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DepthOperation {
    /// New level inserted at the index
    Insert,
    /// Existing level changed in place
    Update,
    /// Level removed from the book
    Delete,
}

/// A single executed trade, normalized across venues
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    /// Execution time on the venue, nanoseconds since epoch
    pub timestamp_ns: u64,
    /// Local symbol key (hub-side, not the venue's native id)
    pub symbol: String,
    /// Execution price
    pub price: Decimal,
    /// Executed size
    pub size: Decimal,
    /// Aggressor side
    pub aggressor: AggressorSide,
    /// Venue-assigned sequence number, 0 when not provided
    pub sequence: u64,
    /// Identifier of the originating data stream within the venue
    pub stream_id: String,
    /// Venue (adapter) identifier
    pub venue: String,
}

/// One order book level change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthEvent {
    /// Venue timestamp, nanoseconds since epoch
    pub timestamp_ns: u64,
    /// Local symbol key
    pub symbol: String,
    /// Zero-based level index from the top of the side
    pub level: u8,
    /// Mutation kind
    pub operation: DepthOperation,
    /// Book side the mutation applies to
    pub side: BookSide,
    /// Level price
    pub price: Decimal,
    /// Level size after the mutation (ignored for deletes)
    pub size: Decimal,
    /// Venue (adapter) identifier
    pub venue: String,
}

/// Best bid/offer snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopOfBookEvent {
    /// Venue timestamp, nanoseconds since epoch
    pub timestamp_ns: u64,
    /// Local symbol key
    pub symbol: String,
    /// Best bid price
    pub bid_price: Decimal,
    /// Size at the best bid
    pub bid_size: Decimal,
    /// Best ask price
    pub ask_price: Decimal,
    /// Size at the best ask
    pub ask_size: Decimal,
    /// Venue (adapter) identifier
    pub venue: String,
}
