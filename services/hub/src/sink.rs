//! Downstream collector contracts
//!
//! The hub dispatches translated events into these sinks from its single
//! consumer task, sequentially, in enqueue order. Sinks own their internal
//! state; the hub's only obligation is to call them with correctly
//! translated data.

use async_trait::async_trait;
use std::sync::Arc;
use types::{DepthEvent, TopOfBookEvent, TradeEvent};

/// Consumer of normalized trade events
#[async_trait]
pub trait TradeSink: Send + Sync {
    /// Handle one trade; called sequentially from the dispatch task
    async fn on_trade(&self, event: TradeEvent);
}

/// Consumer of normalized depth events
#[async_trait]
pub trait DepthSink: Send + Sync {
    /// Handle one depth change; called sequentially from the dispatch task
    async fn on_depth(&self, event: DepthEvent);
}

/// Consumer of normalized top-of-book events
#[async_trait]
pub trait QuoteSink: Send + Sync {
    /// Handle one quote update; called sequentially from the dispatch task
    async fn on_quote(&self, event: TopOfBookEvent);
}

/// The three downstream sinks the hub dispatches into
#[derive(Clone)]
pub struct EventSinks {
    /// Trade event consumer
    pub trades: Arc<dyn TradeSink>,
    /// Depth event consumer
    pub depth: Arc<dyn DepthSink>,
    /// Quote event consumer
    pub quotes: Arc<dyn QuoteSink>,
}

impl EventSinks {
    /// Bundle three sinks
    pub fn new(
        trades: Arc<dyn TradeSink>,
        depth: Arc<dyn DepthSink>,
        quotes: Arc<dyn QuoteSink>,
    ) -> Self {
        Self {
            trades,
            depth,
            quotes,
        }
    }

    /// Sinks that discard everything; useful when only connectivity is
    /// being exercised
    pub fn discard() -> Self {
        let sink = Arc::new(NullSink);
        Self {
            trades: sink.clone(),
            depth: sink.clone(),
            quotes: sink,
        }
    }
}

/// Sink that drops every event
pub struct NullSink;

#[async_trait]
impl TradeSink for NullSink {
    async fn on_trade(&self, _event: TradeEvent) {}
}

#[async_trait]
impl DepthSink for NullSink {
    async fn on_depth(&self, _event: DepthEvent) {}
}

#[async_trait]
impl QuoteSink for NullSink {
    async fn on_quote(&self, _event: TopOfBookEvent) {}
}
