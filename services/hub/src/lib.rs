//! # Connector Hub
//!
//! Multiplexes live market data from pluggable venue adapters behind one
//! subscription surface. Downstream consumers subscribe by symbol; the hub
//! routes each request to the best adapter, owns the session lifecycle,
//! and recovers lost connections with backoff and subscription replay.
//!
//! ## Architecture
//!
//! - [`AdapterRegistry`]: descriptors and priority-based routing indexes
//! - [`Session`] / [`SessionFactory`]: the contract a venue integration
//!   implements; sessions report back through an [`EventSender`]
//! - [`EventBuffer`]: bounded inbound queue; producers never block, a single
//!   consumer task dispatches into the [`EventSinks`]
//! - [`ConnectorHub`]: orchestrates connect, subscribe, heartbeat and
//!   reconnection with replay
//!
//! ## Example
//!
//! ```no_run
//! use connector_hub::{ConnectorHub, EventSinks, HubConfig};
//! use types::SymbolConfig;
//!
//! # async fn run() -> connector_hub::Result<()> {
//! let config = HubConfig::from_env();
//! let hub = ConnectorHub::new(config, EventSinks::discard())?;
//! // hub.register_session_factory("coinbase", factory);
//! hub.connect().await?;
//! let id = hub.subscribe_trades(&SymbolConfig::bare("BTC-USD")).await?;
//! hub.unsubscribe_trades(id).await?;
//! hub.disconnect().await;
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod config;
pub mod error;
mod heartbeat;
pub mod hub;
pub mod reconnect;
pub mod registry;
pub mod session;
pub mod sink;
pub mod subscriptions;

pub use buffer::{BufferStats, EventBuffer, InboundEvent};
pub use config::{BufferConfig, HeartbeatConfig, HubConfig, OverflowPolicy, ReconnectConfig};
pub use error::{HubError, Result};
pub use hub::{ConnectorHub, StateChange};
pub use reconnect::{ConnectionState, ReconnectionState};
pub use registry::{AdapterDescriptor, AdapterRegistry};
pub use session::{EventSender, Instrument, InstrumentHandle, Session, SessionFactory};
pub use sink::{DepthSink, EventSinks, NullSink, QuoteSink, TradeSink};
pub use subscriptions::{Subscription, SubscriptionTable};
