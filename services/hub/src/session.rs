//! Session contract for pluggable venue integrations
//!
//! A session is one live connection to a venue, created from an adapter
//! descriptor by a [`SessionFactory`]. The hub never interprets the wire
//! protocol; it drives the session through this trait and reacts to the
//! events the session pushes through its [`EventSender`].

use crate::buffer::{EventBuffer, InboundEvent};
use crate::registry::AdapterDescriptor;
use crate::Result;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use types::{DepthEvent, SymbolConfig, TopOfBookEvent, TradeEvent};

/// Venue-specific opaque reference to a tradable symbol
///
/// The hub only caches handles and passes them back to the session that
/// produced them; it never inspects anything beyond the local symbol key.
pub trait Instrument: Send + Sync + fmt::Debug {
    /// Local symbol key this handle was resolved from
    fn symbol(&self) -> &str;
}

/// Shared, cheaply clonable instrument handle
pub type InstrumentHandle = Arc<dyn Instrument>;

/// One live or attempting connection to a venue
///
/// Implementations own their wire protocol and threading. Methods are called
/// by the hub only; the session reports lifecycle and data through the
/// [`EventSender`] it was created with.
#[async_trait]
pub trait Session: Send + Sync {
    /// Initiate the connection
    ///
    /// May return before the connection is established; the hub waits for
    /// the connected signal on the event buffer with a timeout.
    async fn connect(&self) -> Result<()>;

    /// Tear the connection down
    async fn disconnect(&self) -> Result<()>;

    /// Resolve a symbol to this venue's instrument handle
    async fn resolve_instrument(&self, symbol: &SymbolConfig) -> Result<InstrumentHandle>;

    /// Subscribe to trade prints for an instrument
    async fn subscribe_trades(&self, instrument: &InstrumentHandle) -> Result<()>;

    /// Remove a trade subscription
    async fn unsubscribe_trades(&self, instrument: &InstrumentHandle) -> Result<()>;

    /// Subscribe to order book depth for an instrument
    async fn subscribe_depth(&self, instrument: &InstrumentHandle) -> Result<()>;

    /// Remove a depth subscription
    async fn unsubscribe_depth(&self, instrument: &InstrumentHandle) -> Result<()>;
}

/// Creates sessions for one adapter
///
/// Registered with the hub per adapter id. The factory receives the
/// descriptor and the hub's event sender; everything else (endpoints,
/// credentials, codecs) belongs to the implementation.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// Create a new, not-yet-connected session
    async fn create_session(
        &self,
        descriptor: &AdapterDescriptor,
        events: EventSender,
    ) -> Result<Arc<dyn Session>>;
}

/// Callback surface handed to sessions
///
/// Every method translates a venue callback into a non-blocking enqueue on
/// the hub's inbound buffer and returns immediately, so session threads are
/// never blocked by slow downstream processing. Events that do not fit are
/// dropped by the buffer's overflow policy.
#[derive(Clone)]
pub struct EventSender {
    adapter: String,
    buffer: Arc<EventBuffer>,
}

impl EventSender {
    pub(crate) fn new(adapter: String, buffer: Arc<EventBuffer>) -> Self {
        Self { adapter, buffer }
    }

    /// Adapter id this sender is bound to
    pub fn adapter(&self) -> &str {
        &self.adapter
    }

    /// Report a normalized trade
    pub fn trade(&self, event: TradeEvent) {
        self.push(InboundEvent::Trade {
            adapter: self.adapter.clone(),
            event,
        });
    }

    /// Report a depth change
    pub fn depth(&self, event: DepthEvent) {
        self.push(InboundEvent::Depth {
            adapter: self.adapter.clone(),
            event,
        });
    }

    /// Report a top-of-book update
    pub fn top_of_book(&self, event: TopOfBookEvent) {
        self.push(InboundEvent::TopOfBook {
            adapter: self.adapter.clone(),
            event,
        });
    }

    /// Signal that the connection is established
    pub fn connected(&self) {
        self.push(InboundEvent::Connected {
            adapter: self.adapter.clone(),
        });
    }

    /// Signal an unexpected disconnect
    pub fn disconnected(&self, reason: Option<String>) {
        self.push(InboundEvent::Disconnected {
            adapter: self.adapter.clone(),
            reason,
        });
    }

    /// Signal a session-level error
    pub fn error(&self, reason: impl Into<String>) {
        self.push(InboundEvent::Error {
            adapter: self.adapter.clone(),
            reason: reason.into(),
        });
    }

    fn push(&self, event: InboundEvent) {
        if !self.buffer.push(event) {
            tracing::trace!(adapter = %self.adapter, "Inbound buffer full, event dropped");
        }
    }
}

impl fmt::Debug for EventSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSender")
            .field("adapter", &self.adapter)
            .finish()
    }
}
