//! Scriptable in-memory session stub shared by the integration tests

use async_trait::async_trait;
use connector_hub::{
    AdapterDescriptor, EventSender, HubError, Instrument, InstrumentHandle, Result, Session,
    SessionFactory,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use types::SymbolConfig;

#[derive(Debug)]
struct StubInstrument {
    symbol: String,
}

impl Instrument for StubInstrument {
    fn symbol(&self) -> &str {
        &self.symbol
    }
}

/// Factory whose sessions connect instantly unless scripted to fail
///
/// Tests script behavior through the shared atomics and observe it through
/// the call log and the captured event senders.
pub struct StubFactory {
    /// Remaining connect attempts that should fail before one succeeds
    pub fail_connects: Arc<AtomicU32>,
    /// When set, sessions accept `connect` but never send the connected
    /// signal
    pub silent: Arc<AtomicU32>,
    /// Number of sessions created so far
    pub sessions_created: Arc<AtomicU32>,
    /// Number of instrument resolutions performed
    pub resolves: Arc<AtomicU32>,
    /// Chronological log of session calls, e.g. `trades:BTC-USD`
    pub calls: Arc<Mutex<Vec<String>>>,
    /// Event sender of every created session, oldest first
    pub senders: Arc<Mutex<Vec<EventSender>>>,
}

impl StubFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            fail_connects: Arc::new(AtomicU32::new(0)),
            silent: Arc::new(AtomicU32::new(0)),
            sessions_created: Arc::new(AtomicU32::new(0)),
            resolves: Arc::new(AtomicU32::new(0)),
            calls: Arc::new(Mutex::new(Vec::new())),
            senders: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Event sender of the most recently created session
    pub fn last_sender(&self) -> EventSender {
        self.senders
            .lock()
            .last()
            .cloned()
            .expect("no session created yet")
    }

    pub fn call_log(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }
}

#[async_trait]
impl SessionFactory for StubFactory {
    async fn create_session(
        &self,
        descriptor: &AdapterDescriptor,
        events: EventSender,
    ) -> Result<Arc<dyn Session>> {
        self.sessions_created.fetch_add(1, Ordering::SeqCst);
        self.senders.lock().push(events.clone());
        Ok(Arc::new(StubSession {
            adapter: descriptor.id.clone(),
            events,
            fail_connects: self.fail_connects.clone(),
            silent: self.silent.clone(),
            resolves: self.resolves.clone(),
            calls: self.calls.clone(),
        }))
    }
}

struct StubSession {
    adapter: String,
    events: EventSender,
    fail_connects: Arc<AtomicU32>,
    silent: Arc<AtomicU32>,
    resolves: Arc<AtomicU32>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl StubSession {
    fn log(&self, entry: String) {
        self.calls.lock().push(entry);
    }
}

#[async_trait]
impl Session for StubSession {
    async fn connect(&self) -> Result<()> {
        if self.fail_connects.load(Ordering::SeqCst) > 0 {
            self.fail_connects.fetch_sub(1, Ordering::SeqCst);
            return Err(HubError::ConnectionFailed {
                adapter: self.adapter.clone(),
                reason: "scripted failure".to_string(),
            });
        }
        if self.silent.load(Ordering::SeqCst) == 0 {
            self.events.connected();
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.log(format!("disconnect:{}", self.adapter));
        Ok(())
    }

    async fn resolve_instrument(&self, symbol: &SymbolConfig) -> Result<InstrumentHandle> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(StubInstrument {
            symbol: symbol.symbol.clone(),
        }))
    }

    async fn subscribe_trades(&self, instrument: &InstrumentHandle) -> Result<()> {
        self.log(format!("trades:{}", instrument.symbol()));
        Ok(())
    }

    async fn unsubscribe_trades(&self, instrument: &InstrumentHandle) -> Result<()> {
        self.log(format!("untrades:{}", instrument.symbol()));
        Ok(())
    }

    async fn subscribe_depth(&self, instrument: &InstrumentHandle) -> Result<()> {
        self.log(format!("depth:{}", instrument.symbol()));
        Ok(())
    }

    async fn unsubscribe_depth(&self, instrument: &InstrumentHandle) -> Result<()> {
        self.log(format!("undepth:{}", instrument.symbol()));
        Ok(())
    }
}
