//! Connector hub orchestration
//!
//! Owns every adapter session, the subscription table, the reconnection
//! loops and the inbound event consumer. All shared mutable hub state lives
//! behind one mutex that is never held across an await point; sessions and
//! background tasks communicate through the bounded inbound buffer and
//! small signal channels.

use crate::buffer::{BufferStats, EventBuffer, InboundEvent};
use crate::config::HubConfig;
use crate::reconnect::{backoff_delay, ConnectionState, ReconnectionState};
use crate::registry::{AdapterDescriptor, AdapterRegistry};
use crate::session::{EventSender, InstrumentHandle, Session, SessionFactory};
use crate::sink::EventSinks;
use crate::subscriptions::{Subscription, SubscriptionTable};
use crate::{HubError, Result};
use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, oneshot, watch};
use tokio::time::{sleep, timeout, Instant};
use types::{SubscriptionKind, SymbolConfig};

/// Connection state transition for one adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
    /// Adapter whose state changed
    pub adapter: String,
    /// New observable state
    pub state: ConnectionState,
}

/// Shared mutable hub state, guarded by a single mutex
///
/// The lock is only ever taken for short synchronous sections; it is never
/// held across an await point.
#[derive(Default)]
struct HubState {
    /// Live (connected or connecting) sessions by adapter id
    sessions: HashMap<String, Arc<dyn Session>>,
    /// All live subscriptions by hub-issued id
    subscriptions: SubscriptionTable,
    /// Per-adapter instrument cache keyed by (adapter, symbol)
    instruments: HashMap<(String, String), InstrumentHandle>,
    /// Per-adapter reconnection bookkeeping
    reconnect: HashMap<String, ReconnectionState>,
    /// When each adapter last delivered data
    last_data: HashMap<String, Instant>,
    /// Last observable state per adapter
    states: HashMap<String, ConnectionState>,
    /// Callers waiting for a connected signal
    connect_waiters: HashMap<String, Vec<oneshot::Sender<()>>>,
}

pub(crate) struct HubInner {
    pub(crate) config: HubConfig,
    registry: Arc<AdapterRegistry>,
    factories: RwLock<HashMap<String, Arc<dyn SessionFactory>>>,
    state: Mutex<HubState>,
    sinks: EventSinks,
    next_subscription_id: AtomicU64,
    buffer: Arc<EventBuffer>,
    state_tx: broadcast::Sender<StateChange>,
    pub(crate) shutdown: watch::Sender<bool>,
    started: AtomicBool,
    heartbeat_started: AtomicBool,
}

/// Multi-adapter connection hub
///
/// The only component with a public contract: callers connect, subscribe
/// and observe through this type while sessions, recovery and dispatch run
/// in the background.
pub struct ConnectorHub {
    inner: Arc<HubInner>,
}

impl ConnectorHub {
    /// Build a hub from validated configuration
    ///
    /// Descriptors listed in the configuration are registered immediately;
    /// their session factories must be supplied via
    /// [`register_session_factory`](Self::register_session_factory) before
    /// `connect` for the adapters to come up.
    pub fn new(config: HubConfig, sinks: EventSinks) -> Result<Self> {
        config.validate()?;

        let registry = Arc::new(AdapterRegistry::new());
        for descriptor in &config.adapters {
            registry.register_adapter(descriptor.clone());
        }

        let buffer = Arc::new(EventBuffer::new(
            config.buffer.capacity,
            config.buffer.overflow,
        ));
        let (state_tx, _) = broadcast::channel(256);
        let (shutdown, _) = watch::channel(false);

        Ok(Self {
            inner: Arc::new(HubInner {
                config,
                registry,
                factories: RwLock::new(HashMap::new()),
                state: Mutex::new(HubState::default()),
                sinks,
                next_subscription_id: AtomicU64::new(1),
                buffer,
                state_tx,
                shutdown,
                started: AtomicBool::new(false),
                heartbeat_started: AtomicBool::new(false),
            }),
        })
    }

    /// The adapter registry backing routing decisions
    pub fn registry(&self) -> &AdapterRegistry {
        &self.inner.registry
    }

    /// Register the session factory for an adapter id
    pub fn register_session_factory(&self, adapter: &str, factory: Arc<dyn SessionFactory>) {
        self.inner
            .factories
            .write()
            .insert(adapter.to_string(), factory);
    }

    /// Register a descriptor and its factory in one call
    pub fn register_adapter(&self, descriptor: AdapterDescriptor, factory: Arc<dyn SessionFactory>) {
        self.register_session_factory(&descriptor.id, factory);
        self.inner.registry.register_adapter(descriptor);
    }

    /// Remove an adapter entirely: registry entry, live session, and every
    /// subscription it owns
    ///
    /// Returns false if the adapter id was unknown to the registry.
    pub async fn unregister_adapter(&self, adapter: &str) -> bool {
        let known = self.inner.registry.unregister_adapter(adapter);
        self.inner.factories.write().remove(adapter);

        let session = {
            let mut state = self.inner.state.lock();
            let purged = state.subscriptions.purge_adapter(adapter);
            if !purged.is_empty() {
                tracing::info!(
                    "Purged {} orphaned subscriptions for adapter {}",
                    purged.len(),
                    adapter
                );
            }
            state
                .instruments
                .retain(|(owner, _), _| owner.as_str() != adapter);
            state.reconnect.remove(adapter);
            state.last_data.remove(adapter);
            state.connect_waiters.remove(adapter);
            state.sessions.remove(adapter)
        };

        if let Some(session) = session {
            let budget = self.inner.config.disconnect_timeout();
            if timeout(budget, session.disconnect()).await.is_err() {
                tracing::warn!("Disconnect timed out for adapter {}", adapter);
            }
            self.inner
                .notify_state(adapter, ConnectionState::Disconnected);
        }

        known
    }

    /// Start the background tasks and connect every enabled adapter
    ///
    /// Individual connect failures are logged and do not prevent other
    /// adapters from connecting.
    pub async fn connect(&self) -> Result<()> {
        self.inner.clone().start_background_tasks();

        let adapters = self.inner.registry.get_all_adapters();
        tracing::info!("Connecting {} enabled adapters", adapters.len());

        let attempts = adapters.iter().map(|descriptor| {
            let id = descriptor.id.clone();
            async move { (id.clone(), self.connect_adapter(&id).await) }
        });

        for (adapter, result) in join_all(attempts).await {
            if let Err(e) = result {
                tracing::warn!("Adapter {} failed to connect: {}", adapter, e);
            }
        }

        // Staleness monitoring begins only once the connect attempts have
        // settled
        self.inner.clone().start_heartbeat();
        Ok(())
    }

    /// Connect one adapter and wait up to the configured timeout for its
    /// connected signal
    ///
    /// Unknown adapter ids and missing factories are soft no-ops: logged,
    /// not errors. Connect failures here do not start reconnection; that
    /// only happens on unexpected loss of an established session.
    pub async fn connect_adapter(&self, adapter: &str) -> Result<()> {
        self.inner.clone().start_background_tasks();
        match self.inner.clone().connect_adapter_inner(adapter).await {
            Ok(_established) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Concurrently disconnect every adapter with a bounded per-adapter
    /// timeout, tolerating individual failures
    pub async fn disconnect(&self) {
        // Stop heartbeat, consumer and reconnect loops first so nothing
        // races the teardown
        let _ = self.inner.shutdown.send(true);
        self.inner.started.store(false, Ordering::SeqCst);
        self.inner.heartbeat_started.store(false, Ordering::SeqCst);

        let sessions: Vec<(String, Arc<dyn Session>)> = {
            let mut state = self.inner.state.lock();
            state.connect_waiters.clear();
            for rs in state.reconnect.values_mut() {
                rs.is_reconnecting = false;
            }
            state.sessions.drain().collect()
        };

        let budget = self.inner.config.disconnect_timeout();
        let teardowns = sessions.into_iter().map(|(adapter, session)| {
            let inner = self.inner.clone();
            async move {
                match timeout(budget, session.disconnect()).await {
                    Ok(Ok(())) => tracing::info!("Disconnected adapter {}", adapter),
                    Ok(Err(e)) => {
                        tracing::warn!("Disconnect failed for adapter {}: {}", adapter, e)
                    }
                    Err(_) => tracing::warn!(
                        "Disconnect timed out for adapter {} after {:?}",
                        adapter,
                        budget
                    ),
                }
                inner.notify_state(&adapter, ConnectionState::Disconnected);
            }
        });
        join_all(teardowns).await;
    }

    /// Manually reconnect an adapter, replaying its subscriptions
    ///
    /// This is the external trigger that recovers an adapter stuck in the
    /// terminal error state after reconnection exhausted its budget.
    pub async fn reconnect_adapter(&self, adapter: &str) -> Result<()> {
        let (old_session, snapshot) = {
            let mut state = self.inner.state.lock();
            state.reconnect.entry(adapter.to_string()).or_default().reset();
            let snapshot = state.subscriptions.snapshot_for_adapter(adapter);
            (state.sessions.remove(adapter), snapshot)
        };

        if let Some(session) = old_session {
            let budget = self.inner.config.disconnect_timeout();
            let _ = timeout(budget, session.disconnect()).await;
        }

        let established = self.inner.clone().connect_adapter_inner(adapter).await?;
        if established {
            self.inner.replay_subscriptions(adapter, &snapshot).await;
        }
        Ok(())
    }

    /// Subscribe to trades for a symbol; returns the hub-issued
    /// subscription id
    pub async fn subscribe_trades(&self, symbol: &SymbolConfig) -> Result<u64> {
        self.inner.subscribe(symbol, SubscriptionKind::Trades).await
    }

    /// Subscribe to order book depth for a symbol; returns the hub-issued
    /// subscription id
    pub async fn subscribe_market_depth(&self, symbol: &SymbolConfig) -> Result<u64> {
        self.inner.subscribe(symbol, SubscriptionKind::Depth).await
    }

    /// Remove a trade subscription; unknown ids are a no-op
    pub async fn unsubscribe_trades(&self, id: u64) -> Result<()> {
        self.inner.unsubscribe(id).await
    }

    /// Remove a depth subscription; unknown ids are a no-op
    pub async fn unsubscribe_market_depth(&self, id: u64) -> Result<()> {
        self.inner.unsubscribe(id).await
    }

    /// Stream of `(adapter, state)` transitions for external monitoring
    pub fn subscribe_state_changes(&self) -> broadcast::Receiver<StateChange> {
        self.inner.state_tx.subscribe()
    }

    /// Last observed connection state for an adapter
    pub fn connection_state(&self, adapter: &str) -> ConnectionState {
        self.inner
            .state
            .lock()
            .states
            .get(adapter)
            .copied()
            .unwrap_or(ConnectionState::Disconnected)
    }

    /// Inbound buffer counters
    pub fn buffer_stats(&self) -> BufferStats {
        self.inner.buffer.stats()
    }

    /// Number of live subscriptions
    pub fn active_subscriptions(&self) -> usize {
        self.inner.state.lock().subscriptions.len()
    }

    /// Live subscription rows for one adapter, id-ordered
    pub fn subscriptions_for_adapter(&self, adapter: &str) -> Vec<Subscription> {
        self.inner.state.lock().subscriptions.snapshot_for_adapter(adapter)
    }
}

impl HubInner {
    /// Spawn the consumer once per connected lifecycle
    fn start_background_tasks(self: Arc<Self>) {
        if self
            .started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            let _ = self.shutdown.send(false);
            tokio::spawn(async move { self.run_consumer().await });
        }
    }

    /// Spawn the heartbeat monitor once per connected lifecycle
    fn start_heartbeat(self: Arc<Self>) {
        if self
            .heartbeat_started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            crate::heartbeat::spawn(self);
        }
    }

    /// Single consumer draining the inbound buffer for the hub's lifetime
    ///
    /// Dispatch is strictly sequential, which provides the global FIFO
    /// ordering guarantee across adapters.
    async fn run_consumer(self: Arc<Self>) {
        let mut shutdown = self.shutdown.subscribe();
        loop {
            let event = tokio::select! {
                event = self.buffer.pop() => event,
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::debug!("Inbound event consumer stopping");
                        return;
                    }
                    continue;
                }
            };

            match event {
                InboundEvent::Trade { adapter, event } => {
                    self.touch(&adapter);
                    self.sinks.trades.on_trade(event).await;
                }
                InboundEvent::Depth { adapter, event } => {
                    self.touch(&adapter);
                    self.sinks.depth.on_depth(event).await;
                }
                InboundEvent::TopOfBook { adapter, event } => {
                    self.touch(&adapter);
                    self.sinks.quotes.on_quote(event).await;
                }
                InboundEvent::Connected { adapter } => {
                    self.handle_connected(&adapter);
                }
                InboundEvent::Disconnected { adapter, reason } => {
                    tracing::warn!(
                        "Adapter {} disconnected unexpectedly: {}",
                        adapter,
                        reason.as_deref().unwrap_or("no reason given")
                    );
                    self.clone().maybe_start_reconnect(&adapter);
                }
                InboundEvent::Error { adapter, reason } => {
                    tracing::warn!("Session error on adapter {}: {}", adapter, reason);
                    self.clone().maybe_start_reconnect(&adapter);
                }
            }
        }
    }

    /// Record that an adapter just delivered data
    fn touch(&self, adapter: &str) {
        let mut state = self.state.lock();
        // Late events from a torn-down session must not resurrect its
        // heartbeat entry
        if state.sessions.contains_key(adapter) {
            state.last_data.insert(adapter.to_string(), Instant::now());
        }
    }

    fn handle_connected(&self, adapter: &str) {
        let waiters = {
            let mut state = self.state.lock();
            if !state.sessions.contains_key(adapter) {
                // Signal from a session that was already torn down
                return;
            }
            state.last_data.insert(adapter.to_string(), Instant::now());
            state
                .reconnect
                .entry(adapter.to_string())
                .or_default()
                .reset();
            state.connect_waiters.remove(adapter).unwrap_or_default()
        };

        for waiter in waiters {
            let _ = waiter.send(());
        }

        self.notify_state(adapter, ConnectionState::Connected);
        tracing::info!("Adapter {} connected", adapter);
    }

    /// Record and broadcast a state transition
    fn notify_state(&self, adapter: &str, new_state: ConnectionState) {
        self.state
            .lock()
            .states
            .insert(adapter.to_string(), new_state);
        let _ = self.state_tx.send(StateChange {
            adapter: adapter.to_string(),
            state: new_state,
        });
    }

    /// Create and connect a session for an adapter
    ///
    /// Returns Ok(false) for the soft no-op cases (unknown id, disabled,
    /// no factory) and Ok(true) once the connected signal arrived.
    async fn connect_adapter_inner(self: Arc<Self>, adapter: &str) -> Result<bool> {
        let Some(descriptor) = self.registry.get_adapter_config(adapter) else {
            tracing::warn!("Unknown adapter {}, skipping connect", adapter);
            return Ok(false);
        };
        if !descriptor.enabled {
            tracing::debug!("Adapter {} is disabled, skipping connect", adapter);
            return Ok(false);
        }
        let Some(factory) = self.factories.read().get(adapter).cloned() else {
            tracing::warn!("No session factory registered for adapter {}", adapter);
            return Ok(false);
        };

        // The hub owns sessions exclusively: a live session for this adapter
        // is torn down before its replacement is created
        let previous = {
            let mut state = self.state.lock();
            let old = state.sessions.remove(adapter);
            if old.is_some() {
                state.last_data.remove(adapter);
            }
            old
        };
        if let Some(old) = previous {
            tracing::info!("Disposing existing session for adapter {}", adapter);
            let _ = timeout(self.config.disconnect_timeout(), old.disconnect()).await;
        }

        tracing::info!("Connecting adapter {}", adapter);
        let events = EventSender::new(adapter.to_string(), self.buffer.clone());
        let session = factory.create_session(&descriptor, events).await?;

        let (tx, rx) = oneshot::channel();
        {
            let mut state = self.state.lock();
            // Recorded before any await so a cancelled connect cannot leak
            // the session; teardown paths will find and dispose it
            state.sessions.insert(adapter.to_string(), session.clone());
            state
                .connect_waiters
                .entry(adapter.to_string())
                .or_default()
                .push(tx);
        }

        if let Err(e) = session.connect().await {
            self.abandon_connect(adapter, &session);
            self.notify_state(adapter, ConnectionState::Error);
            tracing::error!("Connect failed for adapter {}: {}", adapter, e);
            let _ = timeout(self.config.disconnect_timeout(), session.disconnect()).await;
            return Err(HubError::ConnectionFailed {
                adapter: adapter.to_string(),
                reason: e.to_string(),
            });
        }

        let budget = self.config.connect_timeout();
        match timeout(budget, rx).await {
            Ok(Ok(())) => Ok(true),
            _ => {
                self.abandon_connect(adapter, &session);
                self.notify_state(adapter, ConnectionState::Error);
                tracing::error!(
                    "Connection timeout for adapter {} after {:?}",
                    adapter,
                    budget
                );
                let _ = timeout(self.config.disconnect_timeout(), session.disconnect()).await;
                Err(HubError::ConnectionTimeout {
                    adapter: adapter.to_string(),
                    timeout_ms: budget.as_millis() as u64,
                })
            }
        }
    }

    /// Undo the state recorded for a connect attempt that failed
    fn abandon_connect(&self, adapter: &str, session: &Arc<dyn Session>) {
        let mut state = self.state.lock();
        if let Some(current) = state.sessions.get(adapter) {
            if Arc::ptr_eq(current, session) {
                state.sessions.remove(adapter);
                state.last_data.remove(adapter);
            }
        }
        if let Some(waiters) = state.connect_waiters.get_mut(adapter) {
            waiters.retain(|tx| !tx.is_closed());
        }
    }

    /// Start the recovery loop for an adapter unless one is already running
    ///
    /// Idempotent: a disconnect event and a heartbeat timeout arriving
    /// near-simultaneously still produce exactly one loop.
    pub(crate) fn maybe_start_reconnect(self: Arc<Self>, adapter: &str) {
        let (stale_session, snapshot) = {
            let mut state = self.state.lock();
            let Some(session) = state.sessions.get(adapter).cloned() else {
                // Deliberate teardown or an adapter already in recovery
                return;
            };
            let rs = state.reconnect.entry(adapter.to_string()).or_default();
            if rs.is_reconnecting {
                return;
            }
            rs.is_reconnecting = true;
            rs.attempt = 0;

            // Snapshot before teardown so recovery can never silently drop
            // a subscription
            let snapshot = state.subscriptions.snapshot_for_adapter(adapter);
            state.sessions.remove(adapter);
            state.last_data.remove(adapter);
            (session, snapshot)
        };

        self.notify_state(adapter, ConnectionState::Reconnecting);
        tracing::warn!(
            "Starting reconnection for adapter {} ({} subscriptions to recover)",
            adapter,
            snapshot.len()
        );

        let inner = self.clone();
        let adapter = adapter.to_string();
        tokio::spawn(async move {
            inner
                .run_reconnect_loop(&adapter, stale_session, snapshot)
                .await;
        });
    }

    /// Per-adapter recovery loop: backoff, reconnect, replay
    async fn run_reconnect_loop(
        self: Arc<Self>,
        adapter: &str,
        stale_session: Arc<dyn Session>,
        snapshot: Vec<Subscription>,
    ) {
        let max_attempts = self.config.reconnect.max_attempts;
        let schedule = self.config.reconnect.backoff_ms.clone();
        let mut shutdown = self.shutdown.subscribe();
        let mut stale = Some(stale_session);
        let mut attempt: u32 = 0;

        while attempt < max_attempts {
            let delay = backoff_delay(&schedule, attempt);
            tracing::info!(
                "Reconnect attempt {} for adapter {} in {:?}",
                attempt + 1,
                adapter,
                delay
            );

            tokio::select! {
                _ = sleep(delay) => {}
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        self.state
                            .lock()
                            .reconnect
                            .entry(adapter.to_string())
                            .or_default()
                            .is_reconnecting = false;
                        return;
                    }
                }
            }

            attempt += 1;
            if let Some(rs) = self.state.lock().reconnect.get_mut(adapter) {
                rs.attempt = attempt;
            }

            // Dispose the stale session before building its replacement
            if let Some(old) = stale.take() {
                let budget = self.config.disconnect_timeout();
                let _ = timeout(budget, old.disconnect()).await;
            }

            match self.clone().connect_adapter_inner(adapter).await {
                Ok(true) => {
                    self.replay_subscriptions(adapter, &snapshot).await;
                    tracing::info!(
                        "Adapter {} recovered after {} attempt(s)",
                        adapter,
                        attempt
                    );
                    return;
                }
                Ok(false) => {
                    // Adapter was unregistered or disabled while we were
                    // backing off
                    if let Some(rs) = self.state.lock().reconnect.get_mut(adapter) {
                        rs.is_reconnecting = false;
                    }
                    return;
                }
                Err(e) => {
                    tracing::warn!(
                        "Reconnect attempt {} failed for adapter {}: {}",
                        attempt,
                        adapter,
                        e
                    );
                }
            }
        }

        if let Some(rs) = self.state.lock().reconnect.get_mut(adapter) {
            rs.is_reconnecting = false;
        }
        self.notify_state(adapter, ConnectionState::Error);
        tracing::error!(
            "Reconnection exhausted for adapter {} after {} attempts; manual reconnect required",
            adapter,
            max_attempts
        );
    }

    /// Replay a subscription snapshot against the adapter's new session
    ///
    /// Strictly sequential with a small delay between calls to avoid
    /// flooding a venue that just came back.
    async fn replay_subscriptions(&self, adapter: &str, snapshot: &[Subscription]) {
        if snapshot.is_empty() {
            return;
        }
        let Some(session) = self.state.lock().sessions.get(adapter).cloned() else {
            tracing::warn!(
                "Session for adapter {} vanished before subscription replay",
                adapter
            );
            return;
        };

        for subscription in snapshot {
            let result = match subscription.kind {
                SubscriptionKind::Trades => session.subscribe_trades(&subscription.instrument).await,
                SubscriptionKind::Depth => session.subscribe_depth(&subscription.instrument).await,
                // Quotes arrive on the depth/top-of-book callbacks; there is
                // no separate venue subscription to replay
                SubscriptionKind::Quotes => Ok(()),
            };
            if let Err(e) = result {
                tracing::warn!(
                    "Failed to replay {} subscription for {} on adapter {}: {}",
                    subscription.kind,
                    subscription.symbol,
                    adapter,
                    e
                );
            }
            sleep(self.config.resubscribe_delay()).await;
        }
        tracing::info!(
            "Replayed {} subscriptions on adapter {}",
            snapshot.len(),
            adapter
        );
    }

    /// Resolve the target adapter for a subscription request
    ///
    /// Order: explicit provider, exchange code, asset class, configured
    /// default (only if live), any adapter with a live session.
    fn resolve_adapter(&self, symbol: &SymbolConfig) -> Result<String> {
        if let Some(provider) = &symbol.provider {
            if let Some(adapter) = self.registry.get_adapter_for_provider(provider) {
                return Ok(adapter);
            }
        }
        if let Some(exchange) = &symbol.exchange {
            if let Some(adapter) = self.registry.get_adapter_for_exchange(exchange) {
                return Ok(adapter);
            }
        }
        if let Some(class) = &symbol.asset_class {
            if let Some(adapter) = self.registry.get_adapter_for_asset_class(class) {
                return Ok(adapter);
            }
        }

        let state = self.state.lock();
        if let Some(default) = &self.config.default_adapter {
            if state.sessions.contains_key(default) {
                return Ok(default.clone());
            }
        }
        if let Some(adapter) = state.sessions.keys().next() {
            return Ok(adapter.clone());
        }

        Err(HubError::NoAdapterAvailable {
            symbol: symbol.symbol.clone(),
        })
    }

    async fn subscribe(&self, symbol: &SymbolConfig, kind: SubscriptionKind) -> Result<u64> {
        let adapter = self.resolve_adapter(symbol)?;

        let session = self
            .state
            .lock()
            .sessions
            .get(&adapter)
            .cloned()
            .ok_or_else(|| HubError::AdapterNotConnected {
                adapter: adapter.clone(),
            })?;

        let instrument = self
            .cached_instrument(&adapter, symbol, session.as_ref())
            .await?;

        match kind {
            SubscriptionKind::Trades => session.subscribe_trades(&instrument).await?,
            SubscriptionKind::Depth => session.subscribe_depth(&instrument).await?,
            SubscriptionKind::Quotes => {}
        }

        let id = self.next_subscription_id.fetch_add(1, Ordering::Relaxed);
        self.state.lock().subscriptions.insert(Subscription {
            id,
            adapter: adapter.clone(),
            instrument,
            symbol: symbol.symbol.clone(),
            kind,
        });

        tracing::debug!(
            "Subscribed {} to {} on adapter {} (id {})",
            kind,
            symbol.symbol,
            adapter,
            id
        );
        Ok(id)
    }

    /// Instrument handles are resolved once per (adapter, symbol) and
    /// reused for every later subscription
    async fn cached_instrument(
        &self,
        adapter: &str,
        symbol: &SymbolConfig,
        session: &dyn Session,
    ) -> Result<InstrumentHandle> {
        let key = (adapter.to_string(), symbol.symbol.clone());
        if let Some(handle) = self.state.lock().instruments.get(&key).cloned() {
            return Ok(handle);
        }

        let handle = session.resolve_instrument(symbol).await?;
        self.state.lock().instruments.insert(key, handle.clone());
        Ok(handle)
    }

    async fn unsubscribe(&self, id: u64) -> Result<()> {
        let (row, session) = {
            let mut state = self.state.lock();
            match state.subscriptions.remove(id) {
                None => return Ok(()),
                Some(row) => {
                    let session = state.sessions.get(&row.adapter).cloned();
                    (row, session)
                }
            }
        };

        if let Some(session) = session {
            let result = match row.kind {
                SubscriptionKind::Trades => session.unsubscribe_trades(&row.instrument).await,
                SubscriptionKind::Depth => session.unsubscribe_depth(&row.instrument).await,
                SubscriptionKind::Quotes => Ok(()),
            };
            if let Err(e) = result {
                tracing::warn!(
                    "Unsubscribe call failed for {} on adapter {}: {}",
                    row.symbol,
                    row.adapter,
                    e
                );
            }
        }

        tracing::debug!("Removed subscription {} ({})", id, row.symbol);
        Ok(())
    }

    /// Adapters whose last data is older than the staleness threshold and
    /// that are not already recovering
    pub(crate) fn stale_adapters(&self) -> Vec<String> {
        let threshold = self.config.stale_after();
        let state = self.state.lock();
        state
            .last_data
            .iter()
            .filter(|(adapter, last)| {
                last.elapsed() > threshold
                    && state.sessions.contains_key(*adapter)
                    && !state
                        .reconnect
                        .get(*adapter)
                        .map(|rs| rs.is_reconnecting)
                        .unwrap_or(false)
            })
            .map(|(adapter, _)| adapter.clone())
            .collect()
    }
}
