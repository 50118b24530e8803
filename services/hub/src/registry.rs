//! Adapter descriptors and the routing registry
//!
//! The registry resolves routing keys (provider id, exchange code, asset
//! class) to adapter ids through precomputed maps that are rebuilt
//! incrementally on register/unregister. Lookups never fail hard; a miss is
//! an absence value.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

fn default_enabled() -> bool {
    true
}

fn default_priority() -> i32 {
    100
}

/// Static description of one connectable venue integration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterDescriptor {
    /// Unique adapter identifier, immutable once registered
    pub id: String,

    /// Human-readable name for dashboards and logs
    #[serde(default)]
    pub display_name: String,

    /// Free-form description
    #[serde(default)]
    pub description: String,

    /// Disabled adapters are skipped at startup and by routing
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Routing priority, lower is preferred
    #[serde(default = "default_priority")]
    pub priority: i32,

    /// Markets this adapter serves, e.g. "us-equities"
    #[serde(default)]
    pub supported_markets: Vec<String>,

    /// Asset classes this adapter serves, e.g. "crypto"
    #[serde(default)]
    pub supported_asset_classes: Vec<String>,

    /// Exchange codes this adapter serves, e.g. "NASDAQ"
    #[serde(default)]
    pub supported_exchanges: Vec<String>,

    /// Provider ids that route to this adapter
    #[serde(default)]
    pub mapped_provider_ids: Vec<String>,

    /// Whether the adapter delivers live streaming data
    #[serde(default = "default_enabled")]
    pub supports_streaming: bool,

    /// Whether the adapter can serve historical backfill requests
    #[serde(default)]
    pub supports_backfill: bool,

    /// Whether the adapter delivers order book depth
    #[serde(default)]
    pub supports_market_depth: bool,

    /// Maximum depth levels the adapter can deliver
    #[serde(default)]
    pub max_depth_levels: Option<u32>,
}

impl AdapterDescriptor {
    /// Create a minimal enabled descriptor with default priority
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: String::new(),
            description: String::new(),
            enabled: true,
            priority: default_priority(),
            supported_markets: Vec::new(),
            supported_asset_classes: Vec::new(),
            supported_exchanges: Vec::new(),
            mapped_provider_ids: Vec::new(),
            supports_streaming: true,
            supports_backfill: false,
            supports_market_depth: false,
            max_depth_levels: None,
        }
    }
}

#[derive(Default)]
struct RegistryInner {
    descriptors: HashMap<String, AdapterDescriptor>,
    /// provider id -> adapter id, exact match
    provider_map: HashMap<String, String>,
    /// exchange code -> adapter id, lowest priority wins
    exchange_map: HashMap<String, String>,
    /// asset class -> adapter ids sorted by priority ascending
    class_map: HashMap<String, Vec<String>>,
}

impl RegistryInner {
    fn priority_of(&self, id: &str) -> i32 {
        self.descriptors
            .get(id)
            .map(|d| d.priority)
            .unwrap_or(i32::MAX)
    }

    fn is_enabled(&self, id: &str) -> bool {
        self.descriptors.get(id).map(|d| d.enabled).unwrap_or(false)
    }

    /// Remove every derived routing entry pointing at `id`
    fn scrub(&mut self, id: &str) {
        self.provider_map.retain(|_, adapter| adapter != id);
        self.exchange_map.retain(|_, adapter| adapter != id);
        for adapters in self.class_map.values_mut() {
            adapters.retain(|adapter| adapter != id);
        }
        self.class_map.retain(|_, adapters| !adapters.is_empty());
    }
}

/// Thread-safe registry of adapter descriptors and derived routing maps
#[derive(Default)]
pub struct AdapterRegistry {
    inner: RwLock<RegistryInner>,
}

impl AdapterRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a descriptor and rebuild its derived routing
    /// entries
    ///
    /// Re-registering an existing id replaces the descriptor and every
    /// routing entry derived from it.
    pub fn register_adapter(&self, descriptor: AdapterDescriptor) {
        assert!(
            !descriptor.id.is_empty(),
            "adapter descriptor must have an id"
        );

        let mut inner = self.inner.write();
        let id = descriptor.id.clone();

        // Replacement: old routing entries must not survive
        if inner.descriptors.contains_key(&id) {
            inner.scrub(&id);
        }
        inner.descriptors.insert(id.clone(), descriptor.clone());

        for provider in &descriptor.mapped_provider_ids {
            inner.provider_map.insert(provider.clone(), id.clone());
        }

        // First registrant wins unless a later one has strictly lower
        // (better) priority
        for exchange in &descriptor.supported_exchanges {
            let replace = match inner.exchange_map.get(exchange) {
                Some(current) => descriptor.priority < inner.priority_of(current),
                None => true,
            };
            if replace {
                inner.exchange_map.insert(exchange.clone(), id.clone());
            }
        }

        for class in &descriptor.supported_asset_classes {
            let mut adapters = inner.class_map.remove(class).unwrap_or_default();
            if !adapters.iter().any(|a| a == &id) {
                adapters.push(id.clone());
            }
            adapters.sort_by_key(|a| inner.priority_of(a));
            inner.class_map.insert(class.clone(), adapters);
        }

        tracing::debug!(
            adapter = %id,
            priority = descriptor.priority,
            enabled = descriptor.enabled,
            "Registered adapter"
        );
    }

    /// Remove a descriptor and scrub it from every derived map
    ///
    /// Returns false if the id was unknown.
    pub fn unregister_adapter(&self, id: &str) -> bool {
        let mut inner = self.inner.write();
        if inner.descriptors.remove(id).is_none() {
            return false;
        }
        inner.scrub(id);
        tracing::debug!(adapter = %id, "Unregistered adapter");
        true
    }

    /// All enabled descriptors sorted by priority ascending
    pub fn get_all_adapters(&self) -> Vec<AdapterDescriptor> {
        let inner = self.inner.read();
        let mut adapters: Vec<_> = inner
            .descriptors
            .values()
            .filter(|d| d.enabled)
            .cloned()
            .collect();
        adapters.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
        adapters
    }

    /// Look up a descriptor by adapter id
    pub fn get_adapter_config(&self, id: &str) -> Option<AdapterDescriptor> {
        self.inner.read().descriptors.get(id).cloned()
    }

    /// Resolve a provider id to an adapter id
    ///
    /// Exact match against the provider map; falls back to treating the
    /// provider id itself as an adapter id when it names an enabled
    /// descriptor.
    pub fn get_adapter_for_provider(&self, provider: &str) -> Option<String> {
        let inner = self.inner.read();
        if let Some(adapter) = inner.provider_map.get(provider) {
            if inner.is_enabled(adapter) {
                return Some(adapter.clone());
            }
        }
        if inner.is_enabled(provider) {
            return Some(provider.to_string());
        }
        None
    }

    /// Resolve an exchange code to an adapter id
    ///
    /// Primary lookup via the precomputed exchange map; on miss, linear scan
    /// of enabled descriptors returning the lowest-priority match.
    pub fn get_adapter_for_exchange(&self, exchange: &str) -> Option<String> {
        let inner = self.inner.read();
        if let Some(adapter) = inner.exchange_map.get(exchange) {
            if inner.is_enabled(adapter) {
                return Some(adapter.clone());
            }
        }

        inner
            .descriptors
            .values()
            .filter(|d| d.enabled && d.supported_exchanges.iter().any(|e| e == exchange))
            .min_by_key(|d| d.priority)
            .map(|d| d.id.clone())
    }

    /// Resolve an asset class to an adapter id
    pub fn get_adapter_for_asset_class(&self, asset_class: &str) -> Option<String> {
        let inner = self.inner.read();
        if let Some(adapters) = inner.class_map.get(asset_class) {
            if let Some(adapter) = adapters.iter().find(|a| inner.is_enabled(a)) {
                return Some(adapter.clone());
            }
        }

        inner
            .descriptors
            .values()
            .filter(|d| {
                d.enabled && d.supported_asset_classes.iter().any(|c| c == asset_class)
            })
            .min_by_key(|d| d.priority)
            .map(|d| d.id.clone())
    }

    /// Enabled adapters serving a market, priority-sorted
    pub fn get_adapters_for_market(&self, market: &str) -> Vec<AdapterDescriptor> {
        self.filtered(|d| d.supported_markets.iter().any(|m| m == market))
    }

    /// Enabled adapters that can deliver order book depth, priority-sorted
    pub fn get_depth_capable_adapters(&self) -> Vec<AdapterDescriptor> {
        self.filtered(|d| d.supports_market_depth)
    }

    /// Enabled adapters that can serve backfill requests, priority-sorted
    pub fn get_backfill_capable_adapters(&self) -> Vec<AdapterDescriptor> {
        self.filtered(|d| d.supports_backfill)
    }

    fn filtered(&self, predicate: impl Fn(&AdapterDescriptor) -> bool) -> Vec<AdapterDescriptor> {
        let inner = self.inner.read();
        let mut adapters: Vec<_> = inner
            .descriptors
            .values()
            .filter(|d| d.enabled && predicate(d))
            .cloned()
            .collect();
        adapters.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
        adapters
    }
}
