//! Subscription table
//!
//! Maps hub-issued subscription ids to their adapter, instrument handle,
//! symbol and kind. Lives inside the hub's single state mutex; the table
//! itself has no locking. Ids come from the hub's atomic counter and are
//! never reused.

use crate::session::InstrumentHandle;
use std::collections::HashMap;
use types::SubscriptionKind;

/// One live subscription row
#[derive(Debug, Clone)]
pub struct Subscription {
    /// Hub-issued id, unique for the hub's lifetime
    pub id: u64,
    /// Owning adapter
    pub adapter: String,
    /// Cached venue instrument handle
    pub instrument: InstrumentHandle,
    /// Local symbol key
    pub symbol: String,
    /// Data kind this subscription delivers
    pub kind: SubscriptionKind,
}

/// Id-keyed subscription rows with per-adapter views
#[derive(Debug, Default)]
pub struct SubscriptionTable {
    rows: HashMap<u64, Subscription>,
}

impl SubscriptionTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a subscription row
    pub fn insert(&mut self, subscription: Subscription) {
        self.rows.insert(subscription.id, subscription);
    }

    /// Remove a row by id, returning it when present
    pub fn remove(&mut self, id: u64) -> Option<Subscription> {
        self.rows.remove(&id)
    }

    /// Look up a row by id
    pub fn get(&self, id: u64) -> Option<&Subscription> {
        self.rows.get(&id)
    }

    /// Rows owned by an adapter, ordered by id
    ///
    /// Used as the reconnection replay snapshot; the id order makes replay
    /// deterministic.
    pub fn snapshot_for_adapter(&self, adapter: &str) -> Vec<Subscription> {
        let mut rows: Vec<_> = self
            .rows
            .values()
            .filter(|s| s.adapter == adapter)
            .cloned()
            .collect();
        rows.sort_by_key(|s| s.id);
        rows
    }

    /// Remove every row owned by an adapter, returning the removed ids
    pub fn purge_adapter(&mut self, adapter: &str) -> Vec<u64> {
        let ids: Vec<u64> = self
            .rows
            .values()
            .filter(|s| s.adapter == adapter)
            .map(|s| s.id)
            .collect();
        for id in &ids {
            self.rows.remove(id);
        }
        ids
    }

    /// Total number of live subscriptions
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Instrument;
    use std::sync::Arc;

    #[derive(Debug)]
    struct Key(String);

    impl Instrument for Key {
        fn symbol(&self) -> &str {
            &self.0
        }
    }

    fn row(id: u64, adapter: &str, symbol: &str, kind: SubscriptionKind) -> Subscription {
        Subscription {
            id,
            adapter: adapter.to_string(),
            instrument: Arc::new(Key(symbol.to_string())),
            symbol: symbol.to_string(),
            kind,
        }
    }

    #[test]
    fn snapshot_is_id_ordered_and_scoped_to_adapter() {
        let mut table = SubscriptionTable::new();
        table.insert(row(3, "a", "ETH-USD", SubscriptionKind::Depth));
        table.insert(row(1, "a", "BTC-USD", SubscriptionKind::Trades));
        table.insert(row(2, "b", "SPY", SubscriptionKind::Trades));

        let snapshot = table.snapshot_for_adapter("a");
        let ids: Vec<_> = snapshot.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(snapshot[0].symbol, "BTC-USD");
    }

    #[test]
    fn purge_removes_only_the_adapter_rows() {
        let mut table = SubscriptionTable::new();
        table.insert(row(1, "a", "BTC-USD", SubscriptionKind::Trades));
        table.insert(row(2, "b", "SPY", SubscriptionKind::Trades));

        let removed = table.purge_adapter("a");
        assert_eq!(removed, vec![1]);
        assert_eq!(table.len(), 1);
        assert!(table.get(2).is_some());
    }

    #[test]
    fn remove_unknown_id_is_none() {
        let mut table = SubscriptionTable::new();
        assert!(table.remove(42).is_none());
        assert!(table.is_empty());
    }
}
