//! Symbol configuration and subscription kinds

use serde::{Deserialize, Serialize};

/// Kind of market data a subscription delivers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubscriptionKind {
    /// Executed trades
    Trades,
    /// Order book depth changes
    Depth,
    /// Top-of-book quotes
    Quotes,
}

impl std::fmt::Display for SubscriptionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubscriptionKind::Trades => write!(f, "trades"),
            SubscriptionKind::Depth => write!(f, "depth"),
            SubscriptionKind::Quotes => write!(f, "quotes"),
        }
    }
}

/// Per-symbol configuration driving adapter resolution
///
/// The optional fields are consulted in order by the hub's routing logic:
/// explicit provider first, then exchange code, then asset class. A symbol
/// with none of them set falls through to the hub's default adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolConfig {
    /// Local symbol key, e.g. "BTC-USD" or "AAPL"
    pub symbol: String,
    /// Explicit data provider id, overrides all other routing
    #[serde(default)]
    pub provider: Option<String>,
    /// Exchange code, e.g. "NASDAQ"
    #[serde(default)]
    pub exchange: Option<String>,
    /// Asset class, e.g. "crypto" or "equity"
    #[serde(default)]
    pub asset_class: Option<String>,
}

impl SymbolConfig {
    /// Shorthand for a symbol with no routing hints
    pub fn bare(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_symbol_has_no_routing_hints() {
        let config = SymbolConfig::bare("ETH-USD");
        assert_eq!(config.symbol, "ETH-USD");
        assert!(config.provider.is_none());
        assert!(config.exchange.is_none());
        assert!(config.asset_class.is_none());
    }

    #[test]
    fn symbol_config_deserializes_with_missing_fields() {
        let config: SymbolConfig = serde_json::from_str(r#"{"symbol":"SPY"}"#).unwrap();
        assert_eq!(config.symbol, "SPY");
        assert!(config.exchange.is_none());
    }
}
