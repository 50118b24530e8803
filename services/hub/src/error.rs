//! Error types for the connector hub

use thiserror::Error;

/// Result type alias for hub operations
pub type Result<T> = std::result::Result<T, HubError>;

/// Main error type for hub operations
#[derive(Debug, Error)]
pub enum HubError {
    /// Subscription request could not be routed to any adapter
    #[error("No adapter available for symbol {symbol}")]
    NoAdapterAvailable {
        /// The symbol that could not be routed
        symbol: String,
    },

    /// The resolved adapter has no live session
    #[error("Adapter {adapter} is not connected")]
    AdapterNotConnected {
        /// The adapter without a session
        adapter: String,
    },

    /// Connection attempt failed
    #[error("Connection failed for adapter {adapter}: {reason}")]
    ConnectionFailed {
        /// The adapter that failed to connect
        adapter: String,
        /// Reason for the failure
        reason: String,
    },

    /// Connected signal did not arrive within the configured timeout
    #[error("Connection timeout for adapter {adapter} after {timeout_ms}ms")]
    ConnectionTimeout {
        /// The adapter that timed out
        adapter: String,
        /// Timeout duration in milliseconds
        timeout_ms: u64,
    },

    /// Reconnection loop exhausted its attempt budget
    #[error("Maximum reconnection attempts ({max_attempts}) exceeded for adapter {adapter}")]
    MaxReconnectAttemptsExceeded {
        /// The adapter that failed to reconnect
        adapter: String,
        /// Maximum attempts that were tried
        max_attempts: u32,
    },

    /// Session-level subscribe or unsubscribe call failed
    #[error("Subscription failed on adapter {adapter} for {symbol}: {reason}")]
    SubscriptionFailed {
        /// The adapter the call was issued against
        adapter: String,
        /// The symbol being subscribed
        symbol: String,
        /// Underlying failure description
        reason: String,
    },

    /// Venue could not resolve a symbol to an instrument
    #[error("Instrument not found on adapter {adapter}: {symbol}")]
    InstrumentNotFound {
        /// The adapter that was asked
        adapter: String,
        /// The symbol that failed to resolve
        symbol: String,
    },

    /// Session implementation reported an error
    #[error("Session error on adapter {adapter}: {reason}")]
    SessionError {
        /// The adapter whose session failed
        adapter: String,
        /// Description from the session
        reason: String,
    },

    /// Configuration error in hub settings
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Programming error, fail fast
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HubError {
    /// Check if this error is recoverable through retry
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            HubError::ConnectionFailed { .. }
                | HubError::ConnectionTimeout { .. }
                | HubError::SubscriptionFailed { .. }
                | HubError::SessionError { .. }
        )
    }

    /// Check if this error indicates a permanent failure requiring
    /// operator intervention
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            HubError::Configuration(_)
                | HubError::InvalidArgument(_)
                | HubError::MaxReconnectAttemptsExceeded { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_failures_are_recoverable() {
        let err = HubError::ConnectionTimeout {
            adapter: "alpaca".to_string(),
            timeout_ms: 30_000,
        };
        assert!(err.is_recoverable());
        assert!(!err.is_permanent());
    }

    #[test]
    fn exhausted_reconnection_is_permanent() {
        let err = HubError::MaxReconnectAttemptsExceeded {
            adapter: "alpaca".to_string(),
            max_attempts: 10,
        };
        assert!(err.is_permanent());
        assert!(!err.is_recoverable());
    }
}
