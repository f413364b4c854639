//! Failsafe mechanisms: circuit breaker and per-operation breaker registry

mod circuit_breaker;

pub use circuit_breaker::{BreakerMetrics, CircuitBreaker, CircuitState};

use std::sync::Arc;

use dashmap::DashMap;

use crate::config::CircuitBreakerConfig;

/// Registry handing out one shared [`CircuitBreaker`] per operation key.
///
/// Owned by the composition root; all callers of the same logical operation
/// observe the same breaker state.
pub struct BreakerRegistry {
    config: CircuitBreakerConfig,
    breakers: DashMap<String, Arc<CircuitBreaker>>,
}

impl BreakerRegistry {
    /// Create a registry; every breaker it creates shares this configuration
    #[must_use]
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            breakers: DashMap::new(),
        }
    }

    /// Get (or lazily create) the breaker for an operation key
    pub fn get(&self, key: &str) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(key, &self.config)))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_key_shares_one_breaker() {
        let registry = BreakerRegistry::new(CircuitBreakerConfig::default());
        let a = registry.get("request-token");
        let b = registry.get("request-token");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn distinct_keys_are_isolated() {
        let registry = BreakerRegistry::new(CircuitBreakerConfig::default());
        let a = registry.get("request-token");
        let b = registry.get("revoke-token");
        assert!(!Arc::ptr_eq(&a, &b));
    }
}
