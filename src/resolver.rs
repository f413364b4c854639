//! Service address resolution
//!
//! The discovery registry itself is an external collaborator; this module
//! defines the seam the token service consumes plus a configuration-backed
//! implementation for deployments with fixed endpoints (and for tests).

use std::collections::HashMap;

use async_trait::async_trait;
use url::Url;

use crate::config::ResolverConfig;
use crate::{Error, Result};

/// A resolved network location of a service, as a base URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceAddress(String);

impl ServiceAddress {
    /// Parse and normalize a base URL (trailing slashes trimmed)
    ///
    /// # Errors
    ///
    /// Returns a `Config` error if the value is not an absolute URL.
    pub fn parse(raw: &str) -> Result<Self> {
        Url::parse(raw).map_err(|e| Error::Config(format!("Invalid service address '{raw}': {e}")))?;
        Ok(Self(raw.trim_end_matches('/').to_string()))
    }

    /// The base URL as a string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ServiceAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolves a logical service name to zero or more live addresses.
///
/// Results may change between calls; no caching obligation is placed on
/// implementors or consumers.
#[async_trait]
pub trait ServiceResolver: Send + Sync {
    /// Resolve a logical service name to its currently known addresses
    async fn resolve(&self, logical_name: &str) -> Result<Vec<ServiceAddress>>;
}

/// Resolver backed by a fixed map from configuration
pub struct StaticResolver {
    addresses: HashMap<String, Vec<ServiceAddress>>,
}

impl StaticResolver {
    /// Build from parsed addresses
    #[must_use]
    pub fn new(addresses: HashMap<String, Vec<ServiceAddress>>) -> Self {
        Self { addresses }
    }

    /// Build from the `resolver` config section, validating every URL
    ///
    /// # Errors
    ///
    /// Returns a `Config` error if any configured address is not a valid URL.
    pub fn from_config(config: &ResolverConfig) -> Result<Self> {
        let mut addresses = HashMap::new();
        for (name, raw_addresses) in &config.addresses {
            let parsed = raw_addresses
                .iter()
                .map(|raw| ServiceAddress::parse(raw))
                .collect::<Result<Vec<_>>>()?;
            addresses.insert(name.clone(), parsed);
        }
        Ok(Self::new(addresses))
    }
}

#[async_trait]
impl ServiceResolver for StaticResolver {
    async fn resolve(&self, logical_name: &str) -> Result<Vec<ServiceAddress>> {
        Ok(self
            .addresses
            .get(logical_name)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn address_normalizes_trailing_slash() {
        let address = ServiceAddress::parse("http://auth.internal:8080/").unwrap();
        assert_eq!(address.as_str(), "http://auth.internal:8080");
    }

    #[test]
    fn invalid_address_is_config_error() {
        let err = ServiceAddress::parse("not a url").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn static_resolver_returns_configured_addresses_in_order() {
        let config = ResolverConfig {
            addresses: HashMap::from([(
                "auth".to_string(),
                vec![
                    "http://auth-1.internal:8080".to_string(),
                    "http://auth-2.internal:8080".to_string(),
                ],
            )]),
        };
        let resolver = StaticResolver::from_config(&config).unwrap();

        let addresses = resolver.resolve("auth").await.unwrap();
        assert_eq!(addresses.len(), 2);
        assert_eq!(addresses[0].as_str(), "http://auth-1.internal:8080");
    }

    #[tokio::test]
    async fn unknown_name_resolves_to_empty_sequence() {
        let resolver = StaticResolver::new(HashMap::new());
        let addresses = resolver.resolve("missing").await.unwrap();
        assert!(addresses.is_empty());
    }

    #[test]
    fn bad_configured_address_fails_construction() {
        let config = ResolverConfig {
            addresses: HashMap::from([("auth".to_string(), vec!["::garbage::".to_string()])]),
        };
        assert!(StaticResolver::from_config(&config).is_err());
    }
}
