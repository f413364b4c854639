//! Token service facade
//!
//! Composes resolver, credential encoder and the circuit-breaker-wrapped
//! executor into a single asynchronous `token()` call.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::credentials::ClientCredentials;
use crate::executor::TokenRequestExecutor;
use crate::failsafe::{BreakerRegistry, CircuitBreaker};
use crate::resolver::ServiceResolver;
use crate::{Error, Result};

/// An access token obtained via the client-credentials grant.
///
/// Immutable; created only as the successful result of a token exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    /// Opaque bearer string
    #[serde(rename = "access_token")]
    pub value: String,
    /// Token type, usually "Bearer"
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Seconds until expiry
    #[serde(default)]
    pub expires_in: u64,
    /// Granted scope, if the server reported one
    #[serde(default)]
    pub scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Acquires access tokens from a dynamically-located authorization service
pub struct TokenService {
    resolver: Arc<dyn ServiceResolver>,
    credentials: ClientCredentials,
    executor: TokenRequestExecutor,
    auth_service: String,
    breaker: Arc<CircuitBreaker>,
}

impl TokenService {
    /// Compose a token service from its collaborators
    #[must_use]
    pub fn new(
        resolver: Arc<dyn ServiceResolver>,
        credentials: ClientCredentials,
        executor: TokenRequestExecutor,
        auth_service: impl Into<String>,
        breaker: Arc<CircuitBreaker>,
    ) -> Self {
        Self {
            resolver,
            credentials,
            executor,
            auth_service: auth_service.into(),
            breaker,
        }
    }

    /// Build the full composition from configuration plus a resolver.
    ///
    /// The registry keys the breaker by `auth.operation_key`, so every
    /// instance built from the same registry shares breaker state.
    #[must_use]
    pub fn from_config(
        config: &Config,
        resolver: Arc<dyn ServiceResolver>,
        registry: &BreakerRegistry,
    ) -> Self {
        Self::new(
            resolver,
            ClientCredentials::new(&config.oauth.client_id, &config.oauth.client_secret),
            TokenRequestExecutor::new(reqwest::Client::new(), &config.auth.path),
            &config.auth.service,
            registry.get(&config.auth.operation_key),
        )
    }

    /// Acquire an access token.
    ///
    /// Resolves the authorization service, encodes the credentials and issues
    /// the grant request through the circuit breaker. Every failure surfaces
    /// as its typed error; nothing is retried or swallowed here.
    ///
    /// # Errors
    ///
    /// `NoAddressAvailable` when resolution yields nothing; otherwise any
    /// breaker or executor error.
    pub async fn token(&self) -> Result<AccessToken> {
        let addresses = self.resolver.resolve(&self.auth_service).await?;

        // First address wins when several are advertised
        let Some(address) = addresses.into_iter().next() else {
            return Err(Error::NoAddressAvailable(self.auth_service.clone()));
        };
        debug!(service = %self.auth_service, %address, "Resolved authorization service");

        let authorization = self.credentials.basic_authorization();
        self.breaker
            .call(|| self.executor.request_token(&address, &authorization))
            .await
    }
}
