//! Configuration management

use std::{collections::HashMap, path::Path, time::Duration};

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Config {
    /// OAuth client credentials
    pub oauth: OAuthConfig,
    /// Authorization service location
    pub auth: AuthConfig,
    /// Static resolver addresses
    pub resolver: ResolverConfig,
    /// Circuit breaker configuration
    pub circuit_breaker: CircuitBreakerConfig,
}

/// OAuth client credentials configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct OAuthConfig {
    /// Client identifier for the client-credentials grant
    pub client_id: String,
    /// Client secret (never logged)
    pub client_secret: String,
}

/// Authorization service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Logical service name handed to the resolver
    pub service: String,
    /// Token-exchange path appended to the resolved address
    pub path: String,
    /// Breaker operation key shared by all token requests
    pub operation_key: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            service: "auth".to_string(),
            path: "oauth/token".to_string(),
            operation_key: "request-token".to_string(),
        }
    }
}

/// Static resolver configuration: logical name to base URLs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct ResolverConfig {
    /// Addresses per logical service name
    pub addresses: HashMap<String, Vec<String>>,
}

/// Circuit breaker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Enable circuit breaker
    pub enabled: bool,
    /// Minimum calls in the rolling window before the error rate is evaluated
    pub request_volume_threshold: u32,
    /// Failure percentage at or above which the circuit opens
    pub error_threshold_percentage: u32,
    /// Time the circuit stays open before admitting a probe
    #[serde(with = "humantime_serde")]
    pub sleep_window: Duration,
    /// Breaker-enforced wall-clock bound on each admitted call
    #[serde(with = "humantime_serde")]
    pub execution_timeout: Duration,
    /// Span of the rolling outcome window
    #[serde(with = "humantime_serde")]
    pub rolling_window: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            request_volume_threshold: 10,
            error_threshold_percentage: 10,
            sleep_window: Duration::from_secs(10),
            execution_timeout: Duration::from_millis(1000),
            rolling_window: Duration::from_secs(10),
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// # Errors
    ///
    /// Returns an error if the config file does not exist or cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        // Load from file if provided
        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        // Merge environment variables (TOKEN_COURIER_ prefix)
        figment = figment.merge(Env::prefixed("TOKEN_COURIER_").split("__"));

        let config: Self = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate threshold sanity
    fn validate(&self) -> Result<()> {
        if self.circuit_breaker.error_threshold_percentage > 100 {
            return Err(Error::Config(format!(
                "error_threshold_percentage must be 0-100, got {}",
                self.circuit_breaker.error_threshold_percentage
            )));
        }
        if self.circuit_breaker.enabled && self.circuit_breaker.execution_timeout.is_zero() {
            return Err(Error::Config(
                "execution_timeout must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn breaker_defaults() {
        let config = CircuitBreakerConfig::default();
        assert!(config.enabled);
        assert_eq!(config.request_volume_threshold, 10);
        assert_eq!(config.error_threshold_percentage, 10);
        assert_eq!(config.sleep_window, Duration::from_secs(10));
        assert_eq!(config.execution_timeout, Duration::from_millis(1000));
        assert_eq!(config.rolling_window, Duration::from_secs(10));
    }

    #[test]
    fn load_without_file_yields_defaults() {
        let config = Config::load(None).unwrap();
        assert_eq!(config.auth.service, "auth");
        assert_eq!(config.auth.path, "oauth/token");
        assert_eq!(config.auth.operation_key, "request-token");
        assert!(config.resolver.addresses.is_empty());
    }

    #[test]
    fn load_missing_file_is_config_error() {
        let err = Config::load(Some(Path::new("/nonexistent/config.yaml"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn load_yaml_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::with_suffix(".yaml").unwrap();
        writeln!(
            file,
            concat!(
                "oauth:\n",
                "  client_id: planes\n",
                "  client_secret: s3cret\n",
                "auth:\n",
                "  service: auth-service\n",
                "  path: token\n",
                "resolver:\n",
                "  addresses:\n",
                "    auth-service:\n",
                "      - http://auth-1.internal:8080\n",
                "      - http://auth-2.internal:8080\n",
                "circuit_breaker:\n",
                "  error_threshold_percentage: 50\n",
                "  sleep_window: 5s\n",
            )
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.oauth.client_id, "planes");
        assert_eq!(config.auth.service, "auth-service");
        assert_eq!(
            config.resolver.addresses["auth-service"],
            vec![
                "http://auth-1.internal:8080".to_string(),
                "http://auth-2.internal:8080".to_string()
            ]
        );
        assert_eq!(config.circuit_breaker.error_threshold_percentage, 50);
        assert_eq!(config.circuit_breaker.sleep_window, Duration::from_secs(5));
        // Untouched sections keep their defaults
        assert_eq!(config.circuit_breaker.request_volume_threshold, 10);
    }

    #[test]
    fn percentage_above_100_is_rejected() {
        let config = Config {
            circuit_breaker: CircuitBreakerConfig {
                error_threshold_percentage: 150,
                ..CircuitBreakerConfig::default()
            },
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
