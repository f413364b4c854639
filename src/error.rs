//! Error types for token-courier

use std::time::Duration;

use thiserror::Error;

/// Result type alias for token-courier
pub type Result<T> = std::result::Result<T, Error>;

/// Token acquisition errors
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The resolver returned no address for the logical service name
    #[error("No address available for service: {0}")]
    NoAddressAvailable(String),

    /// The authorization server rejected the request (4xx)
    ///
    /// A caller/credentials problem. Never counted against the circuit
    /// breaker and never retried by this crate.
    #[error("Client request rejected: HTTP {status} - {body}")]
    ClientRequest {
        /// HTTP status code
        status: u16,
        /// Response body, as returned by the server
        body: String,
    },

    /// The authorization server failed (5xx)
    #[error("Authorization server error: HTTP {status}")]
    Server {
        /// HTTP status code
        status: u16,
    },

    /// Transport/connection failure before a response was received
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server answered success but the body was not a token
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Fast-fail: the circuit for this operation is open
    #[error("Circuit open for operation: {0}")]
    CircuitOpen(String),

    /// The breaker-enforced execution timeout elapsed
    #[error("Operation '{operation}' timed out after {timeout:?}")]
    ExecutionTimeout {
        /// Logical operation key
        operation: String,
        /// The configured execution timeout
        timeout: Duration,
    },
}

impl Error {
    /// Whether this error counts toward circuit breaker failure accounting.
    ///
    /// Server, transport and protocol faults indicate systemic unhealthiness;
    /// 4xx responses indicate a bad caller and must not trip the circuit.
    #[must_use]
    pub fn is_breaker_counted(&self) -> bool {
        matches!(
            self,
            Self::Server { .. } | Self::Transport(_) | Self::Protocol(_)
        )
    }
}
