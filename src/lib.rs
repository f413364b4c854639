//! token-courier
//!
//! Circuit-breaker protected OAuth2 client-credentials token acquisition
//! with discovery-based endpoint resolution.
//!
//! # Features
//!
//! - **Client-credentials grant**: `Basic` auth token exchange against a
//!   dynamically resolved authorization service
//! - **Circuit breaker**: rolling-window error accounting, sleep window,
//!   single-probe half-open recovery, breaker-enforced execution timeout
//! - **Typed failures**: every outcome surfaces as a typed error; retry and
//!   backoff policy stay with the caller
//!
//! The whole pipeline is one asynchronous call: resolve the service address,
//! encode the credentials, issue the request through the breaker.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod credentials;
pub mod error;
pub mod executor;
pub mod failsafe;
pub mod resolver;
pub mod token;

pub use error::{Error, Result};
pub use token::{AccessToken, TokenService};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => {
            subscriber.with(fmt::layer().json()).init();
        }
        _ => {
            subscriber.with(fmt::layer()).init();
        }
    }

    Ok(())
}
