//! token-courier - fetch one client-credentials access token and print it

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::error;

use token_courier::{
    TokenService,
    cli::Cli,
    config::Config,
    failsafe::BreakerRegistry,
    resolver::StaticResolver,
    setup_tracing,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup tracing
    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let resolver = match StaticResolver::from_config(&config.resolver) {
        Ok(resolver) => Arc::new(resolver),
        Err(e) => {
            error!("Invalid resolver configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let registry = BreakerRegistry::new(config.circuit_breaker.clone());
    let service = TokenService::from_config(&config, resolver, &registry);

    match service.token().await {
        Ok(token) => {
            if cli.json {
                match serde_json::to_string_pretty(&token) {
                    Ok(json) => println!("{json}"),
                    Err(e) => {
                        error!("Failed to serialize token: {e}");
                        return ExitCode::FAILURE;
                    }
                }
            } else {
                println!("{}", token.value);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Token acquisition failed: {e}");
            ExitCode::FAILURE
        }
    }
}
