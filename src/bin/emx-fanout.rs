//! emx-fanout binary
//!
//! LLM gateway that sends one prompt to every configured provider

use anyhow::Result;
use clap::Parser;
use emx_fanout::gate::{start_server, GatewayConfig, GatewayState};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

/// emx-fanout: LLM fan-out gateway for EMX
#[derive(Parser, Debug)]
#[command(name = "emx-fanout")]
#[command(about = "LLM fan-out gateway for EMX", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to listen on
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(long)]
    port: Option<u16>,

    /// Per-provider call timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Profile store file
    #[arg(long)]
    store: Option<PathBuf>,

    /// Seed profiles from provider API keys in the environment
    #[arg(long)]
    seed_env: bool,

    /// Validate configuration
    #[arg(long)]
    validate: bool,

    /// Send one prompt to every stored profile and print the outcomes
    #[arg(long, value_name = "PROMPT", num_args = 0..=1, default_missing_value = "ping")]
    test: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let config_file = args.config.clone().or_else(GatewayConfig::discover);

    // Load configuration
    let mut gateway_config = if let Some(ref config_path) = config_file {
        println!("Loading config from: {}", config_path.display());
        GatewayConfig::load(config_path)?
    } else {
        println!("Using default configuration");
        GatewayConfig::default()
    };

    gateway_config.apply_env(|key| std::env::var(key).ok())?;

    // Override with CLI arguments
    if let Some(host) = args.host {
        gateway_config.host = host;
    }
    if let Some(port) = args.port {
        gateway_config.port = port;
    }
    if let Some(timeout) = args.timeout {
        gateway_config.timeout_secs = timeout;
    }
    if let Some(store) = args.store {
        gateway_config.store_path = store;
    }
    if args.seed_env {
        gateway_config.seed_from_env = true;
    }

    if args.validate {
        return validate_config(&gateway_config);
    }

    if let Some(prompt) = args.test {
        return test_config(&gateway_config, &prompt).await;
    }

    gateway_config.validate()?;
    start_server(gateway_config).await
}

/// Validate configuration
fn validate_config(config: &GatewayConfig) -> Result<()> {
    println!("Configuration validation:");
    println!("  Host: {}", config.host);
    println!("  Port: {}", config.port);
    println!("  Timeout: {}s", config.timeout_secs);
    println!("  Store: {}", config.store_path.display());

    config.validate()?;

    let store = emx_fanout::ConfigStore::open(&config.store_path);
    println!("  Profiles stored: {}", store.len());
    for (id, profile) in store.list_all() {
        println!("    - {} ({}, {}, {})", profile.name, profile.provider, profile.model, id);
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Send `prompt` to every stored profile and report each outcome
async fn test_config(config: &GatewayConfig, prompt: &str) -> Result<()> {
    println!("Testing configuration...");

    let state = GatewayState::from_config(config)?;
    let profiles = state.store.list_all();

    if profiles.is_empty() {
        println!("Warning: No profiles configured");
        println!("✓ Configuration test complete (no profiles to test)");
        return Ok(());
    }

    println!("Testing {} profile(s)...", profiles.len());

    let results = state.dispatcher.dispatch(prompt, None, &profiles).await?;

    for (id, outcome) in &results {
        let name = profiles.get(id).map(|p| p.name.as_str()).unwrap_or(id.as_str());
        match outcome {
            emx_fanout::Outcome::Answer(_) => println!("  {} ... OK", name),
            emx_fanout::Outcome::Failure(reason) => println!("  {} ... {}", name, reason),
        }
    }

    println!("\n✓ Configuration test complete");
    Ok(())
}
