//! MQTT ACL Agent CLI
//!
//! Evaluates one authorization request against a configuration file and
//! prints the decision as JSON.

use anyhow::Result;
use clap::Parser;
use sentinel_agent_mqtt_acl::{AclGateway, AclGatewayConfig, AuthRequest};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// MQTT ACL checker
#[derive(Parser, Debug)]
#[command(name = "sentinel-mqtt-acl")]
#[command(author = "Sentinel Contributors")]
#[command(version)]
#[command(about = "Check MQTT topic access against an ACL configuration", long_about = None)]
struct Args {
    /// Configuration file path (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Username; omit for an anonymous request
    #[arg(short, long)]
    username: Option<String>,

    /// Password supplied with the request
    #[arg(short, long)]
    password: Option<String>,

    /// Topic to check; omit for a connect check
    #[arg(short, long)]
    topic: Option<String>,

    /// Access bitmask (READ=1, WRITE=2, SUBSCRIBE=4)
    #[arg(short, long)]
    acc: Option<u8>,

    /// Client ID supplied with the request
    #[arg(long)]
    client_id: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Enable JSON log format
    #[arg(long)]
    json_logs: bool,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Initialize logging on stderr; stdout carries the decision
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    if args.json_logs {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }

    info!(version = env!("CARGO_PKG_VERSION"), "Starting MQTT ACL check");

    // Load configuration
    let config = if let Some(config_path) = &args.config {
        info!(path = %config_path.display(), "Loading configuration from file");
        AclGatewayConfig::from_file(config_path)?
    } else {
        AclGatewayConfig::default()
    };

    let gateway = AclGateway::with_config(config)?;

    let request = AuthRequest {
        username: args.username,
        password: args.password,
        topic: args.topic,
        acc: args.acc,
        clientid: args.client_id,
    };

    let decision = gateway.check(&request);
    println!("{}", serde_json::to_string(&decision)?);

    Ok(if decision.allowed {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}
