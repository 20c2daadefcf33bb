//! smartbus-gateway: Smartbus field bus gateway.
//!
//! Connects to the bus, attaches one local endpoint and dumps the traffic
//! it sees.

use std::sync::Arc;

use clap::Parser;
use log::{error, info, warn};

use smartbus_gateway::config::{config_path, load_config, Args, ConfigFile, GatewayConfig};
use smartbus_gateway::{logging, transport, Connection, MessageDumper};
use smartbus_protocol::Registry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let file_config = match config_path(&args) {
        Some(path) => match load_config(&path) {
            Ok(c) => {
                eprintln!("Loaded config from: {}", path.display());
                c
            }
            Err(e) => {
                eprintln!("Failed to load config file: {}", e);
                return Err(e.into());
            }
        },
        None => ConfigFile::default(),
    };
    let config = GatewayConfig::resolve(&args, &file_config)?;

    logging::init_logging(&config.log_dir, config.log_retention_days, &config.log_level)?;

    let registry = Arc::new(Registry::standard());

    info!("smartbus-gateway starting...");
    info!("  Bus address: {}", config.address);
    info!("  UDP gateway: {}", config.transport.udp_gateway);
    info!(
        "  Endpoint: {:02x}/{:02x} (type {:04x})",
        config.subnet_id, config.device_id, config.device_type
    );
    info!("  Registered messages: {}", registry.len());
    info!("  Log directory: {:?}", config.log_dir);

    let handle = match transport::connect(&config.address, registry, &config.transport).await {
        Ok(handle) => handle,
        Err(e) => {
            error!("Failed to open bus {}: {}", config.address, e);
            return Err(e.into());
        }
    };
    let connection = Connection::new(handle)?;
    let endpoint = connection.endpoint(config.subnet_id, config.device_id, config.device_type);

    if config.dump_enabled {
        endpoint.observe(Arc::new(MessageDumper::new("recv", config.dump_format)));
        if config.dump_sniff {
            endpoint.add_input_sniffer(Arc::new(MessageDumper::new("sniff", config.dump_format)));
            endpoint.add_output_sniffer(Arc::new(MessageDumper::new("sent", config.dump_format)));
        }
    }

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Shutting down..."),
        _ = connection.closed() => warn!("Bus connection closed"),
    }

    connection.close().await;
    info!("smartbus-gateway stopped");
    Ok(())
}
