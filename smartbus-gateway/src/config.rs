//! Command line and configuration file handling.

use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;

use crate::dump::DumpFormat;
use crate::error::GatewayError;
use crate::io::DEFAULT_QUEUE_SIZE;
use crate::transport::{BusAddress, TransportOptions};

/// Configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "smartbus-gateway.toml";

pub const DEFAULT_SUBNET_ID: u8 = 0x01;
pub const DEFAULT_DEVICE_ID: u8 = 0x99;
pub const DEFAULT_DEVICE_TYPE: u16 = 0x1234;
pub const DEFAULT_LOG_DIR: &str = "logs";
pub const DEFAULT_LOG_RETENTION_DAYS: u64 = 7;

/// smartbus-gateway - Smartbus field bus gateway
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Bus address: tcp://host:port, host:port or udp
    #[arg(short, long)]
    pub address: Option<String>,

    /// Configuration file path
    #[arg(short = 'f', long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Bridge the stream bus to Smartbus UDP (`--udp-gateway=false` overrides the file)
    #[arg(
        long,
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub udp_gateway: Option<bool>,

    /// Subnet id of the local endpoint [default: 0x01]
    #[arg(long, value_parser = parse_u8)]
    pub subnet_id: Option<u8>,

    /// Device id of the local endpoint [default: 0x99]
    #[arg(long, value_parser = parse_u8)]
    pub device_id: Option<u8>,

    /// Device type of the local endpoint [default: 0x1234]
    #[arg(long, value_parser = parse_u16)]
    pub device_type: Option<u16>,

    /// Directory where log files are stored [default: logs]
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Number of days to keep log files [default: 7]
    #[arg(long)]
    pub log_retention_days: Option<u64>,
}

fn parse_number(s: &str) -> Result<u64, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid number '{}': {}", s, e))
}

fn parse_u8(s: &str) -> Result<u8, String> {
    let n = parse_number(s)?;
    u8::try_from(n).map_err(|_| format!("{} does not fit in a byte", s))
}

fn parse_u16(s: &str) -> Result<u16, String> {
    let n = parse_number(s)?;
    u16::try_from(n).map_err(|_| format!("{} does not fit in 16 bits", s))
}

/// Configuration file format.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub bus: BusSection,
    #[serde(default)]
    pub endpoint: EndpointSection,
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub dump: DumpSection,
}

#[derive(Debug, Deserialize, Default)]
pub struct BusSection {
    pub address: Option<String>,
    pub udp_gateway: Option<bool>,
    pub queue_size: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
pub struct EndpointSection {
    pub subnet_id: Option<u8>,
    pub device_id: Option<u8>,
    pub device_type: Option<u16>,
}

#[derive(Debug, Deserialize, Default)]
pub struct LoggingSection {
    pub log_dir: Option<String>,
    pub retention_days: Option<u64>,
    pub level: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct DumpSection {
    pub enabled: Option<bool>,
    pub format: Option<DumpFormat>,
    pub sniff: Option<bool>,
}

pub fn load_config(path: &Path) -> Result<ConfigFile, GatewayError> {
    let contents = std::fs::read_to_string(path)?;
    toml::from_str(&contents)
        .map_err(|e| GatewayError::Config(format!("{}: {}", path.display(), e)))
}

/// Explicit path, else `smartbus-gateway.toml` if present.
pub fn config_path(args: &Args) -> Option<PathBuf> {
    args.config.clone().or_else(|| {
        let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
        if default_path.exists() {
            Some(default_path)
        } else {
            None
        }
    })
}

/// Effective settings after merging the command line over the file.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub address: BusAddress,
    pub transport: TransportOptions,
    pub subnet_id: u8,
    pub device_id: u8,
    pub device_type: u16,
    pub log_dir: PathBuf,
    pub log_retention_days: u64,
    pub log_level: String,
    pub dump_enabled: bool,
    pub dump_format: DumpFormat,
    pub dump_sniff: bool,
}

impl GatewayConfig {
    pub fn resolve(args: &Args, file: &ConfigFile) -> Result<Self, GatewayError> {
        let address = args
            .address
            .as_deref()
            .or(file.bus.address.as_deref())
            .ok_or_else(|| {
                GatewayError::Config("no bus address given (--address or [bus] address)".into())
            })?
            .parse::<BusAddress>()?;

        let log_level = if args.verbose {
            "debug".to_string()
        } else {
            file.logging.level.clone().unwrap_or_else(|| "info".to_string())
        };

        Ok(Self {
            address,
            transport: TransportOptions {
                queue_size: file.bus.queue_size.unwrap_or(DEFAULT_QUEUE_SIZE),
                udp_gateway: args.udp_gateway.or(file.bus.udp_gateway).unwrap_or(false),
            },
            subnet_id: args
                .subnet_id
                .or(file.endpoint.subnet_id)
                .unwrap_or(DEFAULT_SUBNET_ID),
            device_id: args
                .device_id
                .or(file.endpoint.device_id)
                .unwrap_or(DEFAULT_DEVICE_ID),
            device_type: args
                .device_type
                .or(file.endpoint.device_type)
                .unwrap_or(DEFAULT_DEVICE_TYPE),
            log_dir: args
                .log_dir
                .clone()
                .or_else(|| file.logging.log_dir.as_ref().map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR)),
            log_retention_days: args
                .log_retention_days
                .or(file.logging.retention_days)
                .unwrap_or(DEFAULT_LOG_RETENTION_DAYS),
            log_level,
            dump_enabled: file.dump.enabled.unwrap_or(true),
            dump_format: file.dump.format.unwrap_or_default(),
            dump_sniff: file.dump.sniff.unwrap_or(false),
        })
    }
}
