//! Bus address parsing and transport setup.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use log::info;
use tokio::net::TcpStream;

use smartbus_protocol::Registry;

use crate::bridge::start_bridged;
use crate::error::GatewayError;
use crate::io::{BusHandle, DatagramIo, StreamIo, DEFAULT_QUEUE_SIZE};

/// Where the bus is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusAddress {
    /// RS-485 converter reachable over TCP, as `host:port`.
    Tcp(String),
    /// Smartbus UDP on port 6000.
    Udp,
}

impl FromStr for BusAddress {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("udp") {
            return Ok(BusAddress::Udp);
        }
        if s.starts_with('/') || s.starts_with("serial:") {
            return Err(GatewayError::UnsupportedTransport(s.to_string()));
        }

        let addr = s.strip_prefix("tcp://").unwrap_or(s);
        match addr.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {
                Ok(BusAddress::Tcp(addr.to_string()))
            }
            _ => Err(GatewayError::InvalidAddress(s.to_string())),
        }
    }
}

impl fmt::Display for BusAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusAddress::Tcp(addr) => write!(f, "tcp://{}", addr),
            BusAddress::Udp => f.write_str("udp"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransportOptions {
    pub queue_size: usize,
    /// Bridge a stream transport to Smartbus UDP.
    pub udp_gateway: bool,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            queue_size: DEFAULT_QUEUE_SIZE,
            udp_gateway: false,
        }
    }
}

/// Open the bus at `address` and start its transport.
pub async fn connect(
    address: &BusAddress,
    registry: Arc<Registry>,
    options: &TransportOptions,
) -> Result<BusHandle, GatewayError> {
    match address {
        BusAddress::Tcp(addr) => {
            let stream = TcpStream::connect(addr.as_str()).await?;
            stream.set_nodelay(true)?;
            info!("Connected to {}", address);

            let stream_io = StreamIo::new(registry.clone()).with_queue_size(options.queue_size);
            if !options.udp_gateway {
                return Ok(stream_io.start(stream));
            }
            let datagram_io = DatagramIo::new(registry).with_queue_size(options.queue_size);
            let socket = datagram_io.bind().await?;
            Ok(start_bridged(
                stream_io,
                stream,
                datagram_io,
                socket,
                options.queue_size,
            ))
        }
        BusAddress::Udp => {
            if options.udp_gateway {
                return Err(GatewayError::Config(format!(
                    "UDP gateway mode needs a stream transport, not {}",
                    address
                )));
            }
            DatagramIo::new(registry)
                .with_queue_size(options.queue_size)
                .start()
                .await
        }
    }
}
