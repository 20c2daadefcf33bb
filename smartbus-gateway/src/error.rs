//! Gateway error types.

use smartbus_protocol::ProtocolError;
use thiserror::Error;

/// Errors surfaced by the gateway runtime.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Frame could not be encoded or decoded.
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Transport I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Outbound queue is closed; the bus connection has stopped.
    #[error("Connection closed")]
    ConnectionClosed,

    /// The endpoint a device handle belongs to has been dropped.
    #[error("Endpoint closed")]
    EndpointClosed,

    /// Bus address string could not be parsed.
    #[error("Invalid bus address: {0}")]
    InvalidAddress(String),

    /// Transport kind is recognized but not provided by this build.
    #[error("Unsupported transport: {0}")]
    UnsupportedTransport(String),

    /// Configuration is inconsistent.
    #[error("Configuration error: {0}")]
    Config(String),
}
