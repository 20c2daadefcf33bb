//! Smartbus gateway runtime.
//!
//! Transports move wire frames between a bus and a pair of channels, a
//! [`Connection`] dispatches decoded messages to [`Endpoint`]s, and
//! [`Observer`]s receive them per message type.

pub mod bridge;
pub mod config;
pub mod connection;
pub mod dump;
pub mod error;
pub mod io;
pub mod logging;
pub mod observer;
pub mod transport;

pub use connection::{Connection, Device, Endpoint};
pub use dump::{format_message, DumpFormat, MessageDumper, MessageFormatter};
pub use error::GatewayError;
pub use io::{BusHandle, DatagramIo, StreamIo, StreamLock};
pub use observer::{notify, Observer};
pub use transport::{connect, BusAddress, TransportOptions};
