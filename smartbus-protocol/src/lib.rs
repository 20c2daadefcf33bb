//! Wire protocol for the Smartbus RS-485/UDP field bus.
//!
//! This crate covers the pure, synchronous part of the protocol: the frame
//! checksum, the field codec, the message set, the opcode registry and the
//! frame codec. Transports live in `smartbus-gateway`.
//!
//! # Frame Format
//!
//! ```text
//! +-------+-----+-----------------------------------------+---------+--------+
//! | Sync  | Len | Header                                  | Payload | CRC    |
//! | AA AA | u8  | orig subnet/device/type, opcode, target | (var)   | u16 BE |
//! +-------+-----+-----------------------------------------+---------+--------+
//! ```
//!
//! # Example
//!
//! ```rust
//! use smartbus_protocol::{
//!     encode_frame, parse_frame, Message, MessageHeader, Registry, SingleChannelControlCommand,
//! };
//!
//! let header = MessageHeader {
//!     orig_subnet_id: 0x01,
//!     orig_device_id: 0x14,
//!     orig_device_type: 0x0095,
//!     target_subnet_id: 0x01,
//!     target_device_id: 0x1c,
//!     ..Default::default()
//! };
//! let msg = SingleChannelControlCommand { channel_no: 7, level: 100, duration: 0 };
//!
//! let frame = encode_frame(&header, &msg.clone().into()).unwrap();
//! assert_eq!(&frame[frame.len() - 2..], &[0x60, 0x66]);
//!
//! let registry = Registry::standard();
//! let decoded = parse_frame(&registry, &frame[2..]).unwrap();
//! assert_eq!(decoded.header.opcode, 0x0031);
//! assert_eq!(decoded.message, Message::from(msg));
//! ```

pub mod codec;
pub mod crc;
pub mod datagram;
pub mod error;
pub mod field;
pub mod messages;
pub mod registry;
pub mod types;

pub use codec::{decode_frame, encode_frame, parse_frame, verify_frame};
pub use crc::crc16;
pub use datagram::{decode_datagram, encode_datagram, SMARTBUS_UDP_PORT, UDP_SIGNATURE};
pub use error::ProtocolError;
pub use messages::{
    AssignPanelButton, AssignPanelButtonResponse, ButtonAssignment, Fields, Message, MessageKind,
    PanelControlResponse, PreprocessedMessage, QueryFanController, QueryModules,
    QueryModulesResponse, QueryModulesResponseRaw, QueryPanelButtonAssignment,
    QueryPanelButtonAssignmentResponse, ReadMacAddress, ReadMacAddressResponse,
    SetPanelButtonModes, SetPanelButtonModesResponse, SimpleMessage, SingleChannelControlCommand,
    SingleChannelControlResponse, ZoneBeastBroadcast,
};
pub use registry::Registry;
pub use types::*;
