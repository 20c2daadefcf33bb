//! Error types for the Smartbus wire protocol.

use thiserror::Error;

/// Protocol-level errors raised while encoding or decoding frames.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Opcode has no registered parser.
    #[error("opcode {0:04x} not recognized")]
    UnknownOpcode(u16),

    /// Payload ended before a field could be read.
    #[error("Incomplete frame: expected {expected} bytes, got {actual}")]
    IncompleteFrame { expected: usize, actual: usize },

    /// Length byte is below the minimum frame size.
    #[error("frame too short: {0} bytes")]
    FrameTooShort(usize),

    /// Encoded frame does not fit into the single length byte.
    #[error("Frame too large: {0} bytes (max: 255)")]
    FrameTooLarge(usize),

    /// Length byte disagrees with the number of bytes supplied.
    #[error("Frame length mismatch: declared {declared}, got {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    /// Trailing CRC does not match the frame contents.
    #[error("bad crc: expected {expected:04x}, got {actual:04x}")]
    BadCrc { expected: u16, actual: u16 },

    /// Success flag byte other than 0xF8 / 0xF5.
    #[error("bad success flag value {0:02x}")]
    BadSuccessFlag(u8),

    /// Remark blob is 64 bytes or longer.
    #[error("remark field too long: {0} bytes")]
    RemarkTooLong(usize),

    /// Variable-length field does not fit into its length prefix.
    #[error("{field} field too long: {len} entries")]
    FieldTooLong { field: &'static str, len: usize },

    /// QueryModulesResponse carries a device category with no known layout.
    #[error("bad QueryModulesResponse DeviceCategory field {0:02x}")]
    BadDeviceCategory(u8),

    /// UDP datagram is too short to carry a frame.
    #[error("datagram too short: {0} bytes")]
    DatagramTooShort(usize),

    /// UDP datagram does not carry the SMARTCLOUD signature.
    #[error("bad datagram signature")]
    BadDatagramSignature,
}
