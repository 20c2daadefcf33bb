//! Frame codec.
//!
//! Frame format (multi-byte integers are big-endian):
//! ```text
//! +-------+-----+---------+---------+--------+---------+---------+---------+-----+
//! | Sync  | Len | Orig    | Orig    | Opcode | Target  | Target  | Payload | CRC |
//! | AA AA |     | subnet  | device  |        | subnet  | device  |         |     |
//! |       |     |         | + type  |        |         |         |         |     |
//! +-------+-----+---------+---------+--------+---------+---------+---------+-----+
//! |   2   |  1  |    1    |  1 + 2  |   2    |    1    |    1    |   var   |  2  |
//! ```
//!
//! `Len` counts itself, the header, the payload and the CRC. The CRC covers
//! everything from `Len` through the end of the payload.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::crc::crc16;
use crate::error::ProtocolError;
use crate::messages::Message;
use crate::registry::Registry;
use crate::types::*;

const CRC_SIZE: usize = 2;

fn write_header(buf: &mut BytesMut, header: &MessageHeader) {
    buf.put_u8(header.orig_subnet_id);
    buf.put_u8(header.orig_device_id);
    buf.put_u16(header.orig_device_type);
    buf.put_u16(header.opcode);
    buf.put_u8(header.target_subnet_id);
    buf.put_u8(header.target_device_id);
}

fn read_header(buf: &mut Bytes) -> Result<MessageHeader, ProtocolError> {
    if buf.remaining() < HEADER_SIZE {
        return Err(ProtocolError::IncompleteFrame {
            expected: HEADER_SIZE,
            actual: buf.remaining(),
        });
    }
    Ok(MessageHeader {
        orig_subnet_id: buf.get_u8(),
        orig_device_id: buf.get_u8(),
        orig_device_type: buf.get_u16(),
        opcode: buf.get_u16(),
        target_subnet_id: buf.get_u8(),
        target_device_id: buf.get_u8(),
    })
}

/// Encode a message into a complete wire frame, sync bytes included.
///
/// The header's opcode is taken from the message; `header` itself is left
/// untouched.
pub fn encode_frame(header: &MessageHeader, message: &Message) -> Result<Bytes, ProtocolError> {
    let header = MessageHeader {
        opcode: message.opcode(),
        ..*header
    };

    let mut frame = BytesMut::with_capacity(SYNC.len() + MIN_FRAME_SIZE + 16);
    frame.put_slice(&SYNC);
    frame.put_u8(0); // length, patched below
    write_header(&mut frame, &header);
    message.write_payload(&mut frame)?;

    let len = frame.len() - SYNC.len() + CRC_SIZE;
    if len > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge(len));
    }
    frame[SYNC.len()] = len as u8;

    let crc = crc16(&frame[SYNC.len()..]);
    frame.put_u16(crc);
    Ok(frame.freeze())
}

/// Check the length byte and CRC of a frame.
///
/// `frame` starts at the length byte and runs through the CRC.
pub fn verify_frame(frame: &[u8]) -> Result<(), ProtocolError> {
    let declared = match frame.first() {
        Some(len) => *len as usize,
        None => return Err(ProtocolError::FrameTooShort(0)),
    };
    if declared < MIN_FRAME_SIZE {
        return Err(ProtocolError::FrameTooShort(declared));
    }
    if frame.len() != declared {
        return Err(ProtocolError::LengthMismatch {
            declared,
            actual: frame.len(),
        });
    }

    let (body, tail) = frame.split_at(declared - CRC_SIZE);
    let received = u16::from_be_bytes([tail[0], tail[1]]);
    let computed = crc16(body);
    if received != computed {
        return Err(ProtocolError::BadCrc {
            expected: computed,
            actual: received,
        });
    }
    Ok(())
}

/// Decode a frame whose CRC has already been checked.
///
/// `frame` starts at the length byte and runs through the CRC. Trailing
/// payload bytes the message does not consume are ignored.
pub fn decode_frame(registry: &Registry, frame: &[u8]) -> Result<SmartbusMessage, ProtocolError> {
    if frame.len() < MIN_FRAME_SIZE {
        return Err(ProtocolError::FrameTooShort(frame.len()));
    }
    let mut buf = Bytes::copy_from_slice(&frame[1..frame.len() - CRC_SIZE]);
    let header = read_header(&mut buf)?;
    let message = registry.parse(header.opcode, &mut buf)?;
    Ok(SmartbusMessage { header, message })
}

/// Verify and decode a frame in one step.
pub fn parse_frame(registry: &Registry, frame: &[u8]) -> Result<SmartbusMessage, ProtocolError> {
    verify_frame(frame)?;
    decode_frame(registry, frame)
}
