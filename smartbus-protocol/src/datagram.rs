//! UDP envelope.
//!
//! Over UDP every frame travels in its own datagram:
//! ```text
//! +-----------+--------------+-------+-----+--------+---------+-----+
//! | Source IP | "SMARTCLOUD" | AA AA | Len | Header | Payload | CRC |
//! +-----------+--------------+-------+-----+--------+---------+-----+
//! |     4     |      10      |   2   |  1  |   8    |   var   |  2  |
//! ```

use std::net::Ipv4Addr;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;
use crate::types::SYNC;

/// Well-known Smartbus UDP port.
pub const SMARTBUS_UDP_PORT: u16 = 6000;

/// Signature that follows the source address.
pub const UDP_SIGNATURE: &[u8; 10] = b"SMARTCLOUD";

const SOURCE_IP_SIZE: usize = 4;

/// Bytes preceding the length byte: source ip, signature and sync.
pub const DATAGRAM_PREFIX_SIZE: usize = SOURCE_IP_SIZE + UDP_SIGNATURE.len() + SYNC.len();

/// Wrap a complete wire frame (sync bytes included) into a datagram.
pub fn encode_datagram(source_ip: Ipv4Addr, wire_frame: &[u8]) -> Bytes {
    let mut packet = BytesMut::with_capacity(SOURCE_IP_SIZE + UDP_SIGNATURE.len() + wire_frame.len());
    packet.put_slice(&source_ip.octets());
    packet.put_slice(UDP_SIGNATURE);
    packet.put_slice(wire_frame);
    packet.freeze()
}

/// Extract the frame carried by a datagram.
///
/// The returned slice starts at the length byte, as expected by
/// [`crate::codec::parse_frame`].
pub fn decode_datagram(packet: &[u8]) -> Result<&[u8], ProtocolError> {
    if packet.len() < DATAGRAM_PREFIX_SIZE {
        return Err(ProtocolError::DatagramTooShort(packet.len()));
    }
    let signature = &packet[SOURCE_IP_SIZE..SOURCE_IP_SIZE + UDP_SIGNATURE.len()];
    let sync = &packet[SOURCE_IP_SIZE + UDP_SIGNATURE.len()..DATAGRAM_PREFIX_SIZE];
    if signature != UDP_SIGNATURE || sync != SYNC {
        return Err(ProtocolError::BadDatagramSignature);
    }
    Ok(&packet[DATAGRAM_PREFIX_SIZE..])
}

/// Source address field of a datagram.
pub fn datagram_source(packet: &[u8]) -> Option<Ipv4Addr> {
    let octets: [u8; SOURCE_IP_SIZE] = packet.get(..SOURCE_IP_SIZE)?.try_into().ok()?;
    Some(Ipv4Addr::from(octets))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::tests::golden_frames;
    use crate::codec::{encode_frame, parse_frame};
    use crate::registry::Registry;

    #[test]
    fn test_datagram_wraps_frame() {
        let (header, msg, wire) = golden_frames().remove(0);
        let frame = encode_frame(&header, &msg).unwrap();
        let packet = encode_datagram(Ipv4Addr::new(192, 168, 1, 20), &frame);

        assert_eq!(&packet[..4], &[192, 168, 1, 20]);
        assert_eq!(&packet[4..14], b"SMARTCLOUD");
        assert_eq!(&packet[14..], &wire[..]);
        assert_eq!(datagram_source(&packet), Some(Ipv4Addr::new(192, 168, 1, 20)));

        let inner = decode_datagram(&packet).unwrap();
        let decoded = parse_frame(&Registry::standard(), inner).unwrap();
        assert_eq!(decoded.message, msg);
    }

    #[test]
    fn test_datagram_too_short() {
        let packet = [0u8; 15];
        assert_eq!(decode_datagram(&packet), Err(ProtocolError::DatagramTooShort(15)));
        assert_eq!(datagram_source(&packet[..3]), None);
    }

    #[test]
    fn test_datagram_bad_signature() {
        let mut packet = encode_datagram(Ipv4Addr::BROADCAST, &golden_frames()[3].2).to_vec();
        packet[5] = b'X';
        assert_eq!(decode_datagram(&packet), Err(ProtocolError::BadDatagramSignature));

        let mut packet = encode_datagram(Ipv4Addr::BROADCAST, &golden_frames()[3].2).to_vec();
        packet[15] = 0x00;
        assert_eq!(decode_datagram(&packet), Err(ProtocolError::BadDatagramSignature));
    }
}
