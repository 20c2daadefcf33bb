//! Frame checksum.
//!
//! Smartbus protects every frame with CRC-16/XMODEM (polynomial 0x1021,
//! zero initial value, no reflection), transmitted big-endian.

use crc::{Crc, CRC_16_XMODEM};

const SMARTBUS_CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// Compute the frame checksum over `data`.
pub fn crc16(data: &[u8]) -> u16 {
    SMARTBUS_CRC.checksum(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc16_empty() {
        assert_eq!(crc16(&[]), 0);
    }

    #[test]
    fn test_crc16_single_channel_control_command() {
        let span = [
            0x0f, 0x01, 0x14, 0x00, 0x95, 0x00, 0x31, 0x01, 0x1c, 0x07, 0x64, 0x00, 0x00,
        ];
        assert_eq!(crc16(&span), 0x6066);
    }

    #[test]
    fn test_crc16_query_modules() {
        let span = [0x0b, 0x01, 0x14, 0x00, 0x95, 0x02, 0x86, 0x01, 0xff];
        assert_eq!(crc16(&span), 0xf95b);
    }

    #[test]
    fn test_crc16_check_value() {
        // Standard XMODEM check value for "123456789".
        assert_eq!(crc16(b"123456789"), 0x31c3);
    }
}
