//! Field codec.
//!
//! Primitive fields are big-endian fixed-width integers or fixed-size byte
//! arrays. The special fields below carry their own wire shapes:
//!
//! | Field              | Wire form                                         |
//! |--------------------|---------------------------------------------------|
//! | success            | 0xF8 (true) / 0xF5 (false)                        |
//! | channel status     | count `n`, then `ceil(n/8)` bytes, LSB first      |
//! | zone status        | count `n`, then `n` raw bytes                     |
//! | panel button modes | 16 mode codes, one byte each                      |
//! | remark             | everything up to the end of the payload, < 64     |

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;
use crate::types::{PanelButtonMode, PANEL_BUTTON_COUNT};

pub const SUCCESS_TRUE: u8 = 0xF8;
pub const SUCCESS_FALSE: u8 = 0xF5;

/// Remark blobs must stay strictly below this size.
pub const MAX_REMARK_LEN: usize = 64;

fn ensure(buf: &Bytes, expected: usize) -> Result<(), ProtocolError> {
    if buf.remaining() < expected {
        return Err(ProtocolError::IncompleteFrame {
            expected,
            actual: buf.remaining(),
        });
    }
    Ok(())
}

pub fn read_u8(buf: &mut Bytes) -> Result<u8, ProtocolError> {
    ensure(buf, 1)?;
    Ok(buf.get_u8())
}

pub fn read_u16(buf: &mut Bytes) -> Result<u16, ProtocolError> {
    ensure(buf, 2)?;
    Ok(buf.get_u16())
}

pub fn read_array<const N: usize>(buf: &mut Bytes) -> Result<[u8; N], ProtocolError> {
    ensure(buf, N)?;
    let mut out = [0u8; N];
    buf.copy_to_slice(&mut out);
    Ok(out)
}

pub fn read_success(buf: &mut Bytes) -> Result<bool, ProtocolError> {
    match read_u8(buf)? {
        SUCCESS_TRUE => Ok(true),
        SUCCESS_FALSE => Ok(false),
        other => Err(ProtocolError::BadSuccessFlag(other)),
    }
}

pub fn write_success(buf: &mut BytesMut, success: bool) {
    buf.put_u8(if success { SUCCESS_TRUE } else { SUCCESS_FALSE });
}

pub fn read_channel_status(buf: &mut Bytes) -> Result<Vec<bool>, ProtocolError> {
    let count = read_u8(buf)? as usize;
    let packed_len = count.div_ceil(8);
    ensure(buf, packed_len)?;
    let packed = buf.split_to(packed_len);
    Ok((0..count)
        .map(|i| (packed[i / 8] >> (i % 8)) & 1 == 1)
        .collect())
}

pub fn write_channel_status(buf: &mut BytesMut, status: &[bool]) -> Result<(), ProtocolError> {
    let count = u8::try_from(status.len()).map_err(|_| ProtocolError::FieldTooLong {
        field: "channel status",
        len: status.len(),
    })?;
    buf.put_u8(count);
    let mut packed = vec![0u8; status.len().div_ceil(8)];
    for (i, _) in status.iter().enumerate().filter(|(_, on)| **on) {
        packed[i / 8] |= 1 << (i % 8);
    }
    buf.put_slice(&packed);
    Ok(())
}

pub fn read_zone_status(buf: &mut Bytes) -> Result<Vec<u8>, ProtocolError> {
    let count = read_u8(buf)? as usize;
    ensure(buf, count)?;
    Ok(buf.split_to(count).to_vec())
}

pub fn write_zone_status(buf: &mut BytesMut, status: &[u8]) -> Result<(), ProtocolError> {
    let count = u8::try_from(status.len()).map_err(|_| ProtocolError::FieldTooLong {
        field: "zone status",
        len: status.len(),
    })?;
    buf.put_u8(count);
    buf.put_slice(status);
    Ok(())
}

pub fn read_panel_button_modes(
    buf: &mut Bytes,
) -> Result<[PanelButtonMode; PANEL_BUTTON_COUNT], ProtocolError> {
    let codes = read_array::<PANEL_BUTTON_COUNT>(buf)?;
    Ok(codes.map(PanelButtonMode::from_code))
}

pub fn write_panel_button_modes(buf: &mut BytesMut, modes: &[PanelButtonMode; PANEL_BUTTON_COUNT]) {
    for mode in modes {
        buf.put_u8(mode.code());
    }
}

/// Read the remark blob, which runs to the end of the payload.
pub fn read_remark(buf: &mut Bytes) -> Result<Vec<u8>, ProtocolError> {
    if buf.remaining() >= MAX_REMARK_LEN {
        return Err(ProtocolError::RemarkTooLong(buf.remaining()));
    }
    Ok(buf.split_to(buf.remaining()).to_vec())
}

pub fn write_remark(buf: &mut BytesMut, remark: &[u8]) -> Result<(), ProtocolError> {
    if remark.len() >= MAX_REMARK_LEN {
        return Err(ProtocolError::RemarkTooLong(remark.len()));
    }
    buf.put_slice(remark);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_flag() {
        let mut buf = Bytes::from_static(&[0xf8, 0xf5, 0x00]);
        assert!(read_success(&mut buf).unwrap());
        assert!(!read_success(&mut buf).unwrap());
        assert_eq!(read_success(&mut buf), Err(ProtocolError::BadSuccessFlag(0x00)));

        let mut out = BytesMut::new();
        write_success(&mut out, true);
        write_success(&mut out, false);
        assert_eq!(&out[..], &[0xf8, 0xf5]);
    }

    #[test]
    fn test_channel_status_bit_order() {
        let mut status = vec![false; 15];
        status[6] = true;

        let mut out = BytesMut::new();
        write_channel_status(&mut out, &status).unwrap();
        assert_eq!(&out[..], &[0x0f, 0x40, 0x00]);

        let mut buf = out.freeze();
        assert_eq!(read_channel_status(&mut buf).unwrap(), status);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_channel_status_empty() {
        let mut out = BytesMut::new();
        write_channel_status(&mut out, &[]).unwrap();
        assert_eq!(&out[..], &[0x00]);

        let mut buf = Bytes::from_static(&[0x00, 0x99]);
        assert!(read_channel_status(&mut buf).unwrap().is_empty());
        assert_eq!(buf.remaining(), 1);
    }

    #[test]
    fn test_channel_status_truncated() {
        let mut buf = Bytes::from_static(&[0x09, 0x01]);
        assert_eq!(
            read_channel_status(&mut buf),
            Err(ProtocolError::IncompleteFrame { expected: 2, actual: 1 })
        );
    }

    #[test]
    fn test_channel_status_too_long() {
        let mut out = BytesMut::new();
        let result = write_channel_status(&mut out, &[true; 256]);
        assert!(matches!(result, Err(ProtocolError::FieldTooLong { len: 256, .. })));
    }

    #[test]
    fn test_zone_status() {
        let mut buf = Bytes::from_static(&[0x02, 0x05, 0x07, 0xee]);
        assert_eq!(read_zone_status(&mut buf).unwrap(), vec![0x05, 0x07]);
        assert_eq!(&buf[..], &[0xee]);

        let mut out = BytesMut::new();
        write_zone_status(&mut out, &[0x00]).unwrap();
        assert_eq!(&out[..], &[0x01, 0x00]);
    }

    #[test]
    fn test_panel_button_modes_lenient() {
        let mut raw = [0u8; PANEL_BUTTON_COUNT];
        raw[0] = 0x01;
        raw[1] = 0x0a;
        raw[2] = 0x42;
        let mut buf = Bytes::copy_from_slice(&raw);
        let modes = read_panel_button_modes(&mut buf).unwrap();
        assert_eq!(modes[0], PanelButtonMode::SingleOnOff);
        assert_eq!(modes[1], PanelButtonMode::LeftOffRightOn);
        assert_eq!(modes[2], PanelButtonMode::Invalid);

        let mut out = BytesMut::new();
        write_panel_button_modes(&mut out, &modes);
        assert_eq!(out[2], 0x00);
    }

    #[test]
    fn test_remark_limits() {
        let mut buf = Bytes::from(vec![0x41; 63]);
        assert_eq!(read_remark(&mut buf).unwrap().len(), 63);
        assert!(buf.is_empty());

        let mut buf = Bytes::from(vec![0x41; 64]);
        assert_eq!(read_remark(&mut buf), Err(ProtocolError::RemarkTooLong(64)));

        let mut empty = Bytes::new();
        assert!(read_remark(&mut empty).unwrap().is_empty());

        let mut out = BytesMut::new();
        assert!(write_remark(&mut out, &[0u8; 63]).is_ok());
        assert_eq!(write_remark(&mut out, &[0u8; 64]), Err(ProtocolError::RemarkTooLong(64)));
    }
}
