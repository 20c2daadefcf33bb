//! Core type definitions for the Smartbus wire protocol.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::messages::Message;

/// Two sync bytes that open every frame on the wire.
pub const SYNC: [u8; 2] = [0xAA, 0xAA];

/// Sync byte value.
pub const SYNC_BYTE: u8 = 0xAA;

/// Header size: orig subnet (1) + orig device (1) + orig type (2) + opcode (2)
/// + target subnet (1) + target device (1) = 8 bytes.
pub const HEADER_SIZE: usize = 8;

/// Smallest value the length byte may carry: length (1) + header (8) + crc (2).
pub const MIN_FRAME_SIZE: usize = 11;

/// Largest value the length byte may carry.
pub const MAX_FRAME_SIZE: usize = 255;

/// Subnet / device id addressing every participant.
pub const BROADCAST_SUBNET: u8 = 0xFF;
pub const BROADCAST_DEVICE: u8 = 0xFF;

pub const LIGHT_LEVEL_OFF: u8 = 0;
pub const LIGHT_LEVEL_ON: u8 = 100;

/// Number of mode slots in a panel button mode table.
pub const PANEL_BUTTON_COUNT: usize = 16;

/// Device categories reported by QueryModulesResponse.
pub const QUERY_MODULES_DEV_DIMMER: u8 = 0x01;
pub const QUERY_MODULES_DEV_RELAY: u8 = 0x02;
pub const QUERY_MODULES_DEV_HVAC: u8 = 0x03;
pub const QUERY_MODULES_DEV_SENSORS: u8 = 0x04;
pub const QUERY_MODULES_DEV_Z_AUDIO: u8 = 0x05;

/// Button command codes used in panel button assignments.
pub const BUTTON_COMMAND_INVALID: u8 = 0x00;
pub const BUTTON_COMMAND_SINGLE_CHANNEL_LIGHTING_CONTROL: u8 = 0x59;

/// Panel control types reported by PanelControlResponse.
pub const PANEL_CONTROL_TYPE_INVALID: u8 = 0x00;
pub const PANEL_CONTROL_TYPE_IR_RECEIVER: u8 = 0x01;
pub const PANEL_CONTROL_TYPE_BUTTON_LOCK: u8 = 0x02;
pub const PANEL_CONTROL_TYPE_AC_ON_OFF: u8 = 0x03;
pub const PANEL_CONTROL_TYPE_COOLING_SET_POINT: u8 = 0x04;
pub const PANEL_CONTROL_TYPE_FAN_SPEED: u8 = 0x05;
pub const PANEL_CONTROL_TYPE_AC_MODE: u8 = 0x06;
pub const PANEL_CONTROL_TYPE_HEAT_SET_POINT: u8 = 0x07;
pub const PANEL_CONTROL_TYPE_AUTO_SET_POINT: u8 = 0x08;
pub const PANEL_CONTROL_TYPE_GO_TO_PAGE: u8 = 0x16;

/// Human-readable name of a panel control type, if known.
pub fn panel_control_type_name(control_type: u8) -> Option<&'static str> {
    match control_type {
        PANEL_CONTROL_TYPE_INVALID => Some("Invalid"),
        PANEL_CONTROL_TYPE_IR_RECEIVER => Some("IR Receiver"),
        PANEL_CONTROL_TYPE_BUTTON_LOCK => Some("Button Lock"),
        PANEL_CONTROL_TYPE_AC_ON_OFF => Some("AC On/Off"),
        PANEL_CONTROL_TYPE_COOLING_SET_POINT => Some("Cooling Set Point"),
        PANEL_CONTROL_TYPE_FAN_SPEED => Some("Fan Speed"),
        PANEL_CONTROL_TYPE_AC_MODE => Some("AC Mode"),
        PANEL_CONTROL_TYPE_HEAT_SET_POINT => Some("Heat Set Point"),
        PANEL_CONTROL_TYPE_AUTO_SET_POINT => Some("Auto Set Point"),
        PANEL_CONTROL_TYPE_GO_TO_PAGE => Some("Go To Page"),
        _ => None,
    }
}

/// Fixed 8-byte header carried by every frame.
///
/// `opcode` is overwritten from the message when a frame is encoded, and the
/// origin fields are stamped by the sending endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageHeader {
    pub orig_subnet_id: u8,
    pub orig_device_id: u8,
    pub orig_device_type: u16,
    pub opcode: u16,
    pub target_subnet_id: u8,
    pub target_device_id: u8,
}

impl MessageHeader {
    /// Header addressed to the given target, origin left blank.
    pub fn to_target(target_subnet_id: u8, target_device_id: u8) -> Self {
        Self {
            target_subnet_id,
            target_device_id,
            ..Default::default()
        }
    }

    /// Whether the target is the (0xFF, 0xFF) broadcast address.
    pub fn is_broadcast(&self) -> bool {
        self.target_subnet_id == BROADCAST_SUBNET && self.target_device_id == BROADCAST_DEVICE
    }
}

/// A decoded message together with its header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmartbusMessage {
    pub header: MessageHeader,
    pub message: Message,
}

impl SmartbusMessage {
    pub fn new(header: MessageHeader, message: impl Into<Message>) -> Self {
        Self {
            header,
            message: message.into(),
        }
    }
}

/// Button mode stored in one of the 16 slots of a DDP panel.
///
/// Unknown wire codes decode to [`PanelButtonMode::Invalid`], and unknown
/// names map to it as well.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PanelButtonMode {
    #[default]
    Invalid = 0,
    SingleOnOff = 1,
    SingleOn = 2,
    SingleOff = 3,
    CombinationOn = 4,
    CombinationOff = 5,
    PressOnReleaseOff = 6,
    CombinationOnOff = 7,
    SeparateLeftRightPressOnReleaseOff = 8,
    SeparateLeftRightCombinationOnOff = 9,
    LeftOffRightOn = 10,
}

impl PanelButtonMode {
    /// All modes, ordered by wire code.
    pub const ALL: [PanelButtonMode; 11] = [
        PanelButtonMode::Invalid,
        PanelButtonMode::SingleOnOff,
        PanelButtonMode::SingleOn,
        PanelButtonMode::SingleOff,
        PanelButtonMode::CombinationOn,
        PanelButtonMode::CombinationOff,
        PanelButtonMode::PressOnReleaseOff,
        PanelButtonMode::CombinationOnOff,
        PanelButtonMode::SeparateLeftRightPressOnReleaseOff,
        PanelButtonMode::SeparateLeftRightCombinationOnOff,
        PanelButtonMode::LeftOffRightOn,
    ];

    pub fn from_code(code: u8) -> Self {
        Self::ALL
            .get(code as usize)
            .copied()
            .unwrap_or(PanelButtonMode::Invalid)
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            PanelButtonMode::Invalid => "Invalid",
            PanelButtonMode::SingleOnOff => "SingleOnOff",
            PanelButtonMode::SingleOn => "SingleOn",
            PanelButtonMode::SingleOff => "SingleOff",
            PanelButtonMode::CombinationOn => "CombinationOn",
            PanelButtonMode::CombinationOff => "CombinationOff",
            PanelButtonMode::PressOnReleaseOff => "PressOnReleaseOff",
            PanelButtonMode::CombinationOnOff => "CombinationOnOff",
            PanelButtonMode::SeparateLeftRightPressOnReleaseOff => {
                "SeparateLeftRightPressOnReleaseOff"
            }
            PanelButtonMode::SeparateLeftRightCombinationOnOff => {
                "SeparateLeftRightCombinationOnOff"
            }
            PanelButtonMode::LeftOffRightOn => "LeftOffRightOn",
        }
    }

    /// Look a mode up by name; unrecognized names yield `Invalid`.
    pub fn from_name(name: &str) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|mode| mode.name() == name)
            .unwrap_or(PanelButtonMode::Invalid)
    }
}

impl fmt::Display for PanelButtonMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panel_button_mode_codes() {
        for (i, mode) in PanelButtonMode::ALL.iter().enumerate() {
            assert_eq!(mode.code() as usize, i);
            assert_eq!(PanelButtonMode::from_code(i as u8), *mode);
        }
        assert_eq!(PanelButtonMode::from_code(11), PanelButtonMode::Invalid);
        assert_eq!(PanelButtonMode::from_code(0xff), PanelButtonMode::Invalid);
    }

    #[test]
    fn test_panel_button_mode_names() {
        assert_eq!(
            PanelButtonMode::from_name("LeftOffRightOn"),
            PanelButtonMode::LeftOffRightOn
        );
        assert_eq!(PanelButtonMode::from_name("Bogus"), PanelButtonMode::Invalid);
        assert_eq!(PanelButtonMode::CombinationOn.to_string(), "CombinationOn");
    }

    #[test]
    fn test_header_broadcast() {
        assert!(MessageHeader::to_target(0xff, 0xff).is_broadcast());
        assert!(!MessageHeader::to_target(0x01, 0xff).is_broadcast());
    }

    #[test]
    fn test_panel_control_type_name() {
        assert_eq!(panel_control_type_name(0x04), Some("Cooling Set Point"));
        assert_eq!(panel_control_type_name(0x16), Some("Go To Page"));
        assert_eq!(panel_control_type_name(0x09), None);
    }
}
