//! Message definitions.
//!
//! Every message is a plain struct with a fixed opcode. Most are "simple":
//! their fields go on the wire in declaration order. QueryModulesResponse is
//! "preprocessed": it is read into a fixed-shape raw struct first and then
//! transformed, because the meaning of its trailing parameter bytes depends
//! on the device category read before them.

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::field::*;
use crate::types::*;

/// Static identity of a message type.
pub trait MessageKind: Into<Message> {
    const OPCODE: u16;
    const NAME: &'static str;
}

/// Wire layout of a fixed-shape struct.
pub trait Fields: Sized {
    fn read_fields(buf: &mut Bytes) -> Result<Self, ProtocolError>;
    fn write_fields(&self, buf: &mut BytesMut) -> Result<(), ProtocolError>;
}

/// Message whose fields are read and written directly.
pub trait SimpleMessage: MessageKind + Fields {}

/// Message decoded through an intermediate raw struct.
pub trait PreprocessedMessage: MessageKind + Sized {
    type Raw: Fields;

    fn from_raw(raw: Self::Raw) -> Result<Self, ProtocolError>;
    fn to_raw(&self) -> Result<Self::Raw, ProtocolError>;
}

macro_rules! message_kind {
    ($ty:ident, $opcode:expr, $name:expr) => {
        impl MessageKind for $ty {
            const OPCODE: u16 = $opcode;
            const NAME: &'static str = $name;
        }

        impl From<$ty> for Message {
            fn from(msg: $ty) -> Self {
                Message::$ty(msg)
            }
        }
    };
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleChannelControlCommand {
    pub channel_no: u8,
    pub level: u8,
    pub duration: u16,
}

impl Fields for SingleChannelControlCommand {
    fn read_fields(buf: &mut Bytes) -> Result<Self, ProtocolError> {
        Ok(Self {
            channel_no: read_u8(buf)?,
            level: read_u8(buf)?,
            duration: read_u16(buf)?,
        })
    }

    fn write_fields(&self, buf: &mut BytesMut) -> Result<(), ProtocolError> {
        buf.put_u8(self.channel_no);
        buf.put_u8(self.level);
        buf.put_u16(self.duration);
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleChannelControlResponse {
    pub channel_no: u8,
    pub success: bool,
    pub level: u8,
    pub channel_status: Vec<bool>,
}

impl Fields for SingleChannelControlResponse {
    fn read_fields(buf: &mut Bytes) -> Result<Self, ProtocolError> {
        Ok(Self {
            channel_no: read_u8(buf)?,
            success: read_success(buf)?,
            level: read_u8(buf)?,
            channel_status: read_channel_status(buf)?,
        })
    }

    fn write_fields(&self, buf: &mut BytesMut) -> Result<(), ProtocolError> {
        buf.put_u8(self.channel_no);
        write_success(buf, self.success);
        buf.put_u8(self.level);
        write_channel_status(buf, &self.channel_status)
    }
}

/// Periodic status broadcast of a zone-beast relay module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneBeastBroadcast {
    pub zone_status: Vec<u8>,
    pub channel_status: Vec<bool>,
}

impl Fields for ZoneBeastBroadcast {
    fn read_fields(buf: &mut Bytes) -> Result<Self, ProtocolError> {
        Ok(Self {
            zone_status: read_zone_status(buf)?,
            channel_status: read_channel_status(buf)?,
        })
    }

    fn write_fields(&self, buf: &mut BytesMut) -> Result<(), ProtocolError> {
        write_zone_status(buf, &self.zone_status)?;
        write_channel_status(buf, &self.channel_status)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryModules;

impl Fields for QueryModules {
    fn read_fields(_buf: &mut Bytes) -> Result<Self, ProtocolError> {
        Ok(QueryModules)
    }

    fn write_fields(&self, _buf: &mut BytesMut) -> Result<(), ProtocolError> {
        Ok(())
    }
}

/// Reply to [`QueryModules`] describing one controlled module.
///
/// `channel_no` is meaningful for dimmers and relays, the HVAC address for
/// HVAC modules; sensors and audio modules carry neither.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryModulesResponse {
    pub controlled_device_subnet_id: u8,
    pub controlled_device_id: u8,
    pub device_category: u8,
    pub channel_no: u8,
    pub hvac_subnet_id: u8,
    pub hvac_device_id: u8,
}

/// Wire shape of [`QueryModulesResponse`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryModulesResponseRaw {
    pub controlled_device_subnet_id: u8,
    pub controlled_device_id: u8,
    pub device_category: u8,
    pub params: [u8; 4],
}

impl Fields for QueryModulesResponseRaw {
    fn read_fields(buf: &mut Bytes) -> Result<Self, ProtocolError> {
        Ok(Self {
            controlled_device_subnet_id: read_u8(buf)?,
            controlled_device_id: read_u8(buf)?,
            device_category: read_u8(buf)?,
            params: read_array(buf)?,
        })
    }

    fn write_fields(&self, buf: &mut BytesMut) -> Result<(), ProtocolError> {
        buf.put_u8(self.controlled_device_subnet_id);
        buf.put_u8(self.controlled_device_id);
        buf.put_u8(self.device_category);
        buf.put_slice(&self.params);
        Ok(())
    }
}

/// Second parameter byte written for dimmer and relay modules.
const QUERY_MODULES_CHANNEL_PARAM: u8 = 0x64;

impl PreprocessedMessage for QueryModulesResponse {
    type Raw = QueryModulesResponseRaw;

    fn from_raw(raw: QueryModulesResponseRaw) -> Result<Self, ProtocolError> {
        let mut msg = QueryModulesResponse {
            controlled_device_subnet_id: raw.controlled_device_subnet_id,
            controlled_device_id: raw.controlled_device_id,
            device_category: raw.device_category,
            ..Default::default()
        };
        match raw.device_category {
            QUERY_MODULES_DEV_DIMMER | QUERY_MODULES_DEV_RELAY => {
                msg.channel_no = raw.params[0];
            }
            QUERY_MODULES_DEV_HVAC => {
                msg.hvac_subnet_id = raw.params[0];
                msg.hvac_device_id = raw.params[1];
            }
            QUERY_MODULES_DEV_SENSORS | QUERY_MODULES_DEV_Z_AUDIO => {}
            other => return Err(ProtocolError::BadDeviceCategory(other)),
        }
        Ok(msg)
    }

    /// Sensors and Z-Audio carry no parameters and encode as `[0; 4]` instead of failing.
    fn to_raw(&self) -> Result<QueryModulesResponseRaw, ProtocolError> {
        let params = match self.device_category {
            QUERY_MODULES_DEV_DIMMER | QUERY_MODULES_DEV_RELAY => {
                [self.channel_no, QUERY_MODULES_CHANNEL_PARAM, 0, 0]
            }
            QUERY_MODULES_DEV_HVAC => [self.hvac_subnet_id, self.hvac_device_id, 0, 0],
            QUERY_MODULES_DEV_SENSORS | QUERY_MODULES_DEV_Z_AUDIO => [0; 4],
            other => return Err(ProtocolError::BadDeviceCategory(other)),
        };
        Ok(QueryModulesResponseRaw {
            controlled_device_subnet_id: self.controlled_device_subnet_id,
            controlled_device_id: self.controlled_device_id,
            device_category: self.device_category,
            params,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelControlResponse {
    pub control_type: u8,
    pub value: u8,
}

impl Fields for PanelControlResponse {
    fn read_fields(buf: &mut Bytes) -> Result<Self, ProtocolError> {
        Ok(Self {
            control_type: read_u8(buf)?,
            value: read_u8(buf)?,
        })
    }

    fn write_fields(&self, buf: &mut BytesMut) -> Result<(), ProtocolError> {
        buf.put_u8(self.control_type);
        buf.put_u8(self.value);
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFanController {
    pub index: u8,
}

impl Fields for QueryFanController {
    fn read_fields(buf: &mut Bytes) -> Result<Self, ProtocolError> {
        Ok(Self {
            index: read_u8(buf)?,
        })
    }

    fn write_fields(&self, buf: &mut BytesMut) -> Result<(), ProtocolError> {
        buf.put_u8(self.index);
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPanelButtonAssignment {
    pub button_no: u8,
    pub function_no: u8,
}

impl Fields for QueryPanelButtonAssignment {
    fn read_fields(buf: &mut Bytes) -> Result<Self, ProtocolError> {
        Ok(Self {
            button_no: read_u8(buf)?,
            function_no: read_u8(buf)?,
        })
    }

    fn write_fields(&self, buf: &mut BytesMut) -> Result<(), ProtocolError> {
        buf.put_u8(self.button_no);
        buf.put_u8(self.function_no);
        Ok(())
    }
}

/// Action bound to one panel button function.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonAssignment {
    pub command: u8,
    pub command_subnet_id: u8,
    pub command_device_id: u8,
    pub channel_no: u8,
    pub level: u8,
    pub duration: u16,
}

impl ButtonAssignment {
    /// Single channel lighting control of `channel_no` on the given device.
    pub fn single_channel(subnet_id: u8, device_id: u8, channel_no: u8, level: u8) -> Self {
        Self {
            command: BUTTON_COMMAND_SINGLE_CHANNEL_LIGHTING_CONTROL,
            command_subnet_id: subnet_id,
            command_device_id: device_id,
            channel_no,
            level,
            duration: 0,
        }
    }

    pub fn is_assigned(&self) -> bool {
        self.command != BUTTON_COMMAND_INVALID
    }
}

impl Fields for ButtonAssignment {
    fn read_fields(buf: &mut Bytes) -> Result<Self, ProtocolError> {
        Ok(Self {
            command: read_u8(buf)?,
            command_subnet_id: read_u8(buf)?,
            command_device_id: read_u8(buf)?,
            channel_no: read_u8(buf)?,
            level: read_u8(buf)?,
            duration: read_u16(buf)?,
        })
    }

    fn write_fields(&self, buf: &mut BytesMut) -> Result<(), ProtocolError> {
        buf.put_u8(self.command);
        buf.put_u8(self.command_subnet_id);
        buf.put_u8(self.command_device_id);
        buf.put_u8(self.channel_no);
        buf.put_u8(self.level);
        buf.put_u16(self.duration);
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPanelButtonAssignmentResponse {
    pub button_no: u8,
    pub function_no: u8,
    pub assignment: ButtonAssignment,
}

impl Fields for QueryPanelButtonAssignmentResponse {
    fn read_fields(buf: &mut Bytes) -> Result<Self, ProtocolError> {
        Ok(Self {
            button_no: read_u8(buf)?,
            function_no: read_u8(buf)?,
            assignment: ButtonAssignment::read_fields(buf)?,
        })
    }

    fn write_fields(&self, buf: &mut BytesMut) -> Result<(), ProtocolError> {
        buf.put_u8(self.button_no);
        buf.put_u8(self.function_no);
        self.assignment.write_fields(buf)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignPanelButton {
    pub button_no: u8,
    pub function_no: u8,
    pub assignment: ButtonAssignment,
    pub unknown: u8,
}

impl Fields for AssignPanelButton {
    fn read_fields(buf: &mut Bytes) -> Result<Self, ProtocolError> {
        Ok(Self {
            button_no: read_u8(buf)?,
            function_no: read_u8(buf)?,
            assignment: ButtonAssignment::read_fields(buf)?,
            unknown: read_u8(buf)?,
        })
    }

    fn write_fields(&self, buf: &mut BytesMut) -> Result<(), ProtocolError> {
        buf.put_u8(self.button_no);
        buf.put_u8(self.function_no);
        self.assignment.write_fields(buf)?;
        buf.put_u8(self.unknown);
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignPanelButtonResponse {
    pub button_no: u8,
    pub function_no: u8,
}

impl Fields for AssignPanelButtonResponse {
    fn read_fields(buf: &mut Bytes) -> Result<Self, ProtocolError> {
        Ok(Self {
            button_no: read_u8(buf)?,
            function_no: read_u8(buf)?,
        })
    }

    fn write_fields(&self, buf: &mut BytesMut) -> Result<(), ProtocolError> {
        buf.put_u8(self.button_no);
        buf.put_u8(self.function_no);
        Ok(())
    }
}

/// Mode table of a DDP panel. Slot `i` is button `i / 4 + 1`, function `i % 4 + 1`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetPanelButtonModes {
    pub modes: [PanelButtonMode; PANEL_BUTTON_COUNT],
}

impl Fields for SetPanelButtonModes {
    fn read_fields(buf: &mut Bytes) -> Result<Self, ProtocolError> {
        Ok(Self {
            modes: read_panel_button_modes(buf)?,
        })
    }

    fn write_fields(&self, buf: &mut BytesMut) -> Result<(), ProtocolError> {
        write_panel_button_modes(buf, &self.modes);
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetPanelButtonModesResponse {
    pub success: bool,
}

impl Fields for SetPanelButtonModesResponse {
    fn read_fields(buf: &mut Bytes) -> Result<Self, ProtocolError> {
        Ok(Self {
            success: read_success(buf)?,
        })
    }

    fn write_fields(&self, buf: &mut BytesMut) -> Result<(), ProtocolError> {
        write_success(buf, self.success);
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadMacAddress;

impl Fields for ReadMacAddress {
    fn read_fields(_buf: &mut Bytes) -> Result<Self, ProtocolError> {
        Ok(ReadMacAddress)
    }

    fn write_fields(&self, _buf: &mut BytesMut) -> Result<(), ProtocolError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadMacAddressResponse {
    pub mac_address: [u8; 8],
    pub remark: Vec<u8>,
}

impl Fields for ReadMacAddressResponse {
    fn read_fields(buf: &mut Bytes) -> Result<Self, ProtocolError> {
        Ok(Self {
            mac_address: read_array(buf)?,
            remark: read_remark(buf)?,
        })
    }

    fn write_fields(&self, buf: &mut BytesMut) -> Result<(), ProtocolError> {
        buf.put_slice(&self.mac_address);
        write_remark(buf, &self.remark)
    }
}

impl SimpleMessage for SingleChannelControlCommand {}
impl SimpleMessage for SingleChannelControlResponse {}
impl SimpleMessage for ZoneBeastBroadcast {}
impl SimpleMessage for QueryModules {}
impl SimpleMessage for PanelControlResponse {}
impl SimpleMessage for QueryFanController {}
impl SimpleMessage for QueryPanelButtonAssignment {}
impl SimpleMessage for QueryPanelButtonAssignmentResponse {}
impl SimpleMessage for AssignPanelButton {}
impl SimpleMessage for AssignPanelButtonResponse {}
impl SimpleMessage for SetPanelButtonModes {}
impl SimpleMessage for SetPanelButtonModesResponse {}
impl SimpleMessage for ReadMacAddress {}
impl SimpleMessage for ReadMacAddressResponse {}

message_kind!(SingleChannelControlCommand, 0x0031, "SingleChannelControlCommand");
message_kind!(SingleChannelControlResponse, 0x0032, "SingleChannelControlResponse");
message_kind!(ZoneBeastBroadcast, 0xEFFF, "ZoneBeastBroadcast");
message_kind!(QueryModules, 0x0286, "QueryModules");
message_kind!(QueryModulesResponse, 0x0287, "QueryModulesResponse");
message_kind!(PanelControlResponse, 0xE3D9, "PanelControlResponse");
message_kind!(QueryFanController, 0x0033, "QueryFanController");
message_kind!(QueryPanelButtonAssignment, 0xE000, "QueryPanelButtonAssignment");
message_kind!(
    QueryPanelButtonAssignmentResponse,
    0xE001,
    "QueryPanelButtonAssignmentResponse"
);
message_kind!(AssignPanelButton, 0xE002, "AssignPanelButton");
message_kind!(AssignPanelButtonResponse, 0xE003, "AssignPanelButtonResponse");
message_kind!(SetPanelButtonModes, 0xE00A, "SetPanelButtonModes");
message_kind!(SetPanelButtonModesResponse, 0xE00B, "SetPanelButtonModesResponse");
message_kind!(ReadMacAddress, 0xF003, "ReadMACAddress");
message_kind!(ReadMacAddressResponse, 0xF004, "ReadMACAddressResponse");

/// Closed set of Smartbus messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    SingleChannelControlCommand(SingleChannelControlCommand),
    SingleChannelControlResponse(SingleChannelControlResponse),
    ZoneBeastBroadcast(ZoneBeastBroadcast),
    QueryModules(QueryModules),
    QueryModulesResponse(QueryModulesResponse),
    PanelControlResponse(PanelControlResponse),
    QueryFanController(QueryFanController),
    QueryPanelButtonAssignment(QueryPanelButtonAssignment),
    QueryPanelButtonAssignmentResponse(QueryPanelButtonAssignmentResponse),
    AssignPanelButton(AssignPanelButton),
    AssignPanelButtonResponse(AssignPanelButtonResponse),
    SetPanelButtonModes(SetPanelButtonModes),
    SetPanelButtonModesResponse(SetPanelButtonModesResponse),
    ReadMacAddress(ReadMacAddress),
    ReadMacAddressResponse(ReadMacAddressResponse),
}

impl Message {
    pub fn opcode(&self) -> u16 {
        match self {
            Message::SingleChannelControlCommand(_) => SingleChannelControlCommand::OPCODE,
            Message::SingleChannelControlResponse(_) => SingleChannelControlResponse::OPCODE,
            Message::ZoneBeastBroadcast(_) => ZoneBeastBroadcast::OPCODE,
            Message::QueryModules(_) => QueryModules::OPCODE,
            Message::QueryModulesResponse(_) => QueryModulesResponse::OPCODE,
            Message::PanelControlResponse(_) => PanelControlResponse::OPCODE,
            Message::QueryFanController(_) => QueryFanController::OPCODE,
            Message::QueryPanelButtonAssignment(_) => QueryPanelButtonAssignment::OPCODE,
            Message::QueryPanelButtonAssignmentResponse(_) => {
                QueryPanelButtonAssignmentResponse::OPCODE
            }
            Message::AssignPanelButton(_) => AssignPanelButton::OPCODE,
            Message::AssignPanelButtonResponse(_) => AssignPanelButtonResponse::OPCODE,
            Message::SetPanelButtonModes(_) => SetPanelButtonModes::OPCODE,
            Message::SetPanelButtonModesResponse(_) => SetPanelButtonModesResponse::OPCODE,
            Message::ReadMacAddress(_) => ReadMacAddress::OPCODE,
            Message::ReadMacAddressResponse(_) => ReadMacAddressResponse::OPCODE,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Message::SingleChannelControlCommand(_) => SingleChannelControlCommand::NAME,
            Message::SingleChannelControlResponse(_) => SingleChannelControlResponse::NAME,
            Message::ZoneBeastBroadcast(_) => ZoneBeastBroadcast::NAME,
            Message::QueryModules(_) => QueryModules::NAME,
            Message::QueryModulesResponse(_) => QueryModulesResponse::NAME,
            Message::PanelControlResponse(_) => PanelControlResponse::NAME,
            Message::QueryFanController(_) => QueryFanController::NAME,
            Message::QueryPanelButtonAssignment(_) => QueryPanelButtonAssignment::NAME,
            Message::QueryPanelButtonAssignmentResponse(_) => {
                QueryPanelButtonAssignmentResponse::NAME
            }
            Message::AssignPanelButton(_) => AssignPanelButton::NAME,
            Message::AssignPanelButtonResponse(_) => AssignPanelButtonResponse::NAME,
            Message::SetPanelButtonModes(_) => SetPanelButtonModes::NAME,
            Message::SetPanelButtonModesResponse(_) => SetPanelButtonModesResponse::NAME,
            Message::ReadMacAddress(_) => ReadMacAddress::NAME,
            Message::ReadMacAddressResponse(_) => ReadMacAddressResponse::NAME,
        }
    }

    /// Encode the payload; preprocessed messages go through their raw form.
    pub fn write_payload(&self, buf: &mut BytesMut) -> Result<(), ProtocolError> {
        match self {
            Message::SingleChannelControlCommand(m) => m.write_fields(buf),
            Message::SingleChannelControlResponse(m) => m.write_fields(buf),
            Message::ZoneBeastBroadcast(m) => m.write_fields(buf),
            Message::QueryModules(m) => m.write_fields(buf),
            Message::QueryModulesResponse(m) => m.to_raw()?.write_fields(buf),
            Message::PanelControlResponse(m) => m.write_fields(buf),
            Message::QueryFanController(m) => m.write_fields(buf),
            Message::QueryPanelButtonAssignment(m) => m.write_fields(buf),
            Message::QueryPanelButtonAssignmentResponse(m) => m.write_fields(buf),
            Message::AssignPanelButton(m) => m.write_fields(buf),
            Message::AssignPanelButtonResponse(m) => m.write_fields(buf),
            Message::SetPanelButtonModes(m) => m.write_fields(buf),
            Message::SetPanelButtonModesResponse(m) => m.write_fields(buf),
            Message::ReadMacAddress(m) => m.write_fields(buf),
            Message::ReadMacAddressResponse(m) => m.write_fields(buf),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_modules_response_from_raw() {
        let relay = QueryModulesResponse::from_raw(QueryModulesResponseRaw {
            controlled_device_subnet_id: 0x01,
            controlled_device_id: 0x1c,
            device_category: QUERY_MODULES_DEV_RELAY,
            params: [0x0a, 0x64, 0, 0],
        })
        .unwrap();
        assert_eq!(relay.channel_no, 0x0a);
        assert_eq!(relay.hvac_subnet_id, 0);

        let hvac = QueryModulesResponse::from_raw(QueryModulesResponseRaw {
            device_category: QUERY_MODULES_DEV_HVAC,
            params: [0x01, 0x30, 0, 0],
            ..Default::default()
        })
        .unwrap();
        assert_eq!((hvac.hvac_subnet_id, hvac.hvac_device_id), (0x01, 0x30));
        assert_eq!(hvac.channel_no, 0);

        let sensors = QueryModulesResponse::from_raw(QueryModulesResponseRaw {
            device_category: QUERY_MODULES_DEV_SENSORS,
            params: [0x11, 0x22, 0x33, 0x44],
            ..Default::default()
        })
        .unwrap();
        assert_eq!(sensors.channel_no, 0);
        assert_eq!(sensors.hvac_device_id, 0);
    }

    #[test]
    fn test_query_modules_response_bad_category() {
        let raw = QueryModulesResponseRaw {
            device_category: 0x42,
            ..Default::default()
        };
        assert_eq!(
            QueryModulesResponse::from_raw(raw),
            Err(ProtocolError::BadDeviceCategory(0x42))
        );

        let msg = QueryModulesResponse {
            device_category: 0x00,
            ..Default::default()
        };
        assert_eq!(msg.to_raw(), Err(ProtocolError::BadDeviceCategory(0x00)));
    }

    #[test]
    fn test_query_modules_response_to_raw() {
        let dimmer = QueryModulesResponse {
            controlled_device_subnet_id: 0x01,
            controlled_device_id: 0x1c,
            device_category: QUERY_MODULES_DEV_DIMMER,
            channel_no: 3,
            ..Default::default()
        };
        assert_eq!(dimmer.to_raw().unwrap().params, [3, 0x64, 0, 0]);

        let audio = QueryModulesResponse {
            device_category: QUERY_MODULES_DEV_Z_AUDIO,
            channel_no: 9,
            ..Default::default()
        };
        assert_eq!(audio.to_raw().unwrap().params, [0; 4]);
    }

    #[test]
    fn test_write_payload_preprocessed_error() {
        let msg: Message = QueryModulesResponse {
            device_category: 0x07,
            ..Default::default()
        }
        .into();
        let mut buf = BytesMut::new();
        assert_eq!(msg.write_payload(&mut buf), Err(ProtocolError::BadDeviceCategory(0x07)));
    }

    #[test]
    fn test_message_identity() {
        let msg: Message = ReadMacAddress.into();
        assert_eq!(msg.opcode(), 0xf003);
        assert_eq!(msg.name(), "ReadMACAddress");

        let msg: Message = SingleChannelControlCommand::default().into();
        assert_eq!(msg.opcode(), 0x0031);
        assert_eq!(msg.name(), "SingleChannelControlCommand");
    }
}
