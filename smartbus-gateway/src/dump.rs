//! Human-readable message dumps.

use std::fmt::Write;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use smartbus_protocol::messages::*;
use smartbus_protocol::{panel_control_type_name, MessageHeader, SmartbusMessage};

use crate::observer::Observer;

/// Output format of [`MessageDumper`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DumpFormat {
    #[default]
    Text,
    Json,
}

fn channel_status(status: &[bool]) -> String {
    status.iter().map(|on| if *on { 'x' } else { '-' }).collect()
}

fn zone_status(status: &[u8]) -> String {
    let items: Vec<String> = status.iter().map(|z| z.to_string()).collect();
    format!("[{}]", items.join(" "))
}

fn assignment(a: &ButtonAssignment) -> String {
    if !a.is_assigned() {
        return "unassigned".to_string();
    }
    format!(
        "{:02x}/{:02x}/{:02x}/{}/{}/{}",
        a.command, a.command_subnet_id, a.command_device_id, a.channel_no, a.level, a.duration
    )
}

/// Render the message body, e.g. `<SingleChannelControlCommand 7/100/0>`.
pub fn format_body(message: &Message) -> String {
    let name = message.name();
    match message {
        Message::SingleChannelControlCommand(m) => {
            format!("<{} {}/{}/{}>", name, m.channel_no, m.level, m.duration)
        }
        Message::SingleChannelControlResponse(m) => format!(
            "<{} {}/{}/{}/{}>",
            name,
            m.channel_no,
            m.success,
            m.level,
            channel_status(&m.channel_status)
        ),
        Message::ZoneBeastBroadcast(m) => format!(
            "<{} {}/{}>",
            name,
            zone_status(&m.zone_status),
            channel_status(&m.channel_status)
        ),
        Message::QueryModulesResponse(m) => format!(
            "<{} {:02x}/{:02x}/{:02x}/{}/{:02x}/{:02x}>",
            name,
            m.controlled_device_subnet_id,
            m.controlled_device_id,
            m.device_category,
            m.channel_no,
            m.hvac_subnet_id,
            m.hvac_device_id
        ),
        Message::PanelControlResponse(m) => {
            let type_name = match panel_control_type_name(m.control_type) {
                Some(type_name) => type_name.to_string(),
                None => format!("<unknown type 0x{:02x}>", m.control_type),
            };
            format!("<{} {}={}>", name, type_name, m.value)
        }
        Message::QueryFanController(m) => format!("<{} {}>", name, m.index),
        Message::QueryPanelButtonAssignment(m) => {
            format!("<{} {}/{}>", name, m.button_no, m.function_no)
        }
        Message::QueryPanelButtonAssignmentResponse(m) => format!(
            "<{} {}/{}/{}>",
            name,
            m.button_no,
            m.function_no,
            assignment(&m.assignment)
        ),
        Message::AssignPanelButton(m) => format!(
            "<{} {}/{}/{}/{}>",
            name,
            m.button_no,
            m.function_no,
            assignment(&m.assignment),
            m.unknown
        ),
        Message::AssignPanelButtonResponse(m) => {
            format!("<{} {}/{}>", name, m.button_no, m.function_no)
        }
        Message::SetPanelButtonModes(m) => {
            let mut out = format!("<{} ", name);
            for (i, mode) in m.modes.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                let _ = write!(out, "{}/{}:{}", i / 4 + 1, i % 4 + 1, mode);
            }
            out.push('>');
            out
        }
        Message::SetPanelButtonModesResponse(m) => format!("<{} {}>", name, m.success),
        Message::ReadMacAddressResponse(m) => {
            let mac: Vec<String> = m.mac_address.iter().map(|b| format!("{:02x}", b)).collect();
            format!("<{} {}/{}>", name, mac.join(":"), hex::encode(&m.remark))
        }
        Message::QueryModules(_) | Message::ReadMacAddress(_) => format!("<{}>", name),
    }
}

/// Render a message with its addressing, e.g.
/// `01/14 (type 0095) -> 01/1c: <SingleChannelControlCommand 7/100/0>`.
pub fn format_message(header: &MessageHeader, message: &Message) -> String {
    format!(
        "{:02x}/{:02x} (type {:04x}) -> {:02x}/{:02x}: {}",
        header.orig_subnet_id,
        header.orig_device_id,
        header.orig_device_type,
        header.target_subnet_id,
        header.target_device_id,
        format_body(message)
    )
}

type Sink = Box<dyn Fn(String) + Send + Sync>;

/// Observer that formats every message it sees and hands the line to a sink.
pub struct MessageFormatter {
    sink: Sink,
}

impl MessageFormatter {
    pub fn new(sink: impl Fn(String) + Send + Sync + 'static) -> Self {
        Self {
            sink: Box::new(sink),
        }
    }
}

impl Observer for MessageFormatter {
    fn on_any_message(&self, msg: &Message, header: &MessageHeader) -> bool {
        (self.sink)(format_message(header, msg));
        true
    }
}

/// Observer that logs every message it sees.
pub struct MessageDumper {
    prefix: String,
    format: DumpFormat,
}

impl MessageDumper {
    pub fn new(prefix: impl Into<String>, format: DumpFormat) -> Self {
        Self {
            prefix: prefix.into(),
            format,
        }
    }

    fn render(&self, msg: &Message, header: &MessageHeader) -> Option<String> {
        match self.format {
            DumpFormat::Text => Some(format_message(header, msg)),
            DumpFormat::Json => {
                let msg = SmartbusMessage {
                    header: *header,
                    message: msg.clone(),
                };
                match serde_json::to_string(&msg) {
                    Ok(json) => Some(json),
                    Err(e) => {
                        warn!("Failed to serialize {}: {}", msg.message.name(), e);
                        None
                    }
                }
            }
        }
    }
}

impl Observer for MessageDumper {
    fn on_any_message(&self, msg: &Message, header: &MessageHeader) -> bool {
        if let Some(line) = self.render(msg, header) {
            info!("{}: {}", self.prefix, line);
        }
        true
    }
}
