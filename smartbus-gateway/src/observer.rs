//! Message observers.
//!
//! An observer overrides the handlers for the messages it cares about. Each
//! handler returns `true` when it consumed the message; a message nobody
//! consumed falls through to [`Observer::on_any_message`].

use smartbus_protocol::messages::*;
use smartbus_protocol::{MessageHeader, SmartbusMessage};

#[allow(unused_variables)]
pub trait Observer: Send + Sync {
    fn on_single_channel_control_command(
        &self,
        msg: &SingleChannelControlCommand,
        header: &MessageHeader,
    ) -> bool {
        false
    }

    fn on_single_channel_control_response(
        &self,
        msg: &SingleChannelControlResponse,
        header: &MessageHeader,
    ) -> bool {
        false
    }

    fn on_zone_beast_broadcast(&self, msg: &ZoneBeastBroadcast, header: &MessageHeader) -> bool {
        false
    }

    fn on_query_modules(&self, msg: &QueryModules, header: &MessageHeader) -> bool {
        false
    }

    fn on_query_modules_response(
        &self,
        msg: &QueryModulesResponse,
        header: &MessageHeader,
    ) -> bool {
        false
    }

    fn on_panel_control_response(
        &self,
        msg: &PanelControlResponse,
        header: &MessageHeader,
    ) -> bool {
        false
    }

    fn on_query_fan_controller(&self, msg: &QueryFanController, header: &MessageHeader) -> bool {
        false
    }

    fn on_query_panel_button_assignment(
        &self,
        msg: &QueryPanelButtonAssignment,
        header: &MessageHeader,
    ) -> bool {
        false
    }

    fn on_query_panel_button_assignment_response(
        &self,
        msg: &QueryPanelButtonAssignmentResponse,
        header: &MessageHeader,
    ) -> bool {
        false
    }

    fn on_assign_panel_button(&self, msg: &AssignPanelButton, header: &MessageHeader) -> bool {
        false
    }

    fn on_assign_panel_button_response(
        &self,
        msg: &AssignPanelButtonResponse,
        header: &MessageHeader,
    ) -> bool {
        false
    }

    fn on_set_panel_button_modes(&self, msg: &SetPanelButtonModes, header: &MessageHeader) -> bool {
        false
    }

    fn on_set_panel_button_modes_response(
        &self,
        msg: &SetPanelButtonModesResponse,
        header: &MessageHeader,
    ) -> bool {
        false
    }

    fn on_read_mac_address(&self, msg: &ReadMacAddress, header: &MessageHeader) -> bool {
        false
    }

    fn on_read_mac_address_response(
        &self,
        msg: &ReadMacAddressResponse,
        header: &MessageHeader,
    ) -> bool {
        false
    }

    /// Catch-all for messages no specific handler consumed.
    fn on_any_message(&self, msg: &Message, header: &MessageHeader) -> bool {
        false
    }
}

/// Deliver `msg` to `observer`. Returns whether any handler consumed it.
pub fn notify(observer: &dyn Observer, msg: &SmartbusMessage) -> bool {
    let header = &msg.header;
    let handled = match &msg.message {
        Message::SingleChannelControlCommand(m) => {
            observer.on_single_channel_control_command(m, header)
        }
        Message::SingleChannelControlResponse(m) => {
            observer.on_single_channel_control_response(m, header)
        }
        Message::ZoneBeastBroadcast(m) => observer.on_zone_beast_broadcast(m, header),
        Message::QueryModules(m) => observer.on_query_modules(m, header),
        Message::QueryModulesResponse(m) => observer.on_query_modules_response(m, header),
        Message::PanelControlResponse(m) => observer.on_panel_control_response(m, header),
        Message::QueryFanController(m) => observer.on_query_fan_controller(m, header),
        Message::QueryPanelButtonAssignment(m) => {
            observer.on_query_panel_button_assignment(m, header)
        }
        Message::QueryPanelButtonAssignmentResponse(m) => {
            observer.on_query_panel_button_assignment_response(m, header)
        }
        Message::AssignPanelButton(m) => observer.on_assign_panel_button(m, header),
        Message::AssignPanelButtonResponse(m) => {
            observer.on_assign_panel_button_response(m, header)
        }
        Message::SetPanelButtonModes(m) => observer.on_set_panel_button_modes(m, header),
        Message::SetPanelButtonModesResponse(m) => {
            observer.on_set_panel_button_modes_response(m, header)
        }
        Message::ReadMacAddress(m) => observer.on_read_mac_address(m, header),
        Message::ReadMacAddressResponse(m) => observer.on_read_mac_address_response(m, header),
    };
    handled || observer.on_any_message(&msg.message, header)
}
