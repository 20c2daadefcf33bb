//! Opcode to parser registry.

use std::collections::HashMap;

use bytes::Bytes;

use crate::error::ProtocolError;
use crate::messages::*;

/// Parses a payload into a typed message.
pub type Parser = fn(&mut Bytes) -> Result<Message, ProtocolError>;

#[derive(Clone, Copy)]
struct Registration {
    name: &'static str,
    parser: Parser,
}

fn parse_simple<T: SimpleMessage>(buf: &mut Bytes) -> Result<Message, ProtocolError> {
    T::read_fields(buf).map(Into::into)
}

fn parse_preprocessed<T: PreprocessedMessage>(buf: &mut Bytes) -> Result<Message, ProtocolError> {
    let raw = T::Raw::read_fields(buf)?;
    T::from_raw(raw).map(Into::into)
}

/// Maps opcodes to message parsers.
///
/// Build one with [`Registry::standard`] at startup and share it between the
/// framers that need it.
#[derive(Clone, Default)]
pub struct Registry {
    parsers: HashMap<u16, Registration>,
}

impl Registry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every message this crate defines.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry
            .register_simple::<SingleChannelControlCommand>()
            .register_simple::<SingleChannelControlResponse>()
            .register_simple::<ZoneBeastBroadcast>()
            .register_simple::<QueryModules>()
            .register_preprocessed::<QueryModulesResponse>()
            .register_simple::<PanelControlResponse>()
            .register_simple::<QueryFanController>()
            .register_simple::<QueryPanelButtonAssignment>()
            .register_simple::<QueryPanelButtonAssignmentResponse>()
            .register_simple::<AssignPanelButton>()
            .register_simple::<AssignPanelButtonResponse>()
            .register_simple::<SetPanelButtonModes>()
            .register_simple::<SetPanelButtonModesResponse>()
            .register_simple::<ReadMacAddress>()
            .register_simple::<ReadMacAddressResponse>();
        registry
    }

    pub fn register_simple<T: SimpleMessage>(&mut self) -> &mut Self {
        self.register(T::OPCODE, T::NAME, parse_simple::<T>)
    }

    pub fn register_preprocessed<T: PreprocessedMessage>(&mut self) -> &mut Self {
        self.register(T::OPCODE, T::NAME, parse_preprocessed::<T>)
    }

    /// Register a parser under `opcode`, replacing any previous one.
    pub fn register(&mut self, opcode: u16, name: &'static str, parser: Parser) -> &mut Self {
        self.parsers.insert(opcode, Registration { name, parser });
        self
    }

    /// Parse `payload` as the message registered under `opcode`.
    pub fn parse(&self, opcode: u16, payload: &mut Bytes) -> Result<Message, ProtocolError> {
        let registration = self
            .parsers
            .get(&opcode)
            .ok_or(ProtocolError::UnknownOpcode(opcode))?;
        (registration.parser)(payload)
    }

    pub fn contains(&self, opcode: u16) -> bool {
        self.parsers.contains_key(&opcode)
    }

    pub fn name(&self, opcode: u16) -> Option<&'static str> {
        self.parsers.get(&opcode).map(|r| r.name)
    }

    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut opcodes: Vec<_> = self.parsers.keys().copied().collect();
        opcodes.sort_unstable();
        f.debug_struct("Registry").field("opcodes", &opcodes).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PanelButtonMode;

    fn samples() -> Vec<Message> {
        vec![
            SingleChannelControlCommand::default().into(),
            SingleChannelControlResponse::default().into(),
            ZoneBeastBroadcast::default().into(),
            QueryModules.into(),
            QueryModulesResponse {
                device_category: crate::types::QUERY_MODULES_DEV_SENSORS,
                ..Default::default()
            }
            .into(),
            PanelControlResponse::default().into(),
            QueryFanController::default().into(),
            QueryPanelButtonAssignment::default().into(),
            QueryPanelButtonAssignmentResponse::default().into(),
            AssignPanelButton::default().into(),
            AssignPanelButtonResponse::default().into(),
            SetPanelButtonModes {
                modes: [PanelButtonMode::SingleOn; 16],
            }
            .into(),
            SetPanelButtonModesResponse::default().into(),
            ReadMacAddress.into(),
            ReadMacAddressResponse::default().into(),
        ]
    }

    #[test]
    fn test_standard_registry_is_bijective() {
        let registry = Registry::standard();
        let samples = samples();
        assert_eq!(registry.len(), samples.len());

        for msg in &samples {
            assert!(registry.contains(msg.opcode()), "{} missing", msg.name());
            assert_eq!(registry.name(msg.opcode()), Some(msg.name()));

            let mut payload = bytes::BytesMut::new();
            msg.write_payload(&mut payload).unwrap();
            let parsed = registry.parse(msg.opcode(), &mut payload.freeze()).unwrap();
            assert_eq!(&parsed, msg);
        }
    }

    #[test]
    fn test_unknown_opcode() {
        let registry = Registry::standard();
        let mut payload = Bytes::new();
        assert_eq!(
            registry.parse(0x1234, &mut payload),
            Err(ProtocolError::UnknownOpcode(0x1234))
        );
        assert_eq!(
            ProtocolError::UnknownOpcode(0x1234).to_string(),
            "opcode 1234 not recognized"
        );
    }

    #[test]
    fn test_preprocessed_parse_error_propagates() {
        let registry = Registry::standard();
        let mut payload = Bytes::from_static(&[0x01, 0x1c, 0x09, 0x00, 0x00, 0x00, 0x00]);
        assert_eq!(
            registry.parse(QueryModulesResponse::OPCODE, &mut payload),
            Err(ProtocolError::BadDeviceCategory(0x09))
        );
    }

    #[test]
    fn test_empty_registry() {
        let registry = Registry::new();
        assert!(registry.is_empty());
        assert!(!registry.contains(QueryModules::OPCODE));
    }
}
