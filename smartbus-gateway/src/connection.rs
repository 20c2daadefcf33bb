//! Connections, endpoints and devices.
//!
//! A [`Connection`] owns one running transport and fans every inbound
//! message out to its endpoints, in arrival order. An [`Endpoint`] is a local
//! bus identity: it filters inbound messages by target address and stamps
//! its own address on everything it sends. A [`Device`] is a remote address
//! seen from one endpoint.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, watch};

use smartbus_protocol::messages::*;
use smartbus_protocol::{
    encode_frame, MessageHeader, PanelButtonMode, SmartbusMessage, BROADCAST_DEVICE,
    BROADCAST_SUBNET, LIGHT_LEVEL_OFF, LIGHT_LEVEL_ON, PANEL_BUTTON_COUNT,
};

use crate::error::GatewayError;
use crate::io::{BusHandle, FrameSender};
use crate::observer::{notify, Observer};

type EndpointList = Arc<RwLock<Vec<Arc<Endpoint>>>>;

pub struct Connection {
    name: &'static str,
    handle: Mutex<Option<BusHandle>>,
    sender: FrameSender,
    endpoints: EndpointList,
    done: watch::Receiver<bool>,
}

impl Connection {
    /// Take over a running transport and start dispatching its messages.
    pub fn new(mut handle: BusHandle) -> Result<Arc<Self>, GatewayError> {
        let inbound = handle.take_inbound().ok_or(GatewayError::ConnectionClosed)?;
        let endpoints: EndpointList = Arc::new(RwLock::new(Vec::new()));
        let (done_tx, done_rx) = watch::channel(false);

        tokio::spawn(dispatch_loop(inbound, endpoints.clone(), done_tx));

        Ok(Arc::new(Self {
            name: handle.name(),
            sender: handle.sender(),
            handle: Mutex::new(Some(handle)),
            endpoints,
            done: done_rx,
        }))
    }

    /// Create a local endpoint on this connection.
    pub fn endpoint(&self, subnet_id: u8, device_id: u8, device_type: u16) -> Arc<Endpoint> {
        let endpoint = Endpoint::new(subnet_id, device_id, device_type, self.sender.clone());
        self.endpoints.write().push(endpoint.clone());
        info!(
            "[{}] Endpoint {:02x}/{:02x} (type {:04x}) attached",
            self.name, subnet_id, device_id, device_type
        );
        endpoint
    }

    /// Encode and queue a message with `header` as given, bypassing every
    /// endpoint. The opcode is taken from the message.
    pub async fn send(
        &self,
        header: &MessageHeader,
        message: impl Into<Message>,
    ) -> Result<(), GatewayError> {
        let frame = encode_frame(header, &message.into())?;
        self.sender
            .send(frame)
            .await
            .map_err(|_| GatewayError::ConnectionClosed)
    }

    /// Stop the transport and wait for every loop to finish.
    pub async fn close(&self) {
        let handle = self.handle.lock().take();
        if let Some(mut handle) = handle {
            info!("[{}] Closing connection", self.name);
            handle.stop();
            handle.join().await;
        }
        self.closed().await;
    }

    /// Resolves once the transport stopped delivering messages and the
    /// dispatch loop is done.
    pub async fn closed(&self) {
        let mut done = self.done.clone();
        let _ = done.wait_for(|done| *done).await;
    }

    pub fn is_closed(&self) -> bool {
        *self.done.borrow()
    }
}

async fn dispatch_loop(
    mut inbound: mpsc::Receiver<SmartbusMessage>,
    endpoints: EndpointList,
    done: watch::Sender<bool>,
) {
    while let Some(msg) = inbound.recv().await {
        let snapshot = endpoints.read().clone();
        for endpoint in &snapshot {
            endpoint.handle(&msg);
        }
    }
    debug!("Dispatch loop finished");
    done.send_replace(true);
}

type ObserverList = RwLock<Vec<Arc<dyn Observer>>>;

pub struct Endpoint {
    subnet_id: u8,
    device_id: u8,
    device_type: u16,
    sender: FrameSender,
    observers: ObserverList,
    input_sniffers: ObserverList,
    output_sniffers: ObserverList,
    devices: Mutex<HashMap<u16, Arc<Device>>>,
    me: Weak<Endpoint>,
}

impl Endpoint {
    pub(crate) fn new(
        subnet_id: u8,
        device_id: u8,
        device_type: u16,
        sender: FrameSender,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            subnet_id,
            device_id,
            device_type,
            sender,
            observers: RwLock::new(Vec::new()),
            input_sniffers: RwLock::new(Vec::new()),
            output_sniffers: RwLock::new(Vec::new()),
            devices: Mutex::new(HashMap::new()),
            me: me.clone(),
        })
    }

    pub fn subnet_id(&self) -> u8 {
        self.subnet_id
    }

    pub fn device_id(&self) -> u8 {
        self.device_id
    }

    pub fn device_type(&self) -> u16 {
        self.device_type
    }

    pub fn observe(&self, observer: Arc<dyn Observer>) {
        self.observers.write().push(observer);
    }

    /// Watch messages addressed to other devices.
    pub fn add_input_sniffer(&self, observer: Arc<dyn Observer>) {
        self.input_sniffers.write().push(observer);
    }

    /// Watch messages sent from this endpoint.
    pub fn add_output_sniffer(&self, observer: Arc<dyn Observer>) {
        self.output_sniffers.write().push(observer);
    }

    /// Unicast to us, or broadcast on the subnet part, the device part or both.
    pub fn is_message_for_us(&self, header: &MessageHeader) -> bool {
        if header.is_broadcast() {
            return true;
        }
        (header.target_subnet_id == self.subnet_id || header.target_subnet_id == BROADCAST_SUBNET)
            && (header.target_device_id == self.device_id
                || header.target_device_id == BROADCAST_DEVICE)
    }

    /// Route one inbound message to the observers or the input sniffers.
    pub fn handle(&self, msg: &SmartbusMessage) {
        if !self.is_message_for_us(&msg.header) {
            let sniffers = self.input_sniffers.read().clone();
            for sniffer in &sniffers {
                notify(sniffer.as_ref(), msg);
            }
            return;
        }

        let observers = self.observers.read().clone();
        let mut handled = false;
        for observer in &observers {
            handled |= notify(observer.as_ref(), msg);
        }
        if !handled {
            debug!(
                "[Endpoint {:02x}/{:02x}] no handler for {}",
                self.subnet_id,
                self.device_id,
                msg.message.name()
            );
        }
    }

    /// Stamp our address on `header`, encode and queue the message.
    ///
    /// Encoding failures are returned and nothing is queued.
    pub async fn send(
        &self,
        header: MessageHeader,
        message: impl Into<Message>,
    ) -> Result<(), GatewayError> {
        let message = message.into();
        let header = MessageHeader {
            orig_subnet_id: self.subnet_id,
            orig_device_id: self.device_id,
            orig_device_type: self.device_type,
            opcode: message.opcode(),
            ..header
        };
        let frame = encode_frame(&header, &message)?;

        self.sender.send(frame).await.map_err(|_| {
            warn!(
                "[Endpoint {:02x}/{:02x}] send on closed connection",
                self.subnet_id, self.device_id
            );
            GatewayError::ConnectionClosed
        })?;

        // Sniffers only see frames that were actually queued.
        let sniffers = self.output_sniffers.read().clone();
        if !sniffers.is_empty() {
            let msg = SmartbusMessage { header, message };
            for sniffer in &sniffers {
                notify(sniffer.as_ref(), &msg);
            }
        }
        Ok(())
    }

    /// Handle for the device at `subnet_id`/`device_id`. Handles are cached.
    pub fn device(&self, subnet_id: u8, device_id: u8) -> Arc<Device> {
        let key = (subnet_id as u16) << 8 | device_id as u16;
        self.devices
            .lock()
            .entry(key)
            .or_insert_with(|| {
                Arc::new(Device {
                    endpoint: self.me.clone(),
                    subnet_id,
                    device_id,
                })
            })
            .clone()
    }

    pub fn broadcast_device(&self) -> Arc<Device> {
        self.device(BROADCAST_SUBNET, BROADCAST_DEVICE)
    }
}

/// Remote device as seen from one endpoint.
pub struct Device {
    endpoint: Weak<Endpoint>,
    subnet_id: u8,
    device_id: u8,
}

impl Device {
    pub fn subnet_id(&self) -> u8 {
        self.subnet_id
    }

    pub fn device_id(&self) -> u8 {
        self.device_id
    }

    fn endpoint(&self) -> Result<Arc<Endpoint>, GatewayError> {
        self.endpoint.upgrade().ok_or(GatewayError::EndpointClosed)
    }

    pub async fn send(&self, message: impl Into<Message>) -> Result<(), GatewayError> {
        let header = MessageHeader::to_target(self.subnet_id, self.device_id);
        self.endpoint()?.send(header, message).await
    }

    pub async fn single_channel_control(
        &self,
        channel_no: u8,
        level: u8,
        duration: u16,
    ) -> Result<(), GatewayError> {
        self.send(SingleChannelControlCommand {
            channel_no,
            level,
            duration,
        })
        .await
    }

    /// Turn a channel fully on or off.
    pub async fn switch_channel(&self, channel_no: u8, on: bool) -> Result<(), GatewayError> {
        let level = if on { LIGHT_LEVEL_ON } else { LIGHT_LEVEL_OFF };
        self.single_channel_control(channel_no, level, 0).await
    }

    pub async fn single_channel_control_response(
        &self,
        channel_no: u8,
        success: bool,
        level: u8,
        channel_status: Vec<bool>,
    ) -> Result<(), GatewayError> {
        self.send(SingleChannelControlResponse {
            channel_no,
            success,
            level,
            channel_status,
        })
        .await
    }

    pub async fn zone_beast_broadcast(
        &self,
        zone_status: Vec<u8>,
        channel_status: Vec<bool>,
    ) -> Result<(), GatewayError> {
        self.send(ZoneBeastBroadcast {
            zone_status,
            channel_status,
        })
        .await
    }

    pub async fn query_modules(&self) -> Result<(), GatewayError> {
        self.send(QueryModules).await
    }

    /// Describe the sending endpoint as a module of `device_category`.
    pub async fn query_modules_response(
        &self,
        device_category: u8,
        channel_no: u8,
    ) -> Result<(), GatewayError> {
        let endpoint = self.endpoint()?;
        self.send(QueryModulesResponse {
            controlled_device_subnet_id: endpoint.subnet_id,
            controlled_device_id: endpoint.device_id,
            device_category,
            channel_no,
            hvac_subnet_id: endpoint.subnet_id,
            hvac_device_id: endpoint.device_id,
        })
        .await
    }

    pub async fn panel_control_response(
        &self,
        control_type: u8,
        value: u8,
    ) -> Result<(), GatewayError> {
        self.send(PanelControlResponse {
            control_type,
            value,
        })
        .await
    }

    pub async fn query_fan_controller(&self, index: u8) -> Result<(), GatewayError> {
        self.send(QueryFanController { index }).await
    }

    pub async fn query_panel_button_assignment(
        &self,
        button_no: u8,
        function_no: u8,
    ) -> Result<(), GatewayError> {
        self.send(QueryPanelButtonAssignment {
            button_no,
            function_no,
        })
        .await
    }

    pub async fn query_panel_button_assignment_response(
        &self,
        button_no: u8,
        function_no: u8,
        assignment: ButtonAssignment,
    ) -> Result<(), GatewayError> {
        self.send(QueryPanelButtonAssignmentResponse {
            button_no,
            function_no,
            assignment,
        })
        .await
    }

    pub async fn assign_panel_button(
        &self,
        button_no: u8,
        function_no: u8,
        assignment: ButtonAssignment,
    ) -> Result<(), GatewayError> {
        self.send(AssignPanelButton {
            button_no,
            function_no,
            assignment,
            unknown: 0,
        })
        .await
    }

    pub async fn assign_panel_button_response(
        &self,
        button_no: u8,
        function_no: u8,
    ) -> Result<(), GatewayError> {
        self.send(AssignPanelButtonResponse {
            button_no,
            function_no,
        })
        .await
    }

    pub async fn set_panel_button_modes(
        &self,
        modes: [PanelButtonMode; PANEL_BUTTON_COUNT],
    ) -> Result<(), GatewayError> {
        self.send(SetPanelButtonModes { modes }).await
    }

    pub async fn set_panel_button_modes_response(&self, success: bool) -> Result<(), GatewayError> {
        self.send(SetPanelButtonModesResponse { success }).await
    }

    pub async fn read_mac_address(&self) -> Result<(), GatewayError> {
        self.send(ReadMacAddress).await
    }

    pub async fn read_mac_address_response(
        &self,
        mac_address: [u8; 8],
        remark: Vec<u8>,
    ) -> Result<(), GatewayError> {
        self.send(ReadMacAddressResponse {
            mac_address,
            remark,
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::dump::MessageFormatter;
    use crate::io::StreamIo;
    use smartbus_protocol::{ProtocolError, Registry, QUERY_MODULES_DEV_RELAY};
    use tokio::sync::mpsc::error::TryRecvError;
    use tokio::time::timeout;

    const SCC_COMMAND: [u8; 17] = [
        0xaa, 0xaa, 0x0f, 0x01, 0x14, 0x00, 0x95, 0x00, 0x31, 0x01, 0x1c, 0x07, 0x64, 0x00, 0x00,
        0x60, 0x66,
    ];

    fn recorder() -> (Arc<MessageFormatter>, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let formatter = MessageFormatter::new(move |line| {
            let _ = tx.send(line);
        });
        (Arc::new(formatter), rx)
    }

    async fn next_line(rx: &mut mpsc::UnboundedReceiver<String>) -> String {
        timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for message")
            .expect("recorder closed")
    }

    fn inbound(target: (u8, u8)) -> SmartbusMessage {
        SmartbusMessage::new(
            MessageHeader {
                orig_subnet_id: 0x01,
                orig_device_id: 0x14,
                orig_device_type: 0x0095,
                opcode: 0x0033,
                target_subnet_id: target.0,
                target_device_id: target.1,
            },
            QueryFanController { index: 7 },
        )
    }

    fn connection_pair() -> (Arc<Connection>, Arc<Connection>) {
        let registry = Arc::new(Registry::standard());
        let (a, b) = tokio::io::duplex(4096);
        let conn1 = Connection::new(StreamIo::new(registry.clone()).start(a)).unwrap();
        let conn2 = Connection::new(StreamIo::new(registry).start(b)).unwrap();
        (conn1, conn2)
    }

    #[test]
    fn test_addressing_filter() {
        let (tx, _rx) = mpsc::channel(1);
        let endpoint = Endpoint::new(0x01, 0x1c, 0x139c, tx);
        let header = |subnet, device| MessageHeader::to_target(subnet, device);

        assert!(header(0xff, 0xff).is_broadcast());
        assert!(endpoint.is_message_for_us(&header(0xff, 0xff)));
        assert!(endpoint.is_message_for_us(&header(0x01, 0x1c)));
        assert!(endpoint.is_message_for_us(&header(0x01, 0xff)));
        assert!(endpoint.is_message_for_us(&header(0xff, 0x1c)));
        assert!(!endpoint.is_message_for_us(&header(0x01, 0x1d)));
        assert!(!endpoint.is_message_for_us(&header(0x02, 0x1c)));
    }

    #[test]
    fn test_dispatch_and_input_sniffer() {
        let (tx, _rx) = mpsc::channel(1);
        let endpoint = Endpoint::new(0x01, 0x1c, 0x139c, tx);
        let (observer, mut seen) = recorder();
        let (sniffer, mut sniffed) = recorder();
        endpoint.observe(observer);
        endpoint.add_input_sniffer(sniffer);

        endpoint.handle(&inbound((0xff, 0xff)));
        endpoint.handle(&inbound((0x01, 0x1c)));
        endpoint.handle(&inbound((0x01, 0x1d)));

        assert_eq!(
            seen.try_recv().unwrap(),
            "01/14 (type 0095) -> ff/ff: <QueryFanController 7>"
        );
        assert_eq!(
            seen.try_recv().unwrap(),
            "01/14 (type 0095) -> 01/1c: <QueryFanController 7>"
        );
        assert!(seen.try_recv().is_err());
        assert_eq!(
            sniffed.try_recv().unwrap(),
            "01/14 (type 0095) -> 01/1d: <QueryFanController 7>"
        );
        assert!(sniffed.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_send_stamps_origin() {
        let (tx, mut rx) = mpsc::channel(4);
        let endpoint = Endpoint::new(0x01, 0x14, 0x0095, tx);
        let (sniffer, mut sniffed) = recorder();
        endpoint.add_output_sniffer(sniffer);

        endpoint
            .device(0x01, 0x1c)
            .single_channel_control(7, LIGHT_LEVEL_ON, 0)
            .await
            .unwrap();

        assert_eq!(rx.recv().await.unwrap().as_ref(), &SCC_COMMAND[..]);
        assert_eq!(
            sniffed.try_recv().unwrap(),
            "01/14 (type 0095) -> 01/1c: <SingleChannelControlCommand 7/100/0>"
        );
    }

    #[tokio::test]
    async fn test_switch_channel() {
        let (tx, mut rx) = mpsc::channel(4);
        let endpoint = Endpoint::new(0x01, 0x14, 0x0095, tx);
        let (sniffer, mut sniffed) = recorder();
        endpoint.add_output_sniffer(sniffer);
        let device = endpoint.device(0x01, 0x1c);

        device.switch_channel(7, true).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().as_ref(), &SCC_COMMAND[..]);
        device.switch_channel(7, false).await.unwrap();
        rx.recv().await.unwrap();

        assert!(sniffed.try_recv().unwrap().ends_with("<SingleChannelControlCommand 7/100/0>"));
        assert!(sniffed.try_recv().unwrap().ends_with("<SingleChannelControlCommand 7/0/0>"));
    }

    #[tokio::test]
    async fn test_encode_error_is_returned() {
        let (tx, mut rx) = mpsc::channel(4);
        let endpoint = Endpoint::new(0x01, 0x1c, 0x139c, tx);

        let err = endpoint
            .device(0x01, 0x14)
            .query_modules_response(0x42, 1)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Protocol(ProtocolError::BadDeviceCategory(0x42))
        ));
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_send_after_channel_closed() {
        let (tx, rx) = mpsc::channel(4);
        let endpoint = Endpoint::new(0x01, 0x1c, 0x139c, tx);
        let (sniffer, mut sniffed) = recorder();
        endpoint.add_output_sniffer(sniffer);
        drop(rx);

        let err = endpoint.broadcast_device().query_modules().await.unwrap_err();
        assert!(matches!(err, GatewayError::ConnectionClosed));
        assert!(sniffed.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_device_cache() {
        let (tx, _rx) = mpsc::channel(1);
        let endpoint = Endpoint::new(0x01, 0x1c, 0x139c, tx);
        let a = endpoint.device(0x03, 0xfe);
        let b = endpoint.device(0x03, 0xfe);
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &endpoint.device(0x03, 0xfd)));

        let broadcast = endpoint.broadcast_device();
        assert_eq!((broadcast.subnet_id(), broadcast.device_id()), (0xff, 0xff));
        assert!(Arc::ptr_eq(&broadcast, &endpoint.device(0xff, 0xff)));

        drop(endpoint);
        let err = a.query_modules().await.unwrap_err();
        assert!(matches!(err, GatewayError::EndpointClosed));
    }

    #[tokio::test]
    async fn test_send_receive_over_stream() {
        let (conn1, conn2) = connection_pair();

        let app = conn1.endpoint(0x03, 0xfe, 0xfffe);
        let (app_observer, mut app_lines) = recorder();
        app.observe(app_observer);

        let ddp = conn2.endpoint(0x01, 0x14, 0x0095);
        let (ddp_observer, mut ddp_lines) = recorder();
        ddp.observe(ddp_observer);

        let to_ddp = app.device(0x01, 0x14);
        let to_app = ddp.device(0x03, 0xfe);

        to_ddp.query_panel_button_assignment(1, 2).await.unwrap();
        assert_eq!(
            next_line(&mut ddp_lines).await,
            "03/fe (type fffe) -> 01/14: <QueryPanelButtonAssignment 1/2>"
        );

        to_app
            .query_panel_button_assignment_response(
                1,
                2,
                ButtonAssignment::single_channel(0x01, 0x99, 8, 100),
            )
            .await
            .unwrap();
        assert_eq!(
            next_line(&mut app_lines).await,
            "01/14 (type 0095) -> 03/fe: \
             <QueryPanelButtonAssignmentResponse 1/2/59/01/99/8/100/0>"
        );

        to_ddp
            .assign_panel_button(1, 1, ButtonAssignment::single_channel(0x01, 0x99, 1, 100))
            .await
            .unwrap();
        assert_eq!(
            next_line(&mut ddp_lines).await,
            "03/fe (type fffe) -> 01/14: <AssignPanelButton 1/1/59/01/99/1/100/0/0>"
        );

        ddp.broadcast_device()
            .query_modules_response(QUERY_MODULES_DEV_RELAY, 10)
            .await
            .unwrap();
        assert_eq!(
            next_line(&mut app_lines).await,
            "01/14 (type 0095) -> ff/ff: <QueryModulesResponse 01/14/02/10/00/00>"
        );

        to_app.set_panel_button_modes_response(true).await.unwrap();
        assert_eq!(
            next_line(&mut app_lines).await,
            "01/14 (type 0095) -> 03/fe: <SetPanelButtonModesResponse true>"
        );

        // Raw sends keep the given origin.
        let header = MessageHeader {
            orig_subnet_id: 0x01,
            orig_device_id: 0x1c,
            orig_device_type: 0x139c,
            ..MessageHeader::to_target(0x03, 0xfe)
        };
        conn2.send(&header, QueryFanController { index: 9 }).await.unwrap();
        assert_eq!(
            next_line(&mut app_lines).await,
            "01/1c (type 139c) -> 03/fe: <QueryFanController 9>"
        );

        conn1.close().await;
        conn2.close().await;
        assert!(conn1.is_closed());
        assert!(conn2.is_closed());
    }

    #[tokio::test]
    async fn test_close_rejects_sends() {
        let (conn1, conn2) = connection_pair();
        let endpoint = conn1.endpoint(0x01, 0x1c, 0x139c);

        conn1.close().await;
        let err = endpoint.broadcast_device().query_modules().await.unwrap_err();
        assert!(matches!(err, GatewayError::ConnectionClosed));
        let err = conn1
            .send(&MessageHeader::to_target(0xff, 0xff), QueryModules)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::ConnectionClosed));

        // The peer sees end of stream.
        timeout(Duration::from_secs(5), conn2.closed()).await.unwrap();
    }
}
