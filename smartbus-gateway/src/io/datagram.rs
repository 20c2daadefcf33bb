//! UDP datagram transport.
//!
//! Each datagram carries one frame behind a source address and the
//! `SMARTCLOUD` signature. Outbound frames are broadcast to the gateway
//! address.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;

use bytes::Bytes;
use log::{debug, error, info, warn};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch};

use smartbus_protocol::datagram::datagram_source;
use smartbus_protocol::{
    decode_datagram, encode_datagram, parse_frame, verify_frame, Registry, SmartbusMessage,
    SMARTBUS_UDP_PORT,
};

use super::stream::with_sync;
use super::{BusHandle, FrameSender, DEFAULT_QUEUE_SIZE};
use crate::error::GatewayError;

const MAX_DATAGRAM_SIZE: usize = 2048;

/// Builder for a UDP transport.
pub struct DatagramIo {
    registry: Arc<Registry>,
    gateway_addr: SocketAddr,
    source_ip: Ipv4Addr,
    queue_size: usize,
    raw_tap: Option<FrameSender>,
}

impl DatagramIo {
    /// Listen on the Smartbus port and broadcast to it.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            gateway_addr: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::BROADCAST, SMARTBUS_UDP_PORT)),
            source_ip: Ipv4Addr::BROADCAST,
            queue_size: DEFAULT_QUEUE_SIZE,
            raw_tap: None,
        }
    }

    pub fn with_gateway_addr(mut self, addr: SocketAddr) -> Self {
        self.gateway_addr = addr;
        self
    }

    /// Address written into the source field of outbound datagrams.
    pub fn with_source_ip(mut self, ip: Ipv4Addr) -> Self {
        self.source_ip = ip;
        self
    }

    pub fn with_queue_size(mut self, queue_size: usize) -> Self {
        self.queue_size = queue_size.max(1);
        self
    }

    /// Forward valid inbound frames verbatim to `tap` instead of decoding them.
    pub fn with_raw_tap(mut self, tap: FrameSender) -> Self {
        self.raw_tap = Some(tap);
        self
    }

    /// Bind a broadcast-capable socket on the Smartbus port.
    pub async fn bind(&self) -> Result<UdpSocket, GatewayError> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, SMARTBUS_UDP_PORT)).await?;
        socket.set_broadcast(true)?;
        info!(
            "UDP transport listening on {}, sending to {}",
            socket.local_addr()?,
            self.gateway_addr
        );
        Ok(socket)
    }

    /// Bind the socket and spawn the read and write loops.
    pub async fn start(self) -> Result<BusHandle, GatewayError> {
        let socket = self.bind().await?;
        Ok(self.start_with_socket(socket))
    }

    /// Spawn the read and write loops over an already bound socket.
    pub fn start_with_socket(self, socket: UdpSocket) -> BusHandle {
        let socket = Arc::new(socket);
        let (inbound_tx, inbound_rx) = mpsc::channel(self.queue_size);
        let (outbound_tx, outbound_rx) = mpsc::channel(self.queue_size);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let read_task = tokio::spawn(read_loop(
            socket.clone(),
            self.registry,
            inbound_tx,
            self.raw_tap,
            shutdown_rx.clone(),
        ));
        let write_task = tokio::spawn(write_loop(
            socket,
            self.gateway_addr,
            self.source_ip,
            outbound_rx,
            shutdown_rx,
        ));

        BusHandle::new(
            "udp",
            inbound_rx,
            outbound_tx,
            shutdown_tx,
            vec![read_task, write_task],
        )
    }
}

async fn read_loop(
    socket: Arc<UdpSocket>,
    registry: Arc<Registry>,
    inbound: mpsc::Sender<SmartbusMessage>,
    raw_tap: Option<FrameSender>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
    loop {
        let (n, peer) = tokio::select! {
            _ = shutdown.changed() => break,
            result = socket.recv_from(&mut buf) => match result {
                Ok(received) => received,
                Err(e) => {
                    error!("UDP receive error: {}", e);
                    break;
                }
            },
        };
        let packet = &buf[..n];

        let frame = match decode_datagram(packet) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Ignoring datagram from {}: {}", peer, e);
                continue;
            }
        };
        debug!(
            "<- udp {} (source {:?}): {}",
            peer,
            datagram_source(packet),
            hex::encode(frame)
        );

        if let Some(tap) = &raw_tap {
            match verify_frame(frame) {
                Ok(()) => {
                    if tap.send(with_sync(frame)).await.is_err() {
                        debug!("Raw frame tap closed");
                    }
                }
                Err(e) => warn!("Dropping UDP frame from {}: {}", peer, e),
            }
            continue;
        }

        match parse_frame(&registry, frame) {
            Ok(msg) => {
                if inbound.send(msg).await.is_err() {
                    debug!("Inbound channel closed, message dropped");
                }
            }
            Err(e) => warn!("Dropping UDP frame from {}: {}", peer, e),
        }
    }
    debug!("UDP read loop stopped");
}

async fn write_loop(
    socket: Arc<UdpSocket>,
    gateway_addr: SocketAddr,
    source_ip: Ipv4Addr,
    mut outbound: mpsc::Receiver<Bytes>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let frame = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            frame = outbound.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
        };
        let packet = encode_datagram(source_ip, &frame);
        debug!("-> udp {}: {}", gateway_addr, hex::encode(&packet));
        if let Err(e) = socket.send_to(&packet, gateway_addr).await {
            error!("UDP send error: {}", e);
            break;
        }
    }
    outbound.close();
    debug!("UDP write loop stopped");
}
