//! Stream to UDP gateway bridge.
//!
//! Every valid frame read from the stream is re-broadcast over UDP and every
//! valid frame received over UDP is written to the stream. Frames pass
//! through untouched.

use bytes::Bytes;
use log::{debug, info};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::io::{BusHandle, DatagramIo, FrameSender, StreamIo};

/// Forward raw frames in both directions until either side goes away.
pub fn spawn_bridge(
    mut from_stream: mpsc::Receiver<Bytes>,
    to_udp: FrameSender,
    mut from_udp: mpsc::Receiver<Bytes>,
    to_stream: FrameSender,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("UDP gateway bridge started");
        loop {
            tokio::select! {
                frame = from_stream.recv() => {
                    let Some(frame) = frame else { break };
                    if to_udp.send(frame).await.is_err() {
                        break;
                    }
                }
                frame = from_udp.recv() => {
                    let Some(frame) = frame else { break };
                    if to_stream.send(frame).await.is_err() {
                        break;
                    }
                }
            }
        }
        debug!("UDP gateway bridge stopped");
    })
}

/// Start a stream transport bridged to a UDP transport on `socket`.
///
/// The returned handle delivers the decoded stream traffic; the UDP side
/// only feeds the bridge.
pub fn start_bridged<S>(
    stream_io: StreamIo,
    stream: S,
    datagram_io: DatagramIo,
    socket: UdpSocket,
    queue_size: usize,
) -> BusHandle
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let queue_size = queue_size.max(1);
    let (stream_raw_tx, stream_raw_rx) = mpsc::channel(queue_size);
    let (udp_raw_tx, udp_raw_rx) = mpsc::channel(queue_size);

    let mut handle = stream_io.with_raw_tap(stream_raw_tx).start(stream);
    let udp = datagram_io
        .with_raw_tap(udp_raw_tx)
        .start_with_socket(socket);

    let bridge = spawn_bridge(stream_raw_rx, udp.sender(), udp_raw_rx, handle.sender());
    handle.attach(udp);
    handle.attach_task(bridge);
    handle
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use smartbus_protocol::{
        decode_datagram, encode_datagram, Message, QueryModules, Registry,
    };
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::time::timeout;

    const QUERY_MODULES: [u8; 13] = [
        0xaa, 0xaa, 0x0b, 0x01, 0x14, 0x00, 0x95, 0x02, 0x86, 0x01, 0xff, 0xf9, 0x5b,
    ];

    #[tokio::test]
    async fn test_spawn_bridge_forwards_both_ways() {
        let (stream_raw_tx, stream_raw_rx) = mpsc::channel(4);
        let (udp_raw_tx, udp_raw_rx) = mpsc::channel(4);
        let (to_udp, mut udp_out) = mpsc::channel(4);
        let (to_stream, mut stream_out) = mpsc::channel(4);
        let bridge = spawn_bridge(stream_raw_rx, to_udp, udp_raw_rx, to_stream);

        stream_raw_tx.send(Bytes::from_static(b"one")).await.unwrap();
        udp_raw_tx.send(Bytes::from_static(b"two")).await.unwrap();
        assert_eq!(udp_out.recv().await.unwrap(), Bytes::from_static(b"one"));
        assert_eq!(stream_out.recv().await.unwrap(), Bytes::from_static(b"two"));

        drop(stream_raw_tx);
        timeout(Duration::from_secs(5), bridge).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_bridged_stream() {
        let registry = Arc::new(Registry::standard());
        let (mut client, server) = tokio::io::duplex(1024);
        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let gateway_addr = socket.local_addr().unwrap();

        let mut handle = start_bridged(
            StreamIo::new(registry.clone()),
            server,
            DatagramIo::new(registry).with_gateway_addr(peer.local_addr().unwrap()),
            socket,
            8,
        );
        let mut inbound = handle.take_inbound().unwrap();

        // Stream to UDP, still decoded locally.
        client.write_all(&QUERY_MODULES).await.unwrap();
        let msg = timeout(Duration::from_secs(5), inbound.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(msg.message, Message::from(QueryModules));

        let mut buf = [0u8; 64];
        let (n, _) = timeout(Duration::from_secs(5), peer.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(decode_datagram(&buf[..n]).unwrap(), &QUERY_MODULES[2..]);

        // UDP to stream.
        let packet = encode_datagram(Ipv4Addr::new(192, 168, 1, 5), &QUERY_MODULES);
        peer.send_to(&packet, gateway_addr).await.unwrap();
        let mut frame = [0u8; 13];
        timeout(Duration::from_secs(5), client.read_exact(&mut frame))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(frame, QUERY_MODULES);

        handle.stop();
        handle.join().await;
    }
}
