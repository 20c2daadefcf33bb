//! Byte-stream framer.
//!
//! The read side hunts for the `AA AA` sync pair one byte at a time, takes
//! the stream lock on the first sync byte and keeps it until the complete
//! frame has been read. Short frames and frames with a bad CRC are dropped
//! and the hunt resumes. The write side takes the same lock for each frame,
//! so an outbound frame can never interleave with a frame being received.

use std::io;
use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};
use log::{debug, error, info, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, watch};

use smartbus_protocol::{
    decode_frame, verify_frame, Registry, SmartbusMessage, MIN_FRAME_SIZE, SYNC, SYNC_BYTE,
};

use super::lock::StreamLock;
use super::{BusHandle, FrameSender, DEFAULT_QUEUE_SIZE};

/// Builder for a stream transport.
pub struct StreamIo {
    registry: Arc<Registry>,
    lock: Arc<StreamLock>,
    queue_size: usize,
    raw_tap: Option<FrameSender>,
}

impl StreamIo {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            lock: Arc::new(StreamLock::new()),
            queue_size: DEFAULT_QUEUE_SIZE,
            raw_tap: None,
        }
    }

    /// Use an externally owned lock.
    pub fn with_lock(mut self, lock: Arc<StreamLock>) -> Self {
        self.lock = lock;
        self
    }

    pub fn with_queue_size(mut self, queue_size: usize) -> Self {
        self.queue_size = queue_size.max(1);
        self
    }

    /// Also forward every valid inbound frame, verbatim, to `tap`.
    pub fn with_raw_tap(mut self, tap: FrameSender) -> Self {
        self.raw_tap = Some(tap);
        self
    }

    /// Spawn the read and write loops over `stream`.
    pub fn start<S>(self, stream: S) -> BusHandle
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        let (inbound_tx, inbound_rx) = mpsc::channel(self.queue_size);
        let (outbound_tx, outbound_rx) = mpsc::channel(self.queue_size);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let read_task = tokio::spawn(read_loop(
            BufReader::new(reader),
            self.lock.clone(),
            self.registry,
            inbound_tx,
            self.raw_tap,
            shutdown_rx.clone(),
        ));
        let write_task = tokio::spawn(write_loop(
            writer,
            self.lock.clone(),
            outbound_rx,
            shutdown_rx,
        ));

        BusHandle::new(
            "stream",
            inbound_rx,
            outbound_tx,
            shutdown_tx,
            vec![read_task, write_task],
        )
        .with_stream_lock(self.lock)
    }
}

/// Read the next frame off the stream.
///
/// Returns the frame from the length byte through the CRC, or `None` when
/// the frame was too short or failed the CRC check. Errors are transport
/// errors, end of stream included.
pub async fn read_frame<R>(reader: &mut R, lock: &StreamLock) -> io::Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    loop {
        let byte = reader.read_u8().await?;
        if byte != SYNC_BYTE {
            debug!("Skipping byte {:02x} while looking for sync", byte);
            continue;
        }

        let guard = lock
            .acquire()
            .await
            .ok_or_else(|| io::Error::other("stream lock closed"))?;

        let byte = reader.read_u8().await?;
        if byte != SYNC_BYTE {
            debug!("Expected second sync byte, got {:02x}", byte);
            drop(guard);
            continue;
        }

        let len = reader.read_u8().await? as usize;
        if len < MIN_FRAME_SIZE {
            drop(guard);
            warn!("frame too short: {} bytes", len);
            return Ok(None);
        }

        let mut frame = vec![0u8; len];
        frame[0] = len as u8;
        reader.read_exact(&mut frame[1..]).await?;
        drop(guard);

        return match verify_frame(&frame) {
            Ok(()) => Ok(Some(frame)),
            Err(e) => {
                warn!("bad crc, dropping frame: {} ({})", hex::encode(&frame), e);
                Ok(None)
            }
        };
    }
}

/// Write one complete wire frame under the stream lock, in a single write.
pub async fn write_frame<W>(writer: &mut W, lock: &StreamLock, frame: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let _guard = lock
        .acquire()
        .await
        .ok_or_else(|| io::Error::other("stream lock closed"))?;
    writer.write_all(frame).await?;
    writer.flush().await
}

/// Prefix a frame (length byte through CRC) with the sync bytes.
pub(crate) fn with_sync(frame: &[u8]) -> Bytes {
    let mut wire = BytesMut::with_capacity(SYNC.len() + frame.len());
    wire.put_slice(&SYNC);
    wire.put_slice(frame);
    wire.freeze()
}

async fn read_loop<R>(
    mut reader: R,
    lock: Arc<StreamLock>,
    registry: Arc<Registry>,
    inbound: mpsc::Sender<SmartbusMessage>,
    raw_tap: Option<FrameSender>,
    mut shutdown: watch::Receiver<bool>,
) where
    R: AsyncRead + Unpin,
{
    loop {
        let result = tokio::select! {
            _ = shutdown.changed() => {
                debug!("Read loop stopped");
                break;
            }
            result = read_frame(&mut reader, &lock) => result,
        };

        let frame = match result {
            Ok(Some(frame)) => frame,
            Ok(None) => continue,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                info!("Bus stream closed");
                break;
            }
            Err(e) => {
                error!("Bus read error: {}", e);
                break;
            }
        };
        debug!("<- {}", hex::encode(&frame));

        if let Some(tap) = &raw_tap {
            if tap.send(with_sync(&frame)).await.is_err() {
                debug!("Raw frame tap closed");
            }
        }

        match decode_frame(&registry, &frame) {
            Ok(msg) => {
                if inbound.send(msg).await.is_err() {
                    debug!("Inbound channel closed, message dropped");
                }
            }
            Err(e) => warn!("Failed to decode frame: {}", e),
        }
    }
    // Dropping `inbound` here closes the channel for downstream consumers.
}

async fn write_loop<W>(
    mut writer: W,
    lock: Arc<StreamLock>,
    mut outbound: mpsc::Receiver<Bytes>,
    mut shutdown: watch::Receiver<bool>,
) where
    W: AsyncWrite + Unpin,
{
    loop {
        let frame = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            frame = outbound.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
        };
        debug!("-> {}", hex::encode(&frame));
        if let Err(e) = write_frame(&mut writer, &lock, &frame).await {
            if *shutdown.borrow() {
                debug!("Frame abandoned on shutdown: {}", e);
            } else {
                error!("Bus write error: {}", e);
            }
            break;
        }
    }
    outbound.close();
    if let Err(e) = writer.shutdown().await {
        debug!("Stream shutdown failed: {}", e);
    }
    debug!("Write loop stopped");
}
