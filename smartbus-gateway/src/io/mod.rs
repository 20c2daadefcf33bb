//! Bus transports.
//!
//! A transport runs a read loop and a write loop. Decoded inbound messages
//! come out of one channel; complete wire frames go into another. The
//! [`BusHandle`] owns both loops.

pub mod datagram;
pub mod lock;
pub mod stream;

use std::sync::Arc;

use bytes::Bytes;
use log::debug;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use smartbus_protocol::SmartbusMessage;

pub use datagram::DatagramIo;
pub use lock::{StreamLock, StreamLockGuard};
pub use stream::StreamIo;

/// Queue of complete wire frames, sync bytes included.
pub type FrameSender = mpsc::Sender<Bytes>;

/// Default capacity of the inbound and outbound channels.
pub const DEFAULT_QUEUE_SIZE: usize = 32;

/// Running transport.
///
/// Dropping the handle stops its loops.
pub struct BusHandle {
    name: &'static str,
    inbound: Option<mpsc::Receiver<SmartbusMessage>>,
    outbound: FrameSender,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
    aux_tasks: Vec<JoinHandle<()>>,
    companions: Vec<BusHandle>,
    stream_lock: Option<Arc<StreamLock>>,
}

impl BusHandle {
    pub(crate) fn new(
        name: &'static str,
        inbound: mpsc::Receiver<SmartbusMessage>,
        outbound: FrameSender,
        shutdown: watch::Sender<bool>,
        tasks: Vec<JoinHandle<()>>,
    ) -> Self {
        Self {
            name,
            inbound: Some(inbound),
            outbound,
            shutdown,
            tasks,
            aux_tasks: Vec::new(),
            companions: Vec::new(),
            stream_lock: None,
        }
    }

    /// Close `lock` on stop, so a frame waiting for it is abandoned.
    pub(crate) fn with_stream_lock(mut self, lock: Arc<StreamLock>) -> Self {
        self.stream_lock = Some(lock);
        self
    }

    /// Transport kind, for logging.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Take the inbound message channel. Returns `None` after the first call.
    pub fn take_inbound(&mut self) -> Option<mpsc::Receiver<SmartbusMessage>> {
        self.inbound.take()
    }

    /// Sender for outbound wire frames.
    pub fn sender(&self) -> FrameSender {
        self.outbound.clone()
    }

    /// Tie another transport's lifetime to this one.
    pub fn attach(&mut self, companion: BusHandle) {
        self.companions.push(companion);
    }

    /// Tie an auxiliary task to this transport.
    pub fn attach_task(&mut self, task: JoinHandle<()>) {
        self.aux_tasks.push(task);
    }

    /// Stop the read and write loops. Frames still queued are abandoned.
    pub fn stop(&self) {
        debug!("Stopping {} transport", self.name);
        if let Some(lock) = &self.stream_lock {
            lock.close();
        }
        self.shutdown.send_replace(true);
        for companion in &self.companions {
            companion.stop();
        }
        // Auxiliary tasks have no shutdown signal of their own.
        for task in &self.aux_tasks {
            task.abort();
        }
    }

    /// Wait until every loop has finished.
    pub async fn join(&mut self) {
        let mut tasks = Vec::new();
        self.drain_tasks(&mut tasks);
        for task in tasks {
            let _ = task.await;
        }
    }

    fn drain_tasks(&mut self, out: &mut Vec<JoinHandle<()>>) {
        out.append(&mut self.tasks);
        out.append(&mut self.aux_tasks);
        for companion in &mut self.companions {
            companion.drain_tasks(out);
        }
    }
}
