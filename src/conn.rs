//! The connection contract the endpoint runs over.
//!
//! The transport never opens sockets itself; callers hand it anything that
//! satisfies [`FrameConn`]. The contract is message-oriented: one `recv`
//! returns exactly one logical frame, so no inter-frame delimiting happens
//! here.

use async_trait::async_trait;
use bytes::Bytes;
use std::io;
use std::sync::Mutex as StdMutex;
use tokio::sync::{mpsc, watch, Mutex};

/// A bidirectional, message-oriented connection.
#[async_trait]
pub trait FrameConn: Send + Sync {
    /// Receives one frame into `buf`, returning its length.
    async fn recv(&self, buf: &mut [u8]) -> io::Result<usize>;

    /// Sends one frame, returning the number of bytes written.
    async fn send(&self, frame: &[u8]) -> io::Result<usize>;

    /// Closes the connection. Both directions stop working afterwards.
    async fn close(&self) -> io::Result<()>;
}

/// One half of an in-memory connected pair. Used by the test suite and for
/// wiring two endpoints together inside one process.
pub struct MemoryConn {
    tx: StdMutex<Option<mpsc::Sender<Bytes>>>,
    rx: Mutex<mpsc::Receiver<Bytes>>,
    closed_tx: watch::Sender<bool>,
    closed_rx: watch::Receiver<bool>,
}

/// Creates a connected pair of in-memory frame connections.
pub fn pair(capacity: usize) -> (MemoryConn, MemoryConn) {
    let (a_tx, b_rx) = mpsc::channel(capacity);
    let (b_tx, a_rx) = mpsc::channel(capacity);

    (MemoryConn::new(a_tx, a_rx), MemoryConn::new(b_tx, b_rx))
}

impl MemoryConn {
    fn new(tx: mpsc::Sender<Bytes>, rx: mpsc::Receiver<Bytes>) -> Self {
        let (closed_tx, closed_rx) = watch::channel(false);
        Self {
            tx: StdMutex::new(Some(tx)),
            rx: Mutex::new(rx),
            closed_tx,
            closed_rx,
        }
    }

    fn sender(&self) -> io::Result<mpsc::Sender<Bytes>> {
        self.tx
            .lock()
            .expect("conn sender lock poisoned")
            .clone()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "connection closed"))
    }
}

#[async_trait]
impl FrameConn for MemoryConn {
    async fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        let mut rx = self.rx.lock().await;
        let mut closed = self.closed_rx.clone();

        tokio::select! {
            maybe = rx.recv() => match maybe {
                Some(frame) => {
                    if frame.len() > buf.len() {
                        return Err(io::Error::new(
                            io::ErrorKind::InvalidData,
                            "frame exceeds receive buffer",
                        ));
                    }
                    buf[..frame.len()].copy_from_slice(&frame);
                    Ok(frame.len())
                }
                // Peer dropped its sender: remote close
                None => Err(io::Error::new(io::ErrorKind::UnexpectedEof, "peer closed")),
            },
            _ = closed.wait_for(|c| *c) => {
                Err(io::Error::new(io::ErrorKind::NotConnected, "connection closed"))
            }
        }
    }

    async fn send(&self, frame: &[u8]) -> io::Result<usize> {
        let sender = self.sender()?;
        let mut closed = self.closed_rx.clone();

        // A send blocked on backpressure must be aborted by a local close,
        // the same way closing a socket fails its pending writes.
        tokio::select! {
            res = sender.send(Bytes::copy_from_slice(frame)) => {
                res.map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "peer closed"))?;
                Ok(frame.len())
            }
            _ = closed.wait_for(|c| *c) => {
                Err(io::Error::new(io::ErrorKind::NotConnected, "connection closed"))
            }
        }
    }

    async fn close(&self) -> io::Result<()> {
        // Dropping the sender ends the peer's recv; the watch flag ends ours.
        self.tx.lock().expect("conn sender lock poisoned").take();
        let _ = self.closed_tx.send(true);
        Ok(())
    }
}
