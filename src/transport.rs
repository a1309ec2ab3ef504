//! The metadata transport endpoint.
//!
//! One endpoint per peer connection. Two tokio tasks run for its lifetime:
//! a read loop (sole reader of the connection) and a write loop (sole
//! writer), talking to the rest of the crate through capacity-1 channels.
//! Teardown is signalled through `watch` done flags so `close()` can race
//! the write loop's own exit instead of deadlocking on it.

use std::fmt;
use std::io;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, info, trace};

use crate::codec::{self, MetadataEvent, MetadataEventKind, WireTrackEvent};
use crate::config::TransportConfig;
use crate::conn::FrameConn;
use crate::id_types::{ClientId, TrackId};
use crate::remote_track::RemoteTrack;
use crate::store::TrackStore;
use crate::track::{SimpleTrack, Track, TrackEvent, TrackEventKind, TrackInfo};
use crate::types::{TrackEventReceiver, TrackEventSender};

/// Errors surfaced to API callers.
#[derive(Debug)]
pub enum TransportError {
    /// The write loop has stopped; the event was not queued.
    ClosedPipe,
    /// `remove_track` was asked for an id the local table does not hold.
    TrackNotFound(TrackId),
    /// Closing the underlying connection failed.
    Io(io::Error),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::ClosedPipe => write!(f, "metadata transport closed"),
            TransportError::TrackNotFound(id) => write!(f, "remove track: not found: {}", id),
            TransportError::Io(err) => write!(f, "connection close: {}", err),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransportError::Io(err) => Some(err),
            _ => None,
        }
    }
}

/// Endpoint lifecycle, observable via [`MetadataTransport::state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Running,
    Closing,
    Closed,
}

/// Handle to the outbound path: the write-loop queue plus the signal that
/// the loop is gone. Cloned into every [`RemoteTrack`] so subscription
/// intents flow through the same single writer as everything else.
#[derive(Debug, Clone)]
pub(crate) struct Outbound {
    client_id: ClientId,
    tx: mpsc::Sender<MetadataEvent>,
    write_done: watch::Receiver<bool>,
}

impl Outbound {
    pub(crate) fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    fn write_done(&self) -> watch::Receiver<bool> {
        self.write_done.clone()
    }

    pub(crate) async fn send_track_event(&self, event: TrackEvent) -> Result<(), TransportError> {
        let wire = WireTrackEvent {
            client_id: event.client_id.clone(),
            track_info: event.info(),
            kind: event.kind,
        };

        self.send(MetadataEvent::track(wire)).await
    }

    /// Hands an event to the write loop, racing against its shutdown so the
    /// caller gets `ClosedPipe` instead of a hang.
    async fn send(&self, event: MetadataEvent) -> Result<(), TransportError> {
        let mut write_done = self.write_done();

        tokio::select! {
            res = self.tx.send(event) => res.map_err(|_| TransportError::ClosedPipe),
            _ = wait(&mut write_done) => Err(TransportError::ClosedPipe),
        }
    }
}

/// Resolves once the flag is set or its sender is gone.
async fn wait(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|done| *done).await;
}

/// The metadata-synchronization endpoint for one peer connection.
pub struct MetadataTransport {
    client_id: ClientId,
    conn: Arc<dyn FrameConn>,
    store: Arc<TrackStore>,
    outbound: Outbound,
    events_rx: StdMutex<Option<TrackEventReceiver>>,
    close_write_tx: mpsc::Sender<()>,
    write_done: watch::Receiver<bool>,
    read_done: watch::Receiver<bool>,
    state_tx: watch::Sender<LifecycleState>,
    last_write_error: Arc<StdMutex<Option<String>>>,
}

impl MetadataTransport {
    /// Creates the endpoint and starts both loops immediately.
    ///
    /// `client_id` identifies the peer this connection is bound to; it is
    /// stamped onto every decoded inbound event (the wire value is never
    /// trusted) and attributes outbound subscribe/unsubscribe intents.
    pub fn new(conn: Arc<dyn FrameConn>, client_id: ClientId) -> Self {
        Self::with_config(conn, client_id, TransportConfig::default())
    }

    pub fn with_config(
        conn: Arc<dyn FrameConn>,
        client_id: ClientId,
        config: TransportConfig,
    ) -> Self {
        let store = Arc::new(TrackStore::new());
        let last_write_error = Arc::new(StdMutex::new(None));

        let (write_tx, write_rx) = mpsc::channel(config.channel_capacity);
        let (events_tx, events_rx) = mpsc::channel(config.channel_capacity);
        let (close_write_tx, close_write_rx) = mpsc::channel(1);
        let (write_done_tx, write_done) = watch::channel(false);
        let (read_done_tx, read_done) = watch::channel(false);
        let (state_tx, _) = watch::channel(LifecycleState::Running);

        let outbound = Outbound {
            client_id: client_id.clone(),
            tx: write_tx,
            write_done: write_done.clone(),
        };

        trace!(client_id = %client_id, "New metadata transport");

        tokio::spawn(write_loop(
            conn.clone(),
            write_rx,
            close_write_rx,
            write_done_tx,
            last_write_error.clone(),
        ));

        tokio::spawn(read_loop(
            conn.clone(),
            store.clone(),
            events_tx,
            outbound.clone(),
            read_done_tx,
            config.receive_mtu,
        ));

        Self {
            client_id,
            conn,
            store,
            outbound,
            events_rx: StdMutex::new(Some(events_rx)),
            close_write_tx,
            write_done,
            read_done,
            state_tx,
            last_write_error,
        }
    }

    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    /// The consumer stream of track lifecycle events. Takeable once; closes
    /// when the read loop terminates.
    pub fn track_events(&self) -> Option<ReceiverStream<TrackEvent>> {
        self.events_rx
            .lock()
            .expect("events receiver lock poisoned")
            .take()
            .map(ReceiverStream::new)
    }

    /// Advertises a local track to the peer.
    pub async fn add_track(&self, track: SimpleTrack) -> Result<(), TransportError> {
        let info = TrackInfo::new(track.clone());
        self.store.insert_local(info.clone()).await;

        info!(
            track_id = %track.id,
            client_id = %self.client_id,
            "Add track"
        );

        self.outbound
            .send_track_event(TrackEvent {
                client_id: self.client_id.clone(),
                track: Track::Simple(track),
                mid: info.mid,
                kind: TrackEventKind::Add,
            })
            .await
    }

    /// Withdraws a local track. Fails with `TrackNotFound` (and mutates
    /// nothing) if the id was never advertised or already removed.
    pub async fn remove_track(&self, id: &TrackId) -> Result<(), TransportError> {
        let info = self
            .store
            .remove_local(id)
            .await
            .ok_or_else(|| TransportError::TrackNotFound(id.clone()))?;

        info!(
            track_id = %id,
            client_id = %self.client_id,
            "Remove track"
        );

        self.outbound
            .send_track_event(TrackEvent {
                client_id: self.client_id.clone(),
                track: Track::Simple(info.track),
                mid: info.mid,
                kind: TrackEventKind::Remove,
            })
            .await
    }

    /// Snapshot of the tracks this endpoint has advertised.
    pub async fn local_tracks(&self) -> Vec<TrackInfo> {
        self.store.local_tracks().await
    }

    /// Snapshot of the tracks observed from the peer.
    pub async fn remote_tracks(&self) -> Vec<TrackInfo> {
        self.store.remote_tracks().await
    }

    pub fn state(&self) -> LifecycleState {
        *self.state_tx.borrow()
    }

    /// The most recent write-loop failure, if the last send attempt failed.
    /// A later successful send clears it. The write path stays
    /// fire-and-forget; this is the health signal for it.
    pub fn last_write_error(&self) -> Option<String> {
        self.last_write_error
            .lock()
            .expect("write error lock poisoned")
            .clone()
    }

    /// Shuts the endpoint down.
    ///
    /// Closes the connection (error captured, not fatal to the sequence),
    /// races a stop request against the write loop having already exited on
    /// its own, then waits for both loops with no ordering assumption.
    /// Duplicate calls are tolerated and return quickly.
    pub async fn close(&self) -> Result<(), TransportError> {
        // send_replace stores the value even with no receivers subscribed;
        // state() reads it back through the sender.
        self.state_tx.send_replace(LifecycleState::Closing);

        let close_result = self.conn.close().await;

        let mut write_done = self.write_done.clone();
        tokio::select! {
            _ = self.close_write_tx.send(()) => {}
            _ = wait(&mut write_done) => {}
        }

        let mut write_done = self.write_done.clone();
        let mut read_done = self.read_done.clone();
        tokio::join!(wait(&mut write_done), wait(&mut read_done));

        self.state_tx.send_replace(LifecycleState::Closed);

        close_result.map_err(TransportError::Io)
    }
}

/// Sole writer to the connection. One failed send is logged and recorded,
/// never fatal; only a close request (or the queue closing) ends the loop.
async fn write_loop(
    conn: Arc<dyn FrameConn>,
    mut write_rx: mpsc::Receiver<MetadataEvent>,
    mut close_rx: mpsc::Receiver<()>,
    done_tx: watch::Sender<bool>,
    last_write_error: Arc<StdMutex<Option<String>>>,
) {
    let record = |err: Option<String>| {
        *last_write_error.lock().expect("write error lock poisoned") = err;
    };

    loop {
        tokio::select! {
            maybe = write_rx.recv() => {
                let Some(event) = maybe else { break };

                trace!(metadata_event = %event.kind, "Write event");

                let frame = match codec::encode(&event) {
                    Ok(frame) => frame,
                    Err(err) => {
                        error!(error = %err, "Encode");
                        record(Some(err.to_string()));
                        continue;
                    }
                };

                match conn.send(&frame).await {
                    Ok(_) => record(None),
                    Err(err) => {
                        error!(error = %err, "Write");
                        record(Some(err.to_string()));
                    }
                }
            }
            _ = close_rx.recv() => break,
        }
    }

    let _ = done_tx.send(true);
    trace!("Write closed");
}

/// Sole reader of the connection. A read or decode failure ends inbound
/// processing for good: the consumer stream closes and the done flag flips.
async fn read_loop(
    conn: Arc<dyn FrameConn>,
    store: Arc<TrackStore>,
    events_tx: TrackEventSender,
    outbound: Outbound,
    done_tx: watch::Sender<bool>,
    receive_mtu: usize,
) {
    let mut buf = vec![0u8; receive_mtu];

    loop {
        let n = match conn.recv(&mut buf).await {
            Ok(n) => n,
            Err(err) => {
                error!(error = %err, "Read");
                break;
            }
        };

        let event = match codec::decode(&buf[..n]) {
            Ok(event) => event,
            Err(err) => {
                error!(error = %err, "Decode");
                break;
            }
        };

        trace!(metadata_event = %event.kind, "Read event");

        match event.kind {
            MetadataEventKind::Track => {
                // decode() enforces payload presence for track envelopes
                let Some(wire) = event.track else {
                    error!("Track envelope without payload");
                    break;
                };
                let track_event = remote_event(&outbound, wire);

                let mut skip = false;

                match track_event.kind {
                    TrackEventKind::Add => {
                        // A refresh Add for a known track is suppressed, but
                        // the newest info still replaces the stored entry.
                        skip = store.upsert_remote(track_event.info()).await;
                    }
                    TrackEventKind::Remove => {
                        store.remove_remote(track_event.track.id()).await;
                    }
                    TrackEventKind::Sub
                    | TrackEventKind::Unsub
                    | TrackEventKind::Other(_) => {}
                }

                if !skip {
                    let mut write_done = outbound.write_done();
                    // Forwarding must not outlive shutdown if the consumer
                    // is not draining.
                    tokio::select! {
                        _ = events_tx.send(track_event) => {}
                        _ = wait(&mut write_done) => {}
                    }
                }
            }
            MetadataEventKind::Other(kind) => {
                info!(event_type = kind, "Ignoring unknown metadata event");
            }
        }
    }

    // Dropping the sender closes the consumer stream.
    drop(events_tx);
    let _ = done_tx.send(true);
    trace!("Read closed");
}

/// Builds the consumer-facing event for a decoded wire event: provenance is
/// stamped with the configured id and the track becomes a fresh proxy the
/// consumer can subscribe through.
fn remote_event(outbound: &Outbound, wire: WireTrackEvent) -> TrackEvent {
    let WireTrackEvent {
        track_info, kind, ..
    } = wire;

    TrackEvent {
        client_id: outbound.client_id().clone(),
        track: Track::Remote(RemoteTrack::new(
            track_info.track,
            track_info.mid.clone(),
            outbound.clone(),
        )),
        mid: track_info.mid,
        kind,
    }
}
