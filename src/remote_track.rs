//! Handle for a peer-advertised track as seen locally.

use tracing::info;

use crate::track::{SimpleTrack, Track, TrackEvent, TrackEventKind};
use crate::transport::{Outbound, TransportError};

/// A remote-advertised track, handed to the consumer inside every decoded
/// track event. Carries the actions that report subscription intent back to
/// the peer; the endpoint keeps no reference to it after delivery.
#[derive(Debug, Clone)]
pub struct RemoteTrack {
    track: SimpleTrack,
    mid: String,
    outbound: Outbound,
}

impl RemoteTrack {
    pub(crate) fn new(track: SimpleTrack, mid: String, outbound: Outbound) -> Self {
        Self {
            track,
            mid,
            outbound,
        }
    }

    pub fn descriptor(&self) -> &SimpleTrack {
        &self.track
    }

    pub fn mid(&self) -> &str {
        &self.mid
    }

    /// Reports subscription intent for this track to the peer.
    ///
    /// Fails with `ClosedPipe` if the endpoint is closing; never blocks past
    /// write-loop shutdown.
    pub async fn subscribe(&self) -> Result<(), TransportError> {
        info!(
            track_id = %self.track.id,
            client_id = %self.outbound.client_id(),
            "Sub"
        );

        self.send_intent(TrackEventKind::Sub).await
    }

    /// Withdraws subscription intent for this track.
    ///
    /// Emits an Unsub-kind event. The source implementation emitted Sub here
    /// (see DESIGN.md); peers must understand Unsub.
    pub async fn unsubscribe(&self) -> Result<(), TransportError> {
        info!(
            track_id = %self.track.id,
            client_id = %self.outbound.client_id(),
            "Unsub"
        );

        self.send_intent(TrackEventKind::Unsub).await
    }

    async fn send_intent(&self, kind: TrackEventKind) -> Result<(), TransportError> {
        let event = TrackEvent {
            client_id: self.outbound.client_id().clone(),
            track: Track::Simple(self.track.clone()),
            mid: self.mid.clone(),
            kind,
        };

        self.outbound.send_track_event(event).await
    }
}
