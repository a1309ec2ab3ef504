use serde::{Deserialize, Serialize};
use std::fmt;

use crate::id_types::{ClientId, TrackId};
use crate::remote_track::RemoteTrack;

/// Kind of media a track carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKind::Audio => write!(f, "audio"),
            TrackKind::Video => write!(f, "video"),
        }
    }
}

/// The one concrete, serializable track descriptor. This is the only track
/// representation that crosses the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleTrack {
    pub id: TrackId,
    pub stream_id: String,
    pub kind: TrackKind,
    pub label: String,
}

impl SimpleTrack {
    /// Creates a descriptor with a freshly minted unique id.
    pub fn new(kind: TrackKind, stream_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: TrackId::from(uuid::Uuid::new_v4().to_string()),
            stream_id: stream_id.into(),
            kind,
            label: label.into(),
        }
    }

    /// Creates a descriptor with a caller-supplied id.
    pub fn with_id(
        id: TrackId,
        kind: TrackKind,
        stream_id: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            id,
            stream_id: stream_id.into(),
            kind,
            label: label.into(),
        }
    }
}

/// A track paired with its negotiated media-line identifier. `mid` stays
/// empty until negotiation assigns a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackInfo {
    pub track: SimpleTrack,
    pub mid: String,
}

impl TrackInfo {
    pub fn new(track: SimpleTrack) -> Self {
        Self {
            track,
            mid: String::new(),
        }
    }

    pub fn id(&self) -> &TrackId {
        &self.track.id
    }
}

/// What a track event reports.
///
/// Numeric on the wire (1..=4). Values this decoder does not know are kept
/// in `Other` so they round-trip without being acted upon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum TrackEventKind {
    Add,
    Remove,
    Sub,
    Unsub,
    Other(u8),
}

impl From<u8> for TrackEventKind {
    fn from(v: u8) -> Self {
        match v {
            1 => TrackEventKind::Add,
            2 => TrackEventKind::Remove,
            3 => TrackEventKind::Sub,
            4 => TrackEventKind::Unsub,
            other => TrackEventKind::Other(other),
        }
    }
}

impl From<TrackEventKind> for u8 {
    fn from(kind: TrackEventKind) -> u8 {
        match kind {
            TrackEventKind::Add => 1,
            TrackEventKind::Remove => 2,
            TrackEventKind::Sub => 3,
            TrackEventKind::Unsub => 4,
            TrackEventKind::Other(other) => other,
        }
    }
}

impl fmt::Display for TrackEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackEventKind::Add => write!(f, "Add"),
            TrackEventKind::Remove => write!(f, "Remove"),
            TrackEventKind::Sub => write!(f, "Sub"),
            TrackEventKind::Unsub => write!(f, "Unsub"),
            TrackEventKind::Other(v) => write!(f, "Unknown({})", v),
        }
    }
}

/// A track as held by an event: either a bare descriptor (outbound, caller
/// owned) or a remote-track proxy (inbound, carries subscribe/unsubscribe
/// actions routed back through the endpoint that decoded it).
///
/// Every variant carries a concrete `SimpleTrack`, so projecting a track for
/// serialization is total and cannot fail at runtime.
#[derive(Debug, Clone)]
pub enum Track {
    Simple(SimpleTrack),
    Remote(RemoteTrack),
}

impl Track {
    /// The concrete descriptor for this track, whichever variant holds it.
    pub fn descriptor(&self) -> &SimpleTrack {
        match self {
            Track::Simple(track) => track,
            Track::Remote(remote) => remote.descriptor(),
        }
    }

    pub fn id(&self) -> &TrackId {
        &self.descriptor().id
    }
}

/// The unit exchanged between the endpoint and its consumer.
#[derive(Debug, Clone)]
pub struct TrackEvent {
    pub client_id: ClientId,
    pub track: Track,
    pub mid: String,
    pub kind: TrackEventKind,
}

impl TrackEvent {
    /// Projects the event's track to its storable/serializable form.
    pub fn info(&self) -> TrackInfo {
        TrackInfo {
            track: self.track.descriptor().clone(),
            mid: self.mid.clone(),
        }
    }
}
