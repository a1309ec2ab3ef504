//! Wire representation of metadata events.
//!
//! Each frame is one JSON-encoded envelope: a mandatory numeric `type`
//! discriminator plus an optional payload whose shape the type selects.
//! Unknown envelope types decode structurally so old decoders survive new
//! peers; the read loop logs and ignores them.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::id_types::ClientId;
use crate::track::{TrackEventKind, TrackInfo};

/// Envelope type discriminator. `Track` is 1 on the wire; anything else is
/// preserved in `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum MetadataEventKind {
    Track,
    Other(u8),
}

impl From<u8> for MetadataEventKind {
    fn from(v: u8) -> Self {
        match v {
            1 => MetadataEventKind::Track,
            other => MetadataEventKind::Other(other),
        }
    }
}

impl From<MetadataEventKind> for u8 {
    fn from(kind: MetadataEventKind) -> u8 {
        match kind {
            MetadataEventKind::Track => 1,
            MetadataEventKind::Other(other) => other,
        }
    }
}

impl fmt::Display for MetadataEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataEventKind::Track => write!(f, "TrackEvent"),
            MetadataEventKind::Other(v) => write!(f, "Unknown({})", v),
        }
    }
}

/// A track event as it crosses the wire. The `client_id` field is carried
/// for the peer's benefit but never trusted on receipt: the read loop
/// overwrites it with the locally configured id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTrackEvent {
    pub client_id: ClientId,
    pub track_info: TrackInfo,
    #[serde(rename = "type")]
    pub kind: TrackEventKind,
}

/// The wire envelope. `track` is set iff `kind` is `Track`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEvent {
    #[serde(rename = "type")]
    pub kind: MetadataEventKind,
    #[serde(rename = "trackEvent", skip_serializing_if = "Option::is_none", default)]
    pub track: Option<WireTrackEvent>,
}

impl MetadataEvent {
    pub fn track(event: WireTrackEvent) -> Self {
        Self {
            kind: MetadataEventKind::Track,
            track: Some(event),
        }
    }
}

/// Decode failure. Fatal for the connection: the protocol defines no way to
/// resynchronize mid-stream.
#[derive(Debug)]
pub enum CodecError {
    /// The byte sequence is not a valid envelope.
    Malformed(serde_json::Error),
    /// The envelope claims a track event but carries no payload.
    MissingPayload,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Malformed(err) => write!(f, "malformed metadata event: {}", err),
            CodecError::MissingPayload => {
                write!(f, "track event envelope is missing its payload")
            }
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CodecError::Malformed(err) => Some(err),
            CodecError::MissingPayload => None,
        }
    }
}

/// Serializes an envelope into a single frame.
pub fn encode(event: &MetadataEvent) -> Result<Bytes, CodecError> {
    let buf = serde_json::to_vec(event).map_err(CodecError::Malformed)?;
    Ok(Bytes::from(buf))
}

/// Parses a single frame into an envelope, enforcing the payload-iff-track
/// invariant.
pub fn decode(buf: &[u8]) -> Result<MetadataEvent, CodecError> {
    let event: MetadataEvent = serde_json::from_slice(buf).map_err(CodecError::Malformed)?;

    if event.kind == MetadataEventKind::Track && event.track.is_none() {
        return Err(CodecError::MissingPayload);
    }

    Ok(event)
}
