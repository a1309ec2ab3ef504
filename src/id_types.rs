use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A strongly typed identifier for a Track.
/// Wraps an `Arc<String>` for cheap cloning; serializes as a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackId(pub Arc<String>);

/// A strongly typed identifier for a Client (one peer of the metadata
/// protocol). Wraps an `Arc<String>` for cheap cloning.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(pub Arc<String>);

// Implement Display for easy logging
impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Implement conversion from String/&str
impl From<String> for TrackId {
    fn from(s: String) -> Self {
        TrackId(Arc::new(s))
    }
}

impl From<&str> for TrackId {
    fn from(s: &str) -> Self {
        TrackId(Arc::new(s.to_string()))
    }
}

impl From<String> for ClientId {
    fn from(s: String) -> Self {
        ClientId(Arc::new(s))
    }
}

impl From<&str> for ClientId {
    fn from(s: &str) -> Self {
        ClientId(Arc::new(s.to_string()))
    }
}

// Helper for referencing the inner string
impl AsRef<str> for TrackId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ClientId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_id_conversion() {
        let id_str = "track-123";
        let id: TrackId = TrackId::from(id_str);
        assert_eq!(id.as_ref(), id_str);

        let id_string = String::from("track-456");
        let id2: TrackId = TrackId::from(id_string.clone());
        assert_eq!(id2.as_ref(), "track-456");
    }

    #[test]
    fn test_client_id_conversion() {
        let id = ClientId::from("client-1");
        assert_eq!(id.to_string(), "client-1");
    }

    #[test]
    fn test_display_trait() {
        let id = TrackId::from("track-string");
        assert_eq!(format!("{}", id), "track-string");
    }

    #[test]
    fn test_track_id_serializes_as_string() {
        let id = TrackId::from("track-1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"track-1\"");

        let back: TrackId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
