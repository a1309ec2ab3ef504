use crate::id_types::TrackId;
use crate::track::{TrackEvent, TrackInfo};
use std::collections::HashMap;
use tokio::sync::mpsc;

/// One track table: TrackID -> TrackInfo
pub type TrackMap = HashMap<TrackId, TrackInfo>;

/// Producer side of the consumer event stream
pub type TrackEventSender = mpsc::Sender<TrackEvent>;

/// Consumer side of the event stream, before stream wrapping
pub type TrackEventReceiver = mpsc::Receiver<TrackEvent>;
